// src/common/consts.rs
//
// 本文件包含项目中使用的所有全局常量

// 标准库导入
use std::net::SocketAddr;

//
// 通用常量
//

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// 默认数据集文件路径
pub const DEFAULT_DATASET_PATH: &str = "dataset.json";

/// 数据集中代理设置的键名
pub const DATASET_PROXY_SETTINGS_KEY: &str = "proxySettings";

/// 链式代理协议字段
pub const OUT_PROXY_KEY: &str = "outProxy";

/// 链式代理参数字段
pub const OUT_PROXY_PARAMS_KEY: &str = "outProxyParams";

//
// 服务器配置常量
//

/// 默认服务器监听地址
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

/// 默认服务器连接超时（秒）
pub const DEFAULT_LISTEN_TIMEOUT: u64 = 120;

//
// 速率限制常量
//

/// 默认每个 IP 每秒最大请求数
pub const DEFAULT_PER_IP_RATE: u32 = 10;

/// 默认单个 IP 的并发请求数限制
pub const DEFAULT_PER_IP_CONCURRENT: u32 = 5;

/// 每个 IP 每秒最大请求数下限
pub const MIN_PER_IP_RATE: u32 = 1;

/// 每个 IP 每秒最大请求数上限
pub const MAX_PER_IP_RATE: u32 = 1000;

/// 单个 IP 并发请求数下限
pub const MIN_PER_IP_CONCURRENT: u32 = 1;

/// 单个 IP 并发请求数上限
pub const MAX_PER_IP_CONCURRENT: u32 = 100;

//
// HTTP 客户端常量
//

/// 默认 HTTP 客户端超时（秒）
pub const DEFAULT_HTTP_CLIENT_TIMEOUT: u64 = 10;

/// 默认连接池空闲超时（秒）
pub const DEFAULT_HTTP_CLIENT_POOL_IDLE_TIMEOUT: u64 = 60;

/// 默认连接池最大空闲连接数
pub const DEFAULT_HTTP_CLIENT_POOL_MAX_IDLE_CONNECTIONS: u32 = 10;

/// 默认 HTTP 客户端 User-Agent
pub const DEFAULT_HTTP_CLIENT_AGENT: &str = concat!("oxide-xgen/", env!("CARGO_PKG_VERSION"));

//
// DNS 解析常量
//

/// 默认 DoH JSON 解析服务地址
pub const DEFAULT_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";

/// DoH JSON 内容类型
pub const CONTENT_TYPE_DNS_JSON: &str = "application/dns-json";

/// A 记录类型值
pub const DNS_RECORD_TYPE_A: u16 = 1;

/// AAAA 记录类型值
pub const DNS_RECORD_TYPE_AAAA: u16 = 28;

//
// 响应头常量
//

/// 配置批次响应的内容类型
pub const CONTENT_TYPE_CONFIG: &str = "text/plain;charset=utf-8";

/// 禁用缓存的 Cache-Control 值
pub const CACHE_CONTROL_NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// CDN 缓存控制头名称
pub const CDN_CACHE_CONTROL_HEADER: &str = "cdn-cache-control";

/// CDN 缓存控制头值
pub const CDN_CACHE_CONTROL_NO_STORE: &str = "no-store";

//
// 端口常量
//

/// 默认 HTTPS 端口（只有这些端口启用 TLS）
pub const DEFAULT_HTTPS_PORTS: [u16; 6] = [443, 8443, 2053, 2083, 2087, 2096];

//
// 出站标签常量
//

/// 主代理出站标签
pub const TAG_PROXY: &str = "proxy";

/// 链式代理出站标签
pub const TAG_CHAIN: &str = "chain";

/// 分片出站标签
pub const TAG_FRAGMENT: &str = "fragment";

/// 直连出站标签
pub const TAG_DIRECT: &str = "direct";

/// 阻断出站标签
pub const TAG_BLOCK: &str = "block";

/// DNS 出站标签
pub const TAG_DNS_OUT: &str = "dns-out";

/// 负载均衡器标签
pub const TAG_BALANCER: &str = "all";

/// 负载均衡候选代理标签前缀
pub const TAG_PREFIX_PROXY: &str = "prox";

/// 负载均衡候选分片标签前缀
pub const TAG_PREFIX_FRAGMENT: &str = "frag";

/// 无 Worker 模式下的诱饵出站标签
pub const TAG_FAKE_OUTBOUND: &str = "fake-outbound";

//
// 入站标签常量
//

/// SOCKS 入站标签
pub const TAG_SOCKS_IN: &str = "socks-in";

/// HTTP 入站标签
pub const TAG_HTTP_IN: &str = "http-in";

/// DNS 入站标签
pub const TAG_DNS_IN: &str = "dns-in";

//
// DNS 策略常量
//

/// 伪 DNS 服务器名称
pub const FAKE_DNS_SERVER: &str = "fakedns";

/// 无 Worker 模式使用的远程 DNS
pub const WORKERLESS_REMOTE_DNS: &str = "https://cloudflare-dns.com/dns-query";

/// 无 Worker 模式下静态解析的域名
pub const WORKERLESS_HOST_DOMAIN: &str = "cloudflare-dns.com";

/// 无 Worker 模式需要预解析的回退域名
pub const WORKERLESS_FALLBACK_DOMAINS: [&str; 3] = ["cloudflare-dns.com", "cloudflare.com", "dash.cloudflare.com"];

/// WireGuard 模式的 IPv4 任播 DNS
pub const WARP_REMOTE_DNS_V4: [&str; 2] = ["1.1.1.1", "1.0.0.1"];

/// WireGuard 模式的 IPv6 任播 DNS
pub const WARP_REMOTE_DNS_V6: [&str; 2] = ["2606:4700:4700::1111", "2606:4700:4700::1001"];

/// 被阻断分类解析到的地址
pub const BLOCK_LOOPBACK: &str = "127.0.0.1";

/// 伪 DNS IPv4 地址池
pub const FAKE_DNS_POOL_V4: &str = "198.18.0.0/15";

/// 伪 DNS IPv6 地址池
pub const FAKE_DNS_POOL_V6: &str = "fc00::/18";

/// 伪 DNS 地址池大小
pub const FAKE_DNS_POOL_SIZE: u32 = 32768;

//
// 路由常量
//

/// 始终阻断的 IP 地址
pub const BLOCKED_IPS: [&str; 3] = ["10.10.34.34", "10.10.34.35", "10.10.34.36"];

/// 探测地址所属域名（负载均衡时需直连解析）
pub const PROBE_DOMAIN: &str = "www.gstatic.com";

/// 负载均衡探测 URL
pub const PROBE_URL: &str = "https://www.gstatic.com/generate_204";

//
// 出站构建常量
//

/// 用户等级
pub const USER_LEVEL: u8 = 8;

/// WebSocket 早期数据参数
pub const WS_EARLY_DATA: &str = "?ed=2560";

/// 随机路径长度
pub const RANDOM_PATH_LENGTH: usize = 16;

/// 随机路径字符集
pub const RANDOM_PATH_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// WebSocket 请求使用的浏览器 User-Agent
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// 地址列表中固定附加的域名
pub const SPEEDTEST_DOMAIN: &str = "www.speedtest.net";

/// WireGuard 接口 IPv4 地址
pub const WARP_INTERFACE_V4: &str = "172.16.0.2/32";

/// WireGuard MTU
pub const WARP_MTU: u16 = 1280;

//
// 分片常量
//

/// 最佳分片探测使用的长度区间
pub const BEST_FRAGMENT_LENGTHS: [&str; 18] = [
    "10-20", "20-30", "30-40", "40-50", "50-60", "60-70",
    "70-80", "80-90", "90-100", "10-30", "20-40", "30-50",
    "40-60", "50-70", "60-80", "70-90", "80-100", "100-200",
];

/// 最佳分片探测使用的间隔
pub const BEST_FRAGMENT_INTERVAL: &str = "1-1";

//
// 设置默认值
//

/// 默认远程 DNS
pub const DEFAULT_REMOTE_DNS: &str = "https://8.8.8.8/dns-query";

/// 默认本地 DNS
pub const DEFAULT_LOCAL_DNS: &str = "8.8.8.8";

/// 默认分片长度区间
pub const DEFAULT_LENGTH_MIN: u32 = 100;
pub const DEFAULT_LENGTH_MAX: u32 = 200;

/// 默认分片间隔区间
pub const DEFAULT_INTERVAL_MIN: u32 = 1;
pub const DEFAULT_INTERVAL_MAX: u32 = 1;

/// 默认分片包类型
pub const DEFAULT_FRAGMENT_PACKETS: &str = "tlshello";

/// 默认负载均衡探测间隔（秒）
pub const DEFAULT_BEST_INTERVAL: u32 = 30;

/// 默认噪声模式
pub const DEFAULT_NOISE_MODE: &str = "quic";

/// 默认噪声参数
pub const DEFAULT_NOISE_COUNT: u32 = 10;
pub const DEFAULT_NOISE_SIZE_MIN: u32 = 5;
pub const DEFAULT_NOISE_SIZE_MAX: u32 = 10;
pub const DEFAULT_NOISE_DELAY_MIN: u32 = 1;
pub const DEFAULT_NOISE_DELAY_MAX: u32 = 1;

/// 默认 WireGuard 端点
pub const DEFAULT_WARP_ENDPOINT: &str = "engage.cloudflareclient.com:2408";
