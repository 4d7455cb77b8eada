// src/generator/settings.rs

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::consts::{
    DEFAULT_BEST_INTERVAL, DEFAULT_FRAGMENT_PACKETS, DEFAULT_INTERVAL_MAX, DEFAULT_INTERVAL_MIN,
    DEFAULT_LENGTH_MAX, DEFAULT_LENGTH_MIN, DEFAULT_LOCAL_DNS, DEFAULT_NOISE_COUNT,
    DEFAULT_NOISE_DELAY_MAX, DEFAULT_NOISE_DELAY_MIN, DEFAULT_NOISE_MODE, DEFAULT_NOISE_SIZE_MAX,
    DEFAULT_NOISE_SIZE_MIN, DEFAULT_REMOTE_DNS, DEFAULT_WARP_ENDPOINT, WARP_INTERFACE_V4,
};
use crate::common::error::{AppError, Result};
use crate::common::utils::split_list;

// 配置族：隧道（VLESS/Trojan）或 WireGuard（Warp）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Tunnel,
    Warp,
}

// 设置存储中的完整数据集
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    // 代理设置
    pub proxy_settings: ProxySettings,
    // Warp 账户（索引 0 为直连跳，索引 1 为链式跳）
    #[serde(default)]
    pub warp_configs: Vec<WarpAccount>,
}

// 代理设置记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    #[serde(rename = "remoteDNS")]
    pub remote_dns: String,
    #[serde(rename = "resolvedRemoteDNS")]
    pub resolved_remote_dns: ResolvedRemoteDns,
    #[serde(rename = "localDNS")]
    pub local_dns: String,
    #[serde(rename = "vlessTrojanFakeDNS")]
    pub vless_trojan_fake_dns: bool,
    #[serde(rename = "enableIPv6")]
    pub enable_ipv6: bool,
    #[serde(rename = "warpFakeDNS")]
    pub warp_fake_dns: bool,
    #[serde(rename = "warpEnableIPv6")]
    pub warp_enable_ipv6: bool,

    // 分流与阻断
    #[serde(rename = "bypassLAN")]
    pub bypass_lan: bool,
    pub bypass_iran: bool,
    pub bypass_china: bool,
    pub bypass_russia: bool,
    pub block_ads: bool,
    pub block_porn: bool,
    #[serde(rename = "blockUDP443")]
    pub block_udp443: bool,

    // 分片参数
    #[serde(deserialize_with = "de_u32")]
    pub length_min: u32,
    #[serde(deserialize_with = "de_u32")]
    pub length_max: u32,
    #[serde(deserialize_with = "de_u32")]
    pub interval_min: u32,
    #[serde(deserialize_with = "de_u32")]
    pub interval_max: u32,
    pub fragment_packets: String,

    // 负载均衡探测间隔（秒）
    #[serde(rename = "bestVLESSTrojanInterval", deserialize_with = "de_u32")]
    pub best_vless_trojan_interval: u32,
    #[serde(deserialize_with = "de_u32")]
    pub best_warp_interval: u32,

    // NikaNG 噪声参数
    #[serde(rename = "nikaNGNoiseMode")]
    pub nikang_noise_mode: String,
    #[serde(deserialize_with = "de_u32")]
    pub noise_count_min: u32,
    #[serde(deserialize_with = "de_u32")]
    pub noise_count_max: u32,
    #[serde(deserialize_with = "de_u32")]
    pub noise_size_min: u32,
    #[serde(deserialize_with = "de_u32")]
    pub noise_size_max: u32,
    #[serde(deserialize_with = "de_u32")]
    pub noise_delay_min: u32,
    #[serde(deserialize_with = "de_u32")]
    pub noise_delay_max: u32,

    // 地址与 CDN
    #[serde(rename = "proxyIP")]
    pub proxy_ip: String,
    #[serde(rename = "cleanIPs")]
    pub clean_ips: String,
    pub custom_cdn_addrs: String,
    pub custom_cdn_host: String,
    pub custom_cdn_sni: String,

    // 链式代理
    pub out_proxy: String,
    #[serde(deserialize_with = "de_json_text")]
    pub out_proxy_params: String,

    // 协议与端口
    pub vless_configs: bool,
    pub trojan_configs: bool,
    #[serde(deserialize_with = "de_ports")]
    pub ports: Vec<u16>,

    // WireGuard 端点（逗号分隔的 host:port）
    pub warp_endpoints: String,
}

// 预解析的远程 DNS 服务器
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolvedRemoteDns {
    pub server: Option<String>,
    #[serde(rename = "staticIPs")]
    pub static_ips: Vec<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            remote_dns: DEFAULT_REMOTE_DNS.to_string(),
            resolved_remote_dns: ResolvedRemoteDns::default(),
            local_dns: DEFAULT_LOCAL_DNS.to_string(),
            vless_trojan_fake_dns: false,
            enable_ipv6: true,
            warp_fake_dns: false,
            warp_enable_ipv6: true,
            bypass_lan: false,
            bypass_iran: false,
            bypass_china: false,
            bypass_russia: false,
            block_ads: false,
            block_porn: false,
            block_udp443: false,
            length_min: DEFAULT_LENGTH_MIN,
            length_max: DEFAULT_LENGTH_MAX,
            interval_min: DEFAULT_INTERVAL_MIN,
            interval_max: DEFAULT_INTERVAL_MAX,
            fragment_packets: DEFAULT_FRAGMENT_PACKETS.to_string(),
            best_vless_trojan_interval: DEFAULT_BEST_INTERVAL,
            best_warp_interval: DEFAULT_BEST_INTERVAL,
            nikang_noise_mode: DEFAULT_NOISE_MODE.to_string(),
            noise_count_min: DEFAULT_NOISE_COUNT,
            noise_count_max: DEFAULT_NOISE_COUNT,
            noise_size_min: DEFAULT_NOISE_SIZE_MIN,
            noise_size_max: DEFAULT_NOISE_SIZE_MAX,
            noise_delay_min: DEFAULT_NOISE_DELAY_MIN,
            noise_delay_max: DEFAULT_NOISE_DELAY_MAX,
            proxy_ip: String::new(),
            clean_ips: String::new(),
            custom_cdn_addrs: String::new(),
            custom_cdn_host: String::new(),
            custom_cdn_sni: String::new(),
            out_proxy: String::new(),
            out_proxy_params: String::new(),
            vless_configs: true,
            trojan_configs: false,
            ports: vec![443],
            warp_endpoints: DEFAULT_WARP_ENDPOINT.to_string(),
        }
    }
}

impl ProxySettings {
    // 伪 DNS 开关：隧道与 WireGuard 各自独立
    pub fn is_fake_dns(&self, family: Family) -> bool {
        match family {
            Family::Tunnel => self.vless_trojan_fake_dns,
            Family::Warp => self.warp_fake_dns,
        }
    }

    // IPv6 开关：隧道与 WireGuard 各自独立
    pub fn is_ipv6(&self, family: Family) -> bool {
        match family {
            Family::Tunnel => self.enable_ipv6,
            Family::Warp => self.warp_enable_ipv6,
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass_iran || self.bypass_china || self.bypass_russia
    }

    pub fn is_block(&self) -> bool {
        self.block_ads || self.block_porn
    }

    pub fn clean_ip_list(&self) -> Vec<String> {
        split_list(&self.clean_ips)
    }

    pub fn custom_cdn_list(&self) -> Vec<String> {
        split_list(&self.custom_cdn_addrs)
    }

    pub fn warp_endpoint_list(&self) -> Vec<String> {
        split_list(&self.warp_endpoints)
    }

    // 解析链式代理描述；未配置时返回 None
    pub fn chain_proxy_params(&self) -> Option<Result<ChainProxyParams>> {
        if self.out_proxy.trim().is_empty() {
            return None;
        }
        Some(serde_json::from_str(&self.out_proxy_params).map_err(AppError::from))
    }

    // 返回清除了链式代理字段的副本
    pub fn without_chain_proxy(&self) -> Self {
        Self {
            out_proxy: String::new(),
            out_proxy_params: "{}".to_string(),
            ..self.clone()
        }
    }
}

// 链式代理描述
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ChainProxyParams {
    Socks(ForwardProxyParams),
    Http(ForwardProxyParams),
    Vless(VlessChainParams),
}

// SOCKS / HTTP 上游
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardProxyParams {
    pub host: String,
    #[serde(deserialize_with = "de_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

// VLESS 上游
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VlessChainParams {
    pub host_name: String,
    #[serde(deserialize_with = "de_port")]
    pub port: u16,
    pub uuid: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub flow: Option<String>,
    #[serde(default)]
    pub security: ChainSecurity,
    #[serde(rename = "type", default)]
    pub transport: ChainTransport,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub sni: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub fp: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub alpn: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub pbk: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub sid: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub spx: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub header_type: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub authority: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub service_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub mode: Option<String>,
}

// 链式代理的安全层
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainSecurity {
    #[default]
    None,
    Tls,
    Reality,
}

impl ChainSecurity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainSecurity::None => "none",
            ChainSecurity::Tls => "tls",
            ChainSecurity::Reality => "reality",
        }
    }
}

// 链式代理的传输层
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainTransport {
    #[default]
    Tcp,
    Ws,
    Grpc,
}

impl ChainTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainTransport::Tcp => "tcp",
            ChainTransport::Ws => "ws",
            ChainTransport::Grpc => "grpc",
        }
    }
}

// Warp 账户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WarpAccount {
    pub private_key: String,
    pub account: WarpAccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpAccountInfo {
    pub config: WarpAccountConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpAccountConfig {
    pub client_id: String,
    pub interface: WarpInterface,
    pub peers: Vec<WarpPeer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpInterface {
    pub addresses: WarpAddresses,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpAddresses {
    #[serde(default)]
    pub v4: String,
    pub v6: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarpPeer {
    pub public_key: String,
}

// 从 Warp 账户提取的 WireGuard 参数
#[derive(Debug, Clone, PartialEq)]
pub struct WireguardParams {
    pub addresses: Vec<String>,
    pub reserved: String,
    pub public_key: String,
    pub private_key: String,
}

impl WireguardParams {
    pub fn from_accounts(accounts: &[WarpAccount], is_chain: bool) -> Result<Self> {
        let index = usize::from(is_chain);
        let account = accounts.get(index).ok_or_else(|| {
            AppError::Settings(format!("Warp account #{} is missing from the dataset", index + 1))
        })?;
        let config = &account.account.config;
        let peer = config.peers.first().ok_or_else(|| {
            AppError::Settings(format!("Warp account #{} has no peers", index + 1))
        })?;

        Ok(Self {
            addresses: vec![
                WARP_INTERFACE_V4.to_string(),
                format!("{}/128", config.interface.addresses.v6),
            ],
            reserved: config.client_id.clone(),
            public_key: peer.public_key.clone(),
            private_key: account.private_key.clone(),
        })
    }
}

// 单次请求的参数
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    // Worker 主机名
    pub host_name: String,
    // VLESS 用户 ID
    pub user_id: String,
    // Trojan 密码
    pub trojan_password: String,
}

//
// 宽松反序列化：面板存储中数字与字符串混用
//

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

impl NumberOrText {
    fn into_u64<E: serde::de::Error>(self) -> std::result::Result<u64, E> {
        match self {
            NumberOrText::Number(n) => Ok(n),
            NumberOrText::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| E::custom(format!("invalid number '{}': {}", s, e))),
        }
    }
}

fn de_u32<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?.into_u64::<D::Error>()?;
    u32::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("number out of range: {}", value)))
}

fn de_port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u16, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?.into_u64::<D::Error>()?;
    u16::try_from(value).map_err(|_| serde::de::Error::custom(format!("invalid port: {}", value)))
}

fn de_ports<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u16>, D::Error> {
    Vec::<NumberOrText>::deserialize(deserializer)?
        .into_iter()
        .map(|p| {
            let value = p.into_u64::<D::Error>()?;
            u16::try_from(value)
                .map_err(|_| serde::de::Error::custom(format!("invalid port: {}", value)))
        })
        .collect()
}

// 空字符串视为缺省
fn de_opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// 链式代理参数可能以字符串或对象形式存储
fn de_json_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
