// src/generator/model.rs
//
// 下游代理引擎消费的配置文档结构

use std::collections::{BTreeMap, HashSet};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::common::error::{AppError, Result};

/// 将一批文档序列化为 4 空格缩进的 JSON 数组
pub fn render_batch(configs: &[XrayConfig]) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    configs.serialize(&mut serializer).map_err(AppError::Serialize)?;
    String::from_utf8(buffer)
        .map_err(|e| AppError::Settings(format!("Rendered config is not UTF-8: {}", e)))
}

// 完整配置文档
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct XrayConfig {
    // 人类可读的标签
    pub remarks: String,
    pub log: LogConfig,
    pub dns: DnsObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fakedns: Option<Vec<FakeDnsPool>>,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub policy: Policy,
    pub routing: Routing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observatory: Option<Observatory>,
    pub stats: Stats,
}

impl XrayConfig {
    // 查找指定标签的出站
    pub fn outbound(&self, tag: &str) -> Option<&Outbound> {
        self.outbounds.iter().find(|o| o.tag == tag)
    }

    // 返回文档内无法解析的标签引用（规则、拨号链、负载均衡）以及重复标签
    pub fn unresolved_tags(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();
        for outbound in &self.outbounds {
            if !seen.insert(outbound.tag.as_str()) {
                problems.push(format!("duplicate tag '{}'", outbound.tag));
            }
        }

        let balancer_tags: HashSet<&str> = self
            .routing
            .balancers
            .iter()
            .flatten()
            .map(|b| b.tag.as_str())
            .collect();

        for rule in &self.routing.rules {
            match &rule.target {
                RuleTarget::Outbound(tag) if !seen.contains(tag.as_str()) => {
                    problems.push(format!("rule targets unknown outbound '{}'", tag));
                }
                RuleTarget::Balancer(tag) if !balancer_tags.contains(tag.as_str()) => {
                    problems.push(format!("rule targets unknown balancer '{}'", tag));
                }
                _ => {}
            }
        }

        for outbound in &self.outbounds {
            if let Some(dialer) = outbound.dialer_proxy() {
                if !seen.contains(dialer) {
                    problems.push(format!(
                        "outbound '{}' dials unknown '{}'",
                        outbound.tag, dialer
                    ));
                }
            }
        }

        for balancer in self.routing.balancers.iter().flatten() {
            for prefix in &balancer.selector {
                if !self.outbounds.iter().any(|o| o.tag.starts_with(prefix.as_str())) {
                    problems.push(format!("balancer selector '{}' matches nothing", prefix));
                }
            }
            if let Some(fallback) = &balancer.fallback_tag {
                if !seen.contains(fallback.as_str()) {
                    problems.push(format!("balancer fallback '{}' is unknown", fallback));
                }
            }
        }

        problems
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogConfig {
    pub loglevel: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Stats {}

//
// DNS
//

// DNS 策略对象
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<BTreeMap<String, Vec<String>>>,
    pub servers: Vec<DnsServer>,
    pub query_strategy: String,
    pub tag: String,
}

// DNS 服务器：纯地址或带域名范围的对象
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DnsServer {
    Address(String),
    Scoped(ScopedDnsServer),
}

impl DnsServer {
    pub fn address(&self) -> &str {
        match self {
            DnsServer::Address(a) => a,
            DnsServer::Scoped(s) => &s.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopedDnsServer {
    pub address: String,
    pub domains: Vec<String>,
    #[serde(rename = "expectIPs", skip_serializing_if = "Option::is_none")]
    pub expect_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FakeDnsPool {
    pub ip_pool: String,
    pub pool_size: u32,
}

//
// 入站
//

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Inbound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    pub port: u16,
    pub protocol: String,
    pub settings: InboundSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniffing: Option<Sniffing>,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sniffing {
    pub dest_override: Vec<String>,
    pub enabled: bool,
    pub route_only: bool,
}

//
// 出站
//

// 出站连接描述；`tag` 是规则与拨号链引用它的唯一身份
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<Mux>,
    #[serde(flatten)]
    pub protocol: OutboundProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettings>,
    pub tag: String,
}

impl Outbound {
    pub fn dialer_proxy(&self) -> Option<&str> {
        self.stream_settings
            .as_ref()
            .and_then(|s| s.sockopt.as_ref())
            .and_then(|s| s.dialer_proxy.as_deref())
    }

    // 设置拨号链目标（没有 sockopt 时创建）
    pub fn set_dialer_proxy(&mut self, tag: impl Into<String>) {
        let stream = self.stream_settings.get_or_insert_with(StreamSettings::default);
        stream.sockopt.get_or_insert_with(Sockopt::default).dialer_proxy = Some(tag.into());
    }

    // 返回更换了标签的副本
    pub fn retagged(&self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..self.clone()
        }
    }
}

// 出站协议与其 settings 块
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "protocol", content = "settings", rename_all = "lowercase")]
pub enum OutboundProtocol {
    Vless(VnextSettings),
    Trojan(ServerSettings),
    Wireguard(WireguardSettings),
    Socks(ServerSettings),
    Http(ServerSettings),
    Freedom(FreedomSettings),
    Blackhole(BlackholeSettings),
    Dns,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VnextSettings {
    pub vnext: Vec<VnextServer>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VnextServer {
    pub address: String,
    pub port: u16,
    pub users: Vec<VlessUser>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VlessUser {
    pub id: String,
    pub encryption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    pub level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerSettings {
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerEntry {
    pub address: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<ForwardUser>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ForwardUser {
    pub user: String,
    pub pass: String,
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardSettings {
    pub address: Vec<String>,
    pub mtu: u16,
    pub peers: Vec<WireguardPeer>,
    pub reserved: Vec<u8>,
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wnoise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wnoisecount: Option<NoiseValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wpayloadsize: Option<NoiseValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wnoisedelay: Option<NoiseValue>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardPeer {
    pub endpoint: String,
    pub public_key: String,
    pub keep_alive: u32,
}

// 噪声参数：最小值等于最大值时输出单个数字，否则输出 "min-max"
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NoiseValue {
    Single(u32),
    Range(String),
}

impl NoiseValue {
    pub fn from_range(min: u32, max: u32) -> Self {
        if min == max {
            NoiseValue::Single(min)
        } else {
            NoiseValue::Range(format!("{}-{}", min, max))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreedomSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<Fragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Fragment {
    pub packets: String,
    pub length: String,
    pub interval: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlackholeSettings {
    pub response: BlackholeResponse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlackholeResponse {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mux {
    pub enabled: bool,
    pub concurrency: u32,
    pub xudp_concurrency: u32,
    #[serde(rename = "xudpProxyUDP443")]
    pub xudp_proxy_udp443: String,
}

impl Default for Mux {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 8,
            xudp_concurrency: 16,
            xudp_proxy_udp443: "reject".to_string(),
        }
    }
}

//
// 传输层
//

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockopt: Option<Sockopt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<WsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_settings: Option<TlsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_settings: Option<RealitySettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_settings: Option<TcpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_settings: Option<GrpcSettings>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sockopt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialer_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_keep_alive_idle: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_no_delay: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WsSettings {
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSettings {
    pub allow_insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub alpn: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealitySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(rename = "spiderX", skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TcpSettings {
    pub header: TcpHeader,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TcpHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequestHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponseHeader>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HttpRequestHeader {
    pub headers: BTreeMap<String, Vec<String>>,
    pub method: String,
    pub path: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HttpResponseHeader {
    pub headers: BTreeMap<String, Vec<String>>,
    pub reason: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    pub multi_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

//
// 策略
//

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Policy {
    pub levels: BTreeMap<String, LevelPolicy>,
    pub system: SystemPolicy,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelPolicy {
    pub conn_idle: u32,
    pub downlink_only: u32,
    pub handshake: u32,
    pub uplink_only: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemPolicy {
    pub stats_outbound_uplink: bool,
    pub stats_outbound_downlink: bool,
}

//
// 路由
//

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routing {
    pub domain_strategy: String,
    pub rules: Vec<RoutingRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancers: Option<Vec<Balancer>>,
}

// 路由规则（按顺序首个匹配生效）
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
    #[serde(flatten)]
    pub target: RuleTarget,
    #[serde(rename = "type")]
    pub kind: String,
}

impl RoutingRule {
    // 创建只有目标的空规则
    pub fn field(target: RuleTarget) -> Self {
        Self {
            inbound_tag: None,
            port: None,
            network: None,
            ip: None,
            domain: None,
            target,
            kind: "field".to_string(),
        }
    }

    pub fn outbound_tag(&self) -> Option<&str> {
        match &self.target {
            RuleTarget::Outbound(tag) => Some(tag),
            RuleTarget::Balancer(_) => None,
        }
    }
}

// 规则目标：出站或负载均衡器，两者互斥
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum RuleTarget {
    #[serde(rename = "outboundTag")]
    Outbound(String),
    #[serde(rename = "balancerTag")]
    Balancer(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balancer {
    pub tag: String,
    pub selector: Vec<String>,
    pub strategy: BalancerStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalancerStrategy {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Observatory {
    #[serde(rename = "probeInterval")]
    pub probe_interval: String,
    #[serde(rename = "probeURL")]
    pub probe_url: String,
    #[serde(rename = "subjectSelector")]
    pub subject_selector: Vec<String>,
    #[serde(rename = "EnableConcurrency")]
    pub enable_concurrency: bool,
}
