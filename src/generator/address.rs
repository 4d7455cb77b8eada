// src/generator/address.rs
//
// 候选服务器地址与备注

use std::collections::HashSet;

use crate::common::consts::SPEEDTEST_DOMAIN;
use crate::common::utils::{is_domain, is_ipv4};
use crate::generator::resolver::ResolvedIps;

/// 组合候选地址：主机名、测速域名、主机名解析出的地址、优选 IP
///
/// 结果去重，保留首次出现的位置。
pub fn config_addresses(
    host: &str,
    resolved: &ResolvedIps,
    clean_ips: &[String],
    enable_ipv6: bool,
) -> Vec<String> {
    let mut candidates = vec![host.to_string(), SPEEDTEST_DOMAIN.to_string()];
    candidates.extend(resolved.ipv4.iter().cloned());
    if enable_ipv6 {
        candidates.extend(resolved.ipv6.iter().map(|ip| format!("[{}]", ip)));
    }
    candidates.extend(clean_ips.iter().cloned());

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|addr| seen.insert(addr.clone()))
        .collect()
}

// 地址类别，用于备注
pub fn address_kind(address: &str, clean_ips: &[String]) -> &'static str {
    if clean_ips.iter().any(|ip| ip == address) {
        "Clean IP"
    } else if is_domain(address) {
        "Domain"
    } else if is_ipv4(address) {
        "IPv4"
    } else {
        "IPv6"
    }
}

/// 生成单个连接配置的备注
pub fn generate_remark(
    index: usize,
    port: u16,
    address: &str,
    clean_ips: &[String],
    protocol: &str,
    config_type: &str,
) -> String {
    let type_suffix = if config_type.is_empty() {
        String::new()
    } else {
        format!(" {}", config_type)
    };
    format!(
        "💦 {} - {}{} - {} : {}",
        index,
        protocol,
        type_suffix,
        address_kind(address, clean_ips),
        port
    )
}

// 从 host:port 端点中取出主机部分（保留 IPv6 方括号）
pub fn endpoint_host(endpoint: &str) -> &str {
    if endpoint.starts_with('[') {
        return match endpoint.find(']') {
            Some(end) => &endpoint[..=end],
            None => endpoint,
        };
    }
    match endpoint.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => endpoint,
    }
}
