// src/generator/dns.rs
//
// DNS 策略构建：远程/本地服务器、静态 hosts、伪 DNS

use std::collections::BTreeMap;

use futures::future::try_join_all;
use tracing::debug;

use crate::common::consts::{
    BLOCK_LOOPBACK, FAKE_DNS_SERVER, PROBE_DOMAIN, WARP_REMOTE_DNS_V4, WARP_REMOTE_DNS_V6,
    WORKERLESS_FALLBACK_DOMAINS, WORKERLESS_HOST_DOMAIN, WORKERLESS_REMOTE_DNS,
};
use crate::common::error::Result;
use crate::common::utils::is_domain;
use crate::generator::model::{DnsObject, DnsServer, ScopedDnsServer};
use crate::generator::resolver::{DnsResolver, ResolvedIps};
use crate::generator::settings::{Family, ProxySettings};

// 地理分流表：开关 -> (geosite, geoip)
fn geo_bypass_table(settings: &ProxySettings) -> [(bool, &'static str, &'static str); 3] {
    [
        (settings.bypass_iran, "geosite:category-ir", "geoip:ir"),
        (settings.bypass_china, "geosite:cn", "geoip:cn"),
        (settings.bypass_russia, "geosite:category-ru", "geoip:ru"),
    ]
}

// 阻断分类表
fn block_table(settings: &ProxySettings) -> [(bool, &'static str); 3] {
    [
        (settings.block_ads, "geosite:category-ads-all"),
        (settings.block_ads, "geosite:category-ads-ir"),
        (settings.block_porn, "geosite:category-porn"),
    ]
}

/// DNS 构建选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsOptions {
    // 无 Worker 回退模式
    pub workerless: bool,
    // 负载均衡探测文档
    pub balancer: bool,
    // 隧道或 WireGuard
    pub family: Family,
}

impl DnsOptions {
    pub fn tunnel() -> Self {
        Self {
            workerless: false,
            balancer: false,
            family: Family::Tunnel,
        }
    }
}

/// 外部解析的结果
#[derive(Debug, Clone, Default)]
pub struct StaticLookups {
    // 固定解析的域名及其地址
    pub pinned: Option<(String, ResolvedIps)>,
    // 无 Worker 模式下回退域名的解析结果
    pub workerless_fallback: Vec<ResolvedIps>,
}

/// 根据设置组装 DNS 策略（不做任何 I/O）
///
/// 服务器顺序：远程服务器、出站域名直连条目、地理分流条目；启用伪 DNS 时其条目总在最前。
pub fn dns_policy(
    settings: &ProxySettings,
    outbound_addrs: &[String],
    lookups: &StaticLookups,
    options: DnsOptions,
) -> DnsObject {
    let is_warp = options.family == Family::Warp;
    let is_fake_dns = settings.is_fake_dns(options.family);
    let is_ipv6 = settings.is_ipv6(options.family);
    let is_bypass = settings.is_bypass();

    let mut servers: Vec<DnsServer> = if options.workerless {
        vec![DnsServer::Address(WORKERLESS_REMOTE_DNS.to_string())]
    } else if is_warp {
        let mut warp_dns: Vec<&str> = WARP_REMOTE_DNS_V4.to_vec();
        if settings.warp_enable_ipv6 {
            warp_dns.extend(WARP_REMOTE_DNS_V6);
        }
        warp_dns.into_iter().map(|s| DnsServer::Address(s.to_string())).collect()
    } else {
        vec![DnsServer::Address(settings.remote_dns.clone())]
    };

    // 静态 hosts
    let mut hosts: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if settings.is_block() {
        for (enabled, category) in block_table(settings) {
            if enabled {
                hosts.insert(category.to_string(), vec![BLOCK_LOOPBACK.to_string()]);
            }
        }
    }

    // 固定域名使用隧道的 IPv6 开关
    if let Some((domain, ips)) = &lookups.pinned {
        hosts.insert(domain.clone(), ips.addresses(settings.enable_ipv6));
    }

    if let Some(server) = &settings.resolved_remote_dns.server {
        if !options.workerless && !is_warp {
            hosts.insert(server.clone(), settings.resolved_remote_dns.static_ips.clone());
        }
    }

    if options.workerless {
        let mut addresses: Vec<String> = lookups
            .workerless_fallback
            .iter()
            .flat_map(|r| r.ipv4.iter().cloned())
            .collect();
        if settings.enable_ipv6 {
            addresses.extend(
                lookups
                    .workerless_fallback
                    .iter()
                    .flat_map(|r| r.ipv6.iter().cloned()),
            );
        }
        hosts.insert(WORKERLESS_HOST_DOMAIN.to_string(), addresses);
    }

    // 出站地址中的域名必须经本地 DNS 解析
    let mut outbound_rules: Vec<String> = outbound_addrs
        .iter()
        .filter(|addr| is_domain(addr))
        .map(|domain| format!("full:{}", domain))
        .collect();
    if !outbound_rules.is_empty() {
        if options.balancer {
            outbound_rules.push(format!("full:{}", PROBE_DOMAIN));
        }
        servers.push(DnsServer::Scoped(ScopedDnsServer {
            address: settings.local_dns.clone(),
            domains: outbound_rules,
            expect_ips: None,
            skip_fallback: Some(true),
        }));
    }

    let mut geo_domains = Vec::new();
    if !options.workerless && is_bypass {
        let mut expect_ips = Vec::new();
        for (enabled, domain, ip) in geo_bypass_table(settings) {
            if enabled {
                geo_domains.push(domain.to_string());
                expect_ips.push(ip.to_string());
            }
        }
        servers.push(DnsServer::Scoped(ScopedDnsServer {
            address: settings.local_dns.clone(),
            domains: geo_domains.clone(),
            expect_ips: Some(expect_ips),
            skip_fallback: Some(true),
        }));
    }

    if is_fake_dns {
        let fake = if is_bypass && !options.workerless {
            DnsServer::Scoped(ScopedDnsServer {
                address: FAKE_DNS_SERVER.to_string(),
                domains: geo_domains,
                expect_ips: None,
                skip_fallback: None,
            })
        } else {
            DnsServer::Address(FAKE_DNS_SERVER.to_string())
        };
        servers.insert(0, fake);
    }

    DnsObject {
        hosts: if hosts.is_empty() { None } else { Some(hosts) },
        servers,
        query_strategy: if is_ipv6 { "UseIP" } else { "UseIPv4" }.to_string(),
        tag: "dns".to_string(),
    }
}

/// 完成所需的外部解析后组装 DNS 策略
///
/// 固定域名与回退域名的查询并发进行；任一失败则整体失败，不重试。
pub async fn build_dns(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    outbound_addrs: &[String],
    pinned_domain: Option<&str>,
    options: DnsOptions,
) -> Result<DnsObject> {
    let pinned = async {
        match pinned_domain {
            Some(domain) => resolver
                .resolve(domain)
                .await
                .map(|ips| Some((domain.to_string(), ips))),
            None => Ok(None),
        }
    };

    let fallback_domains: &[&str] = if options.workerless {
        &WORKERLESS_FALLBACK_DOMAINS
    } else {
        &[]
    };
    let fallback = try_join_all(fallback_domains.iter().map(|d| resolver.resolve(d)));

    let (pinned, workerless_fallback) = tokio::try_join!(pinned, fallback)?;

    debug!(
        pinned = pinned_domain.unwrap_or("-"),
        fallback_lookups = workerless_fallback.len(),
        workerless = options.workerless,
        "DNS lookups completed"
    );

    let lookups = StaticLookups {
        pinned,
        workerless_fallback,
    };
    Ok(dns_policy(settings, outbound_addrs, &lookups, options))
}
