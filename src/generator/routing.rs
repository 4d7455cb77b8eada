// src/generator/routing.rs

use crate::common::consts::{
    BLOCKED_IPS, TAG_BALANCER, TAG_BLOCK, TAG_CHAIN, TAG_DIRECT, TAG_DNS_IN, TAG_DNS_OUT,
    TAG_FRAGMENT, TAG_HTTP_IN, TAG_PROXY, TAG_SOCKS_IN,
};
use crate::common::utils::is_domain;
use crate::generator::model::{RoutingRule, RuleTarget};
use crate::generator::settings::ProxySettings;

// 分流/阻断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeoAction {
    Direct,
    Block,
}

struct GeoEntry {
    enabled: bool,
    action: GeoAction,
    domain: &'static str,
    ip: Option<&'static str>,
}

fn geo_table(settings: &ProxySettings) -> [GeoEntry; 7] {
    use GeoAction::*;
    [
        GeoEntry {
            enabled: settings.bypass_lan,
            action: Direct,
            domain: "geosite:private",
            ip: Some("geoip:private"),
        },
        GeoEntry {
            enabled: settings.bypass_iran,
            action: Direct,
            domain: "geosite:category-ir",
            ip: Some("geoip:ir"),
        },
        GeoEntry {
            enabled: settings.bypass_china,
            action: Direct,
            domain: "geosite:cn",
            ip: Some("geoip:cn"),
        },
        GeoEntry {
            enabled: settings.bypass_russia,
            action: Direct,
            domain: "geosite:category-ru",
            ip: Some("geoip:ru"),
        },
        GeoEntry {
            enabled: settings.block_ads,
            action: Block,
            domain: "geosite:category-ads-all",
            ip: None,
        },
        GeoEntry {
            enabled: settings.block_ads,
            action: Block,
            domain: "geosite:category-ads-ir",
            ip: None,
        },
        GeoEntry {
            enabled: settings.block_porn,
            action: Block,
            domain: "geosite:category-porn",
            ip: None,
        },
    ]
}

/// 路由构建选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingOptions {
    // 文档包含链式代理
    pub chain: bool,
    // 兜底规则指向负载均衡器
    pub balancer: bool,
    // 无 Worker 回退模式
    pub workerless: bool,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 生成有序路由规则（首个匹配生效）
pub fn build_routing_rules(
    settings: &ProxySettings,
    outbound_addrs: &[String],
    options: RoutingOptions,
) -> Vec<RoutingRule> {
    let is_bypass = settings.is_bypass();
    let is_block = settings.is_block();
    let has_outbound_domain = outbound_addrs.iter().any(|addr| is_domain(addr));

    let mut rules = vec![
        RoutingRule {
            inbound_tag: Some(vec![TAG_DNS_IN.to_string()]),
            ..RoutingRule::field(RuleTarget::Outbound(TAG_DNS_OUT.to_string()))
        },
        RoutingRule {
            inbound_tag: Some(to_strings(&[TAG_SOCKS_IN, TAG_HTTP_IN])),
            port: Some("53".to_string()),
            ..RoutingRule::field(RuleTarget::Outbound(TAG_DNS_OUT.to_string()))
        },
    ];

    if !options.workerless && (has_outbound_domain || is_bypass) {
        rules.push(RoutingRule {
            ip: Some(vec![settings.local_dns.clone()]),
            port: Some("53".to_string()),
            network: Some("udp".to_string()),
            ..RoutingRule::field(RuleTarget::Outbound(TAG_DIRECT.to_string()))
        });
    }

    if is_bypass || is_block {
        let mut direct_domains = Vec::new();
        let mut direct_ips = Vec::new();
        let mut block_domains = Vec::new();

        for entry in geo_table(settings).iter().filter(|e| e.enabled) {
            match entry.action {
                GeoAction::Direct => {
                    direct_domains.push(entry.domain.to_string());
                    direct_ips.extend(entry.ip.map(str::to_string));
                }
                GeoAction::Block => block_domains.push(entry.domain.to_string()),
            }
        }

        // 无 Worker 模式没有本地直连
        if !options.workerless && is_bypass {
            rules.push(RoutingRule {
                domain: Some(direct_domains),
                ..RoutingRule::field(RuleTarget::Outbound(TAG_DIRECT.to_string()))
            });
            rules.push(RoutingRule {
                ip: Some(direct_ips),
                ..RoutingRule::field(RuleTarget::Outbound(TAG_DIRECT.to_string()))
            });
        }

        if is_block {
            rules.push(RoutingRule {
                domain: Some(block_domains),
                ..RoutingRule::field(RuleTarget::Outbound(TAG_BLOCK.to_string()))
            });
        }
    }

    if settings.block_udp443 {
        rules.push(RoutingRule {
            network: Some("udp".to_string()),
            port: Some("443".to_string()),
            ..RoutingRule::field(RuleTarget::Outbound(TAG_BLOCK.to_string()))
        });
    }

    rules.push(RoutingRule {
        ip: Some(to_strings(&BLOCKED_IPS)),
        ..RoutingRule::field(RuleTarget::Outbound(TAG_BLOCK.to_string()))
    });

    let target = if options.balancer {
        RuleTarget::Balancer(TAG_BALANCER.to_string())
    } else if options.chain {
        RuleTarget::Outbound(TAG_CHAIN.to_string())
    } else if options.workerless {
        RuleTarget::Outbound(TAG_FRAGMENT.to_string())
    } else {
        RuleTarget::Outbound(TAG_PROXY.to_string())
    };
    rules.push(RoutingRule {
        network: Some("tcp,udp".to_string()),
        ..RoutingRule::field(target)
    });

    rules
}
