// src/generator/template.rs
//
// 配置模板工厂与组装器

use std::collections::BTreeMap;

use crate::common::consts::{
    DEFAULT_BEST_INTERVAL, DEFAULT_FRAGMENT_PACKETS, FAKE_DNS_POOL_SIZE, FAKE_DNS_POOL_V4,
    FAKE_DNS_POOL_V6, FAKE_DNS_SERVER, PROBE_URL, TAG_BALANCER, TAG_BLOCK, TAG_CHAIN, TAG_DIRECT,
    TAG_DNS_IN, TAG_DNS_OUT, TAG_FRAGMENT, TAG_HTTP_IN, TAG_PREFIX_PROXY, TAG_SOCKS_IN, USER_LEVEL,
};
use crate::generator::model::{
    Balancer, BalancerStrategy, BlackholeResponse, BlackholeSettings, DnsObject, FakeDnsPool,
    Fragment, FreedomSettings, Inbound, InboundSettings, LevelPolicy, LogConfig, Observatory,
    Outbound, OutboundProtocol, Policy, Routing, Sniffing, Sockopt, Stats, StreamSettings,
    SystemPolicy, XrayConfig,
};
use crate::generator::settings::{Family, ProxySettings};

fn proxy_inbound(port: u16, protocol: &str, tag: &str) -> Inbound {
    Inbound {
        listen: None,
        port,
        protocol: protocol.to_string(),
        settings: InboundSettings {
            auth: Some("noauth".to_string()),
            udp: Some(true),
            user_level: Some(USER_LEVEL),
            ..Default::default()
        },
        sniffing: Some(Sniffing {
            dest_override: vec!["http".to_string(), "tls".to_string()],
            enabled: true,
            route_only: true,
        }),
        tag: tag.to_string(),
    }
}

/// 返回一份全新的配置骨架
///
/// 每次调用都构造独立的值，调用方可以随意修改。
pub fn base_config() -> XrayConfig {
    let mut levels = BTreeMap::new();
    levels.insert(
        USER_LEVEL.to_string(),
        LevelPolicy {
            conn_idle: 300,
            downlink_only: 1,
            handshake: 4,
            uplink_only: 1,
        },
    );

    XrayConfig {
        remarks: String::new(),
        log: LogConfig {
            loglevel: "warning".to_string(),
        },
        dns: DnsObject::default(),
        fakedns: Some(vec![
            FakeDnsPool {
                ip_pool: FAKE_DNS_POOL_V4.to_string(),
                pool_size: FAKE_DNS_POOL_SIZE,
            },
            FakeDnsPool {
                ip_pool: FAKE_DNS_POOL_V6.to_string(),
                pool_size: FAKE_DNS_POOL_SIZE,
            },
        ]),
        inbounds: vec![
            proxy_inbound(10808, "socks", TAG_SOCKS_IN),
            proxy_inbound(10809, "http", TAG_HTTP_IN),
            Inbound {
                listen: Some("127.0.0.1".to_string()),
                port: 10853,
                protocol: "dokodemo-door".to_string(),
                settings: InboundSettings {
                    address: Some("1.1.1.1".to_string()),
                    network: Some("tcp,udp".to_string()),
                    port: Some(53),
                    ..Default::default()
                },
                sniffing: None,
                tag: TAG_DNS_IN.to_string(),
            },
        ],
        outbounds: vec![
            Outbound {
                mux: None,
                protocol: OutboundProtocol::Freedom(FreedomSettings {
                    fragment: Some(Fragment {
                        packets: DEFAULT_FRAGMENT_PACKETS.to_string(),
                        length: String::new(),
                        interval: String::new(),
                    }),
                    domain_strategy: Some("UseIP".to_string()),
                }),
                stream_settings: Some(StreamSettings {
                    sockopt: Some(Sockopt {
                        tcp_keep_alive_idle: Some(100),
                        tcp_no_delay: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                tag: TAG_FRAGMENT.to_string(),
            },
            Outbound {
                mux: None,
                protocol: OutboundProtocol::Dns,
                stream_settings: None,
                tag: TAG_DNS_OUT.to_string(),
            },
            Outbound {
                mux: None,
                protocol: OutboundProtocol::Freedom(FreedomSettings::default()),
                stream_settings: None,
                tag: TAG_DIRECT.to_string(),
            },
            Outbound {
                mux: None,
                protocol: OutboundProtocol::Blackhole(BlackholeSettings {
                    response: BlackholeResponse {
                        kind: "http".to_string(),
                    },
                }),
                stream_settings: None,
                tag: TAG_BLOCK.to_string(),
            },
        ],
        policy: Policy {
            levels,
            system: SystemPolicy {
                stats_outbound_uplink: true,
                stats_outbound_downlink: true,
            },
        },
        routing: Routing {
            domain_strategy: "IPIfNonMatch".to_string(),
            rules: Vec::new(),
            balancers: Some(vec![Balancer {
                tag: TAG_BALANCER.to_string(),
                selector: vec![TAG_PREFIX_PROXY.to_string()],
                strategy: BalancerStrategy {
                    kind: "leastPing".to_string(),
                },
                fallback_tag: None,
            }]),
        },
        observatory: Some(Observatory {
            probe_interval: format!("{}s", DEFAULT_BEST_INTERVAL),
            probe_url: PROBE_URL.to_string(),
            subject_selector: vec![TAG_PREFIX_PROXY.to_string()],
            enable_concurrency: true,
        }),
        stats: Stats::default(),
    }
}

/// 负载均衡选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalancerOptions {
    // 候选为链式出站（chain-*）而非代理出站（prox-*）
    pub chain: bool,
    // 所有候选不可用时的回退标签
    pub fallback: Option<String>,
}

/// 组装选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    pub remark: String,
    pub fragment: bool,
    pub balancer: Option<BalancerOptions>,
    pub family: Family,
}

/// 在模板上叠加备注、伪 DNS 池、分片参数与负载均衡块
pub fn assemble(settings: &ProxySettings, options: &AssembleOptions) -> XrayConfig {
    let mut config = base_config();
    config.remarks = options.remark.clone();

    if settings.is_fake_dns(options.family) {
        for inbound in config.inbounds.iter_mut().take(2) {
            if let Some(sniffing) = inbound.sniffing.as_mut() {
                sniffing.dest_override.push(FAKE_DNS_SERVER.to_string());
            }
        }
        if !settings.is_ipv6(options.family) {
            if let Some(pools) = config.fakedns.as_mut() {
                pools.pop();
            }
        }
    } else {
        config.fakedns = None;
    }

    if options.fragment {
        if let Some(OutboundProtocol::Freedom(freedom)) = config
            .outbounds
            .iter_mut()
            .find(|o| o.tag == TAG_FRAGMENT)
            .map(|o| &mut o.protocol)
        {
            freedom.fragment = Some(Fragment {
                packets: settings.fragment_packets.clone(),
                length: format!("{}-{}", settings.length_min, settings.length_max),
                interval: format!("{}-{}", settings.interval_min, settings.interval_max),
            });
            freedom.domain_strategy =
                Some(if settings.enable_ipv6 { "UseIPv4v6" } else { "UseIPv4" }.to_string());
        }
    } else {
        config.outbounds.retain(|o| o.tag != TAG_FRAGMENT);
    }

    match &options.balancer {
        Some(balancer) => {
            let interval = match options.family {
                Family::Warp => settings.best_warp_interval,
                Family::Tunnel => settings.best_vless_trojan_interval,
            };
            let selector = if balancer.chain { TAG_CHAIN } else { TAG_PREFIX_PROXY };

            if let Some(observatory) = config.observatory.as_mut() {
                observatory.probe_interval = format!("{}s", interval);
                observatory.subject_selector = vec![selector.to_string()];
            }
            if let Some(first) = config.routing.balancers.as_mut().and_then(|b| b.first_mut()) {
                first.selector = vec![selector.to_string()];
                first.fallback_tag = balancer.fallback.clone();
            }
        }
        None => {
            config.observatory = None;
            config.routing.balancers = None;
        }
    }

    config
}
