// src/generator/scenario.rs
//
// 场景编排：按 协议 × 端口 × 地址 与 WireGuard 端点生成整批配置

use std::time::Instant;

use tracing::{debug, info};

use crate::common::consts::{
    BEST_FRAGMENT_INTERVAL, BEST_FRAGMENT_LENGTHS, DEFAULT_HTTPS_PORTS, TAG_CHAIN,
    TAG_FAKE_OUTBOUND, TAG_FRAGMENT, TAG_PREFIX_FRAGMENT, TAG_PREFIX_PROXY, TAG_PROXY,
};
use crate::common::error::{AppError, Result};
use crate::common::utils::{is_domain, random_upper_case};
use crate::generator::address::{config_addresses, endpoint_host, generate_remark};
use crate::generator::dns::{build_dns, DnsOptions};
use crate::generator::model::{Outbound, OutboundProtocol, XrayConfig};
use crate::generator::outbound::{
    build_tunnel_outbound, OutboundSpec, TunnelParams, TunnelProtocol, WarpClient,
};
use crate::generator::resolver::DnsResolver;
use crate::generator::routing::{build_routing_rules, RoutingOptions};
use crate::generator::settings::{
    ChainProxyParams, Family, ProxySettings, RequestContext, WarpAccount,
};
use crate::generator::template::{assemble, AssembleOptions, BalancerOptions};

const BEST_PING_REMARK: &str = "💦 BPB - Best Ping 💥";
const BEST_PING_FRAGMENT_REMARK: &str = "💦 BPB F - Best Ping 💥";
const BEST_FRAGMENT_REMARK: &str = "💦 BPB F - Best Fragment 😎";
const WORKERLESS_REMARK: &str = "💦 BPB F - WorkerLess ⭐";

// 负载均衡候选标签，例如 prox-3
fn pool_tag(prefix: &str, index: usize) -> String {
    format!("{}-{}", prefix, index)
}

// 复制出站并改为经由指定标签拨号
fn chained_copy(outbound: &Outbound, tag: String, dialer: String) -> Outbound {
    let mut copy = outbound.retagged(tag);
    copy.set_dialer_proxy(dialer);
    copy
}

/// 生成 VLESS/Trojan 整批配置
///
/// 顺序：每个单元一个文档，然后是最佳延迟文档；分片模式下再追加最佳分片与无 Worker 文档。
pub async fn build_custom_batch(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    ctx: &RequestContext,
    chain: Option<&ChainProxyParams>,
    fragment: bool,
) -> Result<Vec<XrayConfig>> {
    let started = Instant::now();
    let chain_outbound = chain.map(|params| OutboundSpec::Chain(params).build(ctx)).transpose()?;
    let is_chain = chain_outbound.is_some();

    let clean_ips = settings.clean_ip_list();
    let resolved = resolver.resolve(&ctx.host_name).await?;
    let addresses = config_addresses(&ctx.host_name, &resolved, &clean_ips, settings.enable_ipv6);
    let custom_cdn = settings.custom_cdn_list();

    // 分片模式不使用自定义 CDN，且只保留 HTTPS 端口
    let mut total_addresses = addresses;
    if !fragment {
        total_addresses.extend(custom_cdn.iter().cloned());
    }
    let ports: Vec<u16> = settings
        .ports
        .iter()
        .copied()
        .filter(|port| !fragment || DEFAULT_HTTPS_PORTS.contains(port))
        .collect();

    let mut protocols = Vec::new();
    if settings.vless_configs {
        protocols.push(TunnelProtocol::Vless);
    }
    if settings.trojan_configs {
        protocols.push(TunnelProtocol::Trojan);
    }

    let mut configs = Vec::new();
    let mut pool: Vec<Outbound> = Vec::new();
    let mut proxy_index = 1;

    for protocol in &protocols {
        let mut protocol_index = 1;
        for &port in &ports {
            for addr in &total_addresses {
                let is_custom = custom_cdn.contains(addr);
                let config_type = match (is_custom, fragment) {
                    (true, _) => "C",
                    (false, true) => "F",
                    (false, false) => "",
                };
                let sni = if is_custom {
                    settings.custom_cdn_sni.clone()
                } else {
                    random_upper_case(&ctx.host_name)
                };
                let host = if is_custom {
                    settings.custom_cdn_host.as_str()
                } else {
                    ctx.host_name.as_str()
                };

                let remark = generate_remark(
                    protocol_index,
                    port,
                    addr,
                    &clean_ips,
                    &protocol.to_string(),
                    config_type,
                );
                let mut config = assemble(
                    settings,
                    &AssembleOptions {
                        remark,
                        fragment,
                        balancer: None,
                        family: Family::Tunnel,
                    },
                );

                let cell = std::slice::from_ref(addr);
                config.dns = build_dns(resolver, settings, cell, None, DnsOptions::tunnel()).await?;
                config.routing.rules = build_routing_rules(
                    settings,
                    cell,
                    RoutingOptions {
                        chain: is_chain,
                        ..Default::default()
                    },
                );

                let params = TunnelParams {
                    tag: TAG_PROXY,
                    address: addr,
                    port,
                    host,
                    sni: &sni,
                    proxy_ip: &settings.proxy_ip,
                    fragment,
                    allow_insecure: is_custom,
                    enable_ipv6: settings.enable_ipv6,
                };
                let outbound = match protocol {
                    TunnelProtocol::Vless => OutboundSpec::Vless(params),
                    TunnelProtocol::Trojan => OutboundSpec::Trojan(params),
                }
                .build(ctx)?;

                // 文档出站顺序：[chain], proxy, 模板出站
                let mut head = Vec::with_capacity(2);
                if let Some(chain_outbound) = &chain_outbound {
                    head.push(chain_outbound.clone());
                    pool.push(chained_copy(
                        chain_outbound,
                        pool_tag(TAG_CHAIN, proxy_index),
                        pool_tag(TAG_PREFIX_PROXY, proxy_index),
                    ));
                }
                pool.push(outbound.retagged(pool_tag(TAG_PREFIX_PROXY, proxy_index)));
                head.push(outbound);
                config.outbounds.splice(0..0, head);

                debug!(
                    protocol = %protocol,
                    port = port,
                    address = %addr,
                    proxy_index = proxy_index,
                    "Generated connection config"
                );

                configs.push(config);
                proxy_index += 1;
                protocol_index += 1;
            }
        }
    }

    if pool.is_empty() {
        return Err(AppError::Settings(
            "No protocol, port and address combination is enabled".to_string(),
        ));
    }

    let cells = configs.len();
    configs.push(
        best_ping_config(resolver, settings, &total_addresses, is_chain, &pool, fragment).await?,
    );

    if fragment {
        configs.push(
            best_fragment_config(resolver, settings, ctx, chain_outbound.as_ref(), &pool).await?,
        );
        configs.push(workerless_config(resolver, settings, ctx).await?);
    }

    info!(
        fragment = fragment,
        chain = is_chain,
        protocols = protocols.len(),
        ports = ports.len(),
        addresses = total_addresses.len(),
        cells = cells,
        documents = configs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generated custom config batch"
    );

    Ok(configs)
}

// 最佳延迟文档：引用所有单元出站的负载均衡
async fn best_ping_config(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    total_addresses: &[String],
    is_chain: bool,
    pool: &[Outbound],
    fragment: bool,
) -> Result<XrayConfig> {
    let fallback_tag = pool_tag(if is_chain { TAG_CHAIN } else { TAG_PREFIX_PROXY }, 2);
    let fallback = pool
        .iter()
        .any(|o| o.tag == fallback_tag)
        .then_some(fallback_tag);

    let mut config = assemble(
        settings,
        &AssembleOptions {
            remark: if fragment { BEST_PING_FRAGMENT_REMARK } else { BEST_PING_REMARK }.to_string(),
            fragment,
            balancer: Some(BalancerOptions {
                chain: is_chain,
                fallback,
            }),
            family: Family::Tunnel,
        },
    );
    config.dns = build_dns(
        resolver,
        settings,
        total_addresses,
        None,
        DnsOptions {
            balancer: true,
            ..DnsOptions::tunnel()
        },
    )
    .await?;
    config.routing.rules = build_routing_rules(
        settings,
        total_addresses,
        RoutingOptions {
            chain: is_chain,
            balancer: true,
            workerless: false,
        },
    );
    config.outbounds.splice(0..0, pool.iter().cloned());
    Ok(config)
}

// 最佳分片文档：每个分片长度区间一组 [chain-i] -> prox-i -> frag-i
async fn best_fragment_config(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    ctx: &RequestContext,
    chain_outbound: Option<&Outbound>,
    pool: &[Outbound],
) -> Result<XrayConfig> {
    let is_chain = chain_outbound.is_some();
    let mut config = assemble(
        settings,
        &AssembleOptions {
            remark: BEST_FRAGMENT_REMARK.to_string(),
            fragment: true,
            balancer: Some(BalancerOptions {
                chain: is_chain,
                fallback: None,
            }),
            family: Family::Tunnel,
        },
    );
    config.dns = build_dns(
        resolver,
        settings,
        &[],
        Some(ctx.host_name.as_str()),
        DnsOptions {
            balancer: true,
            ..DnsOptions::tunnel()
        },
    )
    .await?;
    config.routing.rules = build_routing_rules(
        settings,
        &[],
        RoutingOptions {
            chain: is_chain,
            balancer: true,
            workerless: false,
        },
    );

    let fragment_position = config
        .outbounds
        .iter()
        .position(|o| o.tag == TAG_FRAGMENT)
        .ok_or_else(|| {
            AppError::Settings("Fragment outbound is missing from the template".to_string())
        })?;
    let fragment_outbound = config.outbounds.remove(fragment_position);
    let proxy_outbound = pool
        .get(usize::from(is_chain))
        .ok_or_else(|| {
            AppError::Settings("No proxy outbound available for fragment probing".to_string())
        })?;

    let mut candidates = Vec::with_capacity(BEST_FRAGMENT_LENGTHS.len() * 3);
    for (i, length) in BEST_FRAGMENT_LENGTHS.iter().enumerate() {
        let index = i + 1;
        if let Some(chain_outbound) = chain_outbound {
            candidates.push(chained_copy(
                chain_outbound,
                pool_tag(TAG_CHAIN, index),
                pool_tag(TAG_PREFIX_PROXY, index),
            ));
        }
        candidates.push(chained_copy(
            proxy_outbound,
            pool_tag(TAG_PREFIX_PROXY, index),
            pool_tag(TAG_PREFIX_FRAGMENT, index),
        ));

        let mut fragment = fragment_outbound.retagged(pool_tag(TAG_PREFIX_FRAGMENT, index));
        if let OutboundProtocol::Freedom(freedom) = &mut fragment.protocol {
            if let Some(probe) = freedom.fragment.as_mut() {
                probe.length = length.to_string();
                probe.interval = BEST_FRAGMENT_INTERVAL.to_string();
            }
        }
        candidates.push(fragment);
    }

    config.outbounds.splice(0..0, candidates);
    Ok(config)
}

// 无 Worker 文档：全部流量走分片出站，附带一个诱饵 VLESS 出站
async fn workerless_config(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    ctx: &RequestContext,
) -> Result<XrayConfig> {
    let mut config = assemble(
        settings,
        &AssembleOptions {
            remark: WORKERLESS_REMARK.to_string(),
            fragment: true,
            balancer: None,
            family: Family::Tunnel,
        },
    );
    config.dns = build_dns(
        resolver,
        settings,
        &[],
        None,
        DnsOptions {
            workerless: true,
            ..DnsOptions::tunnel()
        },
    )
    .await?;
    config.routing.rules = build_routing_rules(
        settings,
        &[],
        RoutingOptions {
            workerless: true,
            ..Default::default()
        },
    );

    let mut fake = build_tunnel_outbound(
        TunnelProtocol::Vless,
        ctx,
        &TunnelParams {
            tag: TAG_FAKE_OUTBOUND,
            address: "google.com",
            port: 443,
            host: "google.com",
            sni: "google.com",
            proxy_ip: "",
            fragment: false,
            allow_insecure: false,
            enable_ipv6: false,
        },
    );
    if let Some(stream) = fake.stream_settings.as_mut() {
        stream.sockopt = None;
        if let Some(ws) = stream.ws_settings.as_mut() {
            ws.path = Some("/".to_string());
        }
    }
    config.outbounds.push(fake);
    Ok(config)
}

/// 生成 WireGuard 整批配置
///
/// 顺序：所有 Warp 文档、所有 WoW 文档、Warp 最佳延迟、WoW 最佳延迟。
pub async fn build_warp_batch(
    resolver: &dyn DnsResolver,
    settings: &ProxySettings,
    accounts: &[WarpAccount],
    ctx: &RequestContext,
    client: WarpClient,
) -> Result<Vec<XrayConfig>> {
    let started = Instant::now();
    let endpoints = settings.warp_endpoint_list();
    if endpoints.is_empty() {
        return Err(AppError::Settings("No Warp endpoints configured".to_string()));
    }

    let indicator = match client {
        WarpClient::Nikang => " Pro ",
        WarpClient::Xray => " ",
    };
    let outbound_domains: Vec<String> = endpoints
        .iter()
        .map(|endpoint| endpoint_host(endpoint).to_string())
        .filter(|host| is_domain(host))
        .collect();
    let dns_options = DnsOptions {
        workerless: false,
        balancer: false,
        family: Family::Warp,
    };

    let mut warp_configs = Vec::with_capacity(endpoints.len());
    let mut wow_configs = Vec::with_capacity(endpoints.len());
    let mut warp_pool = Vec::with_capacity(endpoints.len());
    let mut wow_pool = Vec::with_capacity(endpoints.len());

    for (i, endpoint) in endpoints.iter().enumerate() {
        let index = i + 1;
        let cell = vec![endpoint_host(endpoint).to_string()];
        let dns = build_dns(resolver, settings, &cell, None, dns_options).await?;

        let mut warp = assemble(
            settings,
            &AssembleOptions {
                remark: format!("💦 {} - Warp{}🇮🇷", index, indicator),
                fragment: false,
                balancer: None,
                family: Family::Warp,
            },
        );
        let mut wow = assemble(
            settings,
            &AssembleOptions {
                remark: format!("💦 {} - WoW{}🌍", index, indicator),
                fragment: false,
                balancer: None,
                family: Family::Warp,
            },
        );
        warp.dns = dns.clone();
        wow.dns = dns;
        warp.routing.rules = build_routing_rules(settings, &cell, RoutingOptions::default());
        wow.routing.rules = build_routing_rules(
            settings,
            &cell,
            RoutingOptions {
                chain: true,
                ..Default::default()
            },
        );

        let warp_outbound = OutboundSpec::Wireguard {
            settings,
            accounts,
            endpoint: endpoint.as_str(),
            is_chain: false,
            client,
        }
        .build(ctx)?;
        let wow_outbound = OutboundSpec::Wireguard {
            settings,
            accounts,
            endpoint: endpoint.as_str(),
            is_chain: true,
            client,
        }
        .build(ctx)?;

        warp.outbounds.insert(0, warp_outbound.clone());
        wow.outbounds
            .splice(0..0, [wow_outbound.clone(), warp_outbound.clone()]);

        warp_pool.push(warp_outbound.retagged(pool_tag(TAG_PREFIX_PROXY, index)));
        wow_pool.push(chained_copy(
            &wow_outbound,
            pool_tag(TAG_CHAIN, index),
            pool_tag(TAG_PREFIX_PROXY, index),
        ));

        debug!(endpoint = %endpoint, index = index, "Generated Warp configs");
        warp_configs.push(warp);
        wow_configs.push(wow);
    }

    let best_dns = build_dns(
        resolver,
        settings,
        &outbound_domains,
        None,
        DnsOptions {
            balancer: true,
            ..dns_options
        },
    )
    .await?;

    let mut warp_best = assemble(
        settings,
        &AssembleOptions {
            remark: format!("💦 Warp{}- Best Ping 🚀", indicator),
            fragment: false,
            balancer: Some(BalancerOptions::default()),
            family: Family::Warp,
        },
    );
    warp_best.dns = best_dns.clone();
    warp_best.routing.rules = build_routing_rules(
        settings,
        &outbound_domains,
        RoutingOptions {
            balancer: true,
            ..Default::default()
        },
    );
    warp_best.outbounds.splice(0..0, warp_pool.iter().cloned());

    let mut wow_best = assemble(
        settings,
        &AssembleOptions {
            remark: format!("💦 WoW{}- Best Ping 🚀", indicator),
            fragment: false,
            balancer: Some(BalancerOptions {
                chain: true,
                fallback: None,
            }),
            family: Family::Warp,
        },
    );
    wow_best.dns = best_dns;
    wow_best.routing.rules = build_routing_rules(
        settings,
        &outbound_domains,
        RoutingOptions {
            chain: true,
            balancer: true,
            workerless: false,
        },
    );
    wow_best
        .outbounds
        .splice(0..0, wow_pool.into_iter().chain(warp_pool));

    let mut configs = warp_configs;
    configs.append(&mut wow_configs);
    configs.push(warp_best);
    configs.push(wow_best);

    info!(
        client = %client,
        endpoints = endpoints.len(),
        documents = configs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generated Warp config batch"
    );

    Ok(configs)
}
