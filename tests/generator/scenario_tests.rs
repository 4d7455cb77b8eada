// tests/generator/scenario_tests.rs

#[cfg(test)]
mod tests {
    use oxide_xgen::common::error::AppError;
    use oxide_xgen::generator::model::{render_batch, DnsServer, OutboundProtocol, XrayConfig};
    use oxide_xgen::generator::outbound::WarpClient;
    use oxide_xgen::generator::scenario::{build_custom_batch, build_warp_batch};
    use oxide_xgen::generator::settings::{ChainProxyParams, ProxySettings};
    use serde_json::json;
    use tracing::info;

    use crate::generator::{test_context, test_warp_accounts, FailingResolver, StaticResolver, TEST_HOST};

    fn tags(config: &XrayConfig) -> Vec<&str> {
        config.outbounds.iter().map(|o| o.tag.as_str()).collect()
    }

    fn last_target(config: &XrayConfig) -> Option<&str> {
        config.routing.rules.last().and_then(|rule| rule.outbound_tag())
    }

    fn assert_consistent(configs: &[XrayConfig]) {
        for config in configs {
            assert!(
                config.unresolved_tags().is_empty(),
                "{}: {:?}",
                config.remarks,
                config.unresolved_tags()
            );
        }
    }

    fn socks_chain() -> ChainProxyParams {
        serde_json::from_value(json!({
            "protocol": "socks",
            "host": "10.0.0.5",
            "port": 1080,
            "user": "alice",
            "pass": "secret"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_protocol_batch() {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
        info!("Starting test: test_single_protocol_batch");

        let resolver = StaticResolver::default();
        let settings = ProxySettings::default();
        let configs = build_custom_batch(&resolver, &settings, &test_context(), None, false)
            .await
            .unwrap();

        // 主机名与测速域名各一个单元，再加最佳延迟文档
        assert_eq!(configs.len(), 3);
        assert_eq!(resolver.calls(), 1);
        assert_eq!(configs[0].remarks, "💦 1 - VLESS - Domain : 443");
        assert_eq!(configs[1].remarks, "💦 2 - VLESS - Domain : 443");
        assert_eq!(tags(&configs[0]), vec!["proxy", "dns-out", "direct", "block"]);
        assert_eq!(last_target(&configs[0]), Some("proxy"));

        let best = &configs[2];
        assert_eq!(best.remarks, "💦 BPB - Best Ping 💥");
        assert_eq!(&tags(best)[..2], &["prox-1", "prox-2"]);
        let balancer = &best.routing.balancers.as_ref().unwrap()[0];
        assert_eq!(balancer.selector, vec!["prox"]);
        assert_eq!(balancer.fallback_tag.as_deref(), Some("prox-2"));
        assert!(best.observatory.is_some());

        match &best.dns.servers[1] {
            DnsServer::Scoped(local) => assert_eq!(
                local.domains,
                vec![
                    format!("full:{}", TEST_HOST),
                    "full:www.speedtest.net".to_string(),
                    "full:www.gstatic.com".to_string(),
                ]
            ),
            other => panic!("unexpected dns server: {:?}", other),
        }

        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_batch_size_is_protocols_ports_addresses() {
        let resolver = StaticResolver::default().with(TEST_HOST, &["104.16.1.1"], &[]);
        let settings = ProxySettings {
            trojan_configs: true,
            ports: vec![443, 80],
            ..Default::default()
        };
        let configs = build_custom_batch(&resolver, &settings, &test_context(), None, false)
            .await
            .unwrap();

        assert_eq!(configs.len(), 2 * 2 * 3 + 1);
        assert_eq!(configs[3].remarks, "💦 4 - VLESS - Domain : 80");
        assert_eq!(configs[2].remarks, "💦 3 - VLESS - IPv4 : 443");
        // 每个协议的序号重新开始
        assert_eq!(configs[6].remarks, "💦 1 - Trojan - Domain : 443");

        let plain = configs[3].outbound("proxy").unwrap();
        assert_eq!(plain.stream_settings.as_ref().unwrap().security.as_deref(), Some("none"));

        let best = configs.last().unwrap();
        assert!(best.outbound("prox-12").is_some());
        assert!(best.outbound("prox-13").is_none());
        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_custom_cdn_cells() {
        let settings = ProxySettings {
            custom_cdn_addrs: "cdn.example.net".to_string(),
            custom_cdn_host: "cdn-host.example.net".to_string(),
            custom_cdn_sni: "cdn-sni.example.net".to_string(),
            ..Default::default()
        };
        let configs = build_custom_batch(&StaticResolver::default(), &settings, &test_context(), None, false)
            .await
            .unwrap();

        assert_eq!(configs.len(), 4);
        let cdn = &configs[2];
        assert_eq!(cdn.remarks, "💦 3 - VLESS C - Domain : 443");

        let stream = cdn.outbound("proxy").unwrap().stream_settings.as_ref().unwrap();
        let tls = stream.tls_settings.as_ref().unwrap();
        assert!(tls.allow_insecure);
        assert_eq!(tls.server_name.as_deref(), Some("cdn-sni.example.net"));
        assert_eq!(stream.ws_settings.as_ref().unwrap().headers["Host"], "cdn-host.example.net");

        // 普通单元使用 Worker 主机名作为 SNI（大小写随机）
        let worker = configs[0].outbound("proxy").unwrap().stream_settings.as_ref().unwrap();
        let sni = worker.tls_settings.as_ref().unwrap().server_name.as_deref().unwrap();
        assert_eq!(sni.to_ascii_lowercase(), TEST_HOST);
        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_chain_proxy_documents() {
        let chain = socks_chain();
        let configs = build_custom_batch(
            &StaticResolver::default(),
            &ProxySettings::default(),
            &test_context(),
            Some(&chain),
            false,
        )
        .await
        .unwrap();

        assert_eq!(configs.len(), 3);
        assert_eq!(tags(&configs[0]), vec!["chain", "proxy", "dns-out", "direct", "block"]);
        assert_eq!(last_target(&configs[0]), Some("chain"));
        assert_eq!(configs[0].outbound("chain").unwrap().dialer_proxy(), Some("proxy"));

        let best = &configs[2];
        assert_eq!(&tags(best)[..4], &["chain-1", "prox-1", "chain-2", "prox-2"]);
        assert_eq!(best.outbound("chain-2").unwrap().dialer_proxy(), Some("prox-2"));
        let balancer = &best.routing.balancers.as_ref().unwrap()[0];
        assert_eq!(balancer.selector, vec!["chain"]);
        assert_eq!(balancer.fallback_tag.as_deref(), Some("chain-2"));
        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_fragment_batch() {
        let resolver = StaticResolver::default().with(TEST_HOST, &["104.16.1.1"], &[]);
        let settings = ProxySettings {
            ports: vec![443, 80],
            custom_cdn_addrs: "cdn.example.net".to_string(),
            ..Default::default()
        };
        let configs = build_custom_batch(&resolver, &settings, &test_context(), None, true)
            .await
            .unwrap();

        // 只保留 HTTPS 端口且不使用自定义 CDN：3 个单元 + 3 个汇总文档
        assert_eq!(configs.len(), 6);
        assert_eq!(configs[0].remarks, "💦 1 - VLESS F - Domain : 443");
        assert_eq!(configs[0].outbound("proxy").unwrap().dialer_proxy(), Some("fragment"));
        assert!(configs[0].outbound("fragment").is_some());

        assert_eq!(configs[3].remarks, "💦 BPB F - Best Ping 💥");

        let best_fragment = &configs[4];
        assert_eq!(best_fragment.remarks, "💦 BPB F - Best Fragment 😎");
        assert_eq!(best_fragment.outbounds.len(), 18 * 2 + 3);
        assert_eq!(&tags(best_fragment)[..3], &["prox-1", "frag-1", "prox-2"]);
        assert!(best_fragment.outbound("fragment").is_none());
        assert_eq!(best_fragment.outbound("prox-1").unwrap().dialer_proxy(), Some("frag-1"));
        for (tag, length) in [("frag-1", "10-20"), ("frag-18", "100-200")] {
            match &best_fragment.outbound(tag).unwrap().protocol {
                OutboundProtocol::Freedom(freedom) => {
                    let params = freedom.fragment.as_ref().unwrap();
                    assert_eq!(params.length, length);
                    assert_eq!(params.interval, "1-1");
                }
                other => panic!("unexpected protocol: {:?}", other),
            }
        }
        assert_eq!(best_fragment.dns.hosts.as_ref().unwrap()[TEST_HOST], vec!["104.16.1.1"]);

        let workerless = &configs[5];
        assert_eq!(workerless.remarks, "💦 BPB F - WorkerLess ⭐");
        assert_eq!(last_target(workerless), Some("fragment"));
        assert_eq!(tags(workerless).last(), Some(&"fake-outbound"));
        assert_eq!(
            workerless.dns.servers[0],
            DnsServer::Address("https://cloudflare-dns.com/dns-query".to_string())
        );
        assert!(workerless.routing.balancers.is_none());

        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_fragment_batch_with_chain() {
        let chain = socks_chain();
        let configs = build_custom_batch(
            &StaticResolver::default(),
            &ProxySettings::default(),
            &test_context(),
            Some(&chain),
            true,
        )
        .await
        .unwrap();

        let best_fragment = &configs[3];
        assert_eq!(best_fragment.outbounds.len(), 18 * 3 + 3);
        assert_eq!(&tags(best_fragment)[..3], &["chain-1", "prox-1", "frag-1"]);
        assert_eq!(last_target(&configs[0]), Some("chain"));
        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_empty_cell_matrix_is_error() {
        let no_protocols = ProxySettings {
            vless_configs: false,
            ..Default::default()
        };
        let result = build_custom_batch(&StaticResolver::default(), &no_protocols, &test_context(), None, false).await;
        assert!(matches!(result, Err(AppError::Settings(_))));

        // 分片模式下没有 HTTPS 端口
        let plain_ports = ProxySettings {
            ports: vec![80, 8080],
            ..Default::default()
        };
        let result = build_custom_batch(&StaticResolver::default(), &plain_ports, &test_context(), None, true).await;
        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts_batch() {
        let result = build_custom_batch(&FailingResolver, &ProxySettings::default(), &test_context(), None, false).await;
        assert!(matches!(result, Err(AppError::DnsResolve(_))));
    }

    #[tokio::test]
    async fn test_warp_batch_order_and_pools() {
        let settings = ProxySettings {
            warp_endpoints: "162.159.192.1:2408,engage.cloudflareclient.com:2408".to_string(),
            ..Default::default()
        };
        let accounts = test_warp_accounts();
        let configs = build_warp_batch(&StaticResolver::default(), &settings, &accounts, &test_context(), WarpClient::Xray)
            .await
            .unwrap();

        let remarks: Vec<&str> = configs.iter().map(|c| c.remarks.as_str()).collect();
        assert_eq!(
            remarks,
            vec![
                "💦 1 - Warp 🇮🇷",
                "💦 2 - Warp 🇮🇷",
                "💦 1 - WoW 🌍",
                "💦 2 - WoW 🌍",
                "💦 Warp - Best Ping 🚀",
                "💦 WoW - Best Ping 🚀",
            ]
        );

        assert_eq!(tags(&configs[0]), vec!["proxy", "dns-out", "direct", "block"]);
        assert_eq!(tags(&configs[2]), vec!["chain", "proxy", "dns-out", "direct", "block"]);
        assert_eq!(last_target(&configs[2]), Some("chain"));

        let warp_best = &configs[4];
        assert_eq!(&tags(warp_best)[..2], &["prox-1", "prox-2"]);
        assert!(warp_best.routing.balancers.as_ref().unwrap()[0].fallback_tag.is_none());

        let wow_best = &configs[5];
        assert_eq!(&tags(wow_best)[..4], &["chain-1", "chain-2", "prox-1", "prox-2"]);
        assert_eq!(wow_best.outbound("chain-1").unwrap().dialer_proxy(), Some("prox-1"));
        assert_eq!(wow_best.routing.balancers.as_ref().unwrap()[0].selector, vec!["chain"]);
        assert_eq!(warp_best.dns, wow_best.dns);

        // 只有域名端点需要本地解析
        match warp_best.dns.servers.last().unwrap() {
            DnsServer::Scoped(local) => assert_eq!(
                local.domains,
                vec!["full:engage.cloudflareclient.com", "full:www.gstatic.com"]
            ),
            other => panic!("unexpected dns server: {:?}", other),
        }

        assert_consistent(&configs);
    }

    #[tokio::test]
    async fn test_warp_batch_nikang_remarks() {
        let settings = ProxySettings::default();
        let configs = build_warp_batch(
            &StaticResolver::default(),
            &settings,
            &test_warp_accounts(),
            &test_context(),
            WarpClient::Nikang,
        )
        .await
        .unwrap();

        assert_eq!(configs.len(), 4);
        assert_eq!(configs[0].remarks, "💦 1 - Warp Pro 🇮🇷");
        assert_eq!(configs[3].remarks, "💦 WoW Pro - Best Ping 🚀");
    }

    #[tokio::test]
    async fn test_warp_batch_requires_endpoints_and_accounts() {
        let no_endpoints = ProxySettings {
            warp_endpoints: " ".to_string(),
            ..Default::default()
        };
        let result = build_warp_batch(
            &StaticResolver::default(),
            &no_endpoints,
            &test_warp_accounts(),
            &test_context(),
            WarpClient::Xray,
        )
        .await;
        assert!(matches!(result, Err(AppError::Settings(_))));

        let result = build_warp_batch(
            &StaticResolver::default(),
            &ProxySettings::default(),
            &[],
            &test_context(),
            WarpClient::Xray,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_render_batch_uses_four_space_indent() {
        let configs = build_custom_batch(
            &StaticResolver::default(),
            &ProxySettings::default(),
            &test_context(),
            None,
            false,
        )
        .await
        .unwrap();

        let body = render_batch(&configs).unwrap();
        assert!(body.starts_with("[\n    {\n        \"remarks\": \"💦 1 - VLESS - Domain : 443\""));

        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        let documents = parsed.as_array().unwrap();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0]["outbounds"][0]["protocol"], "vless");
        assert_eq!(documents[0]["outbounds"][1]["protocol"], "dns");
        assert!(documents[0]["outbounds"][1].get("settings").is_none());
    }
}
