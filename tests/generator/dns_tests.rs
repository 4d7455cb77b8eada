// tests/generator/dns_tests.rs

#[cfg(test)]
mod tests {
    use oxide_xgen::common::error::AppError;
    use oxide_xgen::generator::dns::{build_dns, dns_policy, DnsOptions, StaticLookups};
    use oxide_xgen::generator::model::DnsServer;
    use oxide_xgen::generator::resolver::ResolvedIps;
    use oxide_xgen::generator::settings::{Family, ProxySettings, ResolvedRemoteDns};

    use crate::generator::{FailingResolver, StaticResolver, TEST_HOST};

    fn addrs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn scoped(server: &DnsServer) -> &oxide_xgen::generator::model::ScopedDnsServer {
        match server {
            DnsServer::Scoped(scoped) => scoped,
            other => panic!("expected scoped server, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_and_local_servers_for_domain_outbound() {
        let settings = ProxySettings::default();
        let dns = dns_policy(&settings, &addrs(&[TEST_HOST]), &StaticLookups::default(), DnsOptions::tunnel());

        assert_eq!(dns.servers.len(), 2);
        assert_eq!(dns.servers[0], DnsServer::Address(settings.remote_dns.clone()));
        let local = scoped(&dns.servers[1]);
        assert_eq!(local.address, settings.local_dns);
        assert_eq!(local.domains, vec![format!("full:{}", TEST_HOST)]);
        assert_eq!(local.skip_fallback, Some(true));
        assert_eq!(dns.query_strategy, "UseIP");
        assert_eq!(dns.tag, "dns");
        assert!(dns.hosts.is_none());
    }

    #[test]
    fn test_ip_outbound_has_no_local_server() {
        let settings = ProxySettings {
            enable_ipv6: false,
            ..Default::default()
        };
        let dns = dns_policy(&settings, &addrs(&["104.16.1.1"]), &StaticLookups::default(), DnsOptions::tunnel());

        assert_eq!(dns.servers.len(), 1);
        assert_eq!(dns.query_strategy, "UseIPv4");
    }

    #[test]
    fn test_balancer_adds_probe_domain() {
        let settings = ProxySettings::default();
        let options = DnsOptions {
            balancer: true,
            ..DnsOptions::tunnel()
        };
        let dns = dns_policy(&settings, &addrs(&[TEST_HOST]), &StaticLookups::default(), options);

        let local = scoped(&dns.servers[1]);
        assert_eq!(local.domains.last().map(String::as_str), Some("full:www.gstatic.com"));
    }

    #[test]
    fn test_fake_dns_with_bypass_is_first_and_scoped() {
        let settings = ProxySettings {
            vless_trojan_fake_dns: true,
            bypass_iran: true,
            bypass_russia: true,
            ..Default::default()
        };
        let dns = dns_policy(&settings, &addrs(&["104.16.1.1"]), &StaticLookups::default(), DnsOptions::tunnel());

        let fake = scoped(&dns.servers[0]);
        assert_eq!(fake.address, "fakedns");
        assert_eq!(fake.domains, vec!["geosite:category-ir", "geosite:category-ru"]);

        let geo = scoped(dns.servers.last().unwrap());
        assert_eq!(geo.address, settings.local_dns);
        assert_eq!(geo.expect_ips, Some(vec!["geoip:ir".to_string(), "geoip:ru".to_string()]));
    }

    #[test]
    fn test_fake_dns_without_bypass_is_plain_address() {
        let settings = ProxySettings {
            vless_trojan_fake_dns: true,
            ..Default::default()
        };
        let dns = dns_policy(&settings, &[], &StaticLookups::default(), DnsOptions::tunnel());
        assert_eq!(dns.servers[0], DnsServer::Address("fakedns".to_string()));
        assert_eq!(dns.servers.len(), 2);
    }

    #[test]
    fn test_warp_family_servers_follow_warp_ipv6() {
        let settings = ProxySettings {
            warp_enable_ipv6: false,
            warp_fake_dns: true,
            ..Default::default()
        };
        let options = DnsOptions {
            family: Family::Warp,
            ..DnsOptions::tunnel()
        };
        let dns = dns_policy(&settings, &[], &StaticLookups::default(), options);

        let servers: Vec<&str> = dns.servers.iter().map(DnsServer::address).collect();
        assert_eq!(servers, vec!["fakedns", "1.1.1.1", "1.0.0.1"]);
        assert_eq!(dns.query_strategy, "UseIPv4");

        let with_v6 = dns_policy(&ProxySettings::default(), &[], &StaticLookups::default(), options);
        assert_eq!(with_v6.servers.len(), 4);
    }

    #[test]
    fn test_block_and_resolved_remote_hosts() {
        let settings = ProxySettings {
            block_ads: true,
            resolved_remote_dns: ResolvedRemoteDns {
                server: Some("dns.example.com".to_string()),
                static_ips: vec!["9.9.9.9".to_string()],
            },
            ..Default::default()
        };
        let dns = dns_policy(&settings, &[], &StaticLookups::default(), DnsOptions::tunnel());
        let hosts = dns.hosts.expect("hosts present");

        assert_eq!(hosts["geosite:category-ads-all"], vec!["127.0.0.1"]);
        assert_eq!(hosts["geosite:category-ads-ir"], vec!["127.0.0.1"]);
        assert_eq!(hosts["dns.example.com"], vec!["9.9.9.9"]);
        assert!(!hosts.contains_key("geosite:category-porn"));

        // WireGuard 文档不使用预解析的远程 DNS
        let warp = dns_policy(
            &settings,
            &[],
            &StaticLookups::default(),
            DnsOptions {
                family: Family::Warp,
                ..DnsOptions::tunnel()
            },
        );
        assert!(!warp.hosts.unwrap().contains_key("dns.example.com"));
    }

    #[test]
    fn test_pinned_domain_respects_ipv6_switch() {
        let lookups = StaticLookups {
            pinned: Some((
                TEST_HOST.to_string(),
                ResolvedIps {
                    ipv4: vec!["104.16.1.1".to_string()],
                    ipv6: vec!["2606:4700::1".to_string()],
                },
            )),
            workerless_fallback: Vec::new(),
        };
        let settings = ProxySettings {
            enable_ipv6: false,
            ..Default::default()
        };
        let dns = dns_policy(&settings, &[], &lookups, DnsOptions::tunnel());
        assert_eq!(dns.hosts.unwrap()[TEST_HOST], vec!["104.16.1.1"]);
    }

    #[tokio::test]
    async fn test_build_dns_workerless_resolves_fallback_domains() {
        let resolver = StaticResolver::default()
            .with("cloudflare-dns.com", &["104.16.248.249"], &["2606:4700::6810:f8f9"])
            .with("cloudflare.com", &["104.16.132.229"], &[])
            .with("dash.cloudflare.com", &["104.17.110.184"], &[]);
        let settings = ProxySettings {
            bypass_china: true,
            ..Default::default()
        };
        let options = DnsOptions {
            workerless: true,
            ..DnsOptions::tunnel()
        };

        let dns = build_dns(&resolver, &settings, &[], None, options).await.unwrap();

        assert_eq!(resolver.calls(), 3);
        assert_eq!(dns.servers, vec![DnsServer::Address("https://cloudflare-dns.com/dns-query".to_string())]);
        assert_eq!(
            dns.hosts.unwrap()["cloudflare-dns.com"],
            vec!["104.16.248.249", "104.16.132.229", "104.17.110.184", "2606:4700::6810:f8f9"]
        );
    }

    #[tokio::test]
    async fn test_build_dns_pins_domain() {
        let resolver = StaticResolver::default().with(TEST_HOST, &["104.16.1.1"], &["2606:4700::1"]);
        let settings = ProxySettings::default();

        let dns = build_dns(&resolver, &settings, &[], Some(TEST_HOST), DnsOptions::tunnel())
            .await
            .unwrap();

        assert_eq!(resolver.calls(), 1);
        assert_eq!(dns.hosts.unwrap()[TEST_HOST], vec!["104.16.1.1", "2606:4700::1"]);
    }

    #[tokio::test]
    async fn test_build_dns_without_lookups_skips_resolver() {
        let dns = build_dns(&FailingResolver, &ProxySettings::default(), &[], None, DnsOptions::tunnel()).await;
        assert!(dns.is_ok());
    }

    #[tokio::test]
    async fn test_build_dns_propagates_resolution_failure() {
        let result = build_dns(
            &FailingResolver,
            &ProxySettings::default(),
            &[],
            Some(TEST_HOST),
            DnsOptions::tunnel(),
        )
        .await;
        assert!(matches!(result, Err(AppError::DnsResolve(_))));
    }
}
