// tests/generator/settings_tests.rs

#[cfg(test)]
mod tests {
    use oxide_xgen::generator::settings::{
        ChainProxyParams, ChainSecurity, ChainTransport, Dataset, Family, ProxySettings,
        WireguardParams,
    };
    use serde_json::json;

    use crate::generator::test_warp_accounts;

    #[test]
    fn test_proxy_settings_defaults_for_missing_fields() {
        let settings: ProxySettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, ProxySettings::default());
        assert_eq!(settings.ports, vec![443]);
        assert!(settings.vless_configs);
        assert!(!settings.trojan_configs);
    }

    #[test]
    fn test_proxy_settings_accepts_numbers_as_text() {
        let settings: ProxySettings = serde_json::from_value(json!({
            "lengthMin": "50",
            "lengthMax": 150,
            "bestVLESSTrojanInterval": "45",
            "ports": ["443", 2053, "80"],
            "enableIPv6": false,
            "vlessTrojanFakeDNS": true,
        }))
        .unwrap();

        assert_eq!(settings.length_min, 50);
        assert_eq!(settings.length_max, 150);
        assert_eq!(settings.best_vless_trojan_interval, 45);
        assert_eq!(settings.ports, vec![443, 2053, 80]);
        assert!(!settings.is_ipv6(Family::Tunnel));
        assert!(settings.is_ipv6(Family::Warp));
        assert!(settings.is_fake_dns(Family::Tunnel));
        assert!(!settings.is_fake_dns(Family::Warp));
    }

    #[test]
    fn test_proxy_settings_rejects_invalid_port() {
        let result: Result<ProxySettings, _> = serde_json::from_value(json!({ "ports": ["70000"] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_fields_are_split_and_trimmed() {
        let settings = ProxySettings {
            clean_ips: " 1.1.1.1 , ,8.8.8.8".to_string(),
            custom_cdn_addrs: "cdn.example.net".to_string(),
            warp_endpoints: "162.159.192.1:2408, engage.cloudflareclient.com:2408".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.clean_ip_list(), vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(settings.custom_cdn_list(), vec!["cdn.example.net"]);
        assert_eq!(settings.warp_endpoint_list().len(), 2);
    }

    #[test]
    fn test_chain_proxy_absent_when_out_proxy_empty() {
        let settings = ProxySettings {
            out_proxy_params: r#"{"protocol":"socks"}"#.to_string(),
            ..Default::default()
        };
        assert!(settings.chain_proxy_params().is_none());
    }

    #[test]
    fn test_chain_proxy_params_parsed_from_stored_object() {
        // 面板可能将参数保存为对象而非字符串
        let settings: ProxySettings = serde_json::from_value(json!({
            "outProxy": "vless://...",
            "outProxyParams": {
                "protocol": "vless",
                "hostName": "upstream.example.org",
                "port": "443",
                "uuid": "9b1deb4d-3b7d-4bad-9bdd-2b0d7b3dcb6d",
                "security": "reality",
                "type": "tcp",
                "sni": "www.example.org",
                "pbk": "public-key",
                "sid": "",
                "flow": "xtls-rprx-vision"
            }
        }))
        .unwrap();

        let params = settings.chain_proxy_params().unwrap().unwrap();
        match params {
            ChainProxyParams::Vless(vless) => {
                assert_eq!(vless.host_name, "upstream.example.org");
                assert_eq!(vless.port, 443);
                assert_eq!(vless.security, ChainSecurity::Reality);
                assert_eq!(vless.transport, ChainTransport::Tcp);
                assert_eq!(vless.sid, None);
                assert_eq!(vless.flow.as_deref(), Some("xtls-rprx-vision"));
            }
            other => panic!("unexpected chain params: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_chain_proxy_is_error_and_cleared_copy() {
        let settings = ProxySettings {
            out_proxy: "socks://broken".to_string(),
            out_proxy_params: "{not json".to_string(),
            ..Default::default()
        };
        assert!(matches!(settings.chain_proxy_params(), Some(Err(_))));

        let cleared = settings.without_chain_proxy();
        assert!(cleared.out_proxy.is_empty());
        assert_eq!(cleared.out_proxy_params, "{}");
        assert!(cleared.chain_proxy_params().is_none());
        assert_eq!(cleared.ports, settings.ports);
    }

    #[test]
    fn test_wireguard_params_from_accounts() {
        let accounts = test_warp_accounts();

        let direct = WireguardParams::from_accounts(&accounts, false).unwrap();
        assert_eq!(direct.addresses, vec!["172.16.0.2/32", "2606:4700:110:8a36::1/128"]);
        assert_eq!(direct.reserved, "AQID");
        assert_eq!(direct.private_key, "cHJpdmF0ZS1rZXktb25l");

        let chained = WireguardParams::from_accounts(&accounts, true).unwrap();
        assert_eq!(chained.public_key, "bmV0LXBlZXIta2V5LXR3bw==");

        assert!(WireguardParams::from_accounts(&accounts[..1], true).is_err());
    }

    #[test]
    fn test_dataset_without_warp_configs() {
        let dataset: Dataset = serde_json::from_value(json!({ "proxySettings": {} })).unwrap();
        assert!(dataset.warp_configs.is_empty());
    }
}
