// tests/server/store_tests.rs

#[cfg(test)]
mod tests {
    use std::fs;

    use oxide_xgen::generator::settings::ProxySettings;
    use oxide_xgen::server::error::ServerError;
    use oxide_xgen::server::store::{FileStore, MemoryStore, SettingsStore};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use crate::server::test_dataset;

    #[tokio::test]
    async fn test_file_store_missing_or_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");

        let store = FileStore::new(&path);
        assert_eq!(store.path(), path.as_path());
        assert!(store.load().await.unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_loads_panel_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        fs::write(
            &path,
            r#"{
                "proxySettings": { "remoteDNS": "https://1.1.1.1/dns-query", "ports": ["443", 8443], "trojanConfigs": true },
                "warpConfigs": []
            }"#,
        )
        .unwrap();

        let dataset = FileStore::new(&path).load().await.unwrap().expect("dataset present");
        assert_eq!(dataset.proxy_settings.remote_dns, "https://1.1.1.1/dns-query");
        assert_eq!(dataset.proxy_settings.ports, vec![443, 8443]);
        assert!(dataset.proxy_settings.trojan_configs);
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        fs::write(&path, "{ proxySettings").unwrap();

        let result = FileStore::new(&path).load().await;
        assert!(matches!(result, Err(ServerError::Store(_))));
    }

    // 面板写入的数据集，包含未建模的字段
    const PANEL_DATASET: &str = r#"{
        "proxySettings": {
            "remoteDNS": "https://8.8.8.8/dns-query",
            "resolvedRemoteDNS": {},
            "outProxy": "vless://broken",
            "outProxyParams": "{bad",
            "panelVersion": "2.7",
            "ports": ["443", 8443],
            "singboxNoise": { "mode": "m4" }
        },
        "warpConfigs": [{
            "privateKey": "cHJpdmF0ZQ==",
            "account": {
                "id": "t.0f1e",
                "license": "abc",
                "config": {
                    "client_id": "AQID",
                    "interface": { "addresses": { "v4": "172.16.0.2", "v6": "2606:4700:110:8a36::1" } },
                    "peers": [{ "public_key": "cGVlcg==", "endpoint": { "host": "engage.cloudflareclient.com:2408" } }]
                }
            }
        }],
        "pwd": "secret-hash"
    }"#;

    #[tokio::test]
    async fn test_file_store_clear_chain_proxy_keeps_other_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        fs::write(&path, PANEL_DATASET).unwrap();

        let store = FileStore::new(&path);
        let dataset = store.load().await.unwrap().expect("dataset present");
        assert!(dataset.proxy_settings.chain_proxy_params().unwrap().is_err());

        store.clear_chain_proxy().await.unwrap();

        let mut expected: Value = serde_json::from_str(PANEL_DATASET).unwrap();
        expected["proxySettings"]["outProxy"] = json!("");
        expected["proxySettings"]["outProxyParams"] = json!({});
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, expected);
        assert!(!dir.path().join("dataset.json.tmp").exists());

        // 清除后不再视为链式代理
        let reloaded = store.load().await.unwrap().expect("dataset present");
        assert!(reloaded.proxy_settings.chain_proxy_params().is_none());
        assert_eq!(reloaded.proxy_settings.ports, vec![443, 8443]);
    }

    #[tokio::test]
    async fn test_file_store_clear_chain_proxy_failures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let store = FileStore::new(&path);

        let missing = store.clear_chain_proxy().await;
        assert!(matches!(missing, Err(ServerError::Store(_))));

        fs::write(&path, r#"{ "warpConfigs": [] }"#).unwrap();
        let no_settings = store.clear_chain_proxy().await;
        assert!(matches!(no_settings, Err(ServerError::Store(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{ "warpConfigs": [] }"#);
    }

    #[tokio::test]
    async fn test_memory_store_clear_chain_proxy() {
        let settings = ProxySettings {
            trojan_configs: true,
            out_proxy: "socks://broken".to_string(),
            out_proxy_params: "{broken".to_string(),
            ..Default::default()
        };
        let store = MemoryStore::new(Some(test_dataset(settings.clone())));
        store.clear_chain_proxy().await.unwrap();

        let dataset = store.load().await.unwrap().unwrap();
        assert_eq!(dataset.proxy_settings, settings.without_chain_proxy());
        assert!(dataset.proxy_settings.trojan_configs);
        assert_eq!(dataset.warp_configs.len(), 2);

        let empty = MemoryStore::new(None);
        assert!(empty.load().await.unwrap().is_none());
        assert!(empty.clear_chain_proxy().await.is_err());
    }
}
