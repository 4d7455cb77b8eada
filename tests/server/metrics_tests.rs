// tests/server/metrics_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use oxide_xgen::generator::resolver::DnsResolver;
    use oxide_xgen::server::metrics::{metrics_routes, GenMetrics, MeteredResolver};
    use tower::ServiceExt;

    use crate::server::{FailingResolver, StaticResolver, TEST_HOST};

    #[test]
    fn test_metrics_are_registered() {
        let metrics = GenMetrics::new().unwrap();
        metrics.record_request("custom");
        metrics.record_response("custom", 200, Duration::from_millis(12));
        metrics.record_documents("warp-xray", 4);

        let output = metrics.export_metrics().unwrap();
        assert!(output.contains("xgen_requests_total{endpoint=\"custom\"} 1"));
        assert!(output.contains("xgen_responses_by_status{endpoint=\"custom\",status=\"200\"} 1"));
        assert!(output.contains("xgen_documents_generated_total{scenario=\"warp-xray\"} 4"));
        assert!(output.contains("xgen_request_duration_seconds_count{endpoint=\"custom\"} 1"));
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_independent_registries() {
        let first = GenMetrics::new().unwrap();
        let second = GenMetrics::new().unwrap();
        first.record_chain_proxy_recovery();
        assert_eq!(first.chain_proxy_recoveries.get(), 1);
        assert_eq!(second.chain_proxy_recoveries.get(), 0);
    }

    #[tokio::test]
    async fn test_metered_resolver_counts_lookups() {
        let metrics = Arc::new(GenMetrics::new().unwrap());

        let ok = MeteredResolver::new(Arc::new(StaticResolver::default()), metrics.clone());
        ok.resolve(TEST_HOST).await.unwrap();
        let failing = MeteredResolver::new(Arc::new(FailingResolver), metrics.clone());
        assert!(failing.resolve(TEST_HOST).await.is_err());

        assert_eq!(metrics.dns_lookups.get(), 2);
        assert_eq!(metrics.dns_lookup_failures.get(), 1);
        assert_eq!(metrics.dns_lookup_duration.get_sample_count(), 2);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(GenMetrics::new().unwrap());
        metrics.record_request("warp");

        let response = metrics_routes(metrics)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], prometheus::TEXT_FORMAT);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("xgen_requests_total{endpoint=\"warp\"} 1"));
    }
}
