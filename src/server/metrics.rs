// src/server/metrics.rs

use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use axum::{extract::State, http::{header, StatusCode}, response::IntoResponse, routing::get, Router};
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

use crate::common::error::Result as GenResult;
use crate::generator::resolver::{DnsResolver, ResolvedIps};
use crate::server::error::{Result, ServerError};

// 请求耗时分桶（秒）
const DURATION_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// 配置生成服务指标
pub struct GenMetrics {
    registry: Registry,

    // 按端点分类的请求计数
    pub requests_total: IntCounterVec,
    // 按端点和状态码分类的响应计数
    pub responses_by_status: IntCounterVec,
    // 请求处理时间直方图
    pub request_duration: HistogramVec,
    // 按场景分类的生成文档计数
    pub documents_generated: IntCounterVec,
    // DNS 解析次数
    pub dns_lookups: IntCounter,
    // DNS 解析失败次数
    pub dns_lookup_failures: IntCounter,
    // DNS 解析耗时
    pub dns_lookup_duration: Histogram,
    // 链式代理描述损坏后被清除的次数
    pub chain_proxy_recoveries: IntCounter,
}

fn metric_error(e: prometheus::Error) -> ServerError {
    ServerError::Other(format!("Failed to create metric: {}", e))
}

impl GenMetrics {
    // 创建新的指标收集器
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("xgen_requests_total", "Request count by endpoint"),
            &["endpoint"],
        )
        .map_err(metric_error)?;

        let responses_by_status = IntCounterVec::new(
            Opts::new("xgen_responses_by_status", "Response count by endpoint and status code"),
            &["endpoint", "status"],
        )
        .map_err(metric_error)?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "xgen_request_duration_seconds",
                "Config generation request processing time in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["endpoint"],
        )
        .map_err(metric_error)?;

        let documents_generated = IntCounterVec::new(
            Opts::new("xgen_documents_generated_total", "Generated config documents by scenario"),
            &["scenario"],
        )
        .map_err(metric_error)?;

        let dns_lookups = IntCounter::new("xgen_dns_lookups_total", "Number of DNS lookups")
            .map_err(metric_error)?;
        let dns_lookup_failures = IntCounter::new(
            "xgen_dns_lookup_failures_total",
            "Number of failed DNS lookups",
        )
        .map_err(metric_error)?;
        let dns_lookup_duration = Histogram::with_opts(
            HistogramOpts::new("xgen_dns_lookup_duration_seconds", "DNS lookup time in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
        )
        .map_err(metric_error)?;

        let chain_proxy_recoveries = IntCounter::new(
            "xgen_chain_proxy_recoveries_total",
            "Number of corrupt chain proxy descriptors cleared from the store",
        )
        .map_err(metric_error)?;

        // 注册所有指标
        registry.register(Box::new(requests_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(responses_by_status.clone())).map_err(metric_error)?;
        registry.register(Box::new(request_duration.clone())).map_err(metric_error)?;
        registry.register(Box::new(documents_generated.clone())).map_err(metric_error)?;
        registry.register(Box::new(dns_lookups.clone())).map_err(metric_error)?;
        registry.register(Box::new(dns_lookup_failures.clone())).map_err(metric_error)?;
        registry.register(Box::new(dns_lookup_duration.clone())).map_err(metric_error)?;
        registry.register(Box::new(chain_proxy_recoveries.clone())).map_err(metric_error)?;

        Ok(GenMetrics {
            registry,
            requests_total,
            responses_by_status,
            request_duration,
            documents_generated,
            dns_lookups,
            dns_lookup_failures,
            dns_lookup_duration,
            chain_proxy_recoveries,
        })
    }

    // 获取 Prometheus 注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // 记录请求
    pub fn record_request(&self, endpoint: &str) {
        self.requests_total.with_label_values(&[endpoint]).inc();
    }

    // 记录响应
    pub fn record_response(&self, endpoint: &str, status: u16, duration: Duration) {
        self.responses_by_status
            .with_label_values(&[endpoint, &status.to_string()])
            .inc();

        self.request_duration
            .with_label_values(&[endpoint])
            .observe(duration.as_secs_f64());
    }

    // 记录生成的文档数
    pub fn record_documents(&self, scenario: &str, count: usize) {
        self.documents_generated
            .with_label_values(&[scenario])
            .inc_by(count as u64);
    }

    // 记录 DNS 解析
    pub fn record_dns_lookup(&self, success: bool, duration: Duration) {
        self.dns_lookups.inc();
        if !success {
            self.dns_lookup_failures.inc();
        }
        self.dns_lookup_duration.observe(duration.as_secs_f64());
    }

    // 记录链式代理恢复
    pub fn record_chain_proxy_recovery(&self) {
        self.chain_proxy_recoveries.inc();
    }

    // 导出当前指标为字符串
    pub fn export_metrics(&self) -> Result<String> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        encoder
            .encode_utf8(&metric_families, &mut buffer)
            .map_err(|e| ServerError::Other(format!("Failed to encode metrics: {}", e)))?;
        Ok(buffer)
    }
}

// 记录指标的解析器包装
pub struct MeteredResolver {
    inner: Arc<dyn DnsResolver>,
    metrics: Arc<GenMetrics>,
}

impl MeteredResolver {
    pub fn new(inner: Arc<dyn DnsResolver>, metrics: Arc<GenMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl DnsResolver for MeteredResolver {
    async fn resolve(&self, domain: &str) -> GenResult<ResolvedIps> {
        let started = Instant::now();
        let result = self.inner.resolve(domain).await;
        self.metrics.record_dns_lookup(result.is_ok(), started.elapsed());
        result
    }
}

async fn metrics_handler(State(metrics): State<Arc<GenMetrics>>) -> impl IntoResponse {
    match metrics.export_metrics() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            buffer,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// 提供指标导出路由
pub fn metrics_routes(metrics: Arc<GenMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}
