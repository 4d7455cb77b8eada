// src/server/handler.rs

use std::sync::Arc;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::common::consts::{
    CACHE_CONTROL_NO_STORE, CDN_CACHE_CONTROL_HEADER, CDN_CACHE_CONTROL_NO_STORE,
    CONTENT_TYPE_CONFIG,
};
use crate::generator::address::endpoint_host;
use crate::generator::model::{render_batch, XrayConfig};
use crate::generator::outbound::WarpClient;
use crate::generator::resolver::DnsResolver;
use crate::generator::scenario::{build_custom_batch, build_warp_batch};
use crate::generator::settings::{ChainProxyParams, ProxySettings, RequestContext};
use crate::server::config::ServerConfig;
use crate::server::error::{Result, ServerError};
use crate::server::metrics::GenMetrics;
use crate::server::store::SettingsStore;

// 共享的服务器状态
#[derive(Clone)]
pub struct AppState {
    // 配置
    pub config: Arc<ServerConfig>,
    // 设置存储
    pub store: Arc<dyn SettingsStore>,
    // DNS 解析器
    pub resolver: Arc<dyn DnsResolver>,
    // 指标收集器
    pub metrics: Arc<GenMetrics>,
}

// 普通/分片配置请求参数
#[derive(Debug, Default, Deserialize)]
pub struct CustomConfigQuery {
    // 是否生成分片配置
    #[serde(default)]
    pub fragment: bool,
}

// WireGuard 配置请求参数
#[derive(Debug, Default, Deserialize)]
pub struct WarpConfigQuery {
    // 客户端变体
    #[serde(default)]
    pub client: WarpClient,
}

// 构建请求参数：主机名取自 Host 头（去掉端口），缺失时使用配置
pub fn request_context(config: &ServerConfig, headers: &HeaderMap) -> RequestContext {
    let host_name = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|h| endpoint_host(h.trim()))
        .filter(|h| !h.is_empty())
        .unwrap_or(config.panel.host_name.as_str())
        .to_string();

    RequestContext {
        host_name,
        user_id: config.panel.uuid.clone(),
        trojan_password: config.panel.trojan_password.clone(),
    }
}

// 批次响应，禁用所有缓存
pub fn config_response(configs: &[XrayConfig]) -> Result<Response> {
    let body = render_batch(configs)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CONTENT_TYPE_CONFIG),
            (header::CACHE_CONTROL, CACHE_CONTROL_NO_STORE),
            (HeaderName::from_static(CDN_CACHE_CONTROL_HEADER), CDN_CACHE_CONTROL_NO_STORE),
        ],
        body,
    )
        .into_response())
}

// 解析链式代理；描述损坏时视为未配置，并从存储中清除
async fn resolve_chain_proxy(
    state: &AppState,
    settings: &ProxySettings,
) -> Option<ChainProxyParams> {
    match settings.chain_proxy_params()? {
        Ok(params) => Some(params),
        Err(e) => {
            warn!(error = %e, "An error occurred while parsing chain proxy, clearing it");
            state.metrics.record_chain_proxy_recovery();
            if let Err(e) = state.store.clear_chain_proxy().await {
                error!(error = %e, "Failed to clear chain proxy from the store");
            }
            None
        }
    }
}

async fn generate_custom(state: &AppState, headers: &HeaderMap, fragment: bool) -> Result<Response> {
    let dataset = state.store.load().await?.ok_or(ServerError::DatasetNotFound)?;
    let ctx = request_context(&state.config, headers);
    let settings = dataset.proxy_settings;
    let chain = resolve_chain_proxy(state, &settings).await;

    debug!(
        host_name = %ctx.host_name,
        fragment = fragment,
        chain = chain.is_some(),
        "Generating custom configs"
    );

    let configs = build_custom_batch(
        state.resolver.as_ref(),
        &settings,
        &ctx,
        chain.as_ref(),
        fragment,
    )
    .await?;

    state
        .metrics
        .record_documents(if fragment { "fragment" } else { "custom" }, configs.len());
    config_response(&configs)
}

async fn generate_warp(state: &AppState, headers: &HeaderMap, client: WarpClient) -> Result<Response> {
    let dataset = state.store.load().await?.ok_or(ServerError::DatasetNotFound)?;
    let ctx = request_context(&state.config, headers);

    debug!(client = %client, "Generating Warp configs");

    let configs = build_warp_batch(
        state.resolver.as_ref(),
        &dataset.proxy_settings,
        &dataset.warp_configs,
        &ctx,
        client,
    )
    .await?;

    state
        .metrics
        .record_documents(&format!("warp-{}", client), configs.len());
    config_response(&configs)
}

// 限制单次生成的总耗时
async fn with_deadline<F>(state: &AppState, generate: F) -> Result<Response>
where
    F: std::future::Future<Output = Result<Response>>,
{
    let deadline = state.config.listen_timeout();
    tokio::time::timeout(deadline, generate)
        .await
        .unwrap_or_else(|_| {
            Err(ServerError::Http(format!(
                "Config generation timed out after {}s",
                deadline.as_secs()
            )))
        })
}

// 记录请求与响应指标
fn observe(state: &AppState, endpoint: &str, start: Instant, result: &Result<Response>) {
    let status = match result {
        Ok(response) => response.status().as_u16(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
    };
    state.metrics.record_response(endpoint, status, start.elapsed());
}

// 处理普通/分片配置请求
async fn custom_configs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CustomConfigQuery>,
) -> Result<Response> {
    let start = Instant::now();
    let endpoint = if query.fragment { "fragment" } else { "custom" };
    state.metrics.record_request(endpoint);

    let result = with_deadline(&state, generate_custom(&state, &headers, query.fragment)).await;
    observe(&state, endpoint, start, &result);
    result
}

// 处理 WireGuard 配置请求
async fn warp_configs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WarpConfigQuery>,
) -> Result<Response> {
    let start = Instant::now();
    state.metrics.record_request("warp");

    let result = with_deadline(&state, generate_warp(&state, &headers, query.client)).await;
    observe(&state, "warp", start, &result);
    result
}

// 创建配置生成路由
pub fn config_routes(state: AppState) -> Router {
    Router::new()
        .route("/sub/xray", get(custom_configs_handler))
        .route("/sub/xray/warp", get(warp_configs_handler))
        .with_state(state)
}
