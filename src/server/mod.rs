// src/server/mod.rs

pub mod args;
pub mod config;
pub mod error;
pub mod handler;
pub mod health;
pub mod metrics;
pub mod security;
pub mod signal;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use axum::Router as AxumRouter;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::generator::resolver::{DnsResolver, DohJsonResolver};
use crate::server::config::ServerConfig;
use crate::server::error::{Result, ServerError};
use crate::server::handler::{config_routes, AppState};
use crate::server::health::health_routes;
use crate::server::metrics::{metrics_routes, GenMetrics, MeteredResolver};
use crate::server::security::apply_rate_limiting;
use crate::server::store::{FileStore, SettingsStore};

// 创建 HTTP 客户端的公共函数
pub fn create_http_client(config: &ServerConfig) -> Result<Client> {
    reqwest::ClientBuilder::new()
        .timeout(config.http_client_timeout())
        .pool_idle_timeout(config.http_client_pool_idle_timeout())
        .user_agent(&config.dns.http_client.request.user_agent)
        .pool_max_idle_per_host(config.dns.http_client.pool.max_idle_connections as usize)
        .build()
        .map_err(|e| ServerError::Http(format!("Failed to create HTTP client: {}", e)))
}

// 组装完整路由：配置生成（可限速）、健康检查、指标
pub fn build_router(
    config: &ServerConfig,
    store: Arc<dyn SettingsStore>,
    resolver: Arc<dyn DnsResolver>,
) -> Result<AxumRouter> {
    let metrics = Arc::new(GenMetrics::new()?);
    let resolver: Arc<dyn DnsResolver> = Arc::new(MeteredResolver::new(resolver, metrics.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        resolver,
        metrics: metrics.clone(),
    };

    let generator_routes = apply_rate_limiting(config_routes(state), &config.http.rate_limit)?;

    Ok(AxumRouter::new()
        .merge(health_routes())
        .merge(metrics_routes(metrics))
        .merge(generator_routes))
}

// 配置生成服务器
pub struct XgenServer {
    // 配置
    config: ServerConfig,
}

impl XgenServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    // 构建 Axum 应用但不启动监听
    pub fn build_application(&self) -> Result<AxumRouter> {
        let client = create_http_client(&self.config)?;
        let resolver: Arc<dyn DnsResolver> =
            Arc::new(DohJsonResolver::new(self.config.dns.doh_url.clone(), client));
        let store: Arc<dyn SettingsStore> = Arc::new(FileStore::new(self.config.store.path.clone()));

        info!(
            doh_url = %self.config.dns.doh_url,
            store_path = %self.config.store.path.display(),
            "Application components initialized"
        );

        build_router(&self.config, store, resolver)
    }

    // 启动服务器，收到关闭通知后优雅退出
    pub async fn start(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let app = self.build_application()?;
        let listen_addr = self.config.http.listen_addr;

        let listener = TcpListener::bind(listen_addr).await?;
        info!(listen_addr = %listen_addr, "Oxide XGen server listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections");
        })
        .await?;

        info!("Oxide XGen server stopped");
        Ok(())
    }
}
