// src/server/health.rs

use axum::{routing::get, Router};
use tracing::debug;

/// 创建健康检查路由
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> &'static str {
    debug!("Health check requested");
    "ok"
}
