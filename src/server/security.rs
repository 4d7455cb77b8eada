// src/server/security.rs

use std::sync::Arc;
use std::time::Duration;
use axum::Router;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::PeerIpKeyExtractor,
    GovernorLayer,
};
use tracing::{debug, info};

use crate::server::config::RateLimitConfig;
use crate::server::error::{Result, ServerError};

/// 按每秒请求数计算补充一个令牌的间隔
pub fn calculate_period_duration(per_second: u32) -> Option<Duration> {
    if per_second == 0 {
        return None;
    }
    Some(Duration::from_nanos(1_000_000_000 / per_second as u64))
}

/// 创建速率限制层，未启用时返回 None
pub fn rate_limit_layer(
    config: &RateLimitConfig,
) -> Result<Option<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware>>> {
    if !config.enabled {
        return Ok(None);
    }

    let period = calculate_period_duration(config.per_ip_rate).ok_or_else(|| {
        ServerError::Config(format!(
            "Failed to calculate rate limit period for per_ip_rate: {}",
            config.per_ip_rate
        ))
    })?;

    debug!(
        per_second = config.per_ip_rate,
        burst_size = config.per_ip_concurrent,
        period_ns = period.as_nanos() as u64,
        "Creating rate limit layer"
    );

    let governor_conf = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(config.per_ip_concurrent)
        .finish()
        .ok_or_else(|| {
            ServerError::Config(format!(
                "Invalid rate limit settings: per_ip_rate={}, per_ip_concurrent={}",
                config.per_ip_rate, config.per_ip_concurrent
            ))
        })?;

    Ok(Some(GovernorLayer {
        config: Arc::new(governor_conf),
    }))
}

/// 对路由应用速率限制
pub fn apply_rate_limiting(router: Router, config: &RateLimitConfig) -> Result<Router> {
    match rate_limit_layer(config)? {
        Some(layer) => {
            info!(
                per_ip_rate = config.per_ip_rate,
                per_ip_concurrent = config.per_ip_concurrent,
                "Rate limiting applied"
            );
            Ok(router.layer(layer))
        }
        None => {
            info!("Rate limiting is disabled");
            Ok(router)
        }
    }
}
