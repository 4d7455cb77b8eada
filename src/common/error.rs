// src/common/error.rs

use thiserror::Error;

/// 配置生成错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// DNS 解析错误
    #[error("An error occurred while resolving DNS - {0}")]
    DnsResolve(String),

    /// 链式代理描述解析错误
    #[error("Chain proxy error: {0}")]
    ChainProxy(#[from] serde_json::Error),

    /// 设置数据错误
    #[error("Settings error: {0}")]
    Settings(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
