// src/server/error.rs

use std::io;
use std::result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::common::error::AppError;

// 数据集缺失时的错误页提示
pub const DATASET_NOT_FOUND_MESSAGE: &str = "KV Dataset is not properly set!";

// 服务器错误类型
#[derive(Debug, Error)]
pub enum ServerError {
    // IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // 配置错误
    #[error("Config error: {0}")]
    Config(String),

    // 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_yaml::Error),

    // JSON 错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP 错误
    #[error("HTTP error: {0}")]
    Http(String),

    // 设置存储错误
    #[error("Store error: {0}")]
    Store(String),

    // 设置数据集缺失
    #[error("{}", DATASET_NOT_FOUND_MESSAGE)]
    DatasetNotFound,

    // 配置生成错误
    #[error("Generate error: {0}")]
    Generate(#[from] AppError),

    // 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

// 结果类型别名
pub type Result<T> = result::Result<T, ServerError>;

// 简单 HTML 错误页
fn render_error_page(message: &str) -> String {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>Error</title>\n</head>\n<body>\n<h1>Something went wrong!</h1>\n<p>{}</p>\n</body>\n</html>\n",
        escaped
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::DatasetNotFound => DATASET_NOT_FOUND_MESSAGE.to_string(),
            other => {
                error!(error = %other, "Request failed");
                other.to_string()
            }
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/html;charset=utf-8")],
            render_error_page(&message),
        )
            .into_response()
    }
}
