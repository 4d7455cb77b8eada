// src/server/store.rs
//
// 设置存储：读取数据集，链式代理损坏时仅清除链式代理字段

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::sync::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::common::consts::{
    DATASET_PROXY_SETTINGS_KEY, OUT_PROXY_KEY, OUT_PROXY_PARAMS_KEY,
};
use crate::generator::settings::Dataset;
use crate::server::error::{Result, ServerError};

/// 设置存储接口
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 读取数据集；返回 None 表示数据集尚未配置
    async fn load(&self) -> Result<Option<Dataset>>;

    /// 清除代理设置中的链式代理字段，其余内容保持不变
    async fn clear_chain_proxy(&self) -> Result<()>;
}

// 基于 JSON 文件的存储，每次请求重新读取
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // 串行化写入
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn missing_dataset(&self) -> ServerError {
        ServerError::Store(format!(
            "Cannot clear chain proxy, dataset file {} is missing",
            self.path.display()
        ))
    }

    async fn read_dataset(&self) -> Result<Option<Dataset>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Dataset file not found");
                return Ok(None);
            }
            Err(e) => return Err(ServerError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let dataset = serde_json::from_str(&content).map_err(|e| {
            ServerError::Store(format!(
                "Failed to parse dataset file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(dataset))
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn load(&self) -> Result<Option<Dataset>> {
        self.read_dataset().await
    }

    async fn clear_chain_proxy(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => return Err(self.missing_dataset()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.missing_dataset()),
            Err(e) => return Err(ServerError::Io(e)),
        };

        // 在原始文档上修改，保留未建模的字段与原始取值
        let mut document: Value = serde_json::from_str(&content).map_err(|e| {
            ServerError::Store(format!(
                "Failed to parse dataset file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let settings = document
            .get_mut(DATASET_PROXY_SETTINGS_KEY)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                ServerError::Store(format!(
                    "Dataset file {} has no proxySettings object",
                    self.path.display()
                ))
            })?;
        settings.insert(OUT_PROXY_KEY.to_string(), Value::String(String::new()));
        settings.insert(OUT_PROXY_PARAMS_KEY.to_string(), Value::Object(Map::new()));

        // 先写临时文件再替换
        let body = serde_json::to_string_pretty(&document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        info!(path = %self.path.display(), "Chain proxy cleared from dataset");
        Ok(())
    }
}

// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    dataset: RwLock<Option<Dataset>>,
}

impl MemoryStore {
    pub fn new(dataset: Option<Dataset>) -> Self {
        Self {
            dataset: RwLock::new(dataset),
        }
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Option<Dataset>> {
        Ok(self.dataset.read().await.clone())
    }

    async fn clear_chain_proxy(&self) -> Result<()> {
        let mut guard = self.dataset.write().await;
        match guard.as_mut() {
            Some(dataset) => {
                dataset.proxy_settings = dataset.proxy_settings.without_chain_proxy();
                Ok(())
            }
            None => Err(ServerError::Store(
                "Cannot clear chain proxy, dataset is missing".to_string(),
            )),
        }
    }
}
