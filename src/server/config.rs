// src/server/config.rs

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::server::error::{ServerError, Result};
use crate::common::utils::is_valid_uuid;
use crate::common::consts::{
    // 服务器配置相关常量
    default_listen_addr, DEFAULT_LISTEN_TIMEOUT,
    // 速率限制相关常量
    DEFAULT_PER_IP_RATE, DEFAULT_PER_IP_CONCURRENT,
    MIN_PER_IP_RATE, MAX_PER_IP_RATE, MIN_PER_IP_CONCURRENT, MAX_PER_IP_CONCURRENT,
    // HTTP 客户端相关常量
    DEFAULT_HTTP_CLIENT_TIMEOUT, DEFAULT_HTTP_CLIENT_POOL_IDLE_TIMEOUT,
    DEFAULT_HTTP_CLIENT_POOL_MAX_IDLE_CONNECTIONS, DEFAULT_HTTP_CLIENT_AGENT,
    // 数据集与 DNS 解析相关常量
    DEFAULT_DATASET_PATH, DEFAULT_DOH_URL,
};

// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    // HTTP 服务器配置
    #[serde(rename = "http_server", default)]
    pub http: HttpServerConfig,

    // 面板凭据配置
    pub panel: PanelConfig,

    // 设置存储配置
    #[serde(default)]
    pub store: StoreConfig,

    // DNS 解析配置
    #[serde(rename = "dns_resolver", default)]
    pub dns: DnsResolverConfig,
}

// HTTP 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    // 服务器监听地址
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    // 服务器连接超时（秒）
    #[serde(default = "default_listen_timeout")]
    pub timeout: u64,

    // 速率限制配置
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

// 面板凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    // VLESS 用户 ID
    pub uuid: String,

    // Trojan 密码
    pub trojan_password: String,

    // 请求未携带 Host 头时使用的主机名
    pub host_name: String,
}

// 设置存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    // 数据集 JSON 文件路径
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

// DNS 解析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsResolverConfig {
    // DoH JSON 服务地址
    #[serde(default = "default_doh_url")]
    pub doh_url: String,

    // HTTP 客户端配置
    #[serde(default)]
    pub http_client: HttpClientConfig,
}

// 速率限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    // 是否启用速率限制
    #[serde(default)]
    pub enabled: bool,

    // 每个 IP 每秒最大请求数
    #[serde(default = "default_per_ip_rate")]
    pub per_ip_rate: u32,

    // 单个 IP 的并发请求数限制
    #[serde(default = "default_per_ip_concurrent")]
    pub per_ip_concurrent: u32,
}

// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    // HTTP 客户端超时时间（秒）
    #[serde(default = "default_http_client_timeout")]
    pub timeout: u64,

    // 连接池配置
    #[serde(default)]
    pub pool: PoolConfig,

    // HTTP 请求相关配置
    #[serde(default)]
    pub request: RequestConfig,
}

// 连接池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    // 连接池空闲超时时间（秒）
    #[serde(default = "default_http_client_pool_idle_timeout")]
    pub idle_timeout: u64,

    // 连接池最大空闲连接数
    #[serde(default = "default_http_client_pool_max_idle_connections")]
    pub max_idle_connections: u32,
}

// HTTP 请求配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    // HTTP 客户端 User-Agent
    #[serde(default = "default_http_client_agent")]
    pub user_agent: String,
}

// 默认值函数 - 使用 consts 中定义的常量
fn default_per_ip_rate() -> u32 {
    DEFAULT_PER_IP_RATE
}

fn default_per_ip_concurrent() -> u32 {
    DEFAULT_PER_IP_CONCURRENT
}

fn default_listen_timeout() -> u64 {
    DEFAULT_LISTEN_TIMEOUT
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_PATH)
}

fn default_doh_url() -> String {
    DEFAULT_DOH_URL.to_string()
}

fn default_http_client_timeout() -> u64 {
    DEFAULT_HTTP_CLIENT_TIMEOUT
}

fn default_http_client_pool_idle_timeout() -> u64 {
    DEFAULT_HTTP_CLIENT_POOL_IDLE_TIMEOUT
}

fn default_http_client_pool_max_idle_connections() -> u32 {
    DEFAULT_HTTP_CLIENT_POOL_MAX_IDLE_CONNECTIONS
}

fn default_http_client_agent() -> String {
    DEFAULT_HTTP_CLIENT_AGENT.to_string()
}

impl ServerConfig {
    // 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = serde_yaml::from_str(&config_str)
            .map_err(|e| ServerError::Config(format!("Failed to parse config: {}", e)))?;

        // 验证配置
        config.test()?;

        Ok(config)
    }

    // 获取服务器监听超时时间
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout)
    }

    // 获取 HTTP 客户端超时时间
    pub fn http_client_timeout(&self) -> Duration {
        Duration::from_secs(self.dns.http_client.timeout)
    }

    // 获取 HTTP 客户端连接池空闲超时时间
    pub fn http_client_pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.dns.http_client.pool.idle_timeout)
    }

    pub fn test(&self) -> Result<()> {
        // 验证速率限制配置
        if self.http.rate_limit.enabled {
            // 验证每个 IP 每秒最大请求数
            if self.http.rate_limit.per_ip_rate < MIN_PER_IP_RATE || self.http.rate_limit.per_ip_rate > MAX_PER_IP_RATE {
                return Err(ServerError::Config(format!(
                    "Invalid per_ip_rate: {} (must be between {} and {})",
                    self.http.rate_limit.per_ip_rate, MIN_PER_IP_RATE, MAX_PER_IP_RATE
                )));
            }

            // 验证单个 IP 的并发请求数限制
            if self.http.rate_limit.per_ip_concurrent < MIN_PER_IP_CONCURRENT || self.http.rate_limit.per_ip_concurrent > MAX_PER_IP_CONCURRENT {
                return Err(ServerError::Config(format!(
                    "Invalid per_ip_concurrent: {} (must be between {} and {})",
                    self.http.rate_limit.per_ip_concurrent, MIN_PER_IP_CONCURRENT, MAX_PER_IP_CONCURRENT
                )));
            }
        }

        // 验证面板凭据
        if !is_valid_uuid(&self.panel.uuid) {
            return Err(ServerError::Config(format!(
                "Invalid panel uuid: {} (must be a v4 UUID)",
                self.panel.uuid
            )));
        }

        if self.panel.trojan_password.is_empty() {
            return Err(ServerError::Config("Trojan password cannot be empty".to_string()));
        }

        if self.panel.host_name.trim().is_empty() {
            return Err(ServerError::Config("Panel host_name cannot be empty".to_string()));
        }

        // 验证 DoH 地址
        let doh_url = url::Url::parse(&self.dns.doh_url)
            .map_err(|e| ServerError::Config(format!("Invalid DoH url '{}': {}", self.dns.doh_url, e)))?;
        if doh_url.scheme() != "https" {
            return Err(ServerError::Config(format!(
                "DoH url must start with 'https://': {}",
                self.dns.doh_url
            )));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(ServerError::Config("Store path cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_ip_rate: DEFAULT_PER_IP_RATE,
            per_ip_concurrent: DEFAULT_PER_IP_CONCURRENT,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_HTTP_CLIENT_POOL_IDLE_TIMEOUT,
            max_idle_connections: DEFAULT_HTTP_CLIENT_POOL_MAX_IDLE_CONNECTIONS,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_HTTP_CLIENT_AGENT.to_string(),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_CLIENT_TIMEOUT,
            pool: PoolConfig::default(),
            request: RequestConfig::default(),
        }
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            timeout: DEFAULT_LISTEN_TIMEOUT,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

impl Default for DnsResolverConfig {
    fn default() -> Self {
        Self {
            doh_url: default_doh_url(),
            http_client: HttpClientConfig::default(),
        }
    }
}
