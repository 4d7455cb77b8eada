// src/generator/resolver.rs

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, error};

use crate::common::consts::{CONTENT_TYPE_DNS_JSON, DNS_RECORD_TYPE_A, DNS_RECORD_TYPE_AAAA};
use crate::common::error::{AppError, Result};

// 域名解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIps {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl ResolvedIps {
    // 按 IPv6 开关合并地址
    pub fn addresses(&self, with_ipv6: bool) -> Vec<String> {
        let mut all = self.ipv4.clone();
        if with_ipv6 {
            all.extend(self.ipv6.iter().cloned());
        }
        all
    }
}

/// DNS 解析协作者
///
/// 失败必须以错误返回，不允许部分结果或缓存回退。
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<ResolvedIps>;
}

// DoH JSON 响应
#[derive(Debug, Deserialize)]
struct DohJsonResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohJsonAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohJsonAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

// 基于 DoH JSON 接口的解析器
#[derive(Debug, Clone)]
pub struct DohJsonResolver {
    // HTTP 客户端
    client: Client,
    // DoH 服务器 URL
    url: String,
}

impl DohJsonResolver {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    // 查询单一记录类型
    async fn query(&self, domain: &str, record: &str, record_type: u16) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("name", domain), ("type", record)])
            .header(header::ACCEPT, CONTENT_TYPE_DNS_JSON)
            .send()
            .await
            .map_err(|e| AppError::DnsResolve(format!("DoH request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::DnsResolve(format!(
                "DoH server returned error status: {}",
                response.status()
            )));
        }

        let body: DohJsonResponse = response
            .json()
            .await
            .map_err(|e| AppError::DnsResolve(format!("Failed to parse DoH response: {}", e)))?;

        // CNAME 等记录不计入
        Ok(body
            .answer
            .into_iter()
            .filter(|a| a.record_type == record_type)
            .map(|a| a.data)
            .collect())
    }
}

#[async_trait]
impl DnsResolver for DohJsonResolver {
    async fn resolve(&self, domain: &str) -> Result<ResolvedIps> {
        let (ipv4, ipv6) = tokio::try_join!(
            self.query(domain, "A", DNS_RECORD_TYPE_A),
            self.query(domain, "AAAA", DNS_RECORD_TYPE_AAAA),
        )
        .map_err(|e| {
            error!(domain = domain, error = %e, "DNS resolution failed");
            e
        })?;

        debug!(
            domain = domain,
            ipv4_count = ipv4.len(),
            ipv6_count = ipv6.len(),
            "Resolved domain"
        );

        Ok(ResolvedIps { ipv4, ipv6 })
    }
}
