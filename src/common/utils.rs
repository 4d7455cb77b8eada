// src/common/utils.rs

use std::net::{Ipv4Addr, Ipv6Addr};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_ENGINE};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::consts::RANDOM_PATH_CHARSET;
use crate::common::error::{AppError, Result};

// 域名格式：至少一个标签加上字母顶级域
static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9\-]{1,63}\.)+[A-Za-z]{2,}$").expect("valid domain regex")
});

// v4 UUID 格式
static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("valid uuid regex")
});

/// 判断地址是否为域名（而非 IP 字面量）
pub fn is_domain(address: &str) -> bool {
    !address.starts_with('-') && DOMAIN_REGEX.is_match(address)
}

/// 判断地址是否为 IPv4 字面量
pub fn is_ipv4(address: &str) -> bool {
    address.parse::<Ipv4Addr>().is_ok()
}

/// 判断地址是否为 IPv6 字面量（允许方括号包裹）
pub fn is_ipv6(address: &str) -> bool {
    let trimmed = address
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(address);
    trimmed.parse::<Ipv6Addr>().is_ok()
}

/// 校验 v4 UUID
pub fn is_valid_uuid(uuid: &str) -> bool {
    UUID_REGEX.is_match(uuid)
}

/// 生成指定长度的随机字母数字路径
pub fn random_path(length: usize) -> String {
    (0..length)
        .map(|_| RANDOM_PATH_CHARSET[fastrand::usize(..RANDOM_PATH_CHARSET.len())] as char)
        .collect()
}

/// 随机将字符转为大写（SNI 大小写混淆）
pub fn random_upper_case(value: &str) -> String {
    value
        .chars()
        .map(|c| if fastrand::bool() { c.to_ascii_uppercase() } else { c })
        .collect()
}

/// 标准 Base64 编码
pub fn encode_base64(value: &str) -> String {
    BASE64_ENGINE.encode(value.as_bytes())
}

/// 将 Base64 字符串解码为十进制字节序列
pub fn base64_to_decimal(value: &str) -> Result<Vec<u8>> {
    BASE64_ENGINE
        .decode(value.trim())
        .map_err(|e| AppError::Settings(format!("Invalid base64 value '{}': {}", value, e)))
}

/// 拆分逗号分隔的列表，去掉空白与空项
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
