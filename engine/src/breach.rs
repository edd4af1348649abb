//! 泄露密码查询（k-anonymity range API）。
//!
//! 只把 SHA-1 十六进制摘要的前 5 个字符发给远端，
//! 远端返回同前缀的全部 `SUFFIX:COUNT` 行，在本地比对剩余 35 个字符。
//!
//! 查询失败（网络 / 超时 / 解析）与「确认未泄露」是两个不同结果，
//! 调用方不得把失败当作通过。

use std::time::Duration;

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::error::{Result, VaultError};

pub const PREFIX_LEN: usize = 5;

/// 查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachStatus {
    /// 在泄露库中出现的次数
    Pwned(u64),
    Clean,
    /// 查询本身失败，结果未知
    Unknown,
}

impl BreachStatus {
    /// 计数形式：出现次数，未出现为 0，查询失败为 -1
    pub fn as_count(self) -> i64 {
        match self {
            Self::Pwned(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Self::Clean => 0,
            Self::Unknown => -1,
        }
    }
}

/// 泄露检查接口，认证流程、密码生成与审计都依赖它
pub trait BreachCheck {
    fn check(&self, secret: &str) -> BreachStatus;
}

/// 按前缀取回 range 响应体
pub trait RangeSource {
    fn fetch(&self, prefix: &str) -> Result<String>;
}

/// 大写十六进制 SHA-1
pub fn sha1_hex_upper(secret: &str) -> String {
    hex::encode_upper(Sha1::digest(secret.as_bytes()))
}

/// 拆分为 (5 位前缀, 35 位后缀)
pub fn split_digest(digest: &str) -> (&str, &str) {
    digest.split_at(PREFIX_LEN)
}

/// 在响应体中查找后缀（忽略大小写），返回出现次数；未找到返回 0
pub fn parse_range_response(body: &str, suffix: &str) -> Result<u64> {
    for line in body.lines() {
        let Some((candidate, count)) = line.trim().split_once(':') else {
            continue;
        };
        if candidate.trim().eq_ignore_ascii_case(suffix) {
            return count
                .trim()
                .parse::<u64>()
                .map_err(|e| VaultError::BreachLookup(format!("invalid count for suffix: {e}")));
        }
    }
    Ok(0)
}

pub struct BreachChecker<S> {
    source: S,
}

impl<S: RangeSource> BreachChecker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn lookup(&self, secret: &str) -> Result<u64> {
        let digest = sha1_hex_upper(secret);
        let (prefix, suffix) = split_digest(&digest);
        let body = self.source.fetch(prefix)?;
        parse_range_response(&body, suffix)
    }
}

impl<S: RangeSource> BreachCheck for BreachChecker<S> {
    fn check(&self, secret: &str) -> BreachStatus {
        match self.lookup(secret) {
            Ok(0) => BreachStatus::Clean,
            Ok(n) => BreachStatus::Pwned(n),
            Err(e) => {
                warn!(error = %e, "breach lookup failed");
                BreachStatus::Unknown
            }
        }
    }
}

/// HTTPS range 查询（阻塞）
pub struct HttpRangeSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpRangeSource {
    /// `endpoint` 以 `/` 结尾，前缀直接拼接在后面。
    /// `timeout` 同时用作连接超时与整体读取超时。
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("credvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VaultError::BreachLookup(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl RangeSource for HttpRangeSource {
    fn fetch(&self, prefix: &str) -> Result<String> {
        if prefix.len() != PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VaultError::BreachLookup("prefix must be 5 hex characters".into()));
        }

        let url = format!("{}{prefix}", self.endpoint);
        debug!(%url, "querying breach range");

        self.client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| VaultError::BreachLookup(e.to_string()))
    }
}
