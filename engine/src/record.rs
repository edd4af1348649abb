//! 凭据记录。

use crate::config::{MAX_ENCRYPTED_SECRET_LEN, MAX_SERVICE_LEN, MAX_USERNAME_LEN};
use crate::error::Result;
use crate::sanitize::sanitize;

/// 单条凭据。
///
/// `encrypted_secret` 是会话密钥加密后的信封，明文密码不会出现在这里。
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub service: String,
    pub username: String,
    pub encrypted_secret: String,
}

impl CredentialRecord {
    /// 校验并构造；三个字段按落盘规则检查
    pub fn new(service: &str, username: &str, encrypted_secret: &str) -> Result<Self> {
        Ok(Self {
            service: sanitize(service, MAX_SERVICE_LEN, false)?,
            username: sanitize(username, MAX_USERNAME_LEN, false)?,
            encrypted_secret: sanitize(encrypted_secret, MAX_ENCRYPTED_SECRET_LEN, false)?,
        })
    }

    /// 重新校验现有字段，返回规范化后的副本
    pub fn validated(&self) -> Result<Self> {
        Self::new(&self.service, &self.username, &self.encrypted_secret)
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("service", &self.service)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Service: {} | Username: {}", self.service, self.username)
    }
}
