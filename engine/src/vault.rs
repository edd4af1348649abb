//! 内存中的凭据列表及其操作（菜单背后的业务逻辑）。
//!
//! 所有修改只作用于内存，直到显式 `save`。

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::breach::{BreachCheck, BreachStatus};
use crate::config::{MAX_ENCRYPTED_SECRET_LEN, MAX_MASTER_SECRET_LEN, MAX_SECRET_LEN};
use crate::crypto::{MasterSecretRecord, SessionKey};
use crate::error::{Result, VaultError};
use crate::record::CredentialRecord;
use crate::sanitize::sanitize;
use crate::store::CredentialStore;

/// 单条凭据的审计结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub service: String,
    pub username: String,
    /// 解密失败时为 `None`
    pub status: Option<BreachStatus>,
}

pub struct Vault<'k> {
    key: &'k SessionKey,
    store: CredentialStore,
    records: Vec<CredentialRecord>,
}

impl<'k> Vault<'k> {
    /// 从凭据文件加载
    pub fn open(key: &'k SessionKey, store: CredentialStore) -> Result<Self> {
        let records = store.load(key)?;
        Ok(Self {
            key,
            store,
            records,
        })
    }

    pub fn records(&self) -> &[CredentialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 加密密码并追加新凭据
    ///
    /// 多字节字符较多时，64 个字符的密码加密后可能超过 128 字符的信封上限，此时拒绝。
    pub fn add(&mut self, service: &str, username: &str, secret: &str) -> Result<&CredentialRecord> {
        let secret = Zeroizing::new(sanitize(secret, MAX_SECRET_LEN, false)?);
        let encrypted = self.key.encrypt(&secret)?;
        if encrypted.len() > MAX_ENCRYPTED_SECRET_LEN {
            return Err(VaultError::InvalidInput(format!(
                "password is too long once encrypted ({} > {MAX_ENCRYPTED_SECRET_LEN} characters), \
                 use a shorter password or fewer non-ASCII characters",
                encrypted.len()
            )));
        }

        let record = CredentialRecord::new(service, username, &encrypted)?;
        debug!(service = %record.service, "credential added");
        self.records.push(record);

        Ok(&self.records[self.records.len() - 1])
    }

    pub fn remove(&mut self, index: usize) -> Result<CredentialRecord> {
        if index >= self.records.len() {
            return Err(VaultError::InvalidInput(format!("no credential at index {}", index + 1)));
        }
        let removed = self.records.remove(index);
        debug!(service = %removed.service, "credential removed");
        Ok(removed)
    }

    /// 重新确认主密码后解密指定凭据
    pub fn reveal(
        &self,
        index: usize,
        master_confirmation: &str,
        master: &MasterSecretRecord,
    ) -> Result<Zeroizing<String>> {
        let record = self
            .records
            .get(index)
            .ok_or_else(|| VaultError::InvalidInput(format!("no credential at index {}", index + 1)))?;

        let confirmation = Zeroizing::new(sanitize(master_confirmation, MAX_MASTER_SECRET_LEN, false)?);
        if !master.verify(&confirmation) {
            return Err(VaultError::InvalidInput("master password confirmation failed".into()));
        }

        self.key.decrypt(&record.encrypted_secret)
    }

    /// 逐条查询泄露状态
    pub fn audit(&self, breach: &dyn BreachCheck) -> Vec<AuditFinding> {
        self.records
            .iter()
            .map(|record| {
                let status = match self.key.decrypt(&record.encrypted_secret) {
                    Ok(secret) => Some(breach.check(&secret)),
                    Err(e) => {
                        warn!(service = %record.service, error = %e, "cannot decrypt credential for audit");
                        None
                    }
                };
                AuditFinding {
                    service: record.service.clone(),
                    username: record.username.clone(),
                    status,
                }
            })
            .collect()
    }

    pub fn save(&self) -> Result<usize> {
        self.store.persist(self.key, &self.records)
    }
}
