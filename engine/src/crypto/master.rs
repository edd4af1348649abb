//! 主密码记录。
//!
//! 磁盘上只保存 Argon2id 生成的 PHC 哈希串（自带随机 salt 与参数），
//! 从不保存明文。校验统一走 `PasswordVerifier`，不做字符串比较。

use std::path::Path;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use tracing::info;

use crate::error::{Result, VaultError};
use crate::fs::{read_single_value, write_single_value};

#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecretRecord {
    hash: String,
}

impl MasterSecretRecord {
    /// 哈希新主密码
    pub fn create(secret: &str) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|_| VaultError::CorruptArtifact("failed to hash master secret"))?
            .to_string();

        Ok(Self { hash })
    }

    /// 解析已有哈希串
    pub fn from_hash(hash: &str) -> Result<Self> {
        PasswordHash::new(hash)
            .map_err(|_| VaultError::CorruptArtifact("master secret record is not a PHC hash"))?;
        Ok(Self {
            hash: hash.to_owned(),
        })
    }

    /// 读取主密码文件；首次运行（文件不存在）返回 `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        read_single_value(path)?
            .map(|hash| Self::from_hash(&hash))
            .transpose()
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        write_single_value(path, &self.hash)?;
        info!(path = %path.display(), "master secret record saved");
        Ok(())
    }

    pub fn verify(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Debug for MasterSecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecretRecord(..)")
    }
}
