//! credvault 密钥派生函数（KDF）模块
//!
//! 本模块负责将主密码与持久化 salt，通过 PBKDF2-HMAC-SHA256
//! 派生为会话密钥，用于后续 AES-256-GCM 加解密。
//!
//! 约束：
//! - 迭代次数为编译期常量，调用方无法调整
//! - 同一个 vault 的所有派生都使用同一个持久化 salt
//! - salt 一旦更换，所有已加密记录都将无法解密
//!
//! 输出：
//! - 32 字节密钥（AES-256-GCM）

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use tracing::info;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::fs::{read_single_value, write_single_value};

/// 派生密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// 持久化 salt 长度（128-bit）
pub const SALT_LEN: usize = 16;

/// PBKDF2 迭代次数
pub const PBKDF2_ITERATIONS: u32 = 65_536;

/// vault 级别的持久化 salt
#[derive(Clone, PartialEq, Eq)]
pub struct PersistentSalt([u8; SALT_LEN]);

impl PersistentSalt {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// 解析落盘的 base64 文本，长度必须正好是 16 字节
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|_| VaultError::CorruptArtifact("salt is not valid base64"))?;
        let bytes: [u8; SALT_LEN] = raw
            .try_into()
            .map_err(|_| VaultError::CorruptArtifact("salt must be 16 bytes"))?;
        Ok(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PersistentSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PersistentSalt").field(&self.to_base64()).finish()
    }
}

/// 读取 salt 文件；不存在则生成并落盘。
///
/// 重复调用返回同一个 salt。内容损坏时报错，不会覆盖。
pub fn get_or_create_persistent_salt(path: &Path) -> Result<PersistentSalt> {
    if let Some(encoded) = read_single_value(path)? {
        return PersistentSalt::from_base64(&encoded);
    }

    let salt = PersistentSalt::generate();
    write_single_value(path, &salt.to_base64())?;
    info!(path = %path.display(), "created new persistent salt");

    Ok(salt)
}

/// 根据主密码和 salt 派生对称加密密钥
///
/// 确定性：相同输入总是得到相同密钥。
/// 返回值使用 Zeroizing 包装，离开作用域即清零。
pub fn derive_key(secret: &str, salt: &PersistentSalt) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut key[..]);
    key
}
