//! credvault AEAD 信封模块
//!
//! 本模块基于 AES-256-GCM 实现自包含的加密信封：
//!
//! ```text
//! base64( nonce(12) ‖ ciphertext ‖ tag(16) )
//! ```
//!
//! 安全约束：
//! - 每次加密必须使用全新的随机 nonce
//! - 解密失败一律返回 DecryptionFailed，不区分具体原因
//! - 不允许在未校验通过的情况下输出任何明文

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::crypto::kdf::KEY_LEN;
use crate::error::{Result, VaultError};

/// AES-GCM nonce 长度（96 bit）
pub const NONCE_LEN: usize = 12;

/// GCM 认证标签长度（128 bit）
pub const TAG_LEN: usize = 16;

/// 加密明文，返回 base64 信封字符串
///
/// #### 安全说明
/// - 每次调用都会生成全新的随机 nonce
/// - nonce 与密文一同保存在信封内
pub fn seal_envelope(key_bytes: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| VaultError::EncryptionFailed)?;

    let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    framed.extend_from_slice(&nonce);
    framed.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(framed))
}

/// 解开 base64 信封，返回明文字节
///
/// # 错误
/// - base64 不合法、长度不足 nonce + tag、认证失败：统一返回 DecryptionFailed
pub fn open_envelope(key_bytes: &[u8; KEY_LEN], envelope: &str) -> Result<Vec<u8>> {
    let framed = BASE64
        .decode(envelope.trim())
        .map_err(|_| VaultError::DecryptionFailed)?;

    if framed.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::DecryptionFailed);
    }

    let (nonce, ciphertext) = framed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)
}
