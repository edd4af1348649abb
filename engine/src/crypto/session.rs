//! 会话密钥句柄。
//!
//! `SessionKey` 独占当前会话的派生密钥，是唯一能调用加解密的入口。
//! 密钥只存在于内存中：`clear()`、句柄 drop 或 [`KeyWipeHandle::wipe`] 时立即清零。
//!
//! 密钥槽位由 `Arc<Mutex<..>>` 共享，信号处理线程持有 `KeyWipeHandle`，
//! 收到 SIGINT / SIGTERM 时可以在主线程之外清除密钥。

use std::sync::{Arc, Mutex, MutexGuard};

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::aead::{open_envelope, seal_envelope};
use crate::crypto::kdf::{KEY_LEN, PersistentSalt, derive_key};
use crate::error::{Result, VaultError};

type KeySlot = Arc<Mutex<Option<Zeroizing<[u8; KEY_LEN]>>>>;

fn lock(slot: &KeySlot) -> MutexGuard<'_, Option<Zeroizing<[u8; KEY_LEN]>>> {
    // 持锁线程 panic 不影响槽位内容的有效性
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SessionKey {
    slot: KeySlot,
}

impl SessionKey {
    /// 由主密码与持久化 salt 派生并持有会话密钥。
    ///
    /// 正常流程中只由认证会话在通过校验后调用。
    pub fn install(secret: &str, salt: &PersistentSalt) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(derive_key(secret, salt)))),
        }
    }

    /// 清除密钥，可重复调用
    pub fn clear(&mut self) {
        // Zeroizing 在 drop 时覆盖内存
        *lock(&self.slot) = None;
    }

    pub fn is_active(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// 供信号处理线程使用的清除句柄
    pub fn wipe_handle(&self) -> KeyWipeHandle {
        KeyWipeHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let slot = lock(&self.slot);
        let key = slot.as_ref().ok_or(VaultError::KeyNotInitialized)?;
        seal_envelope(key, plaintext.as_bytes())
    }

    /// 解密得到的明文离开作用域即清零
    pub fn decrypt(&self, envelope: &str) -> Result<Zeroizing<String>> {
        let plaintext = {
            let slot = lock(&self.slot);
            let key = slot.as_ref().ok_or(VaultError::KeyNotInitialized)?;
            open_envelope(key, envelope)?
        };

        match String::from_utf8(plaintext) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(VaultError::DecryptionFailed)
            }
        }
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("active", &self.is_active())
            .finish()
    }
}

/// 与 `SessionKey` 共享同一密钥槽位的清除句柄。
///
/// 只能清除，不能读取或替换密钥。
#[derive(Clone)]
pub struct KeyWipeHandle {
    slot: KeySlot,
}

impl KeyWipeHandle {
    pub fn wipe(&self) {
        *lock(&self.slot) = None;
    }
}

impl std::fmt::Debug for KeyWipeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyWipeHandle(..)")
    }
}
