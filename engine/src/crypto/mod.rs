//! credvault 密码学模块：KDF、AEAD 信封、会话密钥、主密码记录。

pub mod aead;
pub mod kdf;
pub mod master;
pub mod session;

pub use kdf::{PersistentSalt, derive_key, get_or_create_persistent_salt};
pub use master::MasterSecretRecord;
pub use session::{KeyWipeHandle, SessionKey};
