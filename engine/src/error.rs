use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session key not initialized")]
    KeyNotInitialized,

    // 不区分 base64 / 长度 / tag 哪一步失败
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("authentication failed after the maximum number of attempts")]
    AuthenticationFailed,

    #[error("corrupted vault artifact: {0}")]
    CorruptArtifact(&'static str),

    #[error("breach lookup failed: {0}")]
    BreachLookup(String),
}

pub type Result<T, E = VaultError> = std::result::Result<T, E>;
