//! credvault 运行配置与落盘路径。
//!
//! 所有持久化文件都位于同一个数据目录下（默认当前工作目录）。

use std::path::{Path, PathBuf};
use std::time::Duration;

/// 最多允许的认证尝试次数
pub const MAX_ATTEMPTS: u8 = 3;

/// 主密码最小长度（字符）
pub const MIN_MASTER_SECRET_LEN: usize = 8;

/// 主密码最大长度（字符）
pub const MAX_MASTER_SECRET_LEN: usize = 64;

pub const MAX_SERVICE_LEN: usize = 50;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_ENCRYPTED_SECRET_LEN: usize = 128;

/// 明文凭据密码最大长度（字符）
pub const MAX_SECRET_LEN: usize = 64;

pub const MASTER_SECRET_FILE: &str = "master_password.dat";
pub const TOTP_SECRET_FILE: &str = "totp_secret.dat";
pub const SALT_FILE: &str = "encryption_salt.dat";
pub const STORE_FILE: &str = "credentials.dat";
pub const STORE_BACKUP_FILE: &str = "credentials_backup.dat";

pub const DEFAULT_BREACH_ENDPOINT: &str = "https://api.pwnedpasswords.com/range/";

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "credvault", about = "Local credential vault with TOTP-protected master secret")]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Directory holding the vault files.
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,
    /// Account label shown in the authenticator app.
    #[arg(long, default_value = "user@example.com")]
    pub account: String,
    /// Issuer label shown in the authenticator app.
    #[arg(long, default_value = "Secure Password Manager")]
    pub issuer: String,
    #[arg(long, default_value = DEFAULT_BREACH_ENDPOINT)]
    pub breach_endpoint: String,
    /// Connect and read timeout for the breach lookup.
    #[arg(long, default_value_t = 5)]
    pub breach_timeout_secs: u64,
}

impl Config {
    pub fn paths(&self) -> VaultPaths {
        VaultPaths::new(&self.data_dir)
    }

    pub fn breach_timeout(&self) -> Duration {
        Duration::from_secs(self.breach_timeout_secs)
    }

    /// `-v` 次数映射到日志级别
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// 数据目录下各持久化文件的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub master_secret: PathBuf,
    pub totp_secret: PathBuf,
    pub salt: PathBuf,
    pub store: PathBuf,
    pub store_backup: PathBuf,
}

impl VaultPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            master_secret: data_dir.join(MASTER_SECRET_FILE),
            totp_secret: data_dir.join(TOTP_SECRET_FILE),
            salt: data_dir.join(SALT_FILE),
            store: data_dir.join(STORE_FILE),
            store_backup: data_dir.join(STORE_BACKUP_FILE),
        }
    }
}
