pub mod auth;
pub mod breach;
pub mod config;
pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod generator;
pub mod record;
pub mod sanitize;
pub mod shutdown;
pub mod store;
pub mod totp;
pub mod vault;

pub use auth::{AuthSession, Prompt, Step};
pub use breach::{BreachCheck, BreachChecker, BreachStatus, HttpRangeSource};
pub use config::{Config, VaultPaths};
pub use crypto::{KeyWipeHandle, MasterSecretRecord, PersistentSalt, SessionKey};
pub use error::{Result, VaultError};
pub use record::CredentialRecord;
pub use store::CredentialStore;
pub use totp::{SystemClock, TotpSecret};
pub use vault::Vault;
