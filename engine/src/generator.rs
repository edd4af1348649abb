//! 强密码生成。
//!
//! 从选中的字符集合中均匀抽取；生成结果若出现在泄露库中则重新生成。

use rand::Rng;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::breach::{BreachCheck, BreachStatus};
use crate::config::MAX_SECRET_LEN;
use crate::error::{Result, VaultError};

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%&*()-_=+[]{}";

pub const MIN_GENERATED_LEN: usize = 8;

/// 泄露后重新生成的最多次数
const MAX_ROUNDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharClasses {
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl CharClasses {
    pub fn all() -> Self {
        Self {
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }

    fn pool(self) -> Vec<char> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, set)| set.chars())
        .collect()
    }
}

pub fn generate_password(
    length: usize,
    classes: CharClasses,
    breach: &dyn BreachCheck,
) -> Result<String> {
    if !(MIN_GENERATED_LEN..=MAX_SECRET_LEN).contains(&length) {
        return Err(VaultError::InvalidInput(format!(
            "length must be between {MIN_GENERATED_LEN} and {MAX_SECRET_LEN}"
        )));
    }

    let pool = classes.pool();
    if pool.is_empty() {
        return Err(VaultError::InvalidInput(
            "at least one character class must be selected".into(),
        ));
    }

    for _ in 0..MAX_ROUNDS {
        let candidate: String = (0..length)
            .map(|_| pool[OsRng.gen_range(0..pool.len())])
            .collect();

        match breach.check(&candidate) {
            BreachStatus::Pwned(n) => {
                info!(count = n, "generated password found in breaches, regenerating");
            }
            BreachStatus::Unknown => {
                warn!("breach lookup unavailable, keeping generated password");
                return Ok(candidate);
            }
            BreachStatus::Clean => return Ok(candidate),
        }
    }

    Err(VaultError::InvalidInput(
        "could not generate a password absent from known breaches".into(),
    ))
}
