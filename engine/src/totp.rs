//! 基于时间的一次性密码（RFC 6238，HMAC-SHA1，6 位，30 秒步长）。
//!
//! 密钥为 160 bit 随机数：落盘时 base64 编码，
//! 展示给验证器 App 时使用无填充 base32。

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha1::Sha1;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::fs::{read_single_value, write_single_value};

pub const SECRET_LEN: usize = 20;
pub const PERIOD_SECS: u64 = 30;
pub const DIGITS: usize = 6;

/// 校验时向前、向后各容忍的步数
pub const DRIFT_STEPS: u64 = 1;

type HmacSha1 = Hmac<Sha1>;

/// 当前时间来源，测试中可替换为固定时钟
pub trait Clock {
    fn unix_time(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

pub struct TotpSecret(Zeroizing<Vec<u8>>);

impl TotpSecret {
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|_| VaultError::CorruptArtifact("TOTP secret is not valid base64"))?;
        if raw.len() != SECRET_LEN {
            return Err(VaultError::CorruptArtifact("TOTP secret must be 20 bytes"));
        }
        Ok(Self(Zeroizing::new(raw)))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0.as_slice())
    }

    /// 无填充 base32，供验证器 App 手动录入
    pub fn to_base32(&self) -> String {
        BASE32_NOPAD.encode(&self.0)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TotpSecret(..)")
    }
}

/// 读取 TOTP 密钥文件；不存在或为空则生成并落盘。
///
/// 内容损坏时报错，不会自动重新生成。
pub fn load_or_create_secret(path: &Path) -> Result<TotpSecret> {
    if let Some(encoded) = read_single_value(path)? {
        return TotpSecret::from_base64(&encoded);
    }

    let secret = TotpSecret::generate();
    write_single_value(path, &secret.to_base64())?;
    info!(path = %path.display(), "created new TOTP secret");

    Ok(secret)
}

/// 生成 `otpauth://` 配置 URI。
///
/// 注意：issuer 与 account 原样嵌入，不做 URL 转义。
pub fn provisioning_uri(secret: &TotpSecret, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={}&issuer={issuer}",
        secret.to_base32()
    )
}

pub fn time_counter(unix_seconds: u64) -> u64 {
    unix_seconds / PERIOD_SECS
}

/// 计算指定计数器下的 6 位验证码
pub fn compute_code(secret: &TotpSecret, counter: u64) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|_| VaultError::CorruptArtifact("TOTP secret rejected by HMAC"))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // 动态截断
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]) & 0x7fff_ffff;

    let code = binary % 10u32.pow(DIGITS as u32);
    Ok(format!("{code:0width$}", width = DIGITS))
}

/// 校验用户输入的验证码，允许 ±1 个步长的时钟漂移。
///
/// 任何内部错误都视为不匹配。
pub fn validate_code(secret: &TotpSecret, input: &str, now: u64) -> bool {
    if input.len() != DIGITS || !input.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let current = time_counter(now);
    let first = current.saturating_sub(DRIFT_STEPS);
    let last = current.saturating_add(DRIFT_STEPS);

    let mut matched = false;
    for counter in first..=last {
        match compute_code(secret, counter) {
            // 不提前返回，三个窗口都计算一遍
            Ok(expected) => matched |= constant_time_eq(expected.as_bytes(), input.as_bytes()),
            Err(e) => {
                debug!(error = %e, "TOTP computation failed");
                return false;
            }
        }
    }

    matched
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 附录 B 的 SHA1 种子
    fn rfc_secret() -> TotpSecret {
        TotpSecret::from_bytes(b"12345678901234567890")
    }

    #[test]
    fn rfc6238_reference_vectors() {
        let secret = rfc_secret();
        assert_eq!(compute_code(&secret, time_counter(59)).expect("code"), "287082");
        assert_eq!(compute_code(&secret, time_counter(1_111_111_109)).expect("code"), "081804");
        assert_eq!(compute_code(&secret, time_counter(1_234_567_890)).expect("code"), "005924");
    }

    #[test]
    fn accepts_adjacent_windows_only() {
        let secret = TotpSecret::generate();
        let now = 1_700_000_015;
        let code_at = |t: u64| compute_code(&secret, time_counter(t)).expect("code");

        assert!(validate_code(&secret, &code_at(now), now));
        assert!(validate_code(&secret, &code_at(now - 30), now));
        assert!(validate_code(&secret, &code_at(now + 30), now));

        // 极小概率下 ±60s 的码与窗口内某个码相同
        let window: Vec<_> = [now - 30, now, now + 30].iter().map(|&t| code_at(t)).collect();
        for far in [now - 60, now + 60] {
            let code = code_at(far);
            if !window.contains(&code) {
                assert!(!validate_code(&secret, &code, now));
            }
        }
    }

    #[test]
    fn rejects_malformed_codes() {
        let secret = rfc_secret();
        let now = 59;
        assert!(!validate_code(&secret, "28708", now));
        assert!(!validate_code(&secret, "2870822", now));
        assert!(!validate_code(&secret, "28708a", now));
        assert!(!validate_code(&secret, " 287082", now));
        assert!(!validate_code(&secret, "", now));
        assert!(validate_code(&secret, "287082", now));
    }

    #[test]
    fn window_at_epoch_start_does_not_underflow() {
        let secret = rfc_secret();
        let code = compute_code(&secret, 0).expect("code");
        assert!(validate_code(&secret, &code, 5));
    }

    #[test]
    fn base32_and_uri() {
        let secret = rfc_secret();
        assert_eq!(secret.to_base32(), "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        assert_eq!(
            provisioning_uri(&secret, "user@example.com", "Secure Password Manager"),
            "otpauth://totp/Secure Password Manager:user@example.com\
             ?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=Secure Password Manager"
        );
    }

    #[test]
    fn secret_file_is_created_once() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("totp_secret.dat");

        let first = load_or_create_secret(&path).expect("create");
        let second = load_or_create_secret(&path).expect("reload");

        assert_eq!(first.to_base64(), second.to_base64());
        assert_eq!(BASE64.decode(first.to_base64()).expect("b64").len(), SECRET_LEN);
    }
}
