//! 凭据文件的行格式
//!
//! 每条记录先拼成明文行，再整体加密为一个独立信封：
//!
//! ```text
//! credentials.dat:  base64(nonce ‖ E("service,username,encryptedSecret") ‖ tag) \n
//! ```
//!
//! 其中 encryptedSecret 本身已经是一层信封，即密码字段被加密两次。
//! 每一行都可以单独解密，一行损坏不影响其它行。

use crate::crypto::SessionKey;
use crate::error::{Result, VaultError};
use crate::record::CredentialRecord;

pub const FIELD_SEPARATOR: char = ',';

/// 记录 → 加密行
pub fn encode_line(key: &SessionKey, record: &CredentialRecord) -> Result<String> {
    let plain = format!(
        "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
        record.service, record.username, record.encrypted_secret
    );
    key.encrypt(&plain)
}

/// 加密行 → 记录
///
/// 只在前两个逗号处切分，必须恰好得到三个字段，且字段需通过校验。
pub fn decode_line(key: &SessionKey, line: &str) -> Result<CredentialRecord> {
    let plain = key.decrypt(line)?;

    let mut parts = plain.splitn(3, FIELD_SEPARATOR);
    let (Some(service), Some(username), Some(secret)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(VaultError::InvalidInput("record line does not have three fields".into()));
    };

    CredentialRecord::new(service, username, secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PersistentSalt;
    use crate::crypto::kdf::SALT_LEN;

    fn key() -> SessionKey {
        SessionKey::install("line-format", &PersistentSalt::from_bytes([5u8; SALT_LEN]))
    }

    #[test]
    fn line_is_one_opaque_envelope() {
        let key = key();
        let record = CredentialRecord::new("ExampleMail", "alice", &key.encrypt("p@ss").expect("encrypt"))
            .expect("valid record");

        let line = encode_line(&key, &record).expect("encode");
        assert!(!line.contains("ExampleMail"));
        assert!(!line.contains(','));

        assert_eq!(decode_line(&key, &line).expect("decode"), record);
    }

    #[test]
    fn two_field_line_is_rejected() {
        let key = key();
        let line = key.encrypt("service,username").expect("encrypt");
        assert!(matches!(decode_line(&key, &line), Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn extra_comma_lands_in_third_field_and_fails_validation() {
        let key = key();
        let line = key.encrypt("svc,user,abc,def").expect("encrypt");
        assert!(matches!(decode_line(&key, &line), Err(VaultError::InvalidInput(_))));
    }
}
