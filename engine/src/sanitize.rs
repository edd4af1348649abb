//! 用户输入与存储字段的统一校验。

use crate::error::{Result, VaultError};

/// 字段中禁止出现的字符（CSV 分隔符、引号、尖括号）
pub const UNSAFE_CHARS: &[char] = &['\'', '"', '<', '>', ',', ';'];

/// 去掉首尾空白后校验：
/// - 非空且不超过 `max_len` 个字符
/// - `numeric_only` 时只能是 ASCII 数字
/// - 不含黑名单字符与控制字符
pub fn sanitize(input: &str, max_len: usize, numeric_only: bool) -> Result<String> {
    let trimmed = input.trim();

    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return Err(VaultError::InvalidInput(format!(
            "input is empty or longer than {max_len} characters"
        )));
    }

    if numeric_only && !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::InvalidInput("only digits are allowed".into()));
    }

    if trimmed.chars().any(|c| UNSAFE_CHARS.contains(&c) || c.is_control()) {
        return Err(VaultError::InvalidInput("input contains unsafe characters".into()));
    }

    Ok(trimmed.to_owned())
}
