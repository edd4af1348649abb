//! 持久化文件的读写工具。

pub mod atomic;

use std::fs;
use std::io;
use std::path::Path;

/// 读取单值文件（salt / TOTP 密钥 / 主密码哈希）。
///
/// 文件不存在或内容为空白时返回 `None`。
pub fn read_single_value(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let value = content.trim();
            if value.is_empty() {
                Ok(None)
            } else {
                Ok(Some(value.to_owned()))
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// 原子写入单值文件，不追加换行。
pub fn write_single_value(path: &Path, value: &str) -> io::Result<()> {
    atomic::write_atomic(path, |file| {
        use std::io::Write;
        file.write_all(value.as_bytes())
    })
}
