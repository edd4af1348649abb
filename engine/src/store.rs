//! 凭据文件的保存与加载
//!
//! 保存流程（严格顺序）：
//! 1. 逐条重新校验并编码为加密行，不合格的记录记录警告后丢弃
//! 2. 若已有凭据文件，先整体复制到备份路径（覆盖旧备份）
//! 3. 原子写入所有加密行，每行一条
//!
//! 加载时凭据文件不存在不算错误；单行编码、解密或解析失败只跳过该行。

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::VaultPaths;
use crate::crypto::SessionKey;
use crate::error::Result;
use crate::format::line::{decode_line, encode_line};
use crate::fs::atomic::write_atomic;
use crate::record::CredentialRecord;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    backup_path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, backup_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_path: backup_path.into(),
        }
    }

    pub fn from_paths(paths: &VaultPaths) -> Self {
        Self::new(&paths.store, &paths.store_backup)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// 加密并写出全部记录，返回实际写入的条数
    pub fn persist(&self, key: &SessionKey, records: &[CredentialRecord]) -> Result<usize> {
        let mut lines = Vec::with_capacity(records.len());

        for record in records {
            let checked = match record.validated() {
                Ok(r) => r,
                Err(e) => {
                    warn!(service = %record.service, error = %e, "skipping invalid credential");
                    continue;
                }
            };
            lines.push(encode_line(key, &checked)?);
        }

        if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)?;
            debug!(backup = %self.backup_path.display(), "previous store backed up");
        }

        write_atomic(&self.path, |file| {
            let mut writer = BufWriter::new(file);
            for line in &lines {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()
        })?;

        info!(count = lines.len(), path = %self.path.display(), "credentials saved");
        Ok(lines.len())
    }

    /// 读取并解密全部可恢复的记录
    pub fn load(&self, key: &SessionKey) -> Result<Vec<CredentialRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        // 按字节切行：损坏的字节只影响所在行，不能让整个加载失败
        for (index, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let mut raw = raw?;
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let Ok(line) = String::from_utf8(raw) else {
                warn!(line = index + 1, "skipping credential line that is not valid UTF-8");
                continue;
            };
            match decode_line(key, &line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, error = %e, "skipping unreadable credential line"),
            }
        }

        info!(count = records.len(), "credentials loaded");
        Ok(records)
    }
}
