use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use crate::core::partition::Chunk;
use crate::error::{AuditError, Result};

/// 只读审计文件句柄工厂。
///
/// 不持有打开的 File：每个 worker 各自打开、各自 seek，互不共享读位置。
#[derive(Clone, Debug)]
pub struct AuditSource {
    path: PathBuf,
    len: u64,
}

impl AuditSource {
    /// 打开前校验存在性；不存在即 FileNotFound，不产生任何输出。
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(AuditError::FileNotFound(path));
        }
        let len = std::fs::metadata(&path)
            .map_err(|e| AuditError::io_read(&path, e))?
            .len();
        Ok(Self { path, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reader(&self) -> Result<BufReader<File>> {
        let f = File::open(&self.path).map_err(|e| AuditError::io_read(&self.path, e))?;
        Ok(BufReader::new(f))
    }

    /// 只覆盖 `[start, end)` 的缓冲读取器；worker 逐行消费，不整段载入内存。
    pub fn range_reader(&self, chunk: &Chunk) -> Result<Take<BufReader<File>>> {
        let open = || -> std::io::Result<Take<BufReader<File>>> {
            let mut f = File::open(&self.path)?;
            f.seek(SeekFrom::Start(chunk.start))?;
            Ok(BufReader::new(f).take(chunk.len()))
        };
        open().map_err(|e| AuditError::io_read(&self.path, e))
    }
}
