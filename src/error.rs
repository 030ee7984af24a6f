use std::path::PathBuf;

/// 分析过程中的致命错误。
///
/// 行级解析失败不在此列：坏行直接跳过，不计数、不中断。
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl AuditError {
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoRead {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
