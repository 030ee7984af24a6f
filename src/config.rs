use serde::Deserialize;
use std::path::Path;

use crate::error::{AuditError, Result};

pub const DEFAULT_THRESHOLD: usize = 500;
pub const DEFAULT_TOP_N: usize = 10;

/// 基数分析参数；可由 TOML 文件提供，CLI 参数覆盖。
///
/// ```toml
/// threshold = 1000
/// top_prefixes = 100
/// family_depths = [3, 4]
/// jobs = 8
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// 位置去重数超过该值即标记为高基数
    pub threshold: usize,
    pub top_prefixes: usize,
    pub family_depths: Vec<usize>,
    pub family_top: usize,
    pub drill_top: usize,
    pub sample_size: usize,
    /// None：由 AdaptiveScheduler 决定
    pub jobs: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_prefixes: 50,
            family_depths: vec![3, 4, 5, 6],
            family_top: 15,
            drill_top: 20,
            sample_size: 5,
            jobs: None,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuditError::FileNotFound(path.to_path_buf())
            } else {
                AuditError::io_read(path, e)
            }
        })?;
        let cfg: Self = toml::from_str(&text).map_err(|e| AuditError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(AuditError::InvalidArgument(
                "jobs must be a positive integer, got: 0".to_string(),
            ));
        }
        if self.sample_size == 0 {
            return Err(AuditError::InvalidArgument(
                "sample_size must be a positive integer, got: 0".to_string(),
            ));
        }
        if self.family_depths.contains(&0) {
            return Err(AuditError::InvalidArgument(
                "family_depths entries must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
