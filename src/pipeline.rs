use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::core::{plan_chunks, AdaptiveScheduler, AuditRDD, RDD};
use crate::error::Result;
use crate::index::CardinalityIndex;
use crate::stats::{human_bytes, CardinalityReport, RULE};
use crate::storage::AuditSource;

/// 一次基数分析的运行信息（报表头尾）
#[derive(Clone, Debug, Serialize)]
pub struct RunInfo {
    pub path: PathBuf,
    pub file_bytes: u64,
    pub jobs: usize,
    pub chunks: usize,
    pub parse_secs: f64,
    pub elapsed_secs: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CardinalityRun {
    pub info: RunInfo,
    pub report: CardinalityReport,
}

/// 基数分析：plan -> 并行 scan -> join -> merge -> report
///
/// 并行阶段各 worker 只返回自己的 ChunkSummary；
/// 合并在 join 之后单线程进行，是合并结构的唯一写者。
pub fn analyze_cardinality(path: &Path, cfg: &AnalysisConfig) -> Result<CardinalityRun> {
    cfg.validate()?;
    let started = Instant::now();
    let source = AuditSource::open(path)?;

    let jobs = AdaptiveScheduler::new().parallelism(cfg.jobs)?;
    let chunks = plan_chunks(&source, jobs)?;
    let chunk_count = chunks.len();
    tracing::info!(
        "Analyzing {} ({}) with {} workers, {} chunks",
        source.path().display(),
        human_bytes(source.len()),
        jobs,
        chunk_count
    );

    // 小文件切出的分片可能少于 jobs，多余线程没有意义
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.min(chunk_count).max(1))
        .build()?;
    let rdd = AuditRDD::new(source.clone(), chunks);
    let summaries = pool.install(|| rdd.collect())?;
    let parse_secs = started.elapsed().as_secs_f64();
    tracing::info!("Parsing completed in {:.1}s", parse_secs);

    let index = CardinalityIndex::merge(summaries);
    tracing::info!(
        "Merged {} unique metrics, {} prefixes",
        index.unique_metric_count(),
        index.prefix_count()
    );

    let report = CardinalityReport::build(&index, cfg);
    Ok(CardinalityRun {
        info: RunInfo {
            path: source.path().to_path_buf(),
            file_bytes: source.len(),
            jobs,
            chunks: chunk_count,
            parse_secs,
            elapsed_secs: started.elapsed().as_secs_f64(),
        },
        report,
    })
}

impl fmt::Display for CardinalityRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.info;
        writeln!(f, "Analyzing: {}", info.path.display())?;
        writeln!(f, "File size: {}", human_bytes(info.file_bytes))?;
        writeln!(f, "Using {} CPU cores", info.jobs)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Split into {} chunks, processing in parallel...", info.chunks)?;
        writeln!(f, "Parsing completed in {:.1}s", info.parse_secs)?;
        writeln!(f)?;
        write!(f, "{}", self.report)?;
        writeln!(f, "\n{}", RULE)?;
        writeln!(
            f,
            "Analysis completed in {:.1}s using {} cores",
            info.elapsed_secs, info.jobs
        )?;
        writeln!(f, "{}", RULE)
    }
}
