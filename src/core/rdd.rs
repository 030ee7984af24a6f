use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use crate::core::metric::{parse_metric_field, MetricName};
use crate::core::partition::Chunk;
use crate::error::{AuditError, Result};
use crate::storage::AuditSource;

/// RDD 特质：分区 + 逐分区计算，collect 时 fork-join。
///
/// compute 只读自己的分区、只返回值，不触碰任何共享可变状态，
/// 因此并行阶段无需加锁。任一分区失败即整体失败（fail-fast）。
pub trait RDD<T: Send>: Sync {
    /// 获取分区列表
    fn partitions(&self) -> &[Chunk];

    /// 计算指定分区
    fn compute(&self, partition: &Chunk) -> Result<T>;

    /// 执行操作（触发计算）；结果按分区顺序排列
    fn collect(&self) -> Result<Vec<T>> {
        use rayon::prelude::*;
        self.partitions()
            .par_iter()
            .map(|p| self.compute(p))
            .collect()
    }
}

/// 单个分片的局部汇总
#[derive(Clone, Debug, Default)]
pub struct ChunkSummary {
    pub metrics: HashSet<MetricName>,
    /// prefix -> 直接子段集合
    pub prefix_children: HashMap<String, HashSet<String>>,
}

impl ChunkSummary {
    pub fn record(&mut self, metric: MetricName) {
        if self.metrics.contains(&metric) {
            return;
        }
        for (prefix, child) in metric.prefix_edges() {
            match self.prefix_children.get_mut(prefix) {
                Some(children) => {
                    if !children.contains(child) {
                        children.insert(child.to_string());
                    }
                }
                None => {
                    let mut children = HashSet::new();
                    children.insert(child.to_string());
                    self.prefix_children.insert(prefix.to_string(), children);
                }
            }
        }
        self.metrics.insert(metric);
    }

    /// 单行（不含 '\n'）；空行、坏行直接忽略
    pub fn record_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        if let Some(metric) = parse_metric_field(line) {
            self.record(metric);
        }
    }
}

/// 解析一段行对齐字节
pub fn summarize_bytes(data: &[u8]) -> ChunkSummary {
    let mut summary = ChunkSummary::default();
    for line in data.split(|&b| b == b'\n') {
        summary.record_line(line);
    }
    summary
}

/// 逐行流式解析；行缓冲复用，内存只随最长行与去重指标数增长，与分片大小无关。
/// 返回汇总与实际消费的字节数。
pub fn summarize_reader<R: BufRead>(mut reader: R) -> std::io::Result<(ChunkSummary, u64)> {
    let mut summary = ChunkSummary::default();
    let mut line = Vec::new();
    let mut consumed = 0u64;
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        consumed += n as u64;
        let body = line.strip_suffix(b"\n").unwrap_or(&line[..]);
        summary.record_line(body);
    }
    Ok((summary, consumed))
}

/// 审计文件的分片 RDD
pub struct AuditRDD {
    pub source: AuditSource,
    pub partitions: Vec<Chunk>,
}

impl AuditRDD {
    pub fn new(source: AuditSource, partitions: Vec<Chunk>) -> Self {
        Self { source, partitions }
    }
}

impl RDD<ChunkSummary> for AuditRDD {
    fn partitions(&self) -> &[Chunk] {
        &self.partitions
    }

    fn compute(&self, partition: &Chunk) -> Result<ChunkSummary> {
        scan_chunk(&self.source, partition)
    }
}

/// 分片扫描实现
pub fn scan_chunk(source: &AuditSource, chunk: &Chunk) -> Result<ChunkSummary> {
    let reader = source.range_reader(chunk)?;
    let (summary, consumed) =
        summarize_reader(reader).map_err(|e| AuditError::io_read(source.path(), e))?;
    // 文件在分析期间被截断
    if consumed < chunk.len() {
        return Err(AuditError::io_read(
            source.path(),
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "chunk {} ended after {} of {} bytes",
                    chunk.id,
                    consumed,
                    chunk.len()
                ),
            ),
        ));
    }
    tracing::debug!(
        "chunk {} [{}..{}): {} metrics, {} prefixes",
        chunk.id,
        chunk.start,
        chunk.end,
        summary.metrics.len(),
        summary.prefix_children.len()
    );
    Ok(summary)
}
