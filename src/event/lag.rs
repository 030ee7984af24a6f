use serde::Serialize;
use std::io::BufRead;

use crate::core::metric::parse_timestamped;
use crate::error::{AuditError, Result};
use crate::event::topk::TopKHeap;
use crate::stats::LagReport;
use crate::storage::AuditSource;

/// 乱序事件：lag = 此前最大时间戳 - 当前时间戳
///
/// 字段顺序决定派生的 Ord：先 lag 再 sequence；sequence 唯一，metric 不参与比较。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LagEvent {
    #[serde(rename = "lag_seconds")]
    pub lag: u64,
    pub sequence: u64,
    pub metric: String,
}

/// 单遍流式 lag 检测器（状态机）
///
/// 每次运行一个实例，状态全部归实例所有。额外内存 O(K)，与文件大小无关。
#[derive(Debug)]
pub struct LagDetector {
    min_ts: Option<u64>,
    max_ts: Option<u64>,
    seen_max_ts: Option<u64>,
    out_of_order_count: u64,
    max_lag: Option<u64>,
    sequence: u64,
    top: TopKHeap,
}

impl LagDetector {
    pub fn new(top_n: usize) -> Result<Self> {
        Ok(Self {
            min_ts: None,
            max_ts: None,
            seen_max_ts: None,
            out_of_order_count: 0,
            max_lag: None,
            sequence: 0,
            top: TopKHeap::new(top_n)?,
        })
    }

    pub fn observe(&mut self, metric: &str, ts: u64) {
        self.min_ts = Some(self.min_ts.map_or(ts, |m| m.min(ts)));
        self.max_ts = Some(self.max_ts.map_or(ts, |m| m.max(ts)));

        // 与“本行之前”的最大值比较，比较完才推进高水位
        if let Some(seen) = self.seen_max_ts {
            if ts < seen {
                let lag = seen - ts;
                self.out_of_order_count += 1;
                self.sequence += 1;
                self.max_lag = Some(self.max_lag.map_or(lag, |m| m.max(lag)));
                self.top.offer(lag, self.sequence, metric);
            }
        }
        self.seen_max_ts = Some(self.seen_max_ts.map_or(ts, |m| m.max(ts)));
    }

    /// 返回该行是否有效；无效行直接忽略
    pub fn observe_line(&mut self, line: &str) -> bool {
        match parse_timestamped(line) {
            Some((metric, ts)) => {
                self.observe(metric, ts);
                true
            }
            None => false,
        }
    }

    /// 逐行消费；非法 UTF-8 以替换字符解码，不中断。返回有效行数。
    pub fn consume<R: BufRead>(&mut self, mut reader: R) -> std::io::Result<u64> {
        let mut buf = Vec::new();
        let mut valid = 0u64;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if self.observe_line(&line) {
                valid += 1;
            }
        }
        Ok(valid)
    }

    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    pub fn finish(self) -> LagReport {
        LagReport {
            min_ts: self.min_ts,
            max_ts: self.max_ts,
            span_seconds: match (self.min_ts, self.max_ts) {
                (Some(min), Some(max)) => max - min,
                _ => 0,
            },
            out_of_order: self.out_of_order_count > 0,
            out_of_order_count: self.out_of_order_count,
            max_lag_seconds: self.max_lag,
            events: self.top.into_ranked(),
        }
    }
}

/// 对整个文件做一次 lag 分析
pub fn analyze_lag(source: &AuditSource, top_n: usize) -> Result<LagReport> {
    let mut detector = LagDetector::new(top_n)?;
    let reader = source.reader()?;
    let valid = detector
        .consume(reader)
        .map_err(|e| AuditError::io_read(source.path(), e))?;
    tracing::info!(
        "lag scan of {} done: {} valid lines, {} out-of-order",
        source.path().display(),
        valid,
        detector.out_of_order_count()
    );
    Ok(detector.finish())
}
