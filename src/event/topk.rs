use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{AuditError, Result};
use crate::event::lag::LagEvent;

/// 固定容量的 Top-K：保留 lag 最大的 K 个事件。
///
/// 内部是按 (lag, sequence) 排序的小顶堆，堆顶即当前最小值（O(1)），
/// 插入/替换 O(log K)。内存只与 K 有关。
#[derive(Debug)]
pub struct TopKHeap {
    capacity: usize,
    heap: BinaryHeap<Reverse<LagEvent>>,
}

impl TopKHeap {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AuditError::InvalidArgument(
                "topN must be a positive integer, got: 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn min(&self) -> Option<&LagEvent> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    /// 未满直接插入；已满时仅当 lag 严格大于堆顶才替换。
    ///
    /// 相同 lag 不替换，所以并列时先检测到的事件留下。
    /// metric 只在确定入堆时才分配。
    pub fn offer(&mut self, lag: u64, sequence: u64, metric: &str) -> bool {
        if self.heap.len() >= self.capacity {
            let beats_min = self.heap.peek().is_some_and(|Reverse(min)| lag > min.lag);
            if !beats_min {
                return false;
            }
            self.heap.pop();
        }
        self.heap.push(Reverse(LagEvent {
            lag,
            sequence,
            metric: metric.to_string(),
        }));
        true
    }

    /// 按 lag 降序输出；并列按 sequence 升序（先检测先出）。
    pub fn into_ranked(self) -> Vec<LagEvent> {
        let mut events: Vec<LagEvent> = self.heap.into_iter().map(|Reverse(e)| e).collect();
        events.sort_unstable_by(|a, b| b.lag.cmp(&a.lag).then_with(|| a.sequence.cmp(&b.sequence)));
        events
    }
}
