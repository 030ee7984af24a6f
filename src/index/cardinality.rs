use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::core::metric::MetricName;
use crate::core::rdd::ChunkSummary;

/// 全局基数索引：所有分片汇总的并集。
///
/// 合并是逐 key 的集合并，满足交换律与结合律，
/// 所以结果与分片边界、合并顺序无关。
#[derive(Clone, Debug, Default)]
pub struct CardinalityIndex {
    metrics: HashSet<MetricName>,
    prefix_children: HashMap<String, HashSet<String>>,
}

impl CardinalityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单线程合并；调用方须在全部 worker join 之后调用。
    pub fn merge<I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = ChunkSummary>,
    {
        let mut index = Self::new();
        for summary in summaries {
            index.absorb(summary);
        }
        index
    }

    /// 吸收一个分片汇总。首次出现的 prefix 直接移入整个集合，避免重复拷贝。
    pub fn absorb(&mut self, summary: ChunkSummary) {
        let ChunkSummary {
            metrics,
            prefix_children,
        } = summary;

        if self.metrics.is_empty() {
            self.metrics = metrics;
        } else {
            self.metrics.extend(metrics);
        }

        for (prefix, children) in prefix_children {
            match self.prefix_children.entry(prefix) {
                Entry::Vacant(v) => {
                    v.insert(children);
                }
                Entry::Occupied(mut o) => {
                    let merged = o.get_mut();
                    if merged.len() < children.len() {
                        let smaller = std::mem::replace(merged, children);
                        merged.extend(smaller);
                    } else {
                        merged.extend(children);
                    }
                }
            }
        }
    }

    pub fn metrics(&self) -> &HashSet<MetricName> {
        &self.metrics
    }

    pub fn unique_metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn prefix_count(&self) -> usize {
        self.prefix_children.len()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.prefix_children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self, prefix: &str) -> Option<&HashSet<String>> {
        self.prefix_children.get(prefix)
    }

    /// prefix 下直接子段的去重数；未出现过的 prefix 为 0
    pub fn cardinality(&self, prefix: &str) -> usize {
        self.children(prefix).map_or(0, HashSet::len)
    }

    pub fn max_depth(&self) -> usize {
        self.metrics.iter().map(MetricName::depth).max().unwrap_or(0)
    }
}

impl FromIterator<ChunkSummary> for CardinalityIndex {
    fn from_iter<T: IntoIterator<Item = ChunkSummary>>(iter: T) -> Self {
        Self::merge(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdd::summarize_bytes;

    fn summaries() -> Vec<ChunkSummary> {
        vec![
            summarize_bytes(b"a.b.c 1 1\na.b.d 1 2\n"),
            summarize_bytes(b"a.b.c 1 3\na.x.y 1 4\n"),
            summarize_bytes(b"a.b.e 1 5\nz.q 1 6\nlonely 1 7\n"),
            summarize_bytes(b""),
        ]
    }

    fn fingerprint(index: &CardinalityIndex) -> (usize, Vec<(String, usize)>) {
        let mut cards: Vec<_> = index
            .prefixes()
            .map(|(p, c)| (p.to_string(), c.len()))
            .collect();
        cards.sort();
        (index.unique_metric_count(), cards)
    }

    #[test]
    fn merge_unions_children_per_prefix() {
        let index = CardinalityIndex::merge(summaries());
        assert_eq!(index.unique_metric_count(), 6);
        assert_eq!(index.cardinality("a"), 2);
        assert_eq!(index.cardinality("a.b"), 3);
        assert_eq!(index.cardinality("a.x"), 1);
        assert_eq!(index.cardinality("z"), 1);
        assert_eq!(index.cardinality("missing"), 0);
        assert_eq!(index.max_depth(), 3);
    }

    #[test]
    fn merge_is_order_independent() {
        let base = summaries();
        let expected = fingerprint(&CardinalityIndex::merge(base.clone()));
        let orders: [[usize; 4]; 5] = [
            [3, 2, 1, 0],
            [1, 0, 3, 2],
            [2, 3, 0, 1],
            [0, 2, 1, 3],
            [3, 0, 2, 1],
        ];
        for order in orders {
            let permuted: CardinalityIndex = order.iter().map(|&i| base[i].clone()).collect();
            assert_eq!(fingerprint(&permuted), expected);
        }
    }

    #[test]
    fn merge_matches_single_pass_regardless_of_split() {
        let data: &[u8] = b"p.q.r 1 1\np.q.s 1 2\np.t.r 1 3\nu.v 1 4\np.q.r 1 5\n";
        let whole = fingerprint(&CardinalityIndex::merge([summarize_bytes(data)]));
        let lines: Vec<&[u8]> = data.split_inclusive(|&b| b == b'\n').collect();
        for cut in 0..=lines.len() {
            let left: Vec<u8> = lines[..cut].concat();
            let right: Vec<u8> = lines[cut..].concat();
            let split = CardinalityIndex::merge([summarize_bytes(&left), summarize_bytes(&right)]);
            assert_eq!(fingerprint(&split), whole);
        }
    }
}
