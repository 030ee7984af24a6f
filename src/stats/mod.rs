pub mod cardinality;
pub mod lag;

use serde::Serialize;
use std::fmt;

pub use cardinality::*;
pub use lag::*;

pub(crate) const RULE: &str =
    "================================================================================";

pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 有序样本：字典序前 N 个值 + 被截掉的数量
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub values: Vec<String>,
    pub more: usize,
}

impl Sample {
    pub fn from_values<'a, I>(values: I, size: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut all: Vec<&str> = values.into_iter().collect();
        let more = all.len().saturating_sub(size);
        if more > 0 {
            // 只需要最小的 size 个，先部分选择再排序
            all.select_nth_unstable(size);
            all.truncate(size);
        }
        all.sort_unstable();
        Self {
            values: all.into_iter().map(str::to_string).collect(),
            more,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(", "))?;
        if self.more > 0 {
            write!(f, ", ... (+{} more)", self.more)?;
        }
        Ok(())
    }
}

/// 按 (count 降序, key 升序) 排名并截断；key 唯一时结果完全确定。
pub(crate) fn rank_desc<'a>(mut items: Vec<(&'a str, usize)>, limit: usize) -> Vec<(&'a str, usize)> {
    items.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    items.truncate(limit);
    items
}

/// 千分位格式，与原始报表的 `{:,}` 一致
pub(crate) fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_truncates_to_smallest_sorted_values() {
        let vals = ["k", "b", "z", "a", "c", "d", "e"];
        let s = Sample::from_values(vals.iter().copied(), 5);
        assert_eq!(s.values, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(s.more, 2);
        assert_eq!(s.to_string(), "a, b, c, d, e, ... (+2 more)");

        let s = Sample::from_values(["y", "x"], 5);
        assert_eq!(s.to_string(), "x, y");
        assert_eq!(s.more, 0);
    }

    #[test]
    fn rank_breaks_ties_lexicographically() {
        let ranked = rank_desc(vec![("b", 3), ("a", 3), ("c", 9), ("d", 1)], 3);
        assert_eq!(ranked, vec![("c", 9), ("a", 3), ("b", 3)]);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
