use serde::Serialize;
use std::fmt;

/// 指标名（点分层级路径），外部表示即点连接字符串。
///
/// 段按 `.` 原样切分：顺序有意义，不去重。只保存一份连接后的字符串，
/// 前缀通过切片取得，避免为每个深度分配。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MetricName(String);

impl MetricName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }

    /// 段数
    pub fn depth(&self) -> usize {
        self.0.bytes().filter(|&b| b == b'.').count() + 1
    }

    /// 前 `depth` 段组成的前缀；段数不足时返回 None。
    pub fn prefix(&self, depth: usize) -> Option<&str> {
        if depth == 0 {
            return Some("");
        }
        let mut seen = 0;
        for (i, b) in self.0.bytes().enumerate() {
            if b == b'.' {
                seen += 1;
                if seen == depth {
                    return Some(&self.0[..i]);
                }
            }
        }
        (seen + 1 == depth).then_some(self.0.as_str())
    }

    /// 逐层展开 (prefix, child)：深度 d ∈ 1..n-1 时 prefix = s1..sd，child = s{d+1}。
    pub fn prefix_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        let raw = self.0.as_str();
        raw.match_indices('.').map(move |(i, _)| {
            let rest = &raw[i + 1..];
            let child = rest.split('.').next().unwrap_or(rest);
            (&raw[..i], child)
        })
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_field_sep(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// 从一行原始字节中取出第一个字段作为指标名（cardinality 路径）。
///
/// - 无字段分隔符的行跳过
/// - 非法 UTF-8 以替换字符代替，不丢行
/// - 指标字段为空时跳过
pub fn parse_metric_field(line: &[u8]) -> Option<MetricName> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let sep = line.iter().position(|&b| is_field_sep(b))?;
    let field = &line[..sep];
    if field.is_empty() {
        return None;
    }
    Some(MetricName::new(String::from_utf8_lossy(field)))
}

/// 解析 lag 路径所需的 (metric, timestamp)。
///
/// 按空白切分，至少两个字段；最后一个字段必须是纯 ASCII 数字且不溢出 u64。
pub fn parse_timestamped(line: &str) -> Option<(&str, u64)> {
    let mut fields = line.split_whitespace();
    let metric = fields.next()?;
    let last = fields.last()?;
    if !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ts = last.parse::<u64>().ok()?;
    Some((metric, ts))
}
