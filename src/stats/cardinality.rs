use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::core::metric::MetricName;
use crate::index::CardinalityIndex;
use crate::stats::{rank_desc, thousands, Sample, RULE};

/// 位置 0 的父前缀为空，报表里用这个标签代替
pub const ROOT_LABEL: &str = "<root>";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrefixFanout {
    pub rank: usize,
    pub prefix: String,
    pub depth: usize,
    pub children: usize,
    pub sample: Sample,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FamilyCount {
    pub family: String,
    pub series: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FamilyTotals {
    pub depth: usize,
    pub families: Vec<FamilyCount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionCardinality {
    pub position: usize,
    pub unique_values: usize,
    pub high_cardinality: bool,
    pub sample: Sample,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParentContribution {
    pub parent: String,
    pub unique_values: usize,
    pub sample: Sample,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DrillDown {
    pub position: usize,
    pub unique_values: usize,
    pub parents: Vec<ParentContribution>,
}

/// 基数分析的四个视图。同一输入多次运行结果完全一致。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardinalityReport {
    pub unique_metrics: usize,
    pub max_depth: usize,
    pub threshold: usize,
    pub top_prefixes: Vec<PrefixFanout>,
    pub families: Vec<FamilyTotals>,
    pub positions: Vec<PositionCardinality>,
    pub drilldowns: Vec<DrillDown>,
}

impl CardinalityReport {
    pub fn build(index: &CardinalityIndex, cfg: &AnalysisConfig) -> Self {
        let metrics = index.metrics();
        let top_prefixes = top_prefixes(index, cfg.top_prefixes, cfg.sample_size);
        let families = cfg
            .family_depths
            .iter()
            .map(|&depth| family_totals(metrics, depth, cfg.family_top))
            .collect();

        let values = position_values(metrics);
        let positions = position_cardinality(&values, cfg.threshold, cfg.sample_size);
        let drilldowns = positions
            .iter()
            .filter(|p| p.high_cardinality)
            .map(|p| DrillDown {
                position: p.position,
                unique_values: p.unique_values,
                parents: drill_down(metrics, p.position, cfg.drill_top, cfg.sample_size),
            })
            .collect();

        Self {
            unique_metrics: metrics.len(),
            max_depth: values.len(),
            threshold: cfg.threshold,
            top_prefixes,
            families,
            positions,
            drilldowns,
        }
    }
}

/// 视图 1：按直接子段数排名的前缀
pub fn top_prefixes(index: &CardinalityIndex, limit: usize, sample: usize) -> Vec<PrefixFanout> {
    let counts = index.prefixes().map(|(p, c)| (p, c.len())).collect();
    rank_desc(counts, limit)
        .into_iter()
        .enumerate()
        .map(|(i, (prefix, children))| PrefixFanout {
            rank: i + 1,
            prefix: prefix.to_string(),
            depth: MetricName::new(prefix).depth(),
            children,
            sample: index
                .children(prefix)
                .map(|c| Sample::from_values(c.iter().map(String::as_str), sample))
                .unwrap_or_default(),
        })
        .collect()
}

/// 视图 2：按前 `depth` 段分组的序列数；段数不足的指标不参与
pub fn family_totals(metrics: &HashSet<MetricName>, depth: usize, limit: usize) -> FamilyTotals {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for family in metrics.iter().filter_map(|m| m.prefix(depth)) {
        *counts.entry(family).or_default() += 1;
    }
    let families = rank_desc(counts.into_iter().collect(), limit)
        .into_iter()
        .map(|(family, series)| FamilyCount {
            family: family.to_string(),
            series,
        })
        .collect();
    FamilyTotals { depth, families }
}

/// 每个位置出现过的去重段值；向量长度即最大段数
pub fn position_values(metrics: &HashSet<MetricName>) -> Vec<HashSet<&str>> {
    let mut values: Vec<HashSet<&str>> = Vec::new();
    for metric in metrics {
        for (i, segment) in metric.segments().enumerate() {
            if values.len() <= i {
                values.resize_with(i + 1, HashSet::new);
            }
            values[i].insert(segment);
        }
    }
    values
}

/// 视图 3：逐位置去重数，超过阈值（严格大于）即标记
pub fn position_cardinality(
    values: &[HashSet<&str>],
    threshold: usize,
    sample: usize,
) -> Vec<PositionCardinality> {
    values
        .iter()
        .enumerate()
        .map(|(position, vals)| PositionCardinality {
            position,
            unique_values: vals.len(),
            high_cardinality: vals.len() > threshold,
            sample: Sample::from_values(vals.iter().copied(), sample),
        })
        .collect()
}

/// 视图 4：高基数位置按父前缀拆分，找出贡献最多去重值的父前缀
pub fn drill_down(
    metrics: &HashSet<MetricName>,
    position: usize,
    limit: usize,
    sample: usize,
) -> Vec<ParentContribution> {
    let mut parents: HashMap<&str, HashSet<&str>> = HashMap::new();
    for metric in metrics {
        let Some(value) = metric.segments().nth(position) else {
            continue;
        };
        let parent = match position {
            0 => ROOT_LABEL,
            _ => match metric.prefix(position) {
                Some(p) => p,
                None => continue,
            },
        };
        parents.entry(parent).or_default().insert(value);
    }

    let counts = parents.iter().map(|(p, v)| (*p, v.len())).collect();
    rank_desc(counts, limit)
        .into_iter()
        .map(|(parent, unique_values)| ParentContribution {
            parent: parent.to_string(),
            unique_values,
            sample: Sample::from_values(parents[parent].iter().copied(), sample),
        })
        .collect()
}

impl fmt::Display for CardinalityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total unique metric names: {}", thousands(self.unique_metrics))?;

        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "TOP {} HIGH CARDINALITY PREFIXES", self.top_prefixes.len())?;
        writeln!(f, "(prefix -> number of unique direct children at the next dot-level)")?;
        writeln!(f, "{}\n", RULE)?;
        for p in &self.top_prefixes {
            writeln!(
                f,
                "  {:>3}. [{} unique children] (depth {})",
                p.rank,
                thousands(p.children),
                p.depth
            )?;
            writeln!(f, "       Prefix: {}", p.prefix)?;
            writeln!(f, "       Sample: {}", p.sample)?;
            writeln!(f)?;
        }

        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "METRIC FAMILIES BY TOTAL UNIQUE SERIES")?;
        writeln!(f, "(grouping by first N dot-segments, counting total unique full metric names)")?;
        writeln!(f, "{}\n", RULE)?;
        for totals in &self.families {
            writeln!(
                f,
                "--- At depth {} (first {} segments) ---",
                totals.depth, totals.depth
            )?;
            for fam in &totals.families {
                writeln!(f, "  {:>8} series  |  {}", thousands(fam.series), fam.family)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "CARDINALITY EXPLOSION ANALYSIS")?;
        writeln!(f, "Finding which position in the metric path has an explosion of unique values")?;
        writeln!(f, "{}\n", RULE)?;
        writeln!(f, "Max metric depth: {} segments\n", self.max_depth)?;
        writeln!(f, "  {:>10} | {:>15} | Sample Values", "Position", "Unique Values")?;
        writeln!(f, "  {}-+-{}-+-{}", "-".repeat(10), "-".repeat(15), "-".repeat(50))?;
        for p in &self.positions {
            let flag = if p.high_cardinality {
                " <<<< HIGH CARDINALITY"
            } else {
                ""
            };
            writeln!(
                f,
                "  {:>10} | {:>15} | {}{}",
                p.position,
                thousands(p.unique_values),
                p.sample,
                flag
            )?;
        }

        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "DRILL-DOWN: High cardinality positions broken down by parent prefix")?;
        writeln!(f, "(threshold: more than {} unique values)", thousands(self.threshold))?;
        writeln!(f, "{}\n", RULE)?;
        for d in &self.drilldowns {
            writeln!(
                f,
                "Position {} has {} unique values",
                d.position,
                thousands(d.unique_values)
            )?;
            writeln!(
                f,
                "  Top parent prefixes contributing unique values at position {}:",
                d.position
            )?;
            for p in &d.parents {
                writeln!(f, "    [{:>6} unique] {}", thousands(p.unique_values), p.parent)?;
                writeln!(f, "                      Samples: {}", p.sample)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdd::summarize_bytes;

    fn index_of(lines: &[String]) -> CardinalityIndex {
        let mut data = lines.join(" 1 100\n");
        data.push_str(" 1 100\n");
        CardinalityIndex::merge([summarize_bytes(data.as_bytes())])
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn top_prefixes_rank_by_fanout_then_prefix() {
        let index = index_of(&names(&[
            "a.x.1", "a.x.2", "a.x.3", "a.y.1", "b.p", "b.q", "c.r",
        ]));
        let top = top_prefixes(&index, 10, 5);
        let got: Vec<_> = top.iter().map(|p| (p.prefix.as_str(), p.children)).collect();
        assert_eq!(
            got,
            vec![("a.x", 3), ("a", 2), ("b", 2), ("a.y", 1), ("c", 1)]
        );
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[0].depth, 2);
        assert_eq!(top[0].sample.values, vec!["1", "2", "3"]);
        assert_eq!(top_prefixes(&index, 2, 5).len(), 2);
    }

    #[test]
    fn top_prefix_sample_marks_truncation() {
        let raw: Vec<String> = (0..8).map(|i| format!("svc.host{}", i)).collect();
        let index = index_of(&raw);
        let top = top_prefixes(&index, 1, 5);
        assert_eq!(top[0].children, 8);
        assert_eq!(top[0].sample.more, 3);
        assert_eq!(
            top[0].sample.to_string(),
            "host0, host1, host2, host3, host4, ... (+3 more)"
        );
    }

    #[test]
    fn family_totals_exclude_short_names_and_break_ties() {
        let index = index_of(&names(&[
            "p.a.x.1", "p.a.x.2", "p.b.y.1", "p.b.z.1", "p.c", "q.a.x",
        ]));
        let t = family_totals(index.metrics(), 3, 15);
        let got: Vec<_> = t
            .families
            .iter()
            .map(|f| (f.family.as_str(), f.series))
            .collect();
        assert_eq!(got, vec![("p.a.x", 2), ("p.b.y", 1), ("p.b.z", 1), ("q.a.x", 1)]);

        let t = family_totals(index.metrics(), 4, 2);
        assert_eq!(t.families.len(), 2);
        assert_eq!(t.families[0].family, "p.a.x.1");
    }

    #[test]
    fn position_counts_span_max_depth() {
        let index = index_of(&names(&["a.b.c", "a.d", "e"]));
        let values = position_values(index.metrics());
        let pos = position_cardinality(&values, 1, 5);
        let counts: Vec<_> = pos.iter().map(|p| p.unique_values).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        let flagged: Vec<_> = pos.iter().filter(|p| p.high_cardinality).map(|p| p.position).collect();
        assert_eq!(flagged, vec![0, 1]);
    }

    #[test]
    fn only_position_over_threshold_is_drilled_down() {
        let mut raw: Vec<String> = (0..501).map(|i| format!("pod.app.v{:04}.count", i)).collect();
        raw.extend((0..500).map(|i| format!("pod.web.z.h{:04}", i)));
        let index = index_of(&raw);
        let report = CardinalityReport::build(&index, &AnalysisConfig::default());

        assert_eq!(report.positions[2].unique_values, 502);
        assert_eq!(report.positions[3].unique_values, 501);
        assert_eq!(report.drilldowns.len(), 2);

        // 精确 501 / 500 的边界
        let raw: Vec<String> = (0..501).map(|i| format!("pod.app.v{:04}", i)).collect();
        let index = index_of(&raw);
        let report = CardinalityReport::build(&index, &AnalysisConfig::default());
        let flagged: Vec<_> = report.drilldowns.iter().map(|d| d.position).collect();
        assert_eq!(flagged, vec![2]);
        let d = &report.drilldowns[0];
        assert_eq!(d.unique_values, 501);
        assert_eq!(d.parents.len(), 1);
        assert_eq!(d.parents[0].parent, "pod.app");
        assert_eq!(d.parents[0].unique_values, 501);
        assert_eq!(d.parents[0].sample.more, 496);

        let raw: Vec<String> = (0..500).map(|i| format!("pod.app.v{:04}", i)).collect();
        let report = CardinalityReport::build(&index_of(&raw), &AnalysisConfig::default());
        assert!(report.drilldowns.is_empty());
    }

    #[test]
    fn drill_down_uses_root_label_at_position_zero() {
        let index = index_of(&names(&["a.x", "b.x", "c", "a.y"]));
        let parents = drill_down(index.metrics(), 0, 20, 5);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].parent, ROOT_LABEL);
        assert_eq!(parents[0].unique_values, 3);

        let parents = drill_down(index.metrics(), 1, 20, 5);
        let got: Vec<_> = parents.iter().map(|p| (p.parent.as_str(), p.unique_values)).collect();
        assert_eq!(got, vec![("a", 2), ("b", 1)]);
    }

    #[test]
    fn report_is_reproducible() {
        let raw: Vec<String> = (0..300)
            .map(|i| format!("pod{}.svc{}.m{}.x{}", i % 3, i % 11, i % 17, i))
            .collect();
        let cfg = AnalysisConfig {
            threshold: 20,
            ..AnalysisConfig::default()
        };
        let a = CardinalityReport::build(&index_of(&raw), &cfg);
        let mut rev = raw.clone();
        rev.reverse();
        let b = CardinalityReport::build(&index_of(&rev), &cfg);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.families.len(), 4);
    }
}
