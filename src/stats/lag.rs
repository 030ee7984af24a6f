use serde::Serialize;
use std::fmt;

use crate::event::lag::LagEvent;

/// lag 分析结果。`min_ts`/`max_ts` 为 None 表示没有任何有效行。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LagReport {
    pub min_ts: Option<u64>,
    pub max_ts: Option<u64>,
    pub span_seconds: u64,
    pub out_of_order: bool,
    pub out_of_order_count: u64,
    pub max_lag_seconds: Option<u64>,
    /// lag 降序，并列时先检测到的在前
    pub events: Vec<LagEvent>,
}

fn ts_or_na(ts: Option<u64>) -> String {
    ts.map_or_else(|| "NA".to_string(), |t| t.to_string())
}

impl fmt::Display for LagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "min_ts={}", ts_or_na(self.min_ts))?;
        writeln!(f, "max_ts={}", ts_or_na(self.max_ts))?;
        writeln!(f, "span_seconds={}", self.span_seconds)?;
        if !self.out_of_order {
            return writeln!(f, "out_of_order=NO");
        }

        writeln!(f, "out_of_order=YES")?;
        writeln!(f, "out_of_order_count={}", self.out_of_order_count)?;
        if let Some(max_lag) = self.max_lag_seconds {
            writeln!(f, "max_lag_seconds={}", max_lag)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Top {} lag events (lag_seconds metric_name):",
            self.events.len()
        )?;
        for (i, e) in self.events.iter().enumerate() {
            writeln!(f, "{:>2}) {}s {}", i + 1, e.lag, e.metric)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ranked_events() {
        let r = LagReport {
            min_ts: Some(5),
            max_ts: Some(30),
            span_seconds: 25,
            out_of_order: true,
            out_of_order_count: 2,
            max_lag_seconds: Some(25),
            events: vec![
                LagEvent {
                    lag: 25,
                    sequence: 2,
                    metric: "m.e".into(),
                },
                LagEvent {
                    lag: 5,
                    sequence: 1,
                    metric: "m.c".into(),
                },
            ],
        };
        let text = r.to_string();
        assert!(text.starts_with("min_ts=5\nmax_ts=30\nspan_seconds=25\nout_of_order=YES\n"));
        assert!(text.contains("out_of_order_count=2\nmax_lag_seconds=25\n"));
        assert!(text.contains(" 1) 25s m.e\n 2) 5s m.c\n"));
    }

    #[test]
    fn in_order_report_stops_after_flag() {
        let r = LagReport {
            min_ts: Some(1),
            max_ts: Some(9),
            span_seconds: 8,
            out_of_order: false,
            out_of_order_count: 0,
            max_lag_seconds: None,
            events: Vec::new(),
        };
        assert_eq!(
            r.to_string(),
            "min_ts=1\nmax_ts=9\nspan_seconds=8\nout_of_order=NO\n"
        );
    }
}
