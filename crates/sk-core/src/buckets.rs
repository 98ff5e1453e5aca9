use crate::model::{Decision, Severity, Stats};
use std::collections::BTreeMap;

/// One bar of a proportional chart, resolved against a client-owned vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketBar {
    pub key: &'static str,
    pub label: &'static str,
    pub count: i64,
    pub percent: u8,
}

/// Resolves every `(key, label)` of `vocabulary` against the sparse `counts`
/// map and scales the bars to the largest resolved count.
///
/// Keys present in `counts` but not in the vocabulary never produce a bar.
pub fn normalize_buckets(
    vocabulary: &[(&'static str, &'static str)],
    counts: &BTreeMap<String, i64>,
) -> Vec<BucketBar> {
    let resolved: Vec<i64> = vocabulary
        .iter()
        .map(|(key, _)| counts.get(*key).copied().unwrap_or(0))
        .collect();
    let max = resolved.iter().copied().max().unwrap_or(0).max(1);
    vocabulary
        .iter()
        .zip(resolved)
        .map(|(&(key, label), count)| BucketBar {
            key,
            label,
            count,
            percent: bar_percent(count, max),
        })
        .collect()
}

/// `round(count / max * 100)`, pinned to `0..=100`.
pub fn bar_percent(count: i64, max: i64) -> u8 {
    if count <= 0 || max <= 0 {
        return 0;
    }
    let pct = (count as f64 / max as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

pub fn severity_bars(stats: &Stats) -> Vec<BucketBar> {
    let vocabulary = Severity::ALL.map(|severity| (severity.as_str(), severity.as_str()));
    normalize_buckets(&vocabulary, &stats.by_severity)
}

pub fn decision_bars(stats: &Stats) -> Vec<BucketBar> {
    let vocabulary = Decision::ALL.map(|decision| (decision.as_str(), decision.display_label()));
    normalize_buckets(&vocabulary, &stats.by_decision)
}

pub fn format_cost_usd(value: f64) -> String {
    if value.is_finite() {
        format!("${value:.4}")
    } else {
        "$n/a".to_string()
    }
}

/// Number of filled cells for a bar `width` cells wide.
pub fn bar_cells(percent: u8, width: usize) -> usize {
    (usize::from(percent.min(100)) * width) / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleCount;

    fn counts(entries: &[(&str, i64)]) -> BTreeMap<String, i64> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), *value))
            .collect()
    }

    fn sample_stats() -> Stats {
        Stats {
            total_jobs: 10,
            total_findings: 25,
            total_model_calls: 40,
            total_estimated_cost_usd: 1.2345,
            by_severity: counts(&[("critical", 2), ("high", 5)]),
            by_decision: counts(&[("block", 3), ("allow", 7)]),
            top_rules: vec![RuleCount {
                rule_id: "sk-001".to_string(),
                count: 9,
            }],
        }
    }

    #[test]
    fn all_zero_counts_render_every_bar_empty() {
        let stats = Stats::default();
        for bar in severity_bars(&stats).into_iter().chain(decision_bars(&stats)) {
            assert_eq!(bar.count, 0, "{}", bar.key);
            assert_eq!(bar.percent, 0, "{}", bar.key);
        }
    }

    #[test]
    fn bars_cover_fixed_vocabulary_regardless_of_server_keys() {
        let stats = Stats {
            by_severity: counts(&[("info", 12), ("low", 3)]),
            by_decision: counts(&[("null", 4)]),
            ..Stats::default()
        };

        let severity: Vec<&str> = severity_bars(&stats).iter().map(|bar| bar.key).collect();
        assert_eq!(severity, vec!["critical", "high", "medium", "low"]);
        let low = severity_bars(&stats)[3];
        assert_eq!(low.percent, 100);

        let decisions: Vec<&str> = decision_bars(&stats).iter().map(|bar| bar.key).collect();
        assert_eq!(decisions, vec!["block", "manual_review", "allow"]);
        assert!(decision_bars(&stats).iter().all(|bar| bar.percent == 0));
    }

    #[test]
    fn sample_stats_scale_each_chart_independently() {
        let stats = sample_stats();

        let severity = severity_bars(&stats);
        assert_eq!(severity[0].percent, 40);
        assert_eq!(severity[1].percent, 100);
        assert_eq!(severity[2].percent, 0);
        assert_eq!(severity[3].percent, 0);
        assert!(severity[0].percent < severity[1].percent);

        let decisions = decision_bars(&stats);
        assert_eq!(decisions[0].label, "block");
        assert_eq!(decisions[0].percent, 43);
        assert_eq!(decisions[1].label, "manual review");
        assert_eq!(decisions[1].percent, 0);
        assert_eq!(decisions[2].percent, 100);

        assert_eq!(format_cost_usd(stats.total_estimated_cost_usd), "$1.2345");
    }

    #[test]
    fn negative_counts_render_as_empty_bars() {
        let bars = normalize_buckets(
            &[("a", "a"), ("b", "b")],
            &counts(&[("a", -4), ("b", 2)]),
        );
        assert_eq!(bars[0].count, -4);
        assert_eq!(bars[0].percent, 0);
        assert_eq!(bars[1].percent, 100);
    }

    #[test]
    fn bar_cells_scale_to_width() {
        assert_eq!(bar_cells(0, 20), 0);
        assert_eq!(bar_cells(40, 20), 8);
        assert_eq!(bar_cells(100, 20), 20);
        assert_eq!(bar_cells(250, 20), 20);
    }
}
