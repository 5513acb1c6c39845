//! # Comparison-Space Analytics
//!
//! Exact statistics about how aggressively a blocking-rule sequence
//! prunes the comparison space: the cartesian baseline for the declared
//! link type, per-rule and cumulative candidate counts, and the derived
//! reduction ratio. Used to tune rule selection before any matching
//! model is trained.

use crate::blocking::compile_rule;
use crate::config::PipelineConfig;
use crate::engine::{round_to, CountsFragment, ExecutionEngine, TableCount};
use crate::error::{LinkageError, Result};
use crate::model::{BlockingRule, CandidatePair, LinkType, RuleComparisonStat};
use tracing::debug;

/// Total number of distinct-record pairs possible for the declared link
/// type, from a per-table record-count snapshot. Generates no pairs.
pub fn cartesian_count(counts: &[TableCount], link_type: LinkType) -> Result<u64> {
    match link_type {
        LinkType::DedupeOnly if counts.len() != 1 => {
            return Err(LinkageError::configuration(format!(
                "dedupe_only requires exactly one source table, found {}",
                counts.len()
            )));
        }
        LinkType::LinkOnly | LinkType::LinkAndDedupe if counts.len() < 2 => {
            return Err(LinkageError::configuration(format!(
                "{} requires at least two source tables, found {}",
                link_type,
                counts.len()
            )));
        }
        _ => {}
    }

    let sizes: Vec<u128> = counts.iter().map(|count| count.rows as u128).collect();
    let mut total: u128 = 0;

    if matches!(link_type, LinkType::LinkOnly | LinkType::LinkAndDedupe) {
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                total += sizes[i] * sizes[j];
            }
        }
    }
    if matches!(link_type, LinkType::DedupeOnly | LinkType::LinkAndDedupe) {
        for size in &sizes {
            total += size * size.saturating_sub(1) / 2;
        }
    }

    u64::try_from(total)
        .map_err(|_| LinkageError::arithmetic("cartesian baseline overflows u64"))
}

/// Run a counts fragment for the configured source tables and reduce it
/// to the cartesian baseline.
pub fn cartesian_count_from_engine(
    engine: &dyn ExecutionEngine,
    config: &PipelineConfig,
) -> Result<u64> {
    let counts = engine.run_counts(&CountsFragment {
        label: "source_counts".to_string(),
        tables: config.source_tables.clone(),
    })?;
    cartesian_count(&counts, config.link_type)
}

/// Per-rule comparison statistics over an attributed candidate set.
///
/// For rule `k` in declaration order: the number of pairs carrying match
/// key `k`, the running total, and the reduction ratio against the
/// cartesian baseline (rounded to 3 decimal places). `cumulative_rows`
/// is non-decreasing and `reduction_ratio` non-increasing in `k`, since
/// every rule contributes a non-negative count.
pub fn cumulative_comparisons(
    rules: &[BlockingRule],
    pairs: &[CandidatePair],
    cartesian: u64,
) -> Result<Vec<RuleComparisonStat>> {
    if cartesian == 0 {
        return Err(LinkageError::arithmetic(
            "cartesian baseline is zero; reduction ratio is undefined",
        ));
    }

    let mut row_counts = vec![0u64; rules.len()];
    for pair in pairs {
        let key = pair.match_key.0 as usize;
        if key >= row_counts.len() {
            return Err(LinkageError::configuration(format!(
                "candidate pair attributed to unknown rule position {}",
                pair.match_key
            )));
        }
        row_counts[key] += 1;
    }

    let mut stats = Vec::with_capacity(rules.len());
    let mut cumulative = 0u64;
    for (rule, row_count) in rules.iter().zip(row_counts) {
        cumulative += row_count;
        let reduction_ratio = round_to(1.0 - cumulative as f64 / cartesian as f64, 3);
        debug!(
            rule = rule.position.0,
            row_count, cumulative, reduction_ratio, "rule statistics"
        );
        stats.push(RuleComparisonStat {
            rule: rule.predicate.clone(),
            row_count,
            cumulative_rows: cumulative,
            cartesian,
            reduction_ratio,
            range_start: cumulative - row_count,
        });
    }
    Ok(stats)
}

/// Raw (pre-dedup) comparison count generated by a single rule on its
/// own, without match-key attribution.
pub fn comparisons_for_rule(
    engine: &dyn ExecutionEngine,
    rule: &BlockingRule,
    config: &PipelineConfig,
) -> Result<u64> {
    let fragment = compile_rule(rule, config)?;
    Ok(engine.run_pairs(&fragment)?.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchKey, RecordRef, TableId};

    fn counts(sizes: &[u64]) -> Vec<TableCount> {
        sizes
            .iter()
            .enumerate()
            .map(|(index, &rows)| TableCount {
                table: TableId(index as u32),
                name: format!("table_{}", index),
                rows,
            })
            .collect()
    }

    fn pair(left: i64, right: i64, match_key: u32) -> CandidatePair {
        CandidatePair {
            left: RecordRef::new(TableId(0), left),
            right: RecordRef::new(TableId(0), right),
            match_key: MatchKey(match_key),
            retained: Vec::new(),
        }
    }

    #[test]
    fn test_cartesian_dedupe() {
        assert_eq!(cartesian_count(&counts(&[10]), LinkType::DedupeOnly).unwrap(), 45);
        assert_eq!(cartesian_count(&counts(&[0]), LinkType::DedupeOnly).unwrap(), 0);
        assert_eq!(cartesian_count(&counts(&[1]), LinkType::DedupeOnly).unwrap(), 0);
    }

    #[test]
    fn test_cartesian_link_only() {
        assert_eq!(cartesian_count(&counts(&[3, 4]), LinkType::LinkOnly).unwrap(), 12);
        // 2*3 + 2*4 + 3*4
        assert_eq!(cartesian_count(&counts(&[2, 3, 4]), LinkType::LinkOnly).unwrap(), 26);
    }

    #[test]
    fn test_cartesian_link_and_dedupe_sums_both() {
        // cross 12 + within 3 + within 6 = 21 = 7*6/2
        assert_eq!(
            cartesian_count(&counts(&[3, 4]), LinkType::LinkAndDedupe).unwrap(),
            21
        );
    }

    #[test]
    fn test_cartesian_table_count_mismatch() {
        assert!(matches!(
            cartesian_count(&counts(&[3, 4]), LinkType::DedupeOnly),
            Err(LinkageError::Configuration(_))
        ));
        assert!(matches!(
            cartesian_count(&counts(&[3]), LinkType::LinkOnly),
            Err(LinkageError::Configuration(_))
        ));
    }

    #[test]
    fn test_cumulative_comparisons_counts_and_ratio() {
        let rules = BlockingRule::sequence(["l.surname = r.surname", "l.dob = r.dob"]);
        let pairs = vec![
            pair(0, 1, 0),
            pair(0, 2, 0),
            pair(1, 2, 0),
            pair(2, 3, 1),
        ];

        let stats = cumulative_comparisons(&rules, &pairs, 45).unwrap();
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].row_count, 3);
        assert_eq!(stats[0].cumulative_rows, 3);
        assert_eq!(stats[0].range_start, 0);
        assert_eq!(stats[0].reduction_ratio, 0.933);

        assert_eq!(stats[1].row_count, 1);
        assert_eq!(stats[1].cumulative_rows, 4);
        assert_eq!(stats[1].range_start, 3);
        assert_eq!(stats[1].reduction_ratio, 0.911);
        assert_eq!(stats[1].cartesian, 45);
    }

    #[test]
    fn test_cumulative_comparisons_monotonic() {
        let rules = BlockingRule::sequence(["l.a = r.a", "l.b = r.b", "l.c = r.c"]);
        let pairs = vec![pair(0, 1, 0), pair(0, 2, 2), pair(1, 2, 2)];
        let stats = cumulative_comparisons(&rules, &pairs, 100).unwrap();

        for window in stats.windows(2) {
            assert!(window[1].cumulative_rows >= window[0].cumulative_rows);
            assert!(window[1].reduction_ratio <= window[0].reduction_ratio);
        }
        // A rule whose matches were all claimed earlier reports zero.
        assert_eq!(stats[1].row_count, 0);
        assert_eq!(stats[1].cumulative_rows, stats[0].cumulative_rows);
    }

    #[test]
    fn test_cumulative_comparisons_zero_cartesian() {
        let rules = BlockingRule::sequence(["l.a = r.a"]);
        let err = cumulative_comparisons(&rules, &[], 0).unwrap_err();
        assert!(matches!(err, LinkageError::Arithmetic(_)));
    }

    #[test]
    fn test_cumulative_comparisons_unknown_match_key() {
        let rules = BlockingRule::sequence(["l.a = r.a"]);
        let err = cumulative_comparisons(&rules, &[pair(0, 1, 5)], 45).unwrap_err();
        assert!(matches!(err, LinkageError::Configuration(_)));
    }
}
