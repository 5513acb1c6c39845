//! # Execution Engine Boundary
//!
//! The core is a planning and aggregation layer: all bulk row-level work
//! (joins, grouping) happens behind the [`ExecutionEngine`] trait. Query
//! fragments are typed descriptors, never query text; the engine either
//! returns rows for a fragment or registers a derived table under a new
//! name for chaining. Calls are synchronous and blocking from the core's
//! perspective. Derived tables registered by a run are owned by that run
//! and must be dropped once their consumers have read them.
//!
//! [`MemoryEngine`] is the in-memory reference implementation used by the
//! tests and the demo binary.

use crate::blocking::PairConstraint;
use crate::error::{LinkageError, Result};
use crate::expr::Expr;
use crate::model::{RecordRef, RetainedColumn, Row, TableId, Value};
use rustc_hash::FxHashMap;

/// Describes one blocking rule's pair-generation join.
///
/// Produced by the predicate compiler; self-contained and side-effect
/// free. The declared source tables are conceptually concatenated (each
/// tagged with its declaration-order [`TableId`]) and self-joined under
/// the predicate, restricted by the ordering constraint.
#[derive(Debug, Clone)]
pub struct PairFragment {
    /// Fragment identity, carried in execution errors for diagnosis.
    pub label: String,
    /// Declared source tables, in declaration order.
    pub tables: Vec<String>,
    pub predicate: Expr,
    /// Columns projected from both sides; the identifier column first.
    pub retain: Vec<String>,
    pub id_column: String,
    pub constraint: PairConstraint,
}

/// Describes a per-table record count scan.
#[derive(Debug, Clone)]
pub struct CountsFragment {
    pub label: String,
    pub tables: Vec<String>,
}

/// Describes the grouped self-link score distribution: round both score
/// columns, group by rounded probability, take the maximum weight per
/// group and each group's share of all rows, ordered by probability.
#[derive(Debug, Clone)]
pub struct ScoreDistributionFragment {
    pub label: String,
    pub table: String,
    pub weight_decimals: u32,
    pub probability_decimals: u32,
}

/// One joined pair as returned by the engine, before match-key
/// attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub left: RecordRef,
    pub right: RecordRef,
    pub retained: Vec<RetainedColumn>,
}

/// Record count of one declared source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: TableId,
    pub name: String,
    pub rows: u64,
}

/// One group of the self-link score distribution, ordered by ascending
/// probability. `proportion` is relative to all rows of the scored table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBucket {
    pub match_weight: f64,
    pub match_probability: f64,
    pub proportion: f64,
}

/// The external tabular execution engine, seen from the core.
pub trait ExecutionEngine {
    /// Execute a pair-generation fragment and return its rows.
    fn run_pairs(&self, fragment: &PairFragment) -> Result<Vec<PairRow>>;

    /// Execute a counts fragment and return one count per table, in
    /// declaration order.
    fn run_counts(&self, fragment: &CountsFragment) -> Result<Vec<TableCount>>;

    /// Execute a score-distribution fragment.
    fn run_score_distribution(
        &self,
        fragment: &ScoreDistributionFragment,
    ) -> Result<Vec<ScoreBucket>>;

    /// Register a derived table under a new name for chaining.
    fn register(&mut self, name: &str, rows: Vec<Row>) -> Result<()>;

    /// Count the rows of a registered table.
    fn row_count(&self, table: &str) -> Result<u64>;

    /// Release a table owned by the current run. Returns whether the
    /// table existed.
    fn drop_table(&mut self, name: &str) -> bool;

    fn has_table(&self, name: &str) -> bool;
}

/// In-memory reference engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    tables: FxHashMap<String, Vec<Row>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self, table: &str, fragment: &str) -> Result<&Vec<Row>> {
        self.tables.get(table).ok_or_else(|| {
            LinkageError::execution(fragment, format!("table `{}` is not registered", table))
        })
    }
}

impl ExecutionEngine for MemoryEngine {
    fn run_pairs(&self, fragment: &PairFragment) -> Result<Vec<PairRow>> {
        let mut concatenated: Vec<(RecordRef, &Row)> = Vec::new();
        for (index, name) in fragment.tables.iter().enumerate() {
            let table = TableId(index as u32);
            for row in self.rows(name, &fragment.label)? {
                let id = row.get(fragment.id_column.as_str()).ok_or_else(|| {
                    LinkageError::execution(
                        &fragment.label,
                        format!(
                            "identifier column `{}` missing from a row of `{}`",
                            fragment.id_column, name
                        ),
                    )
                })?;
                concatenated.push((RecordRef::new(table, id.clone()), row));
            }
        }

        let mut pairs = Vec::new();
        for (left_ref, left_row) in &concatenated {
            for (right_ref, right_row) in &concatenated {
                if !fragment.constraint.admits(left_ref, right_ref) {
                    continue;
                }
                if !fragment.predicate.matches(left_row, right_row) {
                    continue;
                }
                let retained = fragment
                    .retain
                    .iter()
                    .map(|name| RetainedColumn {
                        name: name.clone(),
                        left: left_row.get(name.as_str()).cloned().unwrap_or(Value::Null),
                        right: right_row.get(name.as_str()).cloned().unwrap_or(Value::Null),
                    })
                    .collect();
                pairs.push(PairRow {
                    left: left_ref.clone(),
                    right: right_ref.clone(),
                    retained,
                });
            }
        }
        Ok(pairs)
    }

    fn run_counts(&self, fragment: &CountsFragment) -> Result<Vec<TableCount>> {
        fragment
            .tables
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let rows = self.rows(name, &fragment.label)?;
                Ok(TableCount {
                    table: TableId(index as u32),
                    name: name.clone(),
                    rows: rows.len() as u64,
                })
            })
            .collect()
    }

    fn run_score_distribution(
        &self,
        fragment: &ScoreDistributionFragment,
    ) -> Result<Vec<ScoreBucket>> {
        let rows = self.rows(&fragment.table, &fragment.label)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let weight = read_score(row, "match_weight", &fragment.table, &fragment.label)?;
            let probability =
                read_score(row, "match_probability", &fragment.table, &fragment.label)?;
            scored.push((
                round_to(weight, fragment.weight_decimals),
                round_to(probability, fragment.probability_decimals),
            ));
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let total = scored.len() as f64;
        let mut buckets: Vec<ScoreBucket> = Vec::new();
        for (weight, probability) in scored {
            match buckets.last_mut() {
                Some(bucket) if bucket.match_probability == probability => {
                    bucket.match_weight = bucket.match_weight.max(weight);
                    bucket.proportion += 1.0 / total;
                }
                _ => buckets.push(ScoreBucket {
                    match_weight: weight,
                    match_probability: probability,
                    proportion: 1.0 / total,
                }),
            }
        }
        Ok(buckets)
    }

    fn register(&mut self, name: &str, rows: Vec<Row>) -> Result<()> {
        self.tables.insert(name.to_string(), rows);
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.rows(table, "row_count")?.len() as u64)
    }

    fn drop_table(&mut self, name: &str) -> bool {
        self.tables.remove(name).is_some()
    }

    fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

fn read_score(row: &Row, column: &str, table: &str, fragment: &str) -> Result<f64> {
    row.get(column).and_then(Value::as_f64).ok_or_else(|| {
        LinkageError::execution(
            fragment,
            format!("column `{}` of `{}` is not numeric", column, table),
        )
    })
}

/// Round to a fixed number of decimal places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::row;

    fn people() -> Vec<Row> {
        vec![
            row([
                ("unique_id", Value::Int(0)),
                ("surname", "Jones".into()),
                ("city", "Leeds".into()),
            ]),
            row([
                ("unique_id", Value::Int(1)),
                ("surname", "Jones".into()),
                ("city", "York".into()),
            ]),
            row([
                ("unique_id", Value::Int(2)),
                ("surname", "Smith".into()),
                ("city", "Leeds".into()),
            ]),
        ]
    }

    fn dedupe_fragment(predicate: &str) -> PairFragment {
        PairFragment {
            label: "test_fragment".to_string(),
            tables: vec!["people".to_string()],
            predicate: Expr::parse(predicate).unwrap(),
            retain: vec!["unique_id".to_string(), "surname".to_string()],
            id_column: "unique_id".to_string(),
            constraint: PairConstraint::IdAscending,
        }
    }

    #[test]
    fn test_run_pairs_dedupe_orders_and_dedups() {
        let mut engine = MemoryEngine::new();
        engine.register("people", people()).unwrap();

        let pairs = engine.run_pairs(&dedupe_fragment("l.surname = r.surname")).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].left.id, Value::Int(0));
        assert_eq!(pairs[0].right.id, Value::Int(1));
        // Retained columns are projected from both sides.
        assert_eq!(pairs[0].retained[1].name, "surname");
        assert_eq!(pairs[0].retained[1].left, Value::Text("Jones".into()));
    }

    #[test]
    fn test_run_pairs_true_predicate_is_full_ordered_join() {
        let mut engine = MemoryEngine::new();
        engine.register("people", people()).unwrap();

        let pairs = engine.run_pairs(&dedupe_fragment("true")).unwrap();
        // 3 records -> 3 ordered pairs, no self pairs, no symmetric twins.
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            assert!(pair.left.id.order(&pair.right.id).is_lt());
        }
    }

    #[test]
    fn test_run_pairs_link_only_excludes_same_table() {
        let mut engine = MemoryEngine::new();
        engine.register("a", people()).unwrap();
        engine.register("b", people()).unwrap();

        let fragment = PairFragment {
            label: "link".to_string(),
            tables: vec!["a".to_string(), "b".to_string()],
            predicate: Expr::parse("l.surname = r.surname").unwrap(),
            retain: vec!["unique_id".to_string()],
            id_column: "unique_id".to_string(),
            constraint: PairConstraint::SourceAscending,
        };
        let pairs = engine.run_pairs(&fragment).unwrap();
        assert!(!pairs.is_empty());
        for pair in &pairs {
            assert!(pair.left.table < pair.right.table);
        }
        // Jones x Jones (2x2) + Smith x Smith (1x1)
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn test_run_pairs_missing_table_is_execution_error() {
        let engine = MemoryEngine::new();
        let err = engine.run_pairs(&dedupe_fragment("true")).unwrap_err();
        assert!(matches!(err, LinkageError::Execution { .. }));
        assert!(err.to_string().contains("test_fragment"));
    }

    #[test]
    fn test_run_counts() {
        let mut engine = MemoryEngine::new();
        engine.register("a", people()).unwrap();
        engine.register("b", people()[..2].to_vec()).unwrap();

        let counts = engine
            .run_counts(&CountsFragment {
                label: "counts".to_string(),
                tables: vec!["a".to_string(), "b".to_string()],
            })
            .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].rows, 3);
        assert_eq!(counts[1].rows, 2);
        assert_eq!(counts[1].table, TableId(1));
    }

    #[test]
    fn test_run_score_distribution_groups_and_orders() {
        let mut engine = MemoryEngine::new();
        let scored = vec![
            row([("match_weight", Value::Float(-3.3)), ("match_probability", Value::Float(0.799_996))]),
            row([("match_weight", Value::Float(-3.2)), ("match_probability", Value::Float(0.800_004))]),
            row([("match_weight", Value::Float(4.1)), ("match_probability", Value::Float(0.95))]),
        ];
        engine.register("self_link", scored).unwrap();

        let buckets = engine
            .run_score_distribution(&ScoreDistributionFragment {
                label: "dist".to_string(),
                table: "self_link".to_string(),
                weight_decimals: 2,
                probability_decimals: 5,
            })
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].match_probability, 0.8);
        // max() of the two rounded weights in the bucket
        assert_eq!(buckets[0].match_weight, -3.2);
        assert!((buckets[0].proportion - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(buckets[1].match_probability, 0.95);
        assert!((buckets[1].proportion - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_register_and_drop_table_ownership() {
        let mut engine = MemoryEngine::new();
        engine.register("derived", people()).unwrap();
        assert!(engine.has_table("derived"));
        assert_eq!(engine.row_count("derived").unwrap(), 3);

        assert!(engine.drop_table("derived"));
        assert!(!engine.has_table("derived"));
        assert!(engine.row_count("derived").is_err());
        assert!(!engine.drop_table("derived"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123_456, 5), 0.12346);
        assert_eq!(round_to(-3.333, 2), -3.33);
        assert_eq!(round_to(1.0, 5), 1.0);
    }
}
