//! # Blocking
//!
//! Compiles blocking rules into pair-generation fragments and combines
//! the per-rule results into a single deduplicated candidate set, with
//! each pair attributed to the earliest rule that matched it.

use crate::config::PipelineConfig;
use crate::engine::{ExecutionEngine, PairFragment};
use crate::error::{LinkageError, Result};
use crate::expr::{Expr, Side};
use crate::model::{BlockingRule, CandidatePair, LinkType, RecordRef, Row, Value};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Ordering restriction embedded in every rule fragment.
///
/// Applied identically inside every fragment, so combining fragments
/// never needs to re-filter for ordering: each unordered pair of
/// distinct records survives in exactly one orientation, independent of
/// predicate symmetry, and a record is never paired with itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairConstraint {
    /// Dedupe within one table: admit `(a, b)` iff `id(a) < id(b)`.
    IdAscending,
    /// Link across tables: admit iff the tables differ, restricted to
    /// declaration order `i < j`.
    SourceAscending,
    /// Link and dedupe: table order across tables, identifier order as
    /// the tie-break within a table.
    SourceOrIdAscending,
}

impl PairConstraint {
    pub fn for_link_type(link_type: LinkType) -> Self {
        match link_type {
            LinkType::DedupeOnly => PairConstraint::IdAscending,
            LinkType::LinkOnly => PairConstraint::SourceAscending,
            LinkType::LinkAndDedupe => PairConstraint::SourceOrIdAscending,
        }
    }

    pub fn admits(&self, left: &RecordRef, right: &RecordRef) -> bool {
        match self {
            PairConstraint::IdAscending => {
                left.table == right.table && left.id.order(&right.id).is_lt()
            }
            PairConstraint::SourceAscending => left.table < right.table,
            PairConstraint::SourceOrIdAscending => {
                left.table < right.table
                    || (left.table == right.table && left.id.order(&right.id).is_lt())
            }
        }
    }
}

/// Compile one blocking rule into a self-contained pair-generation
/// fragment. Performs no comparisons itself.
pub fn compile_rule(rule: &BlockingRule, config: &PipelineConfig) -> Result<PairFragment> {
    let id_column = config.unique_id_column.trim();
    if id_column.is_empty() {
        return Err(LinkageError::configuration(
            "unique_id_column must not be blank",
        ));
    }

    // The identifier column is always carried through to the output.
    let mut retain = config.retain_columns.clone();
    if !retain.iter().any(|column| column == id_column) {
        retain.insert(0, id_column.to_string());
    }

    let predicate = Expr::parse(&rule.predicate).map_err(|reason| {
        LinkageError::configuration(format!("rule {}: {}", rule.position.0, reason))
    })?;

    let left_id = predicate.references(Side::Left, id_column);
    let right_id = predicate.references(Side::Right, id_column);
    if left_id != right_id {
        return Err(LinkageError::configuration(format!(
            "rule {}: identifier column `{}` is referenced on only one side of the predicate",
            rule.position.0, id_column
        )));
    }

    Ok(PairFragment {
        label: format!("block_rule_{}", rule.position.0),
        tables: config.source_tables.clone(),
        predicate,
        retain,
        id_column: id_column.to_string(),
        constraint: PairConstraint::for_link_type(config.link_type),
    })
}

/// Evaluate every rule fragment and merge the results into one candidate
/// set.
///
/// Pairs are claimed in rule-position order: a pair matched by rules at
/// positions `i1 < i2 < ...` carries match key `i1` and appears exactly
/// once. An empty rule sequence yields an empty candidate set, not a
/// cartesian product; cartesian blocking must be requested explicitly as
/// a single `true` rule. A contradictory predicate contributes zero
/// pairs without error.
pub fn combine_rules(
    engine: &dyn ExecutionEngine,
    rules: &[BlockingRule],
    config: &PipelineConfig,
) -> Result<Vec<CandidatePair>> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.position.0 as usize != index {
            return Err(LinkageError::configuration(format!(
                "rule positions must be dense and zero-based, found {} at index {}",
                rule.position, index
            )));
        }
    }

    let mut claimed: FxHashSet<(RecordRef, RecordRef)> = FxHashSet::default();
    let mut candidates = Vec::new();

    for rule in rules {
        let fragment = compile_rule(rule, config)?;
        let matched = engine.run_pairs(&fragment)?;
        let before = candidates.len();
        for pair in matched {
            let key = (pair.left.clone(), pair.right.clone());
            if claimed.insert(key) {
                candidates.push(CandidatePair {
                    left: pair.left,
                    right: pair.right,
                    match_key: rule.position,
                    retained: pair.retained,
                });
            }
        }
        debug!(
            rule = rule.position.0,
            fresh = candidates.len() - before,
            total = candidates.len(),
            "blocking rule evaluated"
        );
    }

    Ok(candidates)
}

/// Run the combinator and register the candidate set with the engine
/// under `output_table` for downstream chaining. Returns the number of
/// candidate pairs.
///
/// Output columns follow the side-disambiguated naming of the retained
/// columns (`<column>_l` / `<column>_r`), plus `match_key` and, when
/// more than one source table is declared, `source_table_l` /
/// `source_table_r`.
pub fn block_using_rules(
    engine: &mut dyn ExecutionEngine,
    rules: &[BlockingRule],
    config: &PipelineConfig,
    output_table: &str,
) -> Result<u64> {
    let candidates = combine_rules(&*engine, rules, config)?;
    let multi_table = config.source_tables.len() > 1;

    let rows: Vec<Row> = candidates
        .iter()
        .map(|pair| {
            let mut row = Row::default();
            for column in &pair.retained {
                row.insert(format!("{}_l", column.name), column.left.clone());
                row.insert(format!("{}_r", column.name), column.right.clone());
            }
            if multi_table {
                let left_table = config.source_tables[pair.left.table.0 as usize].clone();
                let right_table = config.source_tables[pair.right.table.0 as usize].clone();
                row.insert("source_table_l".to_string(), Value::Text(left_table));
                row.insert("source_table_r".to_string(), Value::Text(right_table));
            }
            row.insert("match_key".to_string(), Value::Int(pair.match_key.0 as i64));
            row
        })
        .collect();

    let count = rows.len() as u64;
    engine.register(output_table, rows)?;
    Ok(count)
}
