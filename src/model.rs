//! # Data Model
//!
//! Core data structures for blocking-rule candidate generation: scalar
//! values, record references, blocking rules, link types, and the
//! immutable analytics records produced by a pipeline run.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Position of a source table in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Position of the first blocking rule that claimed a candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey(pub u32);

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{}", self.0)
    }
}

/// A scalar cell value as read from the execution engine.
///
/// Identifier columns hold `Int` or `Text`; `Float` appears in score
/// columns. NaN is not a legal value, so the manual `Eq`/`Hash` impls
/// below (needed for pair-identity dedup) are sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
        }
    }

    /// Total order used by the pair-ordering constraint: numeric for
    /// `Int`/`Float`, lexical for `Text`. Identifiers are expected to
    /// share a type within a run; mixed variants fall back to a fixed
    /// variant rank so the order stays total.
    pub fn order(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Int(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Text(v) => {
                3u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// A row as exchanged with the execution engine: column name -> value.
pub type Row = FxHashMap<String, Value>;

/// Build a [`Row`] from column/value pairs.
pub fn row<I, S, V>(columns: I) -> Row
where
    I: IntoIterator<Item = (S, V)>,
    S: Into<String>,
    V: Into<Value>,
{
    columns
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

/// Identifies one side of a candidate pair: which declared source table
/// the record came from, plus its identifier within that table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub table: TableId,
    pub id: Value,
}

impl RecordRef {
    pub fn new(table: TableId, id: impl Into<Value>) -> Self {
        Self {
            table,
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}

/// How records are allowed to pair up across the declared source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Find duplicates within a single table.
    DedupeOnly,
    /// Link records across distinct tables only.
    LinkOnly,
    /// Link across tables and dedupe within each.
    LinkAndDedupe,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::DedupeOnly => write!(f, "dedupe_only"),
            LinkType::LinkOnly => write!(f, "link_only"),
            LinkType::LinkAndDedupe => write!(f, "link_and_dedupe"),
        }
    }
}

/// One element of an ordered blocking-rule sequence.
///
/// The predicate is a boolean expression over the `l`/`r` record aliases;
/// the position doubles as the rule's match key. Positions are dense,
/// zero-based and stable for the lifetime of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingRule {
    pub predicate: String,
    pub position: MatchKey,
}

impl BlockingRule {
    pub fn new(predicate: impl Into<String>, position: u32) -> Self {
        Self {
            predicate: predicate.into(),
            position: MatchKey(position),
        }
    }

    /// Build a rule sequence with dense zero-based positions.
    pub fn sequence<I, S>(predicates: I) -> Vec<BlockingRule>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        predicates
            .into_iter()
            .enumerate()
            .map(|(position, predicate)| BlockingRule::new(predicate, position as u32))
            .collect()
    }
}

/// A retained column projected from both sides of a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedColumn {
    pub name: String,
    pub left: Value,
    pub right: Value,
}

/// An unordered pair of distinct records selected by the blocking
/// pipeline, attributed to the first rule whose predicate matched it.
///
/// A given identifier pair appears at most once across the entire
/// candidate set, regardless of how many rules match it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub left: RecordRef,
    pub right: RecordRef,
    pub match_key: MatchKey,
    pub retained: Vec<RetainedColumn>,
}

/// Per-rule comparison statistics, in rule-declaration order.
///
/// Created once per analysis run and immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleComparisonStat {
    /// The rule's predicate text.
    pub rule: String,
    /// Pairs newly contributed by this rule (earliest-rule attribution).
    pub row_count: u64,
    /// Running total up to and including this rule.
    pub cumulative_rows: u64,
    /// Total distinct pairs possible for the declared link type.
    pub cartesian: u64,
    /// `1 - cumulative_rows / cartesian`, rounded to 3 decimal places.
    pub reduction_ratio: f64,
    /// Where this rule's slice starts: `cumulative_rows - row_count`.
    pub range_start: u64,
}

/// One bucket of the self-link score distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlinkableRecord {
    pub match_weight: f64,
    pub match_probability: f64,
    /// Share of all self-comparisons falling in this bucket.
    pub proportion: f64,
    /// Running share at or below this probability.
    pub cumulative_proportion: f64,
}
