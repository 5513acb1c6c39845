//! # Unlinkability
//!
//! Distribution of self-link scores: records compared against
//! themselves, as an estimate of how distinguishable each record is from
//! itself even in the best case. Operates on an already-scored pair
//! table; decoupled from the blocking pipeline.

use crate::engine::{ExecutionEngine, ScoreDistributionFragment};
use crate::error::{LinkageError, Result};
use crate::model::UnlinkableRecord;
use std::str::FromStr;

/// Decimal places the weight column is rounded to.
pub const WEIGHT_DECIMALS: u32 = 2;
/// Decimal places the probability column is rounded to.
pub const PROBABILITY_DECIMALS: u32 = 5;

/// The score column a caller charts the distribution against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreAxis {
    MatchWeight,
    MatchProbability,
}

impl FromStr for ScoreAxis {
    type Err = LinkageError;

    fn from_str(axis: &str) -> Result<Self> {
        match axis {
            "match_weight" => Ok(ScoreAxis::MatchWeight),
            "match_probability" => Ok(ScoreAxis::MatchProbability),
            other => Err(LinkageError::configuration(format!(
                "axis must be `match_weight` or `match_probability`, found `{}`",
                other
            ))),
        }
    }
}

/// Cumulative proportion of self-comparisons at or below each rounded
/// score, ordered by increasing probability.
///
/// Proportions are taken over all self-comparisons, but buckets at
/// probability 1 are excluded from the output: a record that reaches
/// certainty against itself is by construction always linkable, so it
/// carries no unlinkable mass. The axis argument is validated before any
/// fragment runs; both score columns are always present in the output.
pub fn unlinkables_data(
    engine: &dyn ExecutionEngine,
    self_link_table: &str,
    axis: &str,
) -> Result<Vec<UnlinkableRecord>> {
    let _axis: ScoreAxis = axis.parse()?;

    let buckets = engine.run_score_distribution(&ScoreDistributionFragment {
        label: format!("self_link_distribution:{}", self_link_table),
        table: self_link_table.to_string(),
        weight_decimals: WEIGHT_DECIMALS,
        probability_decimals: PROBABILITY_DECIMALS,
    })?;

    let mut cumulative = 0.0;
    let records = buckets
        .into_iter()
        .filter(|bucket| bucket.match_probability < 1.0)
        .map(|bucket| {
            cumulative += bucket.proportion;
            UnlinkableRecord {
                match_weight: bucket.match_weight,
                match_probability: bucket.match_probability,
                proportion: bucket.proportion,
                cumulative_proportion: cumulative,
            }
        })
        .collect();
    Ok(records)
}
