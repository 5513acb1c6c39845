//! # Blocklink
//!
//! Blocking-rule candidate generation for probabilistic record linkage.
//!
//! Comparing every record to every other record is quadratic; this
//! library restricts comparison to candidate pairs selected by an
//! ordered sequence of blocking rules, attributes every pair to the
//! earliest rule that matched it, and computes the comparison-space
//! statistics (cumulative counts, reduction ratio, self-link
//! unlinkability) used to judge rule quality before a matching model is
//! trained. Bulk row work is delegated to an execution engine behind the
//! [`engine::ExecutionEngine`] trait.

pub mod analysis;
pub mod blocking;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod model;
pub mod unlinkables;

// Re-export main types for convenience
pub use config::{ConfigOverrides, PipelineConfig};
pub use engine::{ExecutionEngine, MemoryEngine};
pub use error::{LinkageError, Result};
pub use model::{
    BlockingRule, CandidatePair, LinkType, MatchKey, RecordRef, RuleComparisonStat, TableId,
    UnlinkableRecord, Value,
};

/// Main API for blocking-rule analysis.
///
/// Owns the execution-engine handle and the run's immutable
/// configuration. Source tables are registered with the engine by the
/// caller; the pipeline only reads them.
pub struct Blocklink {
    engine: Box<dyn ExecutionEngine>,
    config: PipelineConfig,
}

impl Blocklink {
    /// Create a pipeline over the in-memory reference engine.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_engine(config, MemoryEngine::new())
    }

    /// Create a pipeline over a custom execution engine.
    pub fn with_engine<E>(config: PipelineConfig, engine: E) -> Result<Self>
    where
        E: ExecutionEngine + 'static,
    {
        config.validate()?;
        Ok(Self {
            engine: Box::new(engine),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn ExecutionEngine {
        self.engine.as_ref()
    }

    /// Mutable engine handle, e.g. for registering source tables.
    pub fn engine_mut(&mut self) -> &mut dyn ExecutionEngine {
        self.engine.as_mut()
    }

    /// Generate the candidate-pair set for an ordered rule sequence,
    /// each pair attributed to the earliest rule that matched it.
    pub fn candidate_pairs(&self, rules: &[BlockingRule]) -> Result<Vec<CandidatePair>> {
        blocking::combine_rules(self.engine.as_ref(), rules, &self.config)
    }

    /// Generate candidate pairs and register them with the engine under
    /// `output_table` for downstream chaining. Returns the pair count.
    pub fn block_into(&mut self, rules: &[BlockingRule], output_table: &str) -> Result<u64> {
        blocking::block_using_rules(self.engine.as_mut(), rules, &self.config, output_table)
    }

    /// Total number of distinct-record pairs possible for the declared
    /// link type, from the current table counts.
    pub fn cartesian_count(&self) -> Result<u64> {
        analysis::cartesian_count_from_engine(self.engine.as_ref(), &self.config)
    }

    /// Per-rule comparison statistics in rule-declaration order: newly
    /// contributed pairs, running total, and reduction ratio against the
    /// cartesian baseline.
    pub fn cumulative_comparisons(
        &self,
        rules: &[BlockingRule],
    ) -> Result<Vec<RuleComparisonStat>> {
        let cartesian = self.cartesian_count()?;
        let pairs = self.candidate_pairs(rules)?;
        analysis::cumulative_comparisons(rules, &pairs, cartesian)
    }

    /// Raw comparison count generated by a single rule on its own.
    pub fn comparisons_for_rule(&self, rule: &BlockingRule) -> Result<u64> {
        analysis::comparisons_for_rule(self.engine.as_ref(), rule, &self.config)
    }

    /// Cumulative self-link score distribution for a table of scored
    /// self-comparisons. `axis` must be `"match_weight"` or
    /// `"match_probability"`.
    pub fn unlinkables(&self, self_link_table: &str, axis: &str) -> Result<Vec<UnlinkableRecord>> {
        unlinkables::unlinkables_data(self.engine.as_ref(), self_link_table, axis)
    }
}
