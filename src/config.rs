//! # Pipeline Configuration
//!
//! Explicit, immutable configuration passed into each operation; there
//! are no global mutable settings. Loaded with precedence:
//! overrides > Env vars > Config file > Defaults
//!
//! # Example config file (blocklink.toml)
//! ```toml
//! link_type = "dedupe_only"
//! unique_id_column = "unique_id"
//! source_tables = ["people"]
//! retain_columns = ["surname", "dob"]
//! ```
//!
//! Environment variables use the `BLOCKLINK_` prefix, e.g.
//! `BLOCKLINK_UNIQUE_ID_COLUMN=person_id`.

use crate::error::{LinkageError, Result};
use crate::model::LinkType;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How records pair up across the declared source tables.
    pub link_type: LinkType,
    /// Name of the per-table unique identifier column.
    pub unique_id_column: String,
    /// Source tables, in declaration order. The order defines the
    /// table index used by the cross-table ordering constraint.
    pub source_tables: Vec<String>,
    /// Columns to carry through to the candidate-pair output. The
    /// identifier column is force-included by the predicate compiler.
    pub retain_columns: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            link_type: LinkType::DedupeOnly,
            unique_id_column: "unique_id".to_string(),
            source_tables: Vec::new(),
            retain_columns: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration with precedence: overrides > Env > File > Defaults
    pub fn load(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(PipelineConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("BLOCKLINK_"));
        figment = figment.merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|error| LinkageError::configuration(error.to_string()))
    }

    /// Load from environment and optional config file only.
    pub fn from_env(config_path: Option<&str>) -> Result<Self> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Check the configuration is sufficient for a pipeline run.
    pub fn validate(&self) -> Result<()> {
        if self.unique_id_column.trim().is_empty() {
            return Err(LinkageError::configuration(
                "unique_id_column must not be blank",
            ));
        }
        if self.source_tables.is_empty() {
            return Err(LinkageError::configuration(
                "at least one source table must be declared",
            ));
        }
        match self.link_type {
            LinkType::DedupeOnly if self.source_tables.len() != 1 => {
                Err(LinkageError::configuration(format!(
                    "dedupe_only requires exactly one source table, found {}",
                    self.source_tables.len()
                )))
            }
            LinkType::LinkOnly | LinkType::LinkAndDedupe if self.source_tables.len() < 2 => {
                Err(LinkageError::configuration(format!(
                    "{} requires at least two source tables, found {}",
                    self.link_type,
                    self.source_tables.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Caller overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain_columns: Option<Vec<String>>,
}
