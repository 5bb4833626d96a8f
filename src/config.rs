//! Configuration for index building and query execution.
use serde::de::Error;

pub use nearpoly_types::attributes::{AttributeRecord, AttributeValue};
pub use nearpoly_types::bbox::BoundingBox;
pub use nearpoly_types::point::QueryPoint;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

/// Settings for the offline index build
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Branching factor of the packed tree
    #[serde(default = "IndexConfig::default_node_size")]
    pub node_size: u16,

    /// Upper bound on the serialized index size in bytes
    #[serde(default)]
    pub max_index_bytes: Option<u64>,
}

impl IndexConfig {
    const fn default_node_size() -> u16 {
        16
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            node_size: Self::default_node_size(),
            max_index_bytes: None,
        }
    }
}

/// Settings for nearest-area queries
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Number of results when the caller does not ask for a specific count
    #[serde(default = "QueryConfig::default_limit")]
    pub default_limit: usize,

    /// Candidates requested per wanted result on the first index lookup
    #[serde(default = "QueryConfig::default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Lower bound on the first lookup's candidate count
    #[serde(default = "QueryConfig::default_min_candidates")]
    pub min_candidates: usize,

    /// Candidate count for the retry after an empty first lookup
    #[serde(default = "QueryConfig::default_retry_candidates")]
    pub retry_candidates: usize,

    /// Number of leading IDs returned by the last-resort fallback
    #[serde(default = "QueryConfig::default_fallback_slice_len")]
    pub fallback_slice_len: usize,

    /// Degrees added around the dataset bounds before a query point counts
    /// as outside coverage
    #[serde(default = "QueryConfig::default_coverage_margin_deg")]
    pub coverage_margin_deg: f64,
}

impl QueryConfig {
    const fn default_limit() -> usize {
        5
    }

    const fn default_candidate_multiplier() -> usize {
        4
    }

    const fn default_min_candidates() -> usize {
        20
    }

    const fn default_retry_candidates() -> usize {
        100
    }

    const fn default_fallback_slice_len() -> usize {
        50
    }

    const fn default_coverage_margin_deg() -> f64 {
        1.0
    }

    /// Candidate count for the first index lookup when `n` results are wanted.
    pub fn initial_candidates(&self, n: usize) -> usize {
        n.saturating_mul(self.candidate_multiplier)
            .max(self.min_candidates)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
            candidate_multiplier: Self::default_candidate_multiplier(),
            min_candidates: Self::default_min_candidates(),
            retry_candidates: Self::default_retry_candidates(),
            fallback_slice_len: Self::default_fallback_slice_len(),
            coverage_margin_deg: Self::default_coverage_margin_deg(),
        }
    }
}

impl Config {
    pub fn with_node_size(mut self, node_size: u16) -> Self {
        assert!(node_size >= 2, "Node size must be at least 2");
        self.index.node_size = node_size;
        self
    }

    pub fn with_max_index_bytes(mut self, limit: u64) -> Self {
        self.index.max_index_bytes = Some(limit);
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        assert!(limit > 0, "Default limit must be greater than zero");
        self.query.default_limit = limit;
        self
    }

    pub fn with_fallback_slice_len(mut self, len: usize) -> Self {
        self.query.fallback_slice_len = len;
        self
    }

    pub fn with_coverage_margin(mut self, degrees: f64) -> Self {
        self.query.coverage_margin_deg = degrees;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.index.node_size < 2 {
            return Err("Node size must be at least 2".to_string());
        }

        if self.query.default_limit == 0 {
            return Err("Default limit must be greater than zero".to_string());
        }

        if self.query.candidate_multiplier == 0 {
            return Err("Candidate multiplier must be greater than zero".to_string());
        }

        if self.query.retry_candidates < self.query.min_candidates {
            return Err(format!(
                "Retry candidates ({}) must be >= min candidates ({})",
                self.query.retry_candidates, self.query.min_candidates
            ));
        }

        let margin = self.query.coverage_margin_deg;
        if !margin.is_finite() || margin < 0.0 {
            return Err(format!(
                "Coverage margin must be a finite, non-negative number of degrees, got: {}",
                margin
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
