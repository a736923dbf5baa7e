//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Upper bound accepted for `enrichment_concurrency`.
pub const MAX_ENRICHMENT_CONCURRENCY: usize = 256;

/// Settings shared by every query an engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows whose enrichment may be in flight at once.
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
}

fn default_enrichment_concurrency() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enrichment_concurrency: default_enrichment_concurrency(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enrichment concurrency.
    #[must_use]
    pub fn with_enrichment_concurrency(mut self, concurrency: usize) -> Self {
        self.enrichment_concurrency = concurrency;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the concurrency is zero or above
    /// [`MAX_ENRICHMENT_CONCURRENCY`].
    pub fn validate(&self) -> QueryResult<()> {
        if self.enrichment_concurrency == 0 {
            return Err(QueryError::invalid_configuration(
                "enrichment_concurrency must be at least 1",
            ));
        }
        if self.enrichment_concurrency > MAX_ENRICHMENT_CONCURRENCY {
            return Err(QueryError::invalid_configuration(format!(
                "enrichment_concurrency must be at most {MAX_ENRICHMENT_CONCURRENCY}"
            )));
        }
        Ok(())
    }
}
