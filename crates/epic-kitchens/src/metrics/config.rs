//! Evaluation configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use epic_kitchens::{MetricsConfig, Parallelism};
//!
//! // Defaults: top-1/top-5 for every task, 100 action candidates
//! let config = MetricsConfig::builder().build().unwrap();
//! assert_eq!(config.ks, vec![1, 5]);
//!
//! let config = MetricsConfig::builder()
//!     .ks(vec![1, 3, 5])
//!     .action_top_k(50)
//!     .parallelism(Parallelism::Parallel)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.action_ks, vec![1, 5]);
//! ```

use bon::Builder;

use crate::scoring::ActionScorer;
use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A list of k values is empty.
    #[error("{field} must contain at least one k")]
    EmptyKs { field: &'static str },
    /// A top-k value is zero.
    #[error("{field} values must be at least 1")]
    ZeroK { field: &'static str },
    /// Number of action candidates must be at least 1.
    #[error("action_top_k must be at least 1")]
    InvalidActionTopK,
}

// =============================================================================
// MetricsConfig
// =============================================================================

/// Configuration of [`Evaluator`](super::Evaluator).
///
/// `ks` and `action_ks` are independent: changing the verb/noun top-k values
/// leaves action accuracy at its own (default `[1, 5]`) values.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct MetricsConfig {
    /// Top-k values for verb and noun accuracy. Default: `[1, 5]`.
    #[builder(default = vec![1, 5])]
    pub ks: Vec<usize>,

    /// Top-k values for action accuracy. Default: `[1, 5]`.
    #[builder(default = vec![1, 5])]
    pub action_ks: Vec<usize>,

    /// Verb and noun candidates kept when action scores are derived.
    /// Default: 100.
    #[builder(default = ActionScorer::DEFAULT_TOP_K)]
    pub action_top_k: usize,

    /// Whether action scores may be composed in parallel. Default: `Sequential`.
    #[builder(default)]
    pub parallelism: Parallelism,
}

/// Custom finishing function that validates the config.
impl<S: metrics_config_builder::IsComplete> MetricsConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `ks` or `action_ks` is empty or contains
    /// zero, or if `action_top_k == 0`.
    pub fn build(self) -> Result<MetricsConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, ks) in [("ks", &self.ks), ("action_ks", &self.action_ks)] {
            if ks.is_empty() {
                return Err(ConfigError::EmptyKs { field });
            }
            if ks.contains(&0) {
                return Err(ConfigError::ZeroK { field });
            }
        }
        if self.action_top_k == 0 {
            return Err(ConfigError::InvalidActionTopK);
        }
        Ok(())
    }

    /// Scorer used to derive action scores from verb and noun scores.
    pub fn action_scorer(&self) -> ActionScorer {
        ActionScorer::new(self.action_top_k).with_parallelism(self.parallelism)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            ks: vec![1, 5],
            action_ks: vec![1, 5],
            action_top_k: ActionScorer::DEFAULT_TOP_K,
            parallelism: Parallelism::Sequential,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
