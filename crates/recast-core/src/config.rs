//! Scheduler configuration
//!
//! [`FixConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! max_cycles = 5
//! generation = "per-cycle"
//! isolate_panics = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default cycle budget for a run
pub const DEFAULT_MAX_CYCLES: usize = 3;

/// When rules are asked to generate new sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationPolicy {
    /// After each position has been run through all rules
    #[default]
    PerPosition,

    /// Once per cycle, after all positions have been visited
    PerCycle,
}

/// Configuration for a fixpoint run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixConfig {
    /// Maximum number of cycles before giving up on convergence
    pub max_cycles: usize,
    /// When `generate()` is called on rules
    pub generation: GenerationPolicy,
    /// Convert panics raised by rules into rule failures
    pub isolate_panics: bool,
}

impl FixConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cycle budget
    #[inline]
    #[must_use]
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// With generation policy
    #[inline]
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationPolicy) -> Self {
        self.generation = generation;
        self
    }

    /// With panic isolation on or off
    #[inline]
    #[must_use]
    pub fn with_isolate_panics(mut self, isolate: bool) -> Self {
        self.isolate_panics = isolate;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    /// Returns error if the document is malformed or a value is out of range
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error if `max_cycles` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cycles == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_cycles",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            generation: GenerationPolicy::PerPosition,
            isolate_panics: true,
        }
    }
}
