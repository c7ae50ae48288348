//! Error types for recast core
//!
//! Rule failures ([`RuleError`]) are recovered inside the scheduler and only
//! surface as instrumentation events. Configuration failures
//! ([`ConfigError`]) are returned to the caller before a run starts.

/// Failure of a single rule invocation (or one of its continuations)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The rule reported a failure
    #[error("rule {rule} failed: {message}")]
    Failed {
        /// Name of the failing rule
        rule: String,
        /// Failure description
        message: String,
    },

    /// The rule panicked while visiting a tree
    #[error("rule {rule} panicked: {message}")]
    Panicked {
        /// Name of the panicking rule
        rule: String,
        /// Panic payload, if it was a string
        message: String,
    },

    /// The rule cannot handle this kind of tree
    #[error("rule {rule} does not support tree type {tree_type}")]
    UnsupportedTree {
        /// Name of the rule
        rule: String,
        /// Dynamic type of the tree
        tree_type: String,
    },
}

impl RuleError {
    /// Create a plain failure for `rule`
    #[inline]
    #[must_use]
    pub fn failed(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Name of the rule that raised this error
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::Failed { rule, .. }
            | Self::Panicked { rule, .. }
            | Self::UnsupportedTree { rule, .. } => rule,
        }
    }

    /// Whether the error came from a panic rather than a returned `Err`
    #[inline]
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        message: String,
    },
}
