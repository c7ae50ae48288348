//! Recast Core - fixpoint transformation scheduler
//!
//! Drives an ordered set of rules over a working set of source trees until
//! no rule changes anything, then reports what changed and who changed it:
//! - Runs every rule over every source, cycle after cycle
//! - Threads dynamically queued follow-up rules through a pipeline
//! - Isolates failing rules so one bad rule cannot abort a run
//! - Attributes every change to the rules that produced it
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_core::{FixConfig, MetricsSink, Refactor, Typed};
//! use std::sync::Arc;
//!
//! let mut refactor = Refactor::new()
//!     .visit(Typed::new(UpgradeDependency::new("org.slf4j", "2.0.9")))
//!     .visit(Typed::new(RemoveUnusedImports))
//!     .with_sink(Arc::new(MetricsSink::new()))
//!     .with_config(FixConfig::new().with_max_cycles(5));
//!
//! for change in &refactor.fix(sources) {
//!     println!("{} changed by {:?}", change.position(), change.contributors());
//! }
//! ```

#![warn(unreachable_pub)]

pub mod change;
pub mod config;
pub mod error;
pub mod instrument;
pub mod pipeline;
pub mod refactor;
pub mod rule;

pub use change::{Change, ChangeAccumulator, ChangeSet, FixSummary, Position};
pub use config::{FixConfig, GenerationPolicy, DEFAULT_MAX_CYCLES};
pub use error::{ConfigError, RuleError};
pub use instrument::{
    metric_names, InstrumentEvent, InstrumentationSink, MetricsSink, NoopSink, Outcome,
    RecordingSink,
};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use refactor::Refactor;
pub use rule::{Continuations, Edit, FnRule, Rule, Typed, TypedRule};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing and running rules
    pub use crate::{
        ChangeSet, Continuations, Edit, FixConfig, Refactor, Rule, RuleError, Typed, TypedRule,
    };
    pub use recast_tree::{Source, Tree, TreeKind};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
