//! Instrumentation sink
//!
//! The scheduler reports timings and counts through an explicit
//! [`InstrumentationSink`] handed to it at construction. [`NoopSink`] is the
//! default; [`MetricsSink`] forwards to the `metrics` facade; [`RecordingSink`]
//! keeps every event in memory.

use crate::error::RuleError;
use parking_lot::Mutex;
use std::time::Duration;

/// Overall result of a fix run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// At least one change record was produced
    Changed,
    /// Nothing changed
    Unchanged,
}

impl Outcome {
    /// Tag value used by metric backends
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Receiver of scheduler timing and counting events
pub trait InstrumentationSink: Send + Sync {
    /// Duration of a whole `fix` call
    fn fix_completed(&self, elapsed: Duration, outcome: Outcome);

    /// Duration of one rule pipeline invocation on one tree
    fn rule_visited(&self, rule: &str, tree_type: &str, elapsed: Duration);

    /// A rule invocation raised an error
    fn rule_failed(&self, rule: &str, tree_type: &str, error: &RuleError);

    /// A rule contributed to a change of a tree of `tree_type` (emitted once
    /// per contributor per change record, at the end of a run)
    fn change_contributed(&self, rule: &str, tree_type: &str);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl InstrumentationSink for NoopSink {
    fn fix_completed(&self, _elapsed: Duration, _outcome: Outcome) {}

    fn rule_visited(&self, _rule: &str, _tree_type: &str, _elapsed: Duration) {}

    fn rule_failed(&self, _rule: &str, _tree_type: &str, _error: &RuleError) {}

    fn change_contributed(&self, _rule: &str, _tree_type: &str) {}
}

/// Metric names emitted by [`MetricsSink`]
pub mod metric_names {
    /// Histogram (seconds) of whole runs, tagged `outcome`
    pub const FIX_DURATION: &str = "recast.fix.duration";
    /// Histogram (seconds) of rule pipeline invocations, tagged `rule`, `tree.type`
    pub const RULE_VISIT_DURATION: &str = "recast.rule.visit.duration";
    /// Counter of failed rule invocations, tagged `rule`, `tree.type`
    pub const RULE_ERRORS: &str = "recast.rule.errors";
    /// Counter of changes contributed, tagged `rule`, `tree.type`
    pub const FIX_CHANGES: &str = "recast.fix.changes";
}

/// Sink backed by the global `metrics` recorder
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

impl MetricsSink {
    /// Create new metrics sink and register metric descriptions
    #[must_use]
    pub fn new() -> Self {
        metrics::describe_histogram!(
            metric_names::FIX_DURATION,
            metrics::Unit::Seconds,
            "Time to run a refactoring plan of one or more rules over one or more cycles"
        );
        metrics::describe_histogram!(
            metric_names::RULE_VISIT_DURATION,
            metrics::Unit::Seconds,
            "Time to visit a single tree with a rule and its pipeline"
        );
        metrics::describe_counter!(
            metric_names::RULE_ERRORS,
            "Rule invocations that raised an error"
        );
        metrics::describe_counter!(
            metric_names::FIX_CHANGES,
            "Changes contributed by a rule"
        );
        Self
    }
}

impl InstrumentationSink for MetricsSink {
    fn fix_completed(&self, elapsed: Duration, outcome: Outcome) {
        metrics::histogram!(metric_names::FIX_DURATION, "outcome" => outcome.as_str())
            .record(elapsed.as_secs_f64());
    }

    fn rule_visited(&self, rule: &str, tree_type: &str, elapsed: Duration) {
        metrics::histogram!(
            metric_names::RULE_VISIT_DURATION,
            "rule" => rule.to_owned(),
            "tree.type" => tree_type.to_owned()
        )
        .record(elapsed.as_secs_f64());
    }

    fn rule_failed(&self, rule: &str, tree_type: &str, _error: &RuleError) {
        metrics::counter!(
            metric_names::RULE_ERRORS,
            "rule" => rule.to_owned(),
            "tree.type" => tree_type.to_owned()
        )
        .increment(1);
    }

    fn change_contributed(&self, rule: &str, tree_type: &str) {
        metrics::counter!(
            metric_names::FIX_CHANGES,
            "rule" => rule.to_owned(),
            "tree.type" => tree_type.to_owned()
        )
        .increment(1);
    }
}

/// One event captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentEvent {
    /// See [`InstrumentationSink::fix_completed`]
    FixCompleted {
        /// Wall time of the run
        elapsed: Duration,
        /// Changed or unchanged
        outcome: Outcome,
    },
    /// See [`InstrumentationSink::rule_visited`]
    RuleVisited {
        /// Rule name
        rule: String,
        /// Dynamic tree type
        tree_type: String,
        /// Wall time of the invocation
        elapsed: Duration,
    },
    /// See [`InstrumentationSink::rule_failed`]
    RuleFailed {
        /// Rule name
        rule: String,
        /// Dynamic tree type
        tree_type: String,
        /// The error raised
        error: RuleError,
    },
    /// See [`InstrumentationSink::change_contributed`]
    ChangeContributed {
        /// Rule name
        rule: String,
        /// Dynamic tree type
        tree_type: String,
    },
}

/// In-memory sink that keeps every event in arrival order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<InstrumentEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    #[must_use]
    pub fn events(&self) -> Vec<InstrumentEvent> {
        self.events.lock().clone()
    }

    /// `(rule, tree_type)` of every failed invocation
    #[must_use]
    pub fn failures(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentEvent::RuleFailed {
                    rule, tree_type, ..
                } => Some((rule.clone(), tree_type.clone())),
                _ => None,
            })
            .collect()
    }

    /// Rule names of every timed invocation, in order
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentEvent::RuleVisited { rule, .. } => Some(rule.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(rule, tree_type)` of every change contribution
    #[must_use]
    pub fn contributions(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentEvent::ChangeContributed { rule, tree_type } => {
                    Some((rule.clone(), tree_type.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Outcomes of every completed run
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentEvent::FixCompleted { outcome, .. } => Some(*outcome),
                _ => None,
            })
            .collect()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: InstrumentEvent) {
        self.events.lock().push(event);
    }
}

impl InstrumentationSink for RecordingSink {
    fn fix_completed(&self, elapsed: Duration, outcome: Outcome) {
        self.push(InstrumentEvent::FixCompleted { elapsed, outcome });
    }

    fn rule_visited(&self, rule: &str, tree_type: &str, elapsed: Duration) {
        self.push(InstrumentEvent::RuleVisited {
            rule: rule.to_owned(),
            tree_type: tree_type.to_owned(),
            elapsed,
        });
    }

    fn rule_failed(&self, rule: &str, tree_type: &str, error: &RuleError) {
        self.push(InstrumentEvent::RuleFailed {
            rule: rule.to_owned(),
            tree_type: tree_type.to_owned(),
            error: error.clone(),
        });
    }

    fn change_contributed(&self, rule: &str, tree_type: &str) {
        self.push(InstrumentEvent::ChangeContributed {
            rule: rule.to_owned(),
            tree_type: tree_type.to_owned(),
        });
    }
}
