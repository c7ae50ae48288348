//! Fluent assertions over a [`Refactor`] run
//!
//! ```rust,ignore
//! RefactorTest::new()
//!     .when_visited_by(uppercase())
//!     .is_refactored_to("hello", "HELLO");
//! ```

use crate::text::{render_opt, text_source};
use pretty_assertions::assert_eq;
use recast_core::{ChangeSet, FixConfig, Position, RecordingSink, Refactor, Rule};
use std::sync::Arc;

/// Runs rules over text sources and checks the result
#[derive(Debug)]
pub struct RefactorTest {
    refactor: Refactor,
    sink: Arc<RecordingSink>,
}

impl Default for RefactorTest {
    fn default() -> Self {
        let sink = Arc::new(RecordingSink::new());
        Self {
            refactor: Refactor::new().with_sink(sink.clone()),
            sink,
        }
    }
}

impl RefactorTest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level rule
    #[must_use]
    pub fn when_visited_by(mut self, rule: impl Rule + 'static) -> Self {
        self.refactor = self.refactor.visit(rule);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FixConfig) -> Self {
        self.refactor = self.refactor.with_config(config);
        self
    }

    /// Events recorded by every run so far
    pub fn sink(&self) -> &RecordingSink {
        &self.sink
    }

    pub fn refactor(&mut self) -> &mut Refactor {
        &mut self.refactor
    }

    /// Assert that `before` ends up as `after`
    ///
    /// # Panics
    /// Panics if the source is unchanged, deleted, or rendered differently.
    pub fn is_refactored_to(&mut self, before: &str, after: &str) -> ChangeSet {
        let changes = self.refactor.fix([text_source("test.txt", before)]);
        let change = changes
            .get(Position::new(0))
            .unwrap_or_else(|| panic!("expected {before:?} to change, nothing changed"));
        assert_eq!(render_opt(change.fixed()).as_deref(), Some(after));
        changes
    }

    /// Assert that no rule changes `before`
    ///
    /// # Panics
    /// Panics if any position changed.
    pub fn is_unchanged(&mut self, before: &str) -> ChangeSet {
        let changes = self.refactor.fix([text_source("test.txt", before)]);
        assert!(
            changes.is_empty(),
            "expected {before:?} to stay unchanged, got {:?}",
            changes
                .iter()
                .map(|c| render_opt(c.fixed()))
                .collect::<Vec<_>>()
        );
        changes
    }

    /// Assert that `before` is deleted
    ///
    /// # Panics
    /// Panics if the source survives.
    pub fn is_deleted(&mut self, before: &str) -> ChangeSet {
        let changes = self.refactor.fix([text_source("test.txt", before)]);
        let deleted = changes
            .get(Position::new(0))
            .is_some_and(recast_core::Change::is_deleted);
        assert!(deleted, "expected {before:?} to be deleted");
        changes
    }
}
