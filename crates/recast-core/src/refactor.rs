//! Fixpoint scheduler
//!
//! [`Refactor`] runs an ordered set of top-level rules over a working set of
//! sources, cycle after cycle, until a cycle changes nothing and generates
//! nothing, or the cycle budget runs out.
//!
//! # Cycle
//! For every live position, in working-set order:
//! 1. every top-level rule, in declared order, gets `begin_application_unit`
//! 2. non-idempotent rules are skipped after the first cycle
//! 3. the rule pipeline runs; a new tree value is merged into the change set
//!    under the rule's name and the names of the continuations that fired
//! 4. a failing rule leaves the tree as it was before that rule
//! 5. rules may generate new sources, appended to the working set
//!
//! Positions generated during a cycle are visited later in that same cycle,
//! after every position before them. Under [`GenerationPolicy::PerCycle`]
//! generation happens once the cycle's positions are done, so those sources
//! are first visited in the next cycle.

use crate::change::{ChangeAccumulator, ChangeSet, FixSummary, Position};
use crate::config::{FixConfig, GenerationPolicy};
use crate::instrument::{InstrumentationSink, NoopSink, Outcome};
use crate::pipeline::Pipeline;
use crate::rule::Rule;
use recast_tree::{same_slot, Source};
use std::fmt::{self, Debug, Formatter};
use std::iter;
use std::sync::Arc;
use std::time::Instant;

/// Tree type reported when no tree is in context
const UNKNOWN_TREE_TYPE: &str = "unknown";

/// A refactoring plan: top-level rules plus how to run them
pub struct Refactor {
    rules: Vec<Box<dyn Rule>>,
    sink: Arc<dyn InstrumentationSink>,
    config: FixConfig,
}

impl Default for Refactor {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            sink: Arc::new(NoopSink),
            config: FixConfig::default(),
        }
    }
}

impl Debug for Refactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refactor")
            .field("rules", &self.rule_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Refactor {
    /// Create an empty plan with the no-op sink and default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level rule
    #[must_use]
    pub fn visit(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Append top-level rules, keeping their order
    #[must_use]
    pub fn visit_all<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Rule>>,
    {
        self.rules.extend(rules);
        self
    }

    /// Report instrumentation events to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn InstrumentationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: FixConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FixConfig {
        &self.config
    }

    /// Names of the top-level rules, in order
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run the plan over `sources` with the configured cycle budget
    ///
    /// Sources may be of mixed kinds.
    pub fn fix<I>(&mut self, sources: I) -> ChangeSet
    where
        I: IntoIterator<Item = Source>,
    {
        let max_cycles = self.config.max_cycles;
        self.fix_with_cycles(sources, max_cycles)
    }

    /// Run the plan over a single source and return its latest tree
    ///
    /// Returns the input itself when nothing changed, `None` if a rule
    /// deleted it.
    pub fn fixed(&mut self, source: Source) -> Option<Source> {
        let changes = self.fix(iter::once(Arc::clone(&source)));
        match changes.get(Position::new(0)) {
            Some(change) => change.fixed().cloned(),
            None => Some(source),
        }
    }

    /// Run the plan over `sources` for at most `max_cycles` cycles
    ///
    /// Never fails: rule errors are isolated and reported to the sink, and
    /// running out of cycles returns the best-effort change set.
    pub fn fix_with_cycles<I>(&mut self, sources: I, max_cycles: usize) -> ChangeSet
    where
        I: IntoIterator<Item = Source>,
    {
        let started = Instant::now();
        let sink = Arc::clone(&self.sink);
        let pipeline = Pipeline::new(sink.as_ref(), self.config.isolate_panics);

        let mut working: Vec<Option<Source>> = sources.into_iter().map(Some).collect();
        let mut changes = ChangeAccumulator::new();
        let mut summary = FixSummary::default();

        tracing::info!(
            rules = self.rules.len(),
            sources = working.len(),
            max_cycles,
            "Starting fix"
        );

        for cycle in 0..max_cycles {
            summary.cycles = cycle + 1;
            let mut changed_or_generated = 0usize;
            // The length is re-read on every step so positions generated in
            // this cycle are visited in it too
            let mut index = 0;
            while index < working.len() {
                let position = Position::new(index);
                let slot = working[index].clone();
                index += 1;
                let Some(prev) = slot else {
                    // vacated by a deletion in an earlier cycle
                    continue;
                };

                let (acc, changed) = self.apply_rules(
                    &pipeline,
                    cycle,
                    position,
                    prev.clone(),
                    &mut changes,
                    &mut summary,
                );
                changed_or_generated += changed;

                if self.config.generation == GenerationPolicy::PerPosition {
                    changed_or_generated += self.generate(
                        &pipeline,
                        &mut working,
                        &mut changes,
                        &mut summary,
                        prev.tree_type(),
                    );
                }

                working[position.index()] = acc;
            }

            if self.config.generation == GenerationPolicy::PerCycle {
                changed_or_generated += self.generate(
                    &pipeline,
                    &mut working,
                    &mut changes,
                    &mut summary,
                    UNKNOWN_TREE_TYPE,
                );
            }

            tracing::debug!(
                cycle,
                changed = changed_or_generated,
                sources = working.len(),
                "Cycle complete"
            );

            if changed_or_generated == 0 {
                summary.converged = true;
                break;
            }
        }

        summary.sources = working.len();
        let outcome = if changes.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Changed
        };
        sink.fix_completed(started.elapsed(), outcome);

        let change_set = changes.into_change_set(summary);
        for change in &change_set {
            let tree_type = change.tree_type().unwrap_or(UNKNOWN_TREE_TYPE);
            for rule in change.contributors() {
                sink.change_contributed(rule, tree_type);
            }
        }

        if !summary.converged && max_cycles > 0 {
            tracing::info!(max_cycles, "Cycle budget exhausted before reaching a fixpoint");
        }
        tracing::info!(
            changes = change_set.len(),
            cycles = summary.cycles,
            failures = summary.failures,
            "Fix completed"
        );

        change_set
    }

    /// Thread one position through every top-level rule
    ///
    /// Returns the resulting tree and how many rules changed it.
    fn apply_rules(
        &mut self,
        pipeline: &Pipeline<'_>,
        cycle: usize,
        position: Position,
        prev: Source,
        changes: &mut ChangeAccumulator,
        summary: &mut FixSummary,
    ) -> (Option<Source>, usize) {
        let mut acc = Some(prev);
        let mut changed = 0;

        for rule in &mut self.rules {
            let Some(before) = acc.clone() else {
                // deleted by an earlier rule; later rules still get their reset
                if let Err(error) = pipeline.guard(rule.as_mut(), |r| r.begin_application_unit()) {
                    summary.failures += 1;
                    self.sink.rule_failed(rule.name(), UNKNOWN_TREE_TYPE, &error);
                }
                continue;
            };
            let tree_type = before.tree_type();

            if let Err(error) = pipeline.guard(rule.as_mut(), |r| r.begin_application_unit()) {
                summary.failures += 1;
                tracing::warn!(
                    rule = rule.name(),
                    tree_type,
                    %position,
                    %error,
                    "Rule reset failed"
                );
                self.sink.rule_failed(rule.name(), tree_type, &error);
                continue;
            }

            if !rule.is_idempotent() && cycle > 0 {
                continue;
            }

            match pipeline.apply(rule.as_mut(), Arc::clone(&before)) {
                Ok(outcome) => {
                    if !same_slot(Some(&before), outcome.tree.as_ref()) {
                        tracing::trace!(
                            rule = rule.name(),
                            tree_type,
                            %position,
                            deleted = outcome.tree.is_none(),
                            "Rule changed source"
                        );
                        let names = iter::once(rule.name().to_owned()).chain(outcome.fired);
                        changes.merge(position, Some(&before), outcome.tree.clone(), names);
                        changed += 1;
                    }
                    acc = outcome.tree;
                }
                Err(error) => {
                    summary.failures += 1;
                    tracing::warn!(
                        rule = rule.name(),
                        tree_type,
                        %position,
                        %error,
                        "Rule failed, keeping tree unchanged"
                    );
                    self.sink.rule_failed(rule.name(), tree_type, &error);
                }
            }
        }

        (acc, changed)
    }

    /// Ask every rule for new sources and append them to the working set
    fn generate(
        &mut self,
        pipeline: &Pipeline<'_>,
        working: &mut Vec<Option<Source>>,
        changes: &mut ChangeAccumulator,
        summary: &mut FixSummary,
        tree_type: &str,
    ) -> usize {
        let mut generated = 0;

        for rule in &mut self.rules {
            match pipeline.guard(rule.as_mut(), |r| r.generate()) {
                Ok(trees) => {
                    for tree in trees {
                        let position = Position::new(working.len());
                        tracing::debug!(
                            rule = rule.name(),
                            %position,
                            path = tree.path(),
                            "Generated source"
                        );
                        changes.record_generated(position, Arc::clone(&tree), rule.name());
                        working.push(Some(tree));
                        generated += 1;
                    }
                }
                Err(error) => {
                    summary.failures += 1;
                    tracing::warn!(rule = rule.name(), %error, "Rule generation failed");
                    self.sink.rule_failed(rule.name(), tree_type, &error);
                }
            }
        }

        generated
    }
}
