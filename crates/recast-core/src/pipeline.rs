//! Composition pipeline
//!
//! Applies a rule, then each of its continuations in order on the running
//! result, depth-first. The scheduler only observes the final tree, so a
//! chain of follow-up edits lands atomically within one pass.

use crate::error::RuleError;
use crate::instrument::InstrumentationSink;
use crate::rule::Rule;
use recast_tree::{same_slot, Source};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Result of running one rule pipeline over one tree
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Final tree (`None` if a rule in the chain deleted it)
    pub tree: Option<Source>,
    /// Continuations whose output differed from their input
    ///
    /// Nested continuations are listed before the continuation that queued
    /// them.
    pub fired: Vec<String>,
}

/// Runs rule pipelines and reports their timings
pub struct Pipeline<'a> {
    sink: &'a dyn InstrumentationSink,
    isolate_panics: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline reporting to `sink`
    #[inline]
    #[must_use]
    pub fn new(sink: &'a dyn InstrumentationSink, isolate_panics: bool) -> Self {
        Self {
            sink,
            isolate_panics,
        }
    }

    /// Apply `rule` and its continuations to `tree`
    ///
    /// # Errors
    /// Returns the first error raised by the rule or any continuation; the
    /// partial result is discarded.
    pub fn apply(&self, rule: &mut dyn Rule, tree: Source) -> Result<PipelineOutcome, RuleError> {
        let mut fired = Vec::new();
        let tree = self.run(rule, tree, &mut fired)?;
        Ok(PipelineOutcome { tree, fired })
    }

    fn run(
        &self,
        rule: &mut dyn Rule,
        tree: Source,
        fired: &mut Vec<String>,
    ) -> Result<Option<Source>, RuleError> {
        let started = Instant::now();
        let input_type = tree.tree_type();

        let mut acc = match self.visit(rule, tree) {
            Ok(acc) => acc,
            Err(error) => {
                // Follow-ups queued before the failure must not leak into the next visit
                let _ = self.guard(rule, |r| r.continuations());
                return Err(error);
            }
        };
        let continuations = self.guard(rule, |r| r.continuations())?;

        for mut next in continuations {
            let Some(current) = acc.clone() else {
                break;
            };
            let out = self.run(next.as_mut(), current.clone(), fired)?;
            if !same_slot(Some(&current), out.as_ref()) {
                fired.push(next.name().to_owned());
            }
            acc = out;
        }

        let tree_type = acc.as_ref().map_or(input_type, |t| t.tree_type());
        self.sink.rule_visited(rule.name(), tree_type, started.elapsed());

        Ok(acc)
    }

    fn visit(&self, rule: &mut dyn Rule, tree: Source) -> Result<Option<Source>, RuleError> {
        self.guard(rule, |r| r.visit(tree))?
    }

    /// Run `f` against `rule`, converting a panic into [`RuleError::Panicked`]
    /// when isolation is on
    pub(crate) fn guard<T>(
        &self,
        rule: &mut dyn Rule,
        f: impl FnOnce(&mut dyn Rule) -> T,
    ) -> Result<T, RuleError> {
        if !self.isolate_panics {
            return Ok(f(rule));
        }
        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *rule))) {
            Ok(value) => Ok(value),
            Err(payload) => Err(RuleError::Panicked {
                rule: rule.name().to_owned(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
