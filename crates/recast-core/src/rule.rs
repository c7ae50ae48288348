//! Rule contract and adapters
//!
//! A [`Rule`] is a named, possibly stateful unit of work the scheduler runs
//! over every source. Rules compose dynamically: during [`Rule::visit`] a rule
//! may queue follow-up rules (see [`Continuations`]) that the pipeline runs on
//! its output before the scheduler observes the result.

use crate::error::RuleError;
use recast_tree::{downcast, Source, Tree, TreeKind};
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

/// Transformation rule
///
/// # Contract
/// - `visit` must return the same [`Source`] (by identity) when it makes no
///   change; this is the only change-detection signal
/// - returning `Ok(None)` deletes the source from the working set
/// - `is_idempotent` and `continuations` are queried on every invocation
/// - a rule instance is driven by one `fix` call at a time
pub trait Rule: Send {
    /// Name used for change attribution and instrumentation
    fn name(&self) -> &str;

    /// Whether the rule is safe to re-apply on every cycle
    ///
    /// Non-idempotent rules only run in the first cycle.
    fn is_idempotent(&self) -> bool {
        true
    }

    /// Reset per-application state (counters, name allocators, queued
    /// continuations). Called once per (cycle, position, rule), whether or not
    /// the rule then runs.
    fn begin_application_unit(&mut self) {}

    /// Transform one tree
    ///
    /// # Errors
    /// Returns error if the rule cannot complete; the scheduler discards the
    /// attempt and keeps the tree as it was before this rule.
    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError>;

    /// Rules to run, in order, on the output of the last `visit`
    ///
    /// Drained by the pipeline after each `visit`, including a failed one;
    /// follow-ups queued by a failed visit are discarded.
    fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
        Vec::new()
    }

    /// Brand-new sources to append to the working set
    ///
    /// Appended sources are visited later in the same cycle and can generate
    /// again, so a rule must eventually stop returning new sources.
    fn generate(&mut self) -> Vec<Source> {
        Vec::new()
    }
}

impl<R: Rule + ?Sized> Rule for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_idempotent(&self) -> bool {
        (**self).is_idempotent()
    }

    fn begin_application_unit(&mut self) {
        (**self).begin_application_unit();
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        (**self).visit(tree)
    }

    fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
        (**self).continuations()
    }

    fn generate(&mut self) -> Vec<Source> {
        (**self).generate()
    }
}

/// Queue of follow-up rules owned by a rule
///
/// ```rust,ignore
/// fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
///     if let Some(newer) = self.newer_version(&tree) {
///         self.next.and_then(ChangeDependencyVersion::new(&self.group, newer));
///     }
///     Ok(Some(tree))
/// }
///
/// fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
///     self.next.take()
/// }
/// ```
#[derive(Default)]
pub struct Continuations {
    pending: Vec<Box<dyn Rule>>,
}

impl Continuations {
    /// Create an empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `rule` to run after the current visit
    pub fn and_then(&mut self, rule: impl Rule + 'static) {
        self.pending.push(Box::new(rule));
    }

    /// Hand the queued rules to the pipeline, leaving the queue empty
    #[must_use]
    pub fn take(&mut self) -> Vec<Box<dyn Rule>> {
        std::mem::take(&mut self.pending)
    }

    /// Drop queued rules
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of queued rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Debug for Continuations {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pending.iter().map(|r| r.name()))
            .finish()
    }
}

/// Closure-backed rule
pub struct FnRule<F> {
    name: String,
    idempotent: bool,
    f: F,
}

impl<F> FnRule<F>
where
    F: FnMut(Source) -> Result<Option<Source>, RuleError> + Send,
{
    /// Create an idempotent rule from a closure
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            idempotent: true,
            f,
        }
    }

    /// Mark the rule as run-once (first cycle only)
    #[must_use]
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }
}

impl<F> Debug for FnRule<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("idempotent", &self.idempotent)
            .finish_non_exhaustive()
    }
}

impl<F> Rule for FnRule<F>
where
    F: FnMut(Source) -> Result<Option<Source>, RuleError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        (self.f)(tree)
    }
}

/// Result of a [`TypedRule`] visit
#[derive(Debug)]
pub enum Edit<K: TreeKind> {
    /// Leave the tree as it is
    Unchanged,
    /// Replace the tree with a new value
    Replace(Tree<K>),
    /// Remove the source
    Delete,
}

/// Rule written against one concrete tree kind
///
/// Wrap it in [`Typed`] to run it in a scheduler; trees of other kinds pass
/// through untouched unless the adapter is strict.
pub trait TypedRule<K: TreeKind>: Send {
    /// Name used for change attribution and instrumentation
    fn name(&self) -> &str;

    /// See [`Rule::is_idempotent`]
    fn is_idempotent(&self) -> bool {
        true
    }

    /// See [`Rule::begin_application_unit`]
    fn begin_application_unit(&mut self) {}

    /// Transform one tree of kind `K`
    ///
    /// # Errors
    /// Returns error if the rule cannot complete
    fn visit_tree(&mut self, tree: &Tree<K>) -> Result<Edit<K>, RuleError>;

    /// See [`Rule::continuations`]
    fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
        Vec::new()
    }

    /// See [`Rule::generate`]
    fn generate(&mut self) -> Vec<Source> {
        Vec::new()
    }
}

/// Adapter from [`TypedRule<K>`] to [`Rule`]
///
/// Replacement trees are validated against `K` before they leave the
/// adapter; an invalid replacement is a rule failure.
pub struct Typed<K, R> {
    rule: R,
    strict: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K, R> Typed<K, R>
where
    K: TreeKind,
    R: TypedRule<K>,
{
    /// Wrap a typed rule; trees of other kinds pass through
    #[inline]
    #[must_use]
    pub fn new(rule: R) -> Self {
        Self {
            rule,
            strict: false,
            _kind: PhantomData,
        }
    }

    /// Wrap a typed rule that fails with [`RuleError::UnsupportedTree`] on
    /// trees of other kinds
    #[inline]
    #[must_use]
    pub fn strict(rule: R) -> Self {
        Self {
            rule,
            strict: true,
            _kind: PhantomData,
        }
    }

    /// Whether other tree kinds are rejected
    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Borrow the wrapped rule
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &R {
        &self.rule
    }

    /// Unwrap the typed rule
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> R {
        self.rule
    }
}

impl<K, R> Rule for Typed<K, R>
where
    K: TreeKind,
    R: TypedRule<K>,
{
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn is_idempotent(&self) -> bool {
        self.rule.is_idempotent()
    }

    fn begin_application_unit(&mut self) {
        self.rule.begin_application_unit();
    }

    fn visit(&mut self, tree: Source) -> Result<Option<Source>, RuleError> {
        let Some(typed) = downcast::<K>(&tree) else {
            if self.strict {
                return Err(RuleError::UnsupportedTree {
                    rule: self.rule.name().to_owned(),
                    tree_type: tree.tree_type().to_owned(),
                });
            }
            return Ok(Some(tree));
        };
        match self.rule.visit_tree(typed)? {
            Edit::Unchanged => Ok(Some(tree)),
            Edit::Replace(replacement) => {
                replacement
                    .validate()
                    .map_err(|e| RuleError::failed(self.rule.name(), e.to_string()))?;
                Ok(Some(replacement.into_source()))
            }
            Edit::Delete => Ok(None),
        }
    }

    fn continuations(&mut self) -> Vec<Box<dyn Rule>> {
        self.rule.continuations()
    }

    fn generate(&mut self) -> Vec<Source> {
        self.rule.generate()
    }
}
