//! Change accumulation
//!
//! Changes are keyed by stable working-set [`Position`], never by tree
//! identity: a tree's identity churns every time a rule fires, its position
//! does not.

use recast_tree::{same_slot, Source};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Stable index of a source in the working set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(usize);

impl Position {
    /// Position at `index`
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index into the working set
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Accumulated before/after/contributors record for one position
///
/// # Invariants
/// - `original` never changes once recorded
/// - `contributors` only grows
#[derive(Debug, Clone)]
pub struct Change {
    position: Position,
    original: Option<Source>,
    current: Option<Source>,
    contributors: BTreeSet<String>,
}

impl Change {
    /// Working-set position this record belongs to
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Tree as first observed (`None` for generated sources)
    #[inline]
    #[must_use]
    pub fn original(&self) -> Option<&Source> {
        self.original.as_ref()
    }

    /// Latest tree (`None` if the source was deleted)
    #[inline]
    #[must_use]
    pub fn fixed(&self) -> Option<&Source> {
        self.current.as_ref()
    }

    /// Names of every rule that produced a different tree for this position
    #[inline]
    #[must_use]
    pub fn contributors(&self) -> &BTreeSet<String> {
        &self.contributors
    }

    /// Whether `rule` contributed to this change
    #[inline]
    #[must_use]
    pub fn made_by(&self, rule: &str) -> bool {
        self.contributors.contains(rule)
    }

    /// Dynamic type of the latest tree, falling back to the original
    #[must_use]
    pub fn tree_type(&self) -> Option<&'static str> {
        self.current
            .as_ref()
            .or(self.original.as_ref())
            .map(|t| t.tree_type())
    }

    /// Source was added by a rule during the run
    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.original.is_none()
    }

    /// Source was removed by a rule during the run
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.current.is_none()
    }

    /// Whether the content (or path) actually differs
    ///
    /// A record exists whenever a rule produced a new tree value, even if
    /// that value is a content-equal rebuild. This tells the two apart.
    #[must_use]
    pub fn is_content_changed(&self) -> bool {
        match (&self.original, &self.current) {
            (Some(before), Some(after)) => {
                before.path() != after.path() || before.fingerprint() != after.fingerprint()
            }
            (None, None) => false,
            _ => true,
        }
    }
}

/// Bookkeeping of per-position changes during a run
#[derive(Debug, Default)]
pub struct ChangeAccumulator {
    records: BTreeMap<Position, Change>,
}

impl ChangeAccumulator {
    /// Create an empty accumulator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a change at `position`
    ///
    /// `original` is only used if this is the first change at `position`.
    /// Merging a rule name that is already recorded is a no-op on the set.
    pub fn merge<I, S>(
        &mut self,
        position: Position,
        original: Option<&Source>,
        current: Option<Source>,
        rules: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = self.records.entry(position).or_insert_with(|| Change {
            position,
            original: original.cloned(),
            current: None,
            contributors: BTreeSet::new(),
        });
        record.current = current;
        record.contributors.extend(rules.into_iter().map(Into::into));
    }

    /// Record a source generated by `rule` at a new `position`
    pub fn record_generated(&mut self, position: Position, tree: Source, rule: &str) {
        self.merge(position, None, Some(tree), [rule]);
    }

    /// Record for `position`, if any
    #[inline]
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&Change> {
        self.records.get(&position)
    }

    /// Number of positions with a record
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no position has changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finish accumulation
    #[must_use]
    pub fn into_change_set(self, summary: FixSummary) -> ChangeSet {
        ChangeSet {
            changes: self.records.into_values().collect(),
            summary,
        }
    }
}

/// How a run went, independent of what it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixSummary {
    /// Cycles actually run
    pub cycles: usize,
    /// Whether the last cycle produced no change and generated nothing
    pub converged: bool,
    /// Rule invocations that failed
    pub failures: usize,
    /// Final working-set size, vacated slots included
    pub sources: usize,
}

/// Result of a fix run: one [`Change`] per changed position, in position order
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
    summary: FixSummary,
}

impl ChangeSet {
    /// Number of changed positions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterate changes in position order
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Change for `position`, if any
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&Change> {
        self.changes
            .binary_search_by_key(&position, Change::position)
            .ok()
            .map(|i| &self.changes[i])
    }

    /// Contributors for `position` (empty if it did not change)
    #[must_use]
    pub fn contributors_of(&self, position: Position) -> BTreeSet<String> {
        self.get(position)
            .map(|c| c.contributors.clone())
            .unwrap_or_default()
    }

    /// Changes whose latest tree is `source` (by identity)
    #[must_use]
    pub fn find_fixed(&self, source: &Source) -> Option<&Change> {
        self.changes
            .iter()
            .find(|c| same_slot(c.fixed(), Some(source)))
    }

    /// Run summary
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &FixSummary {
        &self.summary
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_tree::{Fingerprint, Tree, TreeKind};

    #[derive(Debug)]
    struct TextKind;

    impl TreeKind for TextKind {
        type Content = String;
        const TYPE_ID: &'static str = "text";

        fn fingerprint(content: &String) -> Fingerprint {
            Fingerprint::compute(content.as_bytes())
        }
    }

    fn text(s: &str) -> Tree<TextKind> {
        Tree::new("t.txt", s.to_string()).unwrap()
    }

    #[test]
    fn first_merge_captures_original() {
        let before = text("a").into_source();
        let after = text("b").into_source();
        let mut acc = ChangeAccumulator::new();
        acc.merge(Position::new(0), Some(&before), Some(after.clone()), ["x"]);

        let change = acc.get(Position::new(0)).unwrap();
        assert!(same_slot(change.original(), Some(&before)));
        assert!(same_slot(change.fixed(), Some(&after)));
        assert!(change.made_by("x"));
    }

    #[test]
    fn later_merges_keep_original_and_grow_contributors() {
        let before = text("a").into_source();
        let mid = text("b").into_source();
        let last = text("c").into_source();
        let mut acc = ChangeAccumulator::new();
        acc.merge(Position::new(3), Some(&before), Some(mid.clone()), ["x"]);
        acc.merge(Position::new(3), Some(&mid), Some(last.clone()), ["y", "x"]);

        let change = acc.get(Position::new(3)).unwrap();
        assert!(same_slot(change.original(), Some(&before)));
        assert!(same_slot(change.fixed(), Some(&last)));
        let names: Vec<_> = change.contributors().iter().cloned().collect();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn reverted_content_still_counts_as_changed_record() {
        let original = text("a");
        let edited = original.with_content("b".into());
        let reverted = edited.with_content("a".into());
        let mut acc = ChangeAccumulator::new();
        let src = original.into_source();
        acc.merge(Position::new(0), Some(&src), Some(edited.into_source()), ["edit"]);
        acc.merge(Position::new(0), None, Some(reverted.into_source()), ["revert"]);

        let set = acc.into_change_set(FixSummary::default());
        let change = set.get(Position::new(0)).unwrap();
        assert_eq!(change.contributors().len(), 2);
        assert!(!change.is_content_changed());
    }

    #[test]
    fn generated_and_deleted_records() {
        let mut acc = ChangeAccumulator::new();
        let kept = text("k").into_source();
        acc.record_generated(Position::new(1), text("g").into_source(), "gen");
        acc.merge(Position::new(0), Some(&kept), None, ["rm"]);

        let set = acc.into_change_set(FixSummary::default());
        let generated = set.get(Position::new(1)).unwrap();
        assert!(generated.is_generated());
        assert!(!generated.is_deleted());
        assert!(generated.is_content_changed());
        assert_eq!(generated.tree_type(), Some("text"));

        let deleted = set.get(Position::new(0)).unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.tree_type(), Some("text"));
    }

    #[test]
    fn change_set_is_position_ordered() {
        let mut acc = ChangeAccumulator::new();
        for i in [5, 1, 3] {
            let src = text("x").into_source();
            acc.merge(Position::new(i), Some(&src), Some(text("y").into_source()), ["r"]);
        }
        let set = acc.into_change_set(FixSummary::default());
        let positions: Vec<_> = set.iter().map(|c| c.position().index()).collect();
        assert_eq!(positions, vec![1, 3, 5]);
        assert!(set.get(Position::new(2)).is_none());
        assert!(set.contributors_of(Position::new(2)).is_empty());
        assert_eq!(set.contributors_of(Position::new(3)).len(), 1);
    }

    #[test]
    fn find_fixed_by_identity() {
        let mut acc = ChangeAccumulator::new();
        let before = text("x").into_source();
        let after = text("y").into_source();
        acc.merge(Position::new(0), Some(&before), Some(after.clone()), ["r"]);
        let set = acc.into_change_set(FixSummary::default());

        assert!(set.find_fixed(&after).is_some());
        assert!(set.find_fixed(&text("y").into_source()).is_none());
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::new(4).to_string(), "@4");
    }
}
