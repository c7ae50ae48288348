//! Change attribution across rules, continuations, and cycles.
//!
//! Core guarantees exercised here:
//! - Every rule that produced a new tree value for a position is named in
//!   that position's record, no matter which cycle it fired in.
//! - Continuations that fired are named alongside the rule that queued them.
//! - A record's original is the tree first observed at that position.

use pretty_assertions::assert_eq;
use recast_core::{Position, RecordingSink, Refactor};
use recast_test_utils::{render_opt, replace, text_source, uppercase, Chain};
use std::collections::BTreeSet;
use std::sync::Arc;

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// Tenet: X in cycle 0 and Y in cycle 1 are both credited, exactly.
#[test]
fn contributors_accumulate_across_cycles() {
    // Y enables X, but runs after it, so X only fires in the next cycle
    let mut refactor = Refactor::new()
        .visit(replace("X", "b", "c"))
        .visit(replace("Y", "a", "b"));
    let changes = refactor.fix([text_source("a.txt", "a")]);

    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(change.contributors(), &names(&["X", "Y"]));
    assert_eq!(render_opt(change.fixed()).as_deref(), Some("c"));
    assert_eq!(render_opt(change.original()).as_deref(), Some("a"));
    assert_eq!(changes.summary().cycles, 3);
}

/// Tenet: larger budgets never inflate the contributor set.
#[test]
fn contributors_independent_of_cycle_budget() {
    for max_cycles in [2, 3, 10] {
        let mut refactor = Refactor::new()
            .visit(replace("X", "b", "c"))
            .visit(replace("Y", "a", "b"));
        let changes = refactor.fix_with_cycles([text_source("a.txt", "a")], max_cycles);
        assert_eq!(
            changes.contributors_of(Position::new(0)),
            names(&["X", "Y"])
        );
    }
}

/// Tenet: a continuation that fires is credited with the rule that queued it.
#[test]
fn fired_continuation_is_credited() {
    let mut refactor =
        Refactor::new().visit(Chain::new(replace("X", "zzz", "")).then(|| replace("Y", "a", "b")));
    let changes = refactor.fix([text_source("a.txt", "a")]);

    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(change.contributors(), &names(&["X", "Y"]));
    assert_eq!(render_opt(change.fixed()).as_deref(), Some("b"));
}

/// Tenet: a continuation that changes nothing is not credited.
#[test]
fn idle_continuation_is_not_credited() {
    let mut refactor = Refactor::new().visit(
        Chain::new(replace("X", "a", "b"))
            .then(|| replace("idle", "zzz", "yyy"))
            .then(uppercase),
    );
    let changes = refactor.fix([text_source("a.txt", "a")]);

    assert_eq!(
        changes.contributors_of(Position::new(0)),
        names(&["X", "uppercase"])
    );
    assert_eq!(
        render_opt(changes.get(Position::new(0)).unwrap().fixed()).as_deref(),
        Some("B")
    );
}

/// Tenet: nested continuations run depth-first on the running result.
#[test]
fn nested_continuations_apply_in_order() {
    let mut refactor = Refactor::new().visit(
        Chain::new(replace("first", "a", "b"))
            .then(|| Chain::new(replace("second", "b", "c")).then(|| replace("third", "c", "d")))
            .then(|| replace("fourth", "d", "e")),
    );
    let changes = refactor.fix([text_source("a.txt", "a")]);

    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(render_opt(change.fixed()).as_deref(), Some("e"));
    assert_eq!(
        change.contributors(),
        &names(&["first", "second", "third", "fourth"])
    );
}

/// Tenet: only the positions a rule touched carry its name.
#[test]
fn attribution_is_per_position() {
    let sink = Arc::new(RecordingSink::new());
    let mut refactor = Refactor::new()
        .visit(replace("A", "a", "A"))
        .visit(replace("B", "b", "B"))
        .with_sink(sink.clone());
    let changes = refactor.fix([
        text_source("0.txt", "a"),
        text_source("1.txt", "b"),
        text_source("2.txt", "c"),
        text_source("3.txt", "ab"),
    ]);

    assert_eq!(changes.len(), 3);
    assert_eq!(changes.contributors_of(Position::new(0)), names(&["A"]));
    assert_eq!(changes.contributors_of(Position::new(1)), names(&["B"]));
    assert!(changes.get(Position::new(2)).is_none());
    assert_eq!(changes.contributors_of(Position::new(3)), names(&["A", "B"]));

    // one contribution event per contributor per record
    let mut contributed: Vec<_> = sink.contributions().into_iter().map(|(r, _)| r).collect();
    contributed.sort();
    assert_eq!(contributed, vec!["A", "A", "B", "B"]);
}

/// Tenet: a rebuild that restores the original content still counts as a change.
#[test]
fn content_equal_rebuild_is_recorded_but_not_content_changed() {
    let mut refactor = Refactor::new()
        .visit(replace("there", "a", "b"))
        .visit(replace("back", "b", "a"));
    let changes = refactor.fix_with_cycles([text_source("a.txt", "a")], 1);

    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(change.contributors(), &names(&["there", "back"]));
    assert!(!change.is_content_changed());
}
