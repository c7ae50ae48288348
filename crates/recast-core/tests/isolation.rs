//! Failure isolation.
//!
//! Core guarantees exercised here:
//! - A failing or panicking rule never aborts a run.
//! - A failing rule leaves the tree as it was before that rule.
//! - Failures are reported, tagged with the rule and tree type.

use pretty_assertions::assert_eq;
use recast_core::{FixConfig, InstrumentEvent, Position, RecordingSink, Refactor, RuleError, Typed};
use recast_test_utils::rules::Uppercase;
use recast_test_utils::{
    always_fails, init_tracing, panicking, render_opt, replace, text_source, uppercase, Chain,
};
use recast_tree::{Fingerprint, Tree, TreeKind};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
struct NumberKind;

impl TreeKind for NumberKind {
    type Content = u32;
    const TYPE_ID: &'static str = "number";

    fn fingerprint(content: &u32) -> Fingerprint {
        Fingerprint::compute(&content.to_le_bytes())
    }
}

/// Tenet: a strict typed rule reports foreign trees as failures and keeps going.
#[test]
fn strict_rule_reports_unsupported_trees() {
    let sink = Arc::new(RecordingSink::new());
    let mut refactor = Refactor::new()
        .visit(Typed::strict(Uppercase))
        .with_sink(sink.clone());
    let number = Tree::<NumberKind>::new("n.bin", 7).unwrap().into_source();
    let changes = refactor.fix([number, text_source("b.txt", "text")]);

    assert!(changes.get(Position::new(0)).is_none());
    let text = changes.get(Position::new(1)).unwrap();
    assert_eq!(render_opt(text.fixed()).as_deref(), Some("TEXT"));

    let failures = sink.failures();
    assert!(!failures.is_empty());
    assert!(failures
        .iter()
        .all(|(rule, tree)| rule == "uppercase" && tree == "number"));
}

/// Tenet: [A always errors, B uppercases] credits only B.
#[test]
fn failing_rule_does_not_block_others() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());
    let mut refactor = Refactor::new()
        .visit(always_fails("A"))
        .visit(uppercase())
        .with_sink(sink.clone());
    let changes = refactor.fix([text_source("a.txt", "text")]);

    assert_eq!(changes.len(), 1);
    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(
        change.contributors(),
        &BTreeSet::from(["uppercase".to_owned()])
    );
    assert_eq!(render_opt(change.fixed()).as_deref(), Some("TEXT"));

    let failures = sink.failures();
    assert!(!failures.is_empty());
    assert!(failures.iter().all(|(rule, tree)| rule == "A" && tree == "text"));
    assert_eq!(changes.summary().failures, failures.len());
}

/// Tenet: a panic is contained like an error.
#[test]
fn panicking_rule_is_contained() {
    let sink = Arc::new(RecordingSink::new());
    let mut refactor = Refactor::new()
        .visit(panicking("boom"))
        .visit(uppercase())
        .with_sink(sink.clone());
    let changes = refactor.fix([text_source("a.txt", "text")]);

    assert_eq!(changes.contributors_of(Position::new(0)).len(), 1);
    let panicked = sink.events().into_iter().any(|e| {
        matches!(
            e,
            InstrumentEvent::RuleFailed { error: RuleError::Panicked { ref rule, .. }, .. }
                if rule == "boom"
        )
    });
    assert!(panicked);
}

/// Tenet: a failing continuation discards the whole pipeline result.
#[test]
fn failing_continuation_discards_partial_result() {
    let mut refactor = Refactor::new()
        .visit(Chain::new(replace("X", "a", "b")).then(|| always_fails("broken")))
        .visit(replace("Z", "a", "z"));
    let changes = refactor.fix([text_source("a.txt", "a")]);

    // X's edit was thrown away with its broken continuation, so Z saw "a"
    let change = changes.get(Position::new(0)).unwrap();
    assert_eq!(render_opt(change.fixed()).as_deref(), Some("z"));
    assert!(!change.made_by("X"));
    assert!(!change.made_by("broken"));
}

/// Tenet: every position is attempted even if a rule fails on each one.
#[test]
fn failures_do_not_stop_later_positions() {
    let mut refactor = Refactor::new()
        .visit(always_fails("A"))
        .visit(uppercase())
        .with_config(FixConfig::new().with_max_cycles(1));
    let changes = refactor.fix((0..5).map(|i| text_source(&format!("{i}.txt"), "x")));

    assert_eq!(changes.len(), 5);
    assert_eq!(changes.summary().failures, 5);
}

/// Tenet: with isolation off, a panicking rule propagates.
#[test]
#[should_panic(expected = "boom cannot handle")]
fn panics_propagate_without_isolation() {
    let mut refactor = Refactor::new()
        .visit(panicking("boom"))
        .with_config(FixConfig::new().with_isolate_panics(false));
    let _ = refactor.fix([text_source("a.txt", "text")]);
}
