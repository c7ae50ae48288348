//! Property tests of the fixpoint scheduler over random text inputs.

use proptest::prelude::*;
use recast_core::{FixConfig, Position, Refactor, Rule};
use recast_test_utils::{append_always, render_opt, replace, text_source, uppercase};
use recast_tree::Source;

/// Terminating rewrites: every rule moves letters strictly forward
fn rule_set(picks: &[u8]) -> Vec<Box<dyn Rule>> {
    picks
        .iter()
        .map(|pick| -> Box<dyn Rule> {
            match pick % 4 {
                0 => Box::new(uppercase()),
                1 => Box::new(replace("a-to-b", "a", "b")),
                2 => Box::new(replace("B-to-C", "B", "C")),
                _ => Box::new(replace("b-to-c", "b", "c")),
            }
        })
        .collect()
}

fn sources(texts: &[String]) -> Vec<Source> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| text_source(&format!("{i}.txt"), t))
        .collect()
}

fn text_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[abcABC \n]{0,12}", 0..6)
}

proptest! {
    #[test]
    fn prop_cycles_never_exceed_budget(
        texts in text_strategy(),
        picks in prop::collection::vec(any::<u8>(), 0..5),
        max_cycles in 1usize..6,
    ) {
        let mut refactor = Refactor::new().visit_all(rule_set(&picks));
        let changes = refactor.fix_with_cycles(sources(&texts), max_cycles);
        let summary = changes.summary();

        prop_assert!(summary.cycles >= 1);
        prop_assert!(summary.cycles <= max_cycles);
        if !summary.converged {
            prop_assert_eq!(summary.cycles, max_cycles);
        }
    }

    #[test]
    fn prop_rerun_on_converged_output_is_empty(
        texts in text_strategy(),
        picks in prop::collection::vec(any::<u8>(), 0..5),
    ) {
        let config = FixConfig::new().with_max_cycles(16);
        let mut refactor = Refactor::new()
            .visit_all(rule_set(&picks))
            .with_config(config);
        let inputs = sources(&texts);
        let changes = refactor.fix(inputs.clone());
        prop_assert!(changes.summary().converged);

        let outputs: Vec<Source> = inputs
            .into_iter()
            .enumerate()
            .filter_map(|(i, input)| match changes.get(Position::new(i)) {
                Some(change) => change.fixed().cloned(),
                None => Some(input),
            })
            .collect();
        let rerun = refactor.fix(outputs);
        prop_assert!(rerun.is_empty());
        prop_assert_eq!(rerun.summary().cycles, 1);
    }

    #[test]
    fn prop_non_idempotent_rule_fires_once_per_position(
        texts in text_strategy(),
        max_cycles in 1usize..6,
    ) {
        let mut refactor = Refactor::new().visit(append_always("stamp", "#stamp"));
        let changes = refactor.fix_with_cycles(sources(&texts), max_cycles);

        prop_assert_eq!(changes.len(), texts.len());
        for change in &changes {
            let text = render_opt(change.fixed()).unwrap_or_default();
            prop_assert_eq!(text.matches("#stamp").count(), 1);
        }
    }

    #[test]
    fn prop_contributors_come_from_the_plan(
        texts in text_strategy(),
        picks in prop::collection::vec(any::<u8>(), 0..5),
    ) {
        let rules = rule_set(&picks);
        let names: Vec<String> = rules.iter().map(|r| r.name().to_owned()).collect();
        let mut refactor = Refactor::new().visit_all(rules);
        let changes = refactor.fix(sources(&texts));

        for change in &changes {
            prop_assert!(!change.contributors().is_empty());
            for rule in change.contributors() {
                prop_assert!(names.contains(rule));
            }
        }
    }
}
