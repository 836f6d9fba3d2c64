//! Property-based tests over random trigger sequences.
//!
//! These tests use proptest to drive a nested machine through arbitrary
//! event streams and check that structural guarantees always hold.

mod common;

use common::Journal;
use proptest::prelude::*;
use std::collections::HashMap;
use treestate::core::EventArgs;
use treestate::{Blocking, Machine, StateSpec, StateValue, TransitionSpec};

const TRIGGERS: &[&str] = &[
    "deep", "hop", "up", "split", "dive", "step_x", "step_y", "leave", "again", "poke", "reset",
];

fn logged(name: &str, path: &str) -> StateSpec<Blocking<Journal>> {
    StateSpec::new(name)
        .on_enter(format!("enter_{path}"))
        .on_exit(format!("exit_{path}"))
}

fn machine(explicit_reset: bool) -> Machine<Journal> {
    let machine: Machine<Journal> = Machine::builder()
        .state(logged("A", "A"))
        .state(
            logged("B", "B")
                .children([
                    logged("1", "B_1"),
                    logged("2", "B_2")
                        .children([logged("a", "B_2_a"), logged("b", "B_2_b")])
                        .initial("a"),
                ])
                .initial("1"),
        )
        .state(logged("C", "C").parallel([
            logged("x", "C_x")
                .children([logged("1", "C_x_1"), logged("2", "C_x_2")])
                .initial("1"),
            logged("y", "C_y")
                .children([logged("1", "C_y_1"), logged("2", "C_y_2")])
                .initial("1"),
        ]))
        .initial("A")
        .ignore_invalid_triggers(true)
        .transition(TransitionSpec::new("deep", "A", "B_2_b"))
        .transition(TransitionSpec::new("hop", "B_2_a", "B_1"))
        .transition(TransitionSpec::new("hop", "B_2_b", "B_2_a"))
        .transition(TransitionSpec::new("up", "B", "A"))
        .transition(TransitionSpec::new("split", ["A", "B_1"], "C"))
        .transition(TransitionSpec::new("dive", ["A", "B_2"], "C_y_2"))
        .transition(TransitionSpec::new("step_x", "C_x_1", "C_x_2"))
        .transition(TransitionSpec::new("step_y", "C_y_1", "C_y_2"))
        .transition(TransitionSpec::new("leave", "C", "B_2"))
        .transition(TransitionSpec::new("again", ["B_1", "C_x_2"], "="))
        .transition(TransitionSpec::internal("poke", "C").after("poked"))
        .build()
        .unwrap();
    let reset = if explicit_reset {
        TransitionSpec::new("reset", machine.states(), "A")
    } else {
        TransitionSpec::new("reset", "*", "A")
    };
    machine.add_transition(reset).unwrap();
    machine
}

fn run(machine: &Machine<Journal>, triggers: &[&str]) -> (treestate::ModelId, Vec<bool>) {
    let id = machine.add_model(Journal::new()).unwrap();
    let results = triggers
        .iter()
        .map(|trigger| machine.trigger(id, trigger, EventArgs::new()).unwrap())
        .collect();
    (id, results)
}

prop_compose! {
    fn trigger_sequence()(indices in prop::collection::vec(0..TRIGGERS.len(), 0..40)) -> Vec<&'static str> {
        indices.into_iter().map(|i| TRIGGERS[i]).collect()
    }
}

proptest! {
    #[test]
    fn active_states_are_always_registered_leaves(triggers in trigger_sequence()) {
        let machine = machine(false);
        let (id, _) = run(&machine, &triggers);
        let value = machine.state_of(id).unwrap();
        for leaf in value.leaves() {
            let state = machine.get_state(leaf).unwrap();
            prop_assert!(state.children().is_empty(), "{leaf} is not a leaf");
        }
    }

    #[test]
    fn active_parallel_states_have_every_region_active(triggers in trigger_sequence()) {
        let machine = machine(false);
        let id = machine.add_model(Journal::new()).unwrap();
        for trigger in triggers {
            machine.trigger(id, trigger, EventArgs::new()).unwrap();
            for name in machine.states() {
                let state = machine.get_state(&name).unwrap();
                if !state.initial().is_parallel() || !machine.is_state(id, &name, true).unwrap() {
                    continue;
                }
                for region in state.children() {
                    let region = format!("{name}_{}", region.name());
                    prop_assert!(
                        machine.is_state(id, &region, true).unwrap(),
                        "{} active without {} after {}", name, region, trigger
                    );
                }
            }
        }
    }

    #[test]
    fn identical_streams_give_identical_runs(triggers in trigger_sequence()) {
        let first = machine(false);
        let second = machine(false);
        let (a, results_a) = run(&first, &triggers);
        let (b, results_b) = run(&second, &triggers);
        prop_assert_eq!(results_a, results_b);
        prop_assert_eq!(first.state_of(a).unwrap(), second.state_of(b).unwrap());
        prop_assert_eq!(
            first.with_model(a, |m| m.log.clone()).unwrap(),
            second.with_model(b, |m| m.log.clone()).unwrap()
        );
    }

    #[test]
    fn enters_and_exits_balance_with_activity(triggers in trigger_sequence()) {
        let machine = machine(false);
        let (id, _) = run(&machine, &triggers);

        let mut balance: HashMap<String, i32> = HashMap::new();
        for entry in machine.with_model(id, |m| m.log.clone()).unwrap() {
            if let Some(state) = entry.strip_prefix("enter_") {
                *balance.entry(state.to_string()).or_default() += 1;
            } else if let Some(state) = entry.strip_prefix("exit_") {
                *balance.entry(state.to_string()).or_default() -= 1;
            }
        }

        for state in machine.states() {
            let active_now = i32::from(machine.is_state(id, &state, true).unwrap());
            let active_at_start = i32::from(state == "A");
            prop_assert_eq!(
                balance.get(&state).copied().unwrap_or(0),
                active_now - active_at_start,
                "unbalanced callbacks for {}", state
            );
        }
    }

    #[test]
    fn wildcard_source_matches_explicit_list(triggers in trigger_sequence()) {
        let wildcard = machine(false);
        let explicit = machine(true);
        let (a, results_a) = run(&wildcard, &triggers);
        let (b, results_b) = run(&explicit, &triggers);
        prop_assert_eq!(results_a, results_b);
        prop_assert_eq!(wildcard.state_of(a).unwrap(), explicit.state_of(b).unwrap());
    }

    #[test]
    fn parallel_regions_stay_in_declaration_order(triggers in trigger_sequence()) {
        let machine = machine(false);
        let (id, _) = run(&machine, &triggers);
        if let StateValue::Parallel(regions) = machine.state_of(id).unwrap() {
            let leaves: Vec<String> = regions.iter().map(ToString::to_string).collect();
            prop_assert_eq!(leaves.len(), 2);
            prop_assert!(leaves[0].starts_with("C_x"));
            prop_assert!(leaves[1].starts_with("C_y"));
        }
    }
}
