//! Hierarchical and parallel state changes on the blocking engine.

mod common;

use common::Journal;
use treestate::builder::Target;
use treestate::core::EventArgs;
use treestate::{Blocking, Machine, MachineError, StateSpec, StateValue, TransitionSpec};

type Spec = StateSpec<Blocking<Journal>>;

fn logged(name: &str, path: &str) -> Spec {
    StateSpec::new(name)
        .on_enter(format!("enter_{path}"))
        .on_exit(format!("exit_{path}"))
}

/// A, B{1, 2{a, b}}, C parallel {x{1, 2}, y{1, 2}}
fn machine() -> Machine<Journal> {
    Machine::builder()
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
        .transition(TransitionSpec::new("deep", "A", "B_2_b"))
        .transition(TransitionSpec::new("hop", "B_2_a", "B_1"))
        .transition(TransitionSpec::new("up", "B", "A"))
        .transition(TransitionSpec::new("split", "A", "C"))
        .transition(TransitionSpec::new("step_x", "C_x_1", "C_x_2"))
        .transition(TransitionSpec::new("jump", "A", "C_x_2"))
        .transition(TransitionSpec::new("leave", "C", "A"))
        .transition(TransitionSpec::new("again", "B_1", "="))
        .transition(TransitionSpec::internal("poke", "B_1").after("poked"))
        .build()
        .unwrap()
}

fn take_log(machine: &Machine<Journal>, id: treestate::ModelId) -> Vec<String> {
    machine
        .with_model_mut(id, |m| std::mem::take(&mut m.log))
        .unwrap()
}

fn go(machine: &Machine<Journal>, id: treestate::ModelId, trigger: &str) -> bool {
    machine.trigger(id, trigger, EventArgs::new()).unwrap()
}

#[test]
fn entering_a_deep_state_enters_every_level() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    assert!(go(&machine, id, "deep"));
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B_2_b"));
    assert_eq!(take_log(&machine, id), ["exit_A", "enter_B", "enter_B_2", "enter_B_2_b"]);
}

#[test]
fn entering_a_branch_descends_through_initial_children() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    assert!(machine.to_state(id, "B_2", EventArgs::new()).unwrap());
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B_2_a"));
    assert_eq!(take_log(&machine, id), ["exit_A", "enter_B", "enter_B_2", "enter_B_2_a"]);
}

#[test]
fn shared_prefix_is_neither_exited_nor_entered() {
    let machine = machine();
    let id = machine.add_model_with_initial(Journal::new(), "B_2").unwrap();
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B_2_a"));
    assert!(go(&machine, id, "hop"));
    assert_eq!(take_log(&machine, id), ["exit_B_2_a", "exit_B_2", "enter_B_1"]);
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B_1"));
}

#[test]
fn parent_transitions_apply_to_substates() {
    let machine = machine();
    let id = machine.add_model_with_initial(Journal::new(), "B_2_a").unwrap();
    assert!(go(&machine, id, "up"));
    assert_eq!(take_log(&machine, id), ["exit_B_2_a", "exit_B_2", "exit_B", "enter_A"]);
}

#[test]
fn entering_a_parallel_state_activates_every_region() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    assert!(go(&machine, id, "split"));
    assert_eq!(
        machine.state_of(id).unwrap(),
        StateValue::from(vec!["C_x_1", "C_y_1"])
    );
    assert_eq!(
        take_log(&machine, id),
        ["exit_A", "enter_C", "enter_C_x", "enter_C_y", "enter_C_x_1", "enter_C_y_1"]
    );
    assert!(machine.is_state(id, "C_y_1", false).unwrap());
    assert!(machine.is_state(id, "C", true).unwrap());
    assert!(!machine.is_state(id, "C", false).unwrap());
}

#[test]
fn regions_change_independently() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    go(&machine, id, "split");
    take_log(&machine, id);

    assert!(go(&machine, id, "step_x"));
    assert_eq!(
        machine.state_of(id).unwrap(),
        StateValue::from(vec!["C_x_2", "C_y_1"])
    );
    assert_eq!(take_log(&machine, id), ["exit_C_x_1", "enter_C_x_2"]);
}

#[test]
fn entering_one_region_from_outside_enters_its_siblings() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();

    assert!(go(&machine, id, "jump"));
    assert_eq!(
        machine.state_of(id).unwrap(),
        StateValue::from(vec!["C_x_2", "C_y_1"])
    );
    assert!(machine.is_state(id, "C_y", true).unwrap());
    assert_eq!(
        take_log(&machine, id),
        ["exit_A", "enter_C", "enter_C_x", "enter_C_y", "enter_C_x_2", "enter_C_y_1"]
    );
}

#[test]
fn leaving_a_parallel_state_exits_deepest_first() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    go(&machine, id, "split");
    take_log(&machine, id);

    assert!(go(&machine, id, "leave"));
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("A"));
    assert_eq!(
        take_log(&machine, id),
        ["exit_C_x_1", "exit_C_y_1", "exit_C_x", "exit_C_y", "exit_C", "enter_A"]
    );
}

#[test]
fn reflexive_transitions_reenter_and_internal_ones_do_not() {
    let machine = machine();
    let id = machine.add_model_with_initial(Journal::new(), "B_1").unwrap();

    assert!(go(&machine, id, "again"));
    assert_eq!(take_log(&machine, id), ["exit_B_1", "enter_B_1"]);

    assert!(go(&machine, id, "poke"));
    assert_eq!(take_log(&machine, id), ["poked"]);
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B_1"));
}

#[test]
fn wildcard_sources_cover_every_state() {
    let machine = machine();
    machine
        .add_transition(TransitionSpec::new("reset", "*", Target::from("A")))
        .unwrap();
    let sources: Vec<String> = machine
        .get_transitions(Some("reset"), None, None)
        .into_iter()
        .map(|t| t.source)
        .collect();
    assert_eq!(sources, machine.states());

    let id = machine.add_model(Journal::new()).unwrap();
    go(&machine, id, "split");
    assert!(go(&machine, id, "reset"));
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("A"));
}

#[test]
fn auto_transitions_reach_every_state() {
    let machine = machine();
    let id = machine.add_model(Journal::new()).unwrap();
    go(&machine, id, "split");
    take_log(&machine, id);

    assert!(go(&machine, id, "to_C_y_2"));
    assert_eq!(
        machine.state_of(id).unwrap(),
        StateValue::from(vec!["C_x_1", "C_y_2"])
    );
    assert_eq!(take_log(&machine, id), ["exit_C_y_1", "enter_C_y_2"]);
}

#[test]
fn triggers_include_ancestor_transitions() {
    let machine = machine();
    let triggers = machine.get_triggers(&["B_2_a"]).unwrap();
    assert!(triggers.contains(&"hop".to_string()));
    assert!(triggers.contains(&"up".to_string()));
    assert!(!triggers.contains(&"deep".to_string()));
    assert!(matches!(
        machine.get_triggers(&["Z"]),
        Err(MachineError::UnregisteredState { .. })
    ));
}

#[test]
fn embedded_machines_are_reused_with_remap() {
    let counter: Machine<Journal> = Machine::builder()
        .states(["idle", "counting", "done"])
        .initial("idle")
        .transition(TransitionSpec::new("start", "idle", "counting"))
        .transition(TransitionSpec::new("finish", "counting", "done"))
        .build()
        .unwrap();
    let machine: Machine<Journal> = Machine::builder()
        .states(["waiting", "collecting"])
        .state(
            StateSpec::new("counter")
                .embed(counter.blueprint())
                .initial("idle")
                .remap("done", "waiting"),
        )
        .initial("waiting")
        .transition(TransitionSpec::new("collect", "waiting", "counter"))
        .build()
        .unwrap();

    assert!(machine.states().contains(&"counter_counting".to_string()));
    assert!(!machine.states().contains(&"counter_done".to_string()));

    let id = machine.add_model(Journal::new()).unwrap();
    go(&machine, id, "collect");
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("counter_idle"));
    go(&machine, id, "start");
    go(&machine, id, "finish");
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("waiting"));
}

#[test]
fn nested_state_names_are_validated() {
    let machine = machine();
    assert!(matches!(
        machine.add_states_to("B", ["1"]),
        Err(MachineError::DuplicateState { .. })
    ));
    assert!(matches!(
        machine.add_states(["bad_name"]),
        Err(MachineError::InvalidStateName { .. })
    ));
    assert!(matches!(
        machine.add_transition(TransitionSpec::new("nowhere", "A", "B_9")),
        Err(MachineError::UnregisteredState { .. })
    ));
}
