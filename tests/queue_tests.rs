//! Immediate and queued processing of nested triggers.

mod common;

use common::Journal;
use treestate::core::EventArgs;
use treestate::{Callback, Machine, MachineError, QueueMode, StateSpec, StateValue, TransitionSpec};

/// After-callback that fires `triggers` on its own model and logs what
/// each call returned.
fn chain(triggers: &'static [&'static str]) -> Callback<Journal> {
    Callback::labelled("chain", move |model: &mut Journal, call| {
        let event = call.event().ok_or("event not sent")?;
        for trigger in triggers {
            let result = event.trigger(trigger, EventArgs::new())?;
            model.log.push(format!("{trigger}={result}"));
        }
        Ok(())
    })
}

fn machine(mode: QueueMode, after_go: &'static [&'static str]) -> Machine<Journal> {
    Machine::builder()
        .state(StateSpec::new("A"))
        .state(StateSpec::new("B").on_enter("enter_B"))
        .state(StateSpec::new("C").on_enter("enter_C"))
        .state(StateSpec::new("D").on_enter("enter_D"))
        .initial("A")
        .send_event(true)
        .queued(mode)
        .transition(TransitionSpec::new("go", "A", "B").after(chain(after_go)))
        .transition(TransitionSpec::new("next", "B", "C"))
        .transition(TransitionSpec::new("last", "C", "D"))
        .transition(TransitionSpec::new("broken", "B", "C").before("fail"))
        .build()
        .unwrap()
}

fn log_of(machine: &Machine<Journal>, id: treestate::ModelId) -> Vec<String> {
    machine.with_model(id, |m| m.log.clone()).unwrap()
}

#[test]
fn nested_triggers_are_rejected_without_a_queue() {
    let machine = machine(QueueMode::Off, &["next"]);
    let id = machine.add_model(Journal::new()).unwrap();

    let err = machine.trigger(id, "go", EventArgs::new()).unwrap_err();
    let cause = err
        .callback_source()
        .and_then(|source| source.downcast_ref::<MachineError>());
    assert!(matches!(cause, Some(MachineError::ReentrantTrigger { .. })));

    // the machine is usable again afterwards
    machine.set_state(id, "B").unwrap();
    assert!(machine.trigger(id, "next", EventArgs::new()).unwrap());
}

#[test]
fn queued_triggers_run_after_the_current_one_in_fifo_order() {
    let machine = machine(QueueMode::Machine, &["next", "last"]);
    let id = machine.add_model(Journal::new()).unwrap();

    assert!(machine.trigger(id, "go", EventArgs::new()).unwrap());
    assert_eq!(
        log_of(&machine, id),
        ["enter_B", "next=true", "last=true", "enter_C", "enter_D"]
    );
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("D"));
}

#[test]
fn failing_queued_trigger_clears_the_queue() {
    let machine = machine(QueueMode::Model, &["broken", "next"]);
    let id = machine.add_model(Journal::new()).unwrap();

    let err = machine.trigger(id, "go", EventArgs::new()).unwrap_err();
    assert!(matches!(err, MachineError::Callback { .. }));
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("B"));

    // `next` was dropped with the queue; a fresh trigger drains normally
    assert!(machine.trigger(id, "next", EventArgs::new()).unwrap());
    assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("C"));
}

fn cross_model(mode: QueueMode) -> (Machine<Journal>, treestate::ModelId, treestate::ModelId) {
    let kick = Callback::labelled("kick", |model: &mut Journal, call| {
        let event = call.event().ok_or("event not sent")?;
        let machine = event.machine();
        for other in machine.models().into_iter().filter(|id| *id != event.model) {
            machine.trigger(other, "go", EventArgs::new())?;
            model.log.push(machine.state_of(other)?.to_string());
        }
        Ok(())
    });
    let machine: Machine<Journal> = Machine::builder()
        .states(["A", "B"])
        .initial("A")
        .send_event(true)
        .queued(mode)
        .transition(TransitionSpec::new("kick", "A", "B").after(kick))
        .transition(TransitionSpec::new("go", "A", "B"))
        .build()
        .unwrap();
    let first = machine.add_model(Journal::new()).unwrap();
    let second = machine.add_model(Journal::new()).unwrap();
    (machine, first, second)
}

#[test]
fn machine_queue_defers_triggers_for_other_models() {
    let (machine, first, second) = cross_model(QueueMode::Machine);
    assert!(machine.trigger(first, "kick", EventArgs::new()).unwrap());
    assert_eq!(log_of(&machine, first), ["A"]);
    assert_eq!(machine.state_of(second).unwrap(), StateValue::leaf("B"));
}

#[test]
fn model_queues_let_other_models_proceed() {
    let (machine, first, second) = cross_model(QueueMode::Model);
    assert!(machine.trigger(first, "kick", EventArgs::new()).unwrap());
    assert_eq!(log_of(&machine, first), ["B"]);
    assert_eq!(machine.state_of(second).unwrap(), StateValue::leaf("B"));
}
