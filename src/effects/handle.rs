//! Per-model convenience surface.
//!
//! The machine never injects methods into models. Instead a handle resolves
//! the names a model would otherwise gain: `<trigger>`, `is_<state>`,
//! `may_<trigger>` and `to_<state>`. Names the model type defines itself are
//! left alone.

use super::engine::Engine;
use super::machine::Machine;
use crate::core::{EventArgs, Model, ModelId, StateValue};
use crate::error::MachineError;
use std::marker::PhantomData;

/// A model addressed through its machine.
///
/// # Example
///
/// ```rust
/// use treestate::builder::TransitionSpec;
/// use treestate::core::{EventArgs, Stateful};
/// use treestate::Machine;
///
/// let machine: Machine<Stateful> = Machine::builder()
///     .states(["A", "B"])
///     .initial("A")
///     .transition(TransitionSpec::new("go", "A", "B"))
///     .build()
///     .unwrap();
/// let model = machine.handle(machine.add_model(Stateful::new()).unwrap());
///
/// assert!(model.call("is_A", EventArgs::new()).unwrap());
/// assert!(model.call("may_go", EventArgs::new()).unwrap());
/// assert!(model.call("go", EventArgs::new()).unwrap());
/// assert!(model.is("B").unwrap());
/// ```
pub struct ModelHandle<'m, M: Model, E: Engine<M> + ?Sized = Machine<M>> {
    engine: &'m E,
    id: ModelId,
    _model: PhantomData<fn() -> M>,
}

impl<'m, M: Model, E: Engine<M> + ?Sized> ModelHandle<'m, M, E> {
    pub fn new(engine: &'m E, id: ModelId) -> Self {
        Self {
            engine,
            id,
            _model: PhantomData,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn state(&self) -> Result<StateValue, MachineError> {
        self.engine.state_of(self.id)
    }

    pub fn trigger(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.engine.trigger(self.id, trigger, args)
    }

    /// Whether `state` is the active leaf.
    pub fn is(&self, state: &str) -> Result<bool, MachineError> {
        self.engine.is_state(self.id, state, false)
    }

    /// Whether `state` is active, as a leaf or as an ancestor of one.
    pub fn is_within(&self, state: &str) -> Result<bool, MachineError> {
        self.engine.is_state(self.id, state, true)
    }

    pub fn may(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.engine.may_trigger(self.id, trigger, args)
    }

    /// Fire the auto transition `to_<state>`.
    pub fn to(&self, state: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.engine.trigger(self.id, &format!("to_{state}"), args)
    }

    /// Compose a `to_` trigger one segment at a time.
    pub fn to_path(&self) -> ToPath<'_, 'm, M, E> {
        ToPath {
            handle: self,
            segments: Vec::new(),
        }
    }

    /// Resolve a convenience name and call it.
    ///
    /// Triggers (auto `to_<state>` included) fire, `is_<state>` tests the
    /// active leaf and `may_<trigger>` asks whether the trigger would
    /// succeed. A name the model type defines is never bound.
    pub fn call(&self, name: &str, args: EventArgs) -> Result<bool, MachineError> {
        if M::defines(name) {
            return Err(MachineError::Unbound {
                name: name.to_string(),
            });
        }
        let registry = self.engine.registry();
        if registry.has_trigger(name) {
            return self.trigger(name, args);
        }
        if let Some(state) = name.strip_prefix("is_") {
            if registry.get_state(state).is_ok() {
                return self.is(state);
            }
        }
        if let Some(trigger) = name.strip_prefix("may_") {
            if registry.has_trigger(trigger) {
                return self.may(trigger, args);
            }
        }
        Err(MachineError::UnknownTrigger {
            trigger: name.to_string(),
        })
    }
}

/// Builder for `to_<a><sep><b>...` triggers.
pub struct ToPath<'h, 'm, M: Model, E: Engine<M> + ?Sized> {
    handle: &'h ModelHandle<'m, M, E>,
    segments: Vec<String>,
}

impl<M: Model, E: Engine<M> + ?Sized> ToPath<'_, '_, M, E> {
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn fire(self, args: EventArgs) -> Result<bool, MachineError> {
        let registry = self.handle.engine.registry();
        let path = registry.join(&self.segments);
        self.handle.to(&path, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateSpec, TransitionSpec};
    use crate::core::{Call, EventInfo, Stateful};
    use crate::effects::Blocking;
    use crate::error::CallbackError;

    #[derive(Default)]
    struct Door {
        state: Option<StateValue>,
    }

    impl Model for Door {
        const METHODS: &'static [&'static str] = &["open"];

        fn state(&self, _attribute: &str) -> Option<StateValue> {
            self.state.clone()
        }

        fn set_state(&mut self, _attribute: &str, value: StateValue) {
            self.state = Some(value);
        }

        fn call(&mut self, _name: &str, _call: Call<'_, EventInfo>) -> Option<Result<(), CallbackError>> {
            None
        }
    }

    #[test]
    fn names_defined_by_the_model_are_unbound() {
        let machine: Machine<Door> = Machine::builder()
            .states(["closed", "opened"])
            .initial("closed")
            .transition(TransitionSpec::new("open", "closed", "opened"))
            .build()
            .unwrap();
        let handle = machine.handle(machine.add_model(Door::default()).unwrap());
        let err = handle.call("open", EventArgs::new()).unwrap_err();
        assert!(matches!(err, MachineError::Unbound { .. }));
        assert!(handle.trigger("open", EventArgs::new()).unwrap());
    }

    #[test]
    fn to_path_joins_segments() {
        type Spec = StateSpec<Blocking<Stateful>>;
        let machine: Machine<Stateful> = Machine::builder()
            .state(Spec::new("A"))
            .state(Spec::new("C").children(["x", "y"]).initial("x"))
            .initial("A")
            .build()
            .unwrap();
        let handle = machine.handle(machine.add_model(Stateful::new()).unwrap());
        assert!(handle.to_path().child("C").child("y").fire(EventArgs::new()).unwrap());
        assert_eq!(handle.state().unwrap(), StateValue::leaf("C_y"));
        assert!(handle.call("is_C_y", EventArgs::new()).unwrap());
        assert!(!handle.is("C").unwrap());
        assert!(handle.is_within("C").unwrap());
    }

    #[test]
    fn unknown_names_are_reported() {
        let machine: Machine<Stateful> = Machine::builder().states(["A"]).initial("A").build().unwrap();
        let handle = machine.handle(machine.add_model(Stateful::new()).unwrap());
        assert!(matches!(
            handle.call("is_Z", EventArgs::new()),
            Err(MachineError::UnknownTrigger { .. })
        ));
    }
}
