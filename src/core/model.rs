//! The model capability contract.
//!
//! Models are ordinary values moved into a machine. The machine reads and
//! writes their state through [`Model::state`] / [`Model::set_state`] and
//! resolves named callbacks against the model at call time.

use super::args::EventInfo;
use super::hooks::Call;
use super::value::StateValue;
use crate::error::CallbackError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Handle identifying a model registered with a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(Uuid);

impl ModelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability trait for objects whose state a machine manages.
///
/// `METHODS` lists the names the model type already defines. The machine
/// never shadows them with convenience bindings, and picks up
/// `on_enter_<state>` / `on_exit_<state>` entries as state callbacks.
///
/// # Example
///
/// ```rust
/// use treestate::core::{Call, EventInfo, Model, StateValue};
/// use treestate::CallbackError;
///
/// #[derive(Default)]
/// struct Door {
///     state: Option<StateValue>,
///     slams: u32,
/// }
///
/// impl Model for Door {
///     const METHODS: &'static [&'static str] = &["slam"];
///
///     fn state(&self, _attribute: &str) -> Option<StateValue> {
///         self.state.clone()
///     }
///
///     fn set_state(&mut self, _attribute: &str, value: StateValue) {
///         self.state = Some(value);
///     }
///
///     fn call(&mut self, name: &str, _call: Call<'_, EventInfo>) -> Option<Result<(), CallbackError>> {
///         match name {
///             "slam" => {
///                 self.slams += 1;
///                 Some(Ok(()))
///             }
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Model: Send + 'static {
    const METHODS: &'static [&'static str] = &[];

    /// Current value of the state attribute named `attribute`.
    fn state(&self, attribute: &str) -> Option<StateValue>;

    fn set_state(&mut self, attribute: &str, value: StateValue);

    /// Invoke the named method. `None` when the model has no such method.
    fn call(&mut self, _name: &str, _call: Call<'_, EventInfo>) -> Option<Result<(), CallbackError>> {
        None
    }

    /// Evaluate the named predicate. `None` when the model has no such method.
    fn check(&mut self, _name: &str, _call: Call<'_, EventInfo>) -> Option<Result<bool, CallbackError>> {
        None
    }

    /// Whether the model type defines `name`.
    fn defines(name: &str) -> bool {
        Self::METHODS.contains(&name)
    }
}

/// Minimal model that only stores state values, keyed by attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stateful {
    values: BTreeMap<String, StateValue>,
}

impl Stateful {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for Stateful {
    fn state(&self, attribute: &str) -> Option<StateValue> {
        self.values.get(attribute).cloned()
    }

    fn set_state(&mut self, attribute: &str, value: StateValue) {
        self.values.insert(attribute.to_string(), value);
    }
}
