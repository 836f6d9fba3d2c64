//! Callback references shared by the blocking and async engines.
//!
//! A callback is either *named* (a model method looked up when it is
//! called) or *direct* (a closure). The engines differ in what a direct
//! callback looks like, so the state tree is generic over a [`Hooks`]
//! family that fixes the concrete action and predicate types.

use super::args::EventArgs;
use std::borrow::Cow;
use std::fmt;

/// Family of callback types used by one engine flavour.
pub trait Hooks: 'static {
    /// Callbacks run for their effect
    type Action: Clone + fmt::Display + Send + Sync + 'static;
    /// Callbacks evaluated as conditions
    type Predicate: Clone + fmt::Display + Send + Sync + 'static;

    fn named_action(name: &str) -> Self::Action;

    fn named_predicate(name: &str) -> Self::Predicate;
}

/// What a callback reference points at.
#[derive(Clone)]
pub enum Target<F> {
    Named(String),
    Direct { label: String, func: F },
}

impl<F> Target<F> {
    pub fn direct(func: F) -> Self {
        Self::Direct {
            label: type_label::<F>(),
            func,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Direct { label, .. } => label,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

/// Stable human-readable rendering: `name` or `name(1, x=2)` when bound.
pub fn describe<F>(target: &Target<F>, bound: Option<&EventArgs>) -> String {
    match bound {
        Some(args) if !args.is_empty() => format!("{}({})", target.label(), args),
        _ => target.label().to_string(),
    }
}

/// Short label for a callable type: the enclosing function of a closure.
pub(crate) fn type_label<F>() -> String {
    let full = std::any::type_name::<F>();
    // Closures render as `path::to::fn::{{closure}}`; keep the enclosing fn.
    let trimmed = full.trim_end_matches("::{{closure}}");
    trimmed.rsplit("::").next().unwrap_or(trimmed).to_string()
}

/// Arguments handed to a callback.
///
/// `event()` is only populated when the machine sends the full event;
/// `args()` always holds the trigger arguments, merged with any bound
/// arguments of the callback reference.
pub struct Call<'a, E> {
    event: Option<&'a E>,
    args: Cow<'a, EventArgs>,
}

impl<'a, E> Call<'a, E> {
    pub fn new(event: Option<&'a E>, args: Cow<'a, EventArgs>) -> Self {
        Self { event, args }
    }

    /// Build the call for a callback reference, merging its bound arguments.
    pub fn prepare(event: &'a E, args: &'a EventArgs, bound: Option<&EventArgs>, send_event: bool) -> Self {
        let args = match bound {
            Some(bound) => Cow::Owned(bound.bound_with(args)),
            None => Cow::Borrowed(args),
        };
        Self {
            event: send_event.then_some(event),
            args,
        }
    }

    pub fn event(&self) -> Option<&'a E> {
        self.event
    }

    pub fn args(&self) -> &EventArgs {
        &self.args
    }

    /// Re-target the call at a different view of the event.
    pub fn map_event<T: 'a>(&self, f: impl FnOnce(&'a E) -> &'a T) -> Call<'_, T> {
        Call {
            event: self.event.map(f),
            args: Cow::Borrowed(&*self.args),
        }
    }
}

impl<E> fmt::Debug for Call<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("has_event", &self.event.is_some())
            .field("args", &*self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_bound_arguments() {
        let target: Target<()> = Target::Named("notify".into());
        let bound = EventArgs::new().arg(1).kwarg("x", 2);
        assert_eq!(describe(&target, Some(&bound)), "notify(1, x=2)");
        assert_eq!(describe(&target, None), "notify");
    }

    #[test]
    fn prepare_hides_event_unless_sent() {
        let event = 7_u8;
        let args = EventArgs::new().arg("a");
        let call = Call::prepare(&event, &args, None, false);
        assert!(call.event().is_none());
        assert_eq!(call.args().positional.len(), 1);

        let call = Call::prepare(&event, &args, None, true);
        assert_eq!(call.event(), Some(&7));
    }

    #[test]
    fn prepare_merges_bound_arguments() {
        let event = ();
        let args = EventArgs::new().arg(2);
        let bound = EventArgs::new().arg(1);
        let call = Call::prepare(&event, &args, Some(&bound), false);
        assert_eq!(call.args().positional, vec![serde_json::json!(1), serde_json::json!(2)]);
    }
}
