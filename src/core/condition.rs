//! Conditions gating transitions.
//!
//! A condition pairs a predicate reference with the value it must return
//! for the transition to proceed: `conditions` expect `true`, `unless`
//! entries expect `false`. Evaluating the predicate is the engine's job;
//! comparing the outcome with the target is pure and lives here.

use super::hooks::Hooks;
use std::fmt;

/// Predicate reference plus the result it must produce.
///
/// # Example
///
/// ```rust
/// use treestate::core::Condition;
/// use treestate::Blocking;
/// use treestate::core::Stateful;
///
/// let cond: Condition<Blocking<Stateful>> = Condition::unless("is_locked");
/// assert!(!cond.target());
/// assert!(cond.passes(false));
/// assert_eq!(cond.to_string(), "unless is_locked");
/// ```
pub struct Condition<H: Hooks> {
    predicate: H::Predicate,
    target: bool,
}

impl<H: Hooks> Clone for Condition<H> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            target: self.target,
        }
    }
}

impl<H: Hooks> Condition<H> {
    pub fn new(predicate: H::Predicate, target: bool) -> Self {
        Self { predicate, target }
    }

    /// Condition that must evaluate to `true`.
    pub fn when(predicate: impl IntoPredicate<H>) -> Self {
        Self::new(predicate.into_predicate(), true)
    }

    /// Condition that must evaluate to `false`.
    pub fn unless(predicate: impl IntoPredicate<H>) -> Self {
        Self::new(predicate.into_predicate(), false)
    }

    pub fn predicate(&self) -> &H::Predicate {
        &self.predicate
    }

    pub fn target(&self) -> bool {
        self.target
    }

    /// Whether a predicate outcome lets the transition proceed.
    pub fn passes(&self, outcome: bool) -> bool {
        outcome == self.target
    }
}

impl<H: Hooks> fmt::Display for Condition<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target {
            write!(f, "{}", self.predicate)
        } else {
            write!(f, "unless {}", self.predicate)
        }
    }
}

impl<H: Hooks> fmt::Debug for Condition<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({self})")
    }
}

/// Conversion into a predicate reference: a `&str` names a model method.
pub trait IntoPredicate<H: Hooks> {
    fn into_predicate(self) -> H::Predicate;
}

impl<H: Hooks> IntoPredicate<H> for &str {
    fn into_predicate(self) -> H::Predicate {
        H::named_predicate(self)
    }
}

impl<H: Hooks> IntoPredicate<H> for String {
    fn into_predicate(self) -> H::Predicate {
        H::named_predicate(&self)
    }
}

/// Conversion into an action reference: a `&str` names a model method.
pub trait IntoAction<H: Hooks> {
    fn into_action(self) -> H::Action;
}

impl<H: Hooks> IntoAction<H> for &str {
    fn into_action(self) -> H::Action {
        H::named_action(self)
    }
}

impl<H: Hooks> IntoAction<H> for String {
    fn into_action(self) -> H::Action {
        H::named_action(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;

    #[test]
    fn when_requires_true() {
        let cond: Condition<Plain> = Condition::when("is_ready");
        assert!(cond.passes(true));
        assert!(!cond.passes(false));
    }

    #[test]
    fn unless_requires_false() {
        let cond: Condition<Plain> = Condition::unless("is_ready");
        assert!(cond.passes(false));
        assert!(!cond.passes(true));
    }

    #[test]
    fn display_marks_negated_conditions() {
        let cond: Condition<Plain> = Condition::when("is_ready");
        assert_eq!(cond.to_string(), "is_ready");
        let cond: Condition<Plain> = Condition::unless("is_ready");
        assert_eq!(cond.to_string(), "unless is_ready");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let cond: Condition<Plain> = Condition::when("flag");
        assert_eq!(cond.passes(true), cond.passes(true));
    }
}
