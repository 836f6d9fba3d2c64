//! Macros for declaring state names as enums.

/// Declare a fieldless enum whose variants name the root states of a machine.
///
/// The enum gets `name()`, `ALL`, `names()`, `Display`, and conversions into
/// `String` and [`StateValue`](crate::core::StateValue), so it can be used
/// wherever a state name is expected and compared against a model's state.
///
/// # Example
///
/// ```
/// use treestate::state_enum;
/// use treestate::core::StateValue;
///
/// state_enum! {
///     pub enum Phase {
///         Solid,
///         Liquid,
///         Gas,
///     }
/// }
///
/// assert_eq!(Phase::Liquid.name(), "Liquid");
/// assert_eq!(Phase::names(), vec!["Solid", "Liquid", "Gas"]);
/// assert_eq!(StateValue::leaf("Gas"), Phase::Gas);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|s| s.name()).collect()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl From<$name> for String {
            fn from(state: $name) -> String {
                state.name().to_string()
            }
        }

        impl From<$name> for $crate::core::StateValue {
            fn from(state: $name) -> $crate::core::StateValue {
                $crate::core::StateValue::leaf(state.name())
            }
        }

        impl PartialEq<$name> for $crate::core::StateValue {
            fn eq(&self, other: &$name) -> bool {
                self.as_leaf() == Some(other.name())
            }
        }
    };
}
