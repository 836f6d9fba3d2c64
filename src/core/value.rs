//! Current-state values and the active state tree.
//!
//! A model's state is either a single fully qualified leaf name or, once
//! parallel regions are involved, a nested list mirroring the active
//! parallel subtree. The [`ActiveTree`] is the ordered tree form of the
//! same information and is what the hierarchical transition algorithm
//! works on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value a model carries in its state attribute.
///
/// Serialises untagged, so `[["C.1.a","C.2.a"],"D"]` round-trips as JSON.
///
/// # Example
///
/// ```rust
/// use treestate::core::StateValue;
///
/// let value = StateValue::parallel(vec![
///     StateValue::leaf("C.1.a"),
///     StateValue::leaf("C.2.a"),
/// ]);
/// assert_eq!(value.leaves(), vec!["C.1.a", "C.2.a"]);
/// assert_eq!(serde_json::to_string(&value).unwrap(), r#"["C.1.a","C.2.a"]"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// A single fully qualified state name
    Leaf(String),
    /// Simultaneously active regions, in declaration order
    Parallel(Vec<StateValue>),
}

impl StateValue {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    pub fn parallel(values: Vec<StateValue>) -> Self {
        Self::Parallel(values)
    }

    /// All active fully qualified names in document order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf(name) => out.push(name),
            Self::Parallel(values) => {
                for value in values {
                    value.collect_leaves(out);
                }
            }
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel(_))
    }

    /// The name when the model rests in exactly one state.
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(name) => Some(name),
            Self::Parallel(_) => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(name) => write!(f, "{name}"),
            Self::Parallel(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        Self::Leaf(name.to_string())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        Self::Leaf(name)
    }
}

impl<T: Into<StateValue>> From<Vec<T>> for StateValue {
    fn from(values: Vec<T>) -> Self {
        Self::Parallel(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered tree of active states.
///
/// Each node maps a local state name to the tree of its active children,
/// preserving insertion order so that parallel regions keep their shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveTree {
    children: Vec<(String, ActiveTree)>,
}

impl ActiveTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree from a state value by splitting every leaf on `separator`.
    pub fn from_value(value: &StateValue, separator: &str) -> Self {
        let mut tree = Self::new();
        for leaf in value.leaves() {
            let mut node = &mut tree;
            for segment in leaf.split(separator) {
                node = node.entry(segment);
            }
        }
        tree
    }

    /// Collapse the tree back into a state value. Single-child levels fold
    /// into their child, so a tree with one active path yields a plain leaf.
    pub fn to_value(&self, separator: &str) -> StateValue {
        self.to_value_with_prefix(&[], separator)
    }

    fn to_value_with_prefix(&self, prefix: &[&str], separator: &str) -> StateValue {
        let mut values: Vec<StateValue> = self
            .children
            .iter()
            .map(|(name, child)| {
                let mut path = prefix.to_vec();
                path.push(name.as_str());
                if child.is_empty() {
                    StateValue::Leaf(path.join(separator))
                } else {
                    child.to_value_with_prefix(&path, separator)
                }
            })
            .collect();
        if values.len() == 1 {
            values.remove(0)
        } else {
            StateValue::Parallel(values)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, name: &str) -> Option<&ActiveTree> {
        self.children
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, child)| child)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ActiveTree> {
        self.children
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, child)| child)
    }

    /// Child names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(key, _)| key.as_str())
    }

    /// Get or insert the child `name`, appending new children at the end.
    pub fn entry(&mut self, name: &str) -> &mut ActiveTree {
        let index = match self.children.iter().position(|(key, _)| key == name) {
            Some(index) => index,
            None => {
                self.children.push((name.to_string(), ActiveTree::new()));
                self.children.len() - 1
            }
        };
        &mut self.children[index].1
    }

    /// Replace the child `name` in place, or append it if absent.
    pub fn insert(&mut self, name: &str, subtree: ActiveTree) {
        match self.child_mut(name) {
            Some(existing) => *existing = subtree,
            None => self.children.push((name.to_string(), subtree)),
        }
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Subtree at `path`, if every segment is active.
    pub fn at<S: AsRef<str>>(&self, path: &[S]) -> Option<&ActiveTree> {
        path.iter()
            .try_fold(self, |node, segment| node.child(segment.as_ref()))
    }

    pub fn at_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ActiveTree> {
        let mut node = self;
        for segment in path {
            node = node.child_mut(segment.as_ref())?;
        }
        Some(node)
    }

    /// Whether every segment of `path` is active.
    pub fn contains<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.at(path).is_some()
    }

    /// Subtree containing only the child `name`.
    pub fn only(&self, name: &str) -> ActiveTree {
        let mut narrowed = ActiveTree::new();
        if let Some(child) = self.child(name) {
            narrowed.children.push((name.to_string(), child.clone()));
        }
        narrowed
    }

    /// Relative paths of every node, deepest level first, document order
    /// within a level. This is the order in which active states are exited.
    pub fn resolve_order(&self) -> Vec<Vec<String>> {
        self.levels().into_iter().rev().flatten().collect()
    }

    /// Relative paths of every node, shallowest level first, document order
    /// within a level. This is the order in which states are entered.
    pub fn enter_order(&self) -> Vec<Vec<String>> {
        self.levels().into_iter().flatten().collect()
    }

    fn levels(&self) -> Vec<Vec<Vec<String>>> {
        let mut levels: Vec<(Vec<String>, &ActiveTree)> = vec![(Vec::new(), self)];
        let mut order = Vec::new();
        while !levels.is_empty() {
            let mut next = Vec::new();
            let mut level_paths = Vec::new();
            for (prefix, node) in levels {
                for (name, child) in &node.children {
                    let mut path = prefix.clone();
                    path.push(name.clone());
                    level_paths.push(path.clone());
                    next.push((path, child));
                }
            }
            if !level_paths.is_empty() {
                order.push(level_paths);
            }
            levels = next;
        }
        order
    }
}
