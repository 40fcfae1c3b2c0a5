//! # State Shape
//!
//! The state contract shared by the reducer (the only writer), the selectors
//! and the duplicate-call guard (the readers).
//!
//! ```text
//! StoreState
//! └── "users"      ResourceTree::Flat(ResourceState)
//! │     ├── list       { key -> entity } | None (never fetched)
//! │     ├── actions    { "getList" -> { isLoading, error }, ... }
//! │     ├── selection  None | Single(key?) | Multiple({keys})
//! │     └── state      { custom slice -> value }
//! └── "items"      ResourceTree::Nested(NestedState)
//!       ├── list       { parent key -> ResourceState } | None
//!       ├── actions    { "getAll" -> ..., included async actions }
//!       └── state
//! ```

use crate::action_types::Verb;
use crate::config::{SelectMode, ValidatedConfig};
use crate::error::{StateError, TransportError};
use crate::key::{Key, ParentKey};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// `{ isLoading, error }` of one async action.
///
/// The constructors are the only transitions, and none of them produces a
/// loading state that still carries an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncState {
    pub is_loading: bool,
    pub error: Option<TransportError>,
}

impl AsyncState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            is_loading: false,
            error: Some(error),
        }
    }
}

/// Selection bookkeeping. Every transition returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    #[default]
    None,
    Single(Option<Key>),
    Multiple(BTreeSet<Key>),
}

impl Selection {
    pub fn initial(mode: SelectMode) -> Self {
        match mode {
            SelectMode::Off => Selection::None,
            SelectMode::Single => Selection::Single(None),
            SelectMode::Multiple => Selection::Multiple(BTreeSet::new()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn contains(&self, key: &Key) -> bool {
        match self {
            Selection::None => false,
            Selection::Single(selected) => selected.as_ref() == Some(key),
            Selection::Multiple(set) => set.contains(key),
        }
    }

    /// Selected keys, in key order.
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Selection::None | Selection::Single(None) => Vec::new(),
            Selection::Single(Some(key)) => vec![key.clone()],
            Selection::Multiple(set) => set.iter().cloned().collect(),
        }
    }

    pub fn select(&self, key: Key) -> Self {
        match self {
            Selection::None => Selection::None,
            Selection::Single(_) => Selection::Single(Some(key)),
            Selection::Multiple(set) => {
                let mut next = set.clone();
                next.insert(key);
                Selection::Multiple(next)
            }
        }
    }

    /// Single mode clears whatever is selected; multiple mode removes `key`.
    pub fn un_select(&self, key: Option<&Key>) -> Self {
        match (self, key) {
            (Selection::None, _) => Selection::None,
            (Selection::Single(_), _) => Selection::Single(None),
            (Selection::Multiple(set), Some(key)) => {
                let mut next = set.clone();
                next.remove(key);
                Selection::Multiple(next)
            }
            (Selection::Multiple(set), None) => Selection::Multiple(set.clone()),
        }
    }

    pub fn select_all(&self, keys: impl IntoIterator<Item = Key>) -> Self {
        match self {
            Selection::Multiple(set) => {
                let mut next = set.clone();
                next.extend(keys);
                Selection::Multiple(next)
            }
            other => other.clone(),
        }
    }

    pub fn un_select_all(&self, keys: Option<Vec<Key>>) -> Self {
        match (self, keys) {
            (Selection::Multiple(_), None) => Selection::Multiple(BTreeSet::new()),
            (Selection::Multiple(set), Some(keys)) => {
                let mut next = set.clone();
                for key in &keys {
                    next.remove(key);
                }
                Selection::Multiple(next)
            }
            (other, _) => other.clone(),
        }
    }

    /// Drop every selected key for which `keep` is false.
    pub fn retain(&self, keep: impl Fn(&Key) -> bool) -> Self {
        match self {
            Selection::None => Selection::None,
            Selection::Single(Some(key)) if !keep(key) => Selection::Single(None),
            Selection::Single(selected) => Selection::Single(selected.clone()),
            Selection::Multiple(set) => {
                Selection::Multiple(set.iter().filter(|k| keep(k)).cloned().collect())
            }
        }
    }
}

/// State of a flat resource, or of one bucket of a nested resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState {
    pub list: Option<BTreeMap<Key, Value>>,
    pub actions: BTreeMap<String, AsyncState>,
    #[serde(skip_serializing_if = "Selection::is_none")]
    pub selection: Selection,
    pub state: Map<String, Value>,
}

impl ResourceState {
    pub fn initial(config: &ValidatedConfig) -> Self {
        let mut actions = BTreeMap::new();
        actions.insert(Verb::GetList.as_str().to_owned(), AsyncState::idle());
        for verb in config.verbs.keys().filter(|v| **v != Verb::GetAll) {
            actions.insert(verb.as_str().to_owned(), AsyncState::idle());
        }
        insert_included(config, &mut actions);

        Self {
            list: None,
            actions,
            selection: Selection::initial(config.select),
            state: config.state.clone(),
        }
    }

    pub fn action(&self, name: &str) -> Option<&AsyncState> {
        self.actions.get(name)
    }

    pub fn entity(&self, key: &Key) -> Option<&Value> {
        self.list.as_ref().and_then(|list| list.get(key))
    }
}

/// Root of a nested resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedState {
    pub list: Option<BTreeMap<ParentKey, ResourceState>>,
    pub actions: BTreeMap<String, AsyncState>,
    pub state: Map<String, Value>,
}

impl NestedState {
    pub fn initial(config: &ValidatedConfig) -> Self {
        let mut actions = BTreeMap::new();
        actions.insert(Verb::GetAll.as_str().to_owned(), AsyncState::idle());
        insert_included(config, &mut actions);

        Self {
            list: None,
            actions,
            state: config.state.clone(),
        }
    }

    pub fn bucket(&self, parent: &ParentKey) -> Option<&ResourceState> {
        self.list.as_ref().and_then(|list| list.get(parent))
    }
}

fn insert_included(config: &ValidatedConfig, actions: &mut BTreeMap<String, AsyncState>) {
    for (name, action) in &config.include_actions {
        if action.is_async {
            actions.insert(name.clone(), AsyncState::idle());
        }
    }
}

/// The state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceTree {
    Flat(ResourceState),
    Nested(NestedState),
}

impl ResourceTree {
    pub fn initial(config: &ValidatedConfig) -> Self {
        if config.is_nested() {
            ResourceTree::Nested(NestedState::initial(config))
        } else {
            ResourceTree::Flat(ResourceState::initial(config))
        }
    }

    /// The bookkeeping of `action`.
    ///
    /// On a nested resource `getAll` and calls without a parent are tracked at
    /// the root, everything else in the parent's bucket.
    pub fn action(&self, action: &str, parent: Option<&ParentKey>) -> Option<&AsyncState> {
        match (self, parent) {
            (ResourceTree::Flat(state), _) => state.action(action),
            (ResourceTree::Nested(root), None) => root.actions.get(action),
            (ResourceTree::Nested(root), Some(_)) if action == Verb::GetAll.as_str() => {
                root.actions.get(action)
            }
            (ResourceTree::Nested(root), Some(parent)) => {
                root.bucket(parent).and_then(|b| b.action(action))
            }
        }
    }

    /// The flat state, or the bucket of `parent`.
    pub fn sub_state(&self, parent: Option<&ParentKey>) -> Option<&ResourceState> {
        match (self, parent) {
            (ResourceTree::Flat(state), _) => Some(state),
            (ResourceTree::Nested(root), Some(parent)) => root.bucket(parent),
            (ResourceTree::Nested(_), None) => None,
        }
    }

    /// Custom state: the bucket's when a parent is given, the root's otherwise.
    pub fn custom_state(&self, parent: Option<&ParentKey>) -> Option<&Map<String, Value>> {
        match (self, parent) {
            (ResourceTree::Flat(state), _) => Some(&state.state),
            (ResourceTree::Nested(root), None) => Some(&root.state),
            (ResourceTree::Nested(root), Some(parent)) => root.bucket(parent).map(|b| &b.state),
        }
    }
}

/// Every registered resource, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StoreState {
    pub resources: BTreeMap<String, ResourceTree>,
}

impl StoreState {
    pub fn resource(&self, name: &str) -> Result<&ResourceTree, StateError> {
        self.resources
            .get(name)
            .ok_or_else(|| StateError::Unregistered(name.to_owned()))
    }

    /// Whether `action` is in flight. A bucket that does not exist yet is idle.
    pub fn is_loading(
        &self,
        resource: &str,
        action: &str,
        parent: Option<&ParentKey>,
    ) -> Result<bool, StateError> {
        Ok(self
            .resource(resource)?
            .action(action, parent)
            .is_some_and(|a| a.is_loading))
    }

    pub fn error(
        &self,
        resource: &str,
        action: &str,
        parent: Option<&ParentKey>,
    ) -> Result<Option<&TransportError>, StateError> {
        Ok(self
            .resource(resource)?
            .action(action, parent)
            .and_then(|a| a.error.as_ref()))
    }

    /// The list of a flat resource or of one bucket.
    pub fn list(
        &self,
        resource: &str,
        parent: Option<&ParentKey>,
    ) -> Result<Option<&BTreeMap<Key, Value>>, StateError> {
        Ok(self
            .resource(resource)?
            .sub_state(parent)
            .and_then(|s| s.list.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_transitions_return_new_values() {
        let empty = Selection::initial(SelectMode::Multiple);
        let one = empty.select(Key::Int(1));
        let two = one.select(Key::Int(2));

        assert_eq!(empty.keys(), Vec::<Key>::new());
        assert_eq!(one.keys(), vec![Key::Int(1)]);
        assert_eq!(two.keys(), vec![Key::Int(1), Key::Int(2)]);

        let pruned = two.retain(|k| *k != Key::Int(1));
        assert_eq!(pruned.keys(), vec![Key::Int(2)]);
        assert_eq!(two.un_select_all(None).keys(), Vec::<Key>::new());
        assert!(two.contains(&Key::Int(1)));
    }

    #[test]
    fn test_single_selection() {
        let selected = Selection::initial(SelectMode::Single).select(Key::from("a"));
        assert!(selected.contains(&Key::from("a")));
        assert_eq!(selected.retain(|_| false), Selection::Single(None));
        assert_eq!(selected.un_select(None), Selection::Single(None));
        assert_eq!(Selection::None.select(Key::Int(1)), Selection::None);
    }
}
