//! # Resource Reducer
//!
//! Pure state transitions. A [`ResourceReducer`] folds one [`Event`] into the
//! previous state of its resource and either returns the next state or signals
//! that the event is not one of its own, in which case the caller keeps the
//! previous value untouched.
//!
//! Flat resources use [`ResourceReducer::reduce`] directly. Nested resources
//! route each event to the bucket named by `event.parent` and only write the
//! bucket back when the sub-reducer matched, so events of other resources that
//! happen to carry the same parent key never clobber a sibling.

use crate::action_types::{ActionTypes, AsyncTarget, EventKind, Phase, Verb};
use crate::config::ValidatedConfig;
use crate::event::Event;
use crate::key::{Key, ParentKey};
use crate::naming::array_to_map;
use crate::state::{AsyncState, NestedState, ResourceState, ResourceTree};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of the flat sub-reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Not an event of this resource, or a malformed one: keep the previous state.
    Unmatched,
    Next(ResourceState),
}

/// The reducer of one resource.
#[derive(Debug, Clone)]
pub struct ResourceReducer {
    config: Arc<ValidatedConfig>,
    types: Arc<ActionTypes>,
}

impl ResourceReducer {
    pub fn new(config: Arc<ValidatedConfig>, types: Arc<ActionTypes>) -> Self {
        Self { config, types }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn types(&self) -> &ActionTypes {
        &self.types
    }

    pub fn initial(&self) -> ResourceTree {
        ResourceTree::initial(&self.config)
    }

    /// Fold `event` into the whole tree of this resource.
    ///
    /// Returns `None` when the state is unchanged. Without a previous state the
    /// initial state is produced even for foreign events.
    pub fn reduce_tree(&self, prev: Option<&ResourceTree>, event: &Event) -> Option<ResourceTree> {
        if self.config.is_nested() {
            let prev = match prev {
                Some(ResourceTree::Nested(root)) => Some(root),
                Some(ResourceTree::Flat(_)) => {
                    warn!(resource = %self.config.name, "flat state found for a nested resource, resetting");
                    None
                }
                None => None,
            };
            return match self.reduce_nested(prev, event) {
                Some(next) => Some(ResourceTree::Nested(next)),
                None if prev.is_none() => Some(self.initial()),
                None => None,
            };
        }

        let prev = match prev {
            Some(ResourceTree::Flat(state)) => Some(state),
            Some(ResourceTree::Nested(_)) => {
                warn!(resource = %self.config.name, "nested state found for a flat resource, resetting");
                None
            }
            None => None,
        };
        match self.reduce(prev, event) {
            Reduction::Next(next) => Some(ResourceTree::Flat(next)),
            Reduction::Unmatched if prev.is_none() => Some(self.initial()),
            Reduction::Unmatched => None,
        }
    }

    /// The flat sub-reducer, also applied to each bucket of a nested resource.
    pub fn reduce(&self, prev: Option<&ResourceState>, event: &Event) -> Reduction {
        let Some(kind) = self.types.kind_of(&event.action_type) else {
            return Reduction::Unmatched;
        };
        let initial;
        let prev = match prev {
            Some(prev) => prev,
            None => {
                initial = ResourceState::initial(&self.config);
                &initial
            }
        };

        match kind {
            EventKind::Lifecycle(AsyncTarget::Verb(Verb::GetAll), _) => Reduction::Unmatched,
            EventKind::Lifecycle(target, phase) => {
                let mut next = prev.clone();
                next.actions
                    .insert(target.name().to_owned(), transition(*phase, event));
                Reduction::Next(next)
            }
            EventKind::SetState(prop) => {
                let mut next = prev.clone();
                next.state
                    .insert(prop.clone(), event.payload.clone().unwrap_or(Value::Null));
                Reduction::Next(next)
            }
            EventKind::ClearState(prop) => {
                let mut next = prev.clone();
                let initial = self.config.state.get(prop).cloned().unwrap_or(Value::Null);
                next.state.insert(prop.clone(), initial);
                Reduction::Next(next)
            }
            EventKind::SetList => match &event.payload {
                Some(Value::Array(entities)) => Reduction::Next(self.set_list(prev, entities)),
                _ => self.malformed(event, "payload should be a list"),
            },
            EventKind::Set => self.set(prev, event),
            EventKind::Verb(Verb::Update) => self.update(prev, event),
            EventKind::Verb(Verb::Delete) => self.delete(prev, event),
            EventKind::Select => match event.payload.as_ref().and_then(|p| self.target_key(p)) {
                Some(key) => {
                    let mut next = prev.clone();
                    next.selection = prev.selection.select(key);
                    Reduction::Next(next)
                }
                None => self.malformed(event, "no key to select"),
            },
            EventKind::UnSelect => {
                let key = event.payload.as_ref().and_then(|p| self.target_key(p));
                if key.is_none() && matches!(event.payload, Some(Value::Object(_))) {
                    return self.malformed(event, "no key to unselect");
                }
                let mut next = prev.clone();
                next.selection = prev.selection.un_select(key.as_ref());
                Reduction::Next(next)
            }
            EventKind::SelectAll => {
                let keys: Vec<Key> = match &event.payload {
                    None | Some(Value::Null) => prev.list.iter().flat_map(|l| l.keys().cloned()).collect(),
                    Some(Value::Array(items)) => items.iter().filter_map(|i| self.target_key(i)).collect(),
                    Some(_) => return self.malformed(event, "payload should be a list"),
                };
                let mut next = prev.clone();
                next.selection = prev.selection.select_all(keys);
                Reduction::Next(next)
            }
            EventKind::UnSelectAll => {
                let keys: Option<Vec<Key>> = match &event.payload {
                    None | Some(Value::Null) => None,
                    Some(Value::Array(items)) => Some(items.iter().filter_map(|i| self.target_key(i)).collect()),
                    Some(_) => return self.malformed(event, "payload should be a list"),
                };
                let mut next = prev.clone();
                next.selection = prev.selection.un_select_all(keys);
                Reduction::Next(next)
            }
            EventKind::ClearList => Reduction::Next(ResourceState::initial(&self.config)),
            EventKind::Included(name) => {
                let mut next = prev.clone();
                if let Some(action) = next.actions.get_mut(name) {
                    *action = AsyncState::idle();
                }
                Reduction::Next(next)
            }
            EventKind::Verb(Verb::Get | Verb::GetList | Verb::GetAll | Verb::Create)
            | EventKind::SetAll
            | EventKind::ClearAll => Reduction::Unmatched,
        }
    }

    fn malformed(&self, event: &Event, reason: &str) -> Reduction {
        warn!(
            resource = %self.config.name,
            action_type = %event.action_type,
            reason,
            "Ignoring malformed event"
        );
        Reduction::Unmatched
    }

    /// Key of an entity (`byKey` field) or of a bare id.
    fn target_key(&self, value: &Value) -> Option<Key> {
        match value {
            Value::Object(entity) => entity
                .get(&self.config.by_key)
                .and_then(|v| self.config.id_codec.encode(v)),
            scalar => self.config.id_codec.encode(scalar),
        }
    }

    /// List key of the stored entity whose `id` matches the one in `value`.
    fn key_by_id(&self, prev: &ResourceState, value: &Value) -> Option<Key> {
        let id = self.field_key(value, &self.config.id)?;
        prev.list
            .as_ref()?
            .iter()
            .find(|(_, e)| self.field_key(e, &self.config.id).as_ref() == Some(&id))
            .map(|(k, _)| k.clone())
    }

    fn field_key(&self, entity: &Value, field: &str) -> Option<Key> {
        entity.get(field).and_then(|v| self.config.id_codec.encode(v))
    }

    fn set_list(&self, prev: &ResourceState, entities: &[Value]) -> ResourceState {
        let (list, rejected) = array_to_map(entities, &self.config.by_key, self.config.id_codec);
        if !rejected.is_empty() {
            warn!(
                resource = %self.config.name,
                rejected = rejected.len(),
                by_key = %self.config.by_key,
                "Entities without a key were dropped"
            );
        }
        let mut next = prev.clone();
        next.selection = prev.selection.retain(|k| list.contains_key(k));
        next.list = Some(list);
        reset(&mut next, Verb::GetList);
        next
    }

    fn set(&self, prev: &ResourceState, event: &Event) -> Reduction {
        let Some(payload) = event.payload.as_ref().filter(|p| p.is_object()) else {
            return self.malformed(event, "payload should be an entity");
        };
        let Some(key) = self.field_key(payload, &self.config.by_key) else {
            return self.malformed(event, "entity has no key");
        };
        let mut next = prev.clone();
        next.list.get_or_insert_with(BTreeMap::new).insert(key, payload.clone());
        // Shared success event of `get` and `create`.
        reset(&mut next, Verb::Get);
        reset(&mut next, Verb::Create);
        Reduction::Next(next)
    }

    fn update(&self, prev: &ResourceState, event: &Event) -> Reduction {
        let Some(payload) = event.payload.as_ref().filter(|p| p.is_object()) else {
            return self.malformed(event, "payload should be an entity");
        };
        let (Some(key), Some(id)) = (
            self.field_key(payload, &self.config.by_key),
            self.field_key(payload, &self.config.id),
        ) else {
            return self.malformed(event, "entity has no key or id");
        };

        let codec = self.config.id_codec;
        let (original_id, original_key) = match &event.meta {
            Some(meta) => (
                codec.encode(&meta.id).unwrap_or_else(|| id.clone()),
                codec.encode(&meta.key).unwrap_or_else(|| key.clone()),
            ),
            None => (id.clone(), key.clone()),
        };

        let mut next = prev.clone();
        let list = next.list.get_or_insert_with(BTreeMap::new);
        // The stored entry is found by its old key, else by its immutable id.
        let original = list.get(&original_key).cloned().or_else(|| {
            list.values()
                .find(|e| self.field_key(e, &self.config.id).as_ref() == Some(&original_id))
                .cloned()
        });
        let stale: Vec<Key> = list
            .iter()
            .filter(|(k, e)| {
                **k != key
                    && (**k == original_key || self.field_key(e, &self.config.id).as_ref() == Some(&original_id))
            })
            .map(|(k, _)| k.clone())
            .collect();
        for k in &stale {
            list.remove(k);
        }
        let merged = merge(original.as_ref(), payload);
        list.insert(key.clone(), merged);
        if stale.iter().any(|k| next.selection.contains(k)) {
            let moved = stale.iter().fold(next.selection.clone(), |sel, k| sel.un_select(Some(k)));
            next.selection = moved.select(key);
        }
        reset(&mut next, Verb::Update);
        Reduction::Next(next)
    }

    fn delete(&self, prev: &ResourceState, event: &Event) -> Reduction {
        let key = event
            .payload
            .as_ref()
            .and_then(|p| self.target_key(p).or_else(|| self.key_by_id(prev, p)));
        let Some(key) = key else {
            return self.malformed(event, "no key to delete");
        };
        let mut next = prev.clone();
        if let Some(list) = next.list.as_mut() {
            list.remove(&key);
        }
        next.selection = prev.selection.retain(|k| *k != key);
        reset(&mut next, Verb::Delete);
        Reduction::Next(next)
    }

    fn reduce_nested(&self, prev: Option<&NestedState>, event: &Event) -> Option<NestedState> {
        let kind = self.types.kind_of(&event.action_type)?;
        let initial;
        let root = match prev {
            Some(root) => root,
            None => {
                initial = NestedState::initial(&self.config);
                &initial
            }
        };

        match kind {
            EventKind::Lifecycle(AsyncTarget::Verb(Verb::GetAll), phase) => {
                let mut next = root.clone();
                next.actions
                    .insert(Verb::GetAll.as_str().to_owned(), transition(*phase, event));
                return Some(next);
            }
            EventKind::ClearAll => return Some(NestedState::initial(&self.config)),
            EventKind::SetAll => return self.set_all(root, event),
            _ => {}
        }

        let Some(parent) = &event.parent else {
            return self.reduce_root(root, kind, event);
        };

        match self.reduce(root.bucket(parent), event) {
            Reduction::Unmatched => None,
            Reduction::Next(bucket) => {
                let mut next = root.clone();
                let list = next.list.get_or_insert_with(BTreeMap::new);
                list.insert(parent.clone(), bucket);
                if self.config.is_recursive() && matches!(kind, EventKind::Set | EventKind::Verb(Verb::Update)) {
                    if let Some(own) = event.payload.as_ref().and_then(|p| self.own_bucket_key(p)) {
                        list.entry(own)
                            .or_insert_with(|| ResourceState::initial(&self.config));
                    }
                }
                Some(next)
            }
        }
    }

    /// Events without a parent on a nested resource.
    fn reduce_root(&self, root: &NestedState, kind: &EventKind, event: &Event) -> Option<NestedState> {
        let mut next = root.clone();
        match kind {
            EventKind::Lifecycle(target @ AsyncTarget::Included(_), phase) => {
                next.actions.insert(target.name().to_owned(), transition(*phase, event));
            }
            EventKind::Included(name) => {
                if let Some(action) = next.actions.get_mut(name) {
                    *action = AsyncState::idle();
                }
            }
            EventKind::SetState(prop) => {
                next.state
                    .insert(prop.clone(), event.payload.clone().unwrap_or(Value::Null));
            }
            EventKind::ClearState(prop) => {
                let initial = self.config.state.get(prop).cloned().unwrap_or(Value::Null);
                next.state.insert(prop.clone(), initial);
            }
            _ => {
                warn!(
                    resource = %self.config.name,
                    action_type = %event.action_type,
                    "Ignoring event without a parent key"
                );
                return None;
            }
        }
        Some(next)
    }

    fn set_all(&self, root: &NestedState, event: &Event) -> Option<NestedState> {
        let parent = self.config.parent.as_ref()?;
        let Some(Value::Array(entities)) = &event.payload else {
            warn!(
                resource = %self.config.name,
                action_type = %event.action_type,
                "Ignoring malformed event: payload should be a list"
            );
            return None;
        };

        let mut groups: BTreeMap<ParentKey, Vec<Value>> = BTreeMap::new();
        for entity in entities {
            match parent.key_of(entity) {
                Some(key) => groups.entry(key).or_default().push(entity.clone()),
                None => warn!(resource = %self.config.name, field = %parent.field, "Entity has an unusable parent"),
            }
        }

        let mut list = BTreeMap::new();
        for (key, group) in groups {
            let bucket = match root.bucket(&key) {
                Some(prev) => self.set_list(prev, &group),
                None => self.set_list(&ResourceState::initial(&self.config), &group),
            };
            list.insert(key, bucket);
        }
        if parent.recursive {
            for own in entities.iter().filter_map(|e| self.own_bucket_key(e)) {
                list.entry(own)
                    .or_insert_with(|| ResourceState::initial(&self.config));
            }
        }
        debug!(resource = %self.config.name, buckets = list.len(), "Partitioned by parent");

        let mut next = root.clone();
        next.list = Some(list);
        next.actions
            .insert(Verb::GetAll.as_str().to_owned(), AsyncState::idle());
        Some(next)
    }

    /// In a recursive resource an entity's children live under its own id.
    fn own_bucket_key(&self, entity: &Value) -> Option<ParentKey> {
        let parent = self.config.parent.as_ref()?;
        entity
            .get(&self.config.id)
            .and_then(|v| parent.codec.encode(v))
            .map(|k| ParentKey(Some(k)))
    }
}

fn transition(phase: Phase, event: &Event) -> AsyncState {
    match phase {
        Phase::IsLoading if event.payload == Some(Value::Bool(false)) => AsyncState::idle(),
        Phase::IsLoading => AsyncState::loading(),
        Phase::Error => event.error.clone().map_or_else(AsyncState::idle, AsyncState::failed),
        Phase::ClearError => AsyncState::idle(),
    }
}

fn reset(state: &mut ResourceState, verb: Verb) {
    if let Some(action) = state.actions.get_mut(verb.as_str()) {
        *action = AsyncState::idle();
    }
}

fn merge(base: Option<&Value>, patch: &Value) -> Value {
    match (base, patch) {
        (Some(Value::Object(base)), Value::Object(patch)) => {
            let mut merged = base.clone();
            for (k, v) in patch {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FactoryDefaults, IncludeAction, ResourceConfig, SelectMode};
    use crate::error::TransportError;
    use crate::mock::MockTransport;
    use crate::naming::map_to_array;
    use crate::state::Selection;
    use serde_json::json;

    fn reducer(config: ResourceConfig, name: &str) -> ResourceReducer {
        let defaults = FactoryDefaults::new(MockTransport::new().shared());
        let config = Arc::new(config.validate(name, &defaults).unwrap());
        let types = Arc::new(ActionTypes::new(&config).unwrap());
        ResourceReducer::new(config, types)
    }

    fn event(r: &ResourceReducer, kind: EventKind) -> Event {
        Event::new(r.types().get(&kind).unwrap().clone())
    }

    fn next(r: &ResourceReducer, prev: &ResourceState, e: Event) -> ResourceState {
        match r.reduce(Some(prev), &e) {
            Reduction::Next(state) => state,
            Reduction::Unmatched => prev.clone(),
        }
    }

    fn initial(r: &ResourceReducer) -> ResourceState {
        ResourceState::initial(r.config())
    }

    fn users() -> ResourceReducer {
        reducer(ResourceConfig::new("/api/users/").select(SelectMode::Single), "users")
    }

    #[test]
    fn test_clear_list_always_yields_initial_state() {
        let r = users();
        let mut state = initial(&r);
        state = next(&r, &state, event(&r, EventKind::SetList).payload(json!([{"id": 1}, {"id": 2}])));
        state = next(&r, &state, event(&r, EventKind::Select).payload(json!(1)));
        state = next(
            &r,
            &state,
            event(&r, EventKind::Lifecycle(Verb::Create.into(), Phase::Error))
                .error(TransportError::status(500, "boom")),
        );

        let cleared = next(&r, &state, event(&r, EventKind::ClearList));
        let cleared_twice = next(&r, &cleared, event(&r, EventKind::ClearList));
        assert_eq!(cleared, initial(&r));
        assert_eq!(cleared_twice, initial(&r));
    }

    #[test]
    fn test_set_list_round_trips() {
        let r = users();
        let entities = vec![json!({"id": 3, "name": "c"}), json!({"id": 1, "name": "a"})];
        let state = next(&r, &initial(&r), event(&r, EventKind::SetList).payload(json!(entities)));

        let mut read_back = map_to_array(state.list.as_ref().unwrap());
        read_back.sort_by_key(|e| e["id"].as_i64());
        assert_eq!(read_back, vec![json!({"id": 1, "name": "a"}), json!({"id": 3, "name": "c"})]);
        assert_eq!(state.actions["getList"], AsyncState::idle());
    }

    #[test]
    fn test_loading_and_error_are_mutually_exclusive() {
        let r = users();
        let target: AsyncTarget = Verb::GetList.into();
        let steps = vec![
            event(&r, EventKind::Lifecycle(target.clone(), Phase::IsLoading)).payload(json!(true)),
            event(&r, EventKind::Lifecycle(target.clone(), Phase::Error)).error(TransportError::Network("down".into())),
            event(&r, EventKind::Lifecycle(target.clone(), Phase::IsLoading)).payload(json!(true)),
            event(&r, EventKind::SetList).payload(json!([])),
            event(&r, EventKind::Lifecycle(target.clone(), Phase::Error)).error(TransportError::Network("down".into())),
            event(&r, EventKind::Lifecycle(target.clone(), Phase::ClearError)),
        ];

        let mut state = initial(&r);
        let mut seen_error = false;
        for step in steps {
            state = next(&r, &state, step);
            let action = &state.actions["getList"];
            assert!(!(action.is_loading && action.error.is_some()));
            seen_error |= action.error.is_some();
        }
        assert!(seen_error);
        assert_eq!(state.actions["getList"], AsyncState::idle());
    }

    #[test]
    fn test_set_list_prunes_selection() {
        let single = users();
        let mut state = next(&single, &initial(&single), event(&single, EventKind::SetList).payload(json!([{"id": 1}, {"id": 2}])));
        state = next(&single, &state, event(&single, EventKind::Select).payload(json!({"id": 1})));
        assert_eq!(state.selection, Selection::Single(Some(Key::Int(1))));
        state = next(&single, &state, event(&single, EventKind::SetList).payload(json!([{"id": 2}])));
        assert_eq!(state.selection, Selection::Single(None));

        let multi = reducer(ResourceConfig::new("/api/users/").select(SelectMode::Multiple), "users");
        let mut state = next(&multi, &initial(&multi), event(&multi, EventKind::SetList).payload(json!([{"id": 1}, {"id": 2}])));
        state = next(&multi, &state, event(&multi, EventKind::SelectAll));
        assert_eq!(state.selection.keys(), vec![Key::Int(1), Key::Int(2)]);
        state = next(&multi, &state, event(&multi, EventKind::SetList).payload(json!([{"id": 2}, {"id": 3}])));
        assert_eq!(state.selection.keys(), vec![Key::Int(2)]);
        state = next(&multi, &state, event(&multi, EventKind::Verb(Verb::Delete)).payload(json!(2)));
        assert_eq!(state.selection.keys(), Vec::<Key>::new());
    }

    #[test]
    fn test_update_migrates_changed_key() {
        let r = reducer(ResourceConfig::new("/api/pages/").by_key("slug"), "pages");
        let state = next(
            &r,
            &initial(&r),
            event(&r, EventKind::SetList).payload(json!([{"id": 1, "slug": "old", "title": "T"}])),
        );

        let state = next(
            &r,
            &state,
            event(&r, EventKind::Verb(Verb::Update))
                .payload(json!({"id": 1, "slug": "new"}))
                .meta(json!(1), json!("old")),
        );

        let list = state.list.unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.contains_key(&Key::from("old")));
        assert_eq!(list[&Key::from("new")], json!({"id": 1, "slug": "new", "title": "T"}));
    }

    #[test]
    fn test_update_without_meta_finds_entry_by_id() {
        let r = reducer(
            ResourceConfig::new("/api/pages/").by_key("slug").select(SelectMode::Multiple),
            "pages",
        );
        let mut state = next(
            &r,
            &initial(&r),
            event(&r, EventKind::SetList).payload(json!([
                {"id": 1, "slug": "old", "title": "T"},
                {"id": 2, "slug": "other", "title": "U"}
            ])),
        );
        state = next(&r, &state, event(&r, EventKind::Select).payload(json!("old")));

        let state = next(
            &r,
            &state,
            event(&r, EventKind::Verb(Verb::Update)).payload(json!({"id": 1, "slug": "new"})),
        );

        let list = state.list.as_ref().unwrap();
        assert_eq!(list.keys().cloned().collect::<Vec<_>>(), vec![Key::from("new"), Key::from("other")]);
        assert_eq!(list[&Key::from("new")]["title"], json!("T"));
        assert_eq!(state.selection.keys(), vec![Key::from("new")]);
    }

    #[test]
    fn test_delete_falls_back_to_id() {
        let r = reducer(ResourceConfig::new("/api/pages/").by_key("slug"), "pages");
        let state = next(
            &r,
            &initial(&r),
            event(&r, EventKind::SetList).payload(json!([{"id": 1, "slug": "a"}, {"id": 2, "slug": "b"}])),
        );

        let state = next(&r, &state, event(&r, EventKind::Verb(Verb::Delete)).payload(json!({"id": 2})));

        let list = state.list.unwrap();
        assert_eq!(list.keys().cloned().collect::<Vec<_>>(), vec![Key::from("a")]);
    }

    #[test]
    fn test_select_all_and_un_select_all() {
        let r = reducer(ResourceConfig::new("/api/users/").select(SelectMode::Multiple), "users");
        let mut state = next(
            &r,
            &initial(&r),
            event(&r, EventKind::SetList).payload(json!([{"id": 1}, {"id": 2}, {"id": 3}])),
        );

        state = next(&r, &state, event(&r, EventKind::SelectAll));
        assert_eq!(state.selection.keys(), vec![Key::Int(1), Key::Int(2), Key::Int(3)]);

        state = next(&r, &state, event(&r, EventKind::UnSelectAll).payload(json!([1, {"id": 3}])));
        assert_eq!(state.selection.keys(), vec![Key::Int(2)]);

        state = next(&r, &state, event(&r, EventKind::UnSelectAll));
        assert!(state.selection.keys().is_empty());

        state = next(&r, &state, event(&r, EventKind::SelectAll).payload(json!([3])));
        assert_eq!(state.selection.keys(), vec![Key::Int(3)]);
    }

    #[test]
    fn test_malformed_event_is_ignored() {
        let r = users();
        let state = next(&r, &initial(&r), event(&r, EventKind::SetList).payload(json!([{"id": 1}])));
        assert_eq!(r.reduce(Some(&state), &event(&r, EventKind::Set).payload(json!({"name": "no id"}))), Reduction::Unmatched);
        assert_eq!(r.reduce(Some(&state), &event(&r, EventKind::SetList)), Reduction::Unmatched);
        assert_eq!(r.reduce(Some(&state), &Event::new("SOMETHING_ELSE".into())), Reduction::Unmatched);
    }

    #[test]
    fn test_custom_state_set_and_clear() {
        let r = reducer(ResourceConfig::new("/api/users/").state("filter", json!("all")), "users");
        let state = next(&r, &initial(&r), event(&r, EventKind::SetState("filter".into())).payload(json!("active")));
        assert_eq!(state.state["filter"], json!("active"));
        let state = next(&r, &state, event(&r, EventKind::ClearState("filter".into())));
        assert_eq!(state.state["filter"], json!("all"));
    }

    fn tree(r: &ResourceReducer, prev: &ResourceTree, e: Event) -> ResourceTree {
        r.reduce_tree(Some(prev), &e).unwrap_or_else(|| prev.clone())
    }

    fn nested_root(t: &ResourceTree) -> &NestedState {
        match t {
            ResourceTree::Nested(root) => root,
            ResourceTree::Flat(_) => panic!("expected nested state"),
        }
    }

    #[test]
    fn test_set_all_partitions_by_parent() {
        let r = reducer(ResourceConfig::new("/api/items/").parent("categoryId"), "items");
        let state = tree(
            &r,
            &r.initial(),
            event(&r, EventKind::SetAll).payload(json!([
                {"id": 1, "categoryId": "A"},
                {"id": 2, "categoryId": "B"},
                {"id": 3, "categoryId": null}
            ])),
        );

        let root = nested_root(&state);
        assert_eq!(root.bucket(&"A".into()).unwrap().list.as_ref().unwrap().keys().collect::<Vec<_>>(), vec![&Key::Int(1)]);
        assert_eq!(root.bucket(&"B".into()).unwrap().list.as_ref().unwrap().keys().collect::<Vec<_>>(), vec![&Key::Int(2)]);
        assert!(root.bucket(&ParentKey::null()).unwrap().entity(&Key::Int(3)).is_some());
    }

    #[test]
    fn test_nested_merge_only_on_match() {
        let r = reducer(ResourceConfig::new("/api/items/").parent("categoryId"), "items");
        let state = tree(&r, &r.initial(), event(&r, EventKind::SetAll).payload(json!([{"id": 1, "categoryId": "A"}])));

        let foreign = Event::new("SET_USER".into()).payload(json!({"id": 9})).parent(Some("A".into()));
        assert_eq!(r.reduce_tree(Some(&state), &foreign), None);

        let created = tree(
            &r,
            &state,
            event(&r, EventKind::Set).payload(json!({"id": 2, "categoryId": "A"})).parent(Some("A".into())),
        );
        assert_eq!(nested_root(&created).bucket(&"A".into()).unwrap().list.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_get_all_loading_lives_at_root() {
        let r = reducer(ResourceConfig::new("/api/items/").parent("categoryId"), "items");
        let loading = tree(
            &r,
            &r.initial(),
            event(&r, EventKind::Lifecycle(Verb::GetAll.into(), Phase::IsLoading)).payload(json!(true)),
        );
        assert!(nested_root(&loading).actions["getAll"].is_loading);

        let loaded = tree(&r, &loading, event(&r, EventKind::SetAll).payload(json!([])));
        assert_eq!(nested_root(&loaded).actions["getAll"], AsyncState::idle());
        assert_eq!(tree(&r, &loaded, event(&r, EventKind::ClearAll)), r.initial());
    }

    #[test]
    fn test_recursive_resource_precreates_children() {
        let r = reducer(
            ResourceConfig::new("/api/categories/")
                .parent("parentId")
                .recursive(true)
                .include_action("archive", IncludeAction::new("/api/categories/archive/")),
            "categories",
        );
        let state = tree(
            &r,
            &r.initial(),
            event(&r, EventKind::SetAll).payload(json!([{"id": 1, "parentId": null}, {"id": 2, "parentId": 1}])),
        );
        let root = nested_root(&state);
        assert!(root.bucket(&ParentKey::from(2_i64)).unwrap().list.is_none());
        assert!(root.bucket(&ParentKey::from(1_i64)).unwrap().entity(&Key::Int(2)).is_some());

        let state = tree(
            &r,
            &state,
            event(&r, EventKind::Set).payload(json!({"id": 5, "parentId": 2})).parent(Some(2_i64.into())),
        );
        assert!(nested_root(&state).bucket(&ParentKey::from(5_i64)).is_some());

        let archiving = tree(
            &r,
            &state,
            event(&r, EventKind::Lifecycle(AsyncTarget::Included("archive".into()), Phase::IsLoading)),
        );
        assert!(nested_root(&archiving).actions["archive"].is_loading);
    }
}
