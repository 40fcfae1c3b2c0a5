//! Selectors: flatten a resource's state into the props a view reads.
//!
//! Every name comes from a [`NameTable`] built once per resource. The table
//! keeps two parallel maps, the stripped names (`get`, `list`, `selected`)
//! used inside a component dedicated to one resource, and the full names
//! (`getUser`, `usersList`, `selectedUser`) that stay unique when several
//! resources are mapped into the same props.

use crate::action_types::{AsyncTarget, Verb};
use crate::config::{SelectMode, ValidatedConfig};
use crate::error::StateError;
use crate::key::{Key, ParentKey};
use crate::state::{NestedState, ResourceState, ResourceTree, Selection, StoreState};
use crate::naming::{plural_to_single, single_to_plural, to_upper_camel};
use crate::operations::OperationKind;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat props, keyed by prop name.
pub type Props = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMode {
    Stripped,
    #[default]
    Full,
}

/// Stripped and full public names of a resource's operations and props.
#[derive(Debug, Clone)]
pub struct NameTable {
    /// Stripped name → (full name, operation).
    operations: BTreeMap<String, (String, OperationKind)>,
    list: String,
    single: String,
    selected_key: (String, String),
    selected_entity: (String, String),
}

impl NameTable {
    pub fn new(config: &ValidatedConfig) -> Self {
        let plural = to_upper_camel(&config.name);
        let single = to_upper_camel(&plural_to_single(&config.name));
        let mut operations = BTreeMap::new();
        let mut add = |stripped: &str, full: String, kind: OperationKind| {
            operations.insert(stripped.to_owned(), (full, kind));
        };

        for verb in config.verbs.keys().copied() {
            let full = match verb {
                Verb::Get => format!("get{single}"),
                Verb::GetList => format!("get{plural}List"),
                Verb::GetAll => format!("getAll{plural}"),
                Verb::Create => format!("create{single}"),
                Verb::Update => format!("update{single}"),
                Verb::Delete => format!("delete{single}"),
            };
            add(verb.as_str(), full, OperationKind::Async(AsyncTarget::Verb(verb)));
        }
        add("set", format!("set{single}"), OperationKind::Set);
        add("setList", format!("set{plural}List"), OperationKind::SetList);
        add("clearList", format!("clear{plural}List"), OperationKind::ClearList);
        if config.is_nested() {
            add("setAll", format!("setAll{plural}"), OperationKind::SetAll);
            add("clearAll", format!("clearAll{plural}"), OperationKind::ClearAll);
        }
        if config.select != SelectMode::Off {
            add("select", format!("select{single}"), OperationKind::Select);
            add("unSelect", format!("unSelect{single}"), OperationKind::UnSelect);
        }
        if config.select == SelectMode::Multiple {
            add("selectAll", format!("selectAll{plural}"), OperationKind::SelectAll);
            add("unSelectAll", format!("unSelectAll{plural}"), OperationKind::UnSelectAll);
        }
        for (name, action) in &config.include_actions {
            let kind = if action.is_async {
                OperationKind::Async(AsyncTarget::Included(name.clone()))
            } else {
                OperationKind::Included(name.clone())
            };
            add(name, name.clone(), kind);
        }
        for prop in config.state.keys() {
            let upper = to_upper_camel(prop);
            add(
                &format!("set{upper}"),
                format!("set{plural}{upper}"),
                OperationKind::SetState(prop.clone()),
            );
            add(
                &format!("clear{upper}"),
                format!("clear{plural}{upper}"),
                OperationKind::ClearState(prop.clone()),
            );
        }

        let key_name = to_upper_camel(&config.by_key);
        let (selected_key, selected_entity) = match config.select {
            SelectMode::Multiple => (
                (
                    format!("selected{}", single_to_plural(&key_name)),
                    format!("selected{single}{}", single_to_plural(&key_name)),
                ),
                ("selected".to_owned(), format!("selected{plural}")),
            ),
            _ => (
                (format!("selected{key_name}"), format!("selected{single}{key_name}")),
                ("selected".to_owned(), format!("selected{single}")),
            ),
        };

        Self {
            operations,
            list: format!("{}List", config.name),
            single: plural_to_single(&config.name),
            selected_key,
            selected_entity,
        }
    }

    /// Public name of an operation, or `None` if the resource lacks it.
    pub fn operation(&self, stripped: &str, mode: NameMode) -> Option<&str> {
        let (stripped, (full, _)) = self.operations.get_key_value(stripped)?;
        Some(match mode {
            NameMode::Stripped => stripped,
            NameMode::Full => full,
        })
    }

    /// Every operation as `(stripped, full, kind)`.
    pub fn operations(&self) -> impl Iterator<Item = (&str, &str, &OperationKind)> {
        self.operations
            .iter()
            .map(|(stripped, (full, kind))| (stripped.as_str(), full.as_str(), kind))
    }

    pub fn list(&self, mode: NameMode) -> &str {
        match mode {
            NameMode::Stripped => "list",
            NameMode::Full => &self.list,
        }
    }

    /// Prop holding the entity matching an id prop, e.g. `user`.
    pub fn single(&self) -> &str {
        &self.single
    }

    pub fn selected_key(&self, mode: NameMode) -> &str {
        pick(&self.selected_key, mode)
    }

    pub fn selected_entity(&self, mode: NameMode) -> &str {
        pick(&self.selected_entity, mode)
    }
}

fn pick(names: &(String, String), mode: NameMode) -> &str {
    match mode {
        NameMode::Stripped => &names.0,
        NameMode::Full => &names.1,
    }
}

/// Props a view passes in about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnProps {
    /// Value of the `byKey` field, selecting a single entity.
    pub id: Option<Value>,
    /// Value of the parent field. `Some(Value::Null)` addresses the null bucket.
    pub parent: Option<Value>,
    /// Anything else. Not used for mapping.
    pub extra: Map<String, Value>,
}

impl OwnProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<Value>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Split a props object into id, parent and the rest. A scalar is the id.
    pub fn from_value(props: Value, config: &ValidatedConfig) -> Self {
        match props {
            Value::Object(mut map) => {
                let id = map.remove(&config.by_key);
                let parent = config.parent.as_ref().and_then(|p| map.remove(&p.field));
                Self { id, parent, extra: map }
            }
            Value::Null => Self::default(),
            scalar => Self {
                id: Some(scalar),
                ..Self::default()
            },
        }
    }

    /// The bucket addressed by the parent prop, if the resource is nested.
    pub fn parent_key(&self, config: &ValidatedConfig) -> Option<ParentKey> {
        let parent = config.parent.as_ref()?;
        let value = self.parent.as_ref()?;
        let mut entity = Map::new();
        entity.insert(parent.field.clone(), value.clone());
        parent.key_of(&Value::Object(entity))
    }
}

/// What a view of one resource reads from the store.
#[derive(Debug, Clone, Copy)]
pub enum SubState<'s> {
    /// A flat resource, or the bucket named by the parent prop.
    Resource(&'s ResourceState),
    /// A nested resource read without a parent prop.
    Nested(&'s NestedState),
    /// The parent prop names a bucket that does not exist yet.
    Empty,
}

/// Maps store state to props for one resource.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    config: &'a ValidatedConfig,
    names: &'a NameTable,
}

impl<'a> Mapper<'a> {
    pub fn new(config: &'a ValidatedConfig, names: &'a NameTable) -> Self {
        Self { config, names }
    }

    pub fn map_sub_state<'s>(&self, state: &'s StoreState, own: &OwnProps) -> Result<SubState<'s>, StateError> {
        let tree = state.resource(&self.config.name)?;
        Ok(match tree {
            ResourceTree::Flat(resource) => SubState::Resource(resource),
            ResourceTree::Nested(root) => match own.parent_key(self.config) {
                None => SubState::Nested(root),
                Some(parent) => root.bucket(&parent).map_or(SubState::Empty, SubState::Resource),
            },
        })
    }

    pub fn map_to_props(&self, state: &StoreState, own: &OwnProps, mode: NameMode) -> Result<Props, StateError> {
        let mut props = Props::new();
        let sub = self.map_sub_state(state, own)?;
        match sub {
            SubState::Nested(root) => {
                let lists = root.list.as_ref().map_or(Value::Null, |buckets| {
                    Value::Object(
                        buckets
                            .iter()
                            .map(|(parent, bucket)| (parent.to_string(), list_value(bucket.list.as_ref())))
                            .collect(),
                    )
                });
                props.insert(self.names.list(mode).to_owned(), lists);
            }
            SubState::Resource(resource) => self.map_resource(Some(resource), own, mode, &mut props),
            SubState::Empty => self.map_resource(None, own, mode, &mut props),
        }

        if let ResourceTree::Nested(root) = state.resource(&self.config.name)? {
            if let Some(name) = self.names.operation(Verb::GetAll.as_str(), mode) {
                let status = root.actions.get(Verb::GetAll.as_str()).cloned().unwrap_or_default();
                insert_status(&mut props, name, status.is_loading, status.error.as_ref());
            }
            if matches!(sub, SubState::Nested(_)) {
                for (name, action) in &self.config.include_actions {
                    if action.is_async {
                        let status = root.actions.get(name).cloned().unwrap_or_default();
                        insert_status(&mut props, name, status.is_loading, status.error.as_ref());
                    }
                }
                for (prop, value) in &root.state {
                    props.insert(prop.clone(), value.clone());
                }
            }
        }
        Ok(props)
    }

    fn map_resource(&self, resource: Option<&ResourceState>, own: &OwnProps, mode: NameMode, props: &mut Props) {
        let async_ops = self
            .config
            .verbs
            .keys()
            .filter(|v| **v != Verb::GetAll)
            .map(|v| v.as_str())
            .chain(
                self.config
                    .include_actions
                    .iter()
                    .filter(|(_, a)| a.is_async)
                    .map(|(name, _)| name.as_str()),
            );
        for stripped in async_ops {
            let status = resource.and_then(|r| r.action(stripped)).cloned().unwrap_or_default();
            let name = self.names.operation(stripped, mode).unwrap_or(stripped);
            insert_status(props, name, status.is_loading, status.error.as_ref());
        }

        let list = resource.and_then(|r| r.list.as_ref());
        if self.config.has_verb(Verb::GetList) || self.config.is_nested() {
            props.insert(self.names.list(mode).to_owned(), list_value(list));
        }

        let lookup = |key: &Key| list.and_then(|l| l.get(key)).cloned();
        match resource.map(|r| &r.selection) {
            Some(Selection::Single(selected)) => {
                let key = selected.as_ref().map_or(Value::Null, Key::to_value);
                let entity = selected.as_ref().and_then(lookup).unwrap_or(Value::Null);
                props.insert(self.names.selected_key(mode).to_owned(), key);
                props.insert(self.names.selected_entity(mode).to_owned(), entity);
            }
            Some(Selection::Multiple(selected)) => {
                let keys = selected.iter().map(Key::to_value).collect();
                let entities = selected.iter().filter_map(lookup).collect();
                props.insert(self.names.selected_key(mode).to_owned(), Value::Array(keys));
                props.insert(self.names.selected_entity(mode).to_owned(), Value::Array(entities));
            }
            Some(Selection::None) => {}
            None => match self.config.select {
                SelectMode::Off => {}
                SelectMode::Single => {
                    props.insert(self.names.selected_key(mode).to_owned(), Value::Null);
                    props.insert(self.names.selected_entity(mode).to_owned(), Value::Null);
                }
                SelectMode::Multiple => {
                    props.insert(self.names.selected_key(mode).to_owned(), Value::Array(Vec::new()));
                    props.insert(self.names.selected_entity(mode).to_owned(), Value::Array(Vec::new()));
                }
            },
        }

        let custom = resource.map_or(&self.config.state, |r| &r.state);
        for (prop, value) in custom {
            props.insert(prop.clone(), value.clone());
        }

        if let Some(id) = &own.id {
            let entity = self
                .config
                .id_codec
                .encode(id)
                .and_then(|key| lookup(&key))
                .unwrap_or(Value::Null);
            props.insert(self.names.single().to_owned(), entity);
        }
    }
}

fn insert_status(props: &mut Props, name: &str, is_loading: bool, error: Option<&crate::error::TransportError>) {
    props.insert(format!("{name}IsLoading"), Value::Bool(is_loading));
    let error = error
        .and_then(|e| serde_json::to_value(e).ok())
        .unwrap_or(Value::Null);
    props.insert(format!("{name}Error"), error);
}

fn list_value(list: Option<&BTreeMap<Key, Value>>) -> Value {
    list.map_or(Value::Null, |list| {
        Value::Object(list.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Actions, FactoryDefaults, ResourceConfig};
    use crate::mock::MockTransport;

    fn validated(name: &str, config: ResourceConfig) -> ValidatedConfig {
        let defaults = FactoryDefaults::new(MockTransport::new().shared());
        config.validate(name, &defaults).unwrap()
    }

    #[test]
    fn test_name_table_full_and_stripped() {
        let config = validated(
            "fooCategories",
            ResourceConfig::new("/api/foo-categories/").actions(Actions::default().get(true).get_list(true).multiple_select()),
        );
        let names = NameTable::new(&config);

        assert_eq!(names.operation("get", NameMode::Full), Some("getFooCategory"));
        assert_eq!(names.operation("getList", NameMode::Full), Some("getFooCategoriesList"));
        assert_eq!(names.operation("selectAll", NameMode::Full), Some("selectAllFooCategories"));
        assert_eq!(names.operation("getList", NameMode::Stripped), Some("getList"));
        assert_eq!(names.operation("delete", NameMode::Full), None);
        assert_eq!(names.list(NameMode::Full), "fooCategoriesList");
        assert_eq!(names.selected_key(NameMode::Full), "selectedFooCategoryIds");
        assert_eq!(names.selected_entity(NameMode::Stripped), "selected");
        assert_eq!(names.single(), "fooCategory");
    }

    #[test]
    fn test_own_props_from_value() {
        let config = validated("items", ResourceConfig::new("/api/items/").parent("categoryId"));

        let own = OwnProps::from_value(serde_json::json!({"id": 3, "categoryId": "A", "color": "red"}), &config);
        assert_eq!(own.id, Some(serde_json::json!(3)));
        assert_eq!(own.parent_key(&config), Some(ParentKey::from("A")));
        assert_eq!(own.extra.len(), 1);

        let scalar = OwnProps::from_value(serde_json::json!(5), &config);
        assert_eq!(scalar.id, Some(serde_json::json!(5)));
        assert_eq!(scalar.parent_key(&config), None);
    }
}
