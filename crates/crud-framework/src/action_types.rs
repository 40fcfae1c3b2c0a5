//! # Action-Type Registry
//!
//! Every event the reducer understands has a kind ([`EventKind`]) and a
//! globally unique string ([`ActionType`]). The table is built once per
//! resource from its validated configuration and then shared, by `Arc`, between
//! the operations that dispatch events and the reducer that folds them. The two
//! sides therefore agree on every type string by construction.
//!
//! Strings follow `VERB_RESOURCE[_SUFFIX]` in upper snake case:
//!
//! | Kind | `users` |
//! |------|---------|
//! | `get` | `GET_USER` |
//! | `getList` | `GET_USERS_LIST` |
//! | `getList` loading | `GET_USERS_LIST_IS_LOADING` |
//! | `create` error | `CREATE_USER_ERROR` |
//! | `set` | `SET_USER` |
//! | `selectAll` | `SELECT_ALL_USERS` |
//! | included `archive` | `ARCHIVE_USERS` |
//! | state `filter` | `SET_USERS_FILTER` / `CLEAR_USERS_FILTER` |

use crate::config::{SelectMode, ValidatedConfig};
use crate::error::ConfigError;
use crate::naming::{camel_to_snake, plural_to_single};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The built-in async CRUD verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verb {
    Get,
    GetList,
    GetAll,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::GetList,
        Verb::GetAll,
        Verb::Create,
        Verb::Update,
        Verb::Delete,
    ];

    /// Name of the verb as used in `actions` and in props.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::GetList => "getList",
            Verb::GetAll => "getAll",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|v| v.as_str() == name)
    }

    /// Verbs that address one entity use the detail route.
    pub fn is_detail(self) -> bool {
        matches!(self, Verb::Get | Verb::Update | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three bookkeeping phases of an async action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    IsLoading,
    Error,
    ClearError,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::IsLoading, Phase::Error, Phase::ClearError];

    fn suffix(self) -> &'static str {
        match self {
            Phase::IsLoading => "_IS_LOADING",
            Phase::Error => "_ERROR",
            Phase::ClearError => "_CLEAR_ERROR",
        }
    }
}

/// Something that has `{ isLoading, error }` bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AsyncTarget {
    Verb(Verb),
    Included(String),
}

impl AsyncTarget {
    pub fn name(&self) -> &str {
        match self {
            AsyncTarget::Verb(v) => v.as_str(),
            AsyncTarget::Included(name) => name,
        }
    }

    /// Resolve an action name (`"getList"`, `"archive"`) to a target.
    pub fn from_name(name: &str) -> AsyncTarget {
        Verb::from_name(name).map_or_else(|| AsyncTarget::Included(name.to_owned()), AsyncTarget::Verb)
    }
}

impl From<Verb> for AsyncTarget {
    fn from(v: Verb) -> Self {
        AsyncTarget::Verb(v)
    }
}

/// Every kind of event a resource reducer can receive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Base type of a verb. `update` and `delete` are also their success events.
    Verb(Verb),
    Lifecycle(AsyncTarget, Phase),
    Set,
    SetList,
    ClearList,
    Select,
    UnSelect,
    SelectAll,
    UnSelectAll,
    SetAll,
    ClearAll,
    /// Base type of an included action, also its success event.
    Included(String),
    SetState(String),
    ClearState(String),
}

/// A dispatched type string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        ActionType(s.to_owned())
    }
}

/// The action types of one resource, with reverse lookup.
#[derive(Debug, Clone)]
pub struct ActionTypes {
    resource: String,
    by_kind: BTreeMap<EventKind, ActionType>,
    by_type: HashMap<ActionType, EventKind>,
}

impl ActionTypes {
    /// Build the table for `config`. Fails if two kinds would share a string.
    pub fn new(config: &ValidatedConfig) -> Result<Self, ConfigError> {
        let plural = camel_to_snake(&config.name);
        let single = plural_to_single(&plural);

        let mut kinds: Vec<(EventKind, String)> = vec![
            (EventKind::Set, format!("SET_{single}")),
            (EventKind::SetList, format!("SET_{plural}_LIST")),
            (EventKind::ClearList, format!("CLEAR_{plural}_LIST")),
        ];

        for verb in config.verbs.keys().copied() {
            let base = match verb {
                Verb::Get => format!("GET_{single}"),
                Verb::GetList => format!("GET_{plural}_LIST"),
                Verb::GetAll => format!("GET_ALL_{plural}"),
                Verb::Create => format!("CREATE_{single}"),
                Verb::Update => format!("UPDATE_{single}"),
                Verb::Delete => format!("DELETE_{single}"),
            };
            for phase in Phase::ALL {
                kinds.push((
                    EventKind::Lifecycle(AsyncTarget::Verb(verb), phase),
                    format!("{base}{}", phase.suffix()),
                ));
            }
            kinds.push((EventKind::Verb(verb), base));
        }

        match config.select {
            SelectMode::Off => {}
            SelectMode::Single => {
                kinds.push((EventKind::Select, format!("SELECT_{single}")));
                kinds.push((EventKind::UnSelect, format!("UN_SELECT_{single}")));
            }
            SelectMode::Multiple => {
                kinds.push((EventKind::Select, format!("SELECT_{single}")));
                kinds.push((EventKind::UnSelect, format!("UN_SELECT_{single}")));
                kinds.push((EventKind::SelectAll, format!("SELECT_ALL_{plural}")));
                kinds.push((EventKind::UnSelectAll, format!("UN_SELECT_ALL_{plural}")));
            }
        }

        if config.parent.is_some() {
            kinds.push((EventKind::SetAll, format!("SET_ALL_{plural}")));
            kinds.push((EventKind::ClearAll, format!("CLEAR_ALL_{plural}")));
        }

        for (name, action) in &config.include_actions {
            let base = format!("{}_{plural}", camel_to_snake(name));
            if action.is_async {
                for phase in Phase::ALL {
                    kinds.push((
                        EventKind::Lifecycle(AsyncTarget::Included(name.clone()), phase),
                        format!("{base}{}", phase.suffix()),
                    ));
                }
            }
            kinds.push((EventKind::Included(name.clone()), base));
        }

        for prop in config.state.keys() {
            let upper = camel_to_snake(prop);
            kinds.push((EventKind::SetState(prop.clone()), format!("SET_{plural}_{upper}")));
            kinds.push((EventKind::ClearState(prop.clone()), format!("CLEAR_{plural}_{upper}")));
        }

        let mut by_kind = BTreeMap::new();
        let mut by_type = HashMap::new();
        for (kind, name) in kinds {
            let action_type = ActionType(name);
            if by_type.insert(action_type.clone(), kind.clone()).is_some() {
                return Err(ConfigError::DuplicateActionType(action_type.0));
            }
            by_kind.insert(kind, action_type);
        }

        Ok(Self {
            resource: config.name.clone(),
            by_kind,
            by_type,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn get(&self, kind: &EventKind) -> Option<&ActionType> {
        self.by_kind.get(kind)
    }

    /// Like [`get`](Self::get) but reports a disabled operation.
    pub fn require(&self, kind: &EventKind) -> Result<&ActionType, ConfigError> {
        self.by_kind.get(kind).ok_or_else(|| ConfigError::OperationDisabled {
            resource: self.resource.clone(),
            operation: describe(kind),
        })
    }

    pub fn kind_of(&self, action_type: &ActionType) -> Option<&EventKind> {
        self.by_type.get(action_type)
    }

    pub fn lifecycle(&self, target: &AsyncTarget, phase: Phase) -> Option<&ActionType> {
        self.by_kind.get(&EventKind::Lifecycle(target.clone(), phase))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKind, &ActionType)> {
        self.by_kind.iter()
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

fn describe(kind: &EventKind) -> String {
    match kind {
        EventKind::Verb(v) => v.as_str().to_owned(),
        EventKind::Lifecycle(target, _) => target.name().to_owned(),
        EventKind::Set => "set".into(),
        EventKind::SetList => "setList".into(),
        EventKind::ClearList => "clearList".into(),
        EventKind::Select => "select".into(),
        EventKind::UnSelect => "unSelect".into(),
        EventKind::SelectAll => "selectAll".into(),
        EventKind::UnSelectAll => "unSelectAll".into(),
        EventKind::SetAll => "setAll".into(),
        EventKind::ClearAll => "clearAll".into(),
        EventKind::Included(name) => name.clone(),
        EventKind::SetState(prop) | EventKind::ClearState(prop) => format!("state `{prop}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Actions, FactoryDefaults, IncludeAction, ResourceConfig, VerbConfig};
    use crate::mock::MockTransport;
    use serde_json::json;

    fn defaults() -> FactoryDefaults {
        FactoryDefaults::new(MockTransport::new().shared())
    }

    #[test]
    fn test_flat_resource_types() {
        let config = ResourceConfig::new("/api/users/")
            .actions(Actions::default().get_list(VerbConfig::enabled()).create(VerbConfig::enabled()).single_select())
            .state("filter", json!(""))
            .validate("users", &defaults())
            .unwrap();
        let types = ActionTypes::new(&config).unwrap();

        let lookup = |kind: EventKind| types.get(&kind).map(|t| t.as_str().to_owned());
        assert_eq!(lookup(EventKind::Verb(Verb::GetList)).as_deref(), Some("GET_USERS_LIST"));
        assert_eq!(
            lookup(EventKind::Lifecycle(Verb::GetList.into(), Phase::IsLoading)).as_deref(),
            Some("GET_USERS_LIST_IS_LOADING")
        );
        assert_eq!(
            lookup(EventKind::Lifecycle(Verb::Create.into(), Phase::ClearError)).as_deref(),
            Some("CREATE_USER_CLEAR_ERROR")
        );
        assert_eq!(lookup(EventKind::Set).as_deref(), Some("SET_USER"));
        assert_eq!(lookup(EventKind::UnSelect).as_deref(), Some("UN_SELECT_USER"));
        assert_eq!(lookup(EventKind::SetState("filter".into())).as_deref(), Some("SET_USERS_FILTER"));
        // Disabled or irrelevant kinds have no type.
        assert_eq!(lookup(EventKind::Verb(Verb::Delete)), None);
        assert_eq!(lookup(EventKind::SelectAll), None);
        assert_eq!(lookup(EventKind::SetAll), None);

        let kind = types.kind_of(&ActionType::from("SET_USERS_LIST")).cloned();
        assert_eq!(kind, Some(EventKind::SetList));
        assert!(types.require(&EventKind::Verb(Verb::Update)).is_err());
    }

    #[test]
    fn test_nested_resource_types() {
        let config = ResourceConfig::new("/api/categories/")
            .parent("parentId")
            .recursive(true)
            .include_action("archive", IncludeAction::new("/api/categories/archive/"))
            .select(SelectMode::Multiple)
            .validate("fooCategories", &defaults())
            .unwrap();
        let types = ActionTypes::new(&config).unwrap();

        let lookup = |kind: EventKind| types.get(&kind).map(|t| t.as_str().to_owned());
        assert_eq!(lookup(EventKind::Verb(Verb::GetAll)).as_deref(), Some("GET_ALL_FOO_CATEGORIES"));
        assert_eq!(lookup(EventKind::SetAll).as_deref(), Some("SET_ALL_FOO_CATEGORIES"));
        assert_eq!(lookup(EventKind::Verb(Verb::Create)).as_deref(), Some("CREATE_FOO_CATEGORY"));
        assert_eq!(lookup(EventKind::SelectAll).as_deref(), Some("SELECT_ALL_FOO_CATEGORIES"));
        assert_eq!(
            lookup(EventKind::Lifecycle(AsyncTarget::Included("archive".into()), Phase::Error)).as_deref(),
            Some("ARCHIVE_FOO_CATEGORIES_ERROR")
        );
    }

    #[test]
    fn test_every_string_is_unique() {
        let config = ResourceConfig::new("/api/items/")
            .parent("categoryId")
            .select(SelectMode::Multiple)
            .include_action("archive", IncludeAction::new("/api/items/archive/"))
            .state("filter", json!(null))
            .validate("items", &defaults())
            .unwrap();
        let types = ActionTypes::new(&config).unwrap();

        let distinct: std::collections::HashSet<_> = types.iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(distinct.len(), types.len());
        // 3 always-present + 6 verbs * 4 + 4 selection + 2 parent + 4 include + 2 state
        assert_eq!(types.len(), 3 + 24 + 4 + 2 + 4 + 2);
    }
}
