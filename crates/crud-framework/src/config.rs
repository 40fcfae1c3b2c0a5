//! # Resource Configuration
//!
//! A resource is described by a [`ResourceConfig`], built with chained setters
//! or deserialized from JSON for the declarative subset (everything except
//! closures). Shared settings live in [`FactoryDefaults`].
//!
//! [`ResourceConfig::validate`] merges the two, fills in default methods and
//! routes, and rejects invalid combinations. The result, a [`ValidatedConfig`],
//! is what the action-type registry, the reducer and the operations are built
//! from.
//!
//! ```rust
//! use crud_framework::config::{Actions, FactoryDefaults, ResourceConfig, SelectMode, VerbConfig};
//! use crud_framework::mock::MockTransport;
//! use crud_framework::transport::Method;
//!
//! let defaults = FactoryDefaults::new(MockTransport::new().shared());
//! let config = ResourceConfig::new("/api/users/")
//!     .actions(
//!         Actions::default()
//!             .get_list(true)
//!             .update(VerbConfig::enabled().method(Method::Put)),
//!     )
//!     .select(SelectMode::Single)
//!     .validate("users", &defaults)
//!     .unwrap();
//!
//! assert_eq!(config.selected_field.as_deref(), Some("selectedId"));
//! assert_eq!(config.verbs.len(), 2);
//! ```

use crate::action_types::Verb;
use crate::error::{ConfigError, TransportError};
use crate::key::{KeyCodec, ParentKey};
use crate::naming::{single_to_plural, to_upper_camel};
use crate::registry::Dispatchers;
use crate::transport::{Method, Transport};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transforms an operation's input into the request body.
pub type Prepare = Arc<dyn Fn(&Value, &RouteContext) -> Value + Send + Sync>;
/// Computes a URL from an operation's input.
pub type RouteFn = Arc<dyn Fn(&Value, &RouteContext) -> String + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&TransportError) + Send + Sync>;
/// Runs after a successful call with the response data and every resource's operations.
pub type Callback = Arc<dyn Fn(Value, Dispatchers) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`Callback`].
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(Value, Dispatchers) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |data, dispatchers| Box::pin(f(data, dispatchers)))
}

pub fn prepare<F>(f: F) -> Prepare
where
    F: Fn(&Value, &RouteContext) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn error_hook<F>(f: F) -> ErrorHook
where
    F: Fn(&TransportError) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a route function or `prepare` sees besides the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteContext {
    pub params: Map<String, Value>,
    pub parent: Option<ParentKey>,
}

/// A collection route, or a function computing the URL from the input.
#[derive(Clone)]
pub enum Route {
    Static(String),
    Dynamic(RouteFn),
}

impl Route {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Value, &RouteContext) -> String + Send + Sync + 'static,
    {
        Route::Dynamic(Arc::new(f))
    }

    pub fn render(&self, input: &Value, ctx: &RouteContext) -> String {
        match self {
            Route::Static(url) => url.clone(),
            Route::Dynamic(f) => f(input, ctx),
        }
    }

    /// The detail route: this route followed by `{id}/`.
    ///
    /// A scalar input is taken as the id itself.
    pub fn detail(&self, id_field: &str) -> Route {
        let base = self.clone();
        let field = id_field.to_owned();
        Route::dynamic(move |input, ctx| {
            let id = match input {
                Value::Object(map) => map.get(&field).map(url_segment).unwrap_or_default(),
                scalar => url_segment(scalar),
            };
            let mut url = base.render(input, ctx);
            if !url.ends_with('/') {
                url.push('/');
            }
            format!("{url}{id}/")
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Static(url) => f.debug_tuple("Static").field(url).finish(),
            Route::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Route {
    fn from(url: &str) -> Self {
        Route::Static(url.to_owned())
    }
}

impl From<String> for Route {
    fn from(url: String) -> Self {
        Route::Static(url)
    }
}

pub(crate) fn url_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Default HTTP method of a verb.
pub fn default_method(verb: Verb) -> Method {
    match verb {
        Verb::Get | Verb::GetList | Verb::GetAll => Method::Get,
        Verb::Create => Method::Post,
        Verb::Update => Method::Patch,
        Verb::Delete => Method::Delete,
    }
}

/// Per-verb switch and overrides.
#[derive(Clone, Default)]
pub struct VerbConfig {
    pub enabled: bool,
    pub method: Option<Method>,
    pub route: Option<Route>,
    pub prepare: Option<Prepare>,
    pub callback: Option<Callback>,
    pub on_error: Option<ErrorHook>,
}

impl VerbConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn route(mut self, route: impl Into<Route>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn prepare(mut self, prepare: Prepare) -> Self {
        self.prepare = Some(prepare);
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }
}

impl From<bool> for VerbConfig {
    fn from(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }
}

impl fmt::Debug for VerbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerbConfig")
            .field("enabled", &self.enabled)
            .field("method", &self.method)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    #[default]
    Off,
    Single,
    Multiple,
}

/// Which verbs a resource has. `None` means "not mentioned".
#[derive(Debug, Clone, Default)]
pub struct Actions {
    pub get: Option<VerbConfig>,
    pub get_list: Option<VerbConfig>,
    pub get_all: Option<VerbConfig>,
    pub create: Option<VerbConfig>,
    pub update: Option<VerbConfig>,
    pub delete: Option<VerbConfig>,
    pub select: Option<SelectMode>,
}

impl Actions {
    /// Every CRUD verb, plus `getAll` for nested resources.
    pub fn all(nested: bool) -> Self {
        let on = || Some(VerbConfig::enabled());
        Self {
            get: on(),
            get_list: on(),
            get_all: if nested { on() } else { None },
            create: on(),
            update: on(),
            delete: on(),
            select: None,
        }
    }

    pub fn verb(&self, verb: Verb) -> Option<&VerbConfig> {
        match verb {
            Verb::Get => self.get.as_ref(),
            Verb::GetList => self.get_list.as_ref(),
            Verb::GetAll => self.get_all.as_ref(),
            Verb::Create => self.create.as_ref(),
            Verb::Update => self.update.as_ref(),
            Verb::Delete => self.delete.as_ref(),
        }
    }

    fn slot(&mut self, verb: Verb) -> &mut Option<VerbConfig> {
        match verb {
            Verb::Get => &mut self.get,
            Verb::GetList => &mut self.get_list,
            Verb::GetAll => &mut self.get_all,
            Verb::Create => &mut self.create,
            Verb::Update => &mut self.update,
            Verb::Delete => &mut self.delete,
        }
    }

    /// Whether any verb is mentioned. Selection alone does not count.
    pub fn has_verbs(&self) -> bool {
        Verb::ALL.iter().any(|v| self.verb(*v).is_some())
    }

    pub fn with(mut self, verb: Verb, config: impl Into<VerbConfig>) -> Self {
        *self.slot(verb) = Some(config.into());
        self
    }

    pub fn get(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::Get, config)
    }

    pub fn get_list(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::GetList, config)
    }

    pub fn get_all(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::GetAll, config)
    }

    pub fn create(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::Create, config)
    }

    pub fn update(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::Update, config)
    }

    pub fn delete(self, config: impl Into<VerbConfig>) -> Self {
        self.with(Verb::Delete, config)
    }

    pub fn select(mut self, mode: SelectMode) -> Self {
        self.select = Some(mode);
        self
    }

    pub fn single_select(self) -> Self {
        self.select(SelectMode::Single)
    }

    pub fn multiple_select(self) -> Self {
        self.select(SelectMode::Multiple)
    }
}

/// A custom action. Async ones perform one request and get their own
/// `{ isLoading, error }`; sync ones only dispatch their event.
#[derive(Clone)]
pub struct IncludeAction {
    pub is_async: bool,
    pub route: Option<Route>,
    pub method: Method,
    pub prepare: Option<Prepare>,
    pub on_response: Option<Callback>,
    pub on_error: Option<ErrorHook>,
    pub initial_state: Option<Value>,
    pub params: Map<String, Value>,
}

impl IncludeAction {
    pub fn new(route: impl Into<Route>) -> Self {
        Self {
            route: Some(route.into()),
            ..Self::sync()
        }
        .with_async(true)
    }

    /// An action that only dispatches its event.
    pub fn sync() -> Self {
        Self {
            is_async: false,
            route: None,
            method: Method::Get,
            prepare: None,
            on_response: None,
            on_error: None,
            initial_state: None,
            params: Map::new(),
        }
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn prepare(mut self, prepare: Prepare) -> Self {
        self.prepare = Some(prepare);
        self
    }

    pub fn on_response(mut self, on_response: Callback) -> Self {
        self.on_response = Some(on_response);
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Custom state slices this action adds to the resource.
    pub fn initial_state(mut self, state: Value) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

impl fmt::Debug for IncludeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeAction")
            .field("is_async", &self.is_async)
            .field("route", &self.route)
            .field("method", &self.method)
            .field("initial_state", &self.initial_state)
            .finish_non_exhaustive()
    }
}

/// Settings shared by every resource of a factory.
#[derive(Clone, Default)]
pub struct FactoryDefaults {
    pub transport: Option<Arc<dyn Transport>>,
    pub on_error: Option<ErrorHook>,
    pub id: Option<String>,
    pub by_key: Option<String>,
    pub parent_id: Option<String>,
    pub parse_id_to_int: bool,
    pub parse_parent_to_int: bool,
    pub actions: Actions,
}

impl FactoryDefaults {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            ..Default::default()
        }
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn by_key(mut self, by_key: impl Into<String>) -> Self {
        self.by_key = Some(by_key.into());
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn parse_id_to_int(mut self, parse: bool) -> Self {
        self.parse_id_to_int = parse;
        self
    }

    pub fn parse_parent_to_int(mut self, parse: bool) -> Self {
        self.parse_parent_to_int = parse;
        self
    }

    pub fn actions(mut self, actions: Actions) -> Self {
        self.actions = actions;
        self
    }
}

/// Declarative description of one resource.
#[derive(Clone, Default)]
pub struct ResourceConfig {
    pub id: Option<String>,
    pub by_key: Option<String>,
    pub route: Option<Route>,
    pub actions: Actions,
    pub parent: Option<String>,
    pub parent_id: Option<String>,
    pub recursive: bool,
    pub parse_id_to_int: Option<bool>,
    pub parse_parent_to_int: Option<bool>,
    pub include_actions: BTreeMap<String, IncludeAction>,
    pub state: Map<String, Value>,
    pub transport: Option<Arc<dyn Transport>>,
    pub on_error: Option<ErrorHook>,
}

impl ResourceConfig {
    pub fn new(route: impl Into<Route>) -> Self {
        Self {
            route: Some(route.into()),
            ..Default::default()
        }
    }

    /// Parse the declarative subset of a configuration.
    ///
    /// ```rust
    /// use crud_framework::config::ResourceConfig;
    /// use serde_json::json;
    ///
    /// let config = ResourceConfig::from_json(json!({
    ///     "route": "/api/items/",
    ///     "parent": "categoryId",
    ///     "actions": { "getList": true, "create": { "method": "put" }, "select": "multiple" },
    ///     "state": { "filter": "" }
    /// }))
    /// .unwrap();
    /// assert_eq!(config.parent.as_deref(), Some("categoryId"));
    /// ```
    pub fn from_json(value: Value) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(raw.into())
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn by_key(mut self, by_key: impl Into<String>) -> Self {
        self.by_key = Some(by_key.into());
        self
    }

    pub fn route(mut self, route: impl Into<Route>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn actions(mut self, actions: Actions) -> Self {
        let select = self.actions.select.take();
        self.actions = actions;
        if self.actions.select.is_none() {
            self.actions.select = select;
        }
        self
    }

    pub fn select(mut self, mode: SelectMode) -> Self {
        self.actions.select = Some(mode);
        self
    }

    pub fn parent(mut self, field: impl Into<String>) -> Self {
        self.parent = Some(field.into());
        self
    }

    pub fn parent_id(mut self, field: impl Into<String>) -> Self {
        self.parent_id = Some(field.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn parse_id_to_int(mut self, parse: bool) -> Self {
        self.parse_id_to_int = Some(parse);
        self
    }

    pub fn parse_parent_to_int(mut self, parse: bool) -> Self {
        self.parse_parent_to_int = Some(parse);
        self
    }

    pub fn include_action(mut self, name: impl Into<String>, action: IncludeAction) -> Self {
        self.include_actions.insert(name.into(), action);
        self
    }

    /// Add a custom state slice with its initial value.
    pub fn state(mut self, name: impl Into<String>, initial: Value) -> Self {
        self.state.insert(name.into(), initial);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Merge with `defaults` and check the result.
    pub fn validate(&self, name: &str, defaults: &FactoryDefaults) -> Result<ValidatedConfig, ConfigError> {
        let id = self
            .id
            .clone()
            .or_else(|| defaults.id.clone())
            .unwrap_or_else(|| "id".to_owned());
        let by_key = self
            .by_key
            .clone()
            .or_else(|| defaults.by_key.clone())
            .unwrap_or_else(|| id.clone());

        if self.recursive && self.parent.is_none() {
            error!(resource = name, "`recursive` is only valid when `parent` is set");
            return Err(ConfigError::RecursiveWithoutParent(name.to_owned()));
        }

        let nested = self.parent.is_some();
        let mut actions = if self.actions.has_verbs() || defaults.actions.has_verbs() {
            let mut merged = defaults.actions.clone();
            for verb in Verb::ALL {
                if let Some(cfg) = self.actions.verb(verb) {
                    *merged.slot(verb) = Some(cfg.clone());
                }
            }
            merged
        } else {
            Actions::all(nested)
        };
        actions.select = self.actions.select.or(defaults.actions.select);

        let mut verbs = BTreeMap::new();
        for verb in Verb::ALL {
            if verb == Verb::GetAll && !nested {
                continue;
            }
            let Some(cfg) = actions.verb(verb).filter(|c| c.enabled) else {
                continue;
            };
            let route = match (&cfg.route, &self.route) {
                (Some(route), _) => route.clone(),
                (None, Some(base)) if verb.is_detail() => base.detail(&id),
                (None, Some(base)) => base.clone(),
                (None, None) => {
                    error!(resource = name, verb = %verb, "no route configured");
                    return Err(ConfigError::MissingRoute {
                        resource: name.to_owned(),
                        verb: verb.as_str().to_owned(),
                    });
                }
            };
            verbs.insert(
                verb,
                ResolvedVerb {
                    method: cfg.method.unwrap_or_else(|| default_method(verb)),
                    route,
                    prepare: cfg.prepare.clone(),
                    callback: cfg.callback.clone(),
                    on_error: cfg.on_error.clone(),
                },
            );
        }

        let mut state = self.state.clone();
        for (action_name, action) in &self.include_actions {
            if RESERVED_NAMES.contains(&action_name.as_str()) {
                error!(resource = name, action = %action_name, "reserved action name");
                return Err(ConfigError::ReservedActionName {
                    resource: name.to_owned(),
                    name: action_name.clone(),
                });
            }
            if action.is_async && action.route.is_none() {
                return Err(ConfigError::MissingRoute {
                    resource: name.to_owned(),
                    verb: action_name.clone(),
                });
            }
            if let Some(Value::Object(initial)) = &action.initial_state {
                for (key, value) in initial {
                    state.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }

        let transport = self.transport.clone().or_else(|| defaults.transport.clone());
        let needs_transport =
            !verbs.is_empty() || self.include_actions.values().any(|a| a.is_async);
        if needs_transport && transport.is_none() {
            error!(resource = name, "no transport injected");
            return Err(ConfigError::MissingTransport(name.to_owned()));
        }

        let select = actions.select.unwrap_or_default();
        let selected_field = match select {
            SelectMode::Off => None,
            SelectMode::Single => Some(format!("selected{}", to_upper_camel(&id))),
            SelectMode::Multiple => Some(format!("selected{}", single_to_plural(&to_upper_camel(&id)))),
        };

        let parent = self.parent.as_ref().map(|field| ParentConfig {
            field: field.clone(),
            parent_id: self
                .parent_id
                .clone()
                .or_else(|| defaults.parent_id.clone())
                .unwrap_or_else(|| "id".to_owned()),
            recursive: self.recursive,
            codec: KeyCodec::from_flag(self.parse_parent_to_int.unwrap_or(defaults.parse_parent_to_int)),
        });

        let validated = ValidatedConfig {
            name: name.to_owned(),
            id,
            by_key,
            id_codec: KeyCodec::from_flag(self.parse_id_to_int.unwrap_or(defaults.parse_id_to_int)),
            parent,
            verbs,
            select,
            selected_field,
            include_actions: self.include_actions.clone(),
            state,
            transport,
            on_error: self.on_error.clone().or_else(|| defaults.on_error.clone()),
        };
        debug!(resource = name, config = ?validated, "Validated");
        Ok(validated)
    }
}

/// Names an included action cannot take.
const RESERVED_NAMES: &[&str] = &[
    "get",
    "getList",
    "getAll",
    "create",
    "update",
    "delete",
    "set",
    "setList",
    "setAll",
    "clearList",
    "clearAll",
    "select",
    "unSelect",
    "selectAll",
    "unSelectAll",
];

/// Parent wiring of a nested resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentConfig {
    /// Field of an entity that holds its parent.
    pub field: String,
    /// Field to read when the parent value is itself an object.
    pub parent_id: String,
    pub recursive: bool,
    pub codec: KeyCodec,
}

impl ParentConfig {
    /// The bucket an entity belongs to. A missing or `null` parent is the null bucket.
    pub fn key_of(&self, entity: &Value) -> Option<ParentKey> {
        match entity.get(&self.field) {
            None | Some(Value::Null) => Some(ParentKey::null()),
            Some(Value::Object(parent)) => parent
                .get(&self.parent_id)
                .map_or(Some(ParentKey::null()), |v| self.codec.encode_parent(v)),
            Some(value) => self.codec.encode_parent(value),
        }
    }
}

/// A verb with every default filled in.
#[derive(Clone)]
pub struct ResolvedVerb {
    pub method: Method,
    pub route: Route,
    pub prepare: Option<Prepare>,
    pub callback: Option<Callback>,
    pub on_error: Option<ErrorHook>,
}

/// Output of [`ResourceConfig::validate`].
#[derive(Clone)]
pub struct ValidatedConfig {
    pub name: String,
    pub id: String,
    pub by_key: String,
    pub id_codec: KeyCodec,
    pub parent: Option<ParentConfig>,
    pub verbs: BTreeMap<Verb, ResolvedVerb>,
    pub select: SelectMode,
    /// `selectedId` or `selectedIds`, derived from the id field.
    pub selected_field: Option<String>,
    pub include_actions: BTreeMap<String, IncludeAction>,
    /// Initial value of every custom state slice.
    pub state: Map<String, Value>,
    pub transport: Option<Arc<dyn Transport>>,
    pub on_error: Option<ErrorHook>,
}

impl ValidatedConfig {
    pub fn is_nested(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_recursive(&self) -> bool {
        self.parent.as_ref().is_some_and(|p| p.recursive)
    }

    pub fn has_verb(&self, verb: Verb) -> bool {
        self.verbs.contains_key(&verb)
    }
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("by_key", &self.by_key)
            .field("parent", &self.parent)
            .field("verbs", &self.verbs.keys().collect::<Vec<_>>())
            .field("select", &self.select)
            .field("include_actions", &self.include_actions.keys().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ---- JSON form ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    id: Option<String>,
    by_key: Option<String>,
    route: Option<String>,
    #[serde(default)]
    actions: RawActions,
    parent: Option<String>,
    parent_id: Option<String>,
    #[serde(default)]
    recursive: bool,
    parse_id_to_int: Option<bool>,
    parse_parent_to_int: Option<bool>,
    #[serde(default)]
    include_actions: BTreeMap<String, RawIncludeAction>,
    #[serde(default)]
    state: Map<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawActions {
    get: Option<RawVerb>,
    get_list: Option<RawVerb>,
    get_all: Option<RawVerb>,
    create: Option<RawVerb>,
    update: Option<RawVerb>,
    delete: Option<RawVerb>,
    select: Option<RawSelect>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVerb {
    Flag(bool),
    Options {
        method: Option<Method>,
        route: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelect {
    Flag(bool),
    Mode(SelectMode),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawIncludeAction {
    #[serde(default = "default_true")]
    is_async: bool,
    route: Option<String>,
    method: Option<Method>,
    initial_state: Option<Value>,
    #[serde(default)]
    params: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl From<RawVerb> for VerbConfig {
    fn from(raw: RawVerb) -> Self {
        match raw {
            RawVerb::Flag(enabled) => VerbConfig::from(enabled),
            RawVerb::Options { method, route } => VerbConfig {
                enabled: true,
                method,
                route: route.map(Route::Static),
                ..Default::default()
            },
        }
    }
}

impl From<RawConfig> for ResourceConfig {
    fn from(raw: RawConfig) -> Self {
        let a = raw.actions;
        let actions = Actions {
            get: a.get.map(Into::into),
            get_list: a.get_list.map(Into::into),
            get_all: a.get_all.map(Into::into),
            create: a.create.map(Into::into),
            update: a.update.map(Into::into),
            delete: a.delete.map(Into::into),
            select: a.select.map(|s| match s {
                RawSelect::Flag(false) => SelectMode::Off,
                RawSelect::Flag(true) => SelectMode::Single,
                RawSelect::Mode(mode) => mode,
            }),
        };
        let include_actions = raw
            .include_actions
            .into_iter()
            .map(|(name, a)| {
                let action = IncludeAction {
                    is_async: a.is_async,
                    route: a.route.map(Route::Static),
                    method: a.method.unwrap_or(Method::Get),
                    prepare: None,
                    on_response: None,
                    on_error: None,
                    initial_state: a.initial_state,
                    params: a.params,
                };
                (name, action)
            })
            .collect();

        ResourceConfig {
            id: raw.id,
            by_key: raw.by_key,
            route: raw.route.map(Route::Static),
            actions,
            parent: raw.parent,
            parent_id: raw.parent_id,
            recursive: raw.recursive,
            parse_id_to_int: raw.parse_id_to_int,
            parse_parent_to_int: raw.parse_parent_to_int,
            include_actions,
            state: raw.state,
            transport: None,
            on_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn defaults() -> FactoryDefaults {
        FactoryDefaults::new(MockTransport::new().shared())
    }

    #[test]
    fn test_defaults_enable_every_crud_verb() {
        let flat = ResourceConfig::new("/api/users/").validate("users", &defaults()).unwrap();
        assert_eq!(
            flat.verbs.keys().copied().collect::<Vec<_>>(),
            vec![Verb::Get, Verb::GetList, Verb::Create, Verb::Update, Verb::Delete]
        );
        assert_eq!(flat.by_key, "id");
        assert_eq!(flat.select, SelectMode::Off);
        assert_eq!(flat.verbs[&Verb::Update].method, Method::Patch);

        let nested = ResourceConfig::new("/api/items/")
            .parent("categoryId")
            .validate("items", &defaults())
            .unwrap();
        assert!(nested.has_verb(Verb::GetAll));
        assert_eq!(nested.parent.as_ref().map(|p| p.parent_id.as_str()), Some("id"));
    }

    #[test]
    fn test_detail_route_appends_id() {
        let config = ResourceConfig::new("/api/users/").validate("users", &defaults()).unwrap();
        let ctx = RouteContext::default();
        let input = json!({"id": 7, "name": "x"});

        assert_eq!(config.verbs[&Verb::Get].route.render(&input, &ctx), "/api/users/7/");
        assert_eq!(config.verbs[&Verb::Delete].route.render(&json!("abc"), &ctx), "/api/users/abc/");
        assert_eq!(config.verbs[&Verb::GetList].route.render(&input, &ctx), "/api/users/");
    }

    #[test]
    fn test_invalid_combinations_are_rejected() {
        let recursive = ResourceConfig::new("/api/users/").recursive(true).validate("users", &defaults());
        assert_eq!(recursive.unwrap_err(), ConfigError::RecursiveWithoutParent("users".into()));

        let no_route = ResourceConfig::default().validate("users", &defaults());
        assert!(matches!(no_route, Err(ConfigError::MissingRoute { .. })));

        let no_transport = ResourceConfig::new("/api/users/").validate("users", &FactoryDefaults::default());
        assert_eq!(no_transport.unwrap_err(), ConfigError::MissingTransport("users".into()));

        let reserved = ResourceConfig::new("/api/users/")
            .include_action("getList", IncludeAction::new("/x/"))
            .validate("users", &defaults());
        assert!(matches!(reserved, Err(ConfigError::ReservedActionName { .. })));
    }

    #[test]
    fn test_sync_only_resource_needs_no_transport() {
        let config = ResourceConfig::default()
            .actions(Actions::default().get(false))
            .state("theme", json!("dark"))
            .validate("settings", &FactoryDefaults::default())
            .unwrap();
        assert!(config.verbs.is_empty());
        assert!(config.transport.is_none());
    }

    #[test]
    fn test_selected_field_follows_id() {
        let single = ResourceConfig::new("/api/users/")
            .id("uuid")
            .select(SelectMode::Single)
            .validate("users", &defaults())
            .unwrap();
        assert_eq!(single.selected_field.as_deref(), Some("selectedUuid"));

        let multiple = ResourceConfig::new("/api/users/")
            .select(SelectMode::Multiple)
            .validate("users", &defaults())
            .unwrap();
        assert_eq!(multiple.selected_field.as_deref(), Some("selectedIds"));
    }

    #[test]
    fn test_from_json() {
        let config = ResourceConfig::from_json(json!({
            "route": "/api/items/",
            "byKey": "slug",
            "parent": "categoryId",
            "parseParentToInt": true,
            "actions": { "getAll": true, "update": { "method": "put" }, "select": "multiple" },
            "includeActions": { "archive": { "route": "/api/items/archive/", "method": "post" } },
            "state": { "filter": "" }
        }))
        .unwrap()
        .validate("items", &defaults())
        .unwrap();

        assert_eq!(config.by_key, "slug");
        assert_eq!(config.select, SelectMode::Multiple);
        assert_eq!(config.verbs.keys().copied().collect::<Vec<_>>(), vec![Verb::GetAll, Verb::Update]);
        assert_eq!(config.verbs[&Verb::Update].method, Method::Put);
        assert_eq!(config.include_actions["archive"].method, Method::Post);
        assert!(config.include_actions["archive"].is_async);
        assert_eq!(config.parent.unwrap().codec, KeyCodec::ParseInt);

        let unknown = ResourceConfig::from_json(json!({ "rout": "/typo/" }));
        assert!(matches!(unknown, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parent_key_of_object_parent() {
        let parent = ParentConfig {
            field: "category".into(),
            parent_id: "uuid".into(),
            recursive: false,
            codec: KeyCodec::Verbatim,
        };
        assert_eq!(parent.key_of(&json!({"category": {"uuid": "A"}})), Some(ParentKey::from("A")));
        assert_eq!(parent.key_of(&json!({"category": null})), Some(ParentKey::null()));
        assert_eq!(parent.key_of(&json!({"id": 1})), Some(ParentKey::null()));
    }
}
