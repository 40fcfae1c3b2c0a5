//! # Operations
//!
//! The action creators of one resource. [`ResourceOperations`] is the pure,
//! per-resource definition built in the first phase of composition; the
//! methods that actually run live on [`ResourceHandle`], which pairs the
//! definition with the [`Dispatchers`] registry built in the second phase.
//!
//! Every async verb follows the same sequence:
//!
//! 1. **Guard**: if `actions[verb].isLoading` is already set, return
//!    [`Outcome::Skipped`]. The check and the `IsLoading` dispatch happen in
//!    one turn of the store actor.
//! 2. **Call**: one request through the injected transport.
//! 3. **Success**: dispatch the terminal event, then run the configured
//!    callback and the caller's callback.
//! 4. **Failure**: dispatch the `Error` event and run the global, per-verb and
//!    caller error hooks, in that order. The failure is returned as
//!    [`Outcome::Failed`], never as an `Err`.
//!
//! Sync verbs dispatch a single event.

use crate::action_types::{ActionTypes, AsyncTarget, EventKind, Phase, Verb};
use crate::config::{
    Callback, ErrorHook, Prepare, Route, RouteContext, SelectMode, ValidatedConfig,
};
use crate::error::{ConfigError, OperationError, TransportError};
use crate::event::Event;
use crate::key::ParentKey;
use crate::registry::Dispatchers;
use crate::selectors::NameTable;
use crate::store::{Guard, StoreClient};
use crate::transport::{Method, Request};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-call options of an async operation.
#[derive(Clone, Default)]
pub struct OperationOptions {
    /// Query parameters, also visible to route functions and `prepare`.
    pub params: Map<String, Value>,
    /// Explicit parent bucket, for inputs that do not carry their parent.
    pub parent: Option<ParentKey>,
    /// The entity as it was before an update.
    pub original: Option<Value>,
    pub callback: Option<Callback>,
    pub on_error: Option<ErrorHook>,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn parent(mut self, parent: ParentKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn original(mut self, original: Value) -> Self {
        self.original = Some(original);
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

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("params", &self.params)
            .field("parent", &self.parent)
            .field("original", &self.original)
            .finish_non_exhaustive()
    }
}

/// What an operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The same action was already in flight.
    Skipped,
    Succeeded(Value),
    /// The transport failed; the error is also stored in state.
    Failed(TransportError),
    /// A sync action dispatched its event.
    Dispatched,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_) | Outcome::Dispatched)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Succeeded(data) => Some(data),
            _ => None,
        }
    }
}

/// Every operation a resource can expose, for dispatch by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    /// A verb or included action that performs a request.
    Async(AsyncTarget),
    Set,
    SetList,
    ClearList,
    SetAll,
    ClearAll,
    Select,
    UnSelect,
    SelectAll,
    UnSelectAll,
    SetState(String),
    ClearState(String),
    /// A sync included action.
    Included(String),
}

impl OperationKind {
    pub fn async_target(&self) -> Option<&AsyncTarget> {
        match self {
            OperationKind::Async(target) => Some(target),
            _ => None,
        }
    }
}

/// Phase-one definition of a resource's operations.
#[derive(Debug)]
pub struct ResourceOperations {
    config: Arc<ValidatedConfig>,
    types: Arc<ActionTypes>,
    names: NameTable,
}

impl ResourceOperations {
    pub fn new(config: Arc<ValidatedConfig>, types: Arc<ActionTypes>) -> Self {
        let names = NameTable::new(&config);
        Self {
            config,
            types,
            names,
        }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn types(&self) -> &ActionTypes {
        &self.types
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    fn disabled(&self, operation: &str) -> ConfigError {
        ConfigError::OperationDisabled {
            resource: self.config.name.clone(),
            operation: operation.to_owned(),
        }
    }

    fn request_plan(&self, target: &AsyncTarget) -> Result<RequestPlan, ConfigError> {
        match target {
            AsyncTarget::Verb(verb) => {
                let resolved = self
                    .config
                    .verbs
                    .get(verb)
                    .ok_or_else(|| self.disabled(verb.as_str()))?;
                Ok(RequestPlan {
                    method: resolved.method,
                    route: resolved.route.clone(),
                    prepare: resolved.prepare.clone(),
                    callback: resolved.callback.clone(),
                    on_error: resolved.on_error.clone(),
                    on_response: None,
                    params: Map::new(),
                })
            }
            AsyncTarget::Included(name) => {
                let action = self
                    .config
                    .include_actions
                    .get(name)
                    .filter(|a| a.is_async)
                    .ok_or_else(|| self.disabled(name))?;
                let route = action.route.clone().ok_or_else(|| ConfigError::MissingRoute {
                    resource: self.config.name.clone(),
                    verb: name.clone(),
                })?;
                Ok(RequestPlan {
                    method: action.method,
                    route,
                    prepare: action.prepare.clone(),
                    callback: None,
                    on_error: action.on_error.clone(),
                    on_response: action.on_response.clone(),
                    params: action.params.clone(),
                })
            }
        }
    }
}

struct RequestPlan {
    method: Method,
    route: Route,
    prepare: Option<Prepare>,
    callback: Option<Callback>,
    on_error: Option<ErrorHook>,
    on_response: Option<Callback>,
    params: Map<String, Value>,
}

/// A resource's operations bound to the store and to every other resource.
#[derive(Clone)]
pub struct ResourceHandle {
    ops: Arc<ResourceOperations>,
    dispatchers: Dispatchers,
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("resource", &self.ops.config.name)
            .finish_non_exhaustive()
    }
}

impl ResourceHandle {
    pub(crate) fn new(ops: Arc<ResourceOperations>, dispatchers: Dispatchers) -> Self {
        Self { ops, dispatchers }
    }

    pub fn name(&self) -> &str {
        &self.ops.config.name
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.ops.config
    }

    pub fn types(&self) -> &ActionTypes {
        &self.ops.types
    }

    pub fn names(&self) -> &NameTable {
        &self.ops.names
    }

    pub fn dispatchers(&self) -> &Dispatchers {
        &self.dispatchers
    }

    fn store(&self) -> &StoreClient {
        self.dispatchers.store()
    }

    // ---- async verbs ----

    /// Fetch one entity. `input` is the id or an object carrying it.
    pub async fn get(&self, input: Value, opts: OperationOptions) -> Result<Outcome, OperationError> {
        self.run(AsyncTarget::Verb(Verb::Get), input, opts).await
    }

    /// Fetch the list. A nested resource reads the parent from `params`.
    pub async fn get_list(&self, opts: OperationOptions) -> Result<Outcome, OperationError> {
        let input = Value::Object(opts.params.clone());
        self.run(AsyncTarget::Verb(Verb::GetList), input, opts).await
    }

    /// Fetch every entity of a nested resource and partition them by parent.
    pub async fn get_all(&self, opts: OperationOptions) -> Result<Outcome, OperationError> {
        let input = Value::Object(opts.params.clone());
        self.run(AsyncTarget::Verb(Verb::GetAll), input, opts).await
    }

    pub async fn create(&self, input: Value, opts: OperationOptions) -> Result<Outcome, OperationError> {
        self.run(AsyncTarget::Verb(Verb::Create), input, opts).await
    }

    /// Update an entity. Pass the stored entity as [`OperationOptions::original`]
    /// when its key or parent may change.
    pub async fn update(&self, input: Value, opts: OperationOptions) -> Result<Outcome, OperationError> {
        self.run(AsyncTarget::Verb(Verb::Update), input, opts).await
    }

    /// Delete an entity. `input` is the entity or its key.
    pub async fn delete(&self, input: Value, opts: OperationOptions) -> Result<Outcome, OperationError> {
        self.run(AsyncTarget::Verb(Verb::Delete), input, opts).await
    }

    /// Run an included action. Sync actions only dispatch their event.
    pub async fn call_included(
        &self,
        name: &str,
        input: Value,
        opts: OperationOptions,
    ) -> Result<Outcome, OperationError> {
        let action = self
            .ops
            .config
            .include_actions
            .get(name)
            .ok_or_else(|| self.ops.disabled(name))?;
        if action.is_async {
            return self
                .run(AsyncTarget::Included(name.to_owned()), input, opts)
                .await;
        }
        let parent = self.optional(opts.parent.clone().or_else(|| self.parent_in(&input)));
        let action_type = self.ops.types.require(&EventKind::Included(name.to_owned()))?;
        self.dispatch(Event::new(action_type.clone()).payload(input).parent(parent))
            .await?;
        Ok(Outcome::Dispatched)
    }

    /// Run any operation by kind. Sync operations take their bucket from
    /// [`OperationOptions::parent`]; a `null` input means "no payload".
    pub async fn invoke(
        &self,
        kind: &OperationKind,
        input: Value,
        opts: OperationOptions,
    ) -> Result<Outcome, OperationError> {
        let parent = opts.parent.clone();
        let payload = (!input.is_null()).then(|| input.clone());
        match kind {
            OperationKind::Async(AsyncTarget::Verb(verb)) => {
                return match verb {
                    Verb::Get => self.get(input, opts).await,
                    Verb::GetList => self.get_list(opts).await,
                    Verb::GetAll => self.get_all(opts).await,
                    Verb::Create => self.create(input, opts).await,
                    Verb::Update => self.update(input, opts).await,
                    Verb::Delete => self.delete(input, opts).await,
                };
            }
            OperationKind::Async(AsyncTarget::Included(name)) | OperationKind::Included(name) => {
                return self.call_included(name, input, opts).await;
            }
            OperationKind::Set => self.set(input).await?,
            OperationKind::SetList => self.set_list(input, parent).await?,
            OperationKind::ClearList => self.clear_list(parent).await?,
            OperationKind::SetAll => self.set_all(input).await?,
            OperationKind::ClearAll => self.clear_all().await?,
            OperationKind::Select => self.select(input, parent).await?,
            OperationKind::UnSelect => self.un_select(payload, parent).await?,
            OperationKind::SelectAll => self.select_all(payload, parent).await?,
            OperationKind::UnSelectAll => self.un_select_all(payload, parent).await?,
            OperationKind::SetState(prop) => self.set_state(prop, input, parent).await?,
            OperationKind::ClearState(prop) => self.clear_state(prop, parent).await?,
        }
        Ok(Outcome::Dispatched)
    }

    #[instrument(skip_all, fields(resource = %self.ops.config.name, action = %target.name()))]
    async fn run(
        &self,
        target: AsyncTarget,
        input: Value,
        opts: OperationOptions,
    ) -> Result<Outcome, OperationError> {
        let config = &self.ops.config;
        let plan = self.ops.request_plan(&target)?;
        let transport = config
            .transport
            .clone()
            .ok_or_else(|| ConfigError::MissingTransport(config.name.clone()))?;
        let parent = self.request_parent(&target, &input, &opts);

        let loading = self
            .ops
            .types
            .lifecycle(&target, Phase::IsLoading)
            .ok_or_else(|| self.ops.disabled(target.name()))?;
        let guard = Guard {
            resource: config.name.clone(),
            action: target.name().to_owned(),
            parent: parent.clone(),
        };
        let start = Event::new(loading.clone())
            .payload(Value::Bool(true))
            .parent(parent.clone());
        if !self.store().begin(guard, start).await? {
            debug!(parent = ?parent, "Already in flight, skipped");
            return Ok(Outcome::Skipped);
        }

        let mut params = plan.params.clone();
        params.extend(opts.params.clone());
        let ctx = RouteContext {
            params: params.clone(),
            parent: parent.clone(),
        };
        let mut request = Request::new(plan.method, plan.route.render(&input, &ctx)).with_params(params);
        if plan.method.has_body() {
            let body = match &plan.prepare {
                Some(prepare) => prepare(&input, &ctx),
                None => input.clone(),
            };
            request = request.with_body(body);
        }
        debug!(method = %request.method, url = %request.url, "Request");

        let result = transport
            .request(request)
            .await
            .and_then(|response| {
                let payload = self.terminal_payload(&target, &input, &response.data)?;
                Ok((response.data, payload))
            });
        match result {
            Ok((data, payload)) => {
                let callback_value = self
                    .succeed(&target, &input, parent, &opts, &payload, &plan)
                    .await?;
                if let Some(callback) = &plan.callback {
                    callback(callback_value.clone(), self.dispatchers.clone()).await;
                }
                if let Some(callback) = &opts.callback {
                    callback(callback_value, self.dispatchers.clone()).await;
                }
                info!("Succeeded");
                Ok(Outcome::Succeeded(data))
            }
            Err(error) => {
                warn!(error = %error, "Request failed");
                if let Some(error_type) = self.ops.types.lifecycle(&target, Phase::Error) {
                    self.dispatch(
                        Event::new(error_type.clone())
                            .error(error.clone())
                            .parent(parent),
                    )
                    .await?;
                }
                for hook in [&config.on_error, &plan.on_error, &opts.on_error]
                    .into_iter()
                    .flatten()
                {
                    hook(&error);
                }
                Ok(Outcome::Failed(error))
            }
        }
    }

    /// Payload of the terminal event for a successful response.
    ///
    /// A body the reducer could not store is a failure, so the verb still
    /// settles. An update answered without an entity falls back to the input.
    fn terminal_payload(&self, target: &AsyncTarget, input: &Value, data: &Value) -> Result<Value, TransportError> {
        let config = &self.ops.config;
        let keyed = |v: &Value, field: &str| v.get(field).and_then(|k| config.id_codec.encode(k)).is_some();
        let entity = |v: &Value| v.is_object() && keyed(v, &config.by_key);
        match target {
            AsyncTarget::Verb(Verb::Get | Verb::Create) if !entity(data) => Err(TransportError::Decode(format!(
                "expected an entity with `{}`",
                config.by_key
            ))),
            AsyncTarget::Verb(Verb::Update) => {
                let usable = |v: &Value| entity(v) && keyed(v, &config.id);
                if usable(data) {
                    Ok(data.clone())
                } else if usable(input) {
                    debug!("Response carries no entity, using the input");
                    Ok(input.clone())
                } else {
                    Err(TransportError::Decode(format!(
                        "expected an entity with `{}` and `{}`",
                        config.id, config.by_key
                    )))
                }
            }
            AsyncTarget::Verb(Verb::GetList | Verb::GetAll) if !data.is_array() => {
                Err(TransportError::Decode("expected a list".to_owned()))
            }
            _ => Ok(data.clone()),
        }
    }

    /// Dispatch the terminal event(s). Returns the value handed to callbacks.
    async fn succeed(
        &self,
        target: &AsyncTarget,
        input: &Value,
        parent: Option<ParentKey>,
        opts: &OperationOptions,
        data: &Value,
        plan: &RequestPlan,
    ) -> Result<Value, OperationError> {
        let config = &self.ops.config;
        let types = &self.ops.types;
        match target {
            AsyncTarget::Verb(Verb::Get | Verb::Create) => {
                let stored = self.entity_parent(data).or_else(|| parent.clone());
                let event = Event::new(types.require(&EventKind::Set)?.clone())
                    .payload(data.clone())
                    .parent(stored.clone());
                self.dispatch(event).await?;
                if stored != parent {
                    // The entity landed in another bucket; settle the one that was loading.
                    if let Some(loading) = types.lifecycle(target, Phase::IsLoading) {
                        let settle = Event::new(loading.clone())
                            .payload(Value::Bool(false))
                            .parent(parent);
                        self.dispatch(settle).await?;
                    }
                }
            }
            AsyncTarget::Verb(Verb::GetList) => {
                let event = Event::new(types.require(&EventKind::SetList)?.clone())
                    .payload(data.clone())
                    .parent(parent);
                self.dispatch(event).await?;
            }
            AsyncTarget::Verb(Verb::GetAll) => {
                let event = Event::new(types.require(&EventKind::SetAll)?.clone()).payload(data.clone());
                self.dispatch(event).await?;
            }
            AsyncTarget::Verb(Verb::Update) => {
                let original = opts.original.as_ref();
                if let Some(original) = original.filter(|_| config.is_nested()) {
                    let previous = self.entity_parent(original);
                    if previous.is_some() && previous != parent {
                        debug!(from = ?previous, to = ?parent, "Parent changed, relocating");
                        match types.get(&EventKind::Verb(Verb::Delete)) {
                            Some(delete) => {
                                let relocate = Event::new(delete.clone())
                                    .payload(original.clone())
                                    .parent(previous);
                                self.dispatch(relocate).await?;
                            }
                            None => warn!("Delete is disabled, stale entry left in the old bucket"),
                        }
                    }
                }
                let pick = |field: &str| {
                    original
                        .and_then(|o| o.get(field))
                        .or_else(|| input.get(field))
                        .or_else(|| data.get(field))
                        .cloned()
                        .unwrap_or(Value::Null)
                };
                let id = input
                    .get(&config.id)
                    .cloned()
                    .unwrap_or_else(|| pick(&config.id));
                let event = Event::new(types.require(&EventKind::Verb(Verb::Update))?.clone())
                    .payload(data.clone())
                    .parent(parent)
                    .meta(id, pick(&config.by_key));
                self.dispatch(event).await?;
            }
            AsyncTarget::Verb(Verb::Delete) => {
                let event = Event::new(types.require(&EventKind::Verb(Verb::Delete))?.clone())
                    .payload(input.clone())
                    .parent(parent);
                self.dispatch(event).await?;
                return Ok(input.clone());
            }
            AsyncTarget::Included(name) => {
                let event = Event::new(types.require(&EventKind::Included(name.clone()))?.clone())
                    .payload(data.clone())
                    .parent(parent);
                self.dispatch(event).await?;
                if let Some(on_response) = &plan.on_response {
                    on_response(data.clone(), self.dispatchers.clone()).await;
                }
            }
        }
        Ok(data.clone())
    }

    // ---- sync verbs ----

    /// Upsert an entity without a request.
    pub async fn set(&self, entity: Value) -> Result<(), OperationError> {
        let parent = self.bucket(None, Some(&entity));
        self.send(EventKind::Set, Some(entity), parent).await
    }

    pub async fn set_list(&self, entities: Value, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let parent = self.bucket(parent, None);
        self.send(EventKind::SetList, Some(entities), parent).await
    }

    pub async fn set_all(&self, entities: Value) -> Result<(), OperationError> {
        self.send(EventKind::SetAll, Some(entities), None).await
    }

    pub async fn clear_list(&self, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let parent = self.bucket(parent, None);
        self.send(EventKind::ClearList, None, parent).await
    }

    pub async fn clear_all(&self) -> Result<(), OperationError> {
        self.send(EventKind::ClearAll, None, None).await
    }

    /// Select an entity or a bare key.
    pub async fn select(&self, target: Value, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let parent = self.bucket(parent, Some(&target));
        self.send(EventKind::Select, Some(target), parent).await
    }

    pub async fn un_select(&self, target: Option<Value>, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let parent = self.bucket(parent, target.as_ref());
        self.send(EventKind::UnSelect, target, parent).await
    }

    /// Select a batch of entities or keys; `None` selects everything listed.
    pub async fn select_all(&self, targets: Option<Value>, parent: Option<ParentKey>) -> Result<(), OperationError> {
        self.require_multiple("selectAll")?;
        let parent = self.bucket(parent, None);
        self.send(EventKind::SelectAll, targets, parent).await
    }

    /// Unselect a batch of entities or keys; `None` clears the selection.
    pub async fn un_select_all(&self, targets: Option<Value>, parent: Option<ParentKey>) -> Result<(), OperationError> {
        self.require_multiple("unSelectAll")?;
        let parent = self.bucket(parent, None);
        self.send(EventKind::UnSelectAll, targets, parent).await
    }

    /// Set a custom state slice. On a nested resource `None` means the root.
    pub async fn set_state(&self, prop: &str, value: Value, parent: Option<ParentKey>) -> Result<(), OperationError> {
        self.send(EventKind::SetState(prop.to_owned()), Some(value), self.optional(parent))
            .await
    }

    /// Reset a custom state slice to its initial value.
    pub async fn clear_state(&self, prop: &str, parent: Option<ParentKey>) -> Result<(), OperationError> {
        self.send(EventKind::ClearState(prop.to_owned()), None, self.optional(parent))
            .await
    }

    /// Clear the error of an async action (`"getList"`, an included action, ...).
    pub async fn clear_error(&self, action: &str, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let target = AsyncTarget::from_name(action);
        let parent = match &target {
            AsyncTarget::Verb(Verb::GetAll) | AsyncTarget::Included(_) => self.optional(parent),
            AsyncTarget::Verb(_) => self.bucket(parent, None),
        };
        self.send(EventKind::Lifecycle(target, Phase::ClearError), None, parent)
            .await
    }

    fn require_multiple(&self, operation: &str) -> Result<(), ConfigError> {
        if self.ops.config.select == SelectMode::Multiple {
            Ok(())
        } else {
            Err(self.ops.disabled(operation))
        }
    }

    async fn send(&self, kind: EventKind, payload: Option<Value>, parent: Option<ParentKey>) -> Result<(), OperationError> {
        let mut event = Event::new(self.ops.types.require(&kind)?.clone()).parent(parent);
        event.payload = payload;
        self.dispatch(event).await
    }

    async fn dispatch(&self, event: Event) -> Result<(), OperationError> {
        self.store().dispatch(event).await?;
        Ok(())
    }

    // ---- parent resolution ----

    /// Parent of an entity, if the resource is nested and the entity names one.
    fn entity_parent(&self, entity: &Value) -> Option<ParentKey> {
        let parent = self.ops.config.parent.as_ref()?;
        entity.get(&parent.field)?;
        parent.key_of(entity)
    }

    /// Parent named by an object input, for actions that default to the root.
    fn parent_in(&self, input: &Value) -> Option<ParentKey> {
        self.entity_parent(input)
    }

    /// Bucket of a bucket-level event: explicit, else derived, else the null bucket.
    fn bucket(&self, explicit: Option<ParentKey>, value: Option<&Value>) -> Option<ParentKey> {
        self.ops.config.parent.as_ref()?;
        explicit
            .or_else(|| value.and_then(|v| self.entity_parent(v)))
            .or(Some(ParentKey::null()))
    }

    fn optional(&self, explicit: Option<ParentKey>) -> Option<ParentKey> {
        self.ops.config.parent.as_ref()?;
        explicit
    }

    fn request_parent(&self, target: &AsyncTarget, input: &Value, opts: &OperationOptions) -> Option<ParentKey> {
        match target {
            AsyncTarget::Verb(Verb::GetAll) => None,
            AsyncTarget::Verb(Verb::GetList) => {
                let params = Value::Object(opts.params.clone());
                self.bucket(opts.parent.clone(), Some(&params))
            }
            AsyncTarget::Verb(_) => self.bucket(opts.parent.clone(), Some(input)),
            AsyncTarget::Included(_) => {
                let explicit = opts.parent.clone().or_else(|| self.parent_in(input));
                self.optional(explicit)
            }
        }
    }
}
