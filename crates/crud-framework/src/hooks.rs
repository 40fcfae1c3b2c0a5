//! Hooks: props plus operations bound to a view's own props.
//!
//! [`ResourceHook::use_props`] reads the latest store snapshot, maps it with
//! [`Mapper`](crate::selectors::Mapper) and binds every operation of the
//! resource. Each [`BoundOperation`] carries the current `isLoading` and
//! `error` of its action, so a view can render a spinner next to the button
//! that triggers it.

use crate::action_types::{AsyncTarget, Verb};
use crate::error::{ConfigError, OperationError, StateError, TransportError};
use crate::key::ParentKey;
use crate::operations::{OperationKind, OperationOptions, Outcome, ResourceHandle};
use crate::selectors::{Mapper, NameMode, OwnProps, Props};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Hook factory for one resource.
#[derive(Debug, Clone)]
pub struct ResourceHook {
    handle: ResourceHandle,
}

/// Output of [`ResourceHook::use_props`].
#[derive(Debug, Clone)]
pub struct HookOutput {
    pub props: Props,
    /// Bound operations by public name.
    pub operations: BTreeMap<String, BoundOperation>,
}

impl HookOutput {
    pub fn operation(&self, name: &str) -> Option<&BoundOperation> {
        self.operations.get(name)
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }
}

impl ResourceHook {
    pub fn new(handle: ResourceHandle) -> Self {
        Self { handle }
    }

    pub fn use_props(&self, own: OwnProps, mode: NameMode) -> Result<HookOutput, StateError> {
        let config = self.handle.config();
        let names = self.handle.names();
        if config.parent.is_none() && own.parent.is_some() {
            error!(resource = %config.name, "Parent prop given to a resource without a parent");
        }
        if !own.extra.is_empty() {
            let unrecognized: Vec<&String> = own.extra.keys().collect();
            warn!(resource = %config.name, ?unrecognized, "Unrecognized props");
        }

        let state = self.handle.dispatchers().snapshot();
        let props = Mapper::new(config, names).map_to_props(&state, &own, mode)?;
        let tree = state.resource(&config.name)?;
        let parent = own.parent_key(config);

        let operations = names
            .operations()
            .map(|(stripped, full, kind)| {
                let status = kind
                    .async_target()
                    .and_then(|target| tree.action(target.name(), parent.as_ref()))
                    .cloned()
                    .unwrap_or_default();
                let name = match mode {
                    NameMode::Stripped => stripped,
                    NameMode::Full => full,
                };
                let bound = BoundOperation {
                    name: name.to_owned(),
                    kind: kind.clone(),
                    is_loading: status.is_loading,
                    error: status.error,
                    handle: self.handle.clone(),
                    id: own.id.clone(),
                    parent_value: own.parent.clone(),
                    parent: parent.clone(),
                };
                (name.to_owned(), bound)
            })
            .collect();

        Ok(HookOutput { props, operations })
    }
}

/// An operation bound to a view's id and parent props.
#[derive(Debug, Clone)]
pub struct BoundOperation {
    name: String,
    kind: OperationKind,
    pub is_loading: bool,
    pub error: Option<TransportError>,
    handle: ResourceHandle,
    id: Option<Value>,
    parent_value: Option<Value>,
    parent: Option<ParentKey>,
}

impl BoundOperation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Run the operation. `create`, `update` and `delete` get the id and
    /// parent props merged under the caller's input.
    pub async fn call(&self, input: Value, mut opts: OperationOptions) -> Result<Outcome, OperationError> {
        let input = match &self.kind {
            OperationKind::Async(AsyncTarget::Verb(Verb::Create)) => self.with_context(input, false),
            OperationKind::Async(AsyncTarget::Verb(Verb::Update)) => self.with_context(input, true),
            OperationKind::Async(AsyncTarget::Verb(Verb::Delete)) => {
                let input = match input {
                    Value::Object(_) | Value::Null => input,
                    key => Value::Object(self.identity(key)),
                };
                self.with_context(input, true)
            }
            _ => input,
        };
        if opts.parent.is_none() {
            opts.parent = self.parent.clone();
        }
        self.handle.invoke(&self.kind, input, opts).await
    }

    /// Clear the stored error of this operation.
    pub async fn clear_error(&self) -> Result<(), OperationError> {
        let target = self.kind.async_target().ok_or_else(|| ConfigError::OperationDisabled {
            resource: self.handle.name().to_owned(),
            operation: format!("{}.clearError", self.name),
        })?;
        self.handle.clear_error(target.name(), self.parent.clone()).await
    }

    /// `id` and `byKey` fields for a list key, read from the stored entity.
    /// A key with no stored entity is taken as the id.
    fn identity(&self, key: Value) -> Map<String, Value> {
        let config = self.handle.config();
        let snapshot = self.handle.dispatchers().snapshot();
        let stored = config.id_codec.encode(&key).and_then(|k| {
            let list = snapshot.list(self.handle.name(), self.parent.as_ref()).ok()??;
            list.get(&k).cloned()
        });
        let mut fields = Map::new();
        match stored {
            Some(entity) => {
                for field in [&config.id, &config.by_key] {
                    if let Some(value) = entity.get(field.as_str()) {
                        fields.insert(field.clone(), value.clone());
                    }
                }
            }
            None => {
                fields.insert(config.id.clone(), key);
            }
        }
        fields
    }

    fn with_context(&self, input: Value, with_id: bool) -> Value {
        let config = self.handle.config();
        let mut merged = Map::new();
        if with_id {
            if let Some(id) = &self.id {
                merged.extend(self.identity(id.clone()));
            }
        }
        if let (Some(parent), Some(value)) = (&config.parent, &self.parent_value) {
            merged.insert(parent.field.clone(), value.clone());
        }
        match input {
            Value::Object(fields) => {
                merged.extend(fields);
                Value::Object(merged)
            }
            Value::Null => Value::Object(merged),
            other => other,
        }
    }
}
