//! Events: what operations dispatch and reducers fold.

use crate::action_types::ActionType;
use crate::error::TransportError;
use crate::key::ParentKey;
use serde::Serialize;
use serde_json::Value;

/// Original identity of an entity being updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateMeta {
    pub id: Value,
    pub key: Value,
}

/// One dispatched event.
///
/// `parent` is `None` for flat resources and for resource-level events of a
/// nested one; `Some(ParentKey::null())` addresses the null bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<UpdateMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TransportError>,
}

impl Event {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            payload: None,
            parent: None,
            meta: None,
            error: None,
        }
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn parent(mut self, parent: Option<ParentKey>) -> Self {
        self.parent = parent;
        self
    }

    pub fn meta(mut self, id: Value, key: Value) -> Self {
        self.meta = Some(UpdateMeta { id, key });
        self
    }

    pub fn error(mut self, error: TransportError) -> Self {
        self.error = Some(error);
        self
    }
}
