use super::CatalogEntity;
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub archived: bool,
}

impl User {
    /// A user not yet stored. The backend assigns the id.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            archived: false,
        }
    }
}

impl CatalogEntity for User {
    const RESOURCE: &'static str = "users";
}
