//! Values returned by the store adapters.
//!
//! These are deliberately thin: the core reports them, it does not interpret
//! them beyond what the read plans need.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::identity_kind::{IdentityKind, Permission};

/// The canonical record of a resource in the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set by path enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Set by path enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, kind: IdentityKind) -> Self {
        Entity {
            id: id.into(),
            kind,
            name: None,
            path: None,
            parent_id: None,
            attributes: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an attribute, returning the updated entity.
    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Ancestry information, present once enrichment has run.
    pub fn path_info(&self) -> PathInfo {
        PathInfo {
            path: self.path.clone(),
            parent_id: self.parent_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PathInfo {
    pub path: Option<String>,
    pub parent_id: Option<String>,
}

/// Short reference to a group, as listed for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupExtract {
    pub id: String,
    pub name: String,
}

impl GroupExtract {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        GroupExtract {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: String,
    pub name: String,
    pub administrator: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupUsers {
    pub users: Vec<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionGrant {
    pub principal: String,
    pub permission: Permission,
}

/// Explicit grants on one resource, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionsView {
    pub owner: Option<String>,
    pub grants: Vec<PermissionGrant>,
}

/// Effective principals after inheritance, as materialized for the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MaterializedPermissionsView {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

/// A user as seen by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub enabled: bool,
    /// Effective realm roles, filled in by the aggregator.
    #[serde(default)]
    pub realm_roles: Vec<String>,
}

/// Key under which the search index stores materialized grants for a principal.
pub fn materialized_permission_key(principal_id: &str, permission: Permission) -> String {
    format!("{principal_id}|{permission}")
}
