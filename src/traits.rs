//! Adapter seams for the platform's backing stores.
//!
//! The core only talks to these traits. Adapters own transport, timeouts
//! and retries; an `Err` returned here is final for the current request.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{
    Entity, GroupExtract, GroupUsers, IdentityKind, MaterializedPermissionsView, Permission,
    PermissionsView, ProbeKind, UserProfile,
};

/// The authoritative store: entities, ancestry, grants and memberships.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look `id` up as `probe`. `Ok(None)` means "not this kind".
    ///
    /// For [`ProbeKind::Artifact`] the returned entity carries its concrete
    /// kind (field, element, template or instance).
    async fn find_by_kind(&self, probe: ProbeKind, id: &str) -> Result<Option<Entity>, StoreError>;

    /// Fill in `path` and `parent_id` on `entity`.
    async fn add_path_and_parent_id(&self, entity: &mut Entity) -> Result<(), StoreError>;

    async fn get_permissions(&self, id: &str) -> Result<PermissionsView, StoreError>;

    async fn get_materialized_permissions(
        &self,
        id: &str,
    ) -> Result<MaterializedPermissionsView, StoreError>;

    /// Number of `kind` resources `user_id` can reach through the graph.
    async fn count_accessible(&self, kind: IdentityKind, user_id: &str)
    -> Result<u64, StoreError>;

    async fn groups_of_member(&self, user_id: &str) -> Result<Vec<GroupExtract>, StoreError>;

    async fn groups_of_administrator(&self, user_id: &str)
    -> Result<Vec<GroupExtract>, StoreError>;

    async fn group_users(&self, group_id: &str) -> Result<GroupUsers, StoreError>;

    /// Structural report of an artifact (fields, children, versions), as the
    /// graph renders it.
    async fn artifact_report(&self, id: &str) -> Result<Value, StoreError>;

    async fn total_count(&self, kind: IdentityKind) -> Result<u64, StoreError>;
}

/// The derived search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn get_document_by_id(&self, id: &str) -> Result<Option<Value>, StoreError>;

    /// Number of indexed `kinds` documents `user_id` holds `permission` on.
    async fn count_accessible_by_user(
        &self,
        kinds: &[IdentityKind],
        permission: Permission,
        user_id: &str,
    ) -> Result<u64, StoreError>;

    async fn total_count(&self, kind: IdentityKind) -> Result<u64, StoreError>;

    /// Ids of resources whose materialized grants mention `group_id`.
    async fn resource_ids_for_group(&self, group_id: &str) -> Result<Vec<String>, StoreError>;
}

/// The external identity provider. Keyed by the user's local id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_user_profile(&self, external_id: &str)
    -> Result<Option<UserProfile>, StoreError>;

    async fn list_effective_realm_roles(&self, external_id: &str)
    -> Result<Vec<String>, StoreError>;

    async fn user_count(&self) -> Result<u64, StoreError>;
}

/// Work queues feeding the indexer.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    async fn length(&self, queue_name: &str) -> Result<u64, StoreError>;
}

/// The adapters one [`crate::Inspector`] is wired with.
#[derive(Clone)]
pub struct Stores {
    pub graph: Arc<dyn GraphStore>,
    pub search: Arc<dyn SearchIndex>,
    pub identity: Arc<dyn IdentityProvider>,
    pub queues: Option<Arc<dyn QueueBackend>>,
}

impl Stores {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        search: Arc<dyn SearchIndex>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Stores {
            graph,
            search,
            identity,
            queues: None,
        }
    }

    pub fn with_queues(mut self, queues: Arc<dyn QueueBackend>) -> Self {
        self.queues = Some(queues);
        self
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("queues", &self.queues.is_some())
            .finish_non_exhaustive()
    }
}
