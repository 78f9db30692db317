//! In-memory store fakes with failure injection and call recording.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::StoreError;
use crate::traits::{GraphStore, IdentityProvider, QueueBackend, SearchIndex, Stores};
use crate::types::{
    Entity, GroupExtract, GroupMember, GroupUsers, IdentityKind, MaterializedPermissionsView,
    Permission, PermissionGrant, PermissionsView, ProbeKind, UserProfile,
};

pub const USER: &str = "https://repo.example.org/users/u-1";
pub const GROUP: &str = "https://repo.example.org/groups/g-1";
pub const CATEGORY: &str = "https://repo.example.org/categories/c-1";
pub const FOLDER: &str = "https://repo.example.org/folders/f-1";
pub const FIELD: &str = "https://repo.example.org/template-fields/abc-123";
/// Stored both as a folder and as a template.
pub const AMBIGUOUS: &str = "legacy-42";

/// Shared by all fakes of one fixture: calls, injected faults, concurrency.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Recorder {
    /// Fail every operation whose name starts with `prefix`, e.g.
    /// `"searchIndex"` or `"graph.find_by_kind"`.
    pub fn fail(&self, prefix: &str) {
        self.failing.lock().unwrap().insert(prefix.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn call(&self, op: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(op.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| op.starts_with(prefix.as_str()));
        if failing {
            Err(StoreError::Unreachable(format!("{op}: connection refused")))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeGraph {
    pub recorder: Arc<Recorder>,
    pub entities: Vec<Entity>,
    pub paths: HashMap<String, (String, Option<String>)>,
    pub permissions: HashMap<String, PermissionsView>,
    pub accessible: HashMap<(String, IdentityKind), u64>,
    pub memberships: HashMap<String, Vec<GroupExtract>>,
    pub administrations: HashMap<String, Vec<GroupExtract>>,
    pub members: HashMap<String, GroupUsers>,
    /// Answer every probe with the first entity carrying the id.
    pub ignore_probe_kind: bool,
}

#[async_trait]
impl GraphStore for FakeGraph {
    async fn find_by_kind(&self, probe: ProbeKind, id: &str) -> Result<Option<Entity>, StoreError> {
        self.recorder
            .call(&format!("graph.find_by_kind.{probe}"))
            .await?;
        Ok(self
            .entities
            .iter()
            .find(|e| e.id == id && (self.ignore_probe_kind || probe.covers(e.kind)))
            .cloned())
    }

    async fn add_path_and_parent_id(&self, entity: &mut Entity) -> Result<(), StoreError> {
        self.recorder.call("graph.add_path_and_parent_id").await?;
        if let Some((path, parent)) = self.paths.get(&entity.id) {
            entity.path = Some(path.clone());
            entity.parent_id = parent.clone();
        }
        Ok(())
    }

    async fn get_permissions(&self, id: &str) -> Result<PermissionsView, StoreError> {
        self.recorder.call("graph.get_permissions").await?;
        Ok(self.permissions.get(id).cloned().unwrap_or_default())
    }

    async fn get_materialized_permissions(
        &self,
        id: &str,
    ) -> Result<MaterializedPermissionsView, StoreError> {
        self.recorder
            .call("graph.get_materialized_permissions")
            .await?;
        let view = self.permissions.get(id).cloned().unwrap_or_default();
        let mut materialized = MaterializedPermissionsView::default();
        for grant in view.grants {
            materialized.read.push(grant.principal.clone());
            if grant.permission == Permission::Write {
                materialized.write.push(grant.principal);
            }
        }
        materialized.read.extend(view.owner.clone());
        materialized.write.extend(view.owner);
        Ok(materialized)
    }

    async fn count_accessible(
        &self,
        kind: IdentityKind,
        user_id: &str,
    ) -> Result<u64, StoreError> {
        self.recorder
            .call(&format!("graph.count_accessible.{kind}"))
            .await?;
        Ok(self
            .accessible
            .get(&(user_id.to_string(), kind))
            .copied()
            .unwrap_or(0))
    }

    async fn groups_of_member(&self, user_id: &str) -> Result<Vec<GroupExtract>, StoreError> {
        self.recorder.call("graph.groups_of_member").await?;
        Ok(self.memberships.get(user_id).cloned().unwrap_or_default())
    }

    async fn groups_of_administrator(
        &self,
        user_id: &str,
    ) -> Result<Vec<GroupExtract>, StoreError> {
        self.recorder.call("graph.groups_of_administrator").await?;
        Ok(self.administrations.get(user_id).cloned().unwrap_or_default())
    }

    async fn group_users(&self, group_id: &str) -> Result<GroupUsers, StoreError> {
        self.recorder.call("graph.group_users").await?;
        Ok(self.members.get(group_id).cloned().unwrap_or_default())
    }

    async fn artifact_report(&self, id: &str) -> Result<Value, StoreError> {
        self.recorder.call("graph.artifact_report").await?;
        Ok(json!({ "id": id, "versions": 1, "children": [] }))
    }

    async fn total_count(&self, kind: IdentityKind) -> Result<u64, StoreError> {
        self.recorder
            .call(&format!("graph.total_count.{kind}"))
            .await?;
        Ok(self.entities.iter().filter(|e| e.kind == kind).count() as u64)
    }
}

#[derive(Debug, Default)]
pub struct FakeSearch {
    pub recorder: Arc<Recorder>,
    pub documents: HashMap<String, Value>,
    pub readable: HashMap<(String, IdentityKind, Permission), u64>,
    pub group_resources: HashMap<String, Vec<String>>,
}

#[async_trait]
impl SearchIndex for FakeSearch {
    async fn get_document_by_id(&self, id: &str) -> Result<Option<Value>, StoreError> {
        self.recorder.call("searchIndex.get_document_by_id").await?;
        Ok(self.documents.get(id).cloned())
    }

    async fn count_accessible_by_user(
        &self,
        kinds: &[IdentityKind],
        permission: Permission,
        user_id: &str,
    ) -> Result<u64, StoreError> {
        self.recorder
            .call(&format!("searchIndex.count_accessible_by_user.{permission}"))
            .await?;
        Ok(kinds
            .iter()
            .map(|kind| {
                self.readable
                    .get(&(user_id.to_string(), *kind, permission))
                    .copied()
                    .unwrap_or(0)
            })
            .sum())
    }

    async fn total_count(&self, kind: IdentityKind) -> Result<u64, StoreError> {
        self.recorder
            .call(&format!("searchIndex.total_count.{kind}"))
            .await?;
        Ok(self
            .documents
            .values()
            .filter(|doc| doc["kind"] == kind.as_ref())
            .count() as u64)
    }

    async fn resource_ids_for_group(&self, group_id: &str) -> Result<Vec<String>, StoreError> {
        self.recorder
            .call("searchIndex.resource_ids_for_group")
            .await?;
        Ok(self.group_resources.get(group_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FakeIdentity {
    pub recorder: Arc<Recorder>,
    pub profiles: HashMap<String, UserProfile>,
    pub roles: HashMap<String, Vec<String>>,
    /// External ids the provider was asked about.
    pub asked: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn find_user_profile(
        &self,
        external_id: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        self.asked.lock().unwrap().push(external_id.to_string());
        self.recorder
            .call("identityProvider.find_user_profile")
            .await?;
        Ok(self.profiles.get(external_id).cloned())
    }

    async fn list_effective_realm_roles(
        &self,
        external_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.recorder
            .call("identityProvider.list_effective_realm_roles")
            .await?;
        Ok(self.roles.get(external_id).cloned().unwrap_or_default())
    }

    async fn user_count(&self) -> Result<u64, StoreError> {
        self.recorder.call("identityProvider.user_count").await?;
        Ok(self.profiles.len() as u64)
    }
}

#[derive(Debug, Default)]
pub struct FakeQueues {
    pub recorder: Arc<Recorder>,
    pub lengths: HashMap<String, u64>,
}

#[async_trait]
impl QueueBackend for FakeQueues {
    async fn length(&self, queue_name: &str) -> Result<u64, StoreError> {
        self.recorder
            .call(&format!("queue.length.{queue_name}"))
            .await?;
        self.lengths
            .get(queue_name)
            .copied()
            .ok_or_else(|| StoreError::Query(format!("no such queue: {queue_name}")))
    }
}

/// A populated set of fakes sharing one recorder.
pub struct Fixture {
    pub recorder: Arc<Recorder>,
    pub graph: FakeGraph,
    pub search: FakeSearch,
    pub identity: FakeIdentity,
    pub queues: FakeQueues,
}

impl Fixture {
    pub fn new() -> Self {
        let recorder = Arc::new(Recorder::default());
        let mut graph = FakeGraph {
            recorder: recorder.clone(),
            ..Default::default()
        };
        let mut search = FakeSearch {
            recorder: recorder.clone(),
            ..Default::default()
        };
        let mut identity = FakeIdentity {
            recorder: recorder.clone(),
            ..Default::default()
        };
        let queues = FakeQueues {
            recorder: recorder.clone(),
            lengths: HashMap::from([
                ("indexing".to_string(), 3),
                ("indexing-priority".to_string(), 0),
            ]),
        };

        graph.entities = vec![
            Entity::new(USER, IdentityKind::User).with_name("Ada Lovelace"),
            Entity::new(GROUP, IdentityKind::Group).with_name("Curators"),
            Entity::new(CATEGORY, IdentityKind::Category).with_name("Oncology"),
            Entity::new(FOLDER, IdentityKind::Folder).with_name("Shared"),
            Entity::new(FIELD, IdentityKind::Field).with_name("Blood pressure"),
            Entity::new(AMBIGUOUS, IdentityKind::Folder).with_name("Legacy folder"),
            Entity::new(AMBIGUOUS, IdentityKind::Template).with_name("Legacy template"),
        ];
        graph.paths = HashMap::from([
            (CATEGORY.to_string(), ("/Oncology".to_string(), None)),
            (FOLDER.to_string(), ("/Shared".to_string(), None)),
            (
                FIELD.to_string(),
                ("/Shared/Blood pressure".to_string(), Some(FOLDER.to_string())),
            ),
        ]);
        graph.permissions = HashMap::from([(
            FIELD.to_string(),
            PermissionsView {
                owner: Some(USER.to_string()),
                grants: vec![PermissionGrant {
                    principal: GROUP.to_string(),
                    permission: Permission::Read,
                }],
            },
        )]);
        for (kind, n) in [
            (IdentityKind::Field, 4),
            (IdentityKind::Element, 2),
            (IdentityKind::Template, 1),
            (IdentityKind::Instance, 0),
            (IdentityKind::Folder, 3),
        ] {
            graph.accessible.insert((USER.to_string(), kind), n);
            search
                .readable
                .insert((USER.to_string(), kind, Permission::Read), n);
            search
                .readable
                .insert((USER.to_string(), kind, Permission::Write), n / 2);
        }
        graph.memberships = HashMap::from([(
            USER.to_string(),
            vec![GroupExtract::new(GROUP, "Curators")],
        )]);
        graph.members = HashMap::from([(
            GROUP.to_string(),
            GroupUsers {
                users: vec![GroupMember {
                    id: USER.to_string(),
                    name: "Ada Lovelace".to_string(),
                    administrator: false,
                }],
            },
        )]);

        search.documents = HashMap::from([
            (
                FIELD.to_string(),
                json!({"id": FIELD, "kind": "field", "name": "Blood pressure"}),
            ),
            (
                FOLDER.to_string(),
                json!({"id": FOLDER, "kind": "folder", "name": "Shared"}),
            ),
            (
                CATEGORY.to_string(),
                json!({"id": CATEGORY, "kind": "category", "name": "Oncology"}),
            ),
        ]);
        search.group_resources = HashMap::from([(GROUP.to_string(), vec![FIELD.to_string()])]);

        identity.profiles = HashMap::from([(
            "u-1".to_string(),
            UserProfile {
                id: "kc-0001".to_string(),
                username: "ada".to_string(),
                email: Some("ada@example.org".to_string()),
                enabled: true,
                ..Default::default()
            },
        )]);
        identity.roles = HashMap::from([(
            "u-1".to_string(),
            vec!["curator".to_string(), "offline_access".to_string()],
        )]);

        Fixture {
            recorder,
            graph,
            search,
            identity,
            queues,
        }
    }

    /// Wire the fakes up, keeping handles for inspection after the call.
    pub fn into_stores(self) -> (Stores, Handles) {
        let graph = Arc::new(self.graph);
        let search = Arc::new(self.search);
        let identity = Arc::new(self.identity);
        let queues = Arc::new(self.queues);
        let stores = Stores::new(graph.clone(), search.clone(), identity.clone())
            .with_queues(queues.clone());
        (
            stores,
            Handles {
                recorder: self.recorder,
                identity,
            },
        )
    }
}

pub struct Handles {
    pub recorder: Arc<Recorder>,
    pub identity: Arc<FakeIdentity>,
}
