//! Snapshot cells grouped by the store they came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;

use super::identity_kind::{IdentityKind, ProbeKind};

/// Count sentinel: the store could not answer.
pub const UNAVAILABLE: i64 = -1;

/// Facet names used in snapshots and reports.
pub mod facet {
    pub const ENTITY: &str = "entity";
    pub const PATH_INFO: &str = "pathInfo";
    pub const PERMISSIONS: &str = "permissions";
    pub const MATERIALIZED_PERMISSIONS: &str = "materializedPermissions";
    pub const REPORT: &str = "report";
    pub const DOCUMENT: &str = "document";
    pub const ACCESSIBLE_COUNT: &str = "accessibleCount";
    pub const READABLE_COUNT: &str = "readableCount";
    pub const WRITEABLE_COUNT: &str = "writeableCount";
    pub const GROUPS_WITH_MEMBERSHIP: &str = "groupsWithMembership";
    pub const GROUPS_WITH_ADMINISTRATOR: &str = "groupsWithAdministrator";
    pub const GROUP_USERS: &str = "groupUsers";
    pub const RESOURCE_IDS: &str = "resourceIds";
    pub const READ_KEY: &str = "readKey";
    pub const WRITE_KEY: &str = "writeKey";
    pub const PROFILE: &str = "profile";
    pub const REALM_ROLES: &str = "realmRoles";
    pub const TOTAL_COUNT: &str = "totalCount";
    pub const USER_COUNT: &str = "user";
}

/// A backing store that facets are attributed to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StoreName {
    Graph,
    SearchIndex,
    IdentityProvider,
    Queue,
}

/// One snapshot cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Facet {
    /// Non-negative, or [`UNAVAILABLE`].
    Count(i64),
    /// Per-kind counters, each independently [`UNAVAILABLE`].
    Counts(BTreeMap<IdentityKind, i64>),
    /// `None` when the store had nothing or failed.
    Document(Option<Value>),
}

impl Facet {
    /// Number of sentinel values carried by this cell.
    pub fn sentinel_cells(&self) -> usize {
        match self {
            Facet::Count(n) => usize::from(*n == UNAVAILABLE),
            Facet::Counts(counts) => counts.values().filter(|n| **n == UNAVAILABLE).count(),
            Facet::Document(doc) => usize::from(doc.is_none()),
        }
    }

    pub fn as_count(&self) -> Option<i64> {
        match self {
            Facet::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn count_for(&self, kind: IdentityKind) -> Option<i64> {
        match self {
            Facet::Counts(counts) => counts.get(&kind).copied(),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Value> {
        match self {
            Facet::Document(doc) => doc.as_ref(),
            _ => None,
        }
    }

    pub fn is_null_document(&self) -> bool {
        matches!(self, Facet::Document(None))
    }
}

/// Facets keyed by store, then by facet name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StoreFacets(BTreeMap<StoreName, BTreeMap<String, Facet>>);

impl StoreFacets {
    pub(crate) fn insert(&mut self, store: StoreName, name: &str, value: Facet) {
        self.0.entry(store).or_default().insert(name.to_string(), value);
    }

    /// Set one per-kind counter, creating the `Counts` cell on first use.
    pub(crate) fn insert_count(&mut self, store: StoreName, name: &str, kind: IdentityKind, n: i64) {
        let cell = self
            .0
            .entry(store)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| Facet::Counts(BTreeMap::new()));
        if let Facet::Counts(counts) = cell {
            counts.insert(kind, n);
        }
    }

    pub fn get(&self, store: StoreName, name: &str) -> Option<&Facet> {
        self.0.get(&store).and_then(|facets| facets.get(name))
    }

    pub fn store(&self, store: StoreName) -> Option<&BTreeMap<String, Facet>> {
        self.0.get(&store)
    }

    pub fn stores(&self) -> impl Iterator<Item = StoreName> + '_ {
        self.0.keys().copied()
    }

    pub fn sentinel_cells(&self) -> usize {
        self.0
            .values()
            .flat_map(|facets| facets.values())
            .map(Facet::sentinel_cells)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The aggregator's output for one resource. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    resource_type: IdentityKind,
    resource_id: String,
    #[serde(flatten)]
    facets: StoreFacets,
}

impl ResourceSnapshot {
    pub fn resource_type(&self) -> IdentityKind {
        self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn facets(&self) -> &StoreFacets {
        &self.facets
    }

    pub fn get(&self, store: StoreName, name: &str) -> Option<&Facet> {
        self.facets.get(store, name)
    }

    /// How many cells carry a sentinel instead of data.
    pub fn degraded_cells(&self) -> usize {
        self.facets.sentinel_cells()
    }
}

/// Accumulates cells for one snapshot; consumed by `build`.
#[derive(Debug)]
pub(crate) struct SnapshotBuilder {
    resource_type: IdentityKind,
    resource_id: String,
    facets: StoreFacets,
}

impl SnapshotBuilder {
    pub(crate) fn new(resource_type: IdentityKind, resource_id: impl Into<String>) -> Self {
        SnapshotBuilder {
            resource_type,
            resource_id: resource_id.into(),
            facets: StoreFacets::default(),
        }
    }

    pub(crate) fn facet(&mut self, store: StoreName, name: &str, value: Facet) -> &mut Self {
        self.facets.insert(store, name, value);
        self
    }

    pub(crate) fn count(
        &mut self,
        store: StoreName,
        name: &str,
        kind: IdentityKind,
        n: i64,
    ) -> &mut Self {
        self.facets.insert_count(store, name, kind, n);
        self
    }

    pub(crate) fn build(self) -> ResourceSnapshot {
        ResourceSnapshot {
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            facets: self.facets,
        }
    }
}

/// Result of probing the stores for an id.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Found(ResourceSnapshot),
    NotFound { id: String, probed: Vec<ProbeKind> },
}

impl Aggregation {
    pub fn snapshot(&self) -> Option<&ResourceSnapshot> {
        match self {
            Aggregation::Found(snapshot) => Some(snapshot),
            Aggregation::NotFound { .. } => None,
        }
    }
}
