//! Builds a [`ResourceSnapshot`] for an id by probing the graph store for
//! its kind and then reading every store that knows something about it.
//!
//! Only the canonical lookup can fail the whole call. Everything read after
//! it is best effort and degrades cell by cell.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::IdentityCatalog;
use crate::error::{LookoutError, StoreError};
use crate::fetch::{self, FetchSite};
use crate::traits::Stores;
use crate::types::{
    Aggregation, COUNTED_KINDS, Entity, Facet, IdentityKind, Permission, ProbeOrder,
    ResolvedReference, ResourceSnapshot, SnapshotBuilder, StoreName, UserProfile, facet,
    materialized_permission_key,
};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// One cell produced by a secondary read.
#[derive(Debug)]
enum Cell {
    Whole(Facet),
    PerKind(IdentityKind, i64),
}

#[derive(Debug)]
struct Fetched {
    store: StoreName,
    name: &'static str,
    cell: Cell,
}

impl Fetched {
    fn whole(store: StoreName, name: &'static str, facet: Facet) -> Self {
        Fetched {
            store,
            name,
            cell: Cell::Whole(facet),
        }
    }

    fn per_kind(store: StoreName, name: &'static str, kind: IdentityKind, n: i64) -> Self {
        Fetched {
            store,
            name,
            cell: Cell::PerKind(kind, n),
        }
    }
}

type Task<'a> = BoxFuture<'a, Vec<Fetched>>;

/// Render an optional value as a document cell; `None` and JSON `null` both
/// become a null cell.
fn rendered<T: Serialize>(value: Option<T>) -> Facet {
    Facet::Document(
        value
            .and_then(|v| serde_json::to_value(v).ok())
            .filter(|v| !v.is_null()),
    )
}

#[derive(Clone)]
pub struct Aggregator {
    stores: Stores,
    catalog: IdentityCatalog,
    probe_order: ProbeOrder,
    max_concurrent_fetches: usize,
}

impl Aggregator {
    pub fn new(stores: Stores, catalog: IdentityCatalog) -> Self {
        Aggregator {
            stores,
            catalog,
            probe_order: ProbeOrder::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_probe_order(mut self, probe_order: ProbeOrder) -> Self {
        self.probe_order = probe_order;
        self
    }

    /// Bound on secondary reads in flight for one request. Zero is treated as one.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn probe_order(&self) -> &ProbeOrder {
        &self.probe_order
    }

    pub async fn aggregate_reference(
        &self,
        reference: &ResolvedReference,
    ) -> Result<Aggregation, LookoutError> {
        self.aggregate(reference.identity.canonical()).await
    }

    /// Probe the stores for `id` and snapshot whatever is found.
    ///
    /// # Errors
    ///
    /// [`LookoutError::Dependency`] if the graph store fails during probing.
    /// Nothing else is read in that case.
    pub async fn aggregate(&self, id: &str) -> Result<Aggregation, LookoutError> {
        let Some(entity) = self.find(id).await? else {
            info!(
                event = "Aggregate",
                phase = "notFound",
                id,
                probed = %self.probe_order,
            );
            return Ok(Aggregation::NotFound {
                id: id.to_string(),
                probed: self.probe_order.as_slice().to_vec(),
            });
        };

        let snapshot = self.read_plan(entity).await;
        info!(
            event = "Aggregate",
            phase = "found",
            id,
            kind = %snapshot.resource_type(),
            degraded = snapshot.degraded_cells(),
        );
        Ok(Aggregation::Found(snapshot))
    }

    async fn find(&self, id: &str) -> Result<Option<Entity>, LookoutError> {
        for probe in self.probe_order.iter() {
            debug!(event = "Aggregate", phase = "probe", probe = %probe, id);
            match self.stores.graph.find_by_kind(probe, id).await {
                Ok(Some(entity)) if probe.covers(entity.kind) => return Ok(Some(entity)),
                Ok(Some(entity)) => {
                    warn!(
                        event = "Aggregate",
                        phase = "probe",
                        probe = %probe,
                        id,
                        kind = %entity.kind,
                        "ignoring entity outside the probed kind"
                    );
                    continue;
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        event = "Aggregate",
                        phase = "probe",
                        probe = %probe,
                        id,
                        error = %e,
                        "canonical lookup failed"
                    );
                    return Err(LookoutError::dependency(
                        StoreName::Graph,
                        format!("probe {probe}"),
                        &e,
                    ));
                }
            }
        }
        Ok(None)
    }

    async fn read_plan(&self, mut entity: Entity) -> ResourceSnapshot {
        let kind = entity.kind;
        let id = entity.id.clone();
        let mut builder = SnapshotBuilder::new(kind, id.as_str());

        if kind != IdentityKind::User && kind != IdentityKind::Group {
            let graph = &self.stores.graph;
            let path_info = fetch::document(
                FetchSite::new(StoreName::Graph, facet::PATH_INFO, &id),
                async {
                    graph.add_path_and_parent_id(&mut entity).await?;
                    Ok::<_, StoreError>(entity.path_info())
                },
            )
            .await;
            builder.facet(StoreName::Graph, facet::PATH_INFO, path_info);
        }
        builder.facet(StoreName::Graph, facet::ENTITY, rendered(Some(&entity)));

        let tasks = match kind {
            IdentityKind::User => self.user_reads(&id),
            IdentityKind::Group => {
                for (permission, name) in [
                    (Permission::Read, facet::READ_KEY),
                    (Permission::Write, facet::WRITE_KEY),
                ] {
                    let key = materialized_permission_key(&id, permission);
                    builder.facet(StoreName::SearchIndex, name, rendered(Some(key)));
                }
                self.group_reads(&id)
            }
            IdentityKind::Category => vec![self.document_read(&id)],
            IdentityKind::Folder => self.resource_reads(&id),
            _ => {
                let mut tasks = self.resource_reads(&id);
                tasks.push(self.report_read(&id));
                tasks
            }
        };

        debug!(
            event = "Aggregate",
            phase = "secondary",
            id = id.as_str(),
            reads = tasks.len(),
            limit = self.max_concurrent_fetches,
        );
        let fetched: Vec<Vec<Fetched>> = stream::iter(tasks)
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        for Fetched { store, name, cell } in fetched.into_iter().flatten() {
            match cell {
                Cell::Whole(value) => builder.facet(store, name, value),
                Cell::PerKind(kind, n) => builder.count(store, name, kind, n),
            };
        }
        builder.build()
    }

    fn user_reads<'a>(&'a self, id: &'a str) -> Vec<Task<'a>> {
        let graph = &self.stores.graph;
        let search = &self.stores.search;
        let mut tasks: Vec<Task<'a>> = Vec::new();

        for kind in COUNTED_KINDS {
            tasks.push(
                async move {
                    let site = FetchSite::new(StoreName::Graph, facet::ACCESSIBLE_COUNT, id);
                    let n = fetch::count(site, graph.count_accessible(kind, id)).await;
                    vec![Fetched::per_kind(StoreName::Graph, facet::ACCESSIBLE_COUNT, kind, n)]
                }
                .boxed(),
            );
            for (permission, name) in [
                (Permission::Read, facet::READABLE_COUNT),
                (Permission::Write, facet::WRITEABLE_COUNT),
            ] {
                tasks.push(
                    async move {
                        let kinds = [kind];
                        let site = FetchSite::new(StoreName::SearchIndex, name, id);
                        let read = search.count_accessible_by_user(&kinds, permission, id);
                        let n = fetch::count(site, read).await;
                        vec![Fetched::per_kind(StoreName::SearchIndex, name, kind, n)]
                    }
                    .boxed(),
                );
            }
        }

        for name in [facet::GROUPS_WITH_MEMBERSHIP, facet::GROUPS_WITH_ADMINISTRATOR] {
            tasks.push(
                async move {
                    let site = FetchSite::new(StoreName::Graph, name, id);
                    let value = if name == facet::GROUPS_WITH_MEMBERSHIP {
                        fetch::document(site, graph.groups_of_member(id)).await
                    } else {
                        fetch::document(site, graph.groups_of_administrator(id)).await
                    };
                    vec![Fetched::whole(StoreName::Graph, name, value)]
                }
                .boxed(),
            );
        }

        tasks.push(self.profile_read(id));
        tasks
    }

    /// Profile and realm roles from the identity provider, keyed by the
    /// user's local id.
    fn profile_read<'a>(&'a self, id: &'a str) -> Task<'a> {
        let identity = &self.stores.identity;
        let external_id = self
            .catalog
            .local_id_of(IdentityKind::User, id)
            .into_owned();

        async move {
            let profile: Option<UserProfile> = fetch::best_effort(
                FetchSite::new(StoreName::IdentityProvider, facet::PROFILE, id),
                identity.find_user_profile(&external_id),
            )
            .await;

            let roles: Option<Vec<String>> = match profile {
                Some(_) => {
                    fetch::best_effort(
                        FetchSite::new(StoreName::IdentityProvider, facet::REALM_ROLES, id),
                        async {
                            identity
                                .list_effective_realm_roles(&external_id)
                                .await
                                .map(Some)
                        },
                    )
                    .await
                }
                None => None,
            };

            let profile = profile.map(|mut profile| {
                profile.realm_roles = roles.clone().unwrap_or_default();
                profile
            });

            vec![
                Fetched::whole(StoreName::IdentityProvider, facet::PROFILE, rendered(profile)),
                Fetched::whole(StoreName::IdentityProvider, facet::REALM_ROLES, rendered(roles)),
            ]
        }
        .boxed()
    }

    fn group_reads<'a>(&'a self, id: &'a str) -> Vec<Task<'a>> {
        let graph = &self.stores.graph;
        let search = &self.stores.search;
        vec![
            async move {
                let site = FetchSite::new(StoreName::Graph, facet::GROUP_USERS, id);
                let value = fetch::document(site, graph.group_users(id)).await;
                vec![Fetched::whole(StoreName::Graph, facet::GROUP_USERS, value)]
            }
            .boxed(),
            async move {
                let site = FetchSite::new(StoreName::SearchIndex, facet::RESOURCE_IDS, id);
                let value = fetch::document(site, search.resource_ids_for_group(id)).await;
                vec![Fetched::whole(StoreName::SearchIndex, facet::RESOURCE_IDS, value)]
            }
            .boxed(),
        ]
    }

    /// Grants, materialized grants and the indexed document.
    fn resource_reads<'a>(&'a self, id: &'a str) -> Vec<Task<'a>> {
        let graph = &self.stores.graph;
        vec![
            async move {
                let site = FetchSite::new(StoreName::Graph, facet::PERMISSIONS, id);
                let value = fetch::document(site, graph.get_permissions(id)).await;
                vec![Fetched::whole(StoreName::Graph, facet::PERMISSIONS, value)]
            }
            .boxed(),
            async move {
                let site = FetchSite::new(StoreName::Graph, facet::MATERIALIZED_PERMISSIONS, id);
                let value = fetch::document(site, graph.get_materialized_permissions(id)).await;
                vec![Fetched::whole(StoreName::Graph, facet::MATERIALIZED_PERMISSIONS, value)]
            }
            .boxed(),
            self.document_read(id),
        ]
    }

    fn document_read<'a>(&'a self, id: &'a str) -> Task<'a> {
        let search = &self.stores.search;
        async move {
            let site = FetchSite::new(StoreName::SearchIndex, facet::DOCUMENT, id);
            let value = fetch::document(site, search.get_document_by_id(id)).await;
            vec![Fetched::whole(StoreName::SearchIndex, facet::DOCUMENT, value)]
        }
        .boxed()
    }

    fn report_read<'a>(&'a self, id: &'a str) -> Task<'a> {
        let graph = &self.stores.graph;
        async move {
            let site = FetchSite::new(StoreName::Graph, facet::REPORT, id);
            let value = fetch::document(site, graph.artifact_report(id)).await;
            vec![Fetched::whole(StoreName::Graph, facet::REPORT, value)]
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests;
