//! Platform-wide counters: resource totals per store and queue backlogs.

use futures::future::join_all;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::fetch::{self, FetchSite};
use crate::traits::Stores;
use crate::types::{COUNTED_KINDS, Facet, IdentityKind, StoreFacets, StoreName, facet};

#[derive(Clone)]
pub struct CountsCollector {
    stores: Stores,
    queues: Vec<String>,
}

impl CountsCollector {
    pub fn new(stores: Stores, queues: Vec<String>) -> Self {
        CountsCollector { stores, queues }
    }

    /// Graph totals for every kind, index totals for counted kinds and the
    /// identity provider's user count. Each cell degrades independently.
    pub async fn resource_counts(&self) -> StoreFacets {
        let graph = &self.stores.graph;
        let search = &self.stores.search;

        let graph_totals = join_all(IdentityKind::iter().map(|kind| async move {
            let site = FetchSite::new(StoreName::Graph, facet::TOTAL_COUNT, kind.as_ref());
            (kind, fetch::count(site, graph.total_count(kind)).await)
        }));
        let search_totals = join_all(COUNTED_KINDS.into_iter().map(|kind| async move {
            let site = FetchSite::new(StoreName::SearchIndex, facet::TOTAL_COUNT, kind.as_ref());
            (kind, fetch::count(site, search.total_count(kind)).await)
        }));
        let users = fetch::count(
            FetchSite::new(StoreName::IdentityProvider, facet::USER_COUNT, "*"),
            self.stores.identity.user_count(),
        );
        let (graph_totals, search_totals, users) =
            futures::join!(graph_totals, search_totals, users);

        let mut counts = StoreFacets::default();
        for (kind, n) in graph_totals {
            counts.insert_count(StoreName::Graph, facet::TOTAL_COUNT, kind, n);
        }
        for (kind, n) in search_totals {
            counts.insert_count(StoreName::SearchIndex, facet::TOTAL_COUNT, kind, n);
        }
        counts.insert(StoreName::IdentityProvider, facet::USER_COUNT, Facet::Count(users));

        debug!(
            event = "Counts",
            phase = "resources",
            degraded = counts.sentinel_cells(),
        );
        counts
    }

    /// Length of each configured queue, in configuration order. Empty when
    /// no queue backend is wired.
    pub async fn queue_counts(&self) -> StoreFacets {
        let mut counts = StoreFacets::default();
        let Some(queues) = &self.stores.queues else {
            debug!(event = "Counts", phase = "queues", "no queue backend configured");
            return counts;
        };

        let lengths = join_all(self.queues.iter().map(|name| async move {
            let site = FetchSite::new(StoreName::Queue, name, name);
            (name, fetch::count(site, queues.length(name)).await)
        }))
        .await;

        for (name, n) in lengths {
            counts.insert(StoreName::Queue, name, Facet::Count(n));
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crate::types::UNAVAILABLE;
    use serde_json::json;

    fn queue_names() -> Vec<String> {
        vec!["indexing".to_string(), "missing".to_string()]
    }

    #[tokio::test]
    async fn test_resource_counts() {
        let (stores, _handles) = Fixture::new().into_stores();
        let counts = CountsCollector::new(stores, Vec::new()).resource_counts().await;

        assert_eq!(
            serde_json::to_value(&counts).unwrap(),
            json!({
                "graph": {"totalCount": {
                    "user": 1, "group": 1, "category": 1, "folder": 2,
                    "field": 1, "element": 0, "template": 1, "instance": 0
                }},
                "searchIndex": {"totalCount": {
                    "field": 1, "element": 0, "template": 0, "instance": 0, "folder": 1
                }},
                "identityProvider": {"user": 1}
            })
        );
    }

    #[tokio::test]
    async fn test_resource_counts_degrade_per_cell() {
        let fixture = Fixture::new();
        fixture.recorder.fail("searchIndex.total_count.folder");
        fixture.recorder.fail("identityProvider");
        let (stores, _handles) = fixture.into_stores();

        let counts = CountsCollector::new(stores, Vec::new()).resource_counts().await;
        let search = counts.get(StoreName::SearchIndex, facet::TOTAL_COUNT).unwrap();
        assert_eq!(search.count_for(IdentityKind::Folder), Some(UNAVAILABLE));
        assert_eq!(search.count_for(IdentityKind::Field), Some(1));
        assert_eq!(
            counts.get(StoreName::IdentityProvider, facet::USER_COUNT),
            Some(&Facet::Count(UNAVAILABLE))
        );
        assert_eq!(counts.sentinel_cells(), 2);
    }

    #[tokio::test]
    async fn test_queue_counts() {
        let (stores, _handles) = Fixture::new().into_stores();
        let counts = CountsCollector::new(stores, queue_names()).queue_counts().await;
        assert_eq!(
            serde_json::to_value(&counts).unwrap(),
            json!({"queue": {"indexing": 3, "missing": -1}})
        );
    }

    #[tokio::test]
    async fn test_queue_counts_without_backend() {
        let (mut stores, _handles) = Fixture::new().into_stores();
        stores.queues = None;
        let counts = CountsCollector::new(stores, queue_names()).queue_counts().await;
        assert!(counts.is_empty());
    }
}
