//! Best-effort secondary reads.
//!
//! Every read that is not the canonical lookup goes through here: a failing
//! store turns into a sentinel cell and a `warn!`, never into an error.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::StoreError;
use crate::types::{Facet, StoreName, UNAVAILABLE};

/// Value substituted when a store cannot answer.
pub(crate) trait Sentinel {
    fn sentinel() -> Self;
}

impl Sentinel for i64 {
    fn sentinel() -> Self {
        UNAVAILABLE
    }
}

impl<T> Sentinel for Option<T> {
    fn sentinel() -> Self {
        None
    }
}

/// Where a read was headed, for the log line when it fails.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchSite<'a> {
    pub store: StoreName,
    pub facet: &'a str,
    pub id: &'a str,
}

impl<'a> FetchSite<'a> {
    pub(crate) fn new(store: StoreName, facet: &'a str, id: &'a str) -> Self {
        FetchSite { store, facet, id }
    }

    fn degrade<T: Sentinel>(&self, error: &dyn std::fmt::Display) -> T {
        warn!(
            event = "Fetch",
            store = %self.store,
            facet = self.facet,
            id = self.id,
            error = %error,
            "store read failed, reporting sentinel"
        );
        T::sentinel()
    }
}

/// Await `read`, replacing a failure with the sentinel for `T`.
pub(crate) async fn best_effort<T, F>(site: FetchSite<'_>, read: F) -> T
where
    T: Sentinel,
    F: Future<Output = Result<T, StoreError>>,
{
    match read.await {
        Ok(value) => value,
        Err(e) => site.degrade(&e),
    }
}

/// A counter, `-1` when unavailable.
pub(crate) async fn count<F>(site: FetchSite<'_>, read: F) -> i64
where
    F: Future<Output = Result<u64, StoreError>>,
{
    best_effort(site, async {
        read.await
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
    })
    .await
}

/// A structured value, `null` when absent or unavailable.
pub(crate) async fn document<T, F>(site: FetchSite<'_>, read: F) -> Facet
where
    T: Serialize,
    F: Future<Output = Result<T, StoreError>>,
{
    let value: Option<Value> = best_effort(site, async {
        let value = read.await?;
        serde_json::to_value(value)
            .map(|v| (!v.is_null()).then_some(v))
            .map_err(|e| StoreError::Query(format!("unrenderable response: {e}")))
    })
    .await;
    Facet::Document(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site() -> FetchSite<'static> {
        FetchSite::new(StoreName::SearchIndex, "document", "f-1")
    }

    #[tokio::test]
    async fn test_count_passes_values_through() {
        assert_eq!(count(site(), async { Ok(7) }).await, 7);
    }

    #[tokio::test]
    async fn test_count_failure_is_sentinel() {
        let n = count(site(), async { Err(StoreError::Timeout("5s".to_string())) }).await;
        assert_eq!(n, UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_document_found() {
        let facet = document(site(), async { Ok(Some(json!({"name": "x"}))) }).await;
        assert_eq!(facet, Facet::Document(Some(json!({"name": "x"}))));
    }

    #[tokio::test]
    async fn test_document_absent_or_failed_is_null() {
        let absent = document(site(), async { Ok::<Option<Value>, _>(None) }).await;
        assert!(absent.is_null_document());

        let failed = document(site(), async {
            Err::<Vec<String>, _>(StoreError::Unreachable("refused".to_string()))
        })
        .await;
        assert!(failed.is_null_document());
    }

    #[tokio::test]
    async fn test_best_effort_option() {
        let roles: Option<Vec<String>> = best_effort(site(), async {
            Err(StoreError::Unauthorized("token expired".to_string()))
        })
        .await;
        assert!(roles.is_none());
    }
}
