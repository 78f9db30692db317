use super::*;
use crate::testing::{Fixture, Handles};
use crate::types::ProbeKind;


fn aggregator(fixture: Fixture) -> (Aggregator, Handles) {
    let (stores, handles) = fixture.into_stores();
    (Aggregator::new(stores, IdentityCatalog::default()), handles)
}

async fn found(aggregator: &Aggregator, id: &str) -> ResourceSnapshot {
    match aggregator.aggregate(id).await.unwrap() {
        Aggregation::Found(snapshot) => snapshot,
        other => panic!("expected a snapshot for {id}, got {other:?}"),
    }
}

fn cell<'a>(snapshot: &'a ResourceSnapshot, store: StoreName, name: &str) -> &'a Facet {
    snapshot
        .get(store, name)
        .unwrap_or_else(|| panic!("missing {store}.{name}"))
}
