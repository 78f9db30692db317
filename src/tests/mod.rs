use std::sync::Arc;

use crate::testing::{Fixture, Handles};
use crate::{Inspector, LookoutConfig};


fn inspector(fixture: Fixture) -> (Inspector, Handles) {
    inspector_with(fixture, LookoutConfig::default())
}

fn inspector_with(fixture: Fixture, config: LookoutConfig) -> (Inspector, Handles) {
    let (stores, handles) = fixture.into_stores();
    (Inspector::new(&config, stores).unwrap(), handles)
}

fn shared(inspector: Inspector) -> Arc<Inspector> {
    Arc::new(inspector)
}
