// src/lib.rs
pub use aggregator::{Aggregator, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use catalog::{DEFAULT_ID_BASE, IdentityCatalog, MAX_LOCAL_ID_LEN, is_valid_local_id};
pub use config::{
    AggregatorConfig, CatalogConfig, ConfigError, LoggingConfig, LookoutConfig, MonitorConfig,
};
pub use counts::CountsCollector;
pub use envelope::{
    CountsEnvelope, DependencyErrorEnvelope, Envelope, InspectEnvelope, LookupEnvelope,
    NotFoundEnvelope, ResourceInfoEnvelope, Response, ResponseStatus, StoreSections,
};
pub use error::{LookoutError, StoreError};
pub use logging::{LogFormat, init_tracing};
pub use resolver::Resolver;
pub use service::Inspector;
pub use traits::{GraphStore, IdentityProvider, QueueBackend, SearchIndex, Stores};
pub use types::*;

mod aggregator;
mod catalog;
mod config;
mod counts;
pub mod envelope;
mod error;
mod fetch;
mod logging;
pub mod metrics;
mod resolver;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;
