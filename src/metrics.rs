//! Vendor-agnostic metrics collection via a pluggable sink.
//!
//! Implement [`MetricsSink`] and hand it to [`crate::Inspector::with_metrics`]
//! to receive one event per lookup and one per aggregation, without tying the
//! library to a metrics backend (Prometheus, OpenTelemetry, ...).
//!
//! ```ignore
//! use lookout_core::metrics::{AggregationStats, LookupStats, MetricsSink};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Counter {
//!     lookups: AtomicU64,
//! }
//!
//! impl MetricsSink for Counter {
//!     fn on_lookup(&self, _stats: &LookupStats) {
//!         self.lookups.fetch_add(1, Ordering::Relaxed);
//!     }
//!
//!     fn on_aggregation(&self, stats: &AggregationStats) {
//!         eprintln!("{:?} in {:?}", stats.outcome, stats.duration);
//!     }
//! }
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::types::{IdentityKind, ResolutionPhase, ResolutionSource};

/// One resolver call.
#[derive(Debug, Clone, Serialize)]
pub struct LookupStats {
    /// Wall-clock time spent resolving.
    pub duration: Duration,
    pub success: bool,
    /// The phase that matched, on success.
    pub source: Option<ResolutionSource>,
    /// The last phase that failed, on failure.
    pub phase: Option<ResolutionPhase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationOutcome {
    Found,
    NotFound,
    DependencyError,
}

/// One aggregator call, from first probe to merged snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationStats {
    pub duration: Duration,
    pub outcome: AggregationOutcome,
    /// Kind of the resource found, if any.
    pub resource_type: Option<IdentityKind>,
    /// Sentinel cells in the snapshot.
    pub degraded_cells: usize,
}

/// Consumer of lookup and aggregation events.
///
/// Called synchronously on the request path, so implementations should
/// return quickly. Must be thread-safe: requests run in parallel.
pub trait MetricsSink: Send + Sync {
    fn on_lookup(&self, stats: &LookupStats);

    fn on_aggregation(&self, stats: &AggregationStats);
}
