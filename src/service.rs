//! The operations a transport exposes, as plain async methods returning
//! status-tagged envelopes.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::config::LookoutConfig;
use crate::counts::CountsCollector;
use crate::envelope::{
    CountsEnvelope, DependencyErrorEnvelope, Envelope, InspectEnvelope, LookupEnvelope,
    NotFoundEnvelope, ResourceInfoEnvelope, Response,
};
use crate::error::LookoutError;
use crate::metrics::{AggregationOutcome, AggregationStats, LookupStats, MetricsSink};
use crate::resolver::Resolver;
use crate::traits::Stores;
use crate::types::{Aggregation, Resolution, ResolutionOutcome};

/// Entry point for lookups and inspections.
///
/// Cheap to clone; holds only immutable configuration and shared adapters,
/// so one instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct Inspector {
    resolver: Resolver,
    aggregator: Aggregator,
    counts: CountsCollector,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl Inspector {
    pub fn new(config: &LookoutConfig, stores: Stores) -> Result<Self, LookoutError> {
        config.validate()?;
        let catalog = config.catalog()?;

        let aggregator = Aggregator::new(stores.clone(), catalog.clone())
            .with_probe_order(config.aggregator.probe_order.clone())
            .with_max_concurrent_fetches(config.aggregator.max_concurrent_fetches);

        info!(
            event = "Inspector",
            id_base = catalog.id_base(),
            probe_order = %config.aggregator.probe_order,
            max_concurrent_fetches = config.aggregator.max_concurrent_fetches,
            "initialized"
        );

        Ok(Inspector {
            resolver: Resolver::new(catalog),
            aggregator,
            counts: CountsCollector::new(stores, config.monitor.queues.clone()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve `input`. Always 200; the envelope says whether it resolved.
    pub fn lookup(&self, input: &str) -> Response {
        let resolution = self.resolve(input);
        Response::ok(Envelope::Lookup(LookupEnvelope::from(&resolution)))
    }

    /// Snapshot the resource with id `id`.
    ///
    /// 404 echoes `id` when no probe matches; 502 when the canonical lookup
    /// itself fails.
    pub async fn resource_info(&self, id: &str) -> Response {
        match self.aggregate(id).await {
            Ok(Aggregation::Found(snapshot)) => Response::ok(Envelope::ResourceInfo(
                ResourceInfoEnvelope::from(&snapshot),
            )),
            Ok(Aggregation::NotFound { id, probed }) => {
                Response::not_found(NotFoundEnvelope::unmatched(&id, &probed))
            }
            Err(e) => Response::bad_gateway(DependencyErrorEnvelope::new(id, &e)),
        }
    }

    /// Resolve `input`, then snapshot what it names.
    ///
    /// 404 and 502 bodies echo `input` as given, with the resolved id in
    /// `canonicalId`.
    pub async fn inspect(&self, input: &str) -> Response {
        let resolution = self.resolve(input);
        let lookup = LookupEnvelope::from(&resolution);

        let reference = match &resolution.outcome {
            ResolutionOutcome::Resolved(reference) => reference,
            ResolutionOutcome::NotFound(failure) => {
                return Response::not_found(NotFoundEnvelope::unresolved(
                    &failure.raw_input,
                    failure.phase,
                ));
            }
        };

        let canonical = reference.identity.canonical();
        match self.aggregate(canonical).await {
            Ok(Aggregation::Found(snapshot)) => {
                Response::ok(Envelope::Inspect(Box::new(InspectEnvelope {
                    lookup,
                    resource: ResourceInfoEnvelope::from(&snapshot),
                })))
            }
            Ok(Aggregation::NotFound { probed, .. }) => Response::not_found(
                NotFoundEnvelope::unmatched(&reference.raw_input, &probed)
                    .with_canonical_id(canonical),
            ),
            Err(e) => Response::bad_gateway(
                DependencyErrorEnvelope::new(&reference.raw_input, &e).with_canonical_id(canonical),
            ),
        }
    }

    pub async fn resource_counts(&self) -> Response {
        let counts = self.counts.resource_counts().await;
        Response::ok(Envelope::Counts(CountsEnvelope::from(&counts)))
    }

    pub async fn queue_counts(&self) -> Response {
        let counts = self.counts.queue_counts().await;
        Response::ok(Envelope::Counts(CountsEnvelope::from(&counts)))
    }

    fn resolve(&self, input: &str) -> Resolution {
        let start = Instant::now();
        let resolution = self.resolver.resolve(input);

        if let Some(sink) = &self.metrics {
            sink.on_lookup(&LookupStats {
                duration: start.elapsed(),
                success: resolution.is_success(),
                source: resolution.reference().map(|r| r.source),
                phase: resolution.failure().map(|f| f.phase),
            });
        }
        resolution
    }

    async fn aggregate(&self, id: &str) -> Result<Aggregation, LookoutError> {
        let start = Instant::now();
        let result = self.aggregator.aggregate(id).await;

        let (outcome, resource_type, degraded_cells) = match &result {
            Ok(Aggregation::Found(snapshot)) => (
                AggregationOutcome::Found,
                Some(snapshot.resource_type()),
                snapshot.degraded_cells(),
            ),
            Ok(Aggregation::NotFound { .. }) => (AggregationOutcome::NotFound, None, 0),
            Err(e) => {
                warn!(event = "Inspector", id, error = %e, "reporting dependency failure");
                (AggregationOutcome::DependencyError, None, 0)
            }
        };

        if let Some(sink) = &self.metrics {
            sink.on_aggregation(&AggregationStats {
                duration: start.elapsed(),
                outcome,
                resource_type,
                degraded_cells,
            });
        }
        result
    }
}
