//! Response envelopes.
//!
//! Everything here is pure assembly: resolver and aggregator results in,
//! serializable documents out. Field names are the wire names.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LookoutError;
use crate::types::{
    Facet, IdentityKind, LookupRequest, ProbeKind, Resolution, ResolutionOutcome,
    ResolutionPhase, ResolutionSource, ResourceId, ResourceSnapshot, StoreFacets, StoreName,
};

pub const RESOURCE_NOT_FOUND: &str = "resourceNotFound";
pub const DEPENDENCY_UNAVAILABLE: &str = "dependencyUnavailable";

/// Outcome of resolving one input.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookupEnvelope {
    pub input: String,
    pub sanitized_input: String,
    pub source: Option<ResolutionSource>,
    pub resource_id: Option<ResourceId>,
    /// Canonical id, or `""` when unresolved.
    pub resource_id_string: String,
    pub success: bool,
    pub error_phase: Option<ResolutionPhase>,
    pub exception_message: Option<String>,
    pub request: LookupRequest,
}

impl From<&Resolution> for LookupEnvelope {
    fn from(resolution: &Resolution) -> Self {
        let request = resolution.request.clone();
        match &resolution.outcome {
            ResolutionOutcome::Resolved(reference) => LookupEnvelope {
                input: reference.raw_input.clone(),
                sanitized_input: reference.sanitized_input.clone(),
                source: Some(reference.source),
                resource_id: Some(reference.identity.clone()),
                resource_id_string: reference.identity.canonical().to_string(),
                success: true,
                error_phase: None,
                exception_message: None,
                request,
            },
            ResolutionOutcome::NotFound(failure) => LookupEnvelope {
                input: failure.raw_input.clone(),
                sanitized_input: failure.sanitized_input.clone(),
                source: None,
                resource_id: None,
                resource_id_string: String::new(),
                success: false,
                error_phase: Some(failure.phase),
                exception_message: failure.message.clone(),
                request,
            },
        }
    }
}

/// Facets grouped under one key per store; absent stores are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreSections {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub graph: Option<BTreeMap<String, Facet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub search_index: Option<BTreeMap<String, Facet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub identity_provider: Option<BTreeMap<String, Facet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub queue: Option<BTreeMap<String, Facet>>,
}

impl From<&StoreFacets> for StoreSections {
    fn from(facets: &StoreFacets) -> Self {
        let section = |store| facets.store(store).cloned();
        StoreSections {
            graph: section(StoreName::Graph),
            search_index: section(StoreName::SearchIndex),
            identity_provider: section(StoreName::IdentityProvider),
            queue: section(StoreName::Queue),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfoEnvelope {
    pub resource_type: IdentityKind,
    pub resource_id: String,
    #[serde(flatten)]
    pub stores: StoreSections,
}

impl From<&ResourceSnapshot> for ResourceInfoEnvelope {
    fn from(snapshot: &ResourceSnapshot) -> Self {
        ResourceInfoEnvelope {
            resource_type: snapshot.resource_type(),
            resource_id: snapshot.resource_id().to_string(),
            stores: StoreSections::from(snapshot.facets()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InspectEnvelope {
    pub lookup: LookupEnvelope,
    pub resource: ResourceInfoEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundEnvelope {
    /// The id or input as given.
    pub id: String,
    pub error_key: String,
    pub error_message: String,
    pub probed: Vec<ProbeKind>,
    /// Set when the input never resolved to an identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_phase: Option<ResolutionPhase>,
    /// Set when `id` is an operator input that resolved to this identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
}

impl NotFoundEnvelope {
    /// No probe matched `id`.
    pub fn unmatched(id: &str, probed: &[ProbeKind]) -> Self {
        NotFoundEnvelope {
            id: id.to_string(),
            error_key: RESOURCE_NOT_FOUND.to_string(),
            error_message: format!("no resource found for id '{id}'"),
            probed: probed.to_vec(),
            error_phase: None,
            canonical_id: None,
        }
    }

    /// `input` did not resolve, so nothing was probed.
    pub fn unresolved(input: &str, phase: ResolutionPhase) -> Self {
        NotFoundEnvelope {
            id: input.to_string(),
            error_key: RESOURCE_NOT_FOUND.to_string(),
            error_message: format!("'{input}' is not a recognizable resource reference"),
            probed: Vec::new(),
            error_phase: Some(phase),
            canonical_id: None,
        }
    }

    pub fn with_canonical_id(mut self, canonical_id: &str) -> Self {
        self.canonical_id = Some(canonical_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyErrorEnvelope {
    pub id: String,
    pub error_key: String,
    pub store: Option<StoreName>,
    pub operation: Option<String>,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
}

impl DependencyErrorEnvelope {
    pub fn new(id: &str, err: &LookoutError) -> Self {
        let (store, operation, error_message) = match err {
            LookoutError::Dependency {
                store,
                operation,
                message,
            } => (Some(*store), Some(operation.clone()), message.clone()),
            other => (None, None, other.to_string()),
        };
        DependencyErrorEnvelope {
            id: id.to_string(),
            error_key: DEPENDENCY_UNAVAILABLE.to_string(),
            store,
            operation,
            error_message,
            canonical_id: None,
        }
    }

    pub fn with_canonical_id(mut self, canonical_id: &str) -> Self {
        self.canonical_id = Some(canonical_id.to_string());
        self
    }
}

/// Platform-wide counters, grouped by store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CountsEnvelope {
    #[serde(flatten)]
    pub stores: StoreSections,
}

impl From<&StoreFacets> for CountsEnvelope {
    fn from(facets: &StoreFacets) -> Self {
        CountsEnvelope {
            stores: StoreSections::from(facets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Lookup(LookupEnvelope),
    ResourceInfo(ResourceInfoEnvelope),
    Inspect(Box<InspectEnvelope>),
    NotFound(NotFoundEnvelope),
    DependencyError(DependencyErrorEnvelope),
    Counts(CountsEnvelope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    Ok,
    NotFound,
    BadGateway,
}

impl ResponseStatus {
    pub fn code(&self) -> u16 {
        match self {
            ResponseStatus::Ok => 200,
            ResponseStatus::NotFound => 404,
            ResponseStatus::BadGateway => 502,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: ResponseStatus,
    pub envelope: Envelope,
}

impl Response {
    pub fn ok(envelope: Envelope) -> Self {
        Response {
            status: ResponseStatus::Ok,
            envelope,
        }
    }

    pub fn not_found(envelope: NotFoundEnvelope) -> Self {
        Response {
            status: ResponseStatus::NotFound,
            envelope: Envelope::NotFound(envelope),
        }
    }

    pub fn bad_gateway(envelope: DependencyErrorEnvelope) -> Self {
        Response {
            status: ResponseStatus::BadGateway,
            envelope: Envelope::DependencyError(envelope),
        }
    }

    pub fn code(&self) -> u16 {
        self.status.code()
    }

    /// The envelope as the JSON body a transport would send.
    pub fn body(&self) -> serde_json::Value {
        serde_json::to_value(&self.envelope).unwrap_or(serde_json::Value::Null)
    }
}
