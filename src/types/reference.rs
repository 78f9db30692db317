//! Resolver outcomes: the resolved reference, the failure report and the
//! request trace recorded while resolving.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use super::identity_kind::IdentityKind;
use super::resource_id::ResourceId;

/// Which resolver phase produced the match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ResolutionSource {
    Path,
    InputString,
    QueryString,
}

/// The phase that last failed while resolving.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ResolutionPhase {
    /// The input is not a URL, or its path is not an identifier.
    PathParsing,
    /// The sanitized input itself is not an identifier.
    InputParsing,
    /// The input is not a URI, so no query parameters could be read.
    ParamParsing,
    /// No query parameter value is an identifier.
    ParameterParsing,
}

/// One decoded query-string pair, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueryParameter {
    pub name: String,
    pub value: String,
}

/// Everything the resolver learned about the input, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub input: String,
    pub sanitized_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<Vec<QueryParameter>>,
}

/// A successfully resolved input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    pub kind: IdentityKind,
    pub raw_input: String,
    pub sanitized_input: String,
    pub source: ResolutionSource,
    pub identity: ResourceId,
}

/// Why an input could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFailure {
    pub raw_input: String,
    pub sanitized_input: String,
    pub phase: ResolutionPhase,
    /// The last URL/URI parse error, if any phase hit one.
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(ResolvedReference),
    NotFound(ResolutionFailure),
}

/// The full result of one `Resolver::resolve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub request: LookupRequest,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Resolved(_))
    }

    pub fn reference(&self) -> Option<&ResolvedReference> {
        match &self.outcome {
            ResolutionOutcome::Resolved(reference) => Some(reference),
            ResolutionOutcome::NotFound(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match &self.outcome {
            ResolutionOutcome::Resolved(_) => None,
            ResolutionOutcome::NotFound(failure) => Some(failure),
        }
    }
}
