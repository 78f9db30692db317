//! Turns a free-form reference (URL, path, qualified id, URL with a `ref`
//! style query parameter) into a canonical identity.
//!
//! Three phases run in order and the first success wins:
//!
//! 1. **Path**: the input is an absolute URL whose path is an identifier.
//! 2. **Raw string**: the trimmed input itself is an identifier.
//! 3. **Query parameters**: the input is a URI reference and one of its
//!    query values is an identifier; the first such value in declaration
//!    order wins.
//!
//! Resolution never fails with an error. Malformed input yields a
//! [`ResolutionFailure`] naming the last phase that failed and the last
//! URL parse error seen.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::catalog::IdentityCatalog;
use crate::types::{
    LookupRequest, QueryParameter, Resolution, ResolutionFailure, ResolutionOutcome,
    ResolutionPhase, ResolutionSource, ResolvedReference, ResourceId,
};

/// Base that relative references are resolved against in the query phase.
static PLACEHOLDER_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("http://localhost/").expect("placeholder base URL"));

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    catalog: IdentityCatalog,
}

/// Characters a URI reference may not carry unescaped, and `%` not
/// followed by two hex digits.
static ILLEGAL_URI_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\s"<>\\^`{|}]|%(?:[0-9A-Fa-f]?[^0-9A-Fa-f]|[0-9A-Fa-f]?$)"#)
        .expect("illegal URI character pattern")
});

/// Rejects what a strict RFC 3986 parser would refuse before the lenient
/// WHATWG parser gets to percent-encode it.
fn check_uri_reference(input: &str) -> Result<(), String> {
    match ILLEGAL_URI_CHAR.find(input) {
        Some(m) => Err(format!(
            "illegal character {:?} at index {}",
            m.as_str().chars().next().unwrap_or_default(),
            m.start()
        )),
        None => Ok(()),
    }
}

/// Per-call resolution state.
struct Attempt {
    request: LookupRequest,
    phase: Option<ResolutionPhase>,
    message: Option<String>,
}

impl Attempt {
    fn fail(&mut self, phase: ResolutionPhase, message: Option<String>) {
        debug!(
            event = "Resolve",
            phase = %phase,
            input = self.request.sanitized_input.as_str(),
            message = message.as_deref().unwrap_or(""),
            "phase failed"
        );
        self.phase = Some(phase);
        if message.is_some() {
            self.message = message;
        }
    }
}

impl Resolver {
    pub fn new(catalog: IdentityCatalog) -> Self {
        Resolver { catalog }
    }

    pub fn catalog(&self) -> &IdentityCatalog {
        &self.catalog
    }

    pub fn resolve(&self, input: &str) -> Resolution {
        let sanitized = input.trim();
        let mut attempt = Attempt {
            request: LookupRequest {
                input: input.to_string(),
                sanitized_input: sanitized.to_string(),
                ..Default::default()
            },
            phase: None,
            message: None,
        };

        let found = self
            .from_path(sanitized, &mut attempt)
            .map(|id| (id, ResolutionSource::Path))
            .or_else(|| {
                self.from_raw(sanitized, &mut attempt)
                    .map(|id| (id, ResolutionSource::InputString))
            })
            .or_else(|| {
                self.from_query(sanitized, &mut attempt)
                    .map(|id| (id, ResolutionSource::QueryString))
            });

        let outcome = match found {
            Some((identity, source)) => {
                info!(
                    event = "Resolve",
                    phase = "resolved",
                    source = %source,
                    kind = %identity.kind(),
                    id = identity.canonical(),
                );
                ResolutionOutcome::Resolved(ResolvedReference {
                    kind: identity.kind(),
                    raw_input: input.to_string(),
                    sanitized_input: sanitized.to_string(),
                    source,
                    identity,
                })
            }
            None => {
                let phase = attempt.phase.unwrap_or(ResolutionPhase::ParameterParsing);
                info!(
                    event = "Resolve",
                    phase = "unresolved",
                    last_phase = %phase,
                    input = sanitized,
                );
                ResolutionOutcome::NotFound(ResolutionFailure {
                    raw_input: input.to_string(),
                    sanitized_input: sanitized.to_string(),
                    phase,
                    message: attempt.message.take(),
                })
            }
        };

        Resolution {
            request: attempt.request,
            outcome,
        }
    }

    fn from_path(&self, sanitized: &str, attempt: &mut Attempt) -> Option<ResourceId> {
        let url = match Url::parse(sanitized) {
            Ok(url) => url,
            Err(e) => {
                attempt.fail(ResolutionPhase::PathParsing, Some(e.to_string()));
                return None;
            }
        };

        attempt.request.path = Some(url.path().to_string());
        attempt.request.query_string = url.query().map(str::to_string);

        let id = self.catalog.parse(url.path());
        if id.is_none() {
            attempt.fail(ResolutionPhase::PathParsing, None);
        }
        id
    }

    fn from_raw(&self, sanitized: &str, attempt: &mut Attempt) -> Option<ResourceId> {
        let id = self.catalog.parse(sanitized);
        if id.is_none() {
            attempt.fail(ResolutionPhase::InputParsing, None);
        }
        id
    }

    fn from_query(&self, sanitized: &str, attempt: &mut Attempt) -> Option<ResourceId> {
        let parsed = check_uri_reference(sanitized).and_then(|()| {
            Url::options()
                .base_url(Some(&*PLACEHOLDER_BASE))
                .parse(sanitized)
                .map_err(|e| e.to_string())
        });
        let uri = match parsed {
            Ok(uri) => uri,
            Err(e) => {
                attempt.fail(ResolutionPhase::ParamParsing, Some(e));
                return None;
            }
        };

        let parameters: Vec<QueryParameter> = uri
            .query_pairs()
            .map(|(name, value)| QueryParameter {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect();

        if attempt.request.query_string.is_none() {
            attempt.request.query_string = uri.query().map(str::to_string);
        }

        let id = parameters.iter().find_map(|p| {
            let id = self.catalog.parse(p.value.trim());
            debug!(
                event = "Resolve",
                phase = "queryString",
                parameter = p.name,
                matched = id.is_some(),
            );
            id
        });
        attempt.request.query_parameters = Some(parameters);

        if id.is_none() {
            attempt.fail(ResolutionPhase::ParameterParsing, None);
        }
        id
    }
}
