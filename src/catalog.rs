//! The identity kind catalog: parse and validation rules for identifiers.
//!
//! Two textual forms are recognized, tried kind by kind in precedence order:
//!
//! - path form, where the last two path segments are a kind segment and a
//!   local id (`/template-fields/abc-123`, or a full canonical id);
//! - qualified form, `Field::"abc-123"` or `Field::abc-123`.

use once_cell::sync::Lazy;
use regex::Regex;
use strum::IntoEnumIterator;
use tracing::trace;
use url::Url;

use crate::error::LookoutError;
use crate::types::{IdentityKind, ResourceId, split_qualified};

pub const DEFAULT_ID_BASE: &str = "https://repo.example.org/";

pub const MAX_LOCAL_ID_LEN: usize = 256;

static LOCAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._~-]*$").expect("local id pattern"));

static PATH_FORMS: Lazy<Vec<(IdentityKind, Regex)>> = Lazy::new(|| {
    IdentityKind::iter()
        .map(|kind| {
            let pattern = format!(
                r"^(?:[^?#\s]*/)?{}/(?P<local>[^/?#\s]+)/?$",
                regex::escape(kind.segment())
            );
            (kind, Regex::new(&pattern).expect("path form pattern"))
        })
        .collect()
});

/// Whether `s` is acceptable as the kind-local part of an identifier.
pub fn is_valid_local_id(s: &str) -> bool {
    s.len() <= MAX_LOCAL_ID_LEN && LOCAL_ID.is_match(s)
}

/// Parses identifiers and mints canonical ids under one id base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCatalog {
    id_base: String,
}

impl IdentityCatalog {
    /// Create a catalog minting canonical ids under `id_base`.
    ///
    /// The base must be an absolute URL; a trailing `/` is added if missing.
    pub fn new(id_base: &str) -> Result<Self, LookoutError> {
        let url = Url::parse(id_base).map_err(|e| {
            LookoutError::InvalidFormat(format!(
                "id base '{id_base}' is not an absolute URL: {e}"
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(LookoutError::InvalidFormat(format!(
                "id base '{id_base}' cannot be used as a base URL"
            )));
        }

        let mut id_base = id_base.to_string();
        if !id_base.ends_with('/') {
            id_base.push('/');
        }
        Ok(IdentityCatalog { id_base })
    }

    pub fn id_base(&self) -> &str {
        &self.id_base
    }

    /// Parse `s` as any kind; the lowest-precedence-index kind wins.
    pub fn parse(&self, s: &str) -> Option<ResourceId> {
        IdentityKind::iter().find_map(|kind| self.parse_as(kind, s))
    }

    /// Parse `s` as exactly `kind`.
    pub fn parse_as(&self, kind: IdentityKind, s: &str) -> Option<ResourceId> {
        let local = path_form(kind, s).or_else(|| qualified_form(kind, s))?;
        if !is_valid_local_id(local) {
            trace!(event = "Catalog", kind = %kind, local, "rejected local id");
            return None;
        }
        Some(ResourceId::new(kind, local, &self.id_base))
    }

    /// The local id to hand to systems keyed by it, e.g. the identity provider.
    ///
    /// Falls back to `id` unchanged when it is not a `kind` identifier.
    pub fn local_id_of<'a>(&self, kind: IdentityKind, id: &'a str) -> std::borrow::Cow<'a, str> {
        match self.parse_as(kind, id) {
            Some(parsed) => parsed.local_id().to_string().into(),
            None => id.into(),
        }
    }
}

impl Default for IdentityCatalog {
    fn default() -> Self {
        IdentityCatalog {
            id_base: DEFAULT_ID_BASE.to_string(),
        }
    }
}

fn path_form(kind: IdentityKind, s: &str) -> Option<&str> {
    PATH_FORMS
        .iter()
        .find(|(k, _)| *k == kind)
        .and_then(|(_, re)| re.captures(s))
        .and_then(|caps| caps.name("local"))
        .map(|m| m.as_str())
}

fn qualified_form(kind: IdentityKind, s: &str) -> Option<&str> {
    let parts = split_qualified(s)?;
    (parts.type_part == kind.qualified_name()).then_some(parts.id)
}
