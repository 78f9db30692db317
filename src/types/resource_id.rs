//! Typed resource identifiers.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity_kind::IdentityKind;

/// The pieces of a `Type::"id"` literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QualifiedParts<'a> {
    pub type_part: &'a str,
    pub id: &'a str,
}

/// Split `Type::id` or `Type::"id"` into its parts.
///
/// Returns `None` unless there is exactly one `::` separator with a non-empty
/// type on the left. Quotes around the id are stripped only when balanced.
pub(crate) fn split_qualified(s: &str) -> Option<QualifiedParts<'_>> {
    let (type_part, rest) = s.split_once("::")?;
    if type_part.is_empty() || rest.contains("::") {
        return None;
    }

    let id = match rest.strip_prefix('"') {
        Some(inner) => inner.strip_suffix('"')?,
        None => rest,
    };

    Some(QualifiedParts { type_part, id })
}

/// A resolved, validated identifier for one platform resource.
///
/// Only the catalog constructs these, so the local id is always valid for
/// `kind` and `canonical` is always `<id base><segment>/<local id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    kind: IdentityKind,
    local_id: String,
    canonical: String,
}

impl ResourceId {
    pub(crate) fn new(kind: IdentityKind, local_id: impl Into<String>, id_base: &str) -> Self {
        let local_id = local_id.into();
        let canonical = format!("{id_base}{}/{local_id}", kind.segment());
        ResourceId {
            kind,
            local_id,
            canonical,
        }
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// The kind-local part, e.g. `abc-123`.
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// The platform-wide id that stores are keyed by.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Render as `Kind::"local"`.
    pub fn qualified(&self) -> String {
        format!(r#"{}::"{}""#, self.kind.qualified_name(), self.local_id)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.canonical)
    }
}
