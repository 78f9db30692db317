//! Identity kinds, probe kinds and the probe precedence policy.
//!
//! This module centralizes the kind names so that path segments, qualified
//! names and serialized names are defined in exactly one place.

use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::LookoutError;

/// The typed resource categories of the platform, in resolver precedence order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    EnumString,
    AsRefStr,
    StrumDisplay,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum IdentityKind {
    User,
    Group,
    Category,
    Folder,
    Field,
    Element,
    Template,
    Instance,
}

/// Artifact subtypes, in catalog order.
pub const ARTIFACT_KINDS: [IdentityKind; 4] = [
    IdentityKind::Field,
    IdentityKind::Element,
    IdentityKind::Template,
    IdentityKind::Instance,
];

/// Kinds for which per-user permission counters are reported.
pub const COUNTED_KINDS: [IdentityKind; 5] = [
    IdentityKind::Field,
    IdentityKind::Element,
    IdentityKind::Template,
    IdentityKind::Instance,
    IdentityKind::Folder,
];

impl IdentityKind {
    /// Path segment used in canonical ids, e.g. `template-fields`.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
            Self::Category => "categories",
            Self::Folder => "folders",
            Self::Field => "template-fields",
            Self::Element => "template-elements",
            Self::Template => "templates",
            Self::Instance => "template-instances",
        }
    }

    /// Type name used in the qualified form, e.g. `Field::"abc-123"`.
    pub fn qualified_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Category => "Category",
            Self::Folder => "Folder",
            Self::Field => "Field",
            Self::Element => "Element",
            Self::Template => "Template",
            Self::Instance => "Instance",
        }
    }

    pub fn is_artifact(&self) -> bool {
        ARTIFACT_KINDS.contains(self)
    }

    /// Position in resolver precedence; lower wins.
    pub fn precedence(&self) -> usize {
        Self::iter().position(|k| k == *self).unwrap_or(usize::MAX)
    }

    /// The canonical-store probe that finds entities of this kind.
    pub fn probe(&self) -> ProbeKind {
        match self {
            Self::User => ProbeKind::User,
            Self::Group => ProbeKind::Group,
            Self::Category => ProbeKind::Category,
            Self::Folder => ProbeKind::Folder,
            Self::Field | Self::Element | Self::Template | Self::Instance => ProbeKind::Artifact,
        }
    }
}

/// A canonical lookup category in the graph store.
///
/// Artifacts are probed untyped; the entity found carries its concrete subtype.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    EnumString,
    AsRefStr,
    StrumDisplay,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ProbeKind {
    User,
    Group,
    Category,
    Folder,
    Artifact,
}

impl ProbeKind {
    /// Whether an entity of `kind` is an acceptable answer to this probe.
    pub fn covers(&self, kind: IdentityKind) -> bool {
        kind.probe() == *self
    }
}

/// Ordered list of probes tried by the aggregator, first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProbeKind>", into = "Vec<ProbeKind>")]
pub struct ProbeOrder(Vec<ProbeKind>);

impl ProbeOrder {
    /// Build a probe order, rejecting empty lists and repeated probes.
    pub fn new(order: Vec<ProbeKind>) -> Result<Self, LookoutError> {
        if order.is_empty() {
            return Err(LookoutError::InvalidFormat(
                "probe order must name at least one probe".to_string(),
            ));
        }
        if let Some(probe) = order.iter().duplicates().next() {
            return Err(LookoutError::InvalidFormat(format!(
                "probe '{probe}' appears more than once in the probe order"
            )));
        }
        Ok(ProbeOrder(order))
    }

    pub fn iter(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[ProbeKind] {
        &self.0
    }
}

impl Default for ProbeOrder {
    /// User, then Group, Category, Folder and finally untyped Artifact.
    fn default() -> Self {
        ProbeOrder(ProbeKind::iter().collect())
    }
}

impl TryFrom<Vec<ProbeKind>> for ProbeOrder {
    type Error = LookoutError;

    fn try_from(order: Vec<ProbeKind>) -> Result<Self, Self::Error> {
        ProbeOrder::new(order)
    }
}

impl From<ProbeOrder> for Vec<ProbeKind> {
    fn from(order: ProbeOrder) -> Self {
        order.0
    }
}

impl Display for ProbeOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.iter().join(" > "))
    }
}

/// Access level used by the search index permission view.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    AsRefStr,
    StrumDisplay,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Permission {
    Read,
    Write,
}
