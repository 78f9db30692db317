//! Data model types for resolution and aggregation.
//!
//! Canonical string forms:
//! - Canonical id: `<id base><segment>/<local id>`, e.g.
//!   `https://repo.example.org/template-fields/abc-123`
//! - Path form: `.../template-fields/abc-123`
//! - Qualified form: `Field::"abc-123"` or `Field::abc-123`
//!
//! Quoting rules: the local id in the qualified form may be quoted; parsing
//! accepts both quoted and unquoted forms.

mod entity;
mod identity_kind;
mod reference;
mod resource_id;
mod snapshot;

pub use entity::{
    Entity, GroupExtract, GroupMember, GroupUsers, MaterializedPermissionsView, PathInfo,
    PermissionGrant, PermissionsView, UserProfile, materialized_permission_key,
};
pub use identity_kind::{
    ARTIFACT_KINDS, COUNTED_KINDS, IdentityKind, Permission, ProbeKind, ProbeOrder,
};
pub use reference::{
    LookupRequest, QueryParameter, Resolution, ResolutionFailure, ResolutionOutcome,
    ResolutionPhase, ResolutionSource, ResolvedReference,
};
pub use resource_id::ResourceId;
pub(crate) use resource_id::split_qualified;
pub use snapshot::{
    Aggregation, Facet, ResourceSnapshot, StoreFacets, StoreName, UNAVAILABLE, facet,
};
pub(crate) use snapshot::SnapshotBuilder;
