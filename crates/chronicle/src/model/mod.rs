//! Static audit metadata: versioned entities and their relations.
//!
//! Everything here is configured once (usually from TOML) and read-only
//! afterwards.

pub mod entity;
pub mod relation;

pub use entity::{EntityModel, ToOneModel};
pub use relation::{ElementEncoding, RelationDescriptor, RelationKind};
