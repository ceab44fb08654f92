//! Field display rules for metadata display profiles
//!
//! `metadisplay-fields` is a schema-only crate: it describes how one Solr field
//! is displayed (label, hyperlink, truncation, permission gating) and how a
//! field name is turned into a key the configuration backend can store. It
//! performs no I/O; `metadisplay-profiles` owns persistence.
//!
//! # Architecture
//!
//! - **Codec**: `encode`/`decode` swap periods in Solr field names for a
//!   reserved token so names can be used as storage path segments
//! - **Typed rules**: `FieldRule`, `TruncationRule` and `DescriptionRule`
//!   replace loosely-typed nested maps
//! - **Single normalization point**: submissions arrive as `PartialFieldRule`
//!   and `normalize()` is the only place defaults are applied

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{decode, encode, PERIOD_REPLACEMENT};
pub use error::RuleViolation;
pub use types::{
    DescriptionRule, FieldRule, PartialFieldRule, PartialTruncationRule, TruncationRule,
    TruncationType, PENDING_FIELD_WEIGHT,
};
