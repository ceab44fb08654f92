//! # Metadata display profiles
//!
//! Named metadata display profiles bundle the display rules for Solr fields,
//! the content models the profile applies to, and a description rule.
//!
//! ## Architecture
//!
//! - [`AssociationStore`] holds the profile collection and persists it
//!   through a [`ConfigBackend`] (YAML on disk, or in memory)
//! - [`Reconciler`] validates an edited [`ProfileEdit`] against the field
//!   and content model catalogs and plans the insert/update/delete
//!   operations
//! - [`IndexSynchronizer`] is a post-commit hook that rebuilds the derived
//!   `(profile, content model)` index after every save
//! - [`MetadataDisplay`] ties these together for an editing surface
//!
//! ## Usage
//!
//! ```rust,ignore
//! let settings = MetadataDisplaySettings::load(None)?;
//! let display = MetadataDisplay::open(root, settings, fields, cmodels).await?;
//!
//! display.create_profile("default", "Default").await?;
//! let mut set = display.working_set("default").await?;
//! set.add_field("dc.title", fields.as_ref())?;
//! display.save_field_edits("default", set.into_edit()).await?;
//! ```

pub mod backend;
pub mod catalog;
pub mod error;
pub mod index;
pub mod profile;
pub mod reconcile;
pub mod service;
pub mod settings;
pub mod store;
pub mod sync;
pub mod working_set;

pub use backend::{ConfigBackend, MemoryConfigBackend, YamlConfigBackend};
pub use catalog::{
    ContentModelCatalog, FieldCatalog, FieldKind, StaticContentModelCatalog, StaticFieldCatalog,
};
pub use error::{
    ErrorSeverity, IndexError, ProfilesError, Result, Severity, ValidationError, ValidationKind,
};
pub use index::{AssociationIndex, IndexRow, SqliteAssociationIndex};
pub use profile::{Profile, ProfileCollection};
pub use reconcile::{diff_keys, ChangeSet, KeyDiff, ProfileEdit, Reconciler};
pub use service::MetadataDisplay;
pub use settings::{DisplaySettings, MetadataDisplaySettings, StorageSettings};
pub use store::{validate_machine_name, AssociationStore, CommitHook, Committed};
pub use sync::IndexSynchronizer;
pub use working_set::{WorkingField, WorkingSet};

pub use metadisplay_fields::{
    DescriptionRule, FieldRule, PartialFieldRule, PartialTruncationRule, TruncationRule,
    TruncationType,
};
