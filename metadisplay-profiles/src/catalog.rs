//! Field and content model catalogs.
//!
//! The catalogs are external collaborators: the Solr schema decides which
//! fields exist and the repository decides which content models exist. They
//! are passed to the reconciler explicitly rather than looked up globally.

use std::collections::HashMap;

use indexmap::IndexMap;

/// Lookup of fields known to the search index.
pub trait FieldCatalog: Send + Sync {
    /// Whether `field_name` is currently a valid field.
    fn contains(&self, field_name: &str) -> bool;

    /// Whether `field_name` holds dates, so a date format applies to it.
    fn is_date_field(&self, field_name: &str) -> bool;
}

/// Lookup of content models that profiles can be associated with.
pub trait ContentModelCatalog: Send + Sync {
    /// All known content model identifiers with their display names.
    fn content_models(&self) -> IndexMap<String, String>;

    fn contains(&self, content_model: &str) -> bool {
        self.content_models().contains_key(content_model)
    }
}

/// Kind of a catalogued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
}

/// A field catalog built from a fixed list, e.g. a cached schema listing.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldCatalog {
    fields: HashMap<String, FieldKind>,
}

impl StaticFieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-date field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldKind::Text);
        self
    }

    /// Add a date field.
    pub fn date_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldKind::Date);
        self
    }
}

impl FieldCatalog for StaticFieldCatalog {
    fn contains(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }

    fn is_date_field(&self, field_name: &str) -> bool {
        self.fields.get(field_name) == Some(&FieldKind::Date)
    }
}

/// A content model catalog built from a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticContentModelCatalog {
    models: IndexMap<String, String>,
}

impl StaticContentModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a content model with its display name.
    pub fn model(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.models.insert(id.into(), label.into());
        self
    }
}

impl ContentModelCatalog for StaticContentModelCatalog {
    fn content_models(&self) -> IndexMap<String, String> {
        self.models.clone()
    }

    fn contains(&self, content_model: &str) -> bool {
        self.models.contains_key(content_model)
    }
}
