//! An in-progress edit of one profile.
//!
//! The editing surface builds a [`WorkingSet`] from the stored profile, adds
//! and removes rows as the administrator works, and finally turns it into a
//! [`ProfileEdit`] for the reconciler.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use metadisplay_fields::{DescriptionRule, PartialFieldRule};
use tracing::trace;

use crate::catalog::{ContentModelCatalog, FieldCatalog};
use crate::error::ValidationError;
use crate::profile::Profile;
use crate::reconcile::ProfileEdit;

/// A field row in a working set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingField {
    pub rule: PartialFieldRule,
    /// Added during this session and not yet saved.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSet {
    pub label: String,
    fields: IndexMap<String, WorkingField>,
    cmodels: BTreeSet<String>,
    pub description: DescriptionRule,
}

impl WorkingSet {
    /// Start a session from the stored profile, rows in display order.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            label: profile.label.clone(),
            fields: profile
                .sorted_fields()
                .into_iter()
                .map(|(name, rule)| {
                    let row = WorkingField {
                        rule: rule.into(),
                        pending: false,
                    };
                    (name, row)
                })
                .collect(),
            cmodels: profile.cmodel_associations.clone(),
            description: profile.description.clone(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &WorkingField)> {
        self.fields.iter().map(|(name, row)| (name.as_str(), row))
    }

    /// The editable rule of a row.
    pub fn field_mut(&mut self, field_name: &str) -> Option<&mut PartialFieldRule> {
        self.fields.get_mut(field_name).map(|row| &mut row.rule)
    }

    pub fn content_models(&self) -> impl Iterator<Item = &str> {
        self.cmodels.iter().map(String::as_str)
    }

    /// Append a pending row for `field_name`, sorted after every stored row.
    pub fn add_field(
        &mut self,
        field_name: &str,
        catalog: &dyn FieldCatalog,
    ) -> Result<(), ValidationError> {
        if !catalog.contains(field_name) {
            return Err(ValidationError::UnknownField {
                fields: vec![field_name.to_string()],
            });
        }
        if self.fields.contains_key(field_name) {
            return Err(ValidationError::DuplicateField {
                field: field_name.to_string(),
            });
        }
        self.fields.insert(
            field_name.to_string(),
            WorkingField {
                rule: PartialFieldRule::pending(field_name),
                pending: true,
            },
        );
        trace!(field = %field_name, "added pending field");
        Ok(())
    }

    /// Remove the selected field rows; returns how many were removed.
    pub fn remove_selected_fields(&mut self, selected: &[String]) -> Result<usize, ValidationError> {
        let matching: Vec<&String> = selected
            .iter()
            .filter(|name| self.fields.contains_key(name.as_str()))
            .collect();
        if matching.is_empty() {
            return Err(ValidationError::NoSelection);
        }
        let removed = matching.len();
        for name in matching {
            self.fields.shift_remove(name.as_str());
        }
        Ok(removed)
    }

    /// Associate a content model, if the catalog knows it.
    pub fn add_content_model(
        &mut self,
        content_model: &str,
        catalog: &dyn ContentModelCatalog,
    ) -> Result<(), ValidationError> {
        if !catalog.contains(content_model) {
            return Err(ValidationError::UnknownContentModel {
                content_models: vec![content_model.to_string()],
            });
        }
        self.cmodels.insert(content_model.to_string());
        Ok(())
    }

    /// Remove the selected content models; returns how many were removed.
    pub fn remove_selected_content_models(
        &mut self,
        selected: &[String],
    ) -> Result<usize, ValidationError> {
        let removed = selected
            .iter()
            .filter(|cmodel| self.cmodels.remove(cmodel.as_str()))
            .count();
        if removed == 0 {
            return Err(ValidationError::NoSelection);
        }
        Ok(removed)
    }

    /// Drop the pending markers and hand the rows to the reconciler.
    pub fn into_edit(self) -> ProfileEdit {
        ProfileEdit {
            label: Some(self.label),
            fields: self
                .fields
                .into_iter()
                .map(|(name, row)| (name, row.rule))
                .collect(),
            cmodels: self.cmodels,
            description: self.description,
        }
    }
}
