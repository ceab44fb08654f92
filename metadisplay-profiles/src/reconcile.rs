//! Reconciliation of an edited profile against its persisted state.
//!
//! [`Reconciler::plan`] validates a [`ProfileEdit`] and computes the
//! insert/update/delete operations that move a [`Profile`] to the edited
//! state. Nothing is mutated until the resulting [`ChangeSet`] is applied,
//! so a rejected edit leaves the profile exactly as it was.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use metadisplay_fields::{DescriptionRule, FieldRule, PartialFieldRule};
use tracing::debug;

use crate::catalog::{ContentModelCatalog, FieldCatalog};
use crate::error::ValidationError;
use crate::profile::Profile;

/// Keys to insert, update and delete to turn one key set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDiff {
    /// Only in the proposed set, in proposed order.
    pub to_insert: Vec<String>,
    /// In both sets, in proposed order.
    pub to_update: Vec<String>,
    /// Only in the persisted set, in persisted order.
    pub to_delete: Vec<String>,
}

impl KeyDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Three-way diff of `persisted` against `proposed`, keyed by identity.
///
/// A renamed key shows up as one delete plus one insert.
pub fn diff_keys<'a, P, Q>(persisted: P, proposed: Q) -> KeyDiff
where
    P: IntoIterator<Item = &'a str>,
    Q: IntoIterator<Item = &'a str>,
{
    let persisted: Vec<&str> = persisted.into_iter().collect();
    let proposed: Vec<&str> = proposed.into_iter().collect();
    let in_persisted: HashSet<&str> = persisted.iter().copied().collect();
    let in_proposed: HashSet<&str> = proposed.iter().copied().collect();

    let mut diff = KeyDiff::default();
    for key in &proposed {
        if in_persisted.contains(key) {
            diff.to_update.push(key.to_string());
        } else {
            diff.to_insert.push(key.to_string());
        }
    }
    diff.to_delete = persisted
        .into_iter()
        .filter(|key| !in_proposed.contains(key))
        .map(str::to_string)
        .collect();
    diff
}

/// The proposed state of one profile, as submitted by an editing surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    /// Replaces the profile label when set.
    pub label: Option<String>,
    /// Proposed field rules keyed by natural field name.
    pub fields: IndexMap<String, PartialFieldRule>,
    pub cmodels: BTreeSet<String>,
    pub description: DescriptionRule,
}

impl ProfileEdit {
    /// An edit that proposes exactly the current state of `profile`.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            label: None,
            fields: profile
                .sorted_fields()
                .into_iter()
                .map(|(name, rule)| (name, rule.into()))
                .collect(),
            cmodels: profile.cmodel_associations.clone(),
            description: profile.description.clone(),
        }
    }
}

/// Validated operations for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub label: Option<String>,
    pub fields: KeyDiff,
    /// Normalized rule for every inserted or updated field.
    pub rules: IndexMap<String, FieldRule>,
    pub cmodels: KeyDiff,
    /// Replaces the description rule wholesale.
    pub description: DescriptionRule,
}

impl ChangeSet {
    /// Apply every operation to `profile`.
    ///
    /// Updated fields keep their stored position, inserted fields are
    /// appended in proposed order.
    pub fn apply_to(&self, profile: &mut Profile) {
        for name in &self.fields.to_delete {
            profile.remove_field(name);
        }
        for (name, rule) in &self.rules {
            profile.upsert_field(name, rule.clone());
        }

        for cmodel in &self.cmodels.to_delete {
            profile.cmodel_associations.remove(cmodel);
        }
        profile
            .cmodel_associations
            .extend(self.cmodels.to_insert.iter().cloned());

        profile.description = self.description.clone();
        if let Some(label) = &self.label {
            profile.label = label.clone();
        }
    }
}

/// Validates edits against the field and content model catalogs.
pub struct Reconciler<'a> {
    fields: &'a dyn FieldCatalog,
    content_models: &'a dyn ContentModelCatalog,
}

impl<'a> Reconciler<'a> {
    pub fn new(fields: &'a dyn FieldCatalog, content_models: &'a dyn ContentModelCatalog) -> Self {
        Self {
            fields,
            content_models,
        }
    }

    /// Validate `edit` and compute the operations that bring `current` to it.
    ///
    /// Checks run in this order, and the first failing check rejects the
    /// whole edit:
    /// 1. hyperlink and truncation are not combined on any field
    /// 2. every inserted field, and a non-blank description field, is in the
    ///    field catalog
    /// 3. every added content model is in the content model catalog
    pub fn plan(&self, current: &Profile, edit: ProfileEdit) -> Result<ChangeSet, ValidationError> {
        let ProfileEdit {
            label,
            fields,
            cmodels,
            description,
        } = edit;

        let mut rules: IndexMap<String, FieldRule> = fields
            .into_iter()
            .map(|(name, partial)| {
                let rule = partial.normalize(&name);
                (name, rule)
            })
            .collect();

        let exclusive: Vec<String> = rules
            .iter()
            .filter(|(name, rule)| rule.check_exclusive_options(name).is_err())
            .map(|(name, _)| name.clone())
            .collect();
        if !exclusive.is_empty() {
            return Err(ValidationError::MutuallyExclusiveOptions { fields: exclusive });
        }

        let stored_names: Vec<String> = current.field_names().collect();
        let field_diff = diff_keys(
            stored_names.iter().map(String::as_str),
            rules.keys().map(String::as_str),
        );

        let mut unknown: Vec<String> = field_diff
            .to_insert
            .iter()
            .filter(|name| !self.fields.contains(name))
            .cloned()
            .collect();
        if !description.is_blank()
            && !self.fields.contains(&description.field)
            && !unknown.contains(&description.field)
        {
            unknown.push(description.field.clone());
        }
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownField { fields: unknown });
        }

        let cmodel_diff = diff_keys(
            current.cmodel_associations.iter().map(String::as_str),
            cmodels.iter().map(String::as_str),
        );
        let unknown_cmodels: Vec<String> = cmodel_diff
            .to_insert
            .iter()
            .filter(|cmodel| !self.content_models.contains(cmodel))
            .cloned()
            .collect();
        if !unknown_cmodels.is_empty() {
            return Err(ValidationError::UnknownContentModel {
                content_models: unknown_cmodels,
            });
        }

        for (name, rule) in rules.iter_mut() {
            if !rule.date_format.is_empty() && !self.fields.is_date_field(name) {
                rule.date_format.clear();
            }
        }

        debug!(
            inserted = field_diff.to_insert.len(),
            updated = field_diff.to_update.len(),
            deleted = field_diff.to_delete.len(),
            cmodels_added = cmodel_diff.to_insert.len(),
            cmodels_removed = cmodel_diff.to_delete.len(),
            "planned profile reconciliation"
        );

        Ok(ChangeSet {
            label,
            fields: field_diff,
            rules,
            cmodels: cmodel_diff,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticContentModelCatalog, StaticFieldCatalog};
    use crate::error::ValidationKind;
    use metadisplay_fields::PartialTruncationRule;

    fn field_catalog() -> StaticFieldCatalog {
        StaticFieldCatalog::new()
            .field("A")
            .field("B")
            .field("C")
            .field("dc.title")
            .field("dc.creator")
            .field("dc.subject")
            .date_field("dc.date")
    }

    fn cmodel_catalog() -> StaticContentModelCatalog {
        StaticContentModelCatalog::new()
            .model("cmodelX", "X")
            .model("cmodelY", "Y")
    }

    fn profile_with(fields: &[&str]) -> Profile {
        let mut profile = Profile::labelled("Default");
        for name in fields {
            profile.upsert_field(name, FieldRule::for_field(name));
        }
        profile
    }

    fn edit_with(fields: &[&str]) -> ProfileEdit {
        ProfileEdit {
            fields: fields
                .iter()
                .map(|name| (name.to_string(), PartialFieldRule::default()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn diff_splits_keys_three_ways() {
        let diff = diff_keys(["A", "B"], ["B", "C"]);
        assert_eq!(diff.to_insert, ["C"]);
        assert_eq!(diff.to_update, ["B"]);
        assert_eq!(diff.to_delete, ["A"]);
        assert!(!diff.is_empty());
        assert!(diff_keys([], []).is_empty());
    }

    #[test]
    fn rename_is_delete_plus_insert() {
        let diff = diff_keys(["dc.title"], ["dc.title_s"]);
        assert_eq!(diff.to_insert, ["dc.title_s"]);
        assert!(diff.to_update.is_empty());
        assert_eq!(diff.to_delete, ["dc.title"]);
    }

    #[test]
    fn plan_and_apply_moves_profile_to_edit() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let reconciler = Reconciler::new(&fields, &cmodels);
        let mut profile = profile_with(&["A", "B"]);

        let mut edit = edit_with(&["B", "C"]);
        edit.fields.get_mut("B").unwrap().display_label = Some("Bee".into());
        edit.cmodels.insert("cmodelX".into());
        edit.label = Some("Renamed".into());

        let changes = reconciler.plan(&profile, edit).unwrap();
        assert_eq!(changes.fields.to_insert, ["C"]);
        assert_eq!(changes.fields.to_update, ["B"]);
        assert_eq!(changes.fields.to_delete, ["A"]);
        assert_eq!(changes.cmodels.to_insert, ["cmodelX"]);

        changes.apply_to(&mut profile);
        assert_eq!(profile.field_names().collect::<Vec<_>>(), ["B", "C"]);
        assert_eq!(profile.field("B").unwrap().display_label, "Bee");
        assert_eq!(profile.field("C").unwrap().display_label, "C");
        assert!(profile.cmodel_associations.contains("cmodelX"));
        assert_eq!(profile.label, "Renamed");
    }

    #[test]
    fn update_replaces_the_whole_rule() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let mut profile = profile_with(&["A"]);
        let mut stored = FieldRule::for_field("A");
        stored.hyperlink = true;
        stored.weight = 7;
        profile.upsert_field("A", stored);

        let changes = Reconciler::new(&fields, &cmodels)
            .plan(&profile, edit_with(&["A"]))
            .unwrap();
        changes.apply_to(&mut profile);

        assert_eq!(profile.field("A").unwrap(), &FieldRule::for_field("A"));
    }

    #[test]
    fn one_unknown_field_rejects_the_whole_edit() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let profile = profile_with(&[]);

        let err = Reconciler::new(&fields, &cmodels)
            .plan(&profile, edit_with(&["dc.title", "bogus_field", "dc.creator", "dc.subject"]))
            .unwrap_err();
        assert_eq!(err.kind(), ValidationKind::UnknownField);
        assert_eq!(err.identifiers(), ["bogus_field"]);
    }

    #[test]
    fn stored_fields_missing_from_catalog_are_not_revalidated() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let profile = profile_with(&["retired_field"]);

        let changes = Reconciler::new(&fields, &cmodels)
            .plan(&profile, edit_with(&["retired_field"]))
            .unwrap();
        assert_eq!(changes.fields.to_update, ["retired_field"]);
    }

    #[test]
    fn hyperlink_with_truncation_is_rejected_first() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let profile = profile_with(&[]);

        let mut edit = edit_with(&["bogus_field", "dc.title"]);
        edit.fields.insert(
            "dc.title".into(),
            PartialFieldRule {
                hyperlink: Some(true),
                truncation: Some(PartialTruncationRule {
                    max_length: Some(5),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        let err = Reconciler::new(&fields, &cmodels)
            .plan(&profile, edit)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MutuallyExclusiveOptions {
                fields: vec!["dc.title".into()]
            }
        );
    }

    #[test]
    fn unknown_description_field_is_rejected() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let mut edit = edit_with(&[]);
        edit.description.field = "dc.nope".into();

        let err = Reconciler::new(&fields, &cmodels)
            .plan(&Profile::empty(), edit)
            .unwrap_err();
        assert_eq!(err.kind(), ValidationKind::UnknownField);
        assert_eq!(err.identifiers(), ["dc.nope"]);
    }

    #[test]
    fn unknown_content_model_is_rejected() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let mut edit = edit_with(&[]);
        edit.cmodels.insert("cmodelX".into());
        edit.cmodels.insert("cmodelQ".into());

        let err = Reconciler::new(&fields, &cmodels)
            .plan(&Profile::empty(), edit)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownContentModel {
                content_models: vec!["cmodelQ".into()]
            }
        );
    }

    #[test]
    fn date_format_only_kept_for_date_fields() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let mut edit = edit_with(&[]);
        for name in ["dc.date", "dc.title"] {
            edit.fields.insert(
                name.into(),
                PartialFieldRule {
                    date_format: Some("Y-m-d".into()),
                    ..Default::default()
                },
            );
        }

        let changes = Reconciler::new(&fields, &cmodels)
            .plan(&Profile::empty(), edit)
            .unwrap();
        assert_eq!(changes.rules["dc.date"].date_format, "Y-m-d");
        assert!(changes.rules["dc.title"].date_format.is_empty());
    }

    #[test]
    fn description_and_cmodel_removal_apply() {
        let fields = field_catalog();
        let cmodels = cmodel_catalog();
        let mut profile = profile_with(&["A"]);
        profile.cmodel_associations.insert("cmodelX".into());
        profile.cmodel_associations.insert("retired_cmodel".into());
        profile.description.field = "A".into();

        let mut edit = ProfileEdit::from_profile(&profile);
        edit.cmodels.remove("retired_cmodel");
        edit.description = DescriptionRule::empty();

        let changes = Reconciler::new(&fields, &cmodels)
            .plan(&profile, edit)
            .unwrap();
        assert_eq!(changes.cmodels.to_delete, ["retired_cmodel"]);
        changes.apply_to(&mut profile);

        assert_eq!(
            profile.cmodel_associations.iter().collect::<Vec<_>>(),
            ["cmodelX"]
        );
        assert!(profile.description.is_blank());
        assert_eq!(profile.label, "Default");
    }
}
