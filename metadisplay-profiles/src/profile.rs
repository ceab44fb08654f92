//! Profile and profile collection types.
//!
//! A [`Profile`] bundles the field rules, content model associations and
//! description rule for one named metadata display configuration. Field rules
//! are stored under codec-encoded keys, in insertion order; weight ordering is
//! applied on read.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use metadisplay_fields::{codec, DescriptionRule, FieldRule};
use serde::{Deserialize, Serialize};

/// One metadata display configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub cmodel_associations: BTreeSet<String>,
    #[serde(default)]
    pub description: DescriptionRule,
    /// Keyed by storage key, not natural field name.
    #[serde(default)]
    pub fields: IndexMap<String, FieldRule>,
}

impl Profile {
    /// A profile with no fields, no content models and a blank description.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty profile carrying `label`.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Look up a field rule by natural field name.
    pub fn field(&self, field_name: &str) -> Option<&FieldRule> {
        self.fields.get(&codec::encode(field_name))
    }

    /// Whether a field with this natural name is configured.
    pub fn has_field(&self, field_name: &str) -> bool {
        self.fields.contains_key(&codec::encode(field_name))
    }

    /// Insert or replace a field rule. A replaced rule keeps its position.
    pub fn upsert_field(&mut self, field_name: &str, rule: FieldRule) {
        self.fields.insert(codec::encode(field_name), rule);
    }

    /// Remove a field rule, keeping the relative order of the others.
    pub fn remove_field(&mut self, field_name: &str) -> Option<FieldRule> {
        self.fields.shift_remove(&codec::encode(field_name))
    }

    /// Natural field names in storage (insertion) order.
    pub fn field_names(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.keys().map(|key| codec::decode(key))
    }

    /// Field rules keyed by natural name, sorted by ascending weight.
    ///
    /// The sort is stable: rules with equal weight keep insertion order.
    pub fn sorted_fields(&self) -> Vec<(String, FieldRule)> {
        let mut fields: Vec<_> = self
            .fields
            .iter()
            .map(|(key, rule)| (codec::decode(key), rule.clone()))
            .collect();
        fields.sort_by_key(|(_, rule)| rule.weight);
        fields
    }
}

/// All profiles, keyed by machine name.
///
/// This is the whole persisted document; the configuration backend loads and
/// saves it as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileCollection {
    #[serde(default)]
    configs: IndexMap<String, Profile>,
}

impl ProfileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.configs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.configs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Insert or replace a profile, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, profile: Profile) -> Option<Profile> {
        self.configs.insert(name.into(), profile)
    }

    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        self.configs.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.configs.iter().map(|(name, profile)| (name.as_str(), profile))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Every `(profile, content model)` pair, in profile order.
    pub fn content_model_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().flat_map(|(name, profile)| {
            profile
                .cmodel_associations
                .iter()
                .map(move |cmodel| (name, cmodel.as_str()))
        })
    }
}

impl FromIterator<(String, Profile)> for ProfileCollection {
    fn from_iter<I: IntoIterator<Item = (String, Profile)>>(iter: I) -> Self {
        Self {
            configs: iter.into_iter().collect(),
        }
    }
}
