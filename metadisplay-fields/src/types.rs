//! Field display rules.
//!
//! A [`FieldRule`] is the complete display configuration for one Solr field
//! inside a profile. Submissions arrive as [`PartialFieldRule`] values where
//! every attribute may be omitted; [`PartialFieldRule::normalize`] is the one
//! place defaults are filled in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RuleViolation;

/// Weight given to rows added during an editing session so they sort last.
pub const PENDING_FIELD_WEIGHT: i32 = 10_000;

/// How truncation applies to a multi-valued field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TruncationType {
    /// Each value is truncated on its own.
    #[default]
    SeparateValueOption,
    /// The joined field value is truncated as a whole.
    WholeFieldOption,
}

/// Truncation settings shared by field rules and the description rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TruncationRule {
    #[serde(default)]
    pub truncation_type: TruncationType,
    /// Maximum rendered length; `0` disables truncation.
    #[serde(default)]
    pub max_length: u32,
    #[serde(default)]
    pub word_safe: bool,
    #[serde(default)]
    pub ellipsis: bool,
    /// Only consulted when `word_safe` is set.
    #[serde(default)]
    pub min_wordsafe_length: u32,
}

impl TruncationRule {
    /// A truncation rule with every attribute at its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this rule shortens values at all.
    pub fn is_enabled(&self) -> bool {
        self.max_length > 0
    }
}

/// Display configuration for a single field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRule {
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub display_label: String,
    #[serde(default)]
    pub hyperlink: bool,
    /// Field whose value replaces a URI or PID value when rendering.
    #[serde(default)]
    pub uri_replacement: String,
    /// Only meaningful for date fields.
    #[serde(default)]
    pub date_format: String,
    #[serde(default)]
    pub enable_permissions: bool,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub truncation: TruncationRule,
}

impl FieldRule {
    /// An unlabelled field rule with every attribute at its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default rule for `field_name`: its label is the field name itself.
    pub fn for_field(field_name: &str) -> Self {
        Self {
            display_label: field_name.to_string(),
            ..Self::default()
        }
    }

    /// Permissions that gate this field, or `None` when gating is off.
    pub fn effective_permissions(&self) -> Option<&BTreeSet<String>> {
        self.enable_permissions.then_some(&self.permissions)
    }

    /// Hyperlinking and truncation cannot be combined on one field.
    pub fn check_exclusive_options(&self, field_name: &str) -> Result<(), RuleViolation> {
        if self.hyperlink && self.truncation.is_enabled() {
            return Err(RuleViolation::MutuallyExclusiveOptions {
                field: field_name.to_string(),
            });
        }
        Ok(())
    }
}

/// The field rendered beneath an object's content, with its label.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DescriptionRule {
    #[serde(rename = "description_field")]
    pub field: String,
    #[serde(rename = "description_label")]
    pub label: String,
    pub truncation: TruncationRule,
}

impl DescriptionRule {
    /// A blank description rule.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no description field has been chosen.
    pub fn is_blank(&self) -> bool {
        self.field.is_empty()
    }
}

/// A truncation submission with any attribute omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialTruncationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_type: Option<TruncationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_safe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ellipsis: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_wordsafe_length: Option<u32>,
}

impl PartialTruncationRule {
    /// Overlay the attributes present in `self` on top of `base`.
    pub fn merged_over(self, base: &TruncationRule) -> TruncationRule {
        TruncationRule {
            truncation_type: self.truncation_type.unwrap_or(base.truncation_type),
            max_length: self.max_length.unwrap_or(base.max_length),
            word_safe: self.word_safe.unwrap_or(base.word_safe),
            ellipsis: self.ellipsis.unwrap_or(base.ellipsis),
            min_wordsafe_length: self.min_wordsafe_length.unwrap_or(base.min_wordsafe_length),
        }
    }

    /// Fill every omitted attribute with its default.
    pub fn normalize(self) -> TruncationRule {
        self.merged_over(&TruncationRule::empty())
    }
}

impl From<TruncationRule> for PartialTruncationRule {
    fn from(rule: TruncationRule) -> Self {
        Self {
            truncation_type: Some(rule.truncation_type),
            max_length: Some(rule.max_length),
            word_safe: Some(rule.word_safe),
            ellipsis: Some(rule.ellipsis),
            min_wordsafe_length: Some(rule.min_wordsafe_length),
        }
    }
}

/// A field rule submission with any attribute omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartialFieldRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_permissions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation: Option<PartialTruncationRule>,
}

impl PartialFieldRule {
    /// Overlay the attributes present in `self` on top of `base`.
    ///
    /// A partial truncation block is merged attribute by attribute rather
    /// than replacing the base truncation wholesale.
    pub fn merged_over(self, base: &FieldRule) -> FieldRule {
        let truncation = match self.truncation {
            Some(partial) => partial.merged_over(&base.truncation),
            None => base.truncation.clone(),
        };
        FieldRule {
            weight: self.weight.unwrap_or(base.weight),
            display_label: self
                .display_label
                .unwrap_or_else(|| base.display_label.clone()),
            hyperlink: self.hyperlink.unwrap_or(base.hyperlink),
            uri_replacement: self
                .uri_replacement
                .unwrap_or_else(|| base.uri_replacement.clone()),
            date_format: self
                .date_format
                .unwrap_or_else(|| base.date_format.clone()),
            enable_permissions: self.enable_permissions.unwrap_or(base.enable_permissions),
            permissions: self
                .permissions
                .unwrap_or_else(|| base.permissions.clone()),
            truncation,
        }
    }

    /// Fill every omitted attribute with its default for `field_name`.
    ///
    /// The label defaults to the field name. Normalizing an already
    /// normalized rule returns it unchanged.
    pub fn normalize(self, field_name: &str) -> FieldRule {
        self.merged_over(&FieldRule::for_field(field_name))
    }

    /// The partial rule for a field freshly added to an editing session.
    pub fn pending(field_name: &str) -> Self {
        Self {
            weight: Some(PENDING_FIELD_WEIGHT),
            display_label: Some(field_name.to_string()),
            ..Self::default()
        }
    }
}

impl From<FieldRule> for PartialFieldRule {
    fn from(rule: FieldRule) -> Self {
        Self {
            weight: Some(rule.weight),
            display_label: Some(rule.display_label),
            hyperlink: Some(rule.hyperlink),
            uri_replacement: Some(rule.uri_replacement),
            date_format: Some(rule.date_format),
            enable_permissions: Some(rule.enable_permissions),
            permissions: Some(rule.permissions),
            truncation: Some(rule.truncation.into()),
        }
    }
}
