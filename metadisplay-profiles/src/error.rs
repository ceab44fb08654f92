//! Error types for metadata display profiles

use metadisplay_fields::RuleViolation;
use thiserror::Error;

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfilesError>;

/// How serious an error is for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// The operation succeeded; something secondary needs attention.
    Warning,
    /// The operation was rejected; the system is unaffected.
    Error,
    /// Persistence failed or stored data is unreadable.
    Critical,
}

/// Classify an error by severity.
pub trait Severity {
    fn severity(&self) -> ErrorSeverity;
}

/// Discriminant of a [`ValidationError`], for callers that map kinds to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationKind {
    UnknownField,
    UnknownContentModel,
    MutuallyExclusiveOptions,
    NoSelection,
    DuplicateField,
}

/// A submission rejected before any mutation took place.
///
/// Every variant names the identifiers that caused the rejection so the
/// editing surface can attach a message to the offending rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Fields not present in the field catalog
    #[error("not valid fields within Solr: {}", fields.join(", "))]
    UnknownField { fields: Vec<String> },

    /// Content models not present in the content model catalog
    #[error("unknown content models: {}", content_models.join(", "))]
    UnknownContentModel { content_models: Vec<String> },

    /// Fields with both hyperlinking and truncation enabled
    #[error("hyperlinking and truncation cannot be combined on: {}", fields.join(", "))]
    MutuallyExclusiveOptions { fields: Vec<String> },

    /// A remove action with nothing selected
    #[error("must select at least one entry to remove")]
    NoSelection,

    /// A field added twice to the same profile
    #[error("field '{field}' already exists in this configuration")]
    DuplicateField { field: String },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationKind {
        match self {
            ValidationError::UnknownField { .. } => ValidationKind::UnknownField,
            ValidationError::UnknownContentModel { .. } => ValidationKind::UnknownContentModel,
            ValidationError::MutuallyExclusiveOptions { .. } => {
                ValidationKind::MutuallyExclusiveOptions
            }
            ValidationError::NoSelection => ValidationKind::NoSelection,
            ValidationError::DuplicateField { .. } => ValidationKind::DuplicateField,
        }
    }

    /// The field or content model identifiers this error is about.
    pub fn identifiers(&self) -> &[String] {
        match self {
            ValidationError::UnknownField { fields }
            | ValidationError::MutuallyExclusiveOptions { fields } => fields,
            ValidationError::UnknownContentModel { content_models } => content_models,
            ValidationError::DuplicateField { field } => std::slice::from_ref(field),
            ValidationError::NoSelection => &[],
        }
    }
}

impl From<RuleViolation> for ValidationError {
    fn from(violation: RuleViolation) -> Self {
        match violation {
            RuleViolation::MutuallyExclusiveOptions { field } => {
                ValidationError::MutuallyExclusiveOptions {
                    fields: vec![field],
                }
            }
        }
    }
}

/// Failures of the derived content model index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking writer
    #[error("index connection lock poisoned")]
    Poisoned,
}

/// Errors that can occur in profile operations
#[derive(Debug, Error)]
pub enum ProfilesError {
    /// No profile with this machine name
    #[error("metadata display profile not found: {name}")]
    ProfileNotFound { name: String },

    /// Creating a profile whose machine name is taken
    #[error("metadata display profile already exists: {name}")]
    ProfileExists { name: String },

    /// Machine names are lowercase letters, digits and underscores
    #[error("invalid profile machine name: '{name}'")]
    InvalidProfileName { name: String },

    /// Profiles need a human-readable label
    #[error("profile label cannot be empty")]
    EmptyLabel,

    /// Submission rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Derived index rebuild failed; the configuration save already succeeded
    #[error("content model index out of date: {0}")]
    IndexSync(#[source] IndexError),

    /// Derived index could not be opened or queried
    #[error("content model index error: {0}")]
    Index(#[from] IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Stored configuration could not be (de)serialized
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Settings could not be loaded
    #[error("settings error: {0}")]
    Settings(#[from] figment::Error),
}

impl ProfilesError {
    /// The validation failure, if this error is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ProfilesError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RuleViolation> for ProfilesError {
    fn from(violation: RuleViolation) -> Self {
        ProfilesError::Validation(violation.into())
    }
}

impl Severity for ProfilesError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ProfilesError::IndexSync(_) => ErrorSeverity::Warning,

            ProfilesError::Index(IndexError::Poisoned) => ErrorSeverity::Error,
            ProfilesError::Index(IndexError::Sqlite(_)) => ErrorSeverity::Critical,

            ProfilesError::ProfileNotFound { .. }
            | ProfilesError::ProfileExists { .. }
            | ProfilesError::InvalidProfileName { .. }
            | ProfilesError::EmptyLabel
            | ProfilesError::Validation(_)
            | ProfilesError::Settings(_) => ErrorSeverity::Error,

            ProfilesError::Io(_) | ProfilesError::Yaml(_) => ErrorSeverity::Critical,
        }
    }
}
