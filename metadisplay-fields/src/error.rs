//! Rule violations detected on a single field rule

use thiserror::Error;

/// A field rule that cannot be accepted as submitted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleViolation {
    /// Hyperlinking and truncation enabled together on one field
    #[error("field '{field}' cannot be both hyperlinked and truncated")]
    MutuallyExclusiveOptions { field: String },
}

impl RuleViolation {
    /// The field the violation was found on.
    pub fn field(&self) -> &str {
        match self {
            RuleViolation::MutuallyExclusiveOptions { field } => field,
        }
    }
}
