//! Keeps the derived content model index in step with the profile collection.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ProfilesError, Result};
use crate::index::{AssociationIndex, IndexRow};
use crate::profile::ProfileCollection;
use crate::store::CommitHook;

/// Commit hook that rebuilds the [`AssociationIndex`] from scratch on every
/// committed save.
pub struct IndexSynchronizer {
    index: Arc<dyn AssociationIndex>,
}

impl IndexSynchronizer {
    pub fn new(index: Arc<dyn AssociationIndex>) -> Self {
        Self { index }
    }

    /// One row per `(profile, content model)` association in `configs`.
    pub fn rows_for(configs: &ProfileCollection) -> Vec<IndexRow> {
        configs
            .content_model_pairs()
            .map(|(profile, cmodel)| IndexRow::new(profile, cmodel))
            .collect()
    }
}

impl CommitHook for IndexSynchronizer {
    fn after_commit(&self, configs: &ProfileCollection) -> Result<()> {
        let rows = Self::rows_for(configs);
        self.index
            .rebuild(&rows)
            .map_err(ProfilesError::IndexSync)?;
        debug!(profiles = configs.len(), rows = rows.len(), "content model index synchronized");
        Ok(())
    }
}
