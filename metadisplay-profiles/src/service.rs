//! The `MetadataDisplay` service: the operations offered to an editing
//! surface, over one association store, its derived index and the catalogs.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use metadisplay_fields::{FieldRule, PartialFieldRule};
use tracing::{info, warn};

use crate::backend::{ConfigBackend, YamlConfigBackend};
use crate::catalog::{ContentModelCatalog, FieldCatalog};
use crate::error::{ProfilesError, Result, ValidationError};
use crate::index::{AssociationIndex, SqliteAssociationIndex};
use crate::profile::Profile;
use crate::reconcile::{ChangeSet, ProfileEdit, Reconciler};
use crate::settings::MetadataDisplaySettings;
use crate::store::{profile_mut, AssociationStore, Committed};
use crate::sync::IndexSynchronizer;
use crate::working_set::WorkingSet;

/// Metadata display profiles with validated editing and reverse lookup.
pub struct MetadataDisplay {
    store: AssociationStore,
    index: Arc<dyn AssociationIndex>,
    fields: Arc<dyn FieldCatalog>,
    content_models: Arc<dyn ContentModelCatalog>,
    settings: MetadataDisplaySettings,
}

impl MetadataDisplay {
    /// Open the YAML configuration and SQLite index named by `settings`,
    /// resolving relative paths against `root`.
    pub async fn open(
        root: &Path,
        settings: MetadataDisplaySettings,
        fields: Arc<dyn FieldCatalog>,
        content_models: Arc<dyn ContentModelCatalog>,
    ) -> Result<Self> {
        let backend = Arc::new(YamlConfigBackend::new(settings.storage.config_path(root)));

        let index_path = settings.storage.index_path(root);
        if let Some(dir) = index_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let index = Arc::new(SqliteAssociationIndex::open(&index_path)?);

        Self::from_parts(backend, index, fields, content_models, settings).await
    }

    /// Assemble the service from already constructed collaborators.
    ///
    /// The derived index is rebuilt from the loaded configuration; a failure
    /// there is logged and left for the next save to repair.
    pub async fn from_parts(
        backend: Arc<dyn ConfigBackend>,
        index: Arc<dyn AssociationIndex>,
        fields: Arc<dyn FieldCatalog>,
        content_models: Arc<dyn ContentModelCatalog>,
        settings: MetadataDisplaySettings,
    ) -> Result<Self> {
        let store = AssociationStore::open(backend)
            .with_hook(Arc::new(IndexSynchronizer::new(index.clone())))
            .build()
            .await?;
        for e in store.resync().await {
            warn!(%e, "content model index not rebuilt on open");
        }
        Ok(Self {
            store,
            index,
            fields,
            content_models,
            settings,
        })
    }

    pub fn settings(&self) -> &MetadataDisplaySettings {
        &self.settings
    }

    pub fn store(&self) -> &AssociationStore {
        &self.store
    }

    // --- Reads ---

    pub async fn list_profiles(&self) -> Vec<(String, Profile)> {
        self.store.list_profiles().await
    }

    pub async fn profile_exists(&self, name: &str) -> bool {
        self.store.profile_exists(name).await
    }

    pub async fn get_profile(&self, name: &str) -> Result<Profile> {
        self.store.get_profile(name).await
    }

    pub async fn get_fields(&self, profile_name: &str) -> Result<Vec<(String, FieldRule)>> {
        self.store.get_fields(profile_name).await
    }

    pub async fn get_field(&self, field_name: &str, profile_name: &str) -> Result<Option<FieldRule>> {
        self.store.get_field(field_name, profile_name).await
    }

    /// Start an editing session on a stored profile.
    pub async fn working_set(&self, profile_name: &str) -> Result<WorkingSet> {
        let profile = self.store.get_profile(profile_name).await?;
        Ok(WorkingSet::from_profile(&profile))
    }

    /// Catalog content models the profile is not yet associated with.
    pub async fn available_content_models(
        &self,
        profile_name: &str,
    ) -> Result<IndexMap<String, String>> {
        let profile = self.store.get_profile(profile_name).await?;
        let mut models = self.content_models.content_models();
        models.retain(|id, _| !profile.cmodel_associations.contains(id));
        Ok(models)
    }

    /// Profiles associated with `content_model`, from the derived index.
    pub async fn profiles_for_content_model(&self, content_model: &str) -> Result<Vec<String>> {
        let names = self
            .store
            .read(|_| self.index.profiles_for_content_model(content_model))
            .await?;
        Ok(names)
    }

    // --- Writes ---

    pub async fn create_profile(&self, name: &str, label: &str) -> Result<Committed<()>> {
        self.store.create_profile(name, label).await
    }

    pub async fn delete_profile(&self, name: &str) -> Result<Committed<Profile>> {
        self.store.delete_profile(name).await
    }

    /// Reconcile a profile with an edited working set in one commit.
    ///
    /// A validation failure leaves the store untouched and is returned as
    /// [`ProfilesError::Validation`].
    pub async fn save_field_edits(
        &self,
        profile_name: &str,
        edit: ProfileEdit,
    ) -> Result<Committed<ChangeSet>> {
        let reconciler = Reconciler::new(self.fields.as_ref(), self.content_models.as_ref());
        let committed = self
            .store
            .transact(|configs| {
                let profile = profile_mut(configs, profile_name)?;
                let changes = reconciler.plan(profile, edit)?;
                changes.apply_to(profile);
                Ok(changes)
            })
            .await?;
        info!(
            profile = %profile_name,
            inserted = committed.value.fields.to_insert.len(),
            updated = committed.value.fields.to_update.len(),
            deleted = committed.value.fields.to_delete.len(),
            "saved metadata display field edits"
        );
        Ok(committed)
    }

    /// Merge `partial` over one stored field rule.
    pub async fn update_field(
        &self,
        profile_name: &str,
        field_name: &str,
        partial: PartialFieldRule,
    ) -> Result<Committed<FieldRule>> {
        let is_date = self.fields.is_date_field(field_name);
        let committed = self
            .store
            .transact(|configs| {
                let profile = profile_mut(configs, profile_name)?;
                let stored = profile.field(field_name).ok_or_else(|| {
                    ValidationError::UnknownField {
                        fields: vec![field_name.to_string()],
                    }
                })?;
                let mut rule = partial.merged_over(stored);
                rule.check_exclusive_options(field_name)?;
                if !is_date {
                    rule.date_format.clear();
                }
                profile.upsert_field(field_name, rule.clone());
                Ok(rule)
            })
            .await?;
        info!(profile = %profile_name, field = %field_name, "updated field display rule");
        Ok(committed)
    }

    /// Rebuild the derived index from the current configuration.
    pub async fn resync(&self) -> std::result::Result<(), Vec<ProfilesError>> {
        let warnings = self.store.resync().await;
        if warnings.is_empty() {
            Ok(())
        } else {
            Err(warnings)
        }
    }
}
