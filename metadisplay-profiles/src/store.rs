//! AssociationStore: the persisted collection of metadata display profiles.
//!
//! Every mutation runs through [`AssociationStore::transact`]: the change is
//! applied to a copy of the collection, the copy is saved through the
//! [`ConfigBackend`], and only then swapped in. Commit hooks run after the
//! swap while the write lock is still held, so a reader can never see the new
//! configuration paired with a stale derived index.

use std::sync::Arc;

use indexmap::IndexMap;
use metadisplay_fields::{FieldRule, PartialFieldRule};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::ConfigBackend;
use crate::error::{ProfilesError, Result};
use crate::profile::{Profile, ProfileCollection};

/// Reacts to a committed save of the profile collection.
///
/// Hooks run synchronously, in registration order, after the backend save
/// has succeeded. A hook error is reported as a warning; it never rolls the
/// save back.
pub trait CommitHook: Send + Sync {
    fn after_commit(&self, configs: &ProfileCollection) -> Result<()>;
}

/// The value produced by a committed transaction plus any hook warnings.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub warnings: Vec<ProfilesError>,
}

impl<T> Committed<T> {
    /// True when every commit hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Builder for `AssociationStore`. Created by `AssociationStore::open()`.
pub struct AssociationStoreBuilder {
    backend: Arc<dyn ConfigBackend>,
    hooks: Vec<Arc<dyn CommitHook>>,
}

impl AssociationStoreBuilder {
    /// Register a hook to run after every committed save.
    pub fn with_hook(mut self, hook: Arc<dyn CommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Load the stored collection from the backend.
    pub async fn build(self) -> Result<AssociationStore> {
        let configs = self.backend.load().await?;
        debug!(
            profiles = configs.len(),
            hooks = self.hooks.len(),
            "association store opened"
        );
        Ok(AssociationStore {
            backend: self.backend,
            hooks: self.hooks,
            state: RwLock::new(configs),
        })
    }
}

/// Profiles keyed by machine name, each with its field rules, content model
/// associations and description rule.
pub struct AssociationStore {
    backend: Arc<dyn ConfigBackend>,
    hooks: Vec<Arc<dyn CommitHook>>,
    state: RwLock<ProfileCollection>,
}

impl AssociationStore {
    /// Open a store over `backend`. Returns a builder for registering hooks.
    ///
    /// ```rust,ignore
    /// let store = AssociationStore::open(Arc::new(YamlConfigBackend::new(path)))
    ///     .with_hook(Arc::new(IndexSynchronizer::new(index)))
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(backend: Arc<dyn ConfigBackend>) -> AssociationStoreBuilder {
        AssociationStoreBuilder {
            backend,
            hooks: Vec::new(),
        }
    }

    /// A profile with empty collections and a blank description.
    pub fn empty_profile() -> Profile {
        Profile::empty()
    }

    // --- Reads ---

    /// Run `f` against the current collection under the read lock.
    pub async fn read<T>(&self, f: impl FnOnce(&ProfileCollection) -> T) -> T {
        let configs = self.state.read().await;
        f(&configs)
    }

    /// Every profile with its machine name, in storage order.
    pub async fn list_profiles(&self) -> Vec<(String, Profile)> {
        self.read(|configs| {
            configs
                .iter()
                .map(|(name, profile)| (name.to_string(), profile.clone()))
                .collect()
        })
        .await
    }

    pub async fn profile_exists(&self, name: &str) -> bool {
        self.read(|configs| configs.contains(name)).await
    }

    pub async fn get_profile(&self, name: &str) -> Result<Profile> {
        self.read(|configs| configs.get(name).cloned().ok_or_else(|| not_found(name)))
            .await
    }

    /// Field rules keyed by natural name, stably sorted by ascending weight.
    pub async fn get_fields(&self, profile_name: &str) -> Result<Vec<(String, FieldRule)>> {
        self.read(|configs| {
            configs
                .get(profile_name)
                .map(Profile::sorted_fields)
                .ok_or_else(|| not_found(profile_name))
        })
        .await
    }

    /// A single field rule, or `None` if the profile does not configure it.
    pub async fn get_field(&self, field_name: &str, profile_name: &str) -> Result<Option<FieldRule>> {
        self.read(|configs| {
            configs
                .get(profile_name)
                .map(|profile| profile.field(field_name).cloned())
                .ok_or_else(|| not_found(profile_name))
        })
        .await
    }

    // --- Writes ---

    /// Apply `f` to a copy of the collection and commit it.
    ///
    /// If `f` fails or the backend save fails, the stored collection is left
    /// exactly as it was and the error is returned unchanged. After a
    /// successful save the copy replaces the in-memory state and the commit
    /// hooks run; their failures come back as warnings.
    pub(crate) async fn transact<T, F>(&self, f: F) -> Result<Committed<T>>
    where
        F: FnOnce(&mut ProfileCollection) -> Result<T>,
    {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let value = f(&mut next)?;

        self.backend.save(&next).await?;
        *state = next;

        let warnings = self.run_hooks(&state);
        Ok(Committed { value, warnings })
    }

    /// Re-run the commit hooks against the current collection.
    ///
    /// Used to re-derive secondary data, e.g. after an earlier hook failure.
    pub async fn resync(&self) -> Vec<ProfilesError> {
        let state = self.state.write().await;
        self.run_hooks(&state)
    }

    fn run_hooks(&self, configs: &ProfileCollection) -> Vec<ProfilesError> {
        let mut warnings = Vec::new();
        for hook in &self.hooks {
            if let Err(e) = hook.after_commit(configs) {
                warn!(%e, "commit hook failed, configuration save kept");
                warnings.push(e);
            }
        }
        warnings
    }

    /// Create an empty profile. Fails if the name is taken.
    pub async fn create_profile(&self, name: &str, label: &str) -> Result<Committed<()>> {
        validate_machine_name(name)?;
        if label.trim().is_empty() {
            return Err(ProfilesError::EmptyLabel);
        }
        let committed = self
            .transact(|configs| {
                if configs.contains(name) {
                    return Err(ProfilesError::ProfileExists {
                        name: name.to_string(),
                    });
                }
                configs.insert(name, Profile::labelled(label));
                Ok(())
            })
            .await?;
        info!(profile = %name, label = %label, "created metadata display profile");
        Ok(committed)
    }

    /// Delete a profile and, through the commit hooks, its index rows.
    pub async fn delete_profile(&self, name: &str) -> Result<Committed<Profile>> {
        let committed = self
            .transact(|configs| configs.remove(name).ok_or_else(|| not_found(name)))
            .await?;
        info!(profile = %name, "deleted metadata display profile");
        Ok(committed)
    }

    /// Normalize and upsert one field rule.
    pub async fn set_field(
        &self,
        field_name: &str,
        rule: PartialFieldRule,
        profile_name: &str,
    ) -> Result<Committed<()>> {
        let mut fields = IndexMap::new();
        fields.insert(field_name.to_string(), rule);
        self.set_fields(fields, profile_name).await
    }

    /// Normalize and upsert several field rules in one commit.
    ///
    /// Every rule is checked for the hyperlink/truncation exclusion first;
    /// one offending rule rejects the whole call.
    pub async fn set_fields(
        &self,
        fields: IndexMap<String, PartialFieldRule>,
        profile_name: &str,
    ) -> Result<Committed<()>> {
        let normalized: Vec<(String, FieldRule)> = fields
            .into_iter()
            .map(|(name, partial)| {
                let rule = partial.normalize(&name);
                (name, rule)
            })
            .collect();
        for (name, rule) in &normalized {
            rule.check_exclusive_options(name)?;
        }

        self.transact(|configs| {
            let profile = profile_mut(configs, profile_name)?;
            for (name, rule) in normalized {
                profile.upsert_field(&name, rule);
            }
            Ok(())
        })
        .await
    }

    /// Remove the named fields from a profile. Absent fields are ignored.
    ///
    /// Returns the number of fields actually removed.
    pub async fn delete_fields(
        &self,
        field_names: &[String],
        profile_name: &str,
    ) -> Result<Committed<usize>> {
        self.transact(|configs| {
            let profile = profile_mut(configs, profile_name)?;
            Ok(field_names
                .iter()
                .filter(|name| profile.remove_field(name).is_some())
                .count())
        })
        .await
    }
}

/// Machine names are non-empty and use only `[a-z0-9_]`.
pub fn validate_machine_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if !valid {
        return Err(ProfilesError::InvalidProfileName {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn not_found(name: &str) -> ProfilesError {
    ProfilesError::ProfileNotFound {
        name: name.to_string(),
    }
}

pub(crate) fn profile_mut<'a>(
    configs: &'a mut ProfileCollection,
    name: &str,
) -> Result<&'a mut Profile> {
    configs.get_mut(name).ok_or_else(|| not_found(name))
}
