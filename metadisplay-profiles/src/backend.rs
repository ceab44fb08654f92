//! Configuration backends for the profile collection.
//!
//! A backend persists the whole [`ProfileCollection`] as a single document.
//! `save` must be atomic: a concurrent `load` sees either the previous
//! document or the new one, never a partial write.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use ulid::Ulid;

use crate::error::Result;
use crate::profile::ProfileCollection;

/// Persistence for the profile collection.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Load the stored collection. A backend with nothing stored yet returns
    /// an empty collection.
    async fn load(&self) -> Result<ProfileCollection>;

    /// Atomically replace the stored collection.
    async fn save(&self, configs: &ProfileCollection) -> Result<()>;
}

/// Stores the collection as one YAML file.
///
/// ```text
/// configs:
///   default:
///     label: Default
///     cmodel_associations: [islandora:sp_basic_image]
///     description: { description_field: '', description_label: '', truncation: ... }
///     fields:
///       dc~dot~title: { weight: 0, display_label: Title, ... }
/// ```
pub struct YamlConfigBackend {
    path: PathBuf,
}

impl YamlConfigBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The YAML file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigBackend for YamlConfigBackend {
    async fn load(&self) -> Result<ProfileCollection> {
        if !fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "no stored profiles, starting empty");
            return Ok(ProfileCollection::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(ProfileCollection::new());
        }
        let configs: ProfileCollection = serde_yaml_ng::from_str(&content)?;
        debug!(path = %self.path.display(), profiles = configs.len(), "loaded profiles");
        Ok(configs)
    }

    async fn save(&self, configs: &ProfileCollection) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(configs)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        atomic_write(&self.path, yaml.as_bytes()).await?;
        debug!(path = %self.path.display(), profiles = configs.len(), "saved profiles");
        Ok(())
    }
}

/// Keeps the collection in memory. Saves can be made to fail on demand.
#[derive(Default)]
pub struct MemoryConfigBackend {
    configs: Mutex<ProfileCollection>,
    fail_saves: AtomicBool,
}

impl MemoryConfigBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection.
    pub fn with_configs(configs: ProfileCollection) -> Self {
        Self {
            configs: Mutex::new(configs),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent save fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The currently stored collection.
    pub async fn stored(&self) -> ProfileCollection {
        self.configs.lock().await.clone()
    }
}

#[async_trait]
impl ConfigBackend for MemoryConfigBackend {
    async fn load(&self) -> Result<ProfileCollection> {
        Ok(self.configs.lock().await.clone())
    }

    async fn save(&self, configs: &ProfileCollection) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("configuration backend unavailable").into());
        }
        *self.configs.lock().await = configs.clone();
        Ok(())
    }
}

/// Write to a temp file then rename for atomic persistence.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
