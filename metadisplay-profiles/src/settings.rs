//! Settings for metadata display, loaded with figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional YAML settings file
//! 3. `METADISPLAY_` environment variables, nested keys separated by `__`
//!    (e.g. `METADISPLAY_STORAGE__INDEX_FILE=/var/lib/metadisplay/index.db`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "METADISPLAY_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetadataDisplaySettings {
    pub storage: StorageSettings,
    pub display: DisplaySettings,
}

/// Where the configuration document and the derived index live.
///
/// Relative paths are resolved against the root passed to
/// [`StorageSettings::config_path`] and [`StorageSettings::index_path`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    pub config_file: PathBuf,
    pub index_file: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("metadisplay/configs.yaml"),
            index_file: PathBuf::from("metadisplay/index.db"),
        }
    }
}

impl StorageSettings {
    pub fn config_path(&self, root: &Path) -> PathBuf {
        root.join(&self.config_file)
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        root.join(&self.index_file)
    }
}

/// Global display options. Stored and exposed here; rendering happens
/// elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    pub omit_empty_values: bool,
    pub dedup_values: bool,
    /// Joins the values of a multi-valued field. `None` means a newline.
    pub field_value_separator: Option<String>,
}

impl DisplaySettings {
    pub fn separator(&self) -> &str {
        self.field_value_separator.as_deref().unwrap_or("\n")
    }
}

impl MetadataDisplaySettings {
    /// Load settings from defaults, `file` if given, and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            debug!(path = %path.display(), "loading metadata display settings file");
            figment = figment.merge(Yaml::file(path));
        }
        let settings: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        debug!(
            config_file = %settings.storage.config_file.display(),
            index_file = %settings.storage.index_file.display(),
            "metadata display settings loaded"
        );
        Ok(settings)
    }
}
