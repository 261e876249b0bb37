//! Configuration module.
//!
//! Handles loading, validating, and merging `image-profiles.toml`. Stock
//! defaults are serialized to a TOML value and the user file is merged over
//! them key by key, so a config file only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! root = "media"                   # Directory served by the storage provider
//! public_url = "/media"            # Public URL prefix of that directory
//! profiles_folder = "_Profiles"    # Where processed outputs go, inside root
//!
//! [cache]
//! manifest = ".image-profiles-cache.json" # Filename cache, outside storage.root
//!
//! [remote]
//! base_url = "http://localhost/"   # Base for app-relative "~/" sources
//! timeout_secs = 30                # HTTP timeout for remote sources
//!
//! [processing]
//! max_processes = 4                # Max parallel workers (omit for auto = CPU cores)
//!
//! [profiles.thumbnail]
//! filters = [
//!   { category = "Transform", type = "Resize", position = 0, state = "width=200&height=200&mode=crop" },
//! ]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::profile::{Profile, ProfileStore};
use crate::types::FilterRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "image-profiles.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `image-profiles.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
    pub processing: ProcessingConfig,
    /// Image profiles by name.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl ProfilesConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.public_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.public_url must not be empty".into(),
            ));
        }
        if self.storage.profiles_folder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.profiles_folder must not be empty".into(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be greater than 0".into(),
            ));
        }
        if let Err(e) = Url::parse(&self.remote.base_url) {
            return Err(ConfigError::Validation(format!(
                "remote.base_url {:?} is not an absolute URL: {}",
                self.remote.base_url, e
            )));
        }
        for (name, profile) in &self.profiles {
            for (i, filter) in profile.filters.iter().enumerate() {
                if filter.category.trim().is_empty() || filter.filter_type.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "profiles.{}.filters[{}] needs a category and a type",
                        name, i
                    )));
                }
            }
        }
        Ok(())
    }

    /// Profiles as the resolver's in-memory profile source.
    pub fn to_profile_store(&self) -> ProfileStore {
        ProfileStore::from_profiles(
            self.profiles
                .iter()
                .map(|(name, p)| Profile::new(name, p.filters.clone())),
        )
    }

    /// On-disk location of the filename cache manifest. Relative paths are
    /// relative to the working directory, like `storage.root`.
    pub fn manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.cache.manifest)
    }

    /// Parsed `remote.base_url`. Valid after [`validate`](Self::validate).
    pub fn base_url(&self) -> Option<Url> {
        Url::parse(&self.remote.base_url).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub root: String,
    pub public_url: String,
    pub profiles_folder: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "media".to_string(),
            public_url: "/media".to_string(),
            profiles_folder: "_Profiles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Lists every source path, so it belongs outside the served root.
    pub manifest: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            manifest: ".image-profiles-cache.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers. When absent, defaults to the
    /// number of available CPU cores. Values larger than the core count are
    /// clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub filters: Vec<FilterRecord>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the base every config file merges over.
pub fn stock_defaults_value() -> toml::Value {
    // Every field of the default config is a plain string, integer or table.
    toml::Value::try_from(ProfilesConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::Table::new()))
}

/// Deep-merge two TOML values. Tables merge recursively; anything else in
/// `overlay` replaces the value in `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. A missing file is `None`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge `overlay` over `base`, deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ProfilesConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ProfilesConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path` over the stock defaults.
pub fn load_config(path: &Path) -> Result<ProfilesConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// A documented config file with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Profiles Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding source images and processed outputs.
root = "media"

# URL prefix under which the storage root is served.
public_url = "/media"

# Folder inside the storage root that receives processed outputs.
# Layout: <profiles_folder>/<profile hash>/<filter chain hash>/<source folder hash>/<file name>
# Editing a profile's filters changes the chain hash, so outputs are rebuilt.
profiles_folder = "_Profiles"

# ---------------------------------------------------------------------------
# Filename cache
# ---------------------------------------------------------------------------
[cache]
# JSON manifest remembering where each output was written.
# Relative to the working directory. It lists every source path, so keep it
# outside storage.root where it would be publicly served.
# Safe to delete; outputs are found again on disk.
manifest = ".image-profiles-cache.json"

# ---------------------------------------------------------------------------
# Remote sources
# ---------------------------------------------------------------------------
[remote]
# Base URL that app-relative sources ("~/images/a.jpg") are resolved against.
base_url = "http://localhost/"

# Timeout for fetching remote sources, in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Profiles
# ---------------------------------------------------------------------------
# Each profile is an ordered list of filters. Filters run by ascending
# position; state is a query string of filter parameters and may use
# {Content.Id}, {Content.ContentType} and {Content.Fields.<Name>} tokens.
#
# Built-in filters:
#   Transform/Resize  width, height, mode (max|crop|pad|stretch), padcolor
#   Transform/Crop    left, top, width, height
#   Transform/Format  format (jpg|png|gif|webp|tiff|bmp|avif), quality (1-100)

[profiles.thumbnail]
filters = [
  { category = "Transform", type = "Resize", position = 0, state = "width=200&height=200&mode=crop" },
]
"##
}
