//! Configuration for the contact ingestion service.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file (`.contact-ingest/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CONTACTS_` and use double
//! underscores to separate nested levels:
//! - `CONTACTS_WATCH__DIRECTORY=/srv/inbox` sets `watch.directory`
//! - `CONTACTS_STORE__BACKEND=memory` sets `store.backend`
//! - `CONTACTS_INGEST__DEAD_LETTER_DIR=/srv/rejected` sets `ingest.dead_letter_dir`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding the settings file and the default database.
pub const CONFIG_DIR: &str = ".contact-ingest";
const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "CONTACTS_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .contact-ingest is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Directory watched for new contact files (non-recursive)
    #[serde(default = "default_watch_directory")]
    pub directory: PathBuf,

    /// Capacity of the file-arrival queue between watcher and worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Process files already present in the directory at startup
    #[serde(default = "default_false")]
    pub scan_on_start: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct IngestConfig {
    /// Where unparseable files are moved instead of being deleted.
    /// Unset keeps the delete-always behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Database file for the sqlite backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `contact_ingest::store = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_false() -> bool {
    false
}
fn default_watch_directory() -> PathBuf {
    PathBuf::from("storage/app/contacts")
}
fn default_queue_capacity() -> usize {
    100
}
fn default_store_backend() -> StoreBackend {
    StoreBackend::Sqlite
}
fn default_store_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("contacts.db")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            watch: WatchConfig::default(),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: default_watch_directory(),
            queue_capacity: default_queue_capacity(),
            scan_on_start: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file, still honoring env overrides.
    ///
    /// Relative paths in the file resolve against the workspace that owns it:
    /// the parent of `.contact-ingest/` for a file inside it, otherwise the
    /// file's own directory.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root_for(path);
                }
                settings
            })
    }

    fn workspace_root_for(config_path: &Path) -> Option<PathBuf> {
        let config_path = std::path::absolute(config_path).ok()?;
        let dir = config_path.parent()?;
        if dir.file_name().is_some_and(|name| name == CONFIG_DIR) {
            dir.parent().map(Path::to_path_buf)
        } else {
            Some(dir.to_path_buf())
        }
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores
            // stay inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the settings file by looking for .contact-ingest from the current
    /// directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .contact-ingest is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resolve a configured path against the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
