//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Missing or unreadable
//! files never stop a service from starting: a warning is logged and
//! compiled defaults are used instead.
//!
//! Root folder priority:
//! 1. Command-line argument
//! 2. `SINGBIRDS_ROOT_FOLDER` (or `SINGBIRDS_ROOT`) environment variable
//! 3. `root_folder` key of the module TOML file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "SINGBIRDS_ROOT_FOLDER";
/// Secondary root folder environment variable
pub const ROOT_ENV: &str = "SINGBIRDS_ROOT";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "singbirds.db";
/// Export folder name inside the root folder
pub const EXPORTS_DIR_NAME: &str = "exports";

/// Compiled default values used when no configuration is available
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("singbirds"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\singbirds"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("singbirds"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/singbirds"))
        } else {
            dirs::data_local_dir()
                .map(|d| d.join("singbirds"))
                .unwrap_or_else(|| PathBuf::from("./singbirds_data"))
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Bootstrap configuration loaded from `<config_dir>/singbirds/<module>.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and exported documents
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Batch ingestion defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum number of concurrent download+extract jobs
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Rows per bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-download timeout
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Responses larger than this are rejected
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,

    /// Frames quieter than this many dB below the peak are trimmed
    #[serde(default = "default_silence_threshold_db")]
    pub silence_threshold_db: f64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            download_timeout_secs: default_download_timeout_secs(),
            max_download_bytes: default_max_download_bytes(),
            silence_threshold_db: default_silence_threshold_db(),
        }
    }
}

/// Embedding defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Seed shared by every projection strategy
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_batch_size() -> usize {
    10
}

fn default_download_timeout_secs() -> u64 {
    10
}

fn default_max_download_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_silence_threshold_db() -> f64 {
    30.0
}

fn default_seed() -> u64 {
    42
}

/// Default TOML path for a module (`~/.config/singbirds/<module>.toml` on Linux)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("singbirds").join(format!("{}.toml", module_name)))
}

/// Load TOML config from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the bootstrap configuration came from
///
/// Returned alongside the config so the outcome can be logged after the
/// subscriber exists; the log level itself lives in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// No config directory on this platform
    Defaults,
    NotFound(PathBuf),
    Loaded(PathBuf),
    /// File present but unreadable or unparsable
    Invalid(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults => {
                debug!("No config path available, using compiled defaults")
            }
            ConfigSource::NotFound(path) => {
                info!("Config file {} not found, using compiled defaults", path.display())
            }
            ConfigSource::Loaded(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Invalid(reason) => warn!("{}; using compiled defaults", reason),
        }
    }
}

/// Load TOML config, falling back to defaults when the file is missing or invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> (TomlConfig, ConfigSource) {
    let Some(path) = path else {
        return (TomlConfig::default(), ConfigSource::Defaults);
    };

    if !path.exists() {
        return (TomlConfig::default(), ConfigSource::NotFound(path.to_path_buf()));
    }

    match load_toml_config(path) {
        Ok(config) => (config, ConfigSource::Loaded(path.to_path_buf())),
        Err(e) => (TomlConfig::default(), ConfigSource::Invalid(e.to_string())),
    }
}

/// Write TOML config, creating the parent directory if needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    // Write to a sibling temp file then rename so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves the root folder following the priority order in the module docs
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_path: default_config_path(module_name),
        }
    }

    /// Highest-priority override, normally from `--root-folder`
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Override the TOML file consulted for `root_folder`
    pub fn with_config_path(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!("Root folder from {}: {}", var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                match load_toml_config(config_path) {
                    Ok(TomlConfig {
                        root_folder: Some(root),
                        ..
                    }) => {
                        debug!("Root folder from {}: {}", config_path.display(), root.display());
                        return root;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("{} ({})", e, self.module_name),
                }
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and exposes well-known paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder and its exports directory (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.exports_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn exports_path(&self) -> PathBuf {
        self.root_folder.join(EXPORTS_DIR_NAME)
    }
}
