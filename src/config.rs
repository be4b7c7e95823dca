//! Layered configuration for the render cache server.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - `.texbook/settings.toml` (searched upward from the current directory)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `TEXBOOK_` and use double
//! underscores to separate nested levels:
//! - `TEXBOOK_PIPELINE__WORKERS=8` sets `pipeline.workers`
//! - `TEXBOOK_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `TEXBOOK_RENDER__TIMEOUT_SECS=30` sets `render.timeout_secs`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::Backpressure;

const CONFIG_DIR: &str = ".texbook";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory rendered artifacts are written to
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// File holding the registered data sources
    #[serde(default = "default_data_store")]
    pub data_store: PathBuf,

    /// Workspace root directory (where .texbook is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderConfig {
    /// Renderer executable
    #[serde(default = "default_render_program")]
    pub program: String,

    /// Arguments placed before the output directory, job name and source
    #[serde(default = "default_render_args")]
    pub args: Vec<String>,

    /// Upper bound for a single render invocation
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    /// Number of render workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the bounded job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Jobs for the same path within this window are discarded
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// What `submit` does when the queue is full
    #[serde(default)]
    pub backpressure: Backpressure,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Source extensions accepted for rendering (case-insensitive, no dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Backfill missing artifacts when a source is registered
    #[serde(default = "default_true")]
    pub warm_up: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CacheConfig {
    /// Place artifacts under a per-data-source directory
    #[serde(default)]
    pub namespaced: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 { 1 }
fn default_cache_root() -> PathBuf { PathBuf::from("cache") }
fn default_data_store() -> PathBuf { PathBuf::from(".texbook/datasources.json") }
fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_cors_origins() -> Vec<String> { vec!["http://localhost:5173".to_string()] }
fn default_render_program() -> String { "pdflatex".to_string() }
fn default_render_args() -> Vec<String> { vec!["-interaction=nonstopmode".to_string()] }
fn default_render_timeout() -> u64 { 120 }
fn default_workers() -> usize { num_cpus::get().clamp(1, 4) }
fn default_queue_capacity() -> usize { 200 }
fn default_debounce_ms() -> u64 { 1000 }
fn default_extensions() -> Vec<String> { vec!["tex".to_string()] }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_root: default_cache_root(),
            data_store: default_data_store(),
            workspace_root: None,
            server: ServerConfig::default(),
            render: RenderConfig::default(),
            pipeline: PipelineConfig::default(),
            watch: WatchConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: default_render_program(),
            args: default_render_args(),
            timeout_secs: default_render_timeout(),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            debounce_ms: default_debounce_ms(),
            backpressure: Backpressure::default(),
        }
    }
}

impl PipelineConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            warm_up: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
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
    /// Relative paths resolve against the directory holding `.texbook`, or
    /// against the file's own directory when it lives elsewhere.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root_of(path);
                }
                settings
            })
    }

    /// Workspace a config file belongs to.
    fn workspace_root_of(config_path: &Path) -> Option<PathBuf> {
        let config_path = std::path::absolute(config_path).ok()?;
        let dir = config_path.parent()?;
        if dir.file_name() == Some(std::ffi::OsStr::new(CONFIG_DIR)) {
            dir.parent().map(Path::to_path_buf)
        } else {
            Some(dir.to_path_buf())
        }
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single underscores
            // stay inside field names.
            .merge(Env::prefixed("TEXBOOK_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.texbook/settings.toml` from the current directory upward.
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .texbook is located)
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

    /// Cache root resolved against the workspace root.
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.cache_root)
    }

    /// Data source registry file resolved against the workspace root.
    pub fn data_store_path(&self) -> PathBuf {
        self.resolve(&self.data_store)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory.
    pub fn init_config_file(force: bool) -> anyhow::Result<PathBuf> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            anyhow::bail!("Configuration file already exists. Use --force to overwrite");
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}
