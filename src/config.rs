//! Configuration for nutria.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (NUTRIA_HOME, NUTRIA_DATABASE, GENAI_API_KEY,
//!    GENAI_MODEL, REQUEST_TIMEOUT, CORS_ORIGINS, NUTRIA_BIND)
//! 2. Config file (.nutria/config.yaml)
//! 3. Defaults (~/.nutria)
//!
//! Config file discovery:
//! - Searches current directory and parents for .nutria/config.yaml
//! - Paths in config file are relative to the .nutria/ directory
//!
//! The resolved config is loaded once per process. Components never read it
//! themselves; callers pass the relevant settings in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::gemini::DEFAULT_ENDPOINT;
use crate::core::RetryPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default generation deadline in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
    #[serde(default)]
    pub executor: Option<RetryPolicy>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .nutria/)
    pub home: Option<String>,
    /// SQLite database file (relative to .nutria/)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

/// Text-generation settings
#[derive(Clone)]
pub struct GenerationSettings {
    /// Model identifier
    pub model: String,
    /// API key (never printed)
    pub api_key: Option<String>,
    /// API base URL
    pub endpoint: String,
    /// Hard deadline per generation call
    pub timeout_seconds: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl GenerationSettings {
    /// Deadline as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerSettings {
    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Generation settings
    pub generation: GenerationSettings,
    /// Query executor retry policy
    pub retry: RetryPolicy,
    /// HTTP server settings
    pub server: ServerSettings,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".nutria").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Split a comma-separated origin list
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Merge file, environment and defaults
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path.to_path_buf()), Some(config)),
        None => (None, None),
    };
    let nutria_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    let file_paths = config.as_ref().map(|c| c.paths.clone()).unwrap_or_default();
    let file_generation = config.as_ref().and_then(|c| c.generation.clone());
    let file_server = config.as_ref().and_then(|c| c.server.clone());

    let home = match (env("NUTRIA_HOME"), &file_paths.home, &nutria_dir) {
        (Some(env_home), _, _) => PathBuf::from(env_home),
        (None, Some(home), Some(dir)) => resolve_path(dir, home),
        _ => default_home,
    };

    let database = match (env("NUTRIA_DATABASE"), &file_paths.database, &nutria_dir) {
        (Some(env_db), _, _) => PathBuf::from(env_db),
        (None, Some(db), Some(dir)) => resolve_path(dir, db),
        _ => home.join("alimentos.db"),
    };

    let defaults = GenerationSettings::default();
    let timeout_seconds = match env("REQUEST_TIMEOUT") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("REQUEST_TIMEOUT must be a number of seconds, got '{}'", raw))?,
        None => file_generation
            .as_ref()
            .and_then(|g| g.timeout_seconds)
            .unwrap_or(defaults.timeout_seconds),
    };
    let generation = GenerationSettings {
        model: env("GENAI_MODEL")
            .or_else(|| file_generation.as_ref().and_then(|g| g.model.clone()))
            .unwrap_or(defaults.model),
        api_key: env("GENAI_API_KEY")
            .or_else(|| file_generation.as_ref().and_then(|g| g.api_key.clone())),
        endpoint: file_generation
            .as_ref()
            .and_then(|g| g.endpoint.clone())
            .unwrap_or(defaults.endpoint),
        timeout_seconds,
    };

    let retry = config
        .as_ref()
        .and_then(|c| c.executor.clone())
        .unwrap_or_default();

    let server_defaults = ServerSettings::default();
    let cors_origins = env("CORS_ORIGINS")
        .map(|raw| parse_origins(&raw))
        .or_else(|| file_server.as_ref().and_then(|s| s.cors_origins.clone()))
        .filter(|origins| !origins.is_empty())
        .unwrap_or(server_defaults.cors_origins);
    let server = ServerSettings {
        bind: env("NUTRIA_BIND")
            .or_else(|| file_server.as_ref().and_then(|s| s.bind.clone()))
            .unwrap_or(server_defaults.bind),
        cors_origins,
    };

    Ok(ResolvedConfig {
        home,
        database,
        config_file,
        generation,
        retry,
        server,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".nutria");

    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            resolve(Some((&path, config)), env, default_home)
        }
        None => resolve(None, env, default_home),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
