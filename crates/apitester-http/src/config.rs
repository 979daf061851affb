//! Backend connection settings.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. a TOML file (`apitester.toml` unless a path is given)
//! 3. `APITESTER_*` environment variables, with `.env` loaded first
//!
//! ```toml
//! base_url = "http://localhost:3000"
//! api_base_path = "/api"
//! timeout_secs = 30
//! token = "..."
//! ```

use apitester_core::errors::{ApiTesterError, ExError};
use apitester_core_types::Sensitive;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "apitester.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_API_BASE_PATH: &str = "/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "APITESTER_BASE_URL";
pub const ENV_API_BASE_PATH: &str = "APITESTER_API_BASE_PATH";
pub const ENV_TIMEOUT_SECS: &str = "APITESTER_TIMEOUT_SECS";
pub const ENV_TOKEN: &str = "APITESTER_TOKEN";

/// Settings shared by the entity-state fetcher and the request executor.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub api_base_path: String,
    pub timeout_secs: u64,
    pub auth_token: Option<Sensitive<String>>,
}

/// On-disk shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    api_base_path: Option<String>,
    timeout_secs: Option<u64>,
    token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_path: DEFAULT_API_BASE_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_token: None,
        }
    }
}

impl HttpConfig {
    /// Defaults overlaid with the TOML document `source`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the document does not parse or has unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ExError> {
        let file: ConfigFile = toml::from_str(source).map_err(|e| {
            ExError::from(ApiTesterError::InvalidConfig {
                reason: e.to_string(),
            })
        })?;

        let mut config = Self::default();
        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(api_base_path) = file.api_base_path {
            config.api_base_path = api_base_path;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        config.auth_token = file.token.map(Sensitive::new);
        config.normalise()
    }

    /// Read a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `InvalidConfig` when it is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ExError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ExError::from(ApiTesterError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Self::from_toml_str(&source)
    }

    /// Full resolution: defaults, file, `.env`, process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// See [`HttpConfig::from_file`] and [`HttpConfig::with_overrides`].
    pub fn load(path: Option<&Path>) -> Result<Self, ExError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "loaded .env file");
        }

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `APITESTER_*` overrides from `lookup`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when `APITESTER_TIMEOUT_SECS` is not a number or the
    /// resulting base URL is empty.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ExError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(api_base_path) = lookup(ENV_API_BASE_PATH) {
            self.api_base_path = api_base_path;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                ExError::from(ApiTesterError::InvalidConfig {
                    reason: format!("{} must be a whole number of seconds, got `{}`", ENV_TIMEOUT_SECS, raw),
                })
            })?;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.is_empty()) {
            self.auth_token = Some(Sensitive::new(token));
        }
        self.normalise()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `base_url` joined with `api_base_path`, no trailing slash
    pub fn api_root(&self) -> String {
        format!("{}{}", self.base_url, self.api_base_path)
    }

    /// Client with the configured timeout.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<reqwest::Client, ExError> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .build()
            .map_err(|e| {
                ExError::from(ApiTesterError::InvalidConfig {
                    reason: format!("cannot build HTTP client: {}", e),
                })
            })
    }

    fn normalise(mut self) -> Result<Self, ExError> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            return Err(ApiTesterError::InvalidConfig {
                reason: "base_url must not be empty".to_string(),
            }
            .into());
        }

        let path = self.api_base_path.trim().trim_matches('/');
        self.api_base_path = if path.is_empty() {
            String::new()
        } else {
            format!("/{}", path)
        };
        Ok(self)
    }
}
