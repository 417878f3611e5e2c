use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_API_KEY: &str = "sk-1234";
pub const DEFAULT_MODEL: &str = "glm-4.6";

/// Placeholder replaced with the request sequence number in burst prompts.
pub const SEQ_PLACEHOLDER: &str = "{n}";

/// Everything both probes need. Defaults reproduce the stock smoke test
/// against a local proxy; a TOML file and `PROBE_*` env vars can override.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Overall per-request timeout. None leaves reqwest's default (no timeout).
    pub request_timeout_secs: Option<u64>,
    pub single: SingleConfig,
    pub burst: BurstConfig,
    pub providers: ProviderMarkers,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SingleConfig {
    pub prompt: String,
    pub max_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    pub requests: usize,
    /// Worker pool size. Equal to `requests` means every request starts at once.
    pub concurrency: usize,
    pub max_tokens: u64,
    pub prompt_template: String,
    /// Only shown in the banner; the limit itself lives in the proxy.
    pub primary_rate_limit_per_minute: u32,
}

/// Substrings used to tell which backend served a response, plus the
/// display names used in the summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderMarkers {
    pub primary_marker: String,
    pub secondary_marker: String,
    pub primary_label: String,
    pub secondary_label: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: None,
            single: SingleConfig::default(),
            burst: BurstConfig::default(),
            providers: ProviderMarkers::default(),
        }
    }
}

impl Default for SingleConfig {
    fn default() -> Self {
        Self {
            prompt: "Say: hello world".to_string(),
            max_tokens: 50,
        }
    }
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            requests: 20,
            concurrency: 20,
            max_tokens: 5,
            prompt_template: "Count to {n}".to_string(),
            primary_rate_limit_per_minute: 10,
        }
    }
}

impl Default for ProviderMarkers {
    fn default() -> Self {
        Self {
            primary_marker: "cerebras".to_string(),
            secondary_marker: "openai".to_string(),
            primary_label: "Cerebras".to_string(),
            secondary_label: "Z.AI".to_string(),
        }
    }
}

impl BurstConfig {
    pub fn prompt_for(&self, seq: usize) -> String {
        self.prompt_template.replace(SEQ_PLACEHOLDER, &seq.to_string())
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("single", &self.single)
            .field("burst", &self.burst)
            .field("providers", &self.providers)
            .finish()
    }
}

impl ProbeConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Full startup path used by the binaries: optional `PROBE_CONFIG` file,
    /// then env overrides, then validation.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let path = std::env::var("PROBE_CONFIG").ok().map(PathBuf::from);
        let config = Self::load(path.as_deref())?.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PROBE_*` overrides from an arbitrary lookup.
    /// Unparseable numeric values are ignored and the current value kept.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PROBE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("PROBE_API_KEY") {
            self.api_key = key;
        }
        if let Some(model) = lookup("PROBE_MODEL") {
            self.model = model;
        }
        if let Some(raw) = lookup("PROBE_REQUEST_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid PROBE_REQUEST_TIMEOUT_SECS"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, message: &str) -> ConfigError {
            ConfigError::Validation {
                field: field.to_string(),
                message: message.to_string(),
            }
        }

        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url", "URL cannot be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "model name cannot be empty"));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(invalid("request_timeout_secs", "timeout must be non-zero"));
        }
        if self.single.max_tokens == 0 {
            return Err(invalid("single.max_tokens", "must be positive"));
        }
        if self.burst.max_tokens == 0 {
            return Err(invalid("burst.max_tokens", "must be positive"));
        }
        if self.burst.requests == 0 {
            return Err(invalid("burst.requests", "must send at least one request"));
        }
        if self.burst.concurrency == 0 {
            return Err(invalid("burst.concurrency", "pool size must be non-zero"));
        }
        if !self.burst.prompt_template.contains(SEQ_PLACEHOLDER) {
            return Err(invalid(
                "burst.prompt_template",
                "template must contain {n}",
            ));
        }
        if self.providers.primary_marker.is_empty() {
            return Err(invalid("providers.primary_marker", "marker cannot be empty"));
        }
        if self.providers.secondary_marker.is_empty() {
            return Err(invalid("providers.secondary_marker", "marker cannot be empty"));
        }
        Ok(())
    }
}

/// Load `.env` from the working directory if present. Missing files are fine.
/// Runs before the subscriber exists so `RUST_LOG` can come from `.env`;
/// pass the result to [`log_dotenv`] once logging is up.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn log_dotenv(result: &Result<Option<PathBuf>, dotenvy::Error>) {
    match result {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(e) => tracing::warn!("failed to load .env: {e}"),
    }
}
