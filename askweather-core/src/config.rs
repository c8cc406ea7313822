use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, time::Duration};

use crate::error::Service;

pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Process-wide settings. Built once at startup and handed to the pipeline;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Current-conditions endpoint of the weather provider.
    pub weather_endpoint: String,
    /// Base URL of an OpenAI-compatible chat completions API.
    pub llm_endpoint: String,
    pub llm_model: String,
    /// Response language requested from the weather provider.
    pub language: String,
    /// Per-request timeout applied to both network calls.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weather_endpoint: DEFAULT_WEATHER_ENDPOINT.to_string(),
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("settings.timeout_secs must be greater than zero");
        }
        if self.weather_endpoint.trim().is_empty() {
            bail!("settings.weather_endpoint must not be empty");
        }
        if self.llm_endpoint.trim().is_empty() {
            bail!("settings.llm_endpoint must not be empty");
        }
        Ok(())
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// weather_api_key = "..."
/// llm_api_key = "..."
///
/// [settings]
/// language = "ja"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub weather_api_key: Option<String>,
    pub llm_api_key: Option<String>,

    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.settings.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "askweather", "askweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or clear the stored key for a service. Blank input clears it.
    pub fn set_api_key(&mut self, service: Service, api_key: &str) {
        let value = non_blank(Some(api_key)).map(str::to_owned);
        match service {
            Service::LanguageModel => self.llm_api_key = value,
            Service::Weather => self.weather_api_key = value,
        }
    }

    /// Stored keys as an explicit per-call configuration.
    pub fn call_config(&self) -> CallConfig {
        CallConfig {
            weather_api_key: self.weather_api_key.clone(),
            llm_api_key: self.llm_api_key.clone(),
        }
    }
}

/// Explicit per-call credentials. They take precedence over the environment.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CallConfig {
    #[serde(default, alias = "api_key")]
    pub weather_api_key: Option<String>,
    #[serde(default, alias = "openai_api_key")]
    pub llm_api_key: Option<String>,
}

impl fmt::Debug for CallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallConfig")
            .field("weather_api_key", &self.weather_api_key.as_deref().map(mask_key))
            .field("llm_api_key", &self.llm_api_key.as_deref().map(mask_key))
            .finish()
    }
}

/// Credentials resolved for a single pipeline run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    llm_api_key: Option<String>,
    weather_api_key: Option<String>,
}

impl Credentials {
    pub fn new(llm_api_key: Option<String>, weather_api_key: Option<String>) -> Self {
        Self {
            llm_api_key: llm_api_key.filter(|k| !k.trim().is_empty()),
            weather_api_key: weather_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Resolve each key from `call`, falling back to the process environment.
    pub fn resolve(call: &CallConfig) -> Self {
        Self::resolve_with(call, |name| std::env::var(name).ok())
    }

    /// Same as [`Credentials::resolve`] with an explicit environment lookup.
    pub fn resolve_with<F>(call: &CallConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<&str>, service: Service| {
            non_blank(explicit)
                .map(str::to_owned)
                .or_else(|| env(service.env_var()).filter(|k| !k.trim().is_empty()))
        };

        Self {
            llm_api_key: pick(call.llm_api_key.as_deref(), Service::LanguageModel),
            weather_api_key: pick(call.weather_api_key.as_deref(), Service::Weather),
        }
    }

    pub fn llm(&self) -> Option<&str> {
        self.llm_api_key.as_deref()
    }

    pub fn weather(&self) -> Option<&str> {
        self.weather_api_key.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &self.llm().map(mask_key))
            .field("weather_api_key", &self.weather().map(mask_key))
            .finish()
    }
}

/// Short prefix of a secret, safe to put in logs.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}...")
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
