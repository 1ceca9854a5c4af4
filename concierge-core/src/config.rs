use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 120;

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "config.toml";

const KEY_NAMES: [&str; 3] = ["gemini_api_key", "weather_api_key", "exchangerate_api_key"];

fn missing_keys_error(missing: &[&str]) -> anyhow::Error {
    anyhow!(
        "Missing configuration keys: {}.\n\
         Hint: run `concierge configure` and enter your API keys.",
        missing.join(", ")
    )
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// gemini_api_key = "..."
/// weather_api_key = "..."
/// exchangerate_api_key = "..."
///
/// [agent]
/// model = "gemini-2.0-flash"
/// turn_timeout_secs = 120
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchangerate_api_key: Option<String>,

    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentSettings {
    /// Model name passed to the Gemini API; defaults to [`DEFAULT_MODEL`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Upper bound on a single conversation turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,
}

/// The three secrets, all present. Built once at startup by [`Config::credentials`]
/// and handed explicitly to every component that talks to a remote service.
#[derive(Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub weather_api_key: String,
    pub exchangerate_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &"<redacted>")
            .field("weather_api_key", &"<redacted>")
            .field("exchangerate_api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Validate that every secret is configured.
    pub fn credentials(&self) -> Result<Credentials> {
        let missing: Vec<&str> = KEY_NAMES
            .into_iter()
            .zip([&self.gemini_api_key, &self.weather_api_key, &self.exchangerate_api_key])
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect();

        if !missing.is_empty() {
            return Err(missing_keys_error(&missing));
        }

        Ok(Credentials {
            gemini_api_key: self.gemini_api_key.clone().unwrap_or_default(),
            weather_api_key: self.weather_api_key.clone().unwrap_or_default(),
            exchangerate_api_key: self.exchangerate_api_key.clone().unwrap_or_default(),
        })
    }

    pub fn model(&self) -> &str {
        self.agent.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.turn_timeout_secs.unwrap_or(DEFAULT_TURN_TIMEOUT_SECS))
    }

    /// Load config from an explicit path. A missing file is reported as every
    /// key missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(missing_keys_error(&KEY_NAMES)
                .context(format!("Config file not found: {}", path.display())));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Load config from `./config.toml` if present, otherwise from the
    /// platform config directory.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_path()?;
        Self::load_from(&path)
    }

    /// Save config to the given path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path that [`Config::load`] reads from.
    pub fn resolve_path() -> Result<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }
        Self::config_file_path()
    }

    /// Path to the config file in the platform config directory.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "travel-concierge", "concierge")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
