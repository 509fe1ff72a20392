//! CLI configuration.
//!
//! Settings come from `~/.config/gamedata/config.json` when present, then
//! from `GAMEDATA_*` environment variables (a `.env` file is loaded first),
//! which take precedence over the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use gamedata_core::{ClientConfig, Language};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "gamedata";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_ENKA_URL: &str = "GAMEDATA_ENKA_URL";
const ENV_NOTICE_URL: &str = "GAMEDATA_NOTICE_URL";
const ENV_LANGUAGE: &str = "GAMEDATA_LANGUAGE";
const ENV_USER_AGENT: &str = "GAMEDATA_USER_AGENT";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub enka_url: Option<String>,
    pub notice_url: Option<String>,
    pub language: Option<String>,
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = Self::load_from(&path)?;
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overlay non-empty environment values on top of the file settings.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_ENKA_URL) {
            self.enka_url = Some(url);
        }
        if let Some(url) = get(ENV_NOTICE_URL) {
            self.notice_url = Some(url);
        }
        if let Some(language) = get(ENV_LANGUAGE) {
            self.language = Some(language);
        }
        if let Some(user_agent) = get(ENV_USER_AGENT) {
            self.user_agent = Some(user_agent);
        }
        self
    }

    pub fn language(&self) -> Result<Language> {
        match self.language.as_deref() {
            Some(tag) => Language::from_str(tag).context("Invalid language setting"),
            None => Ok(Language::default()),
        }
    }

    /// Build the library configuration from these settings.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::default().with_language(self.language()?);

        if let Some(ref url) = self.enka_url {
            config = config.with_enka_base_url(url).context("Invalid Enka URL")?;
        }
        if let Some(ref url) = self.notice_url {
            config = config
                .with_notice_base_url(url)
                .context("Invalid notice URL")?;
        }
        if let Some(ref user_agent) = self.user_agent {
            config = config
                .with_user_agent(user_agent)
                .context("Invalid user agent")?;
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }
        Ok(config)
    }
}
