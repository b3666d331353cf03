use crate::{AppConfig, ConfigError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const ORG: &str = "io";
const AUTHOR: &str = "Courier";
const APP: &str = "Courier";

/// Environment variable that overrides `service.base_url`.
pub const BASE_URL_ENV: &str = "COURIER_API_BASE_URL";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from(ORG, AUTHOR, APP).ok_or(ConfigError::MissingDirectories)?;
        Self::in_dir(dirs.config_dir())
    }

    /// Keep the config file under `root/config`.
    pub fn at(root: &Path) -> Result<Self, ConfigError> {
        Self::in_dir(&root.join("config"))
    }

    fn in_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(config_dir)?;

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            let initial = AppConfig::default();
            let content = toml::to_string_pretty(&initial)?;
            fs::write(&config_path, content)?;
            tracing::info!(path = %config_path.display(), "wrote default config");
        }

        Ok(Self { config_path })
    }

    /// Load the config file and apply environment overrides.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config.service.base_url()?;
        Ok(config)
    }

    pub fn load_file(&self) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(&self.config_path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

pub(crate) fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
        tracing::debug!(%base_url, "service base url overridden from environment");
        config.service.base_url = base_url.trim().to_string();
    }
}
