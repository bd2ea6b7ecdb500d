use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Config, ConfigError};

/// Holds the live configuration and swaps it atomically on update.
///
/// Readers call `get()` and never block writers; a reload only touches the
/// fields the config type marks as hot-updatable.
pub struct ConfigManager<T: Config> {
    config: ArcSwap<T>,
    path: Option<PathBuf>,
}

fn parse<T: Config>(content: &str) -> Result<T, ConfigError> {
    let value: toml::Value = toml::from_str(content)?;
    let config = T::from_toml(&value)?;
    config.validate()?;
    Ok(config)
}

impl<T: Config> ConfigManager<T> {
    pub fn new(config: T) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            path: None,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = parse(&content)?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(parse(content)?))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> arc_swap::Guard<Arc<T>> {
        self.config.load()
    }

    pub fn update(&self, new_config: T) -> Result<(), ConfigError> {
        new_config.validate()?;
        self.config.store(Arc::new(new_config));
        Ok(())
    }
}

impl<T: Config + Clone> ConfigManager<T> {
    /// Re-read the backing file and apply its hot-updatable fields.
    /// Returns `false` when the manager was not loaded from a file.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        let Some(ref path) = self.path else {
            return Ok(false);
        };
        let content = std::fs::read_to_string(path)?;
        let new_config: T = parse(&content)?;

        let mut current = self.snapshot();
        current.hot_update(&new_config);
        current.validate()?;
        self.config.store(Arc::new(current));

        tracing::info!(path = %path.display(), "config reloaded");
        Ok(true)
    }

    pub fn snapshot(&self) -> T {
        (*self.config.load_full()).clone()
    }
}
