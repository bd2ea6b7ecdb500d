//! Cluster configuration (`fslite.toml`).

use std::path::PathBuf;
use std::time::Duration;

use fslite_chunk_engine::{DEFAULT_CHUNK_SIZE, REPLICATION_FACTOR};
use fslite_config::{Config, ConfigError};
use fslite_logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Where node chunks and manifests live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Node directories and `metadata.json` under `data_dir`.
    #[default]
    Disk,
    /// Everything in process memory; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub node_count: u32,
    pub backend: Backend,
    pub data_dir: PathBuf,
    /// Reconstructed files are written here as `<file_id>_<file_name>`.
    pub output_dir: PathBuf,
    pub chunk_size: u64,
    pub replication_factor: usize,
    /// Per-node capacity ceiling in bytes.
    pub max_storage_bytes: u64,
    pub cache_max_size: usize,
    /// Seconds between background repair cycles; 0 pauses the daemon.
    pub repair_interval_secs: u64,
    /// Whether cleanup also looks for surplus copies on OFFLINE nodes.
    pub cleanup_include_offline: bool,
    pub log: LogConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_count: 4,
            backend: Backend::Disk,
            data_dir: PathBuf::from("./data"),
            output_dir: PathBuf::from("./downloads"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            replication_factor: REPLICATION_FACTOR,
            max_storage_bytes: 5 * 1024 * 1024,
            cache_max_size: 5,
            repair_interval_secs: 10,
            cleanup_include_offline: true,
            log: LogConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// An in-memory config, handy for tests and demos.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    pub fn repair_interval(&self) -> Duration {
        Duration::from_secs(self.repair_interval_secs)
    }

    pub fn nodes_dir(&self) -> PathBuf {
        self.data_dir.join("nodes")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }
}

fn out_of_range(
    field: &str,
    value: impl ToString,
    min: Option<&str>,
    max: Option<&str>,
) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.into(),
        value: value.to_string(),
        min: min.map(Into::into),
        max: max.map(Into::into),
    }
}

impl Config for ClusterConfig {
    fn from_toml(value: &toml::Value) -> Result<Self, ConfigError> {
        Ok(value.clone().try_into()?)
    }

    fn hot_update(&mut self, other: &Self) {
        self.repair_interval_secs = other.repair_interval_secs;
        self.log.level = other.log.level.clone();
    }

    fn render(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.replication_factor != REPLICATION_FACTOR {
            return Err(out_of_range(
                "replication_factor",
                self.replication_factor,
                Some("2"),
                Some("2"),
            ));
        }
        if (self.node_count as usize) < REPLICATION_FACTOR {
            return Err(out_of_range("node_count", self.node_count, Some("2"), None));
        }
        if self.chunk_size == 0 {
            return Err(out_of_range("chunk_size", 0, Some("1"), None));
        }
        if self.max_storage_bytes == 0 {
            return Err(out_of_range("max_storage_bytes", 0, Some("1"), None));
        }
        if self.cache_max_size == 0 {
            return Err(out_of_range("cache_max_size", 0, Some("1"), None));
        }
        if self.log.filter().is_err() {
            return Err(ConfigError::Invalid(format!(
                "log.level {:?} is not a valid filter",
                self.log.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fslite_config::ConfigManager;

    #[test]
    fn test_defaults() {
        let cfg = ClusterConfig::default();
        assert_eq!(cfg.node_count, 4);
        assert_eq!(cfg.chunk_size, 512 * 1024);
        assert_eq!(cfg.replication_factor, 2);
        assert_eq!(cfg.max_storage_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.cache_max_size, 5);
        assert_eq!(cfg.repair_interval(), Duration::from_secs(10));
        assert!(cfg.cleanup_include_offline);
        assert_eq!(cfg.backend, Backend::Disk);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_toml() {
        let mgr = ConfigManager::<ClusterConfig>::from_toml_str(
            r#"
            backend = "memory"
            node_count = 6
            chunk_size = 1024

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        let cfg = mgr.get();
        assert_eq!(cfg.backend, Backend::Memory);
        assert_eq!(cfg.node_count, 6);
        assert_eq!(cfg.chunk_size, 1024);
        assert_eq!(cfg.cache_max_size, 5);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn test_validation() {
        for bad in [
            "replication_factor = 3",
            "node_count = 1",
            "chunk_size = 0",
            "cache_max_size = 0",
            "max_storage_bytes = 0",
        ] {
            assert!(
                ConfigManager::<ClusterConfig>::from_toml_str(bad).is_err(),
                "{} should be rejected",
                bad
            );
        }
        let err = ConfigManager::<ClusterConfig>::from_toml_str("backend = \"tape\"")
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_hot_update_fields() {
        let mut current = ClusterConfig::default();
        let mut incoming = ClusterConfig::in_memory();
        incoming.repair_interval_secs = 2;
        incoming.node_count = 9;
        incoming.log.level = "warn".into();
        current.hot_update(&incoming);
        assert_eq!(current.repair_interval_secs, 2);
        assert_eq!(current.log.level, "warn");
        assert_eq!(current.node_count, 4);
        assert_eq!(current.backend, Backend::Disk);
    }

    #[test]
    fn test_render_parses_back() {
        let cfg = ClusterConfig::in_memory();
        let text = cfg.render();
        let parsed = ConfigManager::<ClusterConfig>::from_toml_str(&text).unwrap();
        assert_eq!(**parsed.get(), cfg);
    }
}
