//! Admin environment: which cluster the commands act on.
//!
//! The admin tool opens the same node directories and manifest file the
//! server uses, so it works whether or not a server is running.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use fslite_cluster::{Cluster, ClusterConfig};
use fslite_config::ConfigManager;

#[derive(Debug, Clone, clap::Args)]
pub struct ClusterOptions {
    /// Path to the cluster configuration file.
    #[arg(long, env = "FSLITE_CONFIG", default_value = "fslite.toml")]
    pub config: String,

    /// Override `data_dir` from the config file.
    #[arg(long, env = "FSLITE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override `output_dir` from the config file.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl ClusterOptions {
    /// Resolve the config path, expanding `~` to the home directory.
    pub fn resolved_config_path(&self) -> PathBuf {
        let path = &self.config;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Load the config file (defaults if it does not exist) and apply the
    /// command-line overrides.
    pub fn load_config(&self) -> anyhow::Result<ClusterConfig> {
        let path = self.resolved_config_path();
        let mut config = if path.exists() {
            ConfigManager::<ClusterConfig>::load(&path)
                .with_context(|| format!("loading {}", path.display()))?
                .snapshot()
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            ClusterConfig::default()
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Lazily opened cluster handle shared by the commands of one invocation.
pub struct AdminEnv {
    pub options: ClusterOptions,
    cluster: Option<Cluster>,
}

impl AdminEnv {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            cluster: None,
        }
    }

    /// An environment over an already opened cluster.
    pub fn with_cluster(options: ClusterOptions, cluster: Cluster) -> Self {
        Self {
            options,
            cluster: Some(cluster),
        }
    }

    pub fn cluster(&mut self) -> anyhow::Result<&Cluster> {
        if self.cluster.is_none() {
            let config = self.options.load_config()?;
            let manager = Arc::new(ConfigManager::new(config));
            self.cluster = Some(Cluster::open(manager).context("opening cluster")?);
        }
        self.cluster
            .as_ref()
            .context("cluster handle missing after open")
    }
}

impl fmt::Debug for AdminEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminEnv")
            .field("options", &self.options)
            .field("opened", &self.cluster.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use fslite_cluster::ClusterConfig;

    /// An in-memory environment writing downloads under `dir`.
    pub fn memory_env(dir: &std::path::Path) -> AdminEnv {
        let options = ClusterOptions {
            config: dir.join("absent.toml").display().to_string(),
            data_dir: None,
            output_dir: Some(dir.to_path_buf()),
        };
        let config = ClusterConfig {
            chunk_size: 64,
            output_dir: dir.to_path_buf(),
            ..ClusterConfig::in_memory()
        };
        AdminEnv::with_cluster(options, Cluster::in_memory(config).unwrap())
    }
}
