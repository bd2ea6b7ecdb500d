use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use fslite_app::Application;
use fslite_cluster::{Cluster, ClusterConfig, RepairDaemon};
use fslite_config::{Config, ConfigManager};
use fslite_logging::LoggingHandle;
use fslite_types::Result;
use fslite_utils::BackgroundRunner;

/// fslite storage server: owns the nodes and runs the repair daemon.
#[derive(Parser, Debug)]
#[command(name = "fslite-server", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "FSLITE_CONFIG", default_value = "fslite.toml")]
    config: String,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

struct ServerApp {
    config: Arc<ConfigManager<ClusterConfig>>,
    cluster: Option<Arc<Cluster>>,
    runner: Option<BackgroundRunner>,
}

impl ServerApp {
    fn new(config: Arc<ConfigManager<ClusterConfig>>) -> Self {
        Self {
            config,
            cluster: None,
            runner: None,
        }
    }
}

#[async_trait]
impl Application for ServerApp {
    type Config = ClusterConfig;

    fn name(&self) -> &str {
        "fslite-server"
    }

    async fn init(&mut self, config: &ClusterConfig) -> Result<()> {
        let cluster = Cluster::open(self.config.clone())?;
        let health = cluster.scan_health()?;
        tracing::info!(
            nodes = config.node_count,
            backend = ?config.backend,
            data_dir = %config.data_dir.display(),
            files = health.total_files,
            status = %health.status,
            "cluster opened"
        );
        self.cluster = Some(Arc::new(cluster));
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let Some(cluster) = &self.cluster else {
            return Ok(());
        };
        let mut runner = BackgroundRunner::new();
        RepairDaemon::new(cluster.clone()).spawn(&mut runner);
        self.runner = Some(runner);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(runner) = self.runner.take() {
            runner.shutdown().await;
        }
        self.cluster = None;
        Ok(())
    }
}

fn load_config(path: &Path) -> anyhow::Result<ConfigManager<ClusterConfig>> {
    if path.exists() {
        ConfigManager::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        Ok(ConfigManager::new(ClusterConfig::default()))
    }
}

/// Wait for CTRL+C or SIGTERM, reloading the config on every SIGHUP.
async fn serve(config: &ConfigManager<ClusterConfig>, logging: &LoggingHandle) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hup = signal(SignalKind::hangup()).map_err(|e| {
        fslite_types::Status::with_message(
            fslite_types::StatusCode::IO_ERROR,
            format!("failed to register SIGHUP handler: {}", e),
        )
    })?;
    let shutdown = fslite_app::wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => return res,
            _ = hup.recv() => match config.reload() {
                Ok(true) => {
                    if let Err(e) = logging.set_level(&config.get().log.level) {
                        tracing::warn!(error = %e, "keeping previous log level");
                    }
                }
                Ok(false) => tracing::info!("no config file to reload"),
                Err(e) => tracing::error!(error = %e, "config reload failed"),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", ClusterConfig::default().render());
        return Ok(());
    }

    let config = Arc::new(load_config(Path::new(&args.config))?);
    let logging = fslite_logging::init_logging(&config.get().log)?;
    let info = fslite_app::AppInfo::current("fslite-server");
    tracing::info!(
        config = %args.config,
        host = %info.hostname,
        pid = info.pid,
        "starting fslite server"
    );

    let app = ServerApp::new(config.clone());
    let initial = config.snapshot();
    fslite_app::run_until(app, initial, serve(&config, &logging)).await?;

    tracing::info!("fslite server stopped");
    Ok(())
}
