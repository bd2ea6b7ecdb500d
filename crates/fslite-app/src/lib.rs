use async_trait::async_trait;
use fslite_types::{Result, Status, StatusCode};
use serde::{Deserialize, Serialize};

/// Metadata describing a running process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub hostname: String,
    pub pid: u32,
}

impl AppInfo {
    pub fn current(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: std::env::var("HOSTNAME").unwrap_or_default(),
            pid: std::process::id(),
        }
    }
}

/// Lifecycle of a long-running fslite process.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    type Config: fslite_config::Config + Clone;

    fn name(&self) -> &str;
    async fn init(&mut self, config: &Self::Config) -> Result<()>;
    async fn start(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
}

/// Wait for a shutdown signal (CTRL+C or SIGTERM).
pub async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|e| {
            Status::with_message(
                StatusCode::IO_ERROR,
                format!("failed to register SIGTERM handler: {}", e),
            )
        })?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Received CTRL+C");
        }
        _ = sigterm.recv() => { tracing::info!("Received SIGTERM"); }
    }
    Ok(())
}

/// Run an application through its full lifecycle: init, start, wait for
/// `shutdown` to resolve, stop.
pub async fn run_until<A, F>(mut app: A, config: A::Config, shutdown: F) -> Result<()>
where
    A: Application,
    F: std::future::Future<Output = Result<()>>,
{
    app.init(&config).await?;
    app.start().await?;
    tracing::info!(app = app.name(), "started");
    let waited = shutdown.await;
    app.stop().await?;
    tracing::info!(app = app.name(), "stopped");
    waited
}

/// Run an application until CTRL+C or SIGTERM.
pub async fn run_application<A: Application>(app: A, config: A::Config) -> Result<()> {
    run_until(app, config, wait_for_shutdown_signal()).await
}
