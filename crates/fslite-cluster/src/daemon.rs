//! Background scan-and-repair loop.

use std::sync::Arc;

use fslite_types::Result;
use fslite_utils::BackgroundRunner;

use crate::cluster::Cluster;
use crate::health::RepairReport;

pub const REPAIR_TASK: &str = "repair-daemon";

pub struct RepairDaemon {
    cluster: Arc<Cluster>,
}

impl RepairDaemon {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    /// One cycle: scan, and repair if anything is under-replicated.
    /// Returns the repair report when a repair ran.
    pub fn run_once(&self) -> Result<Option<RepairReport>> {
        let health = self.cluster.scan_health()?;
        if health.under_replicated_chunks == 0 {
            tracing::debug!(status = %health.status, "nothing to repair");
            return Ok(None);
        }
        let report = self.cluster.repair()?;
        Ok(Some(report))
    }

    /// Run cycles on `runner` until it shuts down. The interval is re-read
    /// from the live config before every sleep, so a reload retunes the
    /// loop. Errors and panics in a cycle are logged and the loop goes on.
    pub fn spawn(self, runner: &mut BackgroundRunner) {
        let config = self.cluster.config_manager().clone();
        let daemon = Arc::new(self);
        runner.spawn_periodic(
            REPAIR_TASK,
            move || config.get().repair_interval(),
            move || {
                let daemon = daemon.clone();
                async move {
                    match tokio::task::spawn_blocking(move || daemon.run_once()).await {
                        Ok(Ok(Some(report))) => {
                            tracing::info!(repaired = report.chunks_repaired, "repair cycle done")
                        }
                        Ok(Ok(None)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "repair cycle failed"),
                        Err(e) => tracing::error!(error = %e, "repair cycle panicked"),
                    }
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;
    use fslite_types::NodeStatus;
    use std::time::Duration;

    fn cluster(dir: &std::path::Path, interval: u64) -> Arc<Cluster> {
        let cfg = ClusterConfig {
            chunk_size: 16,
            repair_interval_secs: interval,
            output_dir: dir.to_path_buf(),
            ..ClusterConfig::in_memory()
        };
        Arc::new(Cluster::in_memory(cfg).unwrap())
    }

    #[test]
    fn test_run_once_skips_healthy_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let c = cluster(dir.path(), 10);
        c.upload_reader("a", &[1u8; 40][..]).unwrap();
        assert_eq!(RepairDaemon::new(c).run_once().unwrap(), None);
    }

    #[test]
    fn test_run_once_repairs() {
        let dir = tempfile::tempdir().unwrap();
        let c = cluster(dir.path(), 10);
        let m = c.upload_reader("a", &[1u8; 40][..]).unwrap();
        c.fail_node(m.chunks[0].replica_node.unwrap()).unwrap();

        let report = RepairDaemon::new(c.clone()).run_once().unwrap().unwrap();
        assert!(report.chunks_repaired >= 1);
        assert_eq!(
            c.scan_health().unwrap().status,
            crate::health::SystemStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_background_loop_heals() {
        let dir = tempfile::tempdir().unwrap();
        let c = cluster(dir.path(), 1);
        let m = c.upload_reader("a", &[9u8; 40][..]).unwrap();
        c.set_node_status(m.chunks[0].primary_node.unwrap(), NodeStatus::Offline)
            .unwrap();

        let mut runner = BackgroundRunner::new();
        RepairDaemon::new(c.clone()).spawn(&mut runner);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        runner.shutdown().await;

        let health = c.scan_health().unwrap();
        assert_eq!(health.under_replicated_chunks, 0);
    }
}
