use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns named background tokio tasks and stops them together.
///
/// Every task receives a shutdown receiver; `shutdown` flips it and then
/// joins each task, logging any that panicked.
pub struct BackgroundRunner {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl BackgroundRunner {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Number of tasks spawned so far.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let rx = self.shutdown_tx.subscribe();
        tracing::debug!(task = %name, "spawning background task");
        self.handles.push((name, tokio::spawn(f(rx))));
    }

    /// Run `f` repeatedly, sleeping `interval()` between runs.
    ///
    /// The interval is re-read before every sleep so callers can retune a
    /// running loop. A zero interval parks the loop until the interval
    /// changes or shutdown is requested.
    pub fn spawn_periodic<I, F, Fut>(&mut self, name: impl Into<String>, interval: I, f: F)
    where
        I: Fn() -> Duration + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(name, move |mut rx| async move {
            loop {
                let period = interval();
                let wait = if period.is_zero() {
                    Duration::from_secs(1)
                } else {
                    period
                };
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        if !period.is_zero() {
                            f().await;
                        }
                    }
                    _ = rx.changed() => break,
                }
                if *rx.borrow() {
                    break;
                }
            }
        });
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(task = %name, error = %e, "background task ended abnormally");
            }
        }
    }
}

impl Default for BackgroundRunner {
    fn default() -> Self {
        Self::new()
    }
}
