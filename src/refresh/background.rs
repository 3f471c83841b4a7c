//! Deferred task executor for work that must outlive a request.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinSet;
use tracing::{debug, error};

/// Runs detached tasks to completion and lets callers drain them.
///
/// Tasks are owned by the executor rather than orphaned, so graceful
/// shutdown and tests can wait for every pending refresh with
/// [`BackgroundTasks::wait_idle`].
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `fut`. It runs independently of the caller.
    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished tasks so the set doesn't grow over a long uptime.
        while let Some(res) = set.try_join_next() {
            log_join(res);
        }
        debug!("Spawning background task: {}", name);
        set.spawn(fut);
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.set.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Wait until every submitted task, including ones submitted while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut drained = {
                let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *set)
            };
            if drained.is_empty() {
                return;
            }
            while let Some(res) = drained.join_next().await {
                log_join(res);
            }
        }
    }
}

fn log_join(res: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            error!("Background task panicked: {}", e);
        } else {
            debug!("Background task cancelled: {}", e);
        }
    }
}
