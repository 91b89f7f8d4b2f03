//! A restartable periodic task.
//!
//! Both the ledger tick and the analytics refresh run as a [`PeriodicTask`]: a Tokio task
//! that awaits an interval and then runs one callback. Stopping aborts the task; an
//! in-flight callback is dropped at its next await point.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to at most one running periodic task. Clones control the same task.
#[derive(Debug, Clone, Default)]
pub struct PeriodicTask {
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PeriodicTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `callback` every `period`, first firing one period from now.
    ///
    /// A task already running on this handle is stopped first. Must be called from
    /// within a Tokio runtime.
    pub fn start<F, Fut>(&self, name: &'static str, period: Duration, mut callback: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        log::debug!("Starting {} every {:?}", name, period);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback().await;
            }
        }));
    }

    /// Aborts the task. Returns `true` if one was running.
    pub fn stop(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
