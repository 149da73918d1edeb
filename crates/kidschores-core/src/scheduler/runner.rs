//! Background task that drives [`Coordinator::tick`] on an interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::coordinator::Coordinator;

/// Handle to a running scheduler task. Dropping it aborts the task.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn the tick loop on the current tokio runtime. The first tick
    /// fires immediately.
    pub fn spawn(coordinator: Arc<Mutex<Coordinator>>, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(period_secs = period.as_secs(), "scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let mut guard = coordinator.lock().await;
                        match guard.tick() {
                            Ok(report) => {
                                if report.is_degraded() {
                                    tracing::warn!("scheduler tick saved nothing; retrying next tick");
                                }
                                tracing::debug!(events = report.events.len(), "scheduler tick");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "scheduler tick failed; retrying next tick");
                            }
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("scheduler stopped");
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Signal the loop to stop and wait for the in-flight tick to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "scheduler task ended abnormally");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
