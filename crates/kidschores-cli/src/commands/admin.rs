//! Status, scheduler and maintenance commands.

use std::sync::Arc;
use std::time::Duration;

use kidschores_core::SchedulerHandle;

use super::{open, print_json, print_report, CmdResult};

pub fn status() -> CmdResult {
    let coordinator = open()?;
    print_json(&coordinator.status())
}

pub fn tick() -> CmdResult {
    let mut coordinator = open()?;
    print_report(&coordinator.tick()?)
}

/// Drive the scheduler in the foreground until Ctrl-C.
pub fn run(interval_secs: Option<u64>) -> CmdResult {
    let coordinator = open()?;
    let period = match interval_secs {
        Some(secs) => Duration::from_secs(secs.max(1)),
        None => {
            let minutes = coordinator.config().schedule.overdue_check_interval_minutes;
            Duration::from_secs(u64::from(minutes.max(1)) * 60)
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let shared = Arc::new(tokio::sync::Mutex::new(coordinator));
        let handle = SchedulerHandle::spawn(Arc::clone(&shared), period);
        println!("Scheduler running every {}s; press Ctrl-C to stop", period.as_secs());

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown requested");
        handle.stop().await;

        let mut guard = shared.lock().await;
        guard.flush()?;
        println!("Scheduler stopped");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

pub fn reset_all_data(yes: bool) -> CmdResult {
    if !yes {
        return Err("refusing to wipe all data without --yes".into());
    }
    let mut coordinator = open()?;
    print_report(&coordinator.reset_all_data()?)
}
