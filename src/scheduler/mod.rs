// Fixed-interval background jobs with explicit start/stop.
//
// The job runs synchronously inside the ticker loop, so a slow iteration delays
// the next one instead of overlapping it. Missed ticks are skipped.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Handle to a periodic job. Dropping the handle stops the job.
pub struct ScheduledTask {
    name: &'static str,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            handle: None,
        }
    }

    /// Start running `job` every period, first run immediately.
    ///
    /// Returns false (and does nothing) if the task is already running.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, mut job: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            debug!(task = self.name, "Scheduled task already running");
            return false;
        }

        let period = self.period;
        let name = self.name;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                job();
            }
        }));

        info!(task = name, period_ms = period.as_millis() as u64, "Scheduled task started");
        true
    }

    /// Stop the task. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                info!(task = self.name, "Scheduled task stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
