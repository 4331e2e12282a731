//! Periodic availability checks.
//!
//! Wraps a [`JobScheduler`] holding at most one repeated job. Pausing removes
//! the job; resuming or changing the interval registers a fresh one, so a new
//! period takes effect from the next tick. Overlap is prevented by the
//! tracker's own busy guard: a tick that lands while a check is running is
//! logged and skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use stockwatch_core::{validate_interval_minutes, Clock, ConfigError};
use stockwatch_tracker::{CheckOutcome, Tracker, Trigger};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Interval(#[from] ConfigError),

    #[error("job scheduler error: {0}")]
    Job(#[from] JobSchedulerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub interval_minutes: u32,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub uptime_secs: Option<i64>,
    pub scheduled_ticks: u64,
    pub checking: bool,
    pub auto_check: bool,
}

struct Inner {
    state: SchedulerState,
    interval_minutes: u32,
    job_id: Option<Uuid>,
    started_at: Option<DateTime<FixedOffset>>,
}

pub struct CheckScheduler {
    tracker: Arc<Tracker>,
    clock: Arc<dyn Clock>,
    scheduler: JobScheduler,
    ticks: Arc<AtomicU64>,
    auto_check: bool,
    inner: Mutex<Inner>,
}

impl CheckScheduler {
    /// Creates and starts the underlying job runner. No job is registered
    /// until [`CheckScheduler::start`] or [`CheckScheduler::resume`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Interval`] for an out-of-range period, or
    /// [`SchedulerError::Job`] if the job runner cannot be initialised.
    pub async fn new(
        tracker: Arc<Tracker>,
        clock: Arc<dyn Clock>,
        interval_minutes: u32,
        auto_check: bool,
    ) -> Result<Self, SchedulerError> {
        let interval_minutes = validate_interval_minutes(interval_minutes)?;
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;

        Ok(Self {
            tracker,
            clock,
            scheduler,
            ticks: Arc::new(AtomicU64::new(0)),
            auto_check,
            inner: Mutex::new(Inner {
                state: SchedulerState::Stopped,
                interval_minutes,
                job_id: None,
                started_at: None,
            }),
        })
    }

    /// Register the periodic job and kick off one check in the background.
    /// Does nothing when already running.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the job cannot be registered.
    pub async fn start(&self) -> Result<SchedulerState, SchedulerError> {
        let mut inner = self.inner.lock().await;
        if inner.state == SchedulerState::Running {
            return Ok(inner.state);
        }

        inner.job_id = Some(self.register(inner.interval_minutes).await?);
        inner.state = SchedulerState::Running;
        inner.started_at = Some(self.clock.now());
        tracing::info!(
            interval_minutes = inner.interval_minutes,
            "scheduler: started"
        );
        drop(inner);

        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            log_outcome(&tracker.run_check(Trigger::Scheduled).await);
        });

        Ok(SchedulerState::Running)
    }

    /// Stop firing. Does nothing unless running.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the job cannot be removed.
    pub async fn pause(&self) -> Result<SchedulerState, SchedulerError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SchedulerState::Running {
            return Ok(inner.state);
        }

        if let Some(id) = inner.job_id.take() {
            self.scheduler.remove(&id).await?;
        }
        inner.state = SchedulerState::Paused;
        tracing::info!("scheduler: paused");
        Ok(inner.state)
    }

    /// Resume firing at the configured period. A scheduler that was never
    /// started is started.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the job cannot be registered.
    pub async fn resume(&self) -> Result<SchedulerState, SchedulerError> {
        let mut inner = self.inner.lock().await;
        let state = inner.state;
        match state {
            SchedulerState::Running => Ok(state),
            SchedulerState::Stopped => {
                drop(inner);
                self.start().await
            }
            SchedulerState::Paused => {
                inner.job_id = Some(self.register(inner.interval_minutes).await?);
                inner.state = SchedulerState::Running;
                tracing::info!(
                    interval_minutes = inner.interval_minutes,
                    "scheduler: resumed"
                );
                Ok(inner.state)
            }
        }
    }

    /// Change the period. While running the job is replaced and the new
    /// period applies from the next tick; otherwise only the stored period
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Interval`] when `minutes` is outside
    /// 1..=60; the previous period stays active.
    pub async fn update_interval(&self, minutes: u32) -> Result<u32, SchedulerError> {
        let minutes = validate_interval_minutes(minutes)?;
        let mut inner = self.inner.lock().await;

        if inner.state == SchedulerState::Running {
            let new_id = self.register(minutes).await?;
            if let Some(old) = inner.job_id.replace(new_id) {
                self.scheduler.remove(&old).await?;
            }
        }

        let previous = inner.interval_minutes;
        inner.interval_minutes = minutes;
        tracing::info!(
            previous,
            interval_minutes = minutes,
            state = ?inner.state,
            "scheduler: check interval updated"
        );
        Ok(minutes)
    }

    /// Run a check immediately, sharing the tracker's overlap guard.
    pub async fn run_now(&self) -> CheckOutcome {
        self.tracker.run_check(Trigger::Manual).await
    }

    pub async fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().await;
        let uptime_secs = inner
            .started_at
            .map(|t| self.clock.now().signed_duration_since(t).num_seconds());
        SchedulerStatus {
            state: inner.state,
            interval_minutes: inner.interval_minutes,
            started_at: inner.started_at,
            uptime_secs,
            scheduled_ticks: self.ticks.load(Ordering::Relaxed),
            checking: self.tracker.is_checking(),
            auto_check: self.auto_check,
        }
    }

    /// Remove the job and stop the runner. Used on process shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the runner fails to shut down.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        if let Some(id) = inner.job_id.take() {
            self.scheduler.remove(&id).await?;
        }
        inner.state = SchedulerState::Stopped;
        self.scheduler.clone().shutdown().await?;
        tracing::info!("scheduler: shut down");
        Ok(())
    }

    async fn register(&self, interval_minutes: u32) -> Result<Uuid, JobSchedulerError> {
        let tracker = Arc::clone(&self.tracker);
        let ticks = Arc::clone(&self.ticks);
        let period = Duration::from_secs(u64::from(interval_minutes) * 60);

        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let tracker = Arc::clone(&tracker);
            let ticks = Arc::clone(&ticks);

            Box::pin(async move {
                ticks.fetch_add(1, Ordering::Relaxed);
                log_outcome(&tracker.run_check(Trigger::Scheduled).await);
            })
        })?;

        self.scheduler.add(job).await
    }
}

fn log_outcome(outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Completed(_) => {}
        CheckOutcome::Busy => {
            tracing::info!("scheduler: previous check still running; tick skipped");
        }
        CheckOutcome::Failed(reason) => {
            tracing::warn!(reason = %reason, "scheduler: scheduled check failed");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
