//! Scheduled-task runner collaborator: a thin wrapper around a cron
//! library. Recurring-job semantics (catch-up, misfire policy) are an
//! explicit non-goal of the messaging core; this crate only registers jobs
//! and starts/stops the underlying scheduler. The core never registers a
//! job itself and has no dependency on this crate.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

pub struct TaskScheduler {
    inner: JobScheduler,
    job_count: usize,
}

impl TaskScheduler {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, job_count: 0 })
    }

    /// Registers a cron-triggered job. `cron_expr` follows the standard
    /// six-field cron-scheduler syntax (seconds-first).
    pub async fn register<F>(&mut self, cron_expr: &str, job: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let scheduled = Job::new(cron_expr, move |_uuid, _lock| {
            job();
        })?;
        self.inner.add(scheduled).await?;
        self.job_count += 1;
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        info!(jobs = self.job_count, "starting task scheduler");
        self.inner.start().await?;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        warn!("stopping task scheduler");
        self.inner.shutdown().await?;
        Ok(())
    }
}
