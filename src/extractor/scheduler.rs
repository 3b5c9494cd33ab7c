//! Bounded-parallelism job runner
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Spawning each job as its own task
//! - Isolating job failures: an error or a panic is counted, never propagated

use crate::HarvestError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome counts of every job submitted to a scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub succeeded: usize,
    pub failed: usize,

    /// Highest number of jobs that ran at the same time
    pub peak_in_flight: usize,
}

impl SchedulerReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    fn enter(self: &Arc<Self>) -> InFlightSlot {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightSlot(Arc::clone(self))
    }
}

/// Decrements the gauge when a job finishes, including by panic
struct InFlightSlot(Arc<InFlightGauge>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

type JobOutput = (String, Result<(), HarvestError>);

/// Runs jobs with at most `limit` in flight
///
/// The scheduler owns only the handles of submitted jobs; it never sees the
/// state a job mutates.
pub struct ConcurrencyScheduler {
    /// Global semaphore for limiting concurrent jobs
    semaphore: Arc<Semaphore>,
    limit: usize,
    jobs: JoinSet<JobOutput>,
    gauge: Arc<InFlightGauge>,
    submitted: usize,
}

impl ConcurrencyScheduler {
    /// Creates a scheduler; a limit of zero is raised to one
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            jobs: JoinSet::new(),
            gauge: Arc::new(InFlightGauge::default()),
            submitted: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Jobs currently running
    pub fn in_flight(&self) -> usize {
        self.gauge.current.load(Ordering::SeqCst)
    }

    /// Highest number of jobs that ran at the same time so far
    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    /// Starts `job` once fewer than `limit` jobs are in flight
    ///
    /// Waits for a permit, so a caller submitting in a loop is throttled to
    /// the concurrency limit.
    ///
    /// # Arguments
    ///
    /// * `label` - Name used when logging the job's failure
    /// * `job` - The job itself
    pub async fn submit<F>(&mut self, label: impl Into<String>, job: F) -> Result<(), HarvestError>
    where
        F: Future<Output = Result<(), HarvestError>> + Send + 'static,
    {
        let label = label.into();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| HarvestError::Job {
                key: label.clone(),
                message: e.to_string(),
            })?;

        let gauge = Arc::clone(&self.gauge);
        self.jobs.spawn(async move {
            let _permit = permit;
            let _slot = gauge.enter();
            let result = job.await;
            (label, result)
        });
        self.submitted += 1;

        Ok(())
    }

    /// Waits for every submitted job and tallies the outcomes
    pub async fn join(mut self) -> SchedulerReport {
        let mut report = SchedulerReport::default();

        while let Some(joined) = self.jobs.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.succeeded += 1,
                Ok((label, Err(e))) => {
                    tracing::warn!("Job {} failed: {}", label, e);
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Job aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        report.peak_in_flight = self.peak_in_flight();
        report
    }
}
