//! Ingestion scheduler
//!
//! One job per adapter. Each job has a trigger loop that sleeps until the
//! next cadence point and spawns an independent invocation, so a slow
//! upstream never delays the next trigger. All tasks are tracked so shutdown
//! can cancel them and wait for them to drain.

pub mod cadence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::SchedulerConfig;
use crate::ingest::FeedAdapter;

pub use cadence::Cadence;

/// Result of one job invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(usize),
    Failed,
    /// Previous invocation still running
    Skipped,
    Cancelled,
}

/// An adapter bound to its cadence and run guard
#[derive(Clone)]
pub struct Job {
    name: String,
    cadence: Cadence,
    adapter: Arc<dyn FeedAdapter>,
    busy: Arc<AtomicBool>,
    skip_if_busy: bool,
}

impl Job {
    pub fn new(adapter: Arc<dyn FeedAdapter>, cadence: Cadence, skip_if_busy: bool) -> Self {
        Self {
            name: adapter.name(),
            cadence,
            adapter,
            busy: Arc::new(AtomicBool::new(false)),
            skip_if_busy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Run the adapter once after `delay`, unless cancelled first
    pub async fn run(&self, delay: Duration, cancel: CancellationToken) -> JobOutcome {
        let _guard = if self.skip_if_busy {
            if self.busy.swap(true, Ordering::AcqRel) {
                tracing::warn!(job = %self.name, "Previous run still in flight, skipping trigger");
                return JobOutcome::Skipped;
            }
            Some(BusyGuard(self.busy.clone()))
        } else {
            None
        };

        let work = async {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.adapter.fetch().await
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = %self.name, "Run cancelled");
                JobOutcome::Cancelled
            }
            result = work => match result {
                Ok(count) => {
                    tracing::debug!(job = %self.name, records = count, "Run completed");
                    JobOutcome::Completed(count)
                }
                Err(e) => {
                    tracing::error!(job = %self.name, "Run failed: {}", e);
                    JobOutcome::Failed
                }
            }
        }
    }
}

/// Clears the busy flag when an invocation ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the jobs and every task spawned for them
pub struct Scheduler {
    jobs: Vec<Job>,
    jitter_secs: u64,
    run_on_startup: bool,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    /// One job per adapter at the feed's default cadence
    pub fn new(adapters: Vec<Arc<dyn FeedAdapter>>, settings: &SchedulerConfig) -> Self {
        let jobs = adapters
            .into_iter()
            .map(|adapter| {
                let cadence = Cadence::for_feed(adapter.feed());
                Job::new(adapter, cadence, settings.skip_if_busy)
            })
            .collect();
        Self::with_jobs(jobs, settings)
    }

    pub fn with_jobs(jobs: Vec<Job>, settings: &SchedulerConfig) -> Self {
        Self {
            jobs,
            jitter_secs: settings.jitter_secs,
            run_on_startup: settings.run_on_startup,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Spawn the startup runs and the trigger loops
    pub fn start(&self) {
        tracing::info!(jobs = self.jobs.len(), "Starting ingestion scheduler");

        for job in &self.jobs {
            tracing::info!(job = %job.name, cadence = %job.cadence, "Job scheduled");

            if self.run_on_startup {
                let job = job.clone();
                let cancel = self.cancel.clone();
                self.tracker.spawn(async move {
                    job.run(Duration::ZERO, cancel).await;
                });
            }

            self.tracker.spawn(trigger_loop(
                job.clone(),
                self.jitter_secs,
                self.cancel.clone(),
                self.tracker.clone(),
            ));
        }
    }

    /// Cancel all loops and in-flight runs, waiting up to `grace` for them to
    /// finish. Returns `false` if tasks were still running at the deadline.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        tracing::info!("Stopping ingestion scheduler");
        self.cancel.cancel();
        self.tracker.close();

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    "Scheduler tasks still running after grace period"
                );
                false
            }
        }
    }
}

async fn trigger_loop(job: Job, jitter_secs: u64, cancel: CancellationToken, tracker: TaskTracker) {
    loop {
        let wait = job.cadence.duration_until_next(Utc::now());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let delay = jitter_delay(jitter_secs);
        let invocation = job.clone();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            invocation.run(delay, cancel).await;
        });
    }
}

/// Offset drawn uniformly from `[-jitter, +jitter)` seconds; negative draws
/// mean no delay
pub fn jitter_delay(jitter_secs: u64) -> Duration {
    if jitter_secs == 0 {
        return Duration::ZERO;
    }
    let bound = jitter_secs as i64;
    let offset = rand::thread_rng().gen_range(-bound..bound);
    Duration::from_secs(offset.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use shared::FeedKind;
    use std::sync::atomic::AtomicUsize;

    struct SlowAdapter {
        calls: AtomicUsize,
        hold: Duration,
        fail: bool,
    }

    #[async_trait]
    impl FeedAdapter for SlowAdapter {
        fn name(&self) -> String {
            "radar:test".to_string()
        }

        fn feed(&self) -> FeedKind {
            FeedKind::Radar
        }

        async fn fetch(&self) -> AppResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            if self.fail {
                Err(AppError::Internal("boom".to_string()))
            } else {
                Ok(1)
            }
        }
    }

    fn adapter(hold_ms: u64, fail: bool) -> Arc<SlowAdapter> {
        Arc::new(SlowAdapter {
            calls: AtomicUsize::new(0),
            hold: Duration::from_millis(hold_ms),
            fail,
        })
    }

    fn settings() -> SchedulerConfig {
        SchedulerConfig {
            enabled: true,
            jitter_secs: 0,
            skip_if_busy: true,
            run_on_startup: true,
            shutdown_grace_secs: 1,
        }
    }

    #[test]
    fn test_jitter_is_bounded() {
        assert_eq!(jitter_delay(0), Duration::ZERO);
        for _ in 0..200 {
            assert!(jitter_delay(5) < Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn test_busy_job_skips_overlapping_trigger() {
        let slow = adapter(200, false);
        let job = Job::new(slow.clone(), Cadence::EveryMinutes(5), true);
        let cancel = CancellationToken::new();

        let first = tokio::spawn({
            let job = job.clone();
            let cancel = cancel.clone();
            async move { job.run(Duration::ZERO, cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(job.run(Duration::ZERO, cancel.clone()).await, JobOutcome::Skipped);
        assert_eq!(first.await.unwrap(), JobOutcome::Completed(1));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        // guard released, next trigger runs
        assert_eq!(job.run(Duration::ZERO, cancel).await, JobOutcome::Completed(1));
    }

    #[tokio::test]
    async fn test_overlap_allowed_without_guard() {
        let slow = adapter(100, false);
        let job = Job::new(slow.clone(), Cadence::EveryMinutes(5), false);
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(
            job.run(Duration::ZERO, cancel.clone()),
            job.run(Duration::ZERO, cancel.clone())
        );
        assert_eq!(a, JobOutcome::Completed(1));
        assert_eq!(b, JobOutcome::Completed(1));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_job() {
        let failing = adapter(0, true);
        let job = Job::new(failing.clone(), Cadence::EveryMinutes(5), true);
        let cancel = CancellationToken::new();

        assert_eq!(job.run(Duration::ZERO, cancel.clone()).await, JobOutcome::Failed);
        assert_eq!(job.run(Duration::ZERO, cancel).await, JobOutcome::Failed);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_startup_run_and_shutdown() {
        let quick = adapter(0, false);
        let scheduler = Scheduler::new(vec![quick.clone() as Arc<dyn FeedAdapter>], &settings());
        assert_eq!(scheduler.jobs()[0].cadence(), Cadence::EveryMinutes(5));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(quick.calls.load(Ordering::SeqCst), 1);

        assert!(scheduler.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_run() {
        let stuck = adapter(60_000, false);
        let scheduler = Scheduler::new(vec![stuck.clone() as Arc<dyn FeedAdapter>], &settings());
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(scheduler.shutdown(Duration::from_secs(1)).await);
        assert_eq!(stuck.calls.load(Ordering::SeqCst), 1);
    }
}
