use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

use log::{debug, warn};

use crate::core::MvfError;

use super::{JobOutcome, PreviewJob};

/// Shared work queue drained by a fixed number of worker threads.
///
/// All jobs are pushed before [`PreviewQueue::drain`] starts the workers;
/// each worker pops until the queue is empty and then exits.
#[derive(Debug, Default)]
pub struct PreviewQueue {
    jobs: Mutex<VecDeque<PreviewJob>>,
}

impl PreviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: PreviewJob) {
        self.lock().push_back(job);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs every queued job on `workers` threads and blocks until the queue
    /// is empty. Returns one outcome per job, in completion order.
    pub fn drain(&self, workers: usize) -> Vec<JobOutcome> {
        self.drain_with(workers, PreviewJob::run)
    }

    pub fn drain_with<F>(&self, workers: usize, execute: F) -> Vec<JobOutcome>
    where
        F: Fn(&PreviewJob) -> Result<(), MvfError> + Sync,
    {
        let outcomes = Mutex::new(Vec::with_capacity(self.len()));
        let workers = workers.max(1);

        thread::scope(|scope| {
            for id in 0..workers {
                let execute = &execute;
                let outcomes = &outcomes;
                let spawned = thread::Builder::new()
                    .name(format!("preview-{id}"))
                    .spawn_scoped(scope, move || self.work(id, execute, outcomes));
                if let Err(e) = spawned {
                    warn!("failed to spawn preview worker {id}: {e}");
                }
            }
        });

        if !self.is_empty() {
            warn!("{} preview jobs left after workers exited, running inline", self.len());
            self.work(workers, &execute, &outcomes);
        }

        outcomes.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn work<F>(&self, id: usize, execute: &F, outcomes: &Mutex<Vec<JobOutcome>>)
    where
        F: Fn(&PreviewJob) -> Result<(), MvfError>,
    {
        let mut done = 0usize;
        while let Some(job) = self.pop() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| execute(&job)))
                .unwrap_or_else(|payload| {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    Err(MvfError::PreviewError(format!("conversion panicked: {reason}")))
                });
            outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(JobOutcome { job, result });
            done += 1;
        }
        debug!("preview worker {id} finished after {done} jobs");
    }

    fn pop(&self) -> Option<PreviewJob> {
        self.lock().pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PreviewJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{Conversion, MrcPngOptions};
    use rstest::rstest;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn job(i: usize) -> PreviewJob {
        PreviewJob {
            conversion: Conversion::MrcToPng(MrcPngOptions {
                sigma_contrast: None,
                target_width: 0,
            }),
            input: PathBuf::from(format!("in/{i}.mrc")),
            output: PathBuf::from(format!("out/{i}.png")),
        }
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(16)]
    fn test_each_job_runs_exactly_once(#[case] workers: usize) {
        let queue = PreviewQueue::new();
        for i in 0..50 {
            queue.push(job(i));
        }
        let runs: Mutex<HashMap<PathBuf, usize>> = Mutex::new(HashMap::new());

        let outcomes = queue.drain_with(workers, |job| {
            *runs.lock().unwrap().entry(job.input.clone()).or_default() += 1;
            Ok(())
        });

        assert!(queue.is_empty());
        assert_eq!(outcomes.len(), 50);
        let runs = runs.into_inner().unwrap();
        assert_eq!(runs.len(), 50);
        assert!(runs.values().all(|&n| n == 1));
    }

    #[test]
    fn test_failures_are_reported_not_fatal() {
        let queue = PreviewQueue::new();
        for i in 0..6 {
            queue.push(job(i));
        }

        let outcomes = queue.drain_with(2, |job| {
            if job.input.ends_with("3.mrc") {
                Err(MvfError::PreviewError("corrupt".into()))
            } else if job.input.ends_with("4.mrc") {
                panic!("decoder blew up");
            } else {
                Ok(())
            }
        });

        assert_eq!(outcomes.len(), 6);
        let failed: Vec<&JobOutcome> = outcomes.iter().filter(|o| !o.is_ok()).collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().any(|o| matches!(
            &o.result,
            Err(MvfError::PreviewError(msg)) if msg.contains("decoder blew up")
        )));
    }

    #[test]
    fn test_zero_workers_still_drains() {
        let queue = PreviewQueue::new();
        queue.push(job(0));
        let outcomes = queue.drain_with(0, |_| Ok(()));
        assert_eq!(outcomes.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let queue = PreviewQueue::new();
        assert!(queue.drain_with(3, |_| Ok(())).is_empty());
    }
}
