use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::aggregator::ResultAggregator;
use crate::classifiers::Classifier;
use crate::error::Result;
use crate::pool::{PoolConfig, WorkerPool};
use crate::progress::{ProgressReporter, ProgressSnapshot, ReporterConfig};
use crate::ImageRecord;

/// Everything one classification run needs besides the files and classifier
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub pool: PoolConfig,
    pub reporter: ReporterConfig,
    /// Group names to pre-register for the live counters
    pub groups: Option<Vec<String>>,
}

/// Owned results of a finished run
#[derive(Debug)]
pub struct BatchOutcome {
    pub records: Vec<ImageRecord>,
    pub progress: ProgressSnapshot,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn invalid_count(&self) -> usize {
        self.records.iter().filter(|r| !r.result.is_valid()).count()
    }

    /// Mean wall time per image in milliseconds
    pub fn ms_per_image(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.elapsed.as_secs_f64() * 1000.0 / self.records.len() as f64
        }
    }
}

/// Classify `files` on a worker pool while a reporter thread renders
/// progress. The reporter is stopped only after every worker has returned.
pub fn run_batch<C>(files: Vec<PathBuf>, classifier: &C, options: &BatchOptions) -> Result<BatchOutcome>
where
    C: Classifier + ?Sized,
{
    let start = Instant::now();
    let total = files.len();
    let aggregator = match &options.groups {
        Some(groups) => ResultAggregator::with_groups(total, groups.iter().cloned()),
        None => ResultAggregator::new(total),
    };
    let pool = WorkerPool::with_config(options.pool.clone());
    let reporter = ProgressReporter::new(total, options.reporter.clone());
    let running = AtomicBool::new(true);

    let (pooled, progress) = thread::scope(|scope| {
        let progress = scope.spawn(|| reporter.run(&aggregator, &running));
        let pooled = pool.run(files, classifier, &aggregator);
        running.store(false, Ordering::Release);
        (pooled, progress.join())
    });
    pooled?;

    let progress = match progress {
        Ok(snapshot) => snapshot,
        Err(payload) => std::panic::resume_unwind(payload),
    };

    Ok(BatchOutcome {
        records: aggregator.into_records(),
        progress,
        elapsed: start.elapsed(),
    })
}
