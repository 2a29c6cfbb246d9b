use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{debug, warn};

use crate::aggregator::ResultAggregator;
use crate::classifiers::Classifier;
use crate::error::{ClassifyError, Result};
use crate::queue::WorkQueue;
use crate::ImageRecord;

/// Worker count used when the hardware parallelism cannot be detected
pub const FALLBACK_WORKERS: usize = 4;

/// How files are handed to workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// All workers pull from one shared queue
    #[default]
    Dynamic,
    /// Each worker gets a contiguous chunk of `ceil(total / workers)` files
    Static,
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// 0 means one worker per available core
    pub threads: usize,
    pub strategy: Strategy,
    /// Bounded wait of each dequeue in the dynamic strategy
    pub poll_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            strategy: Strategy::Dynamic,
            poll_timeout: Duration::from_millis(100),
        }
    }
}

/// One worker per core, or [`FALLBACK_WORKERS`] if that is unknown
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

/// Fixed-size set of workers that classify every file exactly once
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        Self {
            config: PoolConfig {
                threads,
                ..PoolConfig::default()
            },
        }
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.config.strategy = strategy;
    }

    pub fn workers(&self) -> usize {
        if self.config.threads > 0 {
            self.config.threads
        } else {
            default_workers()
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    /// Classify `files` and publish one record per file into `aggregator`.
    ///
    /// Returns once every worker has exited. Classification failures are
    /// recorded, not returned; the only error is failing to start threads.
    pub fn run<C>(&self, files: Vec<PathBuf>, classifier: &C, aggregator: &ResultAggregator) -> Result<()>
    where
        C: Classifier + ?Sized,
    {
        if files.is_empty() {
            return Ok(());
        }

        let workers = self.workers();
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("classify-{}", i))
            .build()?;

        debug!(
            "Starting {} workers ({:?}) for {} files",
            workers,
            self.config.strategy,
            files.len()
        );

        match self.config.strategy {
            Strategy::Dynamic => {
                let queue = WorkQueue::from_items(files);
                let timeout = self.config.poll_timeout;
                threads.scope(|scope| {
                    for id in 0..workers {
                        let queue = &queue;
                        scope.spawn(move |_| drain_queue(id, queue, timeout, classifier, aggregator));
                    }
                });
            }
            Strategy::Static => {
                let chunk_size = files.len().div_ceil(workers);
                threads.scope(|scope| {
                    for (id, chunk) in files.chunks(chunk_size).enumerate() {
                        scope.spawn(move |_| {
                            for path in chunk {
                                process_one(path, classifier, aggregator);
                            }
                            debug!("worker {} finished {} files", id, chunk.len());
                        });
                    }
                });
            }
        }

        Ok(())
    }
}

fn drain_queue<C>(
    id: usize,
    queue: &WorkQueue<PathBuf>,
    timeout: Duration,
    classifier: &C,
    aggregator: &ResultAggregator,
) where
    C: Classifier + ?Sized,
{
    let mut handled = 0usize;
    loop {
        match queue.pop(timeout) {
            Some(path) => {
                process_one(&path, classifier, aggregator);
                handled += 1;
            }
            None if queue.is_finished() => break,
            None => continue,
        }
    }
    debug!("worker {} finished {} files", id, handled);
}

/// Classify outside any lock, then publish
fn process_one<C>(path: &Path, classifier: &C, aggregator: &ResultAggregator)
where
    C: Classifier + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(path)));

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            debug!("Could not classify {}: {}", path.display(), err);
            classifier.on_failure(path, &err)
        }
        Err(payload) => {
            let err = ClassifyError::Panicked(panic_message(payload.as_ref()));
            warn!("Classifier panicked on {}: {}", path.display(), err);
            classifier.on_failure(path, &err)
        }
    };

    aggregator.record(ImageRecord::new(path, result));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassificationResult;
    use std::collections::HashSet;

    fn fake_files(count: usize) -> Vec<PathBuf> {
        (0..count).map(|i| PathBuf::from(format!("img_{:04}.png", i))).collect()
    }

    fn by_name(path: &Path) -> std::result::Result<ClassificationResult, ClassifyError> {
        let name = path.file_name().unwrap().to_string_lossy();
        if name.ends_with("7.png") {
            Err(ClassifyError::Empty)
        } else {
            Ok(ClassificationResult::DarknessScore { score: 0.5 })
        }
    }

    fn assert_complete(files: &[PathBuf], records: &[ImageRecord]) {
        assert_eq!(records.len(), files.len());
        let seen: HashSet<_> = records.iter().map(|r| r.path.clone()).collect();
        let expected: HashSet<_> = files.iter().cloned().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_every_file_recorded_once_for_any_worker_count() {
        for strategy in [Strategy::Dynamic, Strategy::Static] {
            for workers in [1, 2, 8] {
                let files = fake_files(103);
                let aggregator = ResultAggregator::new(files.len());
                let mut pool = WorkerPool::new(workers);
                pool.set_strategy(strategy);
                pool.run(files.clone(), &by_name, &aggregator).unwrap();

                let records = aggregator.into_records();
                assert_complete(&files, &records);
                let failed = records.iter().filter(|r| !r.result.is_valid()).count();
                assert_eq!(failed, 10, "{:?} with {} workers", strategy, workers);
            }
        }
    }

    #[test]
    fn test_more_workers_than_files() {
        let files = fake_files(3);
        let aggregator = ResultAggregator::new(3);
        let mut pool = WorkerPool::new(16);
        pool.set_strategy(Strategy::Static);
        pool.run(files.clone(), &by_name, &aggregator).unwrap();
        assert_complete(&files, &aggregator.into_records());
    }

    #[test]
    fn test_panicking_classifier_does_not_kill_workers() {
        let files = fake_files(20);
        let aggregator = ResultAggregator::new(20);
        let classifier = |path: &Path| -> std::result::Result<ClassificationResult, ClassifyError> {
            if path.to_string_lossy().contains("_000") {
                panic!("decoder blew up");
            }
            Ok(ClassificationResult::DarknessScore { score: 0.1 })
        };

        WorkerPool::new(2).run(files.clone(), &classifier, &aggregator).unwrap();

        let records = aggregator.into_records();
        assert_complete(&files, &records);
        let panicked: Vec<_> = records
            .iter()
            .filter_map(|r| match &r.result {
                ClassificationResult::Unreadable { reason } => Some(reason.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(panicked.len(), 10);
        assert!(panicked.iter().all(|reason| reason.contains("decoder blew up")));
    }

    #[test]
    fn test_empty_input_is_a_no_op() {
        let aggregator = ResultAggregator::new(0);
        WorkerPool::new(4).run(Vec::new(), &by_name, &aggregator).unwrap();
        assert_eq!(aggregator.processed(), 0);
    }

    #[test]
    fn test_zero_threads_means_auto() {
        assert!(WorkerPool::new(0).workers() >= 1);
        assert_eq!(WorkerPool::new(3).workers(), 3);
    }
}
