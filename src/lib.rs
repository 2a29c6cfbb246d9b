pub mod actions;
pub mod aggregator;
pub mod batch;
pub mod catalog;
pub mod classifiers;
pub mod darkness;
pub mod error;
pub mod features;
pub mod groups;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod report;
pub mod sampler;
pub mod select;
pub mod terminal;
pub mod utils;

use std::path::{Path, PathBuf};
use serde::Serialize;

pub use aggregator::ResultAggregator;
pub use batch::{run_batch, BatchOptions, BatchOutcome};
pub use catalog::FileCatalog;
pub use classifiers::Classifier;
pub use error::{ClassifyError, Error, Result, SamplerError};
pub use pool::{Strategy, WorkerPool};
pub use progress::{ProgressReporter, ProgressSnapshot};
pub use queue::WorkQueue;
pub use sampler::BucketSampler;

/// Outcome of classifying one image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationResult {
    /// Decode check used by the validator
    Validity { is_valid: bool, width: u32, height: u32 },
    /// Best matching color group, `score` in [0, 1]
    GroupAssignment { group_name: String, group_id: usize, score: f64 },
    /// 0 = bright, 1 = dark
    DarknessScore { score: f64 },
    /// The image could not be read; carries the reason for reporting
    Unreadable { reason: String },
}

impl ClassificationResult {
    /// Whether the image decoded successfully
    pub fn is_valid(&self) -> bool {
        match self {
            ClassificationResult::Validity { is_valid, .. } => *is_valid,
            ClassificationResult::Unreadable { .. } => false,
            _ => true,
        }
    }

    /// Name of the bucket this result belongs to, if it is a group assignment
    pub fn group_name(&self) -> Option<&str> {
        match self {
            ClassificationResult::GroupAssignment { group_name, .. } => Some(group_name),
            _ => None,
        }
    }

    /// Confidence or darkness score, whichever this result carries
    pub fn score(&self) -> Option<f64> {
        match self {
            ClassificationResult::GroupAssignment { score, .. } => Some(*score),
            ClassificationResult::DarknessScore { score } => Some(*score),
            _ => None,
        }
    }
}

/// A scanned image together with its classification
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub filename: String,
    pub result: ClassificationResult,
}

impl ImageRecord {
    pub fn new(path: &Path, result: ClassificationResult) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            filename,
            result,
        }
    }
}

/// Actions that can be performed on classified files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Leave files where they are
    None,
    /// Copy files into the given directory
    Copy(PathBuf),
    /// Move files into the given directory
    Move(PathBuf),
    /// Delete files permanently
    Delete,
}
