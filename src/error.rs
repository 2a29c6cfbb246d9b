use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures that abort a run before or after the worker pool.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("No supported image files found in {0}")]
    NoImages(PathBuf),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Could not open file {path}: {source}")]
    CsvOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No valid images found in CSV file {0}")]
    EmptyCsv(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single classification. Never leaves a worker: the pool turns
/// it into a recorded result.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("image has no pixels")]
    Empty,

    #[error("classifier panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    #[error("No wallpapers available in any brightness bucket!")]
    Exhausted,

    #[error("Bucket {target} is out of range (0..{buckets})")]
    InvalidBucket { target: usize, buckets: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
