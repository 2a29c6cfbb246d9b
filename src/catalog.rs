use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use console::style;
use log::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::utils::format_file_size;

/// Extensions the image decoders understand
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "gif"];

/// Configuration for file scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub extensions: HashSet<String>,
    pub follow_links: bool,
    pub verbose: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            follow_links: false,
            verbose: false,
        }
    }
}

/// Recursive scanner producing the ordered list of images to classify
pub struct FileCatalog {
    config: ScanConfig,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn set_extensions(&mut self, extensions: Vec<String>) {
        self.config.extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
    }

    pub fn set_follow_links(&mut self, follow: bool) {
        self.config.follow_links = follow;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    /// Accepts a single image file or a directory scanned recursively.
    ///
    /// A missing source is fatal. Unreadable entries below the root are
    /// skipped with a warning so one bad subdirectory does not sink the scan.
    pub fn collect(&self, source: &Path) -> Result<Vec<PathBuf>> {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }

        if source.is_file() {
            return Ok(if self.is_supported(source) {
                vec![source.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        println!("{} {}", style("Scanning folder:").cyan(), source.display());

        let mut files = Vec::new();
        let mut total_size = 0u64;

        for entry in WalkDir::new(source).follow_links(self.config.follow_links) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(Error::Walk {
                        path: source.to_path_buf(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_supported(entry.path()) {
                continue;
            }

            if self.config.verbose {
                total_size += fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
            }
            files.push(entry.into_path());
        }

        files.sort();

        if self.config.verbose {
            println!(
                "Found {} image files ({}).",
                files.len(),
                format_file_size(total_size)
            );
        } else {
            println!("Found {} image files.", files.len());
        }

        Ok(files)
    }

    /// Like [`collect`](Self::collect) but treats an empty result as fatal
    pub fn collect_non_empty(&self, source: &Path) -> Result<Vec<PathBuf>> {
        let files = self.collect(source)?;
        if files.is_empty() {
            return Err(Error::NoImages(source.to_path_buf()));
        }
        Ok(files)
    }

    /// Case-insensitive extension check
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.config.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for FileCatalog {
    fn default() -> Self {
        Self::new()
    }
}
