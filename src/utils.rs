use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use humansize::{format_size, DECIMAL};

/// Format file size in human-readable format
pub fn format_file_size(size: u64) -> String {
    format_size(size, DECIMAL)
}

/// `42s`, `3m 5s` or `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Calculate the percentage of one number relative to another
pub fn calculate_percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> std::io::Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// First free path for `original_name` in `dir`: `name.ext`, then
/// `name_1.ext`, `name_2.ext`, ...
pub fn generate_unique_filename(dir: &Path, original_name: &str) -> PathBuf {
    unique_filename_where(dir, original_name, |path| path.exists())
}

/// Like [`generate_unique_filename`], with `taken` deciding which candidates
/// are occupied
pub fn unique_filename_where<F>(dir: &Path, original_name: &str, taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let mut path = dir.join(original_name);
    if !taken(&path) {
        return path;
    }

    let (stem, ext) = split_filename(original_name);
    let mut counter = 1;
    while taken(&path) {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        path = dir.join(new_name);
        counter += 1;
    }
    path
}

/// Split filename into stem and extension. A leading dot is part of the stem.
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos + 1..]),
        _ => (filename, ""),
    }
}

/// Path relative to the working directory when that is shorter to read
pub fn display_path(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .filter(|relative| path.is_absolute() && !relative.starts_with(".."))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Absolute form of `path`, or the path unchanged if it cannot be resolved
pub fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
