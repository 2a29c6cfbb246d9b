use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::absolute_path;
use crate::ImageRecord;

/// Buckets run from 0 (darkest) to 5 (brightest)
pub const BUCKET_COUNT: usize = 6;

pub const DEFAULT_DELIMITER: char = ',';

/// Map a darkness score to its bucket
pub fn darkness_bucket(score: f64) -> usize {
    if score > 0.9 {
        0
    } else if score > 0.8 {
        1
    } else if score > 0.6 {
        2
    } else if score > 0.4 {
        3
    } else if score > 0.2 {
        4
    } else {
        5
    }
}

/// Preferred bucket for a local hour: dark at night, mid-dark through the day
pub fn target_bucket_for_hour(hour: u32) -> usize {
    match hour {
        20.. => 0,
        19 => 1,
        18 => 2,
        17 => 3,
        16 => 4,
        7..=15 => 2,
        5..=6 => 1,
        _ => 0,
    }
}

/// One row of a darkness CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DarknessEntry {
    pub path: PathBuf,
    pub score: f64,
}

impl DarknessEntry {
    pub fn bucket(&self) -> usize {
        darkness_bucket(self.score)
    }
}

/// Output order of the CSV rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Completion order of the workers
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

fn parse_row(line: &str, delimiter: char) -> Option<DarknessEntry> {
    let (path, score) = line.rsplit_once(delimiter)?;
    let path = path.trim();
    let score: f64 = score.trim().parse().ok()?;
    if path.is_empty() || !(0.0..=1.0).contains(&score) {
        return None;
    }
    Some(DarknessEntry {
        path: PathBuf::from(path),
        score,
    })
}

/// Read every well-formed row; the header and malformed rows are skipped.
pub fn load_entries(csv: &Path, delimiter: char) -> Result<Vec<DarknessEntry>> {
    let file = File::open(csv).map_err(|source| Error::CsvOpen {
        path: csv.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();
    let mut entries = Vec::new();
    let mut number = 0;
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        number += 1;
        if number == 1 {
            continue;
        }

        let Ok(line) = std::str::from_utf8(&raw) else {
            debug!("Skipping non-UTF-8 row {} in {}", number, csv.display());
            continue;
        };
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line, delimiter) {
            Some(entry) => entries.push(entry),
            None => debug!("Skipping malformed row {} in {}", number, csv.display()),
        }
    }

    Ok(entries)
}

/// Partition `entries` into [`BUCKET_COUNT`] darkness buckets
pub fn into_buckets(entries: Vec<DarknessEntry>) -> Vec<Vec<DarknessEntry>> {
    let mut buckets = vec![Vec::new(); BUCKET_COUNT];
    for entry in entries {
        let bucket = entry.bucket();
        buckets[bucket].push(entry);
    }
    buckets
}

/// Load a CSV straight into buckets. Fails when no row survives.
pub fn load_buckets(csv: &Path, delimiter: char) -> Result<Vec<Vec<DarknessEntry>>> {
    let entries = load_entries(csv, delimiter)?;
    if entries.is_empty() {
        return Err(Error::EmptyCsv(csv.to_path_buf()));
    }
    Ok(into_buckets(entries))
}

/// Scored entries from classified records, unreadable images dropped
pub fn entries_from_records(records: &[ImageRecord], order: SortOrder) -> Vec<DarknessEntry> {
    let mut entries: Vec<DarknessEntry> = records
        .iter()
        .filter_map(|record| match record.result.score() {
            Some(score) => Some(DarknessEntry {
                path: absolute_path(&record.path),
                score,
            }),
            None => {
                warn!("Could not score {}", record.path.display());
                None
            }
        })
        .collect();

    match order {
        SortOrder::Unsorted => {}
        SortOrder::Ascending => entries.sort_by(|a, b| a.score.total_cmp(&b.score)),
        SortOrder::Descending => entries.sort_by(|a, b| b.score.total_cmp(&a.score)),
    }
    entries
}

/// Write `image<delim>darkness` followed by one row per entry
pub fn write_csv(entries: &[DarknessEntry], output: &Path, delimiter: char) -> Result<()> {
    let mut out = BufWriter::new(File::create(output)?);
    writeln!(out, "image{}darkness", delimiter)?;
    for entry in entries {
        writeln!(out, "{}{}{}", entry.path.display(), delimiter, entry.score)?;
    }
    out.flush()?;
    Ok(())
}
