use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use console::style;

use crate::error::Result;
use crate::utils::{calculate_percentage, display_path};
use crate::{ClassificationResult, ImageRecord};

/// Grouped records keyed by group name, alphabetically
fn by_group(records: &[ImageRecord]) -> BTreeMap<&str, Vec<&ImageRecord>> {
    let mut groups: BTreeMap<&str, Vec<&ImageRecord>> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.result.group_name() {
            groups.entry(name).or_default().push(record);
        }
    }
    groups
}

/// Plain-text grouping report
pub fn grouping_report(records: &[ImageRecord]) -> String {
    let mut out = String::new();
    out.push_str("WALLPAPER GROUPING REPORT\n");
    out.push_str("=========================\n\n");
    let _ = write!(out, "Total images processed: {}\n\n", records.len());

    for (name, members) in by_group(records) {
        let _ = writeln!(out, "{} ({} images)", name, members.len());
        let _ = writeln!(out, "{}", "-".repeat(name.len() + 20));
        for record in members {
            let _ = writeln!(
                out,
                "  {} (confidence: {:.2})",
                record.filename,
                record.result.score().unwrap_or(0.0)
            );
        }
        out.push('\n');
    }

    out
}

/// Plain-text validation report: totals, then one OK/FAILED line per file
pub fn validation_report(records: &[ImageRecord]) -> String {
    let invalid = records.iter().filter(|r| !r.result.is_valid()).count();

    let mut out = String::new();
    out.push_str("IMAGE VALIDATION REPORT\n");
    out.push_str("=======================\n\n");
    let _ = writeln!(out, "Total files processed: {}", records.len());
    let _ = writeln!(out, "Valid images: {}", records.len() - invalid);
    let _ = write!(out, "Corrupted/unreadable images: {}\n\n", invalid);

    for record in records {
        match &record.result {
            ClassificationResult::Validity { is_valid: true, width, height } => {
                let _ = writeln!(out, "  OK      {} ({}x{})", record.path.display(), width, height);
            }
            _ => {
                let _ = writeln!(out, "  FAILED  {}", record.path.display());
            }
        }
    }

    out
}

pub fn write_report(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

/// Every record as a pretty-printed JSON array
pub fn write_json(path: &Path, records: &[ImageRecord]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    println!("JSON report saved to: {}", path.display());
    Ok(())
}

pub fn print_timing(elapsed: Duration, count: usize) {
    let ms = elapsed.as_millis();
    println!();
    println!("Completed in {}ms", ms);
    if count > 0 {
        println!("Average: {:.2}ms per image", ms as f64 / count as f64);
    }
}

pub fn print_group_summary(records: &[ImageRecord]) {
    println!();
    println!("{}", style("📈 Grouping Summary").green().bold());
    println!("{}", style("-".repeat(20)).green());
    println!("Total images: {}", records.len());

    for (name, members) in by_group(records) {
        println!(
            "{}: {} images ({:.1}%)",
            name,
            members.len(),
            calculate_percentage(members.len(), records.len())
        );
    }

    let unreadable = records.iter().filter(|r| !r.result.is_valid()).count();
    if unreadable > 0 {
        println!("{}", style(format!("Unreadable: {} images", unreadable)).yellow());
    }
}

pub fn print_validation_summary(records: &[ImageRecord]) {
    let corrupted: Vec<&ImageRecord> = records.iter().filter(|r| !r.result.is_valid()).collect();

    println!();
    println!("{}", style("📈 Validation Summary").green().bold());
    println!("{}", style("-".repeat(20)).green());
    println!("Total files processed: {}", records.len());
    println!("Valid images: {}", records.len() - corrupted.len());
    println!("Corrupted/unreadable images: {}", corrupted.len());

    if !corrupted.is_empty() {
        println!();
        println!("{}", style("Corrupted files:").red().bold());
        for record in corrupted {
            println!("  {}", display_path(&record.path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn grouped(path: &str, group: &str, score: f64) -> ImageRecord {
        ImageRecord::new(
            Path::new(path),
            ClassificationResult::GroupAssignment {
                group_name: group.to_string(),
                group_id: 1,
                score,
            },
        )
    }

    #[test]
    fn test_grouping_report_layout() {
        let records = vec![
            grouped("/w/sky.png", "Blue_Cool", 0.912),
            grouped("/w/fire.png", "Red_Warm", 0.5),
            grouped("/w/sea.png", "Blue_Cool", 1.0),
        ];

        let expected = "WALLPAPER GROUPING REPORT\n\
                        =========================\n\n\
                        Total images processed: 3\n\n\
                        Blue_Cool (2 images)\n\
                        -----------------------------\n  \
                        sky.png (confidence: 0.91)\n  \
                        sea.png (confidence: 1.00)\n\n\
                        Red_Warm (1 images)\n\
                        ----------------------------\n  \
                        fire.png (confidence: 0.50)\n\n";
        assert_eq!(grouping_report(&records), expected);
    }

    #[test]
    fn test_validation_report_lists_every_file() {
        let records = vec![
            ImageRecord::new(
                Path::new("/w/ok.png"),
                ClassificationResult::Validity { is_valid: true, width: 1920, height: 1080 },
            ),
            ImageRecord::new(
                Path::new("/w/bad.jpg"),
                ClassificationResult::Validity { is_valid: false, width: 0, height: 0 },
            ),
        ];

        let report = validation_report(&records);
        assert!(report.contains("Valid images: 1\n"));
        assert!(report.contains("Corrupted/unreadable images: 1\n"));
        assert!(report.contains("  OK      /w/ok.png (1920x1080)\n"));
        assert!(report.contains("  FAILED  /w/bad.jpg\n"));
    }

    #[test]
    fn test_json_report_is_tagged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&path, &[grouped("/w/sky.png", "Blue_Cool", 0.9)]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["filename"], "sky.png");
        assert_eq!(value[0]["result"]["kind"], "group_assignment");
        assert_eq!(value[0]["result"]["group_name"], "Blue_Cool");
    }
}
