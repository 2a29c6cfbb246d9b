use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use image::{Rgb, RgbImage};
use tempfile::tempdir;

use wallsort::actions::{group_into_folders, quarantine, Transfer};
use wallsort::classifiers::{DarknessClassifier, GroupClassifier, GroupingConfig, ValidityClassifier};
use wallsort::darkness::{entries_from_records, load_buckets, write_csv, SortOrder};
use wallsort::progress::ReporterConfig;
use wallsort::report::grouping_report;
use wallsort::select::{next_for_hour, run_loop, LoopConfig};
use wallsort::{run_batch, BatchOptions, BucketSampler, FileCatalog, Strategy};

fn quiet() -> BatchOptions {
    BatchOptions {
        reporter: ReporterConfig {
            interval: Duration::from_millis(10),
            hidden: true,
            ..ReporterConfig::default()
        },
        ..BatchOptions::default()
    }
}

fn solid(path: &Path, rgb: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(48, 32, Rgb(rgb)).save(path).unwrap();
}

#[test]
fn grouping_sorts_wallpapers_into_color_folders() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("walls");
    solid(&input.join("ocean.png"), [30, 60, 220]);
    solid(&input.join("nested").join("forest.png"), [40, 200, 40]);
    solid(&input.join("night.png"), [10, 10, 12]);
    fs::write(input.join("notes.txt"), "not an image").unwrap();

    let files = FileCatalog::new().collect_non_empty(&input).unwrap();
    assert_eq!(files.len(), 3);

    let classifier = GroupClassifier::new(GroupingConfig::default());
    let mut options = quiet();
    options.groups = Some(classifier.group_names());
    let outcome = run_batch(files, &classifier, &options).unwrap();
    assert_eq!(outcome.records.len(), 3);

    let group_of = |name: &str| {
        outcome
            .records
            .iter()
            .find(|r| r.filename == name)
            .and_then(|r| r.result.group_name())
            .map(str::to_string)
    };
    assert_eq!(group_of("ocean.png").as_deref(), Some("Blue_Cool"));
    assert_eq!(group_of("forest.png").as_deref(), Some("Green_Nature"));
    assert_eq!(group_of("night.png").as_deref(), Some("Dark_Moody"));

    let output = dir.path().join("grouped");
    let result = group_into_folders(&outcome.records, &output, Transfer::Copy, false);
    assert_eq!(result.error_count(), 0);
    assert!(output.join("Blue_Cool").join("ocean.png").exists());
    assert!(output.join("Green_Nature").join("forest.png").exists());
    assert!(input.join("ocean.png").exists());

    let report = grouping_report(&outcome.records);
    assert!(report.starts_with("WALLPAPER GROUPING REPORT\n"));
    assert!(report.contains("Total images processed: 3\n"));
    assert!(report.contains("  ocean.png (confidence: "));
}

#[test]
fn validator_quarantines_only_corrupted_files() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("walls");
    solid(&input.join("good.png"), [200, 100, 50]);
    fs::create_dir_all(input.join("sub")).unwrap();
    fs::write(input.join("broken.jpg"), b"\xff\xd8 truncated").unwrap();
    fs::write(input.join("sub").join("broken.jpg"), b"garbage").unwrap();

    let files = FileCatalog::new().collect_non_empty(&input).unwrap();
    for strategy in [Strategy::Dynamic, Strategy::Static] {
        let mut options = quiet();
        options.pool.strategy = strategy;
        options.pool.threads = 2;
        let outcome = run_batch(files.clone(), &ValidityClassifier, &options).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.invalid_count(), 2);
    }

    let outcome = run_batch(files, &ValidityClassifier, &quiet()).unwrap();
    let quarantine_dir = dir.path().join("corrupted_images");
    let result = quarantine(&outcome.records, &quarantine_dir, false);

    assert_eq!(result.success_count(), 2);
    assert!(input.join("good.png").exists());
    assert!(quarantine_dir.join("broken.jpg").exists());
    assert!(quarantine_dir.join("broken_1.jpg").exists());
}

#[test]
fn darkscore_csv_feeds_the_selector() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("walls");
    solid(&input.join("black.png"), [0, 0, 0]);
    solid(&input.join("white.png"), [255, 255, 255]);
    solid(&input.join("grey.png"), [128, 128, 128]);
    fs::write(input.join("corrupt.png"), b"nope").unwrap();

    let files = FileCatalog::new().collect_non_empty(&input).unwrap();
    let outcome = run_batch(files, &DarknessClassifier, &quiet()).unwrap();
    assert_eq!(outcome.records.len(), 4);

    let entries = entries_from_records(&outcome.records, SortOrder::Descending);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].score, 1.0);

    let csv = dir.path().join("scores.csv");
    write_csv(&entries, &csv, ',').unwrap();
    let text = fs::read_to_string(&csv).unwrap();
    assert!(text.starts_with("image,darkness\n"));
    assert_eq!(text.lines().count(), 4);

    let buckets = load_buckets(&csv, ',').unwrap();
    let mut sampler = BucketSampler::with_seed(buckets, 99);

    let night = next_for_hour(&mut sampler, 23).unwrap();
    assert_eq!(night.bucket, 0);
    assert!(night.entry.path.ends_with("black.png"));

    // grey scores ~0.498 (bucket 3), the nearest neighbour of target 2
    let noon = next_for_hour(&mut sampler, 12).unwrap();
    assert_eq!(noon.bucket, 3);
    assert!(noon.entry.path.ends_with("grey.png"));
}

#[test]
fn selector_loop_applies_through_callback() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("scores.csv");
    fs::write(&csv, "image,darkness\n/w/a.jpg,0.95\n/w/b.jpg,0.93\n").unwrap();

    let mut sampler = BucketSampler::with_seed(load_buckets(&csv, ',').unwrap(), 5);
    let stop = std::sync::atomic::AtomicBool::new(false);
    let mut applied: Vec<PathBuf> = Vec::new();
    let config = LoopConfig {
        interval: Duration::from_millis(1),
        cooldown: Duration::from_millis(1),
        interactive: false,
    };

    let count = run_loop(
        &mut sampler,
        &config,
        || 2,
        |path| {
            applied.push(path.to_path_buf());
            if applied.len() == 4 {
                stop.store(true, std::sync::atomic::Ordering::SeqCst);
            }
            true
        },
        &stop,
    );

    assert_eq!(count, 4);
    let mut first_cycle = applied[..2].to_vec();
    first_cycle.sort();
    assert_eq!(first_cycle, vec![PathBuf::from("/w/a.jpg"), PathBuf::from("/w/b.jpg")]);
}
