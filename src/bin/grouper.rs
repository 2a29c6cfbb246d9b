use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use console::style;

use wallsort::actions::{group_into_folders, Transfer};
use wallsort::classifiers::{GroupClassifier, GroupingConfig};
use wallsort::features::Algorithm;
use wallsort::groups::DEFAULT_MIN_CONFIDENCE;
use wallsort::pool::PoolConfig;
use wallsort::progress::ReporterConfig;
use wallsort::report::{grouping_report, print_group_summary, print_timing, write_json, write_report};
use wallsort::terminal::{exit_on_interrupt, init_logging, CursorGuard};
use wallsort::{run_batch, BatchOptions, FileCatalog};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// k-means clustering on the resized image
    Kmeans,
    /// k-means on a small thumbnail, faster and coarser
    KmeansFast,
    /// Peaks of an HSV histogram
    Histogram,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Kmeans => Algorithm::KMeans,
            AlgorithmArg::KmeansFast => Algorithm::KMeansFast,
            AlgorithmArg::Histogram => Algorithm::Histogram,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "grouper",
    version,
    about = "Group wallpapers by color palette",
    long_about = "Extract the dominant colors of every image in a folder, assign each image to the closest color group and optionally copy or move the images into one folder per group."
)]
struct Cli {
    /// Folder of images to group
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Input folder (scanned recursively)"
    )]
    input: PathBuf,

    /// Where group folders are created
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Output folder; requires --copy or --move"
    )]
    output: Option<PathBuf>,

    /// Copy images into group folders
    #[arg(
        short,
        long,
        conflicts_with = "move_files",
        requires = "output",
        help = "Copy files to the output folder"
    )]
    copy: bool,

    /// Move images into group folders
    #[arg(
        short = 'm',
        long = "move",
        requires = "output",
        help = "Move files to the output folder"
    )]
    move_files: bool,

    /// Dominant color extraction algorithm
    #[arg(
        short,
        long,
        value_enum,
        default_value = "kmeans",
        help = "Algorithm used to find dominant colors"
    )]
    algorithm: AlgorithmArg,

    /// Number of dominant colors per image
    #[arg(
        long,
        default_value = "5",
        help = "Number of dominant colors extracted per image"
    )]
    colors: usize,

    /// Confidence below which an image goes to Miscellaneous
    #[arg(
        long,
        default_value_t = DEFAULT_MIN_CONFIDENCE,
        help = "Minimum group confidence (0-1)"
    )]
    min_confidence: f64,

    /// Plain-text report
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Save a text report"
    )]
    report: Option<PathBuf>,

    /// JSON report
    #[arg(
        long,
        value_name = "FILE",
        help = "Save every result as JSON"
    )]
    json: Option<PathBuf>,

    /// Perform a dry run without making actual changes
    #[arg(
        long,
        help = "Show what would be done without making changes"
    )]
    dry_run: bool,

    /// Number of worker threads
    #[arg(
        long,
        default_value = "0",
        help = "Number of threads (0 = auto-detect)"
    )]
    threads: usize,

    /// Verbose output
    #[arg(
        short,
        long,
        help = "Enable verbose output"
    )]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);
    exit_on_interrupt().context("Failed to set signal handler")?;

    if !(0.0..=1.0).contains(&args.min_confidence) {
        bail!("--min-confidence must be between 0 and 1");
    }
    if args.colors == 0 {
        bail!("--colors must be at least 1");
    }
    if args.output.is_some() && !args.copy && !args.move_files {
        println!(
            "{}",
            style("Output folder given without --copy or --move; files stay in place").yellow()
        );
    }

    let mut catalog = FileCatalog::new();
    catalog.set_verbose(args.verbose);
    let files = catalog
        .collect_non_empty(&args.input)
        .with_context(|| format!("Cannot group images in {}", args.input.display()))?;

    let classifier = GroupClassifier::new(GroupingConfig {
        algorithm: args.algorithm.into(),
        colors: args.colors,
        min_confidence: args.min_confidence,
        ..GroupingConfig::default()
    });

    let options = BatchOptions {
        pool: PoolConfig {
            threads: args.threads,
            ..PoolConfig::default()
        },
        reporter: ReporterConfig {
            show_groups: true,
            ..ReporterConfig::default()
        },
        groups: Some(classifier.group_names()),
    };

    println!("{}", style("🎨 Grouping wallpapers by color...").cyan().bold());
    let mut outcome = {
        let _cursor = CursorGuard::hide();
        run_batch(files, &classifier, &options)?
    };
    outcome.records.sort_by(|a, b| a.path.cmp(&b.path));

    print_timing(outcome.elapsed, outcome.records.len());
    print_group_summary(&outcome.records);

    let transfer = if args.copy {
        Some(Transfer::Copy)
    } else if args.move_files {
        Some(Transfer::Move)
    } else {
        None
    };

    if let (Some(transfer), Some(output)) = (transfer, &args.output) {
        if args.dry_run {
            println!("{}", style("🧪 Dry run mode - no changes will be made").yellow().bold());
        }
        let result = group_into_folders(&outcome.records, output, transfer, args.dry_run);
        result.print_summary();
    }

    if let Some(path) = &args.report {
        write_report(path, &grouping_report(&outcome.records))
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        write_json(path, &outcome.records)
            .with_context(|| format!("Failed to write JSON report {}", path.display()))?;
    }

    println!();
    println!("{}", style("✅ Done!").green().bold());
    Ok(())
}
