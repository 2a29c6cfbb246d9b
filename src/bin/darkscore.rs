use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use wallsort::classifiers::DarknessClassifier;
use wallsort::darkness::{entries_from_records, write_csv, SortOrder, DEFAULT_DELIMITER};
use wallsort::pool::PoolConfig;
use wallsort::progress::ReporterConfig;
use wallsort::report::print_timing;
use wallsort::terminal::{exit_on_interrupt, init_logging, CursorGuard};
use wallsort::{run_batch, BatchOptions, FileCatalog};

#[derive(Parser)]
#[command(
    name = "darkscore",
    version,
    about = "Give every wallpaper a darkness score",
    long_about = "Scan an image or a folder of images recursively, score each image from 0 (bright) to 1 (dark) and write the scores to a CSV file for darkscore-select."
)]
struct Cli {
    /// Image file or folder to score
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Image file or folder containing images (recursive)"
    )]
    input: PathBuf,

    /// CSV file to write
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to output CSV file"
    )]
    output: PathBuf,

    /// Sort rows by score, darkest first
    #[arg(
        short = 's',
        long,
        visible_aliases = ["sort", "sortd"],
        conflicts_with = "sort_asc",
        help = "Sort output by darkness score in descending order"
    )]
    sort_desc: bool,

    /// Sort rows by score, brightest first
    #[arg(
        long,
        visible_alias = "sorta",
        help = "Sort output by darkness score in ascending order"
    )]
    sort_asc: bool,

    /// CSV field delimiter
    #[arg(
        long,
        default_value_t = DEFAULT_DELIMITER,
        help = "CSV field delimiter"
    )]
    delimiter: char,

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

    let mut catalog = FileCatalog::new();
    catalog.set_verbose(args.verbose);
    let files = catalog
        .collect_non_empty(&args.input)
        .with_context(|| format!("Cannot score images in {}", args.input.display()))?;

    let options = BatchOptions {
        pool: PoolConfig {
            threads: args.threads,
            ..PoolConfig::default()
        },
        reporter: ReporterConfig::default(),
        groups: None,
    };

    println!("{}", style("🌓 Scoring wallpapers...").cyan().bold());
    let outcome = {
        let _cursor = CursorGuard::hide();
        run_batch(files, &DarknessClassifier, &options)?
    };
    print_timing(outcome.elapsed, outcome.records.len());
    println!("Total files processed: {}", outcome.records.len());

    let order = if args.sort_desc {
        SortOrder::Descending
    } else if args.sort_asc {
        SortOrder::Ascending
    } else {
        SortOrder::Unsorted
    };

    let entries = entries_from_records(&outcome.records, order);
    if args.verbose {
        for entry in &entries {
            println!("{} => {}", entry.path.display(), entry.score);
        }
    }

    write_csv(&entries, &args.output, args.delimiter)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let skipped = outcome.records.len() - entries.len();
    if skipped > 0 {
        println!("{}", style(format!("⚠️  {} unreadable images skipped", skipped)).yellow());
    }
    println!(
        "{} {}",
        style("✅ Results written to").green().bold(),
        args.output.display()
    );

    Ok(())
}
