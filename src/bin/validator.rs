use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use dialoguer::{Confirm, Select};

use wallsort::actions::{apply_action, quarantine};
use wallsort::classifiers::ValidityClassifier;
use wallsort::pool::{PoolConfig, Strategy};
use wallsort::progress::ReporterConfig;
use wallsort::report::{print_timing, print_validation_summary, validation_report, write_json, write_report};
use wallsort::terminal::{exit_on_interrupt, init_logging, CursorGuard};
use wallsort::{run_batch, BatchOptions, FileAction, FileCatalog, ImageRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CorruptAction {
    /// Delete corrupted files permanently
    Delete,
    /// Move corrupted files to the quarantine folder
    Move,
    /// Leave corrupted files in place
    None,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Workers pull files from a shared queue
    Dynamic,
    /// Files are split into one fixed chunk per worker
    Static,
}

#[derive(Parser)]
#[command(
    name = "validator",
    version,
    about = "Find corrupted or unreadable images",
    long_about = "Fully decode every image in a folder, list the ones that fail and optionally delete them or move them to a quarantine folder."
)]
struct Cli {
    /// Folder of images to check
    #[arg(value_name = "PATH", default_value = ".", help = "Folder to validate (recursive)")]
    input: PathBuf,

    /// What to do with corrupted files
    #[arg(
        short,
        long,
        value_enum,
        help = "Action for corrupted files (asks when omitted)"
    )]
    action: Option<CorruptAction>,

    /// Quarantine folder for the move action
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = "corrupted_images",
        help = "Folder corrupted files are moved to"
    )]
    quarantine: PathBuf,

    /// Skip confirmation prompts
    #[arg(
        short,
        long,
        help = "Skip confirmation prompts (use with caution)"
    )]
    yes: bool,

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

    /// How files are distributed to workers
    #[arg(
        long,
        value_enum,
        default_value = "dynamic",
        help = "Work distribution strategy"
    )]
    strategy: StrategyArg,

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

fn choose_action() -> Result<CorruptAction> {
    let choices = [
        "Delete them permanently",
        "Move them to the quarantine folder",
        "Do nothing",
    ];
    let picked = Select::new()
        .with_prompt("What would you like to do with corrupted files?")
        .items(&choices)
        .default(2)
        .interact()?;

    Ok(match picked {
        0 => CorruptAction::Delete,
        1 => CorruptAction::Move,
        _ => CorruptAction::None,
    })
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);
    exit_on_interrupt().context("Failed to set signal handler")?;

    let mut catalog = FileCatalog::new();
    catalog.set_verbose(args.verbose);
    let files = catalog
        .collect_non_empty(&args.input)
        .with_context(|| format!("Cannot validate images in {}", args.input.display()))?;

    let options = BatchOptions {
        pool: PoolConfig {
            threads: args.threads,
            strategy: match args.strategy {
                StrategyArg::Dynamic => Strategy::Dynamic,
                StrategyArg::Static => Strategy::Static,
            },
            ..PoolConfig::default()
        },
        reporter: ReporterConfig::default(),
        groups: None,
    };

    println!("{}", style("🔍 Validating images...").cyan().bold());
    let mut outcome = {
        let _cursor = CursorGuard::hide();
        run_batch(files, &ValidityClassifier, &options)?
    };
    outcome.records.sort_by(|a, b| a.path.cmp(&b.path));

    print_timing(outcome.elapsed, outcome.records.len());
    print_validation_summary(&outcome.records);

    if let Some(path) = &args.report {
        write_report(path, &validation_report(&outcome.records))
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        write_json(path, &outcome.records)
            .with_context(|| format!("Failed to write JSON report {}", path.display()))?;
    }

    let corrupted: Vec<ImageRecord> = outcome
        .records
        .iter()
        .filter(|record| !record.result.is_valid())
        .cloned()
        .collect();

    if corrupted.is_empty() {
        println!("{}", style("✅ No corrupted images found!").green().bold());
        return Ok(());
    }

    let action = match args.action {
        Some(action) => action,
        None => choose_action()?,
    };

    if action == CorruptAction::None {
        println!("No action taken.");
        return Ok(());
    }

    if args.dry_run {
        println!("{}", style("🧪 Dry run mode - no changes will be made").yellow().bold());
    } else if action == CorruptAction::Delete && !args.yes {
        let proceed = Confirm::new()
            .with_prompt(format!("Do you want to DELETE all {} corrupted files?", corrupted.len()))
            .interact()?;
        if !proceed {
            println!("{}", style("Deletion cancelled").yellow());
            return Ok(());
        }
    }

    let result = if action == CorruptAction::Delete {
        apply_action(&corrupted, &FileAction::Delete, args.dry_run)
    } else {
        quarantine(&corrupted, &args.quarantine, args.dry_run)
    };
    result.print_summary();

    Ok(())
}
