use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use log::info;

use wallsort::actions::run_command;
use wallsort::darkness::{load_buckets, DEFAULT_DELIMITER};
use wallsort::select::{local_hour, pick_for_hour, print_bucket_info, run_loop, LoopConfig, EXHAUSTED_COOLDOWN};
use wallsort::terminal::{init_logging, stop_on_interrupt};
use wallsort::BucketSampler;

#[derive(Parser)]
#[command(
    name = "darkscore-select",
    version,
    about = "Pick a wallpaper for the time of day",
    long_about = "Select a wallpaper from a darkscore CSV based on the time of day and its darkness score (night = dark, day = bright), optionally passing it to a command that applies it."
)]
struct Cli {
    /// CSV produced by darkscore
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "CSV file written by darkscore"
    )]
    input: PathBuf,

    /// Command that receives the chosen image path as its only argument
    #[arg(
        short,
        long,
        value_name = "COMMAND",
        help = "Pass the image to a command (e.g. plasma-apply-wallpaperimage)"
    )]
    exec: Option<String>,

    /// Keep changing wallpapers
    #[arg(
        short,
        long,
        help = "Keep selecting wallpapers in a loop"
    )]
    r#loop: bool,

    /// Unattended loop for running under a service manager
    #[arg(
        short,
        long,
        help = "Run as a non-interactive loop with timestamped logs"
    )]
    daemon: bool,

    /// Pause between changes in milliseconds
    #[arg(
        short,
        long,
        value_name = "MS",
        default_value = "60000",
        help = "Sleep between changes in loop mode (milliseconds)"
    )]
    sleep: u64,

    /// CSV field delimiter
    #[arg(
        long,
        default_value_t = DEFAULT_DELIMITER,
        help = "CSV field delimiter"
    )]
    delimiter: char,

    /// Verbose output
    #[arg(
        short,
        long,
        help = "Enable verbose output"
    )]
    verbose: bool,
}

fn apply(exec: Option<&str>, path: &Path) -> bool {
    match exec {
        Some(program) => run_command(program, path),
        None => true,
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose || args.daemon);

    let buckets = load_buckets(&args.input, args.delimiter)
        .with_context(|| format!("Cannot load wallpapers from {}", args.input.display()))?;

    if !args.daemon {
        let sizes: Vec<usize> = buckets.iter().map(Vec::len).collect();
        print_bucket_info(&sizes);
    }

    let exec = args.exec.as_deref();

    if args.r#loop || args.daemon {
        let stop = stop_on_interrupt().context("Failed to set signal handler")?;
        let config = LoopConfig {
            interval: Duration::from_millis(args.sleep),
            cooldown: EXHAUSTED_COOLDOWN,
            interactive: !args.daemon,
        };
        let mut sampler = BucketSampler::new(buckets);

        let applied = run_loop(&mut sampler, &config, local_hour, |path| apply(exec, path), &stop);
        info!("Stopped after applying {} wallpapers", applied);
        return Ok(());
    }

    let hour = local_hour();
    let mut sampler = BucketSampler::new(buckets);
    let selection = pick_for_hour(&mut sampler, hour)?;

    println!("Current hour: {}", selection.hour);
    println!("Target bucket: {} (used {})", selection.target, selection.bucket);
    println!(
        "{} {}",
        style("Selected wallpaper:").green().bold(),
        selection.entry.path.display()
    );
    println!("Darkness score: {}", selection.entry.score);
    println!("{}", selection.log_line());

    if !apply(exec, &selection.entry.path) {
        eprintln!("{}", style("⚠️  Wallpaper command failed").yellow());
    }

    Ok(())
}
