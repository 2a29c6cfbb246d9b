use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use chrono::{DateTime, Local, Timelike};
use console::style;
use log::{error, info};

use crate::darkness::{target_bucket_for_hour, DarknessEntry};
use crate::error::SamplerError;
use crate::sampler::BucketSampler;
use crate::terminal::{sleep_or_key, sleep_until_stopped, Wake};

/// Default pause between wallpaper changes
pub const DEFAULT_LOOP_INTERVAL: Duration = Duration::from_secs(60);

/// Pause before retrying after the sampler ran dry
pub const EXHAUSTED_COOLDOWN: Duration = Duration::from_secs(60);

/// Current local hour, 0-23
pub fn local_hour() -> u32 {
    Local::now().hour()
}

/// A wallpaper chosen for a given hour
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// When the pick was made
    pub at: DateTime<Local>,
    pub hour: u32,
    pub target: usize,
    pub bucket: usize,
    pub entry: DarknessEntry,
}

impl Selection {
    /// `[Tue Oct 14 21:00:03 2025] Hour: 21 | Selected: /walls/a.jpg | Score: 0.95`
    pub fn log_line(&self) -> String {
        format!(
            "[{}] Hour: {} | Selected: {} | Score: {}",
            self.at.format("%a %b %e %H:%M:%S %Y"),
            self.hour,
            self.entry.path.display(),
            self.entry.score
        )
    }
}

/// Uniform pick for a one-off run; the rotation state is left untouched
pub fn pick_for_hour(
    sampler: &mut BucketSampler<DarknessEntry>,
    hour: u32,
) -> Result<Selection, SamplerError> {
    let target = target_bucket_for_hour(hour);
    let (bucket, entry) = sampler.pick_random(target)?;
    Ok(Selection { at: Local::now(), hour, target, bucket, entry })
}

/// Next wallpaper in the rotation for `hour`
pub fn next_for_hour(
    sampler: &mut BucketSampler<DarknessEntry>,
    hour: u32,
) -> Result<Selection, SamplerError> {
    let target = target_bucket_for_hour(hour);
    let (bucket, entry) = sampler.get_next(target)?;
    Ok(Selection { at: Local::now(), hour, target, bucket, entry })
}

pub fn print_bucket_info(sizes: &[usize]) {
    println!(
        "{}",
        style("Map darkness score (0=bright, 1=dark) → bucket 0-5 (0=darkest, 5=brightest)").cyan()
    );
    for (bucket, size) in sizes.iter().enumerate() {
        println!("bucket {} has {} images", bucket, size);
    }
}

/// Timing and input behaviour of the rotation loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub interval: Duration,
    pub cooldown: Duration,
    /// Let any key press skip the wait. Off for daemon runs.
    pub interactive: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_LOOP_INTERVAL,
            cooldown: EXHAUSTED_COOLDOWN,
            interactive: true,
        }
    }
}

/// Rotate wallpapers until `stop` is raised.
///
/// Each round asks `hour` for the local hour, takes the next entry for that
/// hour and hands its path to `apply`. A failed selection is logged and
/// retried after the cooldown instead of ending the loop. Returns the number
/// of wallpapers applied successfully.
pub fn run_loop<H, A>(
    sampler: &mut BucketSampler<DarknessEntry>,
    config: &LoopConfig,
    mut hour: H,
    mut apply: A,
    stop: &AtomicBool,
) -> usize
where
    H: FnMut() -> u32,
    A: FnMut(&Path) -> bool,
{
    let mut applied = 0;

    while !stop.load(Ordering::SeqCst) {
        let wait = match next_for_hour(sampler, hour()) {
            Ok(selection) => {
                println!("{}", selection.log_line());
                info!(
                    "Target bucket {} (used {}) for hour {}",
                    selection.target, selection.bucket, selection.hour
                );
                if apply(&selection.entry.path) {
                    applied += 1;
                }
                config.interval
            }
            Err(e) => {
                error!("Error in loop: {}", e);
                config.cooldown
            }
        };

        if stop.load(Ordering::SeqCst) {
            break;
        }

        if config.interactive {
            println!(
                "Sleeping for {}s (press any key to skip)...",
                wait.as_secs()
            );
            if sleep_or_key(wait, stop) == Wake::KeyPressed {
                println!("Sleep interrupted by user!");
            }
        } else {
            sleep_until_stopped(wait, stop);
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::darkness::{into_buckets, BUCKET_COUNT};
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn entry(path: &str, score: f64) -> DarknessEntry {
        DarknessEntry { path: PathBuf::from(path), score }
    }

    fn quick() -> LoopConfig {
        LoopConfig {
            interval: Duration::from_millis(1),
            cooldown: Duration::from_millis(1),
            interactive: false,
        }
    }

    #[test]
    fn test_log_line_uses_pick_time() {
        let at = Local.with_ymd_and_hms(2025, 10, 14, 21, 0, 3).unwrap();
        let selection = Selection {
            at,
            hour: 21,
            target: 0,
            bucket: 0,
            entry: entry("/walls/a.jpg", 0.95),
        };
        assert_eq!(
            selection.log_line(),
            "[Tue Oct 14 21:00:03 2025] Hour: 21 | Selected: /walls/a.jpg | Score: 0.95"
        );
    }

    #[test]
    fn test_pick_records_its_time() {
        let buckets = into_buckets(vec![entry("a.jpg", 0.95)]);
        let mut sampler = BucketSampler::with_seed(buckets, 3);
        let before = Local::now();
        let selection = next_for_hour(&mut sampler, 23).unwrap();
        let after = Local::now();
        assert!(before <= selection.at && selection.at <= after);
    }

    #[test]
    fn test_single_shot_uses_fallback() {
        let buckets = into_buckets(vec![entry("a.jpg", 0.95), entry("b.jpg", 0.05), entry("c.jpg", 0.5)]);
        let mut sampler = BucketSampler::with_seed(buckets, 1);

        let night = pick_for_hour(&mut sampler, 21).unwrap();
        assert_eq!((night.target, night.bucket), (0, 0));
        assert_eq!(night.entry.path, PathBuf::from("a.jpg"));

        let morning = pick_for_hour(&mut sampler, 11).unwrap();
        assert_eq!(morning.target, 2);
        assert!([1, 3].contains(&morning.bucket));
    }

    #[test]
    fn test_loop_rotates_through_bucket_until_stopped() {
        let buckets = into_buckets(vec![
            entry("n1.jpg", 0.95),
            entry("n2.jpg", 0.97),
            entry("n3.jpg", 0.99),
        ]);
        let mut sampler = BucketSampler::with_seed(buckets, 4);
        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();

        let applied = run_loop(
            &mut sampler,
            &quick(),
            || 22,
            |path| {
                seen.push(path.to_path_buf());
                if seen.len() == 3 {
                    stop.store(true, Ordering::SeqCst);
                }
                true
            },
            &stop,
        );

        assert_eq!(applied, 3);
        let unique: HashSet<_> = seen.into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_loop_survives_exhaustion() {
        let mut sampler: BucketSampler<DarknessEntry> =
            BucketSampler::with_seed(vec![Vec::new(); BUCKET_COUNT], 2);
        let stop = AtomicBool::new(false);
        let rounds = Cell::new(0);

        let applied = run_loop(
            &mut sampler,
            &quick(),
            || {
                rounds.set(rounds.get() + 1);
                if rounds.get() == 3 {
                    stop.store(true, Ordering::SeqCst);
                }
                12
            },
            |_| true,
            &stop,
        );

        assert_eq!(applied, 0);
        assert_eq!(rounds.get(), 3);
    }

    #[test]
    fn test_failed_apply_is_not_counted() {
        let buckets = into_buckets(vec![entry("only.jpg", 0.1)]);
        let mut sampler = BucketSampler::with_seed(buckets, 8);
        let stop = AtomicBool::new(false);
        let calls = Cell::new(0);

        let applied = run_loop(
            &mut sampler,
            &quick(),
            || 8,
            |_| {
                calls.set(calls.get() + 1);
                if calls.get() == 2 {
                    stop.store(true, Ordering::SeqCst);
                }
                false
            },
            &stop,
        );

        assert_eq!(calls.get(), 2);
        assert_eq!(applied, 0);
    }
}
