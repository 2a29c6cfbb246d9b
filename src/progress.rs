use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};

use crate::aggregator::ResultAggregator;
use crate::utils::format_duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_WINDOW: usize = 10;

/// Throughput figures computed on one reporting tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Items per second since the previous tick
    pub instant_rate: f64,
    /// Mean of the last window of ticks that made progress
    pub moving_avg_rate: f64,
    pub peak_rate: f64,
    /// Only known while work remains and the average is positive
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    /// `(avg: 12.3 i/s) (top: 15.0 i/s) ETA: 1m 4s`
    pub fn rate_line(&self) -> String {
        let mut line = format!(
            "(avg: {:.1} i/s) (top: {:.1} i/s)",
            self.moving_avg_rate, self.peak_rate
        );
        if let Some(eta) = self.eta {
            line.push_str(&format!(" ETA: {}", format_duration(eta)));
        }
        line
    }
}

/// Moving-average rate and ETA over a stream of processed counts.
///
/// Time is passed in so the math can be driven by tests.
#[derive(Debug, Clone)]
pub struct RateTracker {
    start: Instant,
    prev_time: Instant,
    prev_count: usize,
    samples: VecDeque<f64>,
    window: usize,
    peak: f64,
}

impl RateTracker {
    pub fn new(start: Instant, window: usize) -> Self {
        Self {
            start,
            prev_time: start,
            prev_count: 0,
            samples: VecDeque::with_capacity(window.max(1)),
            window: window.max(1),
            peak: 0.0,
        }
    }

    pub fn sample(&mut self, current: usize, total: usize, now: Instant) -> ProgressSnapshot {
        let delta = now.saturating_duration_since(self.prev_time).as_secs_f64();
        let advanced = current.saturating_sub(self.prev_count);

        let instant_rate = if delta > 0.0 { advanced as f64 / delta } else { 0.0 };

        // idle ticks would drag the average towards zero
        if advanced > 0 {
            self.samples.push_back(instant_rate);
            if self.samples.len() > self.window {
                self.samples.pop_front();
            }
        }

        let moving_avg_rate = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        };

        if moving_avg_rate > self.peak {
            self.peak = moving_avg_rate;
        }

        self.prev_time = now;
        self.prev_count = current;

        let eta = if moving_avg_rate > 0.0 && current < total {
            Some(Duration::from_secs_f64((total - current) as f64 / moving_avg_rate))
        } else {
            None
        };

        ProgressSnapshot {
            processed: current,
            total,
            elapsed: now.saturating_duration_since(self.start),
            instant_rate,
            moving_avg_rate,
            peak_rate: self.peak,
            eta,
        }
    }
}

/// Configuration for the progress loop
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub interval: Duration,
    pub window: usize,
    /// Render live per-group counters above the bar
    pub show_groups: bool,
    /// Draw nothing; used by tests and non-interactive runs
    pub hidden: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            window: DEFAULT_WINDOW,
            show_groups: false,
            hidden: false,
        }
    }
}

/// Background loop that polls the aggregator and renders throughput
pub struct ProgressReporter {
    config: ReporterConfig,
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: usize, config: ReporterConfig) -> Self {
        let bar = if config.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        bar.set_length(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix}{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {percent}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );

        Self { config, bar }
    }

    /// Poll until `running` is cleared, then render once more and return the
    /// final figures. Never interrupts a tick.
    pub fn run(&self, aggregator: &ResultAggregator, running: &AtomicBool) -> ProgressSnapshot {
        let mut tracker = RateTracker::new(Instant::now(), self.config.window);

        while running.load(Ordering::Acquire) {
            thread::sleep(self.config.interval);
            self.tick(&mut tracker, aggregator);
        }

        let last = self.tick(&mut tracker, aggregator);
        self.bar.finish();
        last
    }

    fn tick(&self, tracker: &mut RateTracker, aggregator: &ResultAggregator) -> ProgressSnapshot {
        let snapshot = tracker.sample(aggregator.processed(), aggregator.total(), Instant::now());
        self.render(&snapshot, aggregator);
        snapshot
    }

    fn render(&self, snapshot: &ProgressSnapshot, aggregator: &ResultAggregator) {
        if self.config.show_groups {
            let counts = aggregator.snapshot().group_counts;
            let width = counts.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            let mut table = String::new();
            for (name, count) in counts {
                table.push_str(&format!("{:<width$} : {}\n", name, count, width = width));
            }
            self.bar.set_prefix(table);
        }
        self.bar.set_position(snapshot.processed as u64);
        self.bar.set_message(snapshot.rate_line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassificationResult, ImageRecord};
    use std::path::Path;

    #[test]
    fn test_constant_rate_converges_and_eta_decreases() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(start, DEFAULT_WINDOW);
        let mut previous_eta = None;

        for tick in 1..=20u32 {
            let now = start + Duration::from_millis(300) * tick;
            let snapshot = tracker.sample(tick as usize * 30, 3000, now);

            assert!((snapshot.moving_avg_rate - 100.0).abs() < 1e-6);
            let eta = snapshot.eta.unwrap();
            if let Some(previous) = previous_eta {
                assert!(eta < previous);
            }
            previous_eta = Some(eta);
        }
    }

    #[test]
    fn test_idle_ticks_do_not_dilute_average() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(start, DEFAULT_WINDOW);
        tracker.sample(10, 100, start + Duration::from_secs(1));
        let idle = tracker.sample(10, 100, start + Duration::from_secs(2));

        assert_eq!(idle.instant_rate, 0.0);
        assert!((idle.moving_avg_rate - 10.0).abs() < 1e-9);
        assert_eq!(idle.eta, Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_window_keeps_last_samples() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(start, 2);
        tracker.sample(100, 1000, start + Duration::from_secs(1));
        tracker.sample(110, 1000, start + Duration::from_secs(2));
        let snapshot = tracker.sample(120, 1000, start + Duration::from_secs(3));

        assert!((snapshot.moving_avg_rate - 10.0).abs() < 1e-9);
        assert!((snapshot.peak_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_eta_before_progress_or_after_completion() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(start, DEFAULT_WINDOW);
        assert_eq!(tracker.sample(0, 10, start + Duration::from_secs(1)).eta, None);
        assert_eq!(tracker.sample(10, 10, start + Duration::from_secs(2)).eta, None);
    }

    #[test]
    fn test_reporter_stops_when_flag_cleared() {
        let aggregator = ResultAggregator::with_groups(2, ["Blue_Cool"]);
        let running = AtomicBool::new(true);
        let reporter = ProgressReporter::new(
            2,
            ReporterConfig {
                interval: Duration::from_millis(5),
                show_groups: true,
                hidden: true,
                ..ReporterConfig::default()
            },
        );

        let last = thread::scope(|scope| {
            let handle = scope.spawn(|| reporter.run(&aggregator, &running));
            for name in ["a.png", "b.png"] {
                aggregator.record(ImageRecord::new(
                    Path::new(name),
                    ClassificationResult::DarknessScore { score: 0.2 },
                ));
            }
            thread::sleep(Duration::from_millis(20));
            running.store(false, Ordering::Release);
            handle.join().unwrap()
        });

        assert_eq!(last.processed, 2);
        assert_eq!(last.total, 2);
        assert_eq!(last.eta, None);
    }
}
