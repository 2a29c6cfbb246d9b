use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute};
use log::{warn, LevelFilter};

/// Exit status after Ctrl-C, as a shell reports it
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

const POLL_SLICE: Duration = Duration::from_millis(100);

/// `warn` by default, `debug` with `verbose`; `RUST_LOG` overrides both
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init();
}

pub fn show_cursor() {
    let _ = execute!(io::stdout(), cursor::Show);
}

/// Hides the cursor until dropped
pub struct CursorGuard;

impl CursorGuard {
    pub fn hide() -> Self {
        let _ = execute!(io::stdout(), cursor::Hide);
        CursorGuard
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        show_cursor();
    }
}

/// Batch tools: restore the cursor and exit with 130 on Ctrl-C
pub fn exit_on_interrupt() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        show_cursor();
        let _ = io::stdout().flush();
        eprintln!("\nInterrupted by user");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
}

/// Long-running tools: Ctrl-C only raises the returned flag
pub fn stop_on_interrupt() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            eprintln!("\nInterrupted, stopping after the current step...");
        }
    })?;
    Ok(stop)
}

/// Why a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    KeyPressed,
    Stopped,
}

/// Sleep for `duration` in short slices, returning early once `stop` is set
pub fn sleep_until_stopped(duration: Duration, stop: &AtomicBool) -> Wake {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::SeqCst) {
            return Wake::Stopped;
        }
        let now = Instant::now();
        if now >= deadline {
            return Wake::Elapsed;
        }
        thread::sleep(POLL_SLICE.min(deadline - now));
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Like [`sleep_until_stopped`], but any key press ends the wait early.
///
/// The terminal is in raw mode only while waiting, so Ctrl-C arrives as a key
/// and is turned into `stop`. Without a usable terminal this degrades to a
/// plain sleep.
pub fn sleep_or_key(duration: Duration, stop: &AtomicBool) -> Wake {
    let _raw = match RawMode::enable() {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Key skipping unavailable: {}", e);
            return sleep_until_stopped(duration, stop);
        }
    };

    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::SeqCst) {
            return Wake::Stopped;
        }
        let now = Instant::now();
        if now >= deadline {
            return Wake::Elapsed;
        }

        match event::poll(POLL_SLICE.min(deadline - now)) {
            Ok(true) => {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    drain_pending_events();
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        stop.store(true, Ordering::SeqCst);
                        return Wake::Stopped;
                    }
                    return Wake::KeyPressed;
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Lost terminal input: {}", e);
                drop(_raw);
                return sleep_until_stopped(deadline.saturating_duration_since(Instant::now()), stop);
            }
        }
    }
}

fn drain_pending_events() {
    while event::poll(Duration::from_millis(0)).unwrap_or(false) {
        let _ = event::read();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_returns_after_duration() {
        let stop = AtomicBool::new(false);
        let start = Instant::now();
        assert_eq!(sleep_until_stopped(Duration::from_millis(30), &stop), Wake::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_sleep_stops_early() {
        let stop = AtomicBool::new(true);
        let start = Instant::now();
        assert_eq!(sleep_until_stopped(Duration::from_secs(60), &stop), Wake::Stopped);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_flag_wins_over_terminal() {
        let stop = AtomicBool::new(true);
        assert_eq!(sleep_or_key(Duration::from_secs(60), &stop), Wake::Stopped);
    }
}
