//! Batch progress reporting and logging setup.
//!
//! Batch mode shows an indicatif bar, or in log-only mode hides it and prints
//! tail-friendly `[phase] n/total (pct%)` lines to stderr instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber. `RUST_LOG` wins when set; otherwise
/// the level is `warn`, or `debug` for this crate with `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,chordpro_transform=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress over a fixed number of songs, safe to advance from rayon workers.
pub struct BatchProgress {
    bar: ProgressBar,
    phase: &'static str,
    total: u64,
    done: AtomicU64,
    log_only: bool,
    log_interval: u64,
}

impl BatchProgress {
    pub fn new(phase: &'static str, total: u64, log_only: bool) -> Self {
        let bar = ProgressBar::new(total);
        if log_only {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                    .unwrap()
                    .progress_chars("=> "),
            );
        }
        bar.set_message(phase);

        Self {
            bar,
            phase,
            total,
            done: AtomicU64::new(0),
            log_only,
            log_interval: (total / 20).max(1),
        }
    }

    /// Count one finished song. Returns the number finished so far.
    pub fn inc(&self) -> u64 {
        let current = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);
        if let Some(line) = self.log_line(current) {
            eprintln!("{}", line);
        }
        current
    }

    fn log_line(&self, current: u64) -> Option<String> {
        if !self.log_only || (current % self.log_interval != 0 && current != self.total) {
            return None;
        }
        let pct = 100.0 * current as f64 / self.total as f64;
        Some(format!("[{}] {}/{} ({:.1}%)", self.phase, current, self.total, pct))
    }

    pub fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs_f64(2.5)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_log_lines_only_in_log_only_mode() {
        let quiet = BatchProgress::new("transform", 40, false);
        assert_eq!(quiet.log_line(40), None);

        let progress = BatchProgress::new("transform", 40, true);
        assert_eq!(progress.log_line(1), None);
        assert_eq!(progress.log_line(2).as_deref(), Some("[transform] 2/40 (5.0%)"));
        assert_eq!(progress.log_line(40).as_deref(), Some("[transform] 40/40 (100.0%)"));
    }

    #[test]
    fn test_inc_counts_from_threads() {
        let progress = BatchProgress::new("transform", 8, false);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| progress.inc());
            }
        });
        assert_eq!(progress.done.load(Ordering::Relaxed), 8);
    }
}
