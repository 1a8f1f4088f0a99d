//! Transfer progress display.
//!
//! The transfer thread stores the byte count in an atomic counter through
//! the [`Progress`] trait. A separate ticker thread samples the counter and
//! redraws the progress bar; neither side ever waits for the other.

use crossbeam_channel::{Sender, bounded, select, tick};
use imgxfer_files::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Periodically refreshed progress bar for a single transfer
pub struct ProgressIndicator {
    value: Arc<AtomicU64>,
    bar: ProgressBar,
    refresh: Duration,
    ticker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ProgressIndicator {
    /// Create a progress indicator for `total` bytes, redrawn every
    /// `refresh`
    #[must_use]
    pub fn new(total: u64, refresh: Duration) -> Self {
        let bar = ProgressBar::new(total);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{percent:>3}%] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}, {elapsed_precise})")
                .expect("Invalid progress bar template")
                .progress_chars("#>-")
        );

        Self {
            value: Arc::new(AtomicU64::new(0)),
            bar,
            refresh,
            ticker: None,
        }
    }

    /// Start the ticker thread
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = tick(self.refresh);
        let value = Arc::clone(&self.value);
        let bar = self.bar.clone();

        let handle = thread::spawn(move || {
            loop {
                select! {
                    recv(ticks) -> _ => bar.set_position(value.load(Ordering::Relaxed)),
                    recv(stop_rx) -> _ => return,
                }
            }
        });

        self.ticker = Some((stop_tx, handle));
    }

    /// Stop the ticker thread and draw the final value
    pub fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.ticker.take() {
            // The ticker exits on a message or on disconnect.
            let _ = stop_tx.send(());
            let _ = handle.join();
        }
        self.bar.set_position(self.value());
    }

    /// Finish the bar, leaving `msg` on screen
    pub fn finish_with_message(&mut self, msg: String) {
        self.stop();
        self.bar.finish_with_message(msg);
    }

    /// Abandon the bar (for errors)
    pub fn abandon(&mut self) {
        self.stop();
        self.bar.abandon();
    }

    /// Bytes reported so far
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Progress for ProgressIndicator {
    fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if let Some((stop_tx, handle)) = self.ticker.take() {
            let _ = stop_tx.send(());
            let _ = handle.join();
        }
    }
}

/// Format bytes in human-readable format
///
/// # Example
///
/// ```ignore
/// assert_eq!(format_bytes(1024), "1.00 KiB");
/// assert_eq!(format_bytes(1024 * 1024), "1.00 MiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{size:.2} {}", UNITS[unit_idx])
}

/// Format speed in human-readable format (bytes/sec)
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec as u64))
}

/// Format duration with millisecond precision
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        let whole = duration.as_secs();
        format!("{}m {}s", whole / 60, whole % 60)
    }
}
