//! Progress reporting for long-running AI requests.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Receives progress ticks while a request is in flight.
pub trait ProgressReporter: Send + Sync {
    /// `fraction` is elapsed time over the timeout, clamped to `0.0..=1.0`.
    fn update(&self, fraction: f64, elapsed: Duration);

    /// Called once when the request ends, whatever the result.
    fn finish(&self);
}

/// Discards every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&self, _fraction: f64, _elapsed: Duration) {}

    fn finish(&self) {}
}

const BAR_WIDTH: usize = 30;

/// Single-line progress bar on stderr.
#[derive(Debug)]
pub struct TerminalProgress {
    label: String,
    drawn: Mutex<bool>,
}

impl TerminalProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            drawn: Mutex::new(false),
        }
    }
}

impl ProgressReporter for TerminalProgress {
    fn update(&self, fraction: f64, elapsed: Duration) {
        let line = render_bar(&self.label, fraction, elapsed);
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();

        if let Ok(mut drawn) = self.drawn.lock() {
            *drawn = true;
        }
    }

    fn finish(&self) {
        let Ok(mut drawn) = self.drawn.lock() else {
            return;
        };
        if *drawn {
            // Clear the bar so the next panel starts on a clean line
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\r\x1b[2K");
            let _ = stderr.flush();
            *drawn = false;
        }
    }
}

fn render_bar(label: &str, fraction: f64, elapsed: Duration) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * BAR_WIDTH as f64).round() as usize;
    format!(
        "{} [{}{}] {:>3.0}% {:.1}s",
        label,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        fraction * 100.0,
        elapsed.as_secs_f64()
    )
}
