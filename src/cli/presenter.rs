//! CLI presenter for output formatting

use std::time::Duration as StdDuration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::recording::{format_clock, DeviceDescriptor};

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.red} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (paths, values; the scriptable part)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Spinner text while recording
    pub fn format_recording(&self, elapsed: StdDuration, stop_after: Option<StdDuration>) -> String {
        match stop_after {
            Some(total) => format!(
                "Recording {} / {}",
                format_clock(elapsed.min(total)).bold(),
                format_clock(total)
            ),
            None => format!(
                "Recording {} {}",
                format_clock(elapsed).bold(),
                "(Ctrl+C to stop)".dimmed()
            ),
        }
    }

    /// Update recording progress
    pub fn update_recording(&self, elapsed: StdDuration, stop_after: Option<StdDuration>) {
        self.update_spinner(&self.format_recording(elapsed, stop_after));
    }

    /// Print one input device line
    pub fn device(&self, device: &DeviceDescriptor) {
        let marker = if device.is_default {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:>3}  {}  ({} ch, {} Hz)",
            marker,
            device.id,
            device.name,
            device.max_input_channels,
            device.default_sample_rate
        );
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn format_recording_open_ended() {
        plain();
        let presenter = Presenter::new();
        let text = presenter.format_recording(StdDuration::from_secs(75), None);
        assert!(text.contains("01:15"));
        assert!(text.contains("Ctrl+C"));
    }

    #[test]
    fn format_recording_with_limit() {
        plain();
        let presenter = Presenter::new();
        let text = presenter.format_recording(
            StdDuration::from_secs(12),
            Some(StdDuration::from_secs(30)),
        );
        assert!(text.contains("00:12 / 00:30"));
    }

    #[test]
    fn format_recording_clamps_to_limit() {
        plain();
        let presenter = Presenter::new();
        let text = presenter.format_recording(
            StdDuration::from_millis(30_400),
            Some(StdDuration::from_secs(30)),
        );
        assert!(text.contains("00:30 / 00:30"));
    }
}
