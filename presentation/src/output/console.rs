//! Console notifier.
//!
//! Implements the application's [`Notifier`] port for a terminal: streamed
//! deltas are written as they arrive, classified errors become a colored
//! line in place of a toast.

use colored::Colorize;
use safra_application::Notifier;
use std::io::Write;

/// Notifier that renders exchange signals on stdout/stderr.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Notifier for ConsoleNotifier {
    fn on_exchange_start(&self) {
        if !self.quiet {
            println!();
        }
    }

    fn on_content_delta(&self, delta: &str) {
        print!("{}", delta);
        // Deltas rarely end in a newline; flush so they appear immediately
        let _ = std::io::stdout().flush();
    }

    fn on_exchange_end(&self) {
        println!();
    }

    fn notify_error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
}
