//! Terminal presentation.
//!
//! Pretty mode keeps the status line on an indicatif spinner and prints
//! result cards above it. Plain mode writes status changes to stderr and
//! cards to stdout, one block per verification.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::present::{Badge, PresentationSink, ResultCard, ScannerStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }

    fn use_pretty(self, is_tty: bool, disable_pretty: bool) -> bool {
        is_tty
            && match self {
                UiMode::Pretty => true,
                UiMode::Auto => !disable_pretty,
                UiMode::Plain => false,
            }
    }
}

/// `PresentationSink` for an operator terminal.
pub struct TerminalSink {
    spinner: Option<ProgressBar>,
}

impl TerminalSink {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        let spinner = mode.use_pretty(is_tty, disable_pretty).then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner
        });
        Self { spinner }
    }

    fn emit_card(&self, text: String) {
        match &self.spinner {
            Some(spinner) => spinner.println(text),
            None => println!("{}", text),
        }
    }
}

impl PresentationSink for TerminalSink {
    fn show_status(&mut self, status: &ScannerStatus) {
        let message = status.message();
        match &self.spinner {
            Some(spinner) => spinner.set_message(message),
            None => eprintln!("==> {}", message),
        }
    }

    fn show_result(&mut self, card: &ResultCard) {
        let mark = match card.badge {
            Badge::Approved => "✔",
            Badge::Rejected => "✘",
        };
        self.emit_card(format!("{} {}", mark, card));
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_requires_a_tty() {
        assert!(!UiMode::Pretty.use_pretty(false, false));
        assert!(UiMode::Pretty.use_pretty(true, true));
        assert!(!UiMode::Auto.use_pretty(true, true));
        assert!(!UiMode::Plain.use_pretty(true, false));
        assert_eq!(UiMode::from_flag(Some("plain")), UiMode::Plain);
        assert_eq!(UiMode::from_flag(None), UiMode::Auto);
    }
}
