//! Transient user-facing notifications (the panel's toasts).
//!
//! View-models push these instead of returning errors across view
//! boundaries; each surface decides how to show them.

use std::fmt;

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// CSS class used by the browser surface.
    pub fn css_class(&self) -> &'static str {
        match self.level {
            Level::Success => "toast success",
            Level::Error => "toast error",
        }
    }
}

/// Terminal rendering.
impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Success => write!(f, "{} {}", "✓".green().bold(), self.message),
            Level::Error => write!(f, "{} {}", "✗".red().bold(), self.message.red()),
        }
    }
}

/// Print a batch of notifications to stderr, oldest first.
pub fn print_all(notes: &[Notification]) {
    for note in notes {
        eprintln!("{note}");
    }
}
