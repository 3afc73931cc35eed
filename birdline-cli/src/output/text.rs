//! Text output formatting with colors.

use birdline_fetch::{CredentialStatus, EgressStatus};
use chrono::{DateTime, Duration, Local, Utc};
use std::collections::BTreeMap;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a section heading with its rule.
    pub fn heading(&self, title: &str) -> String {
        format!("{}\n{}", self.bold(title), "─".repeat(40))
    }

    /// Formats the operation id table.
    pub fn format_operations(&self, ids: &BTreeMap<String, String>) -> String {
        let width = ids.keys().map(String::len).max().unwrap_or(0);
        ids.iter()
            .map(|(name, id)| format!("  {name:<width$}  {}", self.dim(id)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats one proxy line.
    pub fn format_egress_line(&self, status: &EgressStatus, now: DateTime<Utc>) -> String {
        let health = if status.health.disabled {
            self.red("disabled")
        } else if status.health.failures > 0 {
            self.yellow(&format!("{} failure(s)", status.health.failures))
        } else {
            self.green("ok")
        };

        let mut line = format!("  {:<40} {:<8} {}", status.uri, status.scheme.as_str(), health);
        if let Some(at) = status.health.last_success {
            line.push_str(&self.dim(&format!("  last ok {}", format_when(at, now))));
        }
        line
    }

    /// Formats one session line.
    pub fn format_credential_line(&self, status: &CredentialStatus, now: DateTime<Utc>) -> String {
        let state = match status.cooldown_until {
            Some(until) if !status.available => {
                self.red(&format!("cooling down until {}", format_when(until, now)))
            }
            _ => self.green("available"),
        };

        let mut line = format!("  {:<24} {}", status.label, state);
        if let Some(limited) = &status.limited {
            line.push_str(&self.dim(&format!("  limited on {}", limited.endpoint)));
        }
        line
    }

    /// Formats an error line.
    pub fn format_error(&self, error: &str) -> String {
        format!("{} {}", self.red("✗"), error)
    }

    // ========================================================================
    // Color Helpers
    // ========================================================================

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            format!("{BOLD}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        if self.use_colors {
            format!("{GREEN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn yellow(&self, text: &str) -> String {
        if self.use_colors {
            format!("{YELLOW}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.use_colors {
            format!("{RED}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Formats a time relative to `now` when close, absolute otherwise.
pub fn format_when(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (diff, future) = if at >= now {
        (at - now, true)
    } else {
        (now - at, false)
    };

    if diff >= Duration::hours(24) {
        let local = at.with_timezone(&Local);
        return local.format("%Y-%m-%d %H:%M").to_string();
    }

    if diff < Duration::minutes(1) {
        return "just now".to_string();
    }

    let span = if diff < Duration::hours(1) {
        format!("{}m", diff.num_minutes())
    } else {
        let mins = diff.num_minutes() % 60;
        if mins > 0 {
            format!("{}h {}m", diff.num_hours(), mins)
        } else {
            format!("{}h", diff.num_hours())
        }
    };

    if future {
        format!("in {span}")
    } else {
        format!("{span} ago")
    }
}
