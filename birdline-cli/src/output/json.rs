//! JSON output formatting.

use anyhow::Result;
use birdline_fetch::{PaginationOutcome, StopReason};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Output Types
// ============================================================================

/// Summary of a fetch run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput<'a> {
    pub operation: &'a str,
    pub items: &'a [Value],
    pub pages: u32,
    pub total_pages: u32,
    pub resumed: bool,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> FetchOutput<'a> {
    /// Summarizes a finished run.
    pub fn finished(operation: &'a str, outcome: &'a PaginationOutcome<Value>) -> Self {
        Self {
            operation,
            items: &outcome.items,
            pages: outcome.pages,
            total_pages: outcome.total_pages,
            resumed: outcome.resumed,
            complete: outcome.stop == StopReason::Exhausted,
            next_cursor: outcome.next_cursor.as_deref(),
            resume_from: outcome.resume_from.as_deref(),
            error: None,
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter for CLI output.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats items one compact document per line.
    pub fn format_lines(&self, items: &[Value]) -> Result<String> {
        let lines = items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}
