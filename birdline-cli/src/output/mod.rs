//! Output formatting for CLI.

mod json;
mod text;

pub use json::{FetchOutput, JsonFormatter};
pub use text::TextFormatter;
