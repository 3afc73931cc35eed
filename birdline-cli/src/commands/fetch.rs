//! Fetch command - paginated collection fetches.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use birdline_fetch::{PageLimit, PaginationFailure, Paginator, StopReason};
use birdline_store::JsonFileCheckpointStore;
use clap::Args;
use serde_json::Value;
use tracing::info;

use crate::output::{FetchOutput, JsonFormatter, TextFormatter};
use crate::session::{self, SessionArgs};
use crate::{Cli, OutputFormat};

/// Arguments for the fetch command.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Timeline operation, e.g. `SearchTimeline` or `Followers`.
    pub operation: String,

    /// Operation variables as a JSON object (without the cursor).
    #[arg(long, short = 'V', default_value = "{}")]
    pub variables: String,

    /// Pages to fetch: a count or "all".
    #[arg(long, short = 'n', default_value = "1")]
    pub pages: PageLimit,

    /// Delay between pages in milliseconds.
    #[arg(long)]
    pub delay: Option<u64>,

    /// Checkpoint file; an existing one resumes the fetch.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Returns true if the error is a fetch that stopped part way.
pub fn is_incomplete(error: &anyhow::Error) -> bool {
    error.downcast_ref::<PaginationFailure<Value>>().is_some()
}

/// Identity of a fetch for the checkpoint guard.
fn query_key(operation: &str, variables: &Value) -> String {
    format!("{operation} {variables}")
}

/// Runs the fetch command.
pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<()> {
    let variables = session::parse_variables(&args.variables)?;
    let config = session::load_config(cli).await?;
    let mut settings = session::fetch_settings(&config);
    if let Some(ms) = args.delay {
        settings = settings.with_page_delay(Duration::from_millis(ms));
    }

    let mut paginator = Paginator::new()
        .with_limit(args.pages)
        .with_delay(settings.page_delay)
        .with_query(query_key(&args.operation, &variables));
    if let Some(path) = &args.resume {
        paginator = paginator.with_store(Arc::new(JsonFileCheckpointStore::new(path)));
    }

    let client = session::open_client(&args.session, &config, settings).await?;

    info!(operation = %args.operation, pages = %args.pages, "Starting fetch");
    let result = paginator
        .run(|cursor| client.timeline_page(&args.operation, &variables, cursor))
        .await;

    match result {
        Ok(outcome) => {
            match cli.format {
                OutputFormat::Text => {
                    print_lines(&outcome.items)?;
                    if !cli.quiet {
                        eprintln!(
                            "Fetched {} item(s) in {} page(s){}",
                            outcome.items.len(),
                            outcome.pages,
                            if outcome.resumed { ", resumed" } else { "" }
                        );
                        match (outcome.stop, &outcome.resume_from) {
                            (StopReason::Exhausted, _) => eprintln!("Collection complete"),
                            (StopReason::Capped, Some(location)) => {
                                eprintln!("More pages available, resume from {location}");
                            }
                            (StopReason::Capped, None) => eprintln!(
                                "More pages available, next cursor {}",
                                outcome.next_cursor.as_deref().unwrap_or("-")
                            ),
                        }
                    }
                }
                OutputFormat::Json => {
                    let formatter = JsonFormatter::new(cli.pretty);
                    let output = FetchOutput::finished(&args.operation, &outcome);
                    println!("{}", formatter.format(&output)?);
                }
            }
            Ok(())
        }
        Err(mut failure) => {
            let items = std::mem::take(&mut failure.items);
            match cli.format {
                OutputFormat::Text => {
                    print_lines(&items)?;
                    if !cli.quiet {
                        let formatter = TextFormatter::new(!cli.no_color);
                        eprintln!(
                            "{}",
                            formatter.format_error(&format!(
                                "Fetch stopped after {} item(s)",
                                items.len()
                            ))
                        );
                    }
                }
                OutputFormat::Json => {
                    let formatter = JsonFormatter::new(cli.pretty);
                    let output = FetchOutput {
                        operation: &args.operation,
                        items: &items,
                        pages: failure.pages,
                        total_pages: failure.pages,
                        resumed: false,
                        complete: false,
                        next_cursor: None,
                        resume_from: failure.resume_from.as_deref(),
                        error: Some(failure.error.to_string()),
                    };
                    println!("{}", formatter.format(&output)?);
                }
            }
            Err(failure.into())
        }
    }
}

fn print_lines(items: &[Value]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    println!("{}", JsonFormatter::new(false).format_lines(items)?);
    Ok(())
}
