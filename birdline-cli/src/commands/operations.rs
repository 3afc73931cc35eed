//! Operations command - inspect and refresh operation ids.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use birdline_fetch::{ApiClient, FetchContext};
use clap::{Args, Subcommand};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::session;
use crate::{Cli, OutputFormat};

/// Arguments for the operations command.
#[derive(Args)]
pub struct OperationsArgs {
    #[command(subcommand)]
    pub action: OperationsAction,
}

/// Operations subcommands.
#[derive(Subcommand)]
pub enum OperationsAction {
    /// Show the operation name to query id mapping in use.
    List,

    /// Re-scan the web client bundles for current query ids.
    Refresh {
        /// Proxy list file to route the scan through.
        #[arg(long)]
        proxies: Option<PathBuf>,
    },
}

/// Runs the operations command.
pub async fn run(args: &OperationsArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        OperationsAction::List => list(cli).await,
        OperationsAction::Refresh { proxies } => refresh(proxies.as_deref(), cli).await,
    }
}

async fn list(cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let settings = session::fetch_settings(&config);
    let resolver = session::open_operations(&config, &settings).await;
    let ids = resolver.list();
    let fresh = resolver.is_fresh();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.heading("Operation Ids"));
            println!();
            println!("{}", formatter.format_operations(&ids));
            println!();
            println!(
                "Cache: {} ({})",
                session::operation_ids_path(&config).display(),
                if fresh { "fresh" } else { "stale or missing" }
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "fresh": fresh,
                "operations": ids,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

async fn refresh(proxies: Option<&std::path::Path>, cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let settings = session::fetch_settings(&config);
    let egress = session::open_egress(proxies, &config, &settings).await?;
    let operations = session::open_operations(&config, &settings).await;

    let client = ApiClient::new(
        FetchContext::builder()
            .settings(settings)
            .egress(Arc::new(egress))
            .operations(Arc::new(operations))
            .build(),
    );

    let ids = client.refresh_operations().await;
    let refreshed = client.context().operations.is_fresh();
    info!(count = ids.len(), refreshed, "Operation ids refreshed");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if refreshed {
                println!("Refreshed {} operation ids", ids.len());
            } else {
                eprintln!(
                    "{}",
                    formatter.format_error("Bundle scan failed, using built-in ids")
                );
            }
            println!("{}", formatter.format_operations(&ids));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "refreshed": refreshed,
                "operations": ids,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}
