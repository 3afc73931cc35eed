//! Proxies command - parse a proxy list file.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::output::{JsonFormatter, TextFormatter};
use crate::session;
use crate::{Cli, OutputFormat};

/// Arguments for the proxies command.
#[derive(Args)]
pub struct ProxiesArgs {
    /// Proxy list file, one `[scheme://][user:pass@]host:port` per line.
    pub file: PathBuf,
}

/// Runs the proxies command.
pub async fn run(args: &ProxiesArgs, cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let settings = session::fetch_settings(&config);
    let egress = session::open_egress(Some(&args.file), &config, &settings).await?;
    let statuses = egress.statuses();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let now = Utc::now();
            println!("{}", formatter.heading("Proxies"));
            println!();
            for status in &statuses {
                println!("{}", formatter.format_egress_line(status, now));
            }
            println!();
            println!(
                "{} path(s) from {}, disabled after {} consecutive failure(s)",
                statuses.len(),
                args.file.display(),
                egress.failure_threshold()
            );
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&statuses)?);
        }
    }

    Ok(())
}
