//! Credentials command - show the sessions a fetch would rotate through.

use std::path::PathBuf;

use anyhow::Result;
use birdline_fetch::CredentialPool;
use chrono::Utc;
use clap::Args;

use crate::output::{JsonFormatter, TextFormatter};
use crate::session;
use crate::{Cli, OutputFormat};

/// Arguments for the credentials command.
#[derive(Args)]
pub struct CredentialsArgs {
    /// Credentials file (JSON object or array of sessions).
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

/// Runs the credentials command.
pub async fn run(args: &CredentialsArgs, cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let credentials = session::load_credentials(args.credentials.as_deref(), &config).await?;
    let pool = CredentialPool::from_credentials(credentials);
    let statuses = pool.statuses();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.heading("Credentials"));
            println!();
            if statuses.is_empty() {
                println!("{}", formatter.format_error("No credentials configured"));
            }
            let now = Utc::now();
            for status in &statuses {
                println!("{}", formatter.format_credential_line(status, now));
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&statuses)?);
        }
    }

    Ok(())
}
