// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Birdline CLI - resilient paginated fetches from the command line.
//!
//! # Examples
//!
//! ```bash
//! # First page of a search
//! birdline fetch SearchTimeline --variables '{"rawQuery":"rust","count":20,"product":"Latest"}'
//!
//! # Every page, resumable after an interruption
//! birdline fetch Followers -V '{"userId":"12","count":20}' --pages all --resume followers.json
//!
//! # One GraphQL call
//! birdline call UserByScreenName -V '{"screen_name":"jack"}'
//!
//! # One REST call
//! birdline call 1.1/friends/list.json -p screen_name=jack -p count=200
//!
//! # Refresh operation ids from the web client bundles
//! birdline operations refresh
//!
//! # Check a proxy list
//! birdline proxies proxies.txt
//! ```

mod commands;
mod output;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{call, config, credentials, fetch, operations, proxies};

// ============================================================================
// CLI Definition
// ============================================================================

/// Birdline CLI - paginated fetches over rotating sessions and proxies.
#[derive(Parser)]
#[command(name = "birdline")]
#[command(about = "Resilient paginated client for the X web API")]
#[command(long_about = r#"
Birdline fetches paginated collections (search results, followers,
timelines) through the web client's GraphQL API.

Every request rotates through the configured sessions and proxies,
honors the server's rate-limit quota, and carries a fresh transaction
id. Long fetches checkpoint their cursor after every page and resume
where they stopped.

Credentials come from --credentials FILE, the config file, or the
BIRDLINE_AUTH_TOKEN and BIRDLINE_CT0 environment variables.

Examples:
  birdline fetch SearchTimeline -V '{"rawQuery":"rust"}' --pages 5
  birdline fetch Followers -V '{"userId":"12"}' --pages all --resume f.json
  birdline call UserByScreenName -V '{"screen_name":"jack"}'
  birdline operations list
  birdline proxies proxies.txt
"#)]
#[command(version)]
#[command(author = "Birdline Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to the platform config dir).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a paginated collection.
    #[command(visible_alias = "f")]
    Fetch(fetch::FetchArgs),

    /// Run a single GraphQL operation or REST call.
    Call(call::CallArgs),

    /// Show or refresh operation ids.
    #[command(visible_alias = "ops")]
    Operations(operations::OperationsArgs),

    /// Load a proxy file and show the parsed paths.
    Proxies(proxies::ProxiesArgs),

    /// Show the loaded sessions.
    Credentials(credentials::CredentialsArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// A fetch stopped early; its checkpoint can resume it.
    Incomplete = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("birdline=debug,info")
    } else {
        EnvFilter::new("birdline=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Fetch(args) => fetch::run(args, &cli).await,
        Commands::Call(args) => call::run(args, &cli).await,
        Commands::Operations(args) => operations::run(args, &cli).await,
        Commands::Proxies(args) => proxies::run(args, &cli).await,
        Commands::Credentials(args) => credentials::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        let code = if fetch::is_incomplete(&e) {
            ExitCode::Incomplete
        } else {
            ExitCode::Error
        };
        std::process::exit(code as i32);
    }

    Ok(())
}
