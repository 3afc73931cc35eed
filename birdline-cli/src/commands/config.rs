//! Config command - manage configuration.

use anyhow::Result;
use birdline_store::{
    Config, default_config_dir, default_config_path, default_credentials_path,
};
use clap::{Args, Subcommand};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::session;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli).await,
        ConfigAction::Init { force } => init_config(*force, cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.heading("Birdline Configuration"));
            println!();
            println!("Timeout:           {} ms", config.network.timeout_ms);
            println!("Jitter:            up to {} ms", config.network.jitter_max_ms);
            println!("Page delay:        {} ms", config.pagination.page_delay_ms);
            println!(
                "Proxy failures:    {} before cooldown of {} ms",
                config.egress.failure_threshold, config.egress.cooldown_ms
            );
            println!("Operation id TTL:  {} ms", config.operations.cache_ttl_ms);
            println!(
                "Base URL:          {}",
                config.network.base_url.as_deref().unwrap_or("default")
            );
            if let Some(path) = &config.egress.proxy_file {
                println!("Proxy file:        {}", path.display());
            }
            if let Some(path) = &config.credentials_file {
                println!("Credentials file:  {}", path.display());
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let config_dir = default_config_dir();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let credentials_path = config
        .credentials_file
        .clone()
        .unwrap_or_else(default_credentials_path);
    let operations_path = session::operation_ids_path(&config);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.heading("Configuration Paths"));
            println!();
            println!("Config dir:        {}", config_dir.display());
            println!("Config file:       {}", config_path.display());
            println!("Credentials file:  {}", credentials_path.display());
            println!("Operation ids:     {}", operations_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_path.display().to_string(),
                "credentials_file": credentials_path.display().to_string(),
                "operation_ids_file": operations_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);

    if path.exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }

    Config::default().save_to(&path).await?;
    info!(path = %path.display(), "Config written");
    println!("Wrote {}", path.display());

    Ok(())
}
