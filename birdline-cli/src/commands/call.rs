//! Call command - a single GraphQL operation or REST request.

use anyhow::{Result, anyhow};
use clap::Args;
use serde_json::Value;

use crate::output::JsonFormatter;
use crate::session::{self, SessionArgs};
use crate::{Cli, OutputFormat};

/// Arguments for the call command.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// GraphQL operation name, or a REST path such as `1.1/friends/list.json`.
    pub operation: String,

    /// GraphQL variables as a JSON object.
    #[arg(long, short = 'V', default_value = "{}")]
    pub variables: String,

    /// REST query parameter as KEY=VALUE (repeatable).
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    #[command(flatten)]
    pub session: SessionArgs,
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))?;
    Ok((key.to_string(), value.to_string()))
}

/// REST paths contain a slash or a file extension; operation names don't.
fn is_rest_path(operation: &str) -> bool {
    operation.contains('/') || operation.ends_with(".json")
}

/// Runs the call command.
pub async fn run(args: &CallArgs, cli: &Cli) -> Result<()> {
    let config = session::load_config(cli).await?;
    let settings = session::fetch_settings(&config);
    let client = session::open_client(&args.session, &config, settings).await?;

    let payload = if is_rest_path(&args.operation) {
        let query: Vec<(&str, &str)> = args
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        client
            .rest_get(&args.operation, &query, |body| Ok(body.clone()))
            .await?
    } else {
        let variables = session::parse_variables(&args.variables)?;
        client.graphql_data(&args.operation, &variables).await?
    };

    print_payload(&payload, cli)
}

fn print_payload(payload: &Value, cli: &Cli) -> Result<()> {
    // text mode always indents
    let pretty = cli.pretty || cli.format == OutputFormat::Text;
    println!("{}", JsonFormatter::new(pretty).format(payload)?);
    Ok(())
}
