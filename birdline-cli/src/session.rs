//! Builds fetch contexts from the config file and command-line flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use birdline_core::Credential;
use birdline_fetch::{
    ApiClient, CredentialPool, EgressManager, FetchContext, FetchSettings, OperationResolver,
};
use birdline_store::credentials::{AUTH_TOKEN_ENV, CT0_ENV};
use birdline_store::{
    Config, JsonFileOperationIdStore, credential_from_env, default_credentials_path,
    default_operation_ids_path, load_credentials_file,
};
use clap::Args;
use tracing::{debug, info};

use crate::Cli;

/// Flags shared by commands that talk to the API.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
    /// Proxy list file, one `[scheme://][user:pass@]host:port` per line.
    #[arg(long)]
    pub proxies: Option<PathBuf>,

    /// Credentials file (JSON object or array of sessions).
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

/// Loads the config named by `--config`, or the default one.
pub async fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path).await?,
        None => Config::load().await?,
    };
    Ok(config)
}

/// Converts the config file into fetch settings.
pub fn fetch_settings(config: &Config) -> FetchSettings {
    let mut settings = FetchSettings::default()
        .with_timeout(Duration::from_millis(config.network.timeout_ms))
        .with_jitter_max(Duration::from_millis(config.network.jitter_max_ms))
        .with_page_delay(Duration::from_millis(config.pagination.page_delay_ms))
        .with_operation_ttl(Duration::from_millis(config.operations.cache_ttl_ms))
        .with_egress_policy(
            config.egress.failure_threshold,
            Duration::from_millis(config.egress.cooldown_ms),
        );

    if let Some(base) = &config.network.base_url {
        settings = settings.with_base_url(base);
    }
    if let Some(token) = &config.network.bearer_token {
        settings = settings.with_bearer_token(token.clone());
    }
    if let Some(user_agent) = &config.network.user_agent {
        settings = settings.with_user_agent(user_agent.clone());
    }
    settings
}

/// Path of the operation id cache file.
pub fn operation_ids_path(config: &Config) -> PathBuf {
    config
        .operations
        .cache_file
        .clone()
        .unwrap_or_else(default_operation_ids_path)
}

/// Collects sessions from the credentials file and the environment.
///
/// The file is `--credentials`, else the config's `credentials_file`, else
/// the default path when it exists.
pub async fn load_credentials(explicit: Option<&Path>, config: &Config) -> Result<Vec<Credential>> {
    let mut credentials = Vec::new();

    let file = match explicit.or(config.credentials_file.as_deref()) {
        Some(path) => Some(path.to_path_buf()),
        None => Some(default_credentials_path()).filter(|p| p.exists()),
    };
    if let Some(path) = file {
        credentials = load_credentials_file(&path).await?;
        info!(path = %path.display(), count = credentials.len(), "Loaded credentials");
    }

    if let Some(credential) = credential_from_env() {
        debug!(label = %credential.label(), "Using credential from environment");
        credentials.push(credential);
    }

    Ok(credentials)
}

/// Builds an egress manager and loads the proxy file, if any.
pub async fn open_egress(
    proxies: Option<&Path>,
    config: &Config,
    settings: &FetchSettings,
) -> Result<EgressManager> {
    let egress =
        EgressManager::with_policy(settings.egress_failure_threshold, settings.egress_cooldown);
    if let Some(path) = proxies.or(config.egress.proxy_file.as_deref()) {
        let count = egress.load_file(path).await?;
        if count == 0 {
            bail!("No usable proxies in {}", path.display());
        }
        info!(path = %path.display(), count, "Loaded proxies");
    }
    Ok(egress)
}

/// Opens the operation resolver over the cache file.
pub async fn open_operations(config: &Config, settings: &FetchSettings) -> OperationResolver {
    let store = JsonFileOperationIdStore::new(operation_ids_path(config));
    OperationResolver::open(Arc::new(store), settings.operation_ttl).await
}

/// Builds a client with sessions, proxies and operation ids.
///
/// Fails when no session is configured.
pub async fn open_client(
    args: &SessionArgs,
    config: &Config,
    settings: FetchSettings,
) -> Result<ApiClient> {
    let credentials = load_credentials(args.credentials.as_deref(), config).await?;
    if credentials.is_empty() {
        bail!(
            "No credentials configured. Pass --credentials FILE or set {AUTH_TOKEN_ENV} and {CT0_ENV}"
        );
    }
    let pool = CredentialPool::from_credentials(credentials);
    if pool.is_empty() {
        bail!("No valid credentials loaded");
    }

    let egress = open_egress(args.proxies.as_deref(), config, &settings).await?;
    let operations = open_operations(config, &settings).await;

    Ok(ApiClient::new(
        FetchContext::builder()
            .settings(settings)
            .credentials(Arc::new(pool))
            .egress(Arc::new(egress))
            .operations(Arc::new(operations))
            .build(),
    ))
}

/// Parses a JSON object argument.
pub fn parse_variables(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid variables JSON: {raw}"))?;
    if !value.is_object() {
        bail!("Variables must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.network.timeout_ms = 5_000;
        config.pagination.page_delay_ms = 250;
        config.egress.failure_threshold = 7;
        config.network.base_url = Some("http://localhost:8080".to_string());

        let settings = fetch_settings(&config);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.page_delay, Duration::from_millis(250));
        assert_eq!(settings.egress_failure_threshold, 7);
        assert_eq!(settings.api_base, "http://localhost:8080/i/api");
    }

    #[test]
    fn test_default_settings_keep_web_token() {
        let settings = fetch_settings(&Config::default());
        assert_eq!(settings.bearer_token, FetchSettings::default().bearer_token);
        assert_eq!(settings.jitter_max, Duration::from_millis(200));
    }

    #[test]
    fn test_parse_variables() {
        assert_eq!(parse_variables(r#"{"count": 20}"#).unwrap()["count"], 20);
        assert!(parse_variables("[1, 2]").is_err());
        assert!(parse_variables("{oops").is_err());
    }

    #[tokio::test]
    async fn test_explicit_credentials_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("creds.json");
        tokio::fs::write(
            &path,
            r#"[{"authToken": "a1", "ct0": "c1"}, {"auth_token": "a2", "ct0": "c2"}]"#,
        )
        .await
        .unwrap();

        let credentials = load_credentials(Some(&path), &Config::default()).await.unwrap();
        let tokens: Vec<&str> = credentials
            .iter()
            .take(2)
            .map(|c| c.auth_token.as_str())
            .collect();
        assert_eq!(tokens, ["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_empty_proxy_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("proxies.txt");
        tokio::fs::write(&path, "# nothing here\n\n").await.unwrap();

        let config = Config::default();
        let settings = fetch_settings(&config);
        assert!(open_egress(Some(&path), &config, &settings).await.is_err());
    }

    #[tokio::test]
    async fn test_proxy_file_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("proxies.txt");
        tokio::fs::write(&path, "10.0.0.1:8080\nsocks5://10.0.0.2:1080\n")
            .await
            .unwrap();

        let mut config = Config::default();
        config.egress.proxy_file = Some(path);
        let settings = fetch_settings(&config);
        let egress = open_egress(None, &config, &settings).await.unwrap();
        assert_eq!(egress.len(), 2);
    }
}
