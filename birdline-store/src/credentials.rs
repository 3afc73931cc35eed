//! Credential loading.
//!
//! Credentials come from outside the client: a JSON file written by the
//! operator (or a browser export tool), or environment variables.

use birdline_core::Credential;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::load_json;

/// Environment variable holding the session cookie.
pub const AUTH_TOKEN_ENV: &str = "BIRDLINE_AUTH_TOKEN";

/// Environment variable holding the anti-forgery token.
pub const CT0_ENV: &str = "BIRDLINE_CT0";

/// Environment variable holding the account name.
pub const USERNAME_ENV: &str = "BIRDLINE_USERNAME";

#[derive(Deserialize)]
#[serde(untagged)]
enum CredentialFile {
    Many(Vec<Credential>),
    One(Credential),
}

/// Loads credentials from a JSON file holding one object or an array.
///
/// Entries with an empty token are skipped with a warning.
pub async fn load_credentials_file(path: &Path) -> Result<Vec<Credential>, StoreError> {
    let file: CredentialFile = load_json(path).await.map_err(|e| {
        StoreError::Credentials(format!("{}: {e}", path.display()))
    })?;

    let all = match file {
        CredentialFile::Many(list) => list,
        CredentialFile::One(cred) => vec![cred],
    };

    let valid: Vec<Credential> = all
        .into_iter()
        .enumerate()
        .filter_map(|(index, cred)| match cred.validate() {
            Ok(()) => Some(cred),
            Err(e) => {
                warn!(path = %path.display(), index, error = %e, "Skipping credential");
                None
            }
        })
        .collect();

    debug!(path = %path.display(), count = valid.len(), "Loaded credentials");
    Ok(valid)
}

/// Reads a single credential from the environment.
pub fn credential_from_env() -> Option<Credential> {
    let auth_token = std::env::var(AUTH_TOKEN_ENV).ok()?;
    let ct0 = std::env::var(CT0_ENV).ok()?;
    let mut cred = Credential::new(auth_token, ct0);
    if let Ok(name) = std::env::var(USERNAME_ENV) {
        cred = cred.with_username(name);
    }
    cred.is_valid().then_some(cred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_array_file_skips_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("creds.json");
        tokio::fs::write(
            &path,
            r#"[{"authToken":"a1","ct0":"c1","username":"one"},{"authToken":"","ct0":"c2"},{"authToken":"a3","ct0":"c3"}]"#,
        )
        .await
        .unwrap();

        let creds = load_credentials_file(&path).await.unwrap();
        assert_eq!(creds.len(), 2);
        assert_eq!(creds[0].username.as_deref(), Some("one"));
        assert_eq!(creds[1].auth_token, "a3");
    }

    #[tokio::test]
    async fn test_single_object_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("creds.json");
        tokio::fs::write(&path, r#"{"authToken":"a","ct0":"c"}"#).await.unwrap();

        let creds = load_credentials_file(&path).await.unwrap();
        assert_eq!(creds.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_credentials_error() {
        let err = load_credentials_file(Path::new("/nonexistent/creds.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Credentials(_)));
    }
}
