//! Credential types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// One authenticated web session.
///
/// The API accepts the browser session cookie (`auth_token`) together with
/// the anti-forgery token (`ct0`), which must also be echoed in the
/// `x-csrf-token` header.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Session cookie value.
    #[serde(alias = "auth_token")]
    pub auth_token: String,
    /// Anti-forgery token (cookie and header).
    pub ct0: String,
    /// Screen name of the account, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Numeric account id, if known.
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Credential {
    /// Creates a credential from its two tokens.
    pub fn new(auth_token: impl Into<String>, ct0: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ct0: ct0.into(),
            username: None,
            user_id: None,
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Checks that both tokens are present.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCredential` naming the empty token.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.auth_token.trim().is_empty() {
            return Err(CoreError::InvalidCredential("auth_token is empty".to_string()));
        }
        if self.ct0.trim().is_empty() {
            return Err(CoreError::InvalidCredential("ct0 is empty".to_string()));
        }
        Ok(())
    }

    /// Returns true if both tokens are present.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Builds the `Cookie` header value for this session.
    pub fn cookie_header(&self) -> String {
        format!("auth_token={}; ct0={}", self.auth_token, self.ct0)
    }

    /// Short label for logs: the username if known, else a token prefix.
    pub fn label(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => {
                let prefix: String = self.auth_token.chars().take(6).collect();
                format!("{prefix}…")
            }
        }
    }
}

// Tokens never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("auth_token", &"<redacted>")
            .field("ct0", &"<redacted>")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .finish()
    }
}
