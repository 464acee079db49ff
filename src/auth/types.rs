// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short-lived credential attached to API requests
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken({})", redact(&self.0))
    }
}

/// Persisted authentication session
///
/// A bearer token can only exist alongside a session identifier, so an
/// empty store is `None` rather than a `Session` with blank fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub bearer_token: Option<BearerToken>,
    #[serde(default)]
    pub account_identity: Option<String>,
    /// Subject identifier learned from session introspection
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, account_identity: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            bearer_token: None,
            account_identity,
            user_id: None,
        }
    }

    pub fn with_bearer(mut self, token: BearerToken) -> Self {
        self.bearer_token = Some(token);
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &redact(&self.session_id))
            .field("bearer_token", &self.bearer_token)
            .field("account_identity", &self.account_identity)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Show only a short prefix of a secret
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{}...", prefix)
}

/// Sign-in request body
#[derive(Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Credential issuance response
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Session introspection response
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub session: SessionDetails,
    pub user: UserDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDetails {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
