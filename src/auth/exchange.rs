// Authentication endpoint calls
// Sign-in exchange, bearer issuance and session introspection

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};

use super::types::{BearerToken, SessionInfo, SignInRequest, TokenResponse};
use crate::error::{Result, SyncError};

/// Cookie names that may carry the session identifier, in priority order
pub const SESSION_COOKIE_KEYS: [&str; 3] = [
    "better-auth.session_token",
    "__Secure-better-auth.session_token",
    "session_token",
];

/// Cookie name used when presenting the session identifier
const SESSION_COOKIE: &str = "better-auth.session_token";

fn sign_in_url(base_url: &str) -> String {
    format!("{}/api/auth/sign-in/email", base_url)
}

fn token_url(base_url: &str) -> String {
    format!("{}/api/auth/token", base_url)
}

fn get_session_url(base_url: &str) -> String {
    format!("{}/api/auth/get-session", base_url)
}

fn session_cookie(session_id: &str) -> String {
    format!("{}={}", SESSION_COOKIE, session_id)
}

/// Pick the session identifier out of `set-cookie` values
///
/// Key priority wins over header order. Blank values count as absent.
pub fn extract_session_id<'a, I>(set_cookies: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let cookies: Vec<&str> = set_cookies.into_iter().collect();

    SESSION_COOKIE_KEYS.iter().find_map(|key| {
        cookies.iter().find_map(|cookie| {
            let (name, rest) = cookie.trim_start().split_once('=')?;
            if name != *key {
                return None;
            }
            let value = rest.split(';').next().unwrap_or_default().trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    })
}

/// Exchange identity and secret for a session identifier
pub async fn sign_in(
    client: &Client,
    base_url: &str,
    identity: &str,
    secret: &str,
) -> Result<String> {
    tracing::debug!(identity = identity, "Sending sign-in request");

    let response = client
        .post(sign_in_url(base_url))
        .json(&SignInRequest {
            email: identity,
            password: secret,
        })
        .send()
        .await
        .map_err(|e| SyncError::from_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = if body.is_empty() {
            "Unknown error".to_string()
        } else {
            body
        };
        tracing::warn!(status = %status, "Sign-in rejected");
        return Err(SyncError::InvalidCredentials(format!(
            "sign-in failed ({}): {}",
            status.as_u16(),
            body
        )));
    }

    let cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok());

    extract_session_id(cookies)
        .ok_or_else(|| SyncError::ProtocolViolation("No session token in response".to_string()))
}

/// Exchange the session identifier for a fresh bearer credential
pub async fn issue_bearer(client: &Client, base_url: &str, session_id: &str) -> Result<BearerToken> {
    let response = client
        .get(token_url(base_url))
        .header(COOKIE, session_cookie(session_id))
        .send()
        .await
        .map_err(|e| SyncError::from_transport(&e))?;

    let response = check_session_status(response, "token fetch").await?;

    let data: TokenResponse = response.json().await.map_err(|e| {
        SyncError::ProtocolViolation(format!("Failed to parse token response: {}", e))
    })?;

    match data.token {
        Some(token) if !token.is_empty() => Ok(BearerToken::new(token)),
        _ => Err(SyncError::ProtocolViolation(
            "Token response does not contain token".to_string(),
        )),
    }
}

/// Fetch metadata for the current session
///
/// The service answers `null` for a session it no longer knows.
pub async fn introspect(client: &Client, base_url: &str, session_id: &str) -> Result<SessionInfo> {
    let response = client
        .get(get_session_url(base_url))
        .header(COOKIE, session_cookie(session_id))
        .send()
        .await
        .map_err(|e| SyncError::from_transport(&e))?;

    let response = check_session_status(response, "session check").await?;

    let info: Option<SessionInfo> = response.json().await.map_err(|e| {
        SyncError::ProtocolViolation(format!("Failed to parse session response: {}", e))
    })?;

    info.ok_or(SyncError::NotAuthenticated)
}

/// Map error statuses on session-cookie endpoints
async fn check_session_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "{} failed", what);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::AuthorizationExpired(
            format!("{} failed ({})", what, status.as_u16()),
        )),
        _ => Err(SyncError::Http {
            status: status.as_u16(),
            message: format!("{} failed: {}", what, body),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_extract_session_id_prefers_primary_key() {
        let cookies = [
            "session_token=fallback; Path=/",
            "better-auth.session_token=primary.sig; Path=/; HttpOnly",
        ];
        assert_eq!(extract_session_id(cookies), Some("primary.sig".to_string()));
    }

    #[test]
    fn test_extract_session_id_fallback_keys() {
        let cookies = ["theme=dark", "session_token=S1; Max-Age=3600"];
        assert_eq!(extract_session_id(cookies), Some("S1".to_string()));

        let cookies = ["__Secure-better-auth.session_token=S2; Secure"];
        assert_eq!(extract_session_id(cookies), Some("S2".to_string()));
    }

    #[test]
    fn test_extract_session_id_rejects_blank_and_lookalikes() {
        assert_eq!(extract_session_id(["better-auth.session_token=; Path=/"]), None);
        assert_eq!(extract_session_id(["better-auth.session_token_data=abc"]), None);
        assert_eq!(extract_session_id(Vec::<&str>::new()), None);
    }

    #[tokio::test]
    async fn test_sign_in_extracts_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/sign-in/email")
            .match_body(Matcher::Json(json!({"email": "a@x.com", "password": "p"})))
            .with_status(200)
            .with_header("set-cookie", "better-auth.session_token=S1; Path=/; HttpOnly")
            .with_body(r#"{"user":{"id":"u-1"}}"#)
            .create_async()
            .await;

        let client = Client::new();
        let session_id = sign_in(&client, &server.url(), "a@x.com", "p").await.unwrap();

        assert_eq!(session_id, "S1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_in_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/sign-in/email")
            .with_status(401)
            .with_body("INVALID_EMAIL_OR_PASSWORD")
            .create_async()
            .await;

        let err = sign_in(&Client::new(), &server.url(), "a@x.com", "bad")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SyncError::InvalidCredentials("sign-in failed (401): INVALID_EMAIL_OR_PASSWORD".to_string())
        );
    }

    #[tokio::test]
    async fn test_sign_in_without_cookie_is_protocol_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/sign-in/email")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let err = sign_in(&Client::new(), &server.url(), "a@x.com", "p")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_issue_bearer_sends_session_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/auth/token")
            .match_header("cookie", "better-auth.session_token=S1")
            .with_status(200)
            .with_body(r#"{"token":"J1"}"#)
            .create_async()
            .await;

        let token = issue_bearer(&Client::new(), &server.url(), "S1").await.unwrap();

        assert_eq!(token, BearerToken::new("J1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_issue_bearer_missing_token_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/token")
            .with_status(200)
            .with_body(r#"{"jwt":"J1"}"#)
            .create_async()
            .await;

        let err = issue_bearer(&Client::new(), &server.url(), "S1").await.unwrap_err();
        assert!(matches!(err, SyncError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_issue_bearer_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/token")
            .with_status(401)
            .create_async()
            .await;

        let err = issue_bearer(&Client::new(), &server.url(), "S1").await.unwrap_err();
        assert!(err.is_authorization_failure());

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/token")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = issue_bearer(&Client::new(), &server.url(), "S1").await.unwrap_err();
        assert!(matches!(err, SyncError::Http { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_issue_bearer_network_failure() {
        // Nothing listens on port 9 of localhost in the test environment
        let err = issue_bearer(&Client::new(), "http://127.0.0.1:9", "S1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }

    #[tokio::test]
    async fn test_introspect_null_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/get-session")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let err = introspect(&Client::new(), &server.url(), "S1").await.unwrap_err();
        assert_eq!(err, SyncError::NotAuthenticated);
    }
}
