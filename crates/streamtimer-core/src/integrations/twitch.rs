//! Twitch boundary: OAuth2 Authorization Code flow, token validation, and
//! EventSub webhook plumbing.
//!
//! 1. Opens browser to the Twitch authorization URL
//! 2. Starts a tiny localhost HTTP server to receive the callback
//! 3. Exchanges the code for an access token (+ refresh token)
//! 4. Stores tokens in the OS keyring, one entry per tenant
//!
//! The event-stream client that pumps live notifications is an external
//! collaborator; this module only covers the contract at its edge --
//! credentials, webhook signature verification, and the typed notification
//! payloads that map onto the enqueue API.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::io::{Read, Write};
use std::net::TcpListener;

use super::keyring_store;
use crate::error::{AuthError, Result};
use crate::timer::TimerHandle;

const AUTH_URL: &str = "https://id.twitch.tv/oauth2/authorize";
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";

/// Scopes the accumulator's event sources need.
const SCOPES: [&str; 2] = ["channel:read:subscriptions", "bits:read"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp
    pub expires_at: Option<i64>,
}

/// Identity attached to a validated token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenIdentity {
    pub client_id: String,
    pub login: String,
    pub user_id: String,
    pub expires_in: i64,
}

/// Twitch application credentials plus the localhost callback port.
#[derive(Debug, Clone)]
pub struct TwitchAuth {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_port: u16,
}

impl TwitchAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_port: 8080,
        }
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/auth/twitch/callback", self.redirect_port)
    }

    fn auth_url_full(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Run the full flow: open browser -> listen for callback -> exchange
    /// code -> store tokens under the tenant's keyring entry.
    ///
    /// # Errors
    /// Returns an error if credentials are missing, the callback is
    /// malformed or carries the wrong state nonce, or the exchange fails.
    pub async fn authorize(&self, tenant_id: &str) -> Result<TwitchTokens> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AuthError::CredentialsNotConfigured.into());
        }

        let state = state_nonce()?;
        let auth_url = self.auth_url_full(&state);
        open::that(&auth_url)
            .map_err(|e| AuthError::AuthorizationFailed(e.to_string()))?;

        let listener = TcpListener::bind(format!("127.0.0.1:{}", self.redirect_port))?;
        let (mut stream, _) = listener.accept()?;
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf)?;
        let request = String::from_utf8_lossy(&buf[..n]);

        let (code, returned_state) = extract_callback(&request)
            .ok_or_else(|| AuthError::InvalidCallback("no code in callback".into()))?;
        if returned_state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::InvalidCallback("state mismatch".into()).into());
        }

        let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body><h2>Twitch connected!</h2><p>You can close this tab.</p></body></html>";
        stream.write_all(response.as_bytes())?;
        drop(stream);
        drop(listener);

        let tokens = self.exchange_code(&code).await?;
        store_tokens(tenant_id, &tokens)?;
        Ok(tokens)
    }

    async fn exchange_code(&self, code: &str) -> Result<TwitchTokens> {
        let client = Client::new();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", &self.redirect_uri()),
        ];

        let resp = client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        parse_token_response(&body).map_err(Into::into)
    }

    /// Exchange a refresh token for a fresh access token and store it.
    ///
    /// # Errors
    /// Returns an error if the tenant has no refresh token or Twitch
    /// rejects it.
    pub async fn refresh(&self, tenant_id: &str) -> Result<TwitchTokens> {
        let current = load_tokens(tenant_id)?.ok_or(AuthError::NotAuthenticated {
            tenant_id: tenant_id.to_string(),
        })?;
        let refresh_token = current.refresh_token.ok_or_else(|| {
            AuthError::TokenExchangeFailed("no refresh token stored".into())
        })?;

        let client = Client::new();
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];

        let resp = client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let tokens = parse_token_response(&body)?;
        store_tokens(tenant_id, &tokens)?;
        Ok(tokens)
    }
}

/// Ask Twitch who an access token belongs to.
///
/// # Errors
/// Returns an error if the token is rejected or the endpoint is unreachable.
pub async fn validate(access_token: &str) -> Result<TokenIdentity> {
    validate_at(VALIDATE_URL, access_token).await
}

async fn validate_at(url: &str, access_token: &str) -> Result<TokenIdentity> {
    let client = Client::new();
    let resp = client
        .get(url)
        .header("Authorization", format!("OAuth {access_token}"))
        .send()
        .await
        .map_err(|e| AuthError::ValidationFailed(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AuthError::ValidationFailed(format!("HTTP {}", resp.status())).into());
    }
    resp.json::<TokenIdentity>()
        .await
        .map_err(|e| AuthError::ValidationFailed(e.to_string()).into())
}

fn parse_token_response(body: &serde_json::Value) -> Result<TwitchTokens, AuthError> {
    if let Some(error) = body.get("error") {
        return Err(AuthError::TokenExchangeFailed(error.to_string()));
    }
    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| AuthError::TokenExchangeFailed("no access_token in response".into()))?
        .to_string();
    let refresh_token = body["refresh_token"].as_str().map(str::to_owned);
    let expires_at = body["expires_in"]
        .as_i64()
        .map(|ei| chrono::Utc::now().timestamp() + ei);
    Ok(TwitchTokens {
        access_token,
        refresh_token,
        expires_at,
    })
}

fn keyring_key(tenant_id: &str) -> String {
    format!("twitch-tokens-{tenant_id}")
}

/// Stored tokens for a tenant, if any.
pub fn load_tokens(tenant_id: &str) -> Result<Option<TwitchTokens>> {
    match keyring_store::get(&keyring_key(tenant_id)) {
        Ok(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
        Ok(None) => Ok(None),
        Err(e) => Err(AuthError::AuthorizationFailed(e.to_string()).into()),
    }
}

fn store_tokens(tenant_id: &str, tokens: &TwitchTokens) -> Result<()> {
    let json = serde_json::to_string(tokens)?;
    keyring_store::set(&keyring_key(tenant_id), &json)
        .map_err(|e| AuthError::AuthorizationFailed(e.to_string()).into())
}

/// Forget a tenant's stored tokens.
pub fn clear_tokens(tenant_id: &str) -> Result<()> {
    keyring_store::delete(&keyring_key(tenant_id))
        .map_err(|e| AuthError::AuthorizationFailed(e.to_string()).into())
}

fn state_nonce() -> Result<String> {
    use base64::Engine;
    let mut bytes = [0u8; 24];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AuthError::AuthorizationFailed(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Extract `code` and `state` from `GET /auth/twitch/callback?code=..&state=..`.
fn extract_callback(request: &str) -> Option<(String, Option<String>)> {
    let path = request.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    Some((code?, state))
}

// ── EventSub webhook boundary ────────────────────────────────────────

type HmacSha256 = Hmac<Sha256>;

/// Verify an EventSub webhook signature header.
///
/// Twitch signs `message_id + timestamp + raw body` with the webhook secret
/// and sends `sha256=<hex>`; verification is constant-time.
pub fn verify_eventsub_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &str,
    signature_header: &str,
) -> bool {
    let Some(hex_sig) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// `channel.subscribe` / `channel.subscription.gift` notification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubNotification {
    pub user_name: String,
    pub tier: String,
    #[serde(default)]
    pub is_gift: bool,
    /// Gift batches carry a total; single events omit it.
    #[serde(default)]
    pub total: Option<i64>,
}

impl SubNotification {
    /// Route onto the producer-facing contract.
    pub fn apply(&self, timer: &TimerHandle) {
        let count = self.total.unwrap_or(1).max(1);
        timer.enqueue_sub(&self.user_name, &self.tier, self.is_gift, count);
    }
}

/// `channel.cheer` notification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CheerNotification {
    pub user_name: String,
    pub bits: i64,
}

impl CheerNotification {
    /// Route onto the producer-facing contract.
    pub fn apply(&self, timer: &TimerHandle) {
        timer.enqueue_bits(&self.user_name, self.bits, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_url_carries_scopes_and_state() {
        let auth = TwitchAuth::new("cid".into(), "secret".into());
        let url = auth.auth_url_full("nonce123");
        assert!(url.starts_with("https://id.twitch.tv/oauth2/authorize?client_id=cid"));
        assert!(url.contains("channel%3Aread%3Asubscriptions"));
        assert!(url.contains("bits%3Aread"));
        assert!(url.contains("state=nonce123"));
    }

    #[test]
    fn extract_callback_parses_code_and_state() {
        let request =
            "GET /auth/twitch/callback?code=abc123&state=xyz&scope=bits HTTP/1.1\r\nHost: x\r\n";
        let (code, state) = extract_callback(request).unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(state.as_deref(), Some("xyz"));
    }

    #[test]
    fn extract_callback_without_code_is_none() {
        let request = "GET /auth/twitch/callback?error=access_denied HTTP/1.1\r\n";
        assert!(extract_callback(request).is_none());
    }

    #[test]
    fn eventsub_signature_round_trip() {
        let secret = "s3cr3t";
        let (id, ts, body) = ("msg-1", "2026-01-01T00:00:00Z", r#"{"event":{}}"#);

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(id.as_bytes());
        mac.update(ts.as_bytes());
        mac.update(body.as_bytes());
        let header = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_eventsub_signature(secret, id, ts, body, &header));
        assert!(!verify_eventsub_signature("wrong", id, ts, body, &header));
        assert!(!verify_eventsub_signature(secret, id, ts, "tampered", &header));
        assert!(!verify_eventsub_signature(secret, id, ts, body, "md5=00"));
    }

    #[test]
    fn token_response_parses() {
        let body = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600
        });
        let tokens = parse_token_response(&body).unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert!(tokens.expires_at.is_some());
    }

    #[test]
    fn token_error_response_is_an_error() {
        let body = serde_json::json!({"error": "invalid_grant"});
        assert!(parse_token_response(&body).is_err());
    }

    #[tokio::test]
    async fn validate_parses_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/validate")
            .match_header("Authorization", "OAuth token123")
            .with_status(200)
            .with_body(
                r#"{"client_id":"cid","login":"streamer","user_id":"42","expires_in":5000}"#,
            )
            .create_async()
            .await;

        let url = format!("{}/validate", server.url());
        let identity = validate_at(&url, "token123").await.unwrap();
        assert_eq!(identity.login, "streamer");
        assert_eq!(identity.user_id, "42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn validate_rejects_bad_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/validate")
            .with_status(401)
            .with_body(r#"{"status":401,"message":"invalid access token"}"#)
            .create_async()
            .await;

        let url = format!("{}/validate", server.url());
        assert!(validate_at(&url, "bad").await.is_err());
    }
}
