//! AuthClient — two-legged OAuth (client credentials) session.
//!
//! The session is an explicit value handed to every API client rather than a
//! process-wide global, so several independent sessions can live side by side.
//! Clones share the same cached token.

use crate::{
    errors::{ForgeError, ForgeResult},
    services::client::{endpoint, ensure_success, parse_base_url},
};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: [&str; 6] = [
    "data:read",
    "data:write",
    "data:create",
    "bucket:read",
    "bucket:update",
    "bucket:create",
];

/// Refresh this long before the advertised expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

/// An access token and when it stops being valid.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    auto_refresh: bool,
    credentials: Arc<RwLock<Option<Credentials>>>,
}

impl AuthClient {
    pub fn new(
        http: Client,
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scopes: Vec<String>,
        auto_refresh: bool,
    ) -> ForgeResult<Self> {
        let base = parse_base_url(base_url)?;
        Ok(Self {
            http,
            token_url: endpoint(&base, &["authentication", "v1", "authenticate"])?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes,
            auto_refresh,
            credentials: Arc::new(RwLock::new(None)),
        })
    }

    /// Fetch a fresh token and store it in the session.
    pub async fn authenticate(&self) -> ForgeResult<Credentials> {
        let scope = self.scopes.join(" ");
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
        ];

        debug!(scope = %scope, "requesting two-legged token");
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response).await?.json().await?;

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(ForgeError::TokenExpiry(token.expires_in))?;
        let credentials = Credentials {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_at,
        };
        info!(
            token_type = %credentials.token_type,
            expires_at = %credentials.expires_at,
            "authenticated"
        );

        *self.credentials.write().await = Some(credentials.clone());
        Ok(credentials)
    }

    /// Current token, authenticating first if the session has none yet.
    ///
    /// An expired token is refreshed only when auto refresh is on; otherwise
    /// the stale token is handed out and the API will reject it.
    pub async fn access_token(&self) -> ForgeResult<String> {
        if let Some(credentials) = self.credentials.read().await.as_ref() {
            if !self.auto_refresh || !credentials.is_expired(Utc::now()) {
                return Ok(credentials.access_token.clone());
            }
            debug!("access token expired, refreshing");
        }

        Ok(self.authenticate().await?.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    fn scopes() -> Vec<String> {
        DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
    }

    fn token_body(token: &str, expires_in: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": expires_in
        })
    }

    #[tokio::test]
    async fn authenticate_posts_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=my-id"))
            .and(body_string_contains("scope=data%3Aread+data%3Awrite"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 3599)))
            .expect(1)
            .mount(&server)
            .await;

        let auth =
            AuthClient::new(Client::new(), &server.uri(), "my-id", "secret", scopes(), true)
                .unwrap();
        let credentials = auth.authenticate().await.unwrap();
        assert_eq!(credentials.access_token, "tok-1");
        assert!(!credentials.is_expired(Utc::now()));
        assert_eq!(auth.access_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_when_auto_refresh_is_on() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 0)))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 3599)))
            .with_priority(2)
            .mount(&server)
            .await;

        let auth =
            AuthClient::new(Client::new(), &server.uri(), "id", "secret", scopes(), true).unwrap();
        auth.authenticate().await.unwrap();
        assert_eq!(auth.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn expired_token_is_kept_without_auto_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let auth =
            AuthClient::new(Client::new(), &server.uri(), "id", "secret", scopes(), false)
                .unwrap();
        auth.authenticate().await.unwrap();
        assert_eq!(auth.access_token().await.unwrap(), "short");
    }

    #[tokio::test]
    async fn rejected_credentials_surface_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid client"))
            .mount(&server)
            .await;

        let auth =
            AuthClient::new(Client::new(), &server.uri(), "id", "bad", scopes(), true).unwrap();
        let err = auth.authenticate().await.unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        let again = auth.access_token().await.unwrap_err();
        assert_eq!(again.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn out_of_range_token_lifetime_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/v1/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok", i64::MAX)))
            .mount(&server)
            .await;

        let auth =
            AuthClient::new(Client::new(), &server.uri(), "id", "secret", scopes(), true).unwrap();
        let err = auth.authenticate().await.unwrap_err();
        assert!(matches!(err, ForgeError::TokenExpiry(i64::MAX)));
        assert!(matches!(
            auth.access_token().await.unwrap_err(),
            ForgeError::TokenExpiry(_)
        ));
    }
}
