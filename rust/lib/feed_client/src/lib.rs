//! Typed HTTP client for the training-tracker activity feed API.
//!
//! [`FeedGateway`] is the seam the feed controller depends on; [`HttpGateway`]
//! implements it over `reqwest`. Authentication is handled by pluggable
//! [`TokenSource`] implementations called before every request.
//!
//! # Usage
//!
//! ```ignore
//! use bjjtrack_feed_client::{FeedGateway, FeedQuery, HttpGateway, StaticToken};
//!
//! let gw = HttpGateway::new("http://localhost:8080", Arc::new(StaticToken::new(jwt)));
//! let page = gw.my_feed(&FeedQuery { limit: 100, offset: 0, days_back: 30, enrich_social: Some(true) }).await?;
//! ```

mod error;
mod types;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

pub use error::{ApiError, ParseEnumError};
pub use types::{
    ActivityKey, ActivityKind, Comment, FeedItem, FeedPage, FeedQuery, LikeRequest, NewComment,
    VisibilityLevel,
};

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable token provider. Called before every API request.
///
/// Returns `Ok(None)` to skip the Authorization header (anonymous).
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Result<Option<String>, ApiError>;
}

/// No authentication: anonymous requests.
pub struct NoAuth;

#[async_trait::async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(None)
    }
}

/// Static bearer token (already obtained externally).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        if self.0.is_empty() {
            return Err(ApiError::Auth("empty token".into()));
        }
        Ok(Some(self.0.clone()))
    }
}

// ── FeedGateway ─────────────────────────────────────────────────────

/// Remote operations the feed controller consumes.
///
/// Timeouts and transport retries belong to the implementation.
#[async_trait::async_trait]
pub trait FeedGateway: Send + Sync + 'static {
    /// The viewer's own activity, enriched with social counts.
    async fn my_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError>;

    /// Activity of the viewer's friends.
    async fn friends_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError>;

    async fn like(&self, req: &LikeRequest) -> Result<(), ApiError>;

    async fn unlike(&self, req: &LikeRequest) -> Result<(), ApiError>;

    async fn delete_rest_checkin(&self, checkin_id: i64) -> Result<(), ApiError>;

    /// Replace a session record. `payload` is the full record, not a patch.
    async fn update_session(
        &self,
        session_id: i64,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError>;

    async fn add_comment(&self, req: &NewComment) -> Result<Comment, ApiError>;

    async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError>;
}

// ── HttpGateway ─────────────────────────────────────────────────────

/// `FeedGateway` over HTTP/JSON.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    /// Same as `new`, with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Build a request with auth header.
    async fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let req = self.authed(builder).await?;
        let resp = req.send().await?;
        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "feed api response");
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server { status: code, message: body });
        }
        Ok(resp)
    }

    /// Send and decode a JSON body.
    async fn fetch<R: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<R, ApiError> {
        let resp = self.send(builder).await?;
        resp.json::<R>()
            .await
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    /// Send and discard the body (acks).
    async fn ack(&self, builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl FeedGateway for HttpGateway {
    async fn my_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError> {
        self.fetch(self.http.get(self.url("feed/activity")).query(query)).await
    }

    async fn friends_feed(&self, query: &FeedQuery) -> Result<FeedPage, ApiError> {
        self.fetch(self.http.get(self.url("feed/friends")).query(query)).await
    }

    async fn like(&self, req: &LikeRequest) -> Result<(), ApiError> {
        self.ack(self.http.post(self.url("social/like")).json(req)).await
    }

    async fn unlike(&self, req: &LikeRequest) -> Result<(), ApiError> {
        self.ack(self.http.delete(self.url("social/like")).json(req)).await
    }

    async fn delete_rest_checkin(&self, checkin_id: i64) -> Result<(), ApiError> {
        let url = self.url(&format!("readiness/rest/{}", checkin_id));
        self.ack(self.http.delete(url)).await
    }

    async fn update_session(
        &self,
        session_id: i64,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.url(&format!("sessions/{}", session_id));
        self.fetch(self.http.put(url).json(payload)).await
    }

    async fn add_comment(&self, req: &NewComment) -> Result<Comment, ApiError> {
        self.fetch(self.http.post(self.url("social/comment")).json(req)).await
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError> {
        let url = self.url(&format!("social/comment/{}", comment_id));
        self.ack(self.http.delete(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_auth_returns_none() {
        let ts = NoAuth;
        assert!(ts.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn static_token_returns_value() {
        let ts = StaticToken::new("my-jwt-token");
        assert_eq!(ts.token().await.unwrap(), Some("my-jwt-token".to_string()));
    }

    #[tokio::test]
    async fn empty_static_token_is_an_auth_error() {
        let ts = StaticToken::new("");
        assert!(matches!(ts.token().await, Err(ApiError::Auth(_))));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gw = HttpGateway::new("http://localhost:8080/", Arc::new(NoAuth));
        assert_eq!(gw.url("feed/activity"), "http://localhost:8080/api/v1/feed/activity");
    }
}
