// Remote data gateway: the HTTP backend that owns player search, the saved
// roster, team-weakness computation, and recommendation ranking. This crate
// only consumes the API; all responses are validated into fixed shapes at
// this boundary.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::player::{FieldPosition, PlayerCard, PlayerId, SavedPlayer, WeaknessVector};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was superseded and its effect suppressed. Never surfaced
    /// to the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request. `message` is the server-provided
    /// reason, absent when the response body carried none.
    #[error("API error (status {status}): {}", message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Shorthand for a server rejection with a message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Api {
            status,
            message: Some(message.into()),
        }
    }

    /// Whether this error represents a cancelled request. Besides the
    /// explicit variant, a "cancel" marker anywhere in the message counts
    /// (case-insensitive substring match, per the backend's convention).
    pub fn is_cancelled(&self) -> bool {
        match self {
            GatewayError::Cancelled => true,
            other => other.to_string().to_lowercase().contains("cancel"),
        }
    }

    /// The short string shown to the user. Errors without a server-provided
    /// message fall back to the fixed per-operation default.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GatewayError::Api {
                message: Some(m), ..
            } if !m.is_empty() => m.clone(),
            GatewayError::Http(e) => e.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// A raw player record as returned by search and recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub years_active: Option<String>,
}

impl SearchResult {
    /// Map the raw record into the display shape (drops the match score).
    pub fn into_card(self) -> PlayerCard {
        PlayerCard {
            id: self.id,
            name: self.name,
            image_url: self.image_url,
            years_active: self.years_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSavedResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSavedResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Per-player value/adjustment scores for the current roster composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerValueScore {
    pub id: PlayerId,
    pub name: String,
    pub adjustment_score: f64,
    pub value_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedUser {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for the endpoints keyed on a roster id set.
#[derive(Debug, Serialize)]
struct IdsBody<'a> {
    player_ids: &'a [PlayerId],
}

#[derive(Debug, Serialize)]
struct PositionBody {
    position: Option<FieldPosition>,
}

/// Error body shape the backend uses for rejections.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(alias = "error", alias = "detail")]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// The remote data gateway, behind a trait so the engine and its tests can
/// run against a scripted implementation.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn search_players(&self, query: &str) -> Result<Vec<SearchResult>, GatewayError>;

    async fn get_saved(&self) -> Result<Vec<SavedPlayer>, GatewayError>;
    async fn add_saved(&self, player: &SavedPlayer) -> Result<AddSavedResponse, GatewayError>;
    async fn delete_saved(&self, id: PlayerId) -> Result<DeleteSavedResponse, GatewayError>;
    async fn update_saved_position(
        &self,
        id: PlayerId,
        position: Option<FieldPosition>,
    ) -> Result<SavedPlayer, GatewayError>;

    async fn get_team_weakness(&self, ids: &[PlayerId]) -> Result<WeaknessVector, GatewayError>;
    async fn get_player_value_scores(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<PlayerValueScore>, GatewayError>;
    async fn get_recommendations(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<SearchResult>, GatewayError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, GatewayError>;
    async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthResponse, GatewayError>;
    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, GatewayError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed gateway speaking JSON to the configured backend base URL.
/// The bearer token is set after login/verify and attached to every request.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        HttpGateway {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Build a gateway from the `[api]` config section (base URL plus
    /// per-request timeout).
    pub fn from_config(api: &crate::config::ApiConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(HttpGateway {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Set or clear the bearer token attached to subsequent requests.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().expect("token lock poisoned") = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().expect("token lock poisoned").as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and decode the JSON body, mapping non-2xx statuses to
    /// `GatewayError::Api` with the server's message when the body carries one.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message);
            debug!(status = status.as_u16(), ?message, "gateway request rejected");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn search_players(&self, query: &str) -> Result<Vec<SearchResult>, GatewayError> {
        let req = self
            .http
            .get(self.url("/players/search"))
            .query(&[("q", query)]);
        self.execute(req).await
    }

    async fn get_saved(&self) -> Result<Vec<SavedPlayer>, GatewayError> {
        self.execute(self.http.get(self.url("/saved-players"))).await
    }

    async fn add_saved(&self, player: &SavedPlayer) -> Result<AddSavedResponse, GatewayError> {
        let req = self.http.post(self.url("/saved-players")).json(player);
        self.execute(req).await
    }

    async fn delete_saved(&self, id: PlayerId) -> Result<DeleteSavedResponse, GatewayError> {
        let req = self
            .http
            .delete(self.url(&format!("/saved-players/{id}")));
        self.execute(req).await
    }

    async fn update_saved_position(
        &self,
        id: PlayerId,
        position: Option<FieldPosition>,
    ) -> Result<SavedPlayer, GatewayError> {
        let req = self
            .http
            .patch(self.url(&format!("/saved-players/{id}/position")))
            .json(&PositionBody { position });
        self.execute(req).await
    }

    async fn get_team_weakness(&self, ids: &[PlayerId]) -> Result<WeaknessVector, GatewayError> {
        let req = self
            .http
            .post(self.url("/team/weakness"))
            .json(&IdsBody { player_ids: ids });
        self.execute(req).await
    }

    async fn get_player_value_scores(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<PlayerValueScore>, GatewayError> {
        let req = self
            .http
            .post(self.url("/players/value-scores"))
            .json(&IdsBody { player_ids: ids });
        self.execute(req).await
    }

    async fn get_recommendations(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<SearchResult>, GatewayError> {
        let req = self
            .http
            .post(self.url("/recommendations"))
            .json(&IdsBody { player_ids: ids });
        self.execute(req).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, GatewayError> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.execute(req).await
    }

    async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthResponse, GatewayError> {
        let req = self.http.post(self.url("/auth/signup")).json(&serde_json::json!({
            "email": email,
            "password": password,
            "display_name": display_name,
        }));
        self.execute(req).await
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, GatewayError> {
        let req = self
            .http
            .post(self.url("/auth/verify"))
            .json(&serde_json::json!({ "token": token }));
        self.execute(req).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
