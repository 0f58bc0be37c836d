// Recommendation session: one explicit, user-triggered request keyed on the
// current roster composition. An empty roster fails fast with a validation
// message and no network call. Requests carry a token so a superseding click
// wins even if an older response straggles in.

use std::sync::Arc;

use tracing::{info, warn};

use crate::gateway::Gateway;
use crate::player::{PlayerCard, PlayerId};

pub const FALLBACK_RECOMMEND: &str = "Failed to load recommendations";
pub const EMPTY_ROSTER_MESSAGE: &str =
    "Add players to your team before requesting recommendations";

#[derive(Debug)]
pub struct RecommendationFetch {
    token: u64,
    ids: Vec<PlayerId>,
}

impl RecommendationFetch {
    pub async fn run(self, gateway: Arc<dyn Gateway>) -> RecommendationOutcome {
        let result = gateway
            .get_recommendations(&self.ids)
            .await
            .map(|raw| raw.into_iter().map(|r| r.into_card()).collect())
            .map_err(|e| e.user_message(FALLBACK_RECOMMEND));
        RecommendationOutcome {
            token: self.token,
            result,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationOutcome {
    pub token: u64,
    pub result: Result<Vec<PlayerCard>, String>,
}

#[derive(Debug, Default)]
pub struct RecommendationSession {
    recommendations: Vec<PlayerCard>,
    loading: bool,
    error: Option<String>,
    token: u64,
}

impl RecommendationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recommendations(&self) -> &[PlayerCard] {
        &self.recommendations
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Begin a recommendation request for the given roster ids. An empty
    /// roster is rejected before any network call; the validation message is
    /// stored as the session error.
    pub fn begin_request(&mut self, ids: &[PlayerId]) -> Option<RecommendationFetch> {
        if ids.is_empty() {
            warn!("recommendations requested with empty roster");
            self.error = Some(EMPTY_ROSTER_MESSAGE.to_string());
            self.loading = false;
            return None;
        }
        self.token += 1;
        self.loading = true;
        self.error = None;
        info!(token = self.token, roster = ids.len(), "recommendations requested");
        Some(RecommendationFetch {
            token: self.token,
            ids: ids.to_vec(),
        })
    }

    /// Apply a completed request. Returns `false` when the outcome belongs
    /// to a superseded request and was discarded.
    pub fn apply(&mut self, outcome: RecommendationOutcome) -> bool {
        if outcome.token != self.token {
            return false;
        }
        self.loading = false;
        match outcome.result {
            Ok(cards) => {
                self.recommendations = cards;
                self.error = None;
            }
            Err(msg) => {
                self.error = Some(msg);
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
