// Shared test helpers: a scripted gateway that records every call and pops
// queued responses, defaulting to benign successes.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::gateway::{
    AddSavedResponse, AuthResponse, DeleteSavedResponse, Gateway, GatewayError, PlayerValueScore,
    SearchResult, VerifiedUser,
};
use crate::player::{FieldPosition, PlayerId, SavedPlayer, WeaknessVector};

type Queue<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<String>>,
    search_responses: Queue<Vec<SearchResult>>,
    saved_responses: Queue<Vec<SavedPlayer>>,
    add_responses: Queue<AddSavedResponse>,
    delete_responses: Queue<DeleteSavedResponse>,
    position_responses: Queue<SavedPlayer>,
    weakness_responses: Queue<WeaknessVector>,
    value_responses: Queue<Vec<PlayerValueScore>>,
    recommendation_responses: Queue<Vec<SearchResult>>,
    verify_failure: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Number of recorded calls whose log entry starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// The full call log, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn pop<T>(queue: &Queue<T>) -> Option<Result<T, GatewayError>> {
        queue.lock().unwrap().pop_front()
    }

    pub fn push_search(&self, response: Result<Vec<SearchResult>, GatewayError>) {
        self.search_responses.lock().unwrap().push_back(response);
    }

    pub fn push_saved(&self, response: Result<Vec<SavedPlayer>, GatewayError>) {
        self.saved_responses.lock().unwrap().push_back(response);
    }

    pub fn push_add(&self, response: Result<AddSavedResponse, GatewayError>) {
        self.add_responses.lock().unwrap().push_back(response);
    }

    pub fn push_delete(&self, response: Result<DeleteSavedResponse, GatewayError>) {
        self.delete_responses.lock().unwrap().push_back(response);
    }

    pub fn push_position(&self, response: Result<SavedPlayer, GatewayError>) {
        self.position_responses.lock().unwrap().push_back(response);
    }

    pub fn push_weakness(&self, response: Result<WeaknessVector, GatewayError>) {
        self.weakness_responses.lock().unwrap().push_back(response);
    }

    pub fn push_value_scores(&self, response: Result<Vec<PlayerValueScore>, GatewayError>) {
        self.value_responses.lock().unwrap().push_back(response);
    }

    pub fn push_recommendations(&self, response: Result<Vec<SearchResult>, GatewayError>) {
        self.recommendation_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    /// Make `verify_token` reject with the given message.
    pub fn fail_verify(&self, message: &str) {
        *self.verify_failure.lock().unwrap() = Some(message.to_string());
    }

    fn flat_vector() -> WeaknessVector {
        WeaknessVector {
            strikeout_rate: 0.0,
            walk_rate: 0.0,
            isolated_power: 0.0,
            on_base_percentage: 0.0,
            base_running: 0.0,
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn search_players(&self, query: &str) -> Result<Vec<SearchResult>, GatewayError> {
        self.record(format!("search_players:{query}"));
        Self::pop(&self.search_responses).unwrap_or_else(|| Ok(vec![]))
    }

    async fn get_saved(&self) -> Result<Vec<SavedPlayer>, GatewayError> {
        self.record("get_saved".to_string());
        Self::pop(&self.saved_responses).unwrap_or_else(|| Ok(vec![]))
    }

    async fn add_saved(&self, player: &SavedPlayer) -> Result<AddSavedResponse, GatewayError> {
        self.record(format!("add_saved:{}", player.id));
        Self::pop(&self.add_responses).unwrap_or_else(|| {
            Ok(AddSavedResponse {
                message: None,
                player_id: player.id,
            })
        })
    }

    async fn delete_saved(&self, id: PlayerId) -> Result<DeleteSavedResponse, GatewayError> {
        self.record(format!("delete_saved:{id}"));
        Self::pop(&self.delete_responses)
            .unwrap_or_else(|| Ok(DeleteSavedResponse { message: None }))
    }

    async fn update_saved_position(
        &self,
        id: PlayerId,
        position: Option<FieldPosition>,
    ) -> Result<SavedPlayer, GatewayError> {
        let pos_str = position.map(|p| p.code()).unwrap_or("bench");
        self.record(format!("update_saved_position:{id}:{pos_str}"));
        Self::pop(&self.position_responses).unwrap_or_else(|| {
            Ok(SavedPlayer {
                id,
                name: format!("Player {id}"),
                image_url: None,
                years_active: None,
                position,
            })
        })
    }

    async fn get_team_weakness(&self, ids: &[PlayerId]) -> Result<WeaknessVector, GatewayError> {
        let key = ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("get_team_weakness:{key}"));
        Self::pop(&self.weakness_responses).unwrap_or_else(|| Ok(Self::flat_vector()))
    }

    async fn get_player_value_scores(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<PlayerValueScore>, GatewayError> {
        self.record(format!("get_player_value_scores:{}", ids.len()));
        Self::pop(&self.value_responses).unwrap_or_else(|| Ok(vec![]))
    }

    async fn get_recommendations(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<SearchResult>, GatewayError> {
        let key = ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("get_recommendations:{key}"));
        Self::pop(&self.recommendation_responses).unwrap_or_else(|| Ok(vec![]))
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, GatewayError> {
        self.record(format!("login:{email}"));
        Ok(AuthResponse {
            token: "mock-token".to_string(),
            user_id: "user-1".to_string(),
            email: Some(email.to_string()),
            display_name: Some("Mock User".to_string()),
        })
    }

    async fn signup(
        &self,
        email: &str,
        _password: &str,
        display_name: &str,
    ) -> Result<AuthResponse, GatewayError> {
        self.record(format!("signup:{email}"));
        Ok(AuthResponse {
            token: "mock-token".to_string(),
            user_id: "user-1".to_string(),
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        })
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, GatewayError> {
        self.record(format!("verify_token:{token}"));
        if let Some(message) = self.verify_failure.lock().unwrap().clone() {
            return Err(GatewayError::api(401, message));
        }
        Ok(VerifiedUser {
            user_id: "user-1".to_string(),
            email: None,
            display_name: None,
        })
    }
}
