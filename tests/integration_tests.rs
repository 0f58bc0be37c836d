// Integration tests for the Cybermetrics client.
//
// These tests exercise the full system end-to-end through the library
// crate's public API: the app event loop, the roster/weakness/search state
// machines, the auth flow, and the session store, wired to a scripted
// gateway so every network interaction is observable.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use cybermetrics::app::{self, AppState};
use cybermetrics::auth::AuthSession;
use cybermetrics::gateway::{
    AddSavedResponse, AuthResponse, DeleteSavedResponse, Gateway, GatewayError, PlayerValueScore,
    SearchResult, VerifiedUser,
};
use cybermetrics::player::{FieldPosition, PlayerCard, PlayerId, SavedPlayer, WeaknessVector};
use cybermetrics::protocol::{AppSnapshot, DisplayMode, UiUpdate, UserCommand};
use cybermetrics::session::{MemorySessionStore, SessionStore, SqliteSessionStore, SESSION_KEYS};

// ===========================================================================
// Test helpers
// ===========================================================================

const DEBOUNCE: Duration = Duration::from_millis(300);

type Queue<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

/// A gateway that records every call and answers from queued responses,
/// defaulting to benign successes.
#[derive(Default)]
struct ScriptedGateway {
    calls: Mutex<Vec<String>>,
    search: Queue<Vec<SearchResult>>,
    saved: Queue<Vec<SavedPlayer>>,
    weakness: Queue<WeaknessVector>,
    recommendations: Queue<Vec<SearchResult>>,
    values: Queue<Vec<PlayerValueScore>>,
    reject_login: Mutex<Option<String>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn pop<T>(queue: &Queue<T>) -> Option<Result<T, GatewayError>> {
        queue.lock().unwrap().pop_front()
    }

    fn push<T>(queue: &Queue<T>, response: Result<T, GatewayError>) {
        queue.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn search_players(&self, query: &str) -> Result<Vec<SearchResult>, GatewayError> {
        self.record(format!("search:{query}"));
        Self::pop(&self.search).unwrap_or_else(|| Ok(vec![]))
    }

    async fn get_saved(&self) -> Result<Vec<SavedPlayer>, GatewayError> {
        self.record("get_saved".to_string());
        Self::pop(&self.saved).unwrap_or_else(|| Ok(vec![]))
    }

    async fn add_saved(&self, player: &SavedPlayer) -> Result<AddSavedResponse, GatewayError> {
        self.record(format!("add:{}", player.id));
        Ok(AddSavedResponse {
            message: None,
            player_id: player.id,
        })
    }

    async fn delete_saved(&self, id: PlayerId) -> Result<DeleteSavedResponse, GatewayError> {
        self.record(format!("delete:{id}"));
        Ok(DeleteSavedResponse { message: None })
    }

    async fn update_saved_position(
        &self,
        id: PlayerId,
        position: Option<FieldPosition>,
    ) -> Result<SavedPlayer, GatewayError> {
        let pos = position.map(|p| p.code()).unwrap_or("bench");
        self.record(format!("position:{id}:{pos}"));
        Ok(SavedPlayer {
            id,
            name: format!("Player {id}"),
            image_url: None,
            years_active: None,
            position,
        })
    }

    async fn get_team_weakness(&self, ids: &[PlayerId]) -> Result<WeaknessVector, GatewayError> {
        let key = ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("weakness:{key}"));
        Self::pop(&self.weakness).unwrap_or_else(|| {
            Ok(WeaknessVector {
                strikeout_rate: -0.5,
                walk_rate: 0.1,
                isolated_power: 0.3,
                on_base_percentage: 0.2,
                base_running: 0.0,
            })
        })
    }

    async fn get_player_value_scores(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<PlayerValueScore>, GatewayError> {
        self.record(format!("values:{}", ids.len()));
        Self::pop(&self.values).unwrap_or_else(|| Ok(vec![]))
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
        self.record(format!("recommend:{key}"));
        Self::pop(&self.recommendations).unwrap_or_else(|| Ok(vec![]))
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, GatewayError> {
        self.record(format!("login:{email}"));
        if let Some(message) = self.reject_login.lock().unwrap().clone() {
            return Err(GatewayError::api(401, message));
        }
        Ok(AuthResponse {
            token: "tok-1".to_string(),
            user_id: "u-1".to_string(),
            email: Some(email.to_string()),
            display_name: Some("Test User".to_string()),
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
            token: "tok-1".to_string(),
            user_id: "u-1".to_string(),
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        })
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, GatewayError> {
        self.record(format!("verify:{token}"));
        if token == "tok-1" {
            Ok(VerifiedUser {
                user_id: "u-1".to_string(),
                email: Some("test@example.com".to_string()),
                display_name: None,
            })
        } else {
            Err(GatewayError::api(401, "Invalid token"))
        }
    }
}

fn card(id: PlayerId, name: &str) -> PlayerCard {
    PlayerCard {
        id,
        name: name.into(),
        image_url: None,
        years_active: None,
    }
}

fn saved(id: PlayerId, name: &str, position: Option<FieldPosition>) -> SavedPlayer {
    SavedPlayer {
        id,
        name: name.into(),
        image_url: None,
        years_active: None,
        position,
    }
}

fn raw(id: PlayerId, name: &str) -> SearchResult {
    SearchResult {
        id,
        name: name.into(),
        score: None,
        image_url: None,
        years_active: None,
    }
}

/// Spawn the app loop against a scripted gateway and hand back the channels.
struct App {
    gateway: Arc<ScriptedGateway>,
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl App {
    fn spawn(gateway: Arc<ScriptedGateway>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (engine_tx, engine_rx) = mpsc::channel(64);
        let (ui_tx, ui_rx) = mpsc::channel(64);
        let state = AppState::new(gateway.clone(), DEBOUNCE, engine_tx);
        let handle = tokio::spawn(app::run(cmd_rx, engine_rx, ui_tx, state));
        App {
            gateway,
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    async fn send(&self, cmd: UserCommand) {
        self.cmd_tx.send(cmd).await.unwrap();
    }

    async fn snapshot_until(&mut self, pred: impl Fn(&AppSnapshot) -> bool) -> AppSnapshot {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let UiUpdate::Snapshot(snapshot) =
                    self.ui_rx.recv().await.expect("ui channel open");
                if pred(&snapshot) {
                    return *snapshot;
                }
            }
        })
        .await
        .expect("expected snapshot within timeout")
    }

    async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    async fn shutdown(self) {
        let _ = self.cmd_tx.send(UserCommand::Quit).await;
        let _ = self.handle.await;
    }
}

// ===========================================================================
// Roster and weakness lifecycle
// ===========================================================================

#[tokio::test]
async fn startup_lists_roster_and_computes_weakness() {
    let gateway = Arc::new(ScriptedGateway::new());
    ScriptedGateway::push(
        &gateway.saved,
        Ok(vec![
            saved(1, "Johnny Bench", Some(FieldPosition::Catcher)),
            saved(2, "Ozzie Smith", None),
        ]),
    );

    let mut app = App::spawn(gateway);
    let snapshot = app
        .snapshot_until(|s| s.players.len() == 2 && s.weakness_current.is_some())
        .await;

    assert_eq!(snapshot.lineup.occupant(FieldPosition::Catcher), Some(1));
    assert_eq!(snapshot.lineup.filled_count(), 1);
    assert_eq!(app.gateway.count("get_saved"), 1);
    // One weakness fetch for the freshly listed composition, keyed in
    // insertion order.
    assert_eq!(app.gateway.count("weakness:1,2"), 1);
    app.shutdown().await;
}

#[tokio::test]
async fn save_assign_remove_full_cycle() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut app = App::spawn(gateway);

    app.send(UserCommand::SavePlayer(card(7, "Cal Ripken"))).await;
    let snapshot = app.snapshot_until(|s| !s.players.is_empty()).await;
    assert_eq!(snapshot.players[0].position, None);

    app.send(UserCommand::AssignPosition {
        id: 7,
        position: Some(FieldPosition::ShortStop),
    })
    .await;
    let snapshot = app
        .snapshot_until(|s| s.lineup.occupant(FieldPosition::ShortStop) == Some(7))
        .await;
    assert_eq!(snapshot.lineup.filled_count(), 1);

    app.send(UserCommand::RemovePlayer(7)).await;
    let snapshot = app.snapshot_until(|s| s.players.is_empty()).await;
    assert_eq!(snapshot.lineup.occupant(FieldPosition::ShortStop), None);

    // Composition changed twice (add, remove); the empty roster clears the
    // weakness vectors without a third fetch.
    assert!(snapshot.weakness_current.is_none());
    assert_eq!(app.gateway.count("weakness:"), 1);
    app.shutdown().await;
}

#[tokio::test]
async fn drag_displacement_persists_in_order() {
    let gateway = Arc::new(ScriptedGateway::new());
    ScriptedGateway::push(
        &gateway.saved,
        Ok(vec![
            saved(1, "A", Some(FieldPosition::CenterField)),
            saved(2, "B", None),
        ]),
    );
    let mut app = App::spawn(gateway);
    let _ = app.snapshot_until(|s| s.players.len() == 2).await;

    app.send(UserCommand::PrepareDrag {
        player: card(2, "B"),
        from: None,
    })
    .await;
    app.send(UserCommand::DragOver(FieldPosition::CenterField)).await;
    app.send(UserCommand::Drop(FieldPosition::CenterField)).await;

    let snapshot = app
        .snapshot_until(|s| s.lineup.occupant(FieldPosition::CenterField) == Some(2))
        .await;
    assert_eq!(snapshot.lineup.filled_count(), 1);
    assert_eq!(
        snapshot.players.iter().find(|p| p.id == 1).unwrap().position,
        None
    );
    assert_eq!(snapshot.active_position, FieldPosition::CenterField);

    let position_calls: Vec<String> = app
        .gateway
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("position:"))
        .collect();
    assert_eq!(
        position_calls,
        vec!["position:2:CF".to_string(), "position:1:bench".to_string()]
    );
    app.shutdown().await;
}

#[tokio::test]
async fn dropping_a_search_result_saves_then_assigns() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut app = App::spawn(gateway);

    app.send(UserCommand::PrepareDrag {
        player: card(42, "Jackie Robinson"),
        from: None,
    })
    .await;
    app.send(UserCommand::Drop(FieldPosition::SecondBase)).await;

    let snapshot = app
        .snapshot_until(|s| s.lineup.occupant(FieldPosition::SecondBase) == Some(42))
        .await;
    assert!(snapshot.players.iter().any(|p| p.id == 42));
    assert_eq!(app.gateway.count("add:42"), 1);
    assert_eq!(app.gateway.count("position:42:2B"), 1);
    app.shutdown().await;
}

// ===========================================================================
// Search debounce
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn typing_debounces_to_a_single_search() {
    let gateway = Arc::new(ScriptedGateway::new());
    ScriptedGateway::push(&gateway.search, Ok(vec![raw(3, "Willie Mays")]));
    let mut app = App::spawn(gateway);

    for query in ["w", "wi", "willie"] {
        app.send(UserCommand::QueryChanged(query.into())).await;
    }
    app.settle().await;
    tokio::time::advance(DEBOUNCE + Duration::from_millis(10)).await;

    let snapshot = app.snapshot_until(|s| !s.search_results.is_empty()).await;
    assert_eq!(snapshot.mode, DisplayMode::Search);
    assert_eq!(snapshot.search_results[0].name, "Willie Mays");
    assert_eq!(app.gateway.count("search:"), 1);
    assert_eq!(app.gateway.count("search:willie"), 1);
    app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn clearing_the_box_cancels_the_pending_search() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut app = App::spawn(gateway);

    app.send(UserCommand::QueryChanged("mantle".into())).await;
    app.settle().await;
    app.send(UserCommand::QueryChanged("  ".into())).await;
    let snapshot = app.snapshot_until(|s| s.query == "  ").await;
    assert_eq!(snapshot.mode, DisplayMode::Idle);
    assert!(snapshot.search_results.is_empty());

    tokio::time::advance(DEBOUNCE * 2).await;
    app.settle().await;
    assert_eq!(app.gateway.count("search:"), 0);
    app.shutdown().await;
}

// ===========================================================================
// Recommendations and value scores
// ===========================================================================

#[tokio::test]
async fn recommendations_require_a_roster_then_round_trip() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut app = App::spawn(gateway);

    app.send(UserCommand::RequestRecommendations).await;
    let snapshot = app.snapshot_until(|s| s.recommend_error.is_some()).await;
    assert!(snapshot
        .recommend_error
        .as_deref()
        .unwrap()
        .contains("Add players"));
    assert_eq!(app.gateway.count("recommend:"), 0);

    ScriptedGateway::push(
        &app.gateway.recommendations,
        Ok(vec![raw(8, "Yogi Berra")]),
    );
    app.send(UserCommand::SavePlayer(card(5, "Joe DiMaggio"))).await;
    let _ = app.snapshot_until(|s| !s.players.is_empty()).await;

    app.send(UserCommand::RequestRecommendations).await;
    let snapshot = app.snapshot_until(|s| !s.recommendations.is_empty()).await;
    assert_eq!(snapshot.mode, DisplayMode::Recommendations);
    assert_eq!(snapshot.recommendations[0].id, 8);
    assert_eq!(app.gateway.count("recommend:5"), 1);
    app.shutdown().await;
}

#[tokio::test]
async fn value_scores_render_for_the_saved_roster() {
    let gateway = Arc::new(ScriptedGateway::new());
    ScriptedGateway::push(
        &gateway.values,
        Ok(vec![PlayerValueScore {
            id: 5,
            name: "Joe DiMaggio".into(),
            adjustment_score: 1.2,
            value_score: 8.7,
        }]),
    );
    let mut app = App::spawn(gateway);

    app.send(UserCommand::SavePlayer(card(5, "Joe DiMaggio"))).await;
    let _ = app.snapshot_until(|s| !s.players.is_empty()).await;

    app.send(UserCommand::RequestValueScores).await;
    let snapshot = app.snapshot_until(|s| !s.value_scores.is_empty()).await;
    assert_eq!(snapshot.value_scores[0].value_score, 8.7);
    assert!(snapshot.value_error.is_none());
    app.shutdown().await;
}

// ===========================================================================
// Baseline freezing
// ===========================================================================

#[tokio::test]
async fn baseline_freeze_then_roster_change_fetches_both_vectors() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut app = App::spawn(gateway);

    app.send(UserCommand::SavePlayer(card(1, "A"))).await;
    let _ = app.snapshot_until(|s| s.weakness_current.is_some()).await;
    assert_eq!(app.gateway.count("weakness:"), 1);

    // Freezing is local: baseline appears without another fetch.
    app.send(UserCommand::SetBaseline).await;
    let snapshot = app.snapshot_until(|s| s.weakness_baseline.is_some()).await;
    assert_eq!(snapshot.weakness_baseline, snapshot.weakness_current);
    app.settle().await;
    assert_eq!(app.gateway.count("weakness:"), 1);

    // A composition change now refetches both sides: the live roster and
    // the frozen baseline set.
    app.send(UserCommand::SavePlayer(card(2, "B"))).await;
    let _ = app.snapshot_until(|s| s.players.len() == 2).await;
    app.settle().await;
    let weakness_calls: Vec<String> = app
        .gateway
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("weakness:"))
        .collect();
    assert!(weakness_calls.contains(&"weakness:1,2".to_string()));
    // The baseline set {1} is refetched alongside the new working set.
    assert_eq!(weakness_calls.iter().filter(|c| *c == "weakness:1").count(), 2);
    assert_eq!(weakness_calls.len(), 3);
    app.shutdown().await;
}

// ===========================================================================
// Auth and session persistence
// ===========================================================================

#[tokio::test]
async fn login_persists_and_restores_across_sessions() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = Arc::new(MemorySessionStore::new());

    let auth = AuthSession::new(gateway.clone(), store.clone());
    let (profile, token) = auth.login("test@example.com", "pw").await.unwrap();
    assert_eq!(token, "tok-1");
    assert_eq!(profile.user_id, "u-1");

    // A fresh AuthSession over the same store restores the sign-in.
    let auth2 = AuthSession::new(gateway.clone(), store.clone());
    let (restored, token) = auth2.restore().await.unwrap().expect("restored session");
    assert_eq!(token, "tok-1");
    assert_eq!(restored.user_id, "u-1");
    assert_eq!(gateway.count("verify:tok-1"), 1);

    auth2.logout().unwrap();
    for key in SESSION_KEYS {
        assert_eq!(store.get(key).unwrap(), None);
    }
    assert!(auth2.restore().await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_token_clears_the_stored_session() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = Arc::new(MemorySessionStore::new());
    store.set("auth_token", "stale-token").unwrap();

    let auth = AuthSession::new(gateway.clone(), store.clone());
    assert!(auth.restore().await.unwrap().is_none());
    assert_eq!(store.get("auth_token").unwrap(), None);
}

#[test]
fn sqlite_session_store_round_trips() {
    let store = SqliteSessionStore::open(":memory:").unwrap();
    assert_eq!(store.get("auth_token").unwrap(), None);

    store.set("auth_token", "tok-1").unwrap();
    store.set("auth_token", "tok-2").unwrap(); // upsert
    assert_eq!(store.get("auth_token").unwrap().as_deref(), Some("tok-2"));

    store.clear("auth_token").unwrap();
    assert_eq!(store.get("auth_token").unwrap(), None);
}
