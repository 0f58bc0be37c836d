// Application state and orchestration logic.
//
// The central event loop that keeps the saved roster, its weakness snapshot,
// and search/recommendation results consistent under concurrent asynchronous
// gateway operations. Commands come in from the user-facing surface, gateway
// I/O runs in spawned tasks, and task completions are folded back in through
// token-checked apply functions so a superseded request can never clobber a
// newer one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::debounce::LatestWins;
use crate::engine::assign::DragController;
use crate::engine::recommend::{RecommendationFetch, RecommendationSession};
use crate::engine::roster::{RosterJob, RosterOutcome, RosterStore};
use crate::engine::search::{QueryAction, SearchSession};
use crate::engine::weakness::{WeaknessCache, WeaknessFetch};
use crate::gateway::{Gateway, PlayerValueScore};
use crate::player::PlayerId;
use crate::protocol::{AppSnapshot, DisplayMode, EngineEvent, UiUpdate, UserCommand};

pub const FALLBACK_VALUES: &str = "Failed to load player value scores";

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state. All mutation happens on the event-loop
/// task; spawned gateway tasks only report outcomes back over the engine
/// channel.
pub struct AppState {
    gateway: Arc<dyn Gateway>,
    pub roster: RosterStore,
    pub weakness: WeaknessCache,
    pub search: SearchSession,
    pub drag: DragController,
    pub recommend: RecommendationSession,
    pub mode: DisplayMode,
    /// The roster composition frozen as the weakness baseline. Empty until
    /// the user sets a baseline.
    baseline_ids: Vec<PlayerId>,
    value_scores: Vec<PlayerValueScore>,
    value_error: Option<String>,
    search_debounce: LatestWins,
    /// Sender for engine events; spawned tasks use a clone to report their
    /// outcome back to the event loop.
    engine_tx: mpsc::Sender<EngineEvent>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        search_debounce: Duration,
        engine_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        AppState {
            gateway,
            roster: RosterStore::new(),
            weakness: WeaknessCache::new(),
            search: SearchSession::new(),
            drag: DragController::new(),
            recommend: RecommendationSession::new(),
            mode: DisplayMode::Idle,
            baseline_ids: Vec::new(),
            value_scores: Vec::new(),
            value_error: None,
            search_debounce: LatestWins::new(search_debounce),
            engine_tx,
        }
    }

    /// Build an [`AppSnapshot`] of the current state for the render loop.
    pub fn build_snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            mode: self.mode,
            query: self.search.query().to_string(),
            search_results: self.search.results().to_vec(),
            search_error: self.search.error().map(str::to_string),
            recommendations: self.recommend.recommendations().to_vec(),
            recommend_error: self.recommend.error().map(str::to_string),
            players: self.roster.players().to_vec(),
            lineup: self.roster.lineup(),
            roster_error: self.roster.error().map(str::to_string),
            weakness_current: self.weakness.current().copied(),
            weakness_baseline: self.weakness.baseline().copied(),
            weakness_loading: self.weakness.is_loading(),
            weakness_error: self.weakness.error().map(str::to_string),
            value_scores: self.value_scores.clone(),
            value_error: self.value_error.clone(),
            active_position: self.drag.active_position(),
            dragging: self.drag.dragging().map(|p| p.id),
            drop_target: self.drag.drop_target(),
        }
    }

    // --- Task spawning ---

    fn spawn_roster(&self, job: RosterJob) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.engine_tx.clone();
        tokio::spawn(async move {
            let outcome = job.run(gateway).await;
            let _ = tx.send(EngineEvent::Roster(outcome)).await;
        });
    }

    fn spawn_weakness(&self, fetch: WeaknessFetch) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.engine_tx.clone();
        tokio::spawn(async move {
            let outcome = fetch.run(gateway).await;
            let _ = tx.send(EngineEvent::Weakness(outcome)).await;
        });
    }

    fn spawn_recommendations(&self, fetch: RecommendationFetch) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.engine_tx.clone();
        tokio::spawn(async move {
            let outcome = fetch.run(gateway).await;
            let _ = tx.send(EngineEvent::Recommendations(outcome)).await;
        });
    }

    fn spawn_value_scores(&self, ids: Vec<PlayerId>) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.engine_tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .get_player_value_scores(&ids)
                .await
                .map_err(|e| e.user_message(FALLBACK_VALUES));
            let _ = tx.send(EngineEvent::ValueScores { result }).await;
        });
    }

    /// Refresh the weakness snapshot against the live roster and the frozen
    /// baseline set. The cache skips identical compositions.
    fn refresh_weakness(&mut self) {
        let working = self.roster.saved_ids();
        let baseline = self.baseline_ids.clone();
        if let Some(fetch) = self.weakness.begin_refresh(&working, &baseline, false) {
            self.spawn_weakness(fetch);
        }
    }

    // --- Command handling ---

    fn handle_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::QueryChanged(text) => match self.search.on_query_change(&text) {
                QueryAction::Clear => {
                    self.search_debounce.cancel();
                    self.mode = DisplayMode::Idle;
                }
                QueryAction::Debounce { query } => {
                    let gateway = Arc::clone(&self.gateway);
                    let tx = self.engine_tx.clone();
                    self.search_debounce.schedule(move |token| async move {
                        let result = gateway.search_players(&query).await;
                        let _ = tx.send(EngineEvent::Search { token, result }).await;
                    });
                }
            },
            UserCommand::SavePlayer(card) => {
                if let Some(job) = self.roster.begin_add(card) {
                    self.spawn_roster(job);
                }
            }
            UserCommand::RemovePlayer(id) => {
                if let Some(job) = self.roster.begin_remove(id) {
                    self.spawn_roster(job);
                }
            }
            UserCommand::AssignPosition { id, position } => {
                if let Some(job) = self.roster.begin_set_position(id, position) {
                    self.spawn_roster(job);
                }
            }
            UserCommand::PrepareDrag { player, from } => {
                self.drag.prepare_drag(player, from);
            }
            UserCommand::DragOver(position) => self.drag.drag_over(position),
            UserCommand::DragLeave => self.drag.drag_leave(),
            UserCommand::Drop(position) => self.handle_drop(position),
            UserCommand::CancelDrag => self.drag.clear(),
            UserCommand::RequestRecommendations => {
                let ids = self.roster.saved_ids();
                if let Some(fetch) = self.recommend.begin_request(&ids) {
                    self.spawn_recommendations(fetch);
                }
            }
            UserCommand::RequestValueScores => {
                self.spawn_value_scores(self.roster.saved_ids());
            }
            UserCommand::SetBaseline => {
                self.baseline_ids = self.roster.saved_ids();
                self.weakness.freeze_baseline(&self.baseline_ids);
                info!(players = self.baseline_ids.len(), "baseline frozen");
            }
            UserCommand::RefreshRoster => {
                let job = self.roster.begin_refresh();
                self.spawn_roster(job);
            }
            UserCommand::Quit => {
                // Handled in the main loop.
            }
        }
    }

    /// Complete a drop: make sure the player is saved (idempotent), then
    /// assign it to the slot. Assignments for players whose save is still in
    /// flight wait on the save's outcome.
    fn handle_drop(&mut self, position: crate::player::FieldPosition) {
        let Some(intent) = self.drag.drop(position) else {
            debug!("stray drop ignored (no drag in progress)");
            return;
        };
        let id = intent.player.id;
        if self.roster.is_saved(id) {
            if let Some(job) = self.roster.begin_set_position(id, Some(position)) {
                self.spawn_roster(job);
            }
        } else {
            match self.roster.begin_add(intent.player) {
                Some(job) => {
                    self.drag.set_pending_assignment(id, position);
                    self.spawn_roster(job);
                }
                // A save for this player is already in flight; the
                // assignment chains off its completion.
                None => self.drag.set_pending_assignment(id, position),
            }
        }
    }

    // --- Engine event handling ---

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Search { token, result } => {
                // Responses from superseded queries are discarded so the
                // displayed results always correspond to the latest query.
                if !self.search_debounce.is_current(token) {
                    debug!(token, "discarding stale search response");
                    return;
                }
                // Mode switches to the results view only on success; a
                // failure surfaces through the search error field.
                if self.search.apply(result) && self.search.error().is_none() {
                    self.mode = DisplayMode::Search;
                }
            }
            EngineEvent::Weakness(outcome) => {
                self.weakness.apply(outcome);
            }
            EngineEvent::Roster(outcome) => {
                let refreshed = matches!(&outcome, RosterOutcome::Refreshed { .. });
                let pending = match &outcome {
                    RosterOutcome::Added { id, result } => match result {
                        Ok(_) => self
                            .drag
                            .take_pending_assignment(*id)
                            .map(|pos| (*id, pos)),
                        Err(_) => {
                            self.drag.cancel_pending_assignment(*id);
                            None
                        }
                    },
                    _ => None,
                };

                let before = self.roster.saved_ids();
                self.roster.apply(outcome);
                let after = self.roster.saved_ids();

                if let Some((id, pos)) = pending {
                    if let Some(job) = self.roster.begin_set_position(id, Some(pos)) {
                        self.spawn_roster(job);
                    }
                }

                // The store changing its player-id composition is the signal
                // for a weakness recomputation. Position shuffles don't
                // change composition and don't refetch. A full re-listing
                // also re-runs the cache check, which retries a previously
                // failed pair while an unchanged successful one stays
                // deduped.
                if before != after || refreshed {
                    self.refresh_weakness();
                }
            }
            EngineEvent::Recommendations(outcome) => {
                if self.recommend.apply(outcome) {
                    self.mode = if self.recommend.error().is_some() {
                        DisplayMode::Idle
                    } else {
                        DisplayMode::Recommendations
                    };
                }
            }
            EngineEvent::ValueScores { result } => match result {
                Ok(scores) => {
                    self.value_scores = scores;
                    self.value_error = None;
                }
                Err(msg) => {
                    warn!("value scores failed: {msg}");
                    self.value_error = Some(msg);
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the frontend surface
/// 2. Engine events from spawned gateway tasks
///
/// Pushes a full state snapshot through `ui_tx` after every applied command
/// or event. `engine_rx` must be the receiver paired with the sender the
/// state was built with.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut engine_rx: mpsc::Receiver<EngineEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("application event loop started");

    // Prime local state from the gateway; the roster listing's outcome also
    // triggers the first weakness refresh.
    let job = state.roster.begin_refresh();
    state.spawn_roster(job);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        state.handle_command(cmd);
                        let snapshot = state.build_snapshot();
                        let _ = ui_tx.send(UiUpdate::Snapshot(Box::new(snapshot))).await;
                    }
                    None => {
                        info!("command channel closed, shutting down");
                        break;
                    }
                }
            }
            event = engine_rx.recv() => {
                match event {
                    Some(event) => {
                        state.handle_event(event);
                        let snapshot = state.build_snapshot();
                        let _ = ui_tx.send(UiUpdate::Snapshot(Box::new(snapshot))).await;
                    }
                    None => {
                        info!("engine channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    info!("application event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
