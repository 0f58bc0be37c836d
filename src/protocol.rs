// Message types flowing between the frontend surface, the app event loop,
// and the spawned gateway tasks.

use serde::{Deserialize, Serialize};

use crate::engine::recommend::RecommendationOutcome;
use crate::engine::roster::RosterOutcome;
use crate::engine::weakness::WeaknessOutcome;
use crate::gateway::{GatewayError, PlayerValueScore, SearchResult};
use crate::player::{FieldPosition, Lineup, PlayerCard, PlayerId, SavedPlayer, WeaknessVector};

/// Which result list the main panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Idle,
    Search,
    Recommendations,
}

/// Commands from the user-facing surface into the app event loop.
#[derive(Debug, Clone)]
pub enum UserCommand {
    /// The search box text changed (raw, untrimmed).
    QueryChanged(String),
    /// Save a transient player (search/recommendation result).
    SavePlayer(PlayerCard),
    /// Delete a saved player.
    RemovePlayer(PlayerId),
    /// Assign a saved player to a slot, or bench it with `None`.
    AssignPosition {
        id: PlayerId,
        position: Option<FieldPosition>,
    },
    PrepareDrag {
        player: PlayerCard,
        from: Option<FieldPosition>,
    },
    DragOver(FieldPosition),
    DragLeave,
    Drop(FieldPosition),
    /// Drag-end without a drop (escape, dropped outside the field).
    CancelDrag,
    RequestRecommendations,
    RequestValueScores,
    /// Freeze the current weakness vector as the new baseline.
    SetBaseline,
    /// Re-list the saved roster from the gateway.
    RefreshRoster,
    Quit,
}

/// Completions of spawned gateway tasks, fed back into the event loop.
#[derive(Debug)]
pub enum EngineEvent {
    Search {
        token: u64,
        result: Result<Vec<SearchResult>, GatewayError>,
    },
    Weakness(WeaknessOutcome),
    Roster(RosterOutcome),
    Recommendations(RecommendationOutcome),
    ValueScores {
        result: Result<Vec<PlayerValueScore>, String>,
    },
}

/// A complete view of the app state, pushed to the render loop after every
/// applied command or event.
#[derive(Debug, Clone)]
pub struct AppSnapshot {
    pub mode: DisplayMode,
    pub query: String,
    pub search_results: Vec<PlayerCard>,
    pub search_error: Option<String>,
    pub recommendations: Vec<PlayerCard>,
    pub recommend_error: Option<String>,
    pub players: Vec<SavedPlayer>,
    pub lineup: Lineup,
    pub roster_error: Option<String>,
    pub weakness_current: Option<WeaknessVector>,
    pub weakness_baseline: Option<WeaknessVector>,
    pub weakness_loading: bool,
    pub weakness_error: Option<String>,
    pub value_scores: Vec<PlayerValueScore>,
    pub value_error: Option<String>,
    pub active_position: FieldPosition,
    pub dragging: Option<PlayerId>,
    pub drop_target: Option<FieldPosition>,
}

/// Updates pushed to the render loop.
#[derive(Debug)]
pub enum UiUpdate {
    Snapshot(Box<AppSnapshot>),
}
