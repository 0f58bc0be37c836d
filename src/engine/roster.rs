// Saved roster store: the authoritative local copy of the user's saved
// players, as last synced with the gateway. All mutations are two-phase:
// `begin_*` validates and returns a job describing the gateway calls, and
// `apply` folds the job's outcome back in. A failed outcome never leaves a
// partial local mutation.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::gateway::Gateway;
use crate::player::{FieldPosition, Lineup, PlayerCard, PlayerId, SavedPlayer};

// Fixed user-facing fallbacks, used when the gateway error carries no message.
pub const FALLBACK_SAVE: &str = "Failed to save player";
pub const FALLBACK_DELETE: &str = "Failed to remove player";
pub const FALLBACK_POSITION: &str = "Failed to update position";
pub const FALLBACK_REFRESH: &str = "Failed to load saved players";

// ---------------------------------------------------------------------------
// Jobs and outcomes
// ---------------------------------------------------------------------------

/// A pending roster mutation: the gateway calls to make and the local
/// bookkeeping to apply on completion.
#[derive(Debug, Clone)]
pub enum RosterJob {
    Add {
        player: SavedPlayer,
    },
    Remove {
        id: PlayerId,
    },
    SetPosition {
        id: PlayerId,
        position: Option<FieldPosition>,
        /// The occupant displaced to the bench by this assignment, if any.
        displaced: Option<PlayerId>,
    },
    Refresh,
}

impl RosterJob {
    /// Execute the gateway calls for this job. Errors are already mapped to
    /// the user-facing string (server message or fixed fallback).
    pub async fn run(self, gateway: Arc<dyn Gateway>) -> RosterOutcome {
        match self {
            RosterJob::Add { player } => {
                let result = match gateway.add_saved(&player).await {
                    Ok(_) => Ok(player.clone()),
                    Err(e) => Err(e.user_message(FALLBACK_SAVE)),
                };
                RosterOutcome::Added {
                    id: player.id,
                    result,
                }
            }
            RosterJob::Remove { id } => {
                let result = match gateway.delete_saved(id).await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(e.user_message(FALLBACK_DELETE)),
                };
                RosterOutcome::Removed { id, result }
            }
            RosterJob::SetPosition {
                id,
                position,
                displaced,
            } => {
                // Both updates belong to one logical assignment: the local
                // state only changes if every persisted call succeeded.
                let result = async {
                    gateway
                        .update_saved_position(id, position)
                        .await
                        .map_err(|e| e.user_message(FALLBACK_POSITION))?;
                    if let Some(d) = displaced {
                        gateway
                            .update_saved_position(d, None)
                            .await
                            .map_err(|e| e.user_message(FALLBACK_POSITION))?;
                    }
                    Ok(())
                }
                .await;
                RosterOutcome::Positioned {
                    id,
                    position,
                    displaced,
                    result,
                }
            }
            RosterJob::Refresh => {
                let result = gateway
                    .get_saved()
                    .await
                    .map_err(|e| e.user_message(FALLBACK_REFRESH));
                RosterOutcome::Refreshed { result }
            }
        }
    }
}

/// The completion of a [`RosterJob`], fed back through [`RosterStore::apply`].
#[derive(Debug, Clone)]
pub enum RosterOutcome {
    Added {
        id: PlayerId,
        result: Result<SavedPlayer, String>,
    },
    Removed {
        id: PlayerId,
        result: Result<(), String>,
    },
    Positioned {
        id: PlayerId,
        position: Option<FieldPosition>,
        displaced: Option<PlayerId>,
        result: Result<(), String>,
    },
    Refreshed {
        result: Result<Vec<SavedPlayer>, String>,
    },
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory collection of saved players plus in-flight operation marks.
/// Insertion order is preserved; it is the order the weakness cache keys on.
#[derive(Debug, Default)]
pub struct RosterStore {
    players: Vec<SavedPlayer>,
    saving: HashSet<PlayerId>,
    deleting: HashSet<PlayerId>,
    error: Option<String>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Derived views (never stored) ---

    pub fn players(&self) -> &[SavedPlayer] {
        &self.players
    }

    /// Saved player ids in insertion order (the cache-key order).
    pub fn saved_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// The lineup derived by grouping saved players on their position.
    pub fn lineup(&self) -> Lineup {
        Lineup::from_players(&self.players)
    }

    pub fn get(&self, id: PlayerId) -> Option<&SavedPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_saved(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Whether a save for this id is in flight (UI disables the row).
    pub fn is_saving(&self, id: PlayerId) -> bool {
        self.saving.contains(&id)
    }

    /// Whether a delete for this id is in flight (UI disables the row).
    pub fn is_deleting(&self, id: PlayerId) -> bool {
        self.deleting.contains(&id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // --- Transitions ---

    /// Begin saving a transient player. Idempotent: already-saved and
    /// already-saving ids produce no job.
    pub fn begin_add(&mut self, card: PlayerCard) -> Option<RosterJob> {
        self.error = None;
        if self.is_saved(card.id) || self.saving.contains(&card.id) {
            return None;
        }
        self.saving.insert(card.id);
        Some(RosterJob::Add {
            player: SavedPlayer::from_card(card),
        })
    }

    /// Begin removing a saved player. A second removal for the same id while
    /// one is in flight produces no job.
    pub fn begin_remove(&mut self, id: PlayerId) -> Option<RosterJob> {
        self.error = None;
        if !self.is_saved(id) || self.deleting.contains(&id) {
            return None;
        }
        self.deleting.insert(id);
        Some(RosterJob::Remove { id })
    }

    /// Begin assigning a saved player to a field slot (or `None` for bench).
    /// Assigning a player to the slot it already occupies is a no-op with no
    /// persisted call. The displaced occupant, if any, is computed here so
    /// the job persists both changes and `apply` lands them together.
    pub fn begin_set_position(
        &mut self,
        id: PlayerId,
        position: Option<FieldPosition>,
    ) -> Option<RosterJob> {
        self.error = None;
        let player = self.get(id)?;
        if player.position == position {
            return None;
        }
        let displaced = position.and_then(|pos| {
            self.players
                .iter()
                .find(|p| p.id != id && p.position == Some(pos))
                .map(|p| p.id)
        });
        Some(RosterJob::SetPosition {
            id,
            position,
            displaced,
        })
    }

    /// Begin replacing the whole local list with the gateway's listing.
    pub fn begin_refresh(&mut self) -> RosterJob {
        self.error = None;
        RosterJob::Refresh
    }

    /// Fold a completed job back into local state. Failures record the
    /// user-facing error and leave the player list untouched.
    pub fn apply(&mut self, outcome: RosterOutcome) {
        match outcome {
            RosterOutcome::Added { id, result } => {
                self.saving.remove(&id);
                match result {
                    Ok(player) => {
                        if !self.is_saved(player.id) {
                            info!(player_id = player.id, name = %player.name, "player saved");
                            self.players.push(player);
                        }
                    }
                    Err(msg) => {
                        warn!(player_id = id, "save failed: {msg}");
                        self.error = Some(msg);
                    }
                }
            }
            RosterOutcome::Removed { id, result } => {
                self.deleting.remove(&id);
                match result {
                    Ok(()) => {
                        info!(player_id = id, "player removed");
                        self.players.retain(|p| p.id != id);
                    }
                    Err(msg) => {
                        warn!(player_id = id, "remove failed: {msg}");
                        self.error = Some(msg);
                    }
                }
            }
            RosterOutcome::Positioned {
                id,
                position,
                displaced,
                result,
            } => match result {
                Ok(()) => {
                    if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                        p.position = position;
                    }
                    if let Some(d) = displaced {
                        if let Some(p) = self.players.iter_mut().find(|p| p.id == d) {
                            p.position = None;
                        }
                    }
                    info!(player_id = id, position = ?position, ?displaced, "position updated");
                }
                Err(msg) => {
                    warn!(player_id = id, "position update failed: {msg}");
                    self.error = Some(msg);
                }
            },
            RosterOutcome::Refreshed { result } => match result {
                Ok(players) => {
                    info!(count = players.len(), "roster refreshed from gateway");
                    self.players = players;
                }
                Err(msg) => {
                    warn!("roster refresh failed: {msg}");
                    self.error = Some(msg);
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
