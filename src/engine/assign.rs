// Drag/assignment controller: tracks which player is mid-drag, which field
// slot is the hover target, and the slot last interacted with. A drop emits
// an intent (ensure saved, then assign); the actual persistence goes through
// the roster store's atomic set-position transition.

use crate::player::{FieldPosition, PlayerCard, PlayerId};

/// The slot highlighted before any interaction.
pub const INITIAL_ACTIVE_POSITION: FieldPosition = FieldPosition::Pitcher;

/// What a completed drop asks the orchestrator to do: make sure the player
/// is saved (idempotent), then assign it to the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct DropIntent {
    pub player: PlayerCard,
    pub position: FieldPosition,
}

#[derive(Debug)]
pub struct DragController {
    dragging: Option<PlayerCard>,
    drop_target: Option<FieldPosition>,
    active_position: FieldPosition,
    /// Assignment waiting on an in-flight save of a transient player.
    pending_assignment: Option<(PlayerId, FieldPosition)>,
}

impl Default for DragController {
    fn default() -> Self {
        DragController {
            dragging: None,
            drop_target: None,
            active_position: INITIAL_ACTIVE_POSITION,
            pending_assignment: None,
        }
    }
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&PlayerCard> {
        self.dragging.as_ref()
    }

    pub fn drop_target(&self) -> Option<FieldPosition> {
        self.drop_target
    }

    pub fn active_position(&self) -> FieldPosition {
        self.active_position
    }

    /// Start dragging a player. When the drag originates from a field slot,
    /// that slot becomes the active position.
    pub fn prepare_drag(&mut self, player: PlayerCard, from: Option<FieldPosition>) {
        self.dragging = Some(player);
        if let Some(pos) = from {
            self.active_position = pos;
        }
    }

    pub fn drag_over(&mut self, position: FieldPosition) {
        self.drop_target = Some(position);
    }

    pub fn drag_leave(&mut self) {
        self.drop_target = None;
    }

    /// Complete a drop on the given slot. A stray drop with no drag in
    /// progress is a no-op. Otherwise drag state is cleared and the intent
    /// is returned for the orchestrator to execute.
    pub fn drop(&mut self, position: FieldPosition) -> Option<DropIntent> {
        let player = self.dragging.take()?;
        self.drop_target = None;
        self.active_position = position;
        Some(DropIntent { player, position })
    }

    /// Reset drag state unconditionally (drag-end, success or failure).
    pub fn clear(&mut self) {
        self.dragging = None;
        self.drop_target = None;
    }

    /// Remember an assignment that must wait for an in-flight save.
    pub fn set_pending_assignment(&mut self, id: PlayerId, position: FieldPosition) {
        self.pending_assignment = Some((id, position));
    }

    /// Take the pending assignment for `id`, if one is waiting.
    pub fn take_pending_assignment(&mut self, id: PlayerId) -> Option<FieldPosition> {
        match self.pending_assignment {
            Some((pending_id, pos)) if pending_id == id => {
                self.pending_assignment = None;
                Some(pos)
            }
            _ => None,
        }
    }

    /// Drop the pending assignment for `id` (the save it waited on failed).
    pub fn cancel_pending_assignment(&mut self, id: PlayerId) {
        if matches!(self.pending_assignment, Some((pending_id, _)) if pending_id == id) {
            self.pending_assignment = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
