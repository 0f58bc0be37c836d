// Player data model: field positions, display cards, saved roster entries,
// derived lineups, and the team weakness vector.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned stable player identifier.
pub type PlayerId = i64;

// ---------------------------------------------------------------------------
// Field positions
// ---------------------------------------------------------------------------

/// The fixed set of field slots a saved player can be assigned to. A player
/// with no assigned slot is on the bench (`Option<FieldPosition>::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPosition {
    #[serde(rename = "P")]
    Pitcher,
    #[serde(rename = "C")]
    Catcher,
    #[serde(rename = "1B")]
    FirstBase,
    #[serde(rename = "2B")]
    SecondBase,
    #[serde(rename = "3B")]
    ThirdBase,
    #[serde(rename = "SS")]
    ShortStop,
    #[serde(rename = "LF")]
    LeftField,
    #[serde(rename = "CF")]
    CenterField,
    #[serde(rename = "RF")]
    RightField,
    #[serde(rename = "DH")]
    DesignatedHitter,
}

impl FieldPosition {
    /// All field slots in display order (infield out to the outfield).
    pub const ALL: [FieldPosition; 10] = [
        FieldPosition::Pitcher,
        FieldPosition::Catcher,
        FieldPosition::FirstBase,
        FieldPosition::SecondBase,
        FieldPosition::ThirdBase,
        FieldPosition::ShortStop,
        FieldPosition::LeftField,
        FieldPosition::CenterField,
        FieldPosition::RightField,
        FieldPosition::DesignatedHitter,
    ];

    /// Parse a position code (e.g. "1B", "ss", "dh") into a FieldPosition.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "P" => Some(FieldPosition::Pitcher),
            "C" => Some(FieldPosition::Catcher),
            "1B" => Some(FieldPosition::FirstBase),
            "2B" => Some(FieldPosition::SecondBase),
            "3B" => Some(FieldPosition::ThirdBase),
            "SS" => Some(FieldPosition::ShortStop),
            "LF" => Some(FieldPosition::LeftField),
            "CF" => Some(FieldPosition::CenterField),
            "RF" => Some(FieldPosition::RightField),
            "DH" => Some(FieldPosition::DesignatedHitter),
            _ => None,
        }
    }

    /// The wire/display code for this position.
    pub fn code(&self) -> &'static str {
        match self {
            FieldPosition::Pitcher => "P",
            FieldPosition::Catcher => "C",
            FieldPosition::FirstBase => "1B",
            FieldPosition::SecondBase => "2B",
            FieldPosition::ThirdBase => "3B",
            FieldPosition::ShortStop => "SS",
            FieldPosition::LeftField => "LF",
            FieldPosition::CenterField => "CF",
            FieldPosition::RightField => "RF",
            FieldPosition::DesignatedHitter => "DH",
        }
    }
}

impl fmt::Display for FieldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Player shapes
// ---------------------------------------------------------------------------

/// The display shape for a player card (search result, recommendation, or
/// saved roster entry rendered outside the field diagram).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCard {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub years_active: Option<String>,
}

/// A player persisted to the user's saved roster. Shares the card shape
/// plus the optional field assignment; `position: None` means bench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub years_active: Option<String>,
    #[serde(default)]
    pub position: Option<FieldPosition>,
}

impl SavedPlayer {
    /// Promote a transient card (search/recommendation result) to a saved
    /// roster entry. New saves always start on the bench.
    pub fn from_card(card: PlayerCard) -> Self {
        SavedPlayer {
            id: card.id,
            name: card.name,
            image_url: card.image_url,
            years_active: card.years_active,
            position: None,
        }
    }

    /// The display-card view of this saved player.
    pub fn card(&self) -> PlayerCard {
        PlayerCard {
            id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            years_active: self.years_active.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lineup (derived, never stored)
// ---------------------------------------------------------------------------

/// A mapping from field slot to at most one player id. Always reconstructed
/// from the saved roster by grouping players on their `position` field, so
/// it can never drift out of sync with the roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    slots: BTreeMap<FieldPosition, PlayerId>,
}

impl Lineup {
    /// Derive a lineup from a roster listing. If the listing violates the
    /// one-player-per-slot invariant (which the gateway should prevent),
    /// the first player encountered for a slot wins.
    pub fn from_players(players: &[SavedPlayer]) -> Self {
        let mut slots = BTreeMap::new();
        for p in players {
            if let Some(pos) = p.position {
                slots.entry(pos).or_insert(p.id);
            }
        }
        Lineup { slots }
    }

    /// The player occupying the given slot, if any.
    pub fn occupant(&self, pos: FieldPosition) -> Option<PlayerId> {
        self.slots.get(&pos).copied()
    }

    /// The slot the given player occupies, if any.
    pub fn position_of(&self, id: PlayerId) -> Option<FieldPosition> {
        self.slots
            .iter()
            .find(|(_, &pid)| pid == id)
            .map(|(&pos, _)| pos)
    }

    /// Number of filled slots.
    pub fn filled_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterate filled slots in display order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldPosition, PlayerId)> + '_ {
        self.slots.iter().map(|(&pos, &id)| (pos, id))
    }
}

// ---------------------------------------------------------------------------
// Weakness vector
// ---------------------------------------------------------------------------

/// Team weakness statistics, each expressed in standard deviations from the
/// league average. The server pre-resolves sign asymmetries so that more
/// negative always means weaker; the client displays values as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaknessVector {
    pub strikeout_rate: f64,
    pub walk_rate: f64,
    pub isolated_power: f64,
    pub on_base_percentage: f64,
    pub base_running: f64,
}

impl WeaknessVector {
    /// Stat labels in radar-chart order, parallel to [`Self::values`].
    pub const STAT_NAMES: [&'static str; 5] = [
        "Strikeout Rate",
        "Walk Rate",
        "Isolated Power",
        "On-Base Percentage",
        "Base Running",
    ];

    /// The five stats in radar-chart order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.strikeout_rate,
            self.walk_rate,
            self.isolated_power,
            self.on_base_percentage,
            self.base_running,
        ]
    }

    /// The label and value of the weakest (most negative) stat.
    pub fn weakest_stat(&self) -> (&'static str, f64) {
        let values = self.values();
        let mut idx = 0;
        for (i, v) in values.iter().enumerate() {
            if *v < values[idx] {
                idx = i;
            }
        }
        (Self::STAT_NAMES[idx], values[idx])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
