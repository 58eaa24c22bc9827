// Selection records and player positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Football positions a candidate can be drafted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

impl Position {
    /// Parse a position abbreviation. Case-insensitive; accepts the common
    /// aliases platforms use for kickers and team defenses.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" | "HB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DST" | "DEF" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One observed draft event.
///
/// `candidate_id` is `None` while the platform reports the slot as on the
/// clock but not yet filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Global pick number (1-based).
    pub pick_number: u32,
    /// Entry that owns the pick.
    pub entry_id: String,
    /// Identifier of the chosen candidate.
    #[serde(default)]
    pub candidate_id: Option<String>,
}

impl Selection {
    pub fn new(pick_number: u32, entry_id: &str, candidate_id: &str) -> Self {
        Selection {
            pick_number,
            entry_id: entry_id.to_string(),
            candidate_id: Some(candidate_id.to_string()),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.candidate_id.is_some()
    }
}
