// Typed outcomes for board construction, state tracking, and prediction.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DraftError {
    // -- Board construction (fatal to the build call) --
    #[error("round count must be at least 1, got {rounds}")]
    InvalidRoundCount { rounds: u32 },

    #[error("cannot build a draft board without entries")]
    EmptyEntryList,

    #[error("pick order {pick_order} is assigned to more than one entry")]
    DuplicatePickOrder { pick_order: u32 },

    #[error("entry `{entry_id}` appears more than once")]
    DuplicateEntry { entry_id: String },

    #[error("entry `{entry_id}` is not part of this draft")]
    UnknownEntry { entry_id: String },

    // -- Draft progress --
    #[error("draft has not started: no entries have been loaded")]
    DraftNotStarted,

    #[error("draft is complete: all {total_picks} picks have been made")]
    DraftComplete { total_picks: u32 },

    /// The selection source has nothing to report yet. Recoverable: the
    /// board exists, nothing has been drafted.
    #[error("no selections have been made yet")]
    NoSelectionsYet,

    #[error("selection source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    // -- Ingest validation (the ingest call is rejected, state unchanged) --
    #[error("selection for pick {pick_number} arrived after pick {latest_pick}")]
    OutOfOrderSelection { pick_number: u32, latest_pick: u32 },

    #[error("pick {pick_number} is outside the board (1..={total_picks})")]
    UnknownPick { pick_number: u32, total_picks: u32 },

    #[error("pick {pick_number} belongs to entry `{expected}`, selection names `{actual}`")]
    EntryMismatch {
        pick_number: u32,
        expected: String,
        actual: String,
    },

    #[error("pick {pick_number} already holds `{existing}`, refusing `{incoming}`")]
    ConflictingSelection {
        pick_number: u32,
        existing: String,
        incoming: String,
    },

    #[error("candidate `{candidate_id}` was already taken at pick {existing_pick}, refusing it at pick {pick_number}")]
    CandidateAlreadySelected {
        candidate_id: String,
        existing_pick: u32,
        pick_number: u32,
    },

    // -- Prediction (degrades to unknown probabilities) --
    #[error("prediction unavailable: {reason}")]
    PredictionUnavailable { reason: String },
}

impl DraftError {
    /// Whether the host should keep polling after seeing this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DraftError::NoSelectionsYet
                | DraftError::DraftNotStarted
                | DraftError::SourceUnavailable { .. }
                | DraftError::PredictionUnavailable { .. }
                | DraftError::OutOfOrderSelection { .. }
                | DraftError::ConflictingSelection { .. }
                | DraftError::CandidateAlreadySelected { .. }
        )
    }
}
