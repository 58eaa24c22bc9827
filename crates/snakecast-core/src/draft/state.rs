// Draft state: the windowed board, selections made so far, and the
// recompute guard.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pick::Selection;
use super::window::{WindowedBoard, WindowedSlot};
use crate::error::DraftError;

/// Summary of what one `ingest` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Selections newly recorded.
    pub added: usize,
    /// Selections already known (repeated delivery).
    pub repeated: usize,
    /// Slots reported without a candidate yet.
    pub unfilled: usize,
    /// Selections held back because an earlier slot is still unfilled.
    pub deferred: usize,
}

/// One board slot together with the selection made at it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRow {
    pub slot: WindowedSlot,
    pub candidate_id: Option<String>,
}

/// Host-owned state of a single draft.
///
/// Selections only ever grow. The tracker is not shared: callers that need
/// concurrent access must serialize it themselves.
#[derive(Debug, Clone)]
pub struct DraftStateTracker {
    board: WindowedBoard,
    /// Filled selections keyed by global pick number.
    selections: BTreeMap<u32, Selection>,
    /// Pick number the last downstream recomputation ran for.
    last_recomputed: Option<u32>,
}

impl DraftStateTracker {
    pub fn new(board: WindowedBoard) -> Self {
        DraftStateTracker {
            board,
            selections: BTreeMap::new(),
            last_recomputed: None,
        }
    }

    pub fn board(&self) -> &WindowedBoard {
        &self.board
    }

    /// Merge newly observed selections.
    ///
    /// The whole batch is validated before anything is recorded, so a
    /// rejected call leaves the state untouched. Re-delivering a known
    /// selection is a no-op. New selections must arrive in pick order and
    /// may not reuse a candidate taken at another pick.
    ///
    /// A new selection is only recorded when every earlier slot is filled.
    /// Picks reported past an unfilled slot are counted as deferred and
    /// picked up by a later call once the gap is filled.
    pub fn ingest(&mut self, selections: &[Selection]) -> Result<IngestOutcome, DraftError> {
        let mut outcome = IngestOutcome::default();
        let mut accepted: Vec<&Selection> = Vec::new();
        let mut latest = self.latest_pick_number();
        let mut next_open = self.next_open_pick();
        let mut batch_candidates: HashMap<&str, u32> = HashMap::new();

        for sel in selections {
            let Some(candidate_id) = sel.candidate_id.as_deref() else {
                outcome.unfilled += 1;
                continue;
            };
            self.validate_slot(sel)?;

            let known = self
                .selections
                .get(&sel.pick_number)
                .or_else(|| accepted.iter().rev().copied().find(|a| a.pick_number == sel.pick_number));
            if let Some(existing) = known {
                let existing_id = existing.candidate_id.as_deref().unwrap_or_default();
                if existing_id != candidate_id {
                    return Err(DraftError::ConflictingSelection {
                        pick_number: sel.pick_number,
                        existing: existing_id.to_string(),
                        incoming: candidate_id.to_string(),
                    });
                }
                outcome.repeated += 1;
                continue;
            }

            if let Some(latest_pick) = latest {
                if sel.pick_number < latest_pick {
                    return Err(DraftError::OutOfOrderSelection {
                        pick_number: sel.pick_number,
                        latest_pick,
                    });
                }
            }
            latest = Some(sel.pick_number);

            let taken_at = self
                .pick_holding(candidate_id)
                .or_else(|| batch_candidates.get(candidate_id).copied());
            if let Some(existing_pick) = taken_at {
                return Err(DraftError::CandidateAlreadySelected {
                    candidate_id: candidate_id.to_string(),
                    existing_pick,
                    pick_number: sel.pick_number,
                });
            }
            batch_candidates.insert(candidate_id, sel.pick_number);

            if sel.pick_number == next_open {
                accepted.push(sel);
                next_open += 1;
            } else {
                outcome.deferred += 1;
            }
        }

        outcome.added = accepted.len();
        for sel in accepted {
            self.selections.insert(sel.pick_number, sel.clone());
        }

        if outcome.added > 0 {
            info!(
                "Ingested {} new selections ({} repeated, {} unfilled); {} of {} picks made",
                outcome.added,
                outcome.repeated,
                outcome.unfilled,
                self.selections.len(),
                self.board.total_picks()
            );
        } else {
            debug!("Ingest found no new selections ({} repeated)", outcome.repeated);
        }
        if outcome.deferred > 0 {
            debug!(
                "Deferred {} selections reported past unfilled pick {}",
                outcome.deferred, next_open
            );
        }

        Ok(outcome)
    }

    /// Reset and replay a persisted selection history.
    pub fn restore(&mut self, selections: &[Selection]) -> Result<IngestOutcome, DraftError> {
        let mut sorted = selections.to_vec();
        sorted.sort_by_key(|s| s.pick_number);

        let previous = std::mem::take(&mut self.selections);
        let previous_recomputed = self.last_recomputed.take();
        match self.ingest(&sorted) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.selections = previous;
                self.last_recomputed = previous_recomputed;
                Err(e)
            }
        }
    }

    /// The lowest-numbered slot without a selection.
    pub fn current_pick(&self) -> Result<&WindowedSlot, DraftError> {
        self.board
            .slots()
            .iter()
            .find(|s| !self.selections.contains_key(&s.number()))
            .ok_or(DraftError::DraftComplete {
                total_picks: self.board.total_picks(),
            })
    }

    /// Whether the current pick has moved since the last recomputation (or
    /// none has happened yet). Always false once the draft is complete.
    pub fn needs_recompute(&self) -> bool {
        match self.current_pick() {
            Ok(slot) => self.last_recomputed != Some(slot.number()),
            Err(_) => false,
        }
    }

    /// Record that downstream recomputation ran for `pick_number`.
    pub fn mark_recomputed(&mut self, pick_number: u32) {
        self.last_recomputed = Some(pick_number);
    }

    pub fn last_recomputed(&self) -> Option<u32> {
        self.last_recomputed
    }

    pub fn is_complete(&self) -> bool {
        self.selections.len() as u32 >= self.board.total_picks()
    }

    /// Recorded selections in pick order.
    pub fn selections(&self) -> impl Iterator<Item = &Selection> {
        self.selections.values()
    }

    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// Identifiers of every candidate already taken.
    pub fn selected_candidate_ids(&self) -> HashSet<&str> {
        self.selections
            .values()
            .filter_map(|s| s.candidate_id.as_deref())
            .collect()
    }

    /// Every slot with its selection, for reporting the board.
    pub fn board_rows(&self) -> Vec<BoardRow> {
        self.board
            .slots()
            .iter()
            .map(|slot| BoardRow {
                slot: slot.clone(),
                candidate_id: self
                    .selections
                    .get(&slot.number())
                    .and_then(|s| s.candidate_id.clone()),
            })
            .collect()
    }

    fn latest_pick_number(&self) -> Option<u32> {
        self.selections.keys().next_back().copied()
    }

    /// Number of the first unfilled slot, or one past the board when full.
    fn next_open_pick(&self) -> u32 {
        self.current_pick()
            .map(WindowedSlot::number)
            .unwrap_or_else(|_| self.board.total_picks() + 1)
    }

    fn pick_holding(&self, candidate_id: &str) -> Option<u32> {
        self.selections
            .values()
            .find(|s| s.candidate_id.as_deref() == Some(candidate_id))
            .map(|s| s.pick_number)
    }

    fn validate_slot(&self, sel: &Selection) -> Result<(), DraftError> {
        let slot = self
            .board
            .slot(sel.pick_number)
            .ok_or(DraftError::UnknownPick {
                pick_number: sel.pick_number,
                total_picks: self.board.total_picks(),
            })?;
        if slot.slot.entry_id != sel.entry_id {
            return Err(DraftError::EntryMismatch {
                pick_number: sel.pick_number,
                expected: slot.slot.entry_id.clone(),
                actual: sel.entry_id.clone(),
            });
        }
        Ok(())
    }
}
