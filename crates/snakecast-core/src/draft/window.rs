// Observer-relative pick windows over a snake board.
//
// For every slot, the comparison pick is the observer's next turn strictly
// after that slot. When that turn opens a back-to-back pair at a round
// boundary, the comparison moves to the second pick of the pair: the
// observer holds both picks, so only picks made before the pair can take a
// candidate away.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::board::{Board, Entry, Slot};
use crate::error::DraftError;

/// A board slot annotated relative to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowedSlot {
    pub slot: Slot,
    /// The observer's first pick strictly after this slot.
    pub observer_next_pick: Option<u32>,
    /// The pick candidates are judged against, after the turn-pair
    /// correction. `None` once the observer has no turns left.
    pub actual_next_pick_number: Option<u32>,
}

impl WindowedSlot {
    pub fn number(&self) -> u32 {
        self.slot.number
    }

    /// Picks between this slot and the comparison pick.
    pub fn num_picks_away(&self) -> Option<u32> {
        self.actual_next_pick_number.map(|next| next - self.slot.number)
    }
}

/// One of the observer's own turns and the turn after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObserverTurn {
    number: u32,
    next: Option<u32>,
}

impl ObserverTurn {
    /// The pick this turn resolves to when it is the observer's upcoming
    /// turn: itself, or its partner when the two form a turn pair.
    fn comparison_pick(&self) -> u32 {
        match self.next {
            Some(next) if next == self.number + 1 => next,
            _ => self.number,
        }
    }
}

/// A board resolved against one observer entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedBoard {
    board: Board,
    observer: Entry,
    slots: Vec<WindowedSlot>,
}

impl WindowedBoard {
    /// Resolve every slot of `board` relative to `observer_entry_id`.
    pub fn resolve(board: Board, observer_entry_id: &str) -> Result<Self, DraftError> {
        let observer = board
            .entry(observer_entry_id)
            .cloned()
            .ok_or_else(|| DraftError::UnknownEntry {
                entry_id: observer_entry_id.to_string(),
            })?;

        let turns: Vec<ObserverTurn> = board
            .slots_for(&observer.id)
            .map(|slot| ObserverTurn {
                number: slot.number,
                next: slot.next_pick_number,
            })
            .collect();

        let slots = board
            .slots()
            .iter()
            .map(|slot| {
                // First observer turn strictly after this slot.
                let idx = turns.partition_point(|t| t.number <= slot.number);
                let upcoming = turns.get(idx);
                WindowedSlot {
                    slot: slot.clone(),
                    observer_next_pick: upcoming.map(|t| t.number),
                    actual_next_pick_number: upcoming.map(ObserverTurn::comparison_pick),
                }
            })
            .collect::<Vec<_>>();

        info!(
            "Resolved pick windows for observer '{}' (pick order {}, {} turns)",
            observer.username,
            observer.pick_order,
            turns.len()
        );

        Ok(WindowedBoard {
            board,
            observer,
            slots,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn observer(&self) -> &Entry {
        &self.observer
    }

    pub fn slots(&self) -> &[WindowedSlot] {
        &self.slots
    }

    pub fn slot(&self, number: u32) -> Option<&WindowedSlot> {
        if number == 0 {
            return None;
        }
        self.slots.get(number as usize - 1)
    }

    /// The observer's own slots, in pick order.
    pub fn observer_slots(&self) -> impl Iterator<Item = &WindowedSlot> {
        self.slots
            .iter()
            .filter(move |s| s.slot.entry_id == self.observer.id)
    }

    pub fn total_picks(&self) -> u32 {
        self.board.total_picks()
    }
}
