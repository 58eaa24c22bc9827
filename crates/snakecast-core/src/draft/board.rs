// Snake-draft board: the static pick order across every round.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DraftError;

/// One drafting participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Draft entry identifier.
    pub id: String,
    /// Owning user identifier.
    pub user_id: String,
    /// Display name of the owning user.
    pub username: String,
    /// Position in the first-round order (1..N), fixed for the draft.
    pub pick_order: u32,
}

/// A single global pick on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Global pick number (1-based, contiguous).
    pub number: u32,
    pub round: u32,
    /// Position within the round (1..N) in traversal order.
    pub round_pick: u32,
    pub entry_id: String,
    pub pick_order: u32,
    /// Global pick number of the same entry's next turn. `None` on the
    /// entry's final slot.
    pub next_pick_number: Option<u32>,
}

impl Slot {
    /// Round-qualified pick label, e.g. `3.07`.
    pub fn label(&self) -> String {
        format!("{}.{:02}", self.round, self.round_pick)
    }
}

/// The full snake pick order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Entries sorted by pick order.
    entries: Vec<Entry>,
    rounds: u32,
    slots: Vec<Slot>,
}

impl Board {
    /// Build the board for `entries` over `rounds` rounds.
    ///
    /// Odd rounds run in ascending pick order, even rounds descending.
    pub fn build(mut entries: Vec<Entry>, rounds: u32) -> Result<Self, DraftError> {
        if rounds < 1 {
            return Err(DraftError::InvalidRoundCount { rounds });
        }
        if entries.is_empty() {
            return Err(DraftError::EmptyEntryList);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.id.as_str())) {
            return Err(DraftError::DuplicateEntry {
                entry_id: dup.id.clone(),
            });
        }

        entries.sort_by_key(|e| e.pick_order);
        if let Some(pair) = entries.windows(2).find(|w| w[0].pick_order == w[1].pick_order) {
            return Err(DraftError::DuplicatePickOrder {
                pick_order: pair[0].pick_order,
            });
        }

        let num_entries = entries.len();
        let mut slots = Vec::with_capacity(num_entries * rounds as usize);
        let mut number = 0u32;
        for round in 1..=rounds {
            let order: Box<dyn Iterator<Item = &Entry>> = if round % 2 == 0 {
                Box::new(entries.iter().rev())
            } else {
                Box::new(entries.iter())
            };
            for (i, entry) in order.enumerate() {
                number += 1;
                slots.push(Slot {
                    number,
                    round,
                    round_pick: i as u32 + 1,
                    entry_id: entry.id.clone(),
                    pick_order: entry.pick_order,
                    next_pick_number: None,
                });
            }
        }

        // Walk backwards so each slot sees the entry's following occurrence.
        let mut following: HashMap<&str, u32> = HashMap::with_capacity(num_entries);
        let mut next_numbers = vec![None; slots.len()];
        for (idx, slot) in slots.iter().enumerate().rev() {
            next_numbers[idx] = following.insert(slot.entry_id.as_str(), slot.number);
        }
        for (slot, next) in slots.iter_mut().zip(next_numbers) {
            slot.next_pick_number = next;
        }

        info!(
            "Built snake board: {} entries x {} rounds = {} picks",
            num_entries,
            rounds,
            slots.len()
        );

        Ok(Board {
            entries,
            rounds,
            slots,
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Look up a slot by global pick number.
    pub fn slot(&self, number: u32) -> Option<&Slot> {
        if number == 0 {
            return None;
        }
        self.slots.get(number as usize - 1)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// All slots owned by `entry_id`, in pick order.
    pub fn slots_for<'a>(&'a self, entry_id: &'a str) -> impl Iterator<Item = &'a Slot> + 'a {
        self.slots.iter().filter(move |s| s.entry_id == entry_id)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn total_picks(&self) -> u32 {
        self.slots.len() as u32
    }
}
