// Per-entry roster counts for display and stack filtering.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::draft::pick::Position;
use crate::draft::state::DraftStateTracker;
use crate::players::Candidate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterSummary {
    pub entry_id: String,
    pub by_position: BTreeMap<Position, usize>,
    /// Team -> position -> count.
    pub by_team: BTreeMap<String, BTreeMap<Position, usize>>,
    /// Selections whose candidate is not in the pool.
    pub unmatched: usize,
}

impl RosterSummary {
    /// Count the selections `entry_id` has made so far.
    pub fn for_entry(tracker: &DraftStateTracker, candidates: &[Candidate], entry_id: &str) -> Self {
        let lookup: HashMap<&str, &Candidate> =
            candidates.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut summary = RosterSummary {
            entry_id: entry_id.to_string(),
            ..RosterSummary::default()
        };
        for sel in tracker.selections().filter(|s| s.entry_id == entry_id) {
            let Some(candidate) = sel.candidate_id.as_deref().and_then(|id| lookup.get(id)) else {
                summary.unmatched += 1;
                continue;
            };
            *summary.by_position.entry(candidate.position).or_default() += 1;
            *summary
                .by_team
                .entry(candidate.team.clone())
                .or_default()
                .entry(candidate.position)
                .or_default() += 1;
        }
        summary
    }

    pub fn count(&self, position: Position) -> usize {
        self.by_position.get(&position).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_position.values().sum::<usize>() + self.unmatched
    }

    /// Teams the entry already rosters at least one player from.
    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.by_team.keys().map(String::as_str)
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.by_team.contains_key(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::board::tests::entries;
    use crate::draft::board::Board;
    use crate::draft::pick::Selection;
    use crate::draft::window::WindowedBoard;
    use crate::expand::tests::pool;

    #[test]
    fn counts_by_position_and_team() {
        // pool: even ids are RB, odd WR; multiples of 3 are KC, else DAL.
        let candidates = pool(10);
        let board = Board::build(entries(4), 3).unwrap();
        let mut t = DraftStateTracker::new(WindowedBoard::resolve(board, "e1").unwrap());
        // e1 drafts at 1, 8, 9.
        t.ingest(&[
            Selection::new(1, "e1", "p3"),
            Selection::new(2, "e2", "p1"),
            Selection::new(3, "e3", "p2"),
            Selection::new(4, "e4", "p4"),
            Selection::new(5, "e4", "p5"),
            Selection::new(6, "e3", "p7"),
            Selection::new(7, "e2", "p8"),
            Selection::new(8, "e1", "p6"),
            Selection::new(9, "e1", "ghost"),
        ])
        .unwrap();

        let summary = RosterSummary::for_entry(&t, &candidates, "e1");
        assert_eq!(summary.count(Position::WideReceiver), 1);
        assert_eq!(summary.count(Position::RunningBack), 1);
        assert_eq!(summary.count(Position::TightEnd), 0);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.teams().collect::<Vec<_>>(), vec!["KC"]);
        assert_eq!(summary.by_team["KC"][&Position::RunningBack], 1);
        assert!(!summary.has_team("DAL"));
    }

    #[test]
    fn empty_for_entry_without_picks() {
        let board = Board::build(entries(2), 2).unwrap();
        let t = DraftStateTracker::new(WindowedBoard::resolve(board, "e1").unwrap());
        let summary = RosterSummary::for_entry(&t, &pool(3), "e2");
        assert_eq!(summary.total(), 0);
        assert_eq!(summary.teams().count(), 0);
    }
}
