// Candidate expansion: one row per still-available candidate, joined with
// the context of the pick currently on the clock.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::draft::state::DraftStateTracker;
use crate::draft::window::WindowedSlot;
use crate::error::DraftError;
use crate::players::Candidate;

/// Everything about the pick on the clock that each candidate row carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickContext {
    pub draft_id: String,
    /// Entry currently on the clock.
    pub entry_id: String,
    pub username: String,
    pub round: u32,
    pub pick_number: u32,
    /// Label of the current pick, e.g. `3.07`.
    pub pick_label: String,
    /// The observer pick candidates are judged against.
    pub actual_next_pick_number: Option<u32>,
}

impl PickContext {
    pub fn from_slot(draft_id: &str, username: &str, slot: &WindowedSlot) -> Self {
        PickContext {
            draft_id: draft_id.to_string(),
            entry_id: slot.slot.entry_id.clone(),
            username: username.to_string(),
            round: slot.slot.round,
            pick_number: slot.slot.number,
            pick_label: slot.slot.label(),
            actual_next_pick_number: slot.actual_next_pick_number,
        }
    }
}

/// A single available candidate. `row_id` identifies the row through
/// feature computation and prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow<'a> {
    pub row_id: usize,
    pub candidate: &'a Candidate,
}

/// The cross join of one pick context against every available candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion<'a> {
    pub context: PickContext,
    pub rows: Vec<CandidateRow<'a>>,
}

impl<'a> Expansion<'a> {
    pub fn row(&self, row_id: usize) -> Option<&CandidateRow<'a>> {
        self.rows.get(row_id).filter(|r| r.row_id == row_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pair `context` with every candidate not in `selected`. Rows keep the
/// order of `candidates` and are numbered from zero.
pub fn expand_available<'a>(
    context: PickContext,
    candidates: &'a [Candidate],
    selected: &HashSet<&str>,
) -> Expansion<'a> {
    let rows: Vec<CandidateRow<'a>> = candidates
        .iter()
        .filter(|c| !selected.contains(c.id.as_str()))
        .enumerate()
        .map(|(row_id, candidate)| CandidateRow { row_id, candidate })
        .collect();

    debug!(
        "Expanded {} of {} candidates for pick {}",
        rows.len(),
        candidates.len(),
        context.pick_number
    );

    Expansion { context, rows }
}

/// Expand the candidate pool against the tracker's current pick.
///
/// Fails with `DraftComplete` once every slot is filled.
pub fn expand<'a>(
    draft_id: &str,
    tracker: &DraftStateTracker,
    candidates: &'a [Candidate],
) -> Result<Expansion<'a>, DraftError> {
    let slot = tracker.current_pick()?;
    let username = tracker
        .board()
        .board()
        .entry(&slot.slot.entry_id)
        .map(|e| e.username.as_str())
        .unwrap_or_default();
    let context = PickContext::from_slot(draft_id, username, slot);
    Ok(expand_available(
        context,
        candidates,
        &tracker.selected_candidate_ids(),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::draft::board::tests::entries;
    use crate::draft::board::Board;
    use crate::draft::pick::{Position, Selection};
    use crate::draft::window::WindowedBoard;

    /// `n` candidates `p1..pN` with ADP 1..N.
    pub(crate) fn pool(n: usize) -> Vec<Candidate> {
        (1..=n)
            .map(|i| Candidate {
                id: format!("p{i}"),
                name: format!("Player {i}"),
                position: if i % 2 == 0 {
                    Position::RunningBack
                } else {
                    Position::WideReceiver
                },
                team: if i % 3 == 0 { "KC".into() } else { "DAL".into() },
                adp: i as f64,
                bye_week: Some(7),
                projected_points: None,
            })
            .collect()
    }

    fn tracker() -> DraftStateTracker {
        let board = Board::build(entries(4), 2).unwrap();
        DraftStateTracker::new(WindowedBoard::resolve(board, "e1").unwrap())
    }

    #[test]
    fn row_count_excludes_selected_candidates() {
        let candidates = pool(20);
        let mut t = tracker();
        t.ingest(&[
            Selection::new(1, "e1", "p3"),
            Selection::new(2, "e2", "p1"),
            Selection::new(3, "e3", "p9"),
        ])
        .unwrap();

        let expansion = expand("d1", &t, &candidates).unwrap();
        assert_eq!(expansion.len(), candidates.len() - t.selection_count());
        assert!(expansion
            .rows
            .iter()
            .all(|r| !["p1", "p3", "p9"].contains(&r.candidate.id.as_str())));
    }

    #[test]
    fn reused_candidate_cannot_shrink_row_count() {
        let candidates = pool(10);
        let mut t = tracker();
        t.ingest(&[Selection::new(1, "e1", "p1")]).unwrap();
        assert!(matches!(
            t.ingest(&[Selection::new(2, "e2", "p1")]),
            Err(DraftError::CandidateAlreadySelected { .. })
        ));

        let expansion = expand("d1", &t, &candidates).unwrap();
        assert_eq!(expansion.len(), candidates.len() - t.selection_count());
        assert_eq!(expansion.context.pick_number, 2);
    }

    #[test]
    fn row_count_holds_for_any_selected_subset() {
        let candidates = pool(12);
        let context = PickContext {
            draft_id: "d1".into(),
            entry_id: "e1".into(),
            username: "user1".into(),
            round: 1,
            pick_number: 1,
            pick_label: "1.01".into(),
            actual_next_pick_number: Some(8),
        };
        for mask in [0u32, 0b1, 0b1010_1010, 0xFFF] {
            let selected: HashSet<&str> = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| c.id.as_str())
                .collect();
            let expansion = expand_available(context.clone(), &candidates, &selected);
            assert_eq!(expansion.len(), candidates.len() - selected.len());
        }
    }

    #[test]
    fn rows_carry_current_pick_context() {
        let candidates = pool(5);
        let mut t = tracker();
        t.ingest(&[Selection::new(1, "e1", "p1"), Selection::new(2, "e2", "p2")])
            .unwrap();

        let expansion = expand("d1", &t, &candidates).unwrap();
        let ctx = &expansion.context;
        assert_eq!(ctx.pick_number, 3);
        assert_eq!(ctx.entry_id, "e3");
        assert_eq!(ctx.username, "user3");
        assert_eq!(ctx.round, 1);
        assert_eq!(ctx.pick_label, "1.03");
        assert_eq!(ctx.actual_next_pick_number, Some(8));
    }

    #[test]
    fn row_ids_are_contiguous_and_ordered() {
        let candidates = pool(6);
        let mut t = tracker();
        t.ingest(&[Selection::new(1, "e1", "p2")]).unwrap();
        let expansion = expand("d1", &t, &candidates).unwrap();
        let ids: Vec<usize> = expansion.rows.iter().map(|r| r.row_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(expansion.row(1).unwrap().candidate.id, "p3");
        assert!(expansion.row(5).is_none());
    }

    #[test]
    fn complete_draft_cannot_expand() {
        let candidates = pool(10);
        let mut t = tracker();
        let owners = ["e1", "e2", "e3", "e4", "e4", "e3", "e2", "e1"];
        let all: Vec<Selection> = owners
            .iter()
            .enumerate()
            .map(|(i, e)| Selection::new(i as u32 + 1, e, &format!("p{}", i + 1)))
            .collect();
        t.ingest(&all).unwrap();
        assert_eq!(
            expand("d1", &t, &candidates).unwrap_err(),
            DraftError::DraftComplete { total_picks: 8 }
        );
    }
}
