// Draft session: ties board, state, features, and model together for one
// host. Owned by a single caller; hosts that refresh from several triggers
// must serialize access themselves.

use tracing::{debug, info, warn};

use crate::config::{DraftParams, DraftStatus, FeatureConfig};
use crate::draft::board::{Board, Entry};
use crate::draft::pick::Selection;
use crate::draft::state::{BoardRow, DraftStateTracker, IngestOutcome};
use crate::draft::window::{WindowedBoard, WindowedSlot};
use crate::error::DraftError;
use crate::expand::expand;
use crate::features::FeatureEngine;
use crate::model::{predict_rows, DraftModel};
use crate::players::Candidate;
use crate::results::{assemble, CandidateTable};
use crate::sources::SelectionSource;
use crate::summary::RosterSummary;

/// What a `refresh` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The draft is not in its drafting phase; nothing was fetched.
    NotDrafting,
    /// No new pick landed since the last recomputation.
    Unchanged,
    /// A new candidate table was computed for this pick.
    Recomputed { pick_number: u32 },
    /// Every slot is filled.
    Complete,
}

pub struct DraftSession {
    params: DraftParams,
    engine: FeatureEngine,
    candidates: Vec<Candidate>,
    model: Box<dyn DraftModel>,
    tracker: Option<DraftStateTracker>,
    table: Option<CandidateTable>,
}

impl DraftSession {
    pub fn new(
        params: DraftParams,
        features: FeatureConfig,
        candidates: Vec<Candidate>,
        model: Box<dyn DraftModel>,
    ) -> Self {
        DraftSession {
            params,
            engine: FeatureEngine::new(features),
            candidates,
            model,
            tracker: None,
            table: None,
        }
    }

    pub fn params(&self) -> &DraftParams {
        &self.params
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn tracker(&self) -> Option<&DraftStateTracker> {
        self.tracker.as_ref()
    }

    /// The latest candidate table, if any recomputation has run.
    pub fn table(&self) -> Option<&CandidateTable> {
        self.table.as_ref()
    }

    /// Switch to `params`. A different draft discards the board, the
    /// selections, and the cached table; returns whether that happened.
    pub fn select_draft(&mut self, params: DraftParams) -> bool {
        if params == self.params {
            return false;
        }
        let reset = params.draft_id != self.params.draft_id
            || params.observer_entry_id != self.params.observer_entry_id
            || params.rounds != self.params.rounds;
        if reset {
            info!(
                "Switching from draft {} to {}; discarding state",
                self.params.draft_id, params.draft_id
            );
            self.tracker = None;
            self.table = None;
        } else {
            debug!("Draft {} status is now {:?}", params.draft_id, params.status);
        }
        self.params = params;
        reset
    }

    /// Build the board for `entries` and start tracking.
    pub fn initialize(&mut self, entries: Vec<Entry>) -> Result<(), DraftError> {
        let board = Board::build(entries, self.params.rounds)?;
        let windowed = WindowedBoard::resolve(board, &self.params.observer_entry_id)?;
        info!(
            "Draft {} initialized: observer picks at {:?}",
            self.params.draft_id,
            windowed
                .observer_slots()
                .map(WindowedSlot::number)
                .collect::<Vec<_>>()
        );
        self.tracker = Some(DraftStateTracker::new(windowed));
        self.table = None;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn current_pick(&self) -> Result<&WindowedSlot, DraftError> {
        self.tracker
            .as_ref()
            .ok_or(DraftError::DraftNotStarted)?
            .current_pick()
    }

    /// Replay persisted selections after a restart.
    pub fn restore(&mut self, selections: &[Selection]) -> Result<IngestOutcome, DraftError> {
        let tracker = self.tracker.as_mut().ok_or(DraftError::DraftNotStarted)?;
        let outcome = tracker.restore(selections)?;
        self.table = None;
        info!(
            "Restored {} selections for draft {}",
            outcome.added, self.params.draft_id
        );
        Ok(outcome)
    }

    /// Pull selections from `source`, ingest them, and recompute the
    /// candidate table if the current pick moved.
    pub fn refresh(&mut self, source: &mut dyn SelectionSource) -> Result<RefreshOutcome, DraftError> {
        if self.params.status != DraftStatus::Drafting {
            debug!("Draft {} is {:?}; skipping refresh", self.params.draft_id, self.params.status);
            return Ok(RefreshOutcome::NotDrafting);
        }
        let tracker = self.tracker.as_mut().ok_or(DraftError::DraftNotStarted)?;

        let selections = match source.fetch_selections(&self.params.draft_id) {
            Ok(selections) => selections,
            Err(DraftError::NoSelectionsYet) => {
                debug!("No selections yet for draft {}", self.params.draft_id);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        tracker.ingest(&selections)?;

        if tracker.is_complete() {
            info!("Draft {} complete", self.params.draft_id);
            return Ok(RefreshOutcome::Complete);
        }
        if !tracker.needs_recompute() {
            return Ok(RefreshOutcome::Unchanged);
        }

        let pick_number = self.recompute()?;
        Ok(RefreshOutcome::Recomputed { pick_number })
    }

    /// Run expansion, features, and prediction for the current pick.
    /// Prediction failures degrade to a table without probabilities.
    pub fn recompute(&mut self) -> Result<u32, DraftError> {
        let tracker = self.tracker.as_ref().ok_or(DraftError::DraftNotStarted)?;
        let expansion = expand(&self.params.draft_id, tracker, &self.candidates)?;
        let matrix = self.engine.compute(&expansion);
        let predictions = predict_rows(self.model.as_ref(), &matrix);
        if let Err(e) = &predictions {
            warn!("Pick {}: {}", expansion.context.pick_number, e);
        }
        let table = assemble(
            &expansion,
            &matrix,
            predictions,
            Some(self.model.metadata().version_name()),
        );
        let pick_number = table.pick_number;

        self.table = Some(table);
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.mark_recomputed(pick_number);
        }
        Ok(pick_number)
    }

    /// The observer's roster so far.
    pub fn observer_roster(&self) -> Result<RosterSummary, DraftError> {
        let tracker = self.tracker.as_ref().ok_or(DraftError::DraftNotStarted)?;
        Ok(RosterSummary::for_entry(
            tracker,
            &self.candidates,
            &self.params.observer_entry_id,
        ))
    }

    /// Every slot with its selection, for the end-of-draft report.
    pub fn final_board(&self) -> Result<Vec<BoardRow>, DraftError> {
        self.tracker
            .as_ref()
            .map(DraftStateTracker::board_rows)
            .ok_or(DraftError::DraftNotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::board::tests::entries;
    use crate::expand::tests::pool;
    use crate::model::tests::{metadata, BrokenModel};
    use crate::model::LogisticModel;

    /// Hands out a growing prefix of a fixed selection list.
    struct Replay {
        all: Vec<Selection>,
        visible: usize,
        fetches: usize,
    }

    impl SelectionSource for Replay {
        fn fetch_selections(&mut self, _draft_id: &str) -> Result<Vec<Selection>, DraftError> {
            self.fetches += 1;
            if self.visible == 0 {
                return Err(DraftError::NoSelectionsYet);
            }
            Ok(self.all[..self.visible].to_vec())
        }
    }

    const OWNERS: [&str; 8] = ["e1", "e2", "e3", "e4", "e4", "e3", "e2", "e1"];

    fn replay() -> Replay {
        Replay {
            all: OWNERS
                .iter()
                .enumerate()
                .map(|(i, e)| Selection::new(i as u32 + 1, e, &format!("p{}", i + 1)))
                .collect(),
            visible: 0,
            fetches: 0,
        }
    }

    fn params() -> DraftParams {
        DraftParams {
            draft_id: "d1".into(),
            observer_entry_id: "e1".into(),
            rounds: 2,
            status: DraftStatus::Drafting,
            slate_id: None,
            scoring_type_id: None,
        }
    }

    fn session() -> DraftSession {
        let model = LogisticModel::new(
            metadata(&["in_window", "rank_window_diff"]),
            vec![2.0, -0.2],
            0.0,
        );
        DraftSession::new(params(), FeatureConfig::default(), pool(20), Box::new(model))
    }

    #[test]
    fn current_pick_before_initialize_is_not_started() {
        let s = session();
        assert_eq!(s.current_pick().unwrap_err(), DraftError::DraftNotStarted);
        let mut source = replay();
        let mut s = session();
        assert_eq!(
            s.refresh(&mut source).unwrap_err(),
            DraftError::DraftNotStarted
        );
    }

    #[test]
    fn refresh_before_first_pick_computes_for_pick_one() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();

        assert_eq!(
            s.refresh(&mut source).unwrap(),
            RefreshOutcome::Recomputed { pick_number: 1 }
        );
        let table = s.table().unwrap();
        assert_eq!(table.rows.len(), 20);
        assert_eq!(table.observer_next_pick, Some(8));
        assert_eq!(table.model_version.as_deref(), Some("LogisticRegression_v01_v001"));

        assert_eq!(s.refresh(&mut source).unwrap(), RefreshOutcome::Unchanged);
    }

    #[test]
    fn recomputes_once_per_new_pick() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        s.refresh(&mut source).unwrap();

        source.visible = 2;
        assert_eq!(
            s.refresh(&mut source).unwrap(),
            RefreshOutcome::Recomputed { pick_number: 3 }
        );
        let computed_at = s.table().unwrap().computed_at;
        assert_eq!(s.table().unwrap().rows.len(), 18);

        assert_eq!(s.refresh(&mut source).unwrap(), RefreshOutcome::Unchanged);
        assert_eq!(s.table().unwrap().computed_at, computed_at);
    }

    #[test]
    fn complete_draft_stops_recomputing() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        source.visible = 8;
        assert_eq!(s.refresh(&mut source).unwrap(), RefreshOutcome::Complete);
        assert_eq!(
            s.current_pick().unwrap_err(),
            DraftError::DraftComplete { total_picks: 8 }
        );
        let board = s.final_board().unwrap();
        assert_eq!(board[7].candidate_id.as_deref(), Some("p8"));
    }

    #[test]
    fn after_observers_last_turn_rows_are_dropped() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        // Pick 8 is the observer's last; nothing to compare against.
        source.visible = 7;
        assert_eq!(
            s.refresh(&mut source).unwrap(),
            RefreshOutcome::Recomputed { pick_number: 8 }
        );
        let table = s.table().unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.observer_next_pick, None);
    }

    #[test]
    fn not_drafting_skips_fetch() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut p = params();
        p.status = DraftStatus::Filling;
        assert!(!s.select_draft(p));
        let mut source = replay();
        assert_eq!(s.refresh(&mut source).unwrap(), RefreshOutcome::NotDrafting);
        assert_eq!(source.fetches, 0);
        assert!(s.is_initialized());
    }

    #[test]
    fn selecting_a_new_draft_resets_state() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        s.refresh(&mut source).unwrap();
        assert!(s.table().is_some());

        assert!(!s.select_draft(params()));
        assert!(s.table().is_some());

        let mut other = params();
        other.draft_id = "d2".into();
        assert!(s.select_draft(other));
        assert!(!s.is_initialized());
        assert!(s.table().is_none());
    }

    #[test]
    fn out_of_order_refresh_leaves_state_unchanged() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        source.visible = 3;
        s.refresh(&mut source).unwrap();

        let mut bad = Replay {
            all: vec![Selection::new(2, "e2", "p2"), Selection::new(5, "e4", "p5"), Selection::new(4, "e4", "p4")],
            visible: 3,
            fetches: 0,
        };
        assert!(matches!(
            s.refresh(&mut bad),
            Err(DraftError::OutOfOrderSelection { pick_number: 4, .. })
        ));
        assert_eq!(s.current_pick().unwrap().number(), 4);
    }

    #[test]
    fn broken_model_still_produces_table() {
        let mut s = DraftSession::new(
            params(),
            FeatureConfig::default(),
            pool(6),
            Box::new(BrokenModel(metadata(&["in_window"]))),
        );
        s.initialize(entries(4)).unwrap();
        let mut source = replay();
        assert_eq!(
            s.refresh(&mut source).unwrap(),
            RefreshOutcome::Recomputed { pick_number: 1 }
        );
        let table = s.table().unwrap();
        assert!(table.is_degraded());
        assert_eq!(table.rows.len(), 6);
    }

    #[test]
    fn restore_then_refresh_continues() {
        let mut s = session();
        s.initialize(entries(4)).unwrap();
        let history = replay().all[..4].to_vec();
        s.restore(&history).unwrap();
        assert_eq!(s.current_pick().unwrap().number(), 5);

        let mut source = replay();
        source.visible = 4;
        assert_eq!(
            s.refresh(&mut source).unwrap(),
            RefreshOutcome::Recomputed { pick_number: 5 }
        );
        let roster = s.observer_roster().unwrap();
        assert_eq!(roster.total(), 1);
    }

    #[test]
    fn unknown_observer_fails_initialize() {
        let mut p = params();
        p.observer_entry_id = "e9".into();
        let mut s = session();
        s.select_draft(p);
        assert!(matches!(
            s.initialize(entries(4)),
            Err(DraftError::UnknownEntry { .. })
        ));
        assert!(!s.is_initialized());
    }
}
