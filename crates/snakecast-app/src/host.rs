// Polling host: drives a DraftSession from external sources and keeps the
// database in step so a restart picks up where it left off.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use snakecast_core::db::Database;
use snakecast_core::session::{DraftSession, RefreshOutcome};
use snakecast_core::sources::{EntrySource, SelectionSource};

/// Key under which the latest candidate table is saved.
const LAST_TABLE_KEY: &str = "last_table";

/// What one polling tick achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Entries are not available yet; the board could not be built.
    Waiting,
    /// Nothing new to show.
    Idle,
    /// A new candidate table is ready.
    Updated,
    /// The draft is complete.
    Finished,
}

pub struct Host {
    session: DraftSession,
    db: Database,
    entries: Box<dyn EntrySource>,
    selections: Box<dyn SelectionSource>,
}

impl Host {
    pub fn new(
        session: DraftSession,
        db: Database,
        entries: Box<dyn EntrySource>,
        selections: Box<dyn SelectionSource>,
    ) -> Self {
        Host {
            session,
            db,
            entries,
            selections,
        }
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    /// Build the board once entries are known, then restore any persisted
    /// selections for this draft.
    fn ensure_initialized(&mut self) -> Result<bool> {
        if self.session.is_initialized() {
            return Ok(true);
        }
        let entries = match self.entries.fetch_entries() {
            Ok(entries) if entries.is_empty() => {
                debug!("No entries yet");
                return Ok(false);
            }
            Ok(entries) => entries,
            Err(e) if e.is_recoverable() => {
                warn!("Entries unavailable: {}", e);
                return Ok(false);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("failed to fetch entries")),
        };
        self.session
            .initialize(entries)
            .context("failed to build draft board")?;
        self.recover()?;
        Ok(true)
    }

    /// Replay selections stored for the configured draft. Returns whether
    /// anything was restored.
    fn recover(&mut self) -> Result<bool> {
        let draft_id = self.session.params().draft_id.clone();
        match self.db.get_draft_id()? {
            Some(stored) if stored == draft_id => {}
            Some(stored) => {
                info!("Database last held draft {}; now tracking {}", stored, draft_id);
            }
            None => info!("Tracking draft {}", draft_id),
        }
        self.db.set_draft_id(&draft_id)?;

        let stored = self.db.load_selections(&draft_id)?;
        if stored.is_empty() {
            info!("Starting fresh draft session");
            return Ok(false);
        }
        self.session
            .restore(&stored)
            .context("crash recovery failed")?;
        info!("Draft state restored from previous session ({} picks)", stored.len());
        Ok(true)
    }

    /// Persist every selection the session knows about. Returns how many
    /// were new to the database.
    fn persist(&self) -> Result<usize> {
        let Some(tracker) = self.session.tracker() else {
            return Ok(0);
        };
        let written = self
            .db
            .record_selections(tracker.selections(), &self.session.params().draft_id)?;
        if written > 0 {
            debug!("Persisted {} new selections", written);
        }
        Ok(written)
    }

    /// Run one polling step.
    pub fn tick(&mut self) -> Result<TickStatus> {
        if !self.ensure_initialized()? {
            return Ok(TickStatus::Waiting);
        }

        let outcome = match self.session.refresh(self.selections.as_mut()) {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable() => {
                warn!("Refresh skipped: {}", e);
                return Ok(TickStatus::Idle);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("refresh failed")),
        };
        self.persist()?;

        match outcome {
            RefreshOutcome::Recomputed { pick_number } => {
                if let Some(table) = self.session.table() {
                    let value = serde_json::to_value(table)
                        .context("failed to serialize candidate table")?;
                    self.db.save_state(LAST_TABLE_KEY, &value)?;
                }
                debug!("Recomputed for pick {}", pick_number);
                Ok(TickStatus::Updated)
            }
            RefreshOutcome::Complete => Ok(TickStatus::Finished),
            RefreshOutcome::Unchanged | RefreshOutcome::NotDrafting => Ok(TickStatus::Idle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakecast_core::config::{DraftParams, DraftStatus, FeatureConfig};
    use snakecast_core::draft::board::Entry;
    use snakecast_core::draft::pick::{Position, Selection};
    use snakecast_core::error::DraftError;
    use snakecast_core::model::{LogisticModel, ModelMetadata};
    use snakecast_core::players::Candidate;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedEntries(Rc<RefCell<Vec<Entry>>>);

    impl EntrySource for SharedEntries {
        fn fetch_entries(&mut self) -> Result<Vec<Entry>, DraftError> {
            Ok(self.0.borrow().clone())
        }
    }

    struct SharedSelections(Rc<RefCell<Vec<Selection>>>);

    impl SelectionSource for SharedSelections {
        fn fetch_selections(&mut self, _draft_id: &str) -> Result<Vec<Selection>, DraftError> {
            let selections = self.0.borrow().clone();
            if selections.is_empty() {
                return Err(DraftError::NoSelectionsYet);
            }
            Ok(selections)
        }
    }

    fn entries() -> Vec<Entry> {
        (1..=3)
            .map(|i| Entry {
                id: format!("e{i}"),
                user_id: format!("u{i}"),
                username: format!("user{i}"),
                pick_order: i,
            })
            .collect()
    }

    fn session() -> DraftSession {
        let params = DraftParams {
            draft_id: "d1".into(),
            observer_entry_id: "e2".into(),
            rounds: 2,
            status: DraftStatus::Drafting,
            slate_id: None,
            scoring_type_id: None,
        };
        let candidates = (1..=10)
            .map(|i| Candidate {
                id: format!("p{i}"),
                name: format!("Player {i}"),
                position: Position::RunningBack,
                team: "SF".into(),
                adp: f64::from(i),
                bye_week: None,
                projected_points: None,
            })
            .collect();
        let model = LogisticModel::new(
            ModelMetadata {
                name: "LogisticRegression".into(),
                data_number: "v01".into(),
                model_number: "v001".into(),
                description: String::new(),
                features: vec!["in_window".into()],
            },
            vec![1.0],
            0.0,
        );
        DraftSession::new(params, FeatureConfig::default(), candidates, Box::new(model))
    }

    type Feeds = (Rc<RefCell<Vec<Entry>>>, Rc<RefCell<Vec<Selection>>>);

    fn host(db: Database) -> (Host, Feeds) {
        let entry_feed = Rc::new(RefCell::new(Vec::new()));
        let selection_feed = Rc::new(RefCell::new(Vec::new()));
        let host = Host::new(
            session(),
            db,
            Box::new(SharedEntries(Rc::clone(&entry_feed))),
            Box::new(SharedSelections(Rc::clone(&selection_feed))),
        );
        (host, (entry_feed, selection_feed))
    }

    // Owners: 1:e1 2:e2 3:e3 4:e3 5:e2 6:e1
    const OWNERS: [&str; 6] = ["e1", "e2", "e3", "e3", "e2", "e1"];

    fn picks(n: usize) -> Vec<Selection> {
        (0..n)
            .map(|i| Selection::new(i as u32 + 1, OWNERS[i], &format!("p{}", i + 1)))
            .collect()
    }

    #[test]
    fn waits_for_entries_then_updates() {
        let (mut host, (entry_feed, selection_feed)) = host(Database::open(":memory:").unwrap());
        assert_eq!(host.tick().unwrap(), TickStatus::Waiting);

        *entry_feed.borrow_mut() = entries();
        assert_eq!(host.tick().unwrap(), TickStatus::Updated);
        assert_eq!(host.tick().unwrap(), TickStatus::Idle);

        *selection_feed.borrow_mut() = picks(2);
        assert_eq!(host.tick().unwrap(), TickStatus::Updated);
        assert_eq!(host.session().table().unwrap().pick_number, 3);
        assert_eq!(host.db.selection_count("d1").unwrap(), 2);
        assert!(host.db.load_state(LAST_TABLE_KEY).unwrap().is_some());

        *selection_feed.borrow_mut() = picks(6);
        assert_eq!(host.tick().unwrap(), TickStatus::Finished);
        assert_eq!(host.db.selection_count("d1").unwrap(), 6);
    }

    #[test]
    fn restart_restores_persisted_selections() {
        let db = Database::open(":memory:").unwrap();
        db.record_selections(&picks(3), "d1").unwrap();

        let (mut host, (entry_feed, _selection_feed)) = host(db);
        *entry_feed.borrow_mut() = entries();
        // The source has not caught up yet; persisted picks still count.
        assert_eq!(host.tick().unwrap(), TickStatus::Updated);
        assert_eq!(host.session().table().unwrap().pick_number, 4);
        assert_eq!(host.db.get_draft_id().unwrap().as_deref(), Some("d1"));
    }

    #[test]
    fn out_of_order_feed_is_skipped_not_fatal() {
        let (mut host, (entry_feed, selection_feed)) = host(Database::open(":memory:").unwrap());
        *entry_feed.borrow_mut() = entries();
        *selection_feed.borrow_mut() = picks(3);
        host.tick().unwrap();

        let mut bad = picks(2);
        bad.push(Selection::new(5, "e2", "p5"));
        bad.push(Selection::new(4, "e3", "p4"));
        *selection_feed.borrow_mut() = bad;
        assert_eq!(host.tick().unwrap(), TickStatus::Idle);
        assert_eq!(host.session().current_pick().unwrap().number(), 4);
    }

    #[test]
    fn late_pick_behind_unfilled_slot_does_not_stall() {
        let (mut host, (entry_feed, selection_feed)) = host(Database::open(":memory:").unwrap());
        *entry_feed.borrow_mut() = entries();
        let mut partial = picks(3);
        partial[1].candidate_id = None;
        *selection_feed.borrow_mut() = partial;
        assert_eq!(host.tick().unwrap(), TickStatus::Updated);
        assert_eq!(host.session().current_pick().unwrap().number(), 2);
        assert_eq!(host.db.selection_count("d1").unwrap(), 1);

        *selection_feed.borrow_mut() = picks(3);
        assert_eq!(host.tick().unwrap(), TickStatus::Updated);
        assert_eq!(host.session().current_pick().unwrap().number(), 4);
        assert_eq!(host.db.selection_count("d1").unwrap(), 3);
    }

    #[test]
    fn unknown_observer_is_fatal() {
        let (mut host, (entry_feed, _)) = host(Database::open(":memory:").unwrap());
        *entry_feed.borrow_mut() = entries()[..1].to_vec();
        assert!(host.tick().is_err());
    }
}
