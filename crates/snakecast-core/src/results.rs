// Ranked candidate table: predictions merged back onto candidates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::draft::pick::Position;
use crate::error::DraftError;
use crate::expand::Expansion;
use crate::features::FeatureMatrix;
use crate::summary::RosterSummary;

/// One displayable row of the availability table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub adp: f64,
    pub bye_week: Option<u32>,
    pub current_rank: u32,
    pub picks_between: Option<u32>,
    pub rank_window_diff: Option<i64>,
    pub in_window: Option<bool>,
    /// Chance the candidate is gone before the observer's comparison pick,
    /// rounded to two decimals. `None` when unknown.
    pub probability: Option<f64>,
}

/// The result of one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTable {
    pub draft_id: String,
    pub pick_number: u32,
    pub pick_label: String,
    /// Entry on the clock.
    pub entry_id: String,
    pub observer_next_pick: Option<u32>,
    pub model_version: Option<String>,
    pub computed_at: DateTime<Utc>,
    /// Why probabilities are missing, if the model could not score.
    pub prediction_error: Option<String>,
    pub rows: Vec<RankedCandidate>,
}

fn round2(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

/// Merge `predictions` onto the candidates of `matrix` by row id.
///
/// On a prediction failure the table is still built, with every
/// probability unknown and the error recorded.
pub fn assemble(
    expansion: &Expansion<'_>,
    matrix: &FeatureMatrix,
    predictions: Result<Vec<Option<f64>>, DraftError>,
    model_version: Option<String>,
) -> CandidateTable {
    let (by_row, prediction_error): (HashMap<usize, Option<f64>>, Option<String>) =
        match predictions {
            Ok(probs) => (
                matrix
                    .rows
                    .iter()
                    .map(|r| r.row_id)
                    .zip(probs)
                    .collect(),
                None,
            ),
            Err(e) => (HashMap::new(), Some(e.to_string())),
        };

    let mut rows: Vec<RankedCandidate> = matrix
        .rows
        .iter()
        .filter_map(|feature| {
            let candidate = expansion.row(feature.row_id)?.candidate;
            Some(RankedCandidate {
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                position: candidate.position,
                team: candidate.team.clone(),
                adp: candidate.adp,
                bye_week: candidate.bye_week,
                current_rank: feature.current_rank,
                picks_between: feature.picks_between,
                rank_window_diff: feature.rank_window_diff,
                in_window: feature.in_window,
                probability: by_row.get(&feature.row_id).copied().flatten().map(round2),
            })
        })
        .collect();

    rows.sort_by(|a, b| match (a.probability, b.probability) {
        (Some(pa), Some(pb)) => pb.total_cmp(&pa).then(a.current_rank.cmp(&b.current_rank)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.current_rank.cmp(&b.current_rank),
    });

    let context = &matrix.context;
    info!(
        "Candidate table for pick {} ({}): {} rows{}",
        context.pick_label,
        context.pick_number,
        rows.len(),
        if prediction_error.is_some() {
            ", predictions unavailable"
        } else {
            ""
        }
    );

    CandidateTable {
        draft_id: context.draft_id.clone(),
        pick_number: context.pick_number,
        pick_label: context.pick_label.clone(),
        entry_id: context.entry_id.clone(),
        observer_next_pick: context.actual_next_pick_number,
        model_version,
        computed_at: Utc::now(),
        prediction_error,
        rows,
    }
}

impl CandidateTable {
    pub fn top(&self, n: usize) -> &[RankedCandidate] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn is_degraded(&self) -> bool {
        self.prediction_error.is_some()
    }

    /// Rows passing `filter`, in table order. `roster` is the observer's,
    /// used for stack filtering.
    pub fn filtered<'a>(
        &'a self,
        filter: &'a CandidateFilter,
        roster: &'a RosterSummary,
    ) -> impl Iterator<Item = &'a RankedCandidate> + 'a {
        self.rows.iter().filter(move |row| filter.matches(row, roster))
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Display filter over the candidate table. Empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub position: Option<Position>,
    pub team: Option<String>,
    /// Keep only candidates from teams the observer already rosters.
    pub stack_only: bool,
}

impl CandidateFilter {
    pub fn matches(&self, row: &RankedCandidate, roster: &RosterSummary) -> bool {
        if self.position.is_some_and(|p| p != row.position) {
            return false;
        }
        if let Some(team) = &self.team {
            if !team.eq_ignore_ascii_case(&row.team) {
                return false;
            }
        }
        !self.stack_only || roster.has_team(&row.team)
    }
}
