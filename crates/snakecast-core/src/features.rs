// Feature engineering for availability prediction.
//
// Turns an expansion into a fixed, named feature matrix:
// - rank signals (current rank, picks until the observer's turn, their
//   difference, and the in-window indicator)
// - draft-stage signals (one indicator per round, coarse round buckets)
// - interactions of the window signals with each round indicator
//
// Column order depends only on the FeatureConfig, so two matrices built with
// the same config always line up.

use serde::Serialize;
use tracing::debug;

use crate::config::{FeatureConfig, MissingWindowPolicy};
use crate::error::DraftError;
use crate::expand::{Expansion, PickContext};

pub const CURRENT_RANK: &str = "current_rank";
pub const PICKS_BETWEEN: &str = "picks_between";
pub const RANK_WINDOW_DIFF: &str = "rank_window_diff";
pub const IN_WINDOW: &str = "in_window";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Ordered column names of the feature matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
    max_round: u32,
    bucket_size: u32,
}

impl FeatureSchema {
    pub fn new(config: &FeatureConfig) -> Self {
        let max_round = config.max_round.max(1);
        let bucket_size = config.round_bucket_size.max(1);

        let mut columns: Vec<String> = [CURRENT_RANK, PICKS_BETWEEN, RANK_WINDOW_DIFF, IN_WINDOW]
            .iter()
            .map(|c| c.to_string())
            .collect();
        columns.extend((1..=max_round).map(round_column));
        columns.extend(bucket_bounds(max_round, bucket_size).map(|(lo, hi)| bucket_column(lo, hi)));
        columns.extend((1..=max_round).map(|r| format!("{RANK_WINDOW_DIFF}_x_{}", round_column(r))));
        columns.extend((1..=max_round).map(|r| format!("{IN_WINDOW}_x_{}", round_column(r))));

        FeatureSchema {
            columns,
            max_round,
            bucket_size,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// The round indicator a draft round maps to. Rounds past `max_round`
    /// share the last indicator.
    pub fn effective_round(&self, round: u32) -> u32 {
        round.clamp(1, self.max_round)
    }

    fn round_offset(&self) -> usize {
        4
    }

    fn bucket_offset(&self) -> usize {
        self.round_offset() + self.max_round as usize
    }

    fn bucket_count(&self) -> usize {
        self.max_round.div_ceil(self.bucket_size) as usize
    }

    fn diff_interaction_offset(&self) -> usize {
        self.bucket_offset() + self.bucket_count()
    }

    fn window_interaction_offset(&self) -> usize {
        self.diff_interaction_offset() + self.max_round as usize
    }
}

fn round_column(round: u32) -> String {
    format!("round_{round}")
}

fn bucket_column(lo: u32, hi: u32) -> String {
    format!("rounds_{lo}_{hi}")
}

/// Inclusive round ranges of each bucket; the last one is clipped.
fn bucket_bounds(max_round: u32, size: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..max_round.div_ceil(size)).map(move |b| {
        let lo = b * size + 1;
        (lo, lo.saturating_add(size - 1).min(max_round))
    })
}

// ---------------------------------------------------------------------------
// Rows and matrix
// ---------------------------------------------------------------------------

/// Features of one candidate at the current pick.
///
/// Window fields are `None` when the observer has no turn left to compare
/// against; the matching matrix cells are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub row_id: usize,
    pub candidate_id: String,
    pub current_rank: u32,
    pub picks_between: Option<u32>,
    pub rank_window_diff: Option<i64>,
    pub in_window: Option<bool>,
    pub round: u32,
    /// Values in schema order.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub context: PickContext,
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// Project every row onto `columns`, in that order.
    pub fn select(&self, columns: &[String]) -> Result<Vec<Vec<f64>>, DraftError> {
        let indices = columns
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| DraftError::PredictionUnavailable {
                        reason: format!("unknown feature column `{name}`"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row.values[i]).collect())
            .collect())
    }

    /// Value of `column` for the row at `index`.
    pub fn value(&self, index: usize, column: &str) -> Option<f64> {
        let col = self.schema.index_of(column)?;
        self.rows.get(index).map(|r| r.values[col])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureConfig,
    schema: FeatureSchema,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        let schema = FeatureSchema::new(&config);
        FeatureEngine { config, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Compute features for every row of `expansion`.
    ///
    /// An expansion describes one draft at one pick, so it forms a single
    /// group: ranks run 1..K over its rows in draft-value order.
    pub fn compute(&self, expansion: &Expansion<'_>) -> FeatureMatrix {
        let context = &expansion.context;

        // Stable sort keeps pool order for equal ADP.
        let mut order: Vec<usize> = (0..expansion.rows.len()).collect();
        order.sort_by(|&a, &b| {
            expansion.rows[a]
                .candidate
                .adp
                .total_cmp(&expansion.rows[b].candidate.adp)
        });
        let mut ranks = vec![0u32; expansion.rows.len()];
        for (rank, &idx) in order.iter().enumerate() {
            ranks[idx] = rank as u32 + 1;
        }

        let picks_between = context
            .actual_next_pick_number
            .map(|next| next.saturating_sub(context.pick_number));

        if picks_between.is_none() && self.config.missing_window == MissingWindowPolicy::Drop {
            debug!(
                "Pick {} has no observer pick after it; dropping {} rows",
                context.pick_number,
                expansion.rows.len()
            );
            return FeatureMatrix {
                context: context.clone(),
                schema: self.schema.clone(),
                rows: Vec::new(),
            };
        }

        let rows = expansion
            .rows
            .iter()
            .zip(ranks)
            .map(|(row, rank)| {
                self.build_row(row.row_id, &row.candidate.id, rank, picks_between, context.round)
            })
            .collect::<Vec<_>>();

        FeatureMatrix {
            context: context.clone(),
            schema: self.schema.clone(),
            rows,
        }
    }

    fn build_row(
        &self,
        row_id: usize,
        candidate_id: &str,
        current_rank: u32,
        picks_between: Option<u32>,
        round: u32,
    ) -> FeatureRow {
        let schema = &self.schema;
        let rank_window_diff = picks_between.map(|p| i64::from(current_rank) - i64::from(p));
        let in_window = rank_window_diff.map(|d| d <= 0);

        let diff_value = rank_window_diff.map_or(f64::NAN, |d| d as f64);
        let window_value = in_window.map_or(f64::NAN, |w| if w { 1.0 } else { 0.0 });

        let mut values = vec![0.0; schema.len()];
        values[0] = f64::from(current_rank);
        values[1] = picks_between.map_or(f64::NAN, f64::from);
        values[2] = diff_value;
        values[3] = window_value;

        let effective = schema.effective_round(round);
        let round_idx = (effective - 1) as usize;
        values[schema.round_offset() + round_idx] = 1.0;
        values[schema.bucket_offset() + ((effective - 1) / schema.bucket_size) as usize] = 1.0;

        // Interactions are zero outside the row's round and carry the
        // window value (possibly NaN) inside it.
        values[schema.diff_interaction_offset() + round_idx] = diff_value;
        values[schema.window_interaction_offset() + round_idx] = window_value;

        FeatureRow {
            row_id,
            candidate_id: candidate_id.to_string(),
            current_rank,
            picks_between,
            rank_window_diff,
            in_window,
            round,
            values,
        }
    }
}
