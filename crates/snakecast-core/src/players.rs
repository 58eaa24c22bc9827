// Candidate pool loading and normalization.
//
// Reads a player CSV with one row per draftable candidate. ADP is kept as
// text on read because platforms publish "-" for unranked players.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::draft::pick::Position;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A draftable player with the static attributes the pipeline needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Platform identifier used by selections.
    pub id: String,
    pub name: String,
    pub position: Position,
    /// NFL team abbreviation.
    pub team: String,
    /// Average draft position. Lower is drafted earlier.
    pub adp: f64,
    /// Bye week, used to group candidates.
    pub bye_week: Option<u32>,
    pub projected_points: Option<f64>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlayerSourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV row (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawCandidate {
    id: String,
    name: String,
    position: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    adp: String,
    #[serde(default)]
    bye_week: Option<u32>,
    #[serde(default)]
    projected_points: Option<f64>,
}

/// Parse a published ADP, substituting `missing_adp` for unranked players.
fn parse_adp(raw: &str, missing_adp: f64) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => missing_adp,
    }
}

/// Order candidates by ADP. Ties keep their file order.
pub fn sort_by_draft_value(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.adp.total_cmp(&b.adp));
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Parse candidates from any CSV reader, skipping malformed rows.
pub fn load_candidates_from_reader<R: Read>(
    rdr: R,
    missing_adp: f64,
) -> Result<Vec<Candidate>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for result in reader.deserialize::<RawCandidate>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };

        let id = raw.id.trim().to_string();
        if id.is_empty() {
            warn!("skipping player '{}': empty id", raw.name.trim());
            continue;
        }
        let Some(position) = Position::from_str_pos(&raw.position) else {
            warn!(
                "skipping player '{}': unknown position '{}'",
                raw.name.trim(),
                raw.position
            );
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!("skipping duplicate player id '{}'", id);
            continue;
        }

        candidates.push(Candidate {
            id,
            name: raw.name.trim().to_string(),
            position,
            team: raw.team.trim().to_uppercase(),
            adp: parse_adp(&raw.adp, missing_adp),
            bye_week: raw.bye_week,
            projected_points: raw.projected_points.filter(|p| p.is_finite()),
        });
    }

    sort_by_draft_value(&mut candidates);
    Ok(candidates)
}

/// Load the candidate pool from a CSV file.
pub fn load_candidates(path: &Path, missing_adp: f64) -> Result<Vec<Candidate>, PlayerSourceError> {
    let shown = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| PlayerSourceError::Io {
        path: shown.clone(),
        source: e,
    })?;
    let candidates =
        load_candidates_from_reader(file, missing_adp).map_err(|e| PlayerSourceError::Csv {
            path: shown.clone(),
            source: e,
        })?;
    info!("Loaded {} candidates from {}", candidates.len(), shown);
    Ok(candidates)
}
