// External data sources: draft entries and live selections.
//
// The core only pulls from these. Hosts adapt whatever transport they use
// (platform API, browser extension, files) behind the two traits.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::draft::board::Entry;
use crate::draft::pick::Selection;
use crate::error::DraftError;

/// Supplies the entries of a draft once its pick order is final.
pub trait EntrySource {
    fn fetch_entries(&mut self) -> Result<Vec<Entry>, DraftError>;
}

/// Supplies all selections made so far in a draft. Must be safe to call
/// repeatedly; every call returns the full history.
///
/// Returns `NoSelectionsYet` before the first pick lands.
pub trait SelectionSource {
    fn fetch_selections(&mut self, draft_id: &str) -> Result<Vec<Selection>, DraftError>;
}

// ---------------------------------------------------------------------------
// CSV-backed sources
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    username: String,
    pick_order: u32,
}

#[derive(Debug, Deserialize)]
struct RawSelection {
    #[serde(default)]
    draft_id: Option<String>,
    pick_number: u32,
    entry_id: String,
    #[serde(default)]
    candidate_id: Option<String>,
}

fn open(path: &Path) -> Result<std::fs::File, DraftError> {
    std::fs::File::open(path).map_err(|e| DraftError::SourceUnavailable {
        reason: format!("{}: {e}", path.display()),
    })
}

fn csv_failure(path: &Path, e: csv::Error) -> DraftError {
    DraftError::SourceUnavailable {
        reason: format!("{}: {e}", path.display()),
    }
}

/// Parse entries from a CSV reader (`id,user_id,username,pick_order`).
pub fn entries_from_reader<R: Read>(rdr: R) -> Result<Vec<Entry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawEntry>() {
        let raw = result?;
        let username = if raw.username.trim().is_empty() {
            raw.id.trim().to_string()
        } else {
            raw.username.trim().to_string()
        };
        entries.push(Entry {
            id: raw.id.trim().to_string(),
            user_id: raw.user_id.trim().to_string(),
            username,
            pick_order: raw.pick_order,
        });
    }
    Ok(entries)
}

/// Parse selections for `draft_id` from a CSV reader
/// (`[draft_id,]pick_number,entry_id,candidate_id`). Rows tagged with a
/// different draft are ignored; a blank candidate marks an unfilled slot.
pub fn selections_from_reader<R: Read>(
    rdr: R,
    draft_id: &str,
) -> Result<Vec<Selection>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut selections = Vec::new();
    for result in reader.deserialize::<RawSelection>() {
        let raw = result?;
        if raw.draft_id.as_deref().is_some_and(|d| !d.is_empty() && d != draft_id) {
            continue;
        }
        selections.push(Selection {
            pick_number: raw.pick_number,
            entry_id: raw.entry_id.trim().to_string(),
            candidate_id: raw
                .candidate_id
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        });
    }
    Ok(selections)
}

/// Entries read from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvEntrySource {
    path: PathBuf,
}

impl CsvEntrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvEntrySource { path: path.into() }
    }
}

impl EntrySource for CsvEntrySource {
    fn fetch_entries(&mut self) -> Result<Vec<Entry>, DraftError> {
        let file = open(&self.path)?;
        let entries = entries_from_reader(file).map_err(|e| csv_failure(&self.path, e))?;
        debug!("Fetched {} entries from {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

/// Selections read from a CSV file the host keeps appending to.
#[derive(Debug, Clone)]
pub struct CsvSelectionSource {
    path: PathBuf,
}

impl CsvSelectionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSelectionSource { path: path.into() }
    }
}

impl SelectionSource for CsvSelectionSource {
    fn fetch_selections(&mut self, draft_id: &str) -> Result<Vec<Selection>, DraftError> {
        let file = open(&self.path)?;
        let selections =
            selections_from_reader(file, draft_id).map_err(|e| csv_failure(&self.path, e))?;
        if selections.is_empty() {
            return Err(DraftError::NoSelectionsYet);
        }
        if selections.windows(2).any(|w| w[0].pick_number > w[1].pick_number) {
            warn!(
                "Selections in {} are not sorted by pick number",
                self.path.display()
            );
        }
        Ok(selections)
    }
}
