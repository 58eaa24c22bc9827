// Plain-text rendering of the candidate table and the final board.

use std::collections::HashMap;
use std::fmt::Write;

use snakecast_core::draft::state::BoardRow;
use snakecast_core::players::Candidate;
use snakecast_core::results::CandidateTable;

fn percent(p: Option<f64>) -> String {
    match p {
        Some(p) => format!("{:>3.0}%", p * 100.0),
        None => "   -".to_string(),
    }
}

/// Render the top `top_n` rows of `table`.
pub fn render_table(table: &CandidateTable, top_n: usize) -> String {
    let mut out = String::new();
    let next = table
        .observer_next_pick
        .map_or_else(|| "none".to_string(), |n| format!("#{n}"));
    let _ = writeln!(
        out,
        "Pick {} (#{}) on the clock: {} | your next pick: {} | {}",
        table.pick_label,
        table.pick_number,
        table.entry_id,
        next,
        table.model_version.as_deref().unwrap_or("no model"),
    );
    if let Some(err) = &table.prediction_error {
        let _ = writeln!(out, "  probabilities unavailable: {err}");
    }
    if table.rows.is_empty() {
        let _ = writeln!(out, "  (no candidates to rank)");
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<26} {:<4} {:<4} {:>6} {:>5} {:>6} {:>5}",
        "Player", "Pos", "Team", "ADP", "Rank", "Diff", "Gone"
    );
    for row in table.top(top_n) {
        let diff = row
            .rank_window_diff
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let _ = writeln!(
            out,
            "  {:<26} {:<4} {:<4} {:>6.1} {:>5} {:>6} {:>5}",
            row.name,
            row.position.display_str(),
            row.team,
            row.adp,
            row.current_rank,
            diff,
            percent(row.probability),
        );
    }
    out
}

/// Render every slot of a finished (or partial) board.
pub fn render_board(rows: &[BoardRow], candidates: &[Candidate]) -> String {
    let by_id: HashMap<&str, &Candidate> = candidates.iter().map(|c| (c.id.as_str(), c)).collect();
    let mut out = String::new();
    for row in rows {
        let pick = match row.candidate_id.as_deref() {
            Some(id) => match by_id.get(id) {
                Some(c) => format!("{} ({} {})", c.name, c.position, c.team),
                None => id.to_string(),
            },
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>6} #{:<4} {:<12} {}",
            row.slot.slot.label(),
            row.slot.number(),
            row.slot.slot.entry_id,
            pick
        );
    }
    out
}
