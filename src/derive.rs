use std::collections::BTreeSet;

use log::{debug, warn};

use crate::config::MatchTable;
use crate::dataset::{Cell, Dataset};
use crate::schema::{AVAILABLE_MINUTES, COMPETITION, MATCHES, MINUTES_PLAYED, USAGE};

pub const MINUTES_PER_MATCH: f64 = 90.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeriveReport {
    pub matches_derived: bool,
    pub minutes_rounded: bool,
    pub available_minutes_derived: bool,
    pub usage_derived: bool,
    /// Distinct competitions without a table entry (and no fallback).
    pub unmapped_competitions: Vec<String>,
}

/// Adds or overwrites `Matches`, `Available Minutes` and `Usage` in place.
///
/// Each step runs only when its inputs are present; a missing optional column
/// skips the step instead of failing. Running it twice gives the same table.
pub fn derive_fields(dataset: &mut Dataset, table: &MatchTable) -> DeriveReport {
    let mut report = DeriveReport::default();

    let mut unmapped = BTreeSet::new();
    let matches = dataset.column(COMPETITION).map(|competitions| {
        competitions
            .map(|cell| match cell.as_str() {
                Some(name) => {
                    let n = table.matches_for(name);
                    if n.is_none() {
                        unmapped.insert(name.to_string());
                    }
                    Cell::from_opt(n.map(f64::from))
                }
                None => Cell::Missing,
            })
            .collect::<Vec<_>>()
    });
    if let Some(matches) = matches {
        dataset.set_column(MATCHES, matches);
        report.matches_derived = true;
        report.unmapped_competitions = unmapped.into_iter().collect();
        if !report.unmapped_competitions.is_empty() {
            warn!(
                "{} competition(s) missing from match table: {}",
                report.unmapped_competitions.len(),
                report.unmapped_competitions.join(", ")
            );
        }
    } else {
        debug!("no {COMPETITION} column; skipping {MATCHES}");
    }

    report.minutes_rounded = dataset.map_column(MINUTES_PLAYED, |cell| match cell {
        Cell::Number(v) => Cell::number(v.round_ties_even()),
        other => other.clone(),
    });

    let available = dataset.column(MATCHES).map(|matches| {
        matches
            .map(|cell| Cell::from_opt(cell.as_f64().map(|m| m * MINUTES_PER_MATCH)))
            .collect::<Vec<_>>()
    });
    if let Some(available) = available {
        dataset.set_column(AVAILABLE_MINUTES, available);
        report.available_minutes_derived = true;
    }

    if let (Some(minutes_idx), Some(available_idx)) = (
        dataset.column_index(MINUTES_PLAYED),
        dataset.column_index(AVAILABLE_MINUTES),
    ) {
        let usage = dataset
            .rows()
            .iter()
            .map(|row| {
                Cell::from_opt(usage_pct(
                    row[minutes_idx].as_f64(),
                    row[available_idx].as_f64(),
                ))
            })
            .collect::<Vec<_>>();
        dataset.set_column(USAGE, usage);
        report.usage_derived = true;
    } else {
        debug!("{MINUTES_PLAYED} or {AVAILABLE_MINUTES} absent; skipping {USAGE}");
    }

    report
}

/// `minutes / available * 100` rounded to two decimals; `None` when either
/// side is missing or nothing was available.
pub fn usage_pct(minutes: Option<f64>, available: Option<f64>) -> Option<f64> {
    let (minutes, available) = (minutes?, available?);
    if available == 0.0 {
        return None;
    }
    let pct = minutes / available * 100.0;
    pct.is_finite().then(|| round_to(pct, 2))
}

// Half-to-even at the given scale, matching how the stats exports were rounded.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
