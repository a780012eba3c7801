use obv_terminal::config::MatchTable;
use obv_terminal::dataset::{Cell, Dataset};
use obv_terminal::derive::derive_fields;
use obv_terminal::schema::{AVAILABLE_MINUTES, COMPETITION, MATCHES, MINUTES_PLAYED, NAME, USAGE};

fn table() -> MatchTable {
    MatchTable::new([("1. Bundesliga", 15), ("1. HNL", 18)])
}

fn players(rows: &[(&str, &str, Option<f64>)]) -> Dataset {
    let mut ds = Dataset::new([NAME, COMPETITION, MINUTES_PLAYED]);
    for (name, comp, minutes) in rows {
        ds.push_row(vec![
            Cell::text(*name),
            Cell::text(*comp),
            Cell::from_opt(*minutes),
        ]);
    }
    ds
}

#[test]
fn bundesliga_full_season_is_full_usage() {
    let mut ds = players(&[("A", "1. Bundesliga", Some(1350.0))]);
    derive_fields(&mut ds, &table());

    let r = ds.record(0).unwrap();
    assert_eq!(r.number(MATCHES), Some(15.0));
    assert_eq!(r.number(AVAILABLE_MINUTES), Some(1350.0));
    assert_eq!(r.number(USAGE), Some(100.0));
}

#[test]
fn unknown_competition_propagates_missing() {
    let mut ds = players(&[("B", "Unknown League", Some(900.0))]);
    let report = derive_fields(&mut ds, &table());

    let r = ds.record(0).unwrap();
    assert!(r.get(MATCHES).is_missing());
    assert!(r.get(AVAILABLE_MINUTES).is_missing());
    assert!(r.get(USAGE).is_missing());
    assert_eq!(report.unmapped_competitions, vec!["Unknown League".to_string()]);
}

#[test]
fn fallback_match_count_fills_unmapped_competitions() {
    let mut ds = players(&[("B", "Unknown League", Some(900.0))]);
    derive_fields(&mut ds, &table().with_fallback(Some(10)));

    let r = ds.record(0).unwrap();
    assert_eq!(r.number(AVAILABLE_MINUTES), Some(900.0));
    assert_eq!(r.number(USAGE), Some(100.0));
}

#[test]
fn minutes_are_rounded_before_usage() {
    let mut ds = players(&[
        ("A", "1. HNL", Some(1000.4)),
        ("B", "1. HNL", Some(1000.5)),
        ("C", "1. HNL", None),
    ]);
    derive_fields(&mut ds, &table());

    assert_eq!(ds.record(0).unwrap().number(MINUTES_PLAYED), Some(1000.0));
    // half-to-even
    assert_eq!(ds.record(1).unwrap().number(MINUTES_PLAYED), Some(1000.0));
    // 1000 / 1620 * 100 = 61.728...
    assert_eq!(ds.record(0).unwrap().number(USAGE), Some(61.73));
    assert!(ds.record(2).unwrap().get(USAGE).is_missing());
}

#[test]
fn available_minutes_is_ninety_per_match() {
    let mut ds = players(&[
        ("A", "1. Bundesliga", Some(10.0)),
        ("B", "1. HNL", Some(20.0)),
        ("C", "Elsewhere", Some(30.0)),
    ]);
    derive_fields(&mut ds, &table());

    for r in ds.records() {
        if let Some(m) = r.number(MATCHES) {
            assert_eq!(r.number(AVAILABLE_MINUTES), Some(m * 90.0));
        } else {
            assert!(r.get(AVAILABLE_MINUTES).is_missing());
        }
    }
}

#[test]
fn usage_skipped_without_minutes_column() {
    let mut ds = Dataset::new([NAME, COMPETITION]);
    ds.push_row(vec![Cell::text("A"), Cell::text("1. HNL")]);
    let report = derive_fields(&mut ds, &table());

    assert!(ds.has_column(MATCHES));
    assert!(ds.has_column(AVAILABLE_MINUTES));
    assert!(!ds.has_column(USAGE));
    assert!(!report.usage_derived);
    assert!(!report.minutes_rounded);
}

#[test]
fn everything_skipped_without_competition_column() {
    let mut ds = Dataset::new([NAME, MINUTES_PLAYED]);
    ds.push_row(vec![Cell::text("A"), Cell::number(500.6)]);
    let report = derive_fields(&mut ds, &table());

    assert!(!ds.has_column(MATCHES));
    assert!(!ds.has_column(USAGE));
    assert!(report.minutes_rounded);
    assert_eq!(ds.record(0).unwrap().number(MINUTES_PLAYED), Some(501.0));
}

#[test]
fn derivation_is_idempotent() {
    let mut ds = players(&[
        ("A", "1. Bundesliga", Some(1000.0)),
        ("B", "Unknown League", Some(100.0)),
    ]);
    derive_fields(&mut ds, &table());
    let once = ds.clone();
    derive_fields(&mut ds, &table());
    assert_eq!(ds, once);
}

#[test]
fn stale_derived_columns_are_overwritten() {
    let mut ds = Dataset::new([NAME, COMPETITION, MINUTES_PLAYED, MATCHES, AVAILABLE_MINUTES]);
    ds.push_row(vec![
        Cell::text("A"),
        Cell::text("1. HNL"),
        Cell::number(810.0),
        Cell::number(99.0),
        Cell::number(1.0),
    ]);
    let report = derive_fields(&mut ds, &table());

    assert!(report.matches_derived && report.available_minutes_derived);
    assert_eq!(ds.columns().len(), 6);
    let r = ds.record(0).unwrap();
    assert_eq!(r.number(MATCHES), Some(18.0));
    assert_eq!(r.number(AVAILABLE_MINUTES), Some(1620.0));
    assert_eq!(r.number(USAGE), Some(50.0));
}
