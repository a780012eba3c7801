use obv_terminal::dataset::{Cell, Dataset};
use obv_terminal::project::{DISPLAY_COLUMNS, project};
use obv_terminal::schema::{AGE, COMPETITION, NAME, OBV, TEAM, USAGE};

fn sample() -> Dataset {
    let mut ds = Dataset::new([COMPETITION, USAGE, NAME, "Extra", TEAM, AGE]);
    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        ds.push_row(vec![
            Cell::text("1. HNL"),
            Cell::number(10.0 * i as f64),
            Cell::text(*name),
            Cell::text("x"),
            Cell::text("Dinamo"),
            Cell::number(20.0 + i as f64),
        ]);
    }
    ds
}

#[test]
fn keeps_present_columns_in_list_order() {
    let out = project(&sample(), DISPLAY_COLUMNS);
    assert_eq!(out.columns(), &[NAME, TEAM, AGE, USAGE]);
}

#[test]
fn preserves_row_count_order_and_values() {
    let input = sample();
    let out = project(&input, DISPLAY_COLUMNS);
    assert_eq!(out.len(), input.len());
    for (a, b) in input.records().zip(out.records()) {
        assert_eq!(a.get(NAME), b.get(NAME));
        assert_eq!(a.get(USAGE), b.get(USAGE));
    }
}

#[test]
fn absent_columns_are_dropped_silently() {
    let out = project(&sample(), &[OBV, "Nope"]);
    assert!(out.columns().is_empty());
    assert_eq!(out.len(), 3);
}
