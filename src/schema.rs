use crate::dataset::{Cell, Dataset};

pub const NAME: &str = "Name";
pub const TEAM: &str = "Team";
pub const AGE: &str = "Age";
pub const COMPETITION: &str = "Competition";
pub const PRIMARY_POSITION: &str = "Primary Position";
pub const MINUTES_PLAYED: &str = "Minutes Played";
pub const RADAR_TEMPLATE: &str = "Default Radar Template";

pub const MATCHES: &str = "Matches";
pub const AVAILABLE_MINUTES: &str = "Available Minutes";
pub const USAGE: &str = "Usage";

pub const DEFENSIVE_ACTION_OBV: &str = "Defensive Action OBV";
pub const DRIBBLE_CARRY_OBV: &str = "Dribble & Carry OBV";
pub const PASS_OBV: &str = "Pass OBV";
pub const SHOT_OBV: &str = "Shot OBV";
pub const OBV: &str = "OBV";

pub const REQUIRED_COLUMNS: &[&str] = &[NAME, TEAM, AGE, COMPETITION];

pub const OPTIONAL_COLUMNS: &[&str] = &[
    PRIMARY_POSITION,
    MINUTES_PLAYED,
    RADAR_TEMPLATE,
    DEFENSIVE_ACTION_OBV,
    DRIBBLE_CARRY_OBV,
    PASS_OBV,
    SHOT_OBV,
    OBV,
];

pub const DERIVED_COLUMNS: &[&str] = &[MATCHES, AVAILABLE_MINUTES, USAGE];

// Source header -> canonical header.
const HEADER_ALIASES: &[(&str, &str)] = &[("Position", PRIMARY_POSITION)];

const TEXT_COLUMNS: &[&str] = &[NAME, TEAM, COMPETITION, PRIMARY_POSITION, RADAR_TEMPLATE];

const NUMERIC_COLUMNS: &[&str] = &[
    AGE,
    MINUTES_PLAYED,
    MATCHES,
    AVAILABLE_MINUTES,
    USAGE,
    DEFENSIVE_ACTION_OBV,
    DRIBBLE_CARRY_OBV,
    PASS_OBV,
    SHOT_OBV,
    OBV,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

pub fn column_kind(column: &str) -> Option<ColumnKind> {
    if TEXT_COLUMNS.contains(&column) {
        Some(ColumnKind::Text)
    } else if NUMERIC_COLUMNS.contains(&column) {
        Some(ColumnKind::Numeric)
    } else {
        None
    }
}

/// Which declared columns a loaded dataset carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub optional_present: Vec<String>,
    pub optional_absent: Vec<String>,
    pub extra: Vec<String>,
}

pub fn missing_required(dataset: &Dataset) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !dataset.has_column(c))
        .map(|c| c.to_string())
        .collect()
}

pub fn report(dataset: &Dataset) -> SchemaReport {
    let mut out = SchemaReport::default();
    for col in OPTIONAL_COLUMNS {
        if dataset.has_column(col) {
            out.optional_present.push(col.to_string());
        } else {
            out.optional_absent.push(col.to_string());
        }
    }
    out.extra = dataset
        .columns()
        .iter()
        .filter(|c| {
            let c = c.as_str();
            !REQUIRED_COLUMNS.contains(&c)
                && !OPTIONAL_COLUMNS.contains(&c)
                && !DERIVED_COLUMNS.contains(&c)
        })
        .cloned()
        .collect();
    out
}

/// Renames aliased headers to their canonical names. An alias is left alone
/// when the canonical column already exists.
pub fn normalize_headers(dataset: &mut Dataset) {
    for (alias, canonical) in HEADER_ALIASES {
        dataset.rename_column(alias, canonical);
    }
}

/// Coerces every column to its declared kind. Undeclared columns are numeric
/// when all their non-missing values parse as numbers, text otherwise.
pub fn conform(dataset: &mut Dataset) {
    let columns = dataset.columns().to_vec();
    for column in &columns {
        let kind = column_kind(column).unwrap_or_else(|| sniff_kind(dataset, column));
        match kind {
            ColumnKind::Numeric => {
                dataset.map_column(column, to_numeric);
            }
            ColumnKind::Text => {
                dataset.map_column(column, to_text);
            }
        }
    }
}

fn sniff_kind(dataset: &Dataset, column: &str) -> ColumnKind {
    let Some(values) = dataset.column(column) else {
        return ColumnKind::Text;
    };
    let mut seen = false;
    for cell in values {
        match cell {
            Cell::Missing => {}
            Cell::Number(_) => seen = true,
            Cell::Text(s) => {
                if parse_number(s).is_none() {
                    return ColumnKind::Text;
                }
                seen = true;
            }
        }
    }
    if seen {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn to_numeric(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(v) => Cell::number(*v),
        Cell::Text(s) => Cell::from_opt(parse_number(s)),
        Cell::Missing => Cell::Missing,
    }
}

fn to_text(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => Cell::text(s.trim()),
        Cell::Number(_) => Cell::Text(cell.to_string()),
        Cell::Missing => Cell::Missing,
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conform_coerces_declared_and_sniffed_columns() {
        let mut ds = Dataset::new([NAME, AGE, "Height", "Foot"]);
        ds.push_row(vec![
            Cell::Number(1860.0),
            Cell::text("24"),
            Cell::text("181.5"),
            Cell::text("Left"),
        ]);
        ds.push_row(vec![
            Cell::text("Smith"),
            Cell::text("n/a"),
            Cell::Missing,
            Cell::text("7"),
        ]);
        conform(&mut ds);

        let first = ds.record(0).unwrap();
        assert_eq!(first.text(NAME), Some("1860"));
        assert_eq!(first.number(AGE), Some(24.0));
        assert_eq!(first.number("Height"), Some(181.5));
        assert_eq!(first.text("Foot"), Some("Left"));

        let second = ds.record(1).unwrap();
        assert!(second.get(AGE).is_missing());
        assert_eq!(second.text("Foot"), Some("7"));
    }

    #[test]
    fn position_alias_is_renamed() {
        let mut ds = Dataset::new([NAME, "Position"]);
        normalize_headers(&mut ds);
        assert!(ds.has_column(PRIMARY_POSITION));
        assert!(!ds.has_column("Position"));
    }
}
