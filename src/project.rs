use crate::dataset::Dataset;
use crate::schema::{
    AGE, DEFENSIVE_ACTION_OBV, DRIBBLE_CARRY_OBV, NAME, OBV, PASS_OBV, RADAR_TEMPLATE, SHOT_OBV,
    TEAM, USAGE,
};

/// Columns shown in the table and written to the export, in order.
pub const DISPLAY_COLUMNS: &[&str] = &[
    NAME,
    TEAM,
    AGE,
    RADAR_TEMPLATE,
    USAGE,
    DEFENSIVE_ACTION_OBV,
    DRIBBLE_CARRY_OBV,
    PASS_OBV,
    SHOT_OBV,
    OBV,
];

/// Keeps the listed columns that exist, in list order. Absent columns are
/// dropped without error; rows keep their count and order.
pub fn project(dataset: &Dataset, columns: &[&str]) -> Dataset {
    let indices = columns
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect::<Vec<_>>();
    dataset.select_indices(&indices)
}
