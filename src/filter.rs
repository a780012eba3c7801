use std::collections::BTreeSet;

use crate::dataset::{Cell, Dataset, Record};
use crate::schema::{AGE, COMPETITION, PRIMARY_POSITION, TEAM, USAGE};

/// Selecting this option turns a multi-select into a no-op.
pub const ALL: &str = "All";

pub const DEFAULT_AGE_MIN: f64 = 18.0;
pub const DEFAULT_AGE_MAX: f64 = 40.0;
pub const DEFAULT_USAGE_MIN: f64 = 0.0;
pub const DEFAULT_USAGE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive on both ends. A missing value never passes.
    pub fn contains(&self, value: Option<f64>) -> bool {
        value.is_some_and(|v| v >= self.min && v <= self.max)
    }
}

/// Picked values of a multi-select. Empty, or containing [`ALL`], means no filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    values: Vec<String>,
}

impl Selection {
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let mut out = Self::default();
        for v in values {
            out.insert(v.into());
        }
        out
    }

    pub fn all() -> Self {
        Self::new([ALL])
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// True when this selection restricts anything.
    pub fn is_active(&self) -> bool {
        !self.values.is_empty() && !self.contains(ALL)
    }

    pub fn allows(&self, value: Option<&str>) -> bool {
        if !self.is_active() {
            return true;
        }
        value.is_some_and(|v| self.contains(v))
    }

    pub fn insert(&mut self, value: String) {
        if !self.contains(&value) {
            self.values.push(value);
        }
    }

    /// Flips `value`. Picking [`ALL`] clears every other pick; picking anything
    /// else drops [`ALL`].
    pub fn toggle(&mut self, value: &str) {
        if self.contains(value) {
            self.values.retain(|v| v != value);
            return;
        }
        if value == ALL {
            self.values.clear();
        } else {
            self.values.retain(|v| v != ALL);
        }
        self.values.push(value.to_string());
    }

    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.values.retain(|v| v == ALL || keep(v.as_str()));
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub age: NumericRange,
    pub usage: NumericRange,
    pub positions: Selection,
    pub competitions: Selection,
    pub teams: Selection,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            age: NumericRange::new(DEFAULT_AGE_MIN, DEFAULT_AGE_MAX),
            usage: NumericRange::new(DEFAULT_USAGE_MIN, DEFAULT_USAGE_MAX),
            positions: Selection::default(),
            competitions: Selection::default(),
            teams: Selection::default(),
        }
    }
}

impl FilterSpec {
    pub fn matches(&self, record: &Record<'_>) -> bool {
        self.age.contains(record.number(AGE))
            && self.usage.contains(record.number(USAGE))
            && self.positions.allows(record.text(PRIMARY_POSITION))
            && self.competitions.allows(record.text(COMPETITION))
            && self.teams.allows(record.text(TEAM))
    }
}

/// Rows passing every predicate of `spec`, as a new dataset. The input is not touched.
pub fn apply_filters(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    dataset.retain_rows(|record| spec.matches(&record))
}

/// Teams that can be picked given the competition selection: teams with a
/// record in a selected competition, or every team when the selection is a no-op.
pub fn team_options(dataset: &Dataset, competitions: &Selection) -> Vec<String> {
    if !competitions.is_active() {
        return dataset.distinct_text(TEAM);
    }
    dataset
        .records()
        .filter(|r| competitions.allows(r.text(COMPETITION)))
        .filter_map(|r| match r.get(TEAM) {
            Cell::Missing => None,
            cell => Some(cell.to_string()),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn position_options(dataset: &Dataset) -> Vec<String> {
    dataset.distinct_text(PRIMARY_POSITION)
}

pub fn competition_options(dataset: &Dataset) -> Vec<String> {
    dataset.distinct_text(COMPETITION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_all_clears_other_picks() {
        let mut sel = Selection::new(["GK", "MID"]);
        sel.toggle(ALL);
        assert_eq!(sel.values(), &[ALL.to_string()]);
        sel.toggle("FW");
        assert_eq!(sel.values(), &["FW".to_string()]);
        sel.toggle("FW");
        assert!(sel.is_empty());
    }

    #[test]
    fn range_excludes_missing() {
        let r = NumericRange::new(0.0, 100.0);
        assert!(r.contains(Some(0.0)));
        assert!(r.contains(Some(100.0)));
        assert!(!r.contains(Some(100.01)));
        assert!(!r.contains(None));
    }
}
