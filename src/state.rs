use std::collections::VecDeque;
use std::time::Instant;

use crate::dataset::Dataset;
use crate::filter::{ALL, NumericRange, Selection};
use crate::loader::{LoadError, Source};
use crate::session::Session;

const MAX_LOGS: usize = 200;
const USAGE_LIMIT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    AgeMin,
    AgeMax,
    UsageMin,
    UsageMax,
    Position,
    Competition,
    Team,
    Table,
}

const FOCUS_ORDER: [Focus; 8] = [
    Focus::AgeMin,
    Focus::AgeMax,
    Focus::UsageMin,
    Focus::UsageMax,
    Focus::Position,
    Focus::Competition,
    Focus::Team,
    Focus::Table,
];

impl Focus {
    fn index(self) -> usize {
        FOCUS_ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn is_list(self) -> bool {
        matches!(self, Focus::Position | Focus::Competition | Focus::Team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Position,
    Competition,
    Team,
}

#[derive(Debug, Clone, Default)]
pub struct ExportState {
    pub done: bool,
    pub path: Option<String>,
    pub rows: usize,
    pub message: String,
    pub failed: bool,
    pub last_updated: Option<Instant>,
}

impl ExportState {
    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::default();
        }
    }
}

pub struct AppState {
    pub session: Session,
    pub focus: Focus,
    pub load_error: Option<String>,
    pub view: Dataset,
    pub loaded_rows: usize,
    pub cursors: [usize; 3],
    pub table_scroll: usize,
    pub help_overlay: bool,
    pub export: ExportState,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            focus: Focus::AgeMin,
            load_error: None,
            view: Dataset::default(),
            loaded_rows: 0,
            cursors: [0; 3],
            table_scroll: 0,
            help_overlay: false,
            export: ExportState::default(),
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Loads `source` into the session. A failure blocks the dashboard until
    /// another source loads.
    pub fn load(&mut self, source: Source) -> Result<(), LoadError> {
        let label = source.label();
        match self.session.load(source) {
            Ok(ds) => {
                let rows = ds.len();
                self.load_error = None;
                self.push_log(format!("[INFO] Loaded {rows} rows from {label}"));
                self.refresh();
                let unmapped = self
                    .session
                    .last_derive()
                    .map(|d| d.unmapped_competitions.len())
                    .unwrap_or(0);
                if unmapped > 0 {
                    self.push_log(format!(
                        "[WARN] {unmapped} competition(s) have no match count; usage left blank"
                    ));
                }
                Ok(())
            }
            Err(err) => {
                self.load_error = Some(err.to_string());
                self.push_log(format!("[WARN] Load failed: {err}"));
                Err(err)
            }
        }
    }

    /// Re-runs the pipeline for the current filter picks.
    pub fn refresh(&mut self) {
        let Some(run) = self.session.run() else {
            self.view = Dataset::default();
            self.loaded_rows = 0;
            return;
        };
        self.loaded_rows = run.loaded_rows;
        self.view = run.view;
        self.table_scroll = self.table_scroll.min(self.view.len().saturating_sub(1));
        self.clamp_cursors();
    }

    pub fn cycle_focus_next(&mut self) {
        let idx = (self.focus.index() + 1) % FOCUS_ORDER.len();
        self.focus = FOCUS_ORDER[idx];
    }

    pub fn cycle_focus_prev(&mut self) {
        let idx = (self.focus.index() + FOCUS_ORDER.len() - 1) % FOCUS_ORDER.len();
        self.focus = FOCUS_ORDER[idx];
    }

    /// Nudges the focused range bound by `delta`, keeping min <= max.
    pub fn adjust(&mut self, delta: f64) {
        let filters = &mut self.session.filters;
        match self.focus {
            Focus::AgeMin => bump_min(&mut filters.age, delta, 0.0),
            Focus::AgeMax => bump_max(&mut filters.age, delta, None),
            Focus::UsageMin => bump_min(&mut filters.usage, delta, 0.0),
            Focus::UsageMax => bump_max(&mut filters.usage, delta, Some(USAGE_LIMIT)),
            _ => return,
        }
        self.refresh();
    }

    /// Options for a multi-select, with the `All` sentinel first.
    pub fn options(&self, kind: ListKind) -> Vec<String> {
        let mut out = vec![ALL.to_string()];
        out.extend(match kind {
            ListKind::Position => self.session.position_options(),
            ListKind::Competition => self.session.competition_options(),
            ListKind::Team => self.session.team_options(),
        });
        out
    }

    pub fn selection(&self, kind: ListKind) -> &Selection {
        let filters = &self.session.filters;
        match kind {
            ListKind::Position => &filters.positions,
            ListKind::Competition => &filters.competitions,
            ListKind::Team => &filters.teams,
        }
    }

    pub fn focused_list(&self) -> Option<ListKind> {
        match self.focus {
            Focus::Position => Some(ListKind::Position),
            Focus::Competition => Some(ListKind::Competition),
            Focus::Team => Some(ListKind::Team),
            _ => None,
        }
    }

    pub fn cursor(&self, kind: ListKind) -> usize {
        self.cursors[kind as usize]
    }

    pub fn select_next(&mut self) {
        if self.focus == Focus::Table {
            if self.table_scroll + 1 < self.view.len() {
                self.table_scroll += 1;
            }
            return;
        }
        let Some(kind) = self.focused_list() else {
            return;
        };
        let len = self.options(kind).len();
        let cursor = &mut self.cursors[kind as usize];
        if *cursor + 1 < len {
            *cursor += 1;
        }
    }

    pub fn select_prev(&mut self) {
        if self.focus == Focus::Table {
            self.table_scroll = self.table_scroll.saturating_sub(1);
            return;
        }
        let Some(kind) = self.focused_list() else {
            return;
        };
        let cursor = &mut self.cursors[kind as usize];
        *cursor = cursor.saturating_sub(1);
    }

    /// Flips the option under the cursor of the focused list.
    pub fn toggle_current(&mut self) {
        let Some(kind) = self.focused_list() else {
            return;
        };
        let options = self.options(kind);
        let Some(value) = options.get(self.cursor(kind)) else {
            return;
        };
        match kind {
            ListKind::Position => self.session.filters.positions.toggle(value),
            ListKind::Competition => self.session.toggle_competition(value),
            ListKind::Team => self.session.filters.teams.toggle(value),
        }
        self.refresh();
    }

    pub fn clear_current(&mut self) {
        let Some(kind) = self.focused_list() else {
            return;
        };
        match kind {
            ListKind::Position => self.session.filters.positions.clear(),
            ListKind::Competition => self.session.set_competitions(Selection::default()),
            ListKind::Team => self.session.filters.teams.clear(),
        }
        self.refresh();
    }

    pub fn export(&mut self) {
        if self.session.dataset().is_none() {
            self.push_log("[INFO] Nothing loaded to export");
            return;
        }
        let now = Instant::now();
        match self.session.export(&self.view) {
            Ok(report) => {
                let path = report.path.display().to_string();
                self.export = ExportState {
                    done: true,
                    path: Some(path.clone()),
                    rows: report.rows,
                    message: format!("Exported {} rows to {path}", report.rows),
                    failed: false,
                    last_updated: Some(now),
                };
                self.push_log(format!(
                    "[INFO] Export {} ({} bytes) at {}",
                    path,
                    report.bytes,
                    report.exported_at.format("%H:%M:%S")
                ));
            }
            Err(err) => {
                self.export = ExportState {
                    done: true,
                    path: None,
                    rows: 0,
                    message: format!("Export failed: {err}"),
                    failed: true,
                    last_updated: Some(now),
                };
                self.push_log(format!("[WARN] Export failed: {err}"));
            }
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    fn clamp_cursors(&mut self) {
        for kind in [ListKind::Position, ListKind::Competition, ListKind::Team] {
            let len = self.options(kind).len();
            let cursor = &mut self.cursors[kind as usize];
            *cursor = (*cursor).min(len.saturating_sub(1));
        }
    }
}

fn bump_min(range: &mut NumericRange, delta: f64, floor: f64) {
    range.min = (range.min + delta).max(floor).min(range.max);
}

// Max age has no ceiling.
fn bump_max(range: &mut NumericRange, delta: f64, ceil: Option<f64>) {
    let raised = range.max + delta;
    range.max = ceil.map_or(raised, |c| raised.min(c)).max(range.min);
}

pub fn focus_label(focus: Focus) -> &'static str {
    match focus {
        Focus::AgeMin => "Min Age",
        Focus::AgeMax => "Max Age",
        Focus::UsageMin => "Min Usage",
        Focus::UsageMax => "Max Usage",
        Focus::Position => "Position",
        Focus::Competition => "Competition",
        Focus::Team => "Team",
        Focus::Table => "Table",
    }
}

pub fn list_label(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Position => "Position",
        ListKind::Competition => "Competition",
        ListKind::Team => "Team",
    }
}
