use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, info};
use once_cell::unsync::OnceCell;
use reqwest::blocking::Client;

use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::derive::{DeriveReport, derive_fields};
use crate::export::{self, ExportError, ExportReport};
use crate::filter::{self, ALL, FilterSpec, Selection};
use crate::http_client::build_client;
use crate::loader::{self, LoadError, Source};
use crate::project::{DISPLAY_COLUMNS, project};
use crate::schema::TEAM;

/// One user's working context: configuration, memoized loads and the current
/// filter picks. Every control change should be followed by [`Session::run`].
pub struct Session {
    config: AppConfig,
    client: OnceCell<Client>,
    datasets: HashMap<Source, Dataset>,
    active: Option<Source>,
    pub filters: FilterSpec,
    last_derive: Option<DeriveReport>,
}

/// Output of one Derive -> Filter -> Project pass.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub view: Dataset,
    pub loaded_rows: usize,
    pub filtered_rows: usize,
    pub derive: DeriveReport,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            datasets: HashMap::new(),
            active: None,
            filters: FilterSpec::default(),
            last_derive: None,
        }
    }

    /// Source used when the user supplies no file.
    pub fn default_source(&self) -> Source {
        Source::Remote(self.config.data_url.clone())
    }

    /// Makes `source` active, loading it unless this session already has it.
    pub fn load(&mut self, source: Source) -> Result<&Dataset, LoadError> {
        if self.datasets.contains_key(&source) {
            debug!("reusing loaded dataset for {}", source.label());
        } else {
            let dataset = match &source {
                Source::Upload(path) => loader::load_file(path)?,
                Source::Remote(url) => {
                    let client = self
                        .client
                        .get_or_try_init(|| build_client(self.config.request_timeout))?;
                    loader::load_remote(client, url, &self.config.cache_dir)?
                }
            };
            info!("loaded {} rows from {}", dataset.len(), source.label());
            self.datasets.insert(source.clone(), dataset);
        }
        self.active = Some(source.clone());
        Ok(&self.datasets[&source])
    }

    /// Registers an already-built dataset under `source` and activates it.
    pub fn insert_dataset(&mut self, source: Source, dataset: Dataset) {
        self.datasets.insert(source.clone(), dataset);
        self.active = Some(source);
    }

    pub fn active_source(&self) -> Option<&Source> {
        self.active.as_ref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.active.as_ref().and_then(|s| self.datasets.get(s))
    }

    pub fn is_loaded(&self, source: &Source) -> bool {
        self.datasets.contains_key(source)
    }

    pub fn last_derive(&self) -> Option<&DeriveReport> {
        self.last_derive.as_ref()
    }

    /// Derives in place on the active dataset, then filters and projects it.
    /// `None` when nothing is loaded.
    pub fn run(&mut self) -> Option<PipelineRun> {
        let source = self.active.clone()?;
        let dataset = self.datasets.get_mut(&source)?;
        let derive = derive_fields(dataset, &self.config.match_table);
        let filtered = filter::apply_filters(dataset, &self.filters);
        let view = project(&filtered, DISPLAY_COLUMNS);
        debug!(
            "pipeline: {} loaded, {} after filters",
            dataset.len(),
            filtered.len()
        );
        self.last_derive = Some(derive.clone());
        Some(PipelineRun {
            loaded_rows: dataset.len(),
            filtered_rows: filtered.len(),
            view,
            derive,
        })
    }

    pub fn position_options(&self) -> Vec<String> {
        self.dataset().map(filter::position_options).unwrap_or_default()
    }

    pub fn competition_options(&self) -> Vec<String> {
        self.dataset()
            .map(filter::competition_options)
            .unwrap_or_default()
    }

    /// Teams narrowed by the current competition picks.
    pub fn team_options(&self) -> Vec<String> {
        self.dataset()
            .map(|ds| filter::team_options(ds, &self.filters.competitions))
            .unwrap_or_default()
    }

    /// Replaces the competition picks and drops team picks that are no longer
    /// selectable.
    pub fn set_competitions(&mut self, competitions: Selection) {
        self.filters.competitions = competitions;
        self.prune_teams();
    }

    pub fn toggle_competition(&mut self, value: &str) {
        self.filters.competitions.toggle(value);
        self.prune_teams();
    }

    /// An active team selection is never emptied: when no pick stays
    /// selectable the picks are kept and the view comes out empty.
    fn prune_teams(&mut self) {
        if self.dataset().is_none() || !self.filters.teams.is_active() {
            return;
        }
        let options = self.team_options();
        let mut pruned = self.filters.teams.clone();
        pruned.retain(|team| options.iter().any(|o| o == team));
        if pruned.is_empty() {
            debug!(
                "no team pick is selectable under the current competitions; keeping {}",
                self.filters.teams.values().join(", ")
            );
            return;
        }
        self.filters.teams = pruned;
    }

    /// Picks in `selection` that name no team in the active dataset.
    pub fn unknown_teams(&self, selection: &Selection) -> Vec<String> {
        let known = self
            .dataset()
            .map(|ds| ds.distinct_text(TEAM))
            .unwrap_or_default();
        selection
            .values()
            .iter()
            .filter(|v| v.as_str() != ALL && !known.contains(v))
            .cloned()
            .collect()
    }

    pub fn export_path(&self) -> PathBuf {
        self.config.export_dir.join(export::EXPORT_FILE_NAME)
    }

    pub fn export(&self, view: &Dataset) -> Result<ExportReport, ExportError> {
        export::export_to_path(view, &self.export_path())
    }
}
