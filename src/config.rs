use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_URL: &str =
    "https://github.com/LeScott2406/StatsApp/raw/refs/heads/main/updated_player_stats.xlsx";

const CACHE_DIR: &str = "obv_terminal";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Competition -> matches per season, plus the policy for competitions the
/// table does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTable {
    #[serde(default)]
    pub competitions: BTreeMap<String, u32>,
    /// Used for unmapped competitions. `None` leaves them missing.
    #[serde(default)]
    pub fallback_matches: Option<u32>,
}

impl Default for MatchTable {
    fn default() -> Self {
        let competitions = [("1. Bundesliga", 15), ("1. HNL", 18)]
            .into_iter()
            .map(|(name, n)| (name.to_string(), n))
            .collect();
        Self {
            competitions,
            fallback_matches: None,
        }
    }
}

impl MatchTable {
    pub fn new<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u32)>,
    {
        Self {
            competitions: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fallback_matches: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<u32>) -> Self {
        self.fallback_matches = fallback;
        self
    }

    pub fn matches_for(&self, competition: &str) -> Option<u32> {
        self.competitions
            .get(competition)
            .copied()
            .or(self.fallback_matches)
    }

    pub fn is_mapped(&self, competition: &str) -> bool {
        self.competitions.contains_key(competition)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read match table {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse match table {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub match_table: MatchTable,
    pub data_url: String,
    pub export_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let tmp = env::temp_dir();
        Self {
            match_table: MatchTable::default(),
            data_url: DEFAULT_DATA_URL.to_string(),
            export_dir: tmp.clone(),
            cache_dir: tmp.join(CACHE_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Reads `OBV_*` variables. Call `dotenvy` first if `.env` files should apply.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = non_empty_var("OBV_MATCH_TABLE") {
            config.match_table = MatchTable::load(Path::new(&path))?;
        }
        if let Some(raw) = non_empty_var("OBV_FALLBACK_MATCHES") {
            let n = raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("OBV_FALLBACK_MATCHES is not a count: {raw}"))?;
            config.match_table.fallback_matches = Some(n);
        }
        if let Some(url) = non_empty_var("OBV_DATA_URL") {
            config.data_url = url;
        }
        if let Some(dir) = non_empty_var("OBV_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_var("OBV_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        let timeout = env::var("OBV_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            .clamp(1, 600);
        config.request_timeout = Duration::from_secs(timeout);

        Ok(config)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
