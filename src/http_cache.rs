use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::loader::LoadError;

const CACHE_VERSION: u32 = 1;
const INDEX_FILE: &str = "downloads.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheIndex {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    file: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Downloads `url` into `cache_dir` and returns the local path. A previous copy
/// is revalidated with `If-None-Match`/`If-Modified-Since` and reused on 304.
pub fn download_cached(client: &Client, url: &str, cache_dir: &Path) -> Result<PathBuf, LoadError> {
    fs::create_dir_all(cache_dir).map_err(|source| LoadError::Io {
        path: cache_dir.to_path_buf(),
        source,
    })?;
    let mut index = load_index(cache_dir);
    let cached = index
        .entries
        .get(url)
        .filter(|e| cache_dir.join(&e.file).exists())
        .cloned();

    let mut req = client.get(url);
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().map_err(|source| LoadError::Network {
        url: url.to_string(),
        source,
    })?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached {
            debug!("{url} not modified; reusing {}", entry.file);
            return Ok(cache_dir.join(entry.file));
        }
    }
    if !status.is_success() {
        return Err(LoadError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    let headers = resp.headers().clone();
    let body = resp.bytes().map_err(|source| LoadError::Network {
        url: url.to_string(),
        source,
    })?;

    let file = cache_file_name(url);
    let path = cache_dir.join(&file);
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &body)
        .and_then(|_| fs::rename(&tmp, &path))
        .map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
    info!("downloaded {} bytes from {url}", body.len());

    let header_str = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    index.version = CACHE_VERSION;
    index.entries.insert(
        url.to_string(),
        CacheEntry {
            file,
            etag: header_str(ETAG),
            last_modified: header_str(LAST_MODIFIED),
            fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
        },
    );
    let _ = save_index(cache_dir, &index);
    Ok(path)
}

/// Stable per-URL file name that keeps the URL's extension for format detection.
pub fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = digest
        .iter()
        .take(12)
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    match url_extension(url) {
        Some(ext) => format!("{hex}.{ext}"),
        None => hex,
    }
}

pub fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn load_index(dir: &Path) -> CacheIndex {
    let Ok(raw) = fs::read_to_string(dir.join(INDEX_FILE)) else {
        return CacheIndex::default();
    };
    let index = serde_json::from_str::<CacheIndex>(&raw).unwrap_or_default();
    if index.version != CACHE_VERSION {
        return CacheIndex::default();
    }
    index
}

fn save_index(dir: &Path, index: &CacheIndex) -> std::io::Result<()> {
    let path = dir.join(INDEX_FILE);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(index).map_err(std::io::Error::other)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, &path)
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
