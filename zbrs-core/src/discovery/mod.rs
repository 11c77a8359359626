//! Repository discovery.
//!
//! Locates repository indexes and manifests over HTTP(S) or on the local
//! filesystem, validates what it fetches, and resolves the concrete list of
//! book files a translation ships.
//!
//! ## Features
//!
//! - Index fan-out across configured sources, merged by repository id
//! - In-memory index cache with a fixed time-to-live
//! - BOM-tolerant JSON parsing; unparsable bodies surface as network errors
//! - Size-capped downloads that abort mid-stream
//! - Directory-convention book discovery for local and GitHub-hosted trees

mod http_client;
mod scan;

pub use scan::{DirectoryScan, HierarchicalScan, ScanError, ScannedRepository, ScannedTranslation};

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub(crate) use self::http_client::parse_json;
use self::http_client::{FetchClient, FetchKind};
use crate::checksum;
use crate::config::{PipelineConfig, SecurityPolicy};
use crate::error::{Result, ZbrsError};
use crate::model::{
    IndexEntry, RepositoryIndex, TranslationManifest, TranslationReference, TranslationStatus,
    ZbrsManifest,
};
use crate::validator::Validator;

const MANIFEST_FILE: &str = "manifest.json";
const BOOKS_DIR: &str = "books";
const GITHUB_RAW_HOST: &str = "raw.githubusercontent.com";
const GITHUB_API: &str = "https://api.github.com";

/// Cached index with expiration
struct CachedIndex {
    index: RepositoryIndex,
    expires_at: Instant,
}

/// A source that could not be read during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Outcome of fanning out across every configured source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Unique by id; the first source listing an id wins.
    pub repositories: Vec<IndexEntry>,
    pub failures: Vec<SourceFailure>,
}

/// GitHub contents API entry.
#[derive(Debug, Deserialize)]
struct GithubContent {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

pub struct DiscoveryService {
    client: FetchClient,
    validator: Arc<Validator>,
    sources: Vec<String>,
    cache: DashMap<String, CachedIndex>,
    cache_ttl: Duration,
}

impl DiscoveryService {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let policy = Arc::new(config.policy.clone());
        Ok(Self {
            client: FetchClient::new(config)?,
            validator: Arc::new(Validator::new(policy)?),
            sources: config.sources.clone(),
            cache: DashMap::new(),
            cache_ttl: config.cache_ttl,
        })
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn policy(&self) -> &SecurityPolicy {
        self.validator.policy()
    }

    /// Fan out across every configured source.
    ///
    /// A failing source is recorded and skipped; it never aborts the others.
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn discover_repositories(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for source in &self.sources {
            match self.fetch_repository_index(source).await {
                Ok(index) => {
                    for entry in index.repositories {
                        if report.repositories.iter().any(|r| r.id == entry.id) {
                            debug!(id = %entry.id, source = %source, "Duplicate repository id, keeping first");
                            continue;
                        }
                        report.repositories.push(entry);
                    }
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Repository source failed");
                    report.failures.push(SourceFailure {
                        source: source.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            repositories = report.repositories.len(),
            failures = report.failures.len(),
            "Discovery complete"
        );
        report
    }

    /// Fetch an index document, served from cache while fresh.
    #[instrument(skip(self))]
    pub async fn fetch_repository_index(&self, url: &str) -> Result<RepositoryIndex> {
        if let Some(entry) = self.cache.get(url) {
            if entry.expires_at > Instant::now() {
                debug!("Index served from cache");
                return Ok(entry.index.clone());
            }
        }
        self.cache.remove(url);

        let location = self.checked_location(url)?;
        let (_, raw) = self
            .client
            .fetch_json(&location, self.policy().max_file_size)
            .await?;
        let index = RepositoryIndex::from_value(raw)
            .map_err(|e| ZbrsError::network(location.as_str(), e.to_string()))?;

        self.cache.insert(
            url.to_string(),
            CachedIndex {
                index: index.clone(),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );
        Ok(index)
    }

    /// Fetch a manifest without validating its content.
    ///
    /// Returns the normalized manifest URL, the raw bytes and the parsed
    /// document.
    #[instrument(skip(self))]
    pub async fn fetch_manifest_document(&self, url: &str) -> Result<(Url, Vec<u8>, Value)> {
        let location = manifest_url(&self.resolve_location(url)?)?;
        self.ensure_allowed(&location)?;

        let (bytes, raw) = self
            .client
            .fetch_json(&location, self.policy().max_file_size)
            .await?;
        debug!(url = %location, bytes = bytes.len(), "Fetched manifest");
        Ok((location, bytes, raw))
    }

    /// Fetch and validate a manifest.
    pub async fn fetch_repository_manifest(&self, url: &str) -> Result<ZbrsManifest> {
        let (location, _, raw) = self.fetch_manifest_document(url).await?;

        let result = self.validator.validate_manifest(&raw);
        if !result.is_valid() {
            return Err(ZbrsError::InvalidManifest {
                url: location.to_string(),
                result,
            });
        }
        ZbrsManifest::from_value(raw)
    }

    /// Fetch the translation manifest in `directory` under a parent.
    pub async fn fetch_translation_manifest(
        &self,
        parent_url: &str,
        directory: &str,
    ) -> Result<TranslationManifest> {
        let parent = manifest_url(&self.resolve_location(parent_url)?)?;
        let child = join_url(&base_url(&parent), directory)?;

        match self.fetch_repository_manifest(child.as_str()).await? {
            ZbrsManifest::Translation(manifest) => Ok(manifest),
            ZbrsManifest::Parent(_) => Err(ZbrsError::Decode(format!(
                "Expected a translation manifest in '{directory}', found a parent"
            ))),
        }
    }

    /// List the translations reachable from `url`.
    ///
    /// A translation manifest yields one synthetic reference to itself.
    pub async fn discover_translations(&self, url: &str) -> Result<Vec<TranslationReference>> {
        Ok(match self.fetch_repository_manifest(url).await? {
            ZbrsManifest::Parent(parent) => parent.translations,
            ZbrsManifest::Translation(translation) => vec![TranslationReference {
                id: translation.repository.id,
                name: translation.repository.name,
                directory: ".".to_string(),
                language: translation.repository.language.code,
                status: TranslationStatus::Active,
                checksum: translation.technical.checksum,
            }],
        })
    }

    /// Download a file, capped at `max_size` bytes (policy limit by default).
    #[instrument(skip(self))]
    pub async fn download_file(&self, url: &str, max_size: Option<u64>) -> Result<Vec<u8>> {
        let location = self.checked_location(url)?;
        let cap = max_size.unwrap_or(self.policy().max_file_size);
        self.client.fetch(&location, FetchKind::Download, cap).await
    }

    /// Fetch a JSON document (BOM tolerant) from a URL or local path.
    pub async fn fetch_json(&self, url: &str) -> Result<Value> {
        let location = self.checked_location(url)?;
        let (_, value) = self
            .client
            .fetch_json(&location, self.policy().max_file_size)
            .await?;
        Ok(value)
    }

    /// Fetch raw bytes with the policy's file size cap.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.download_file(url, None).await
    }

    pub fn calculate_checksum(&self, bytes: &[u8]) -> String {
        checksum::calculate_checksum(bytes)
    }

    /// Resolve the book files of a translation whose manifest has no book list.
    ///
    /// Returns paths relative to `base`, e.g. `books/01-genesis.json`,
    /// ordered with numeric-aware comparison.
    #[instrument(skip(self))]
    pub async fn list_book_files(&self, base: &str) -> Result<Vec<String>> {
        let base = self.resolve_location(base)?;
        let mut names = match base.scheme() {
            "file" => list_local_books(&base).await?,
            _ if base.host_str() == Some(GITHUB_RAW_HOST) => self.list_github_books(&base).await?,
            _ => {
                return Err(ZbrsError::network(
                    base.as_str(),
                    "Manifest has no book list and the host does not support directory listing",
                ))
            }
        };

        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names
            .into_iter()
            .map(|name| format!("{BOOKS_DIR}/{name}"))
            .collect())
    }

    async fn list_github_books(&self, base: &Url) -> Result<Vec<String>> {
        let segments: Vec<&str> = base
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let [owner, repo, branch, rest @ ..] = segments.as_slice() else {
            return Err(ZbrsError::network(
                base.as_str(),
                "Expected a raw.githubusercontent.com/<owner>/<repo>/<branch> URL",
            ));
        };

        let mut dir = rest.join("/");
        if !dir.is_empty() {
            dir.push('/');
        }
        let api = format!("{GITHUB_API}/repos/{owner}/{repo}/contents/{dir}{BOOKS_DIR}?ref={branch}");
        let api = Url::parse(&api).map_err(|e| ZbrsError::network(&api, e.to_string()))?;

        let (_, raw) = self
            .client
            .fetch_json(&api, self.policy().max_file_size)
            .await?;
        let entries: Vec<GithubContent> = serde_json::from_value(raw)
            .map_err(|e| ZbrsError::network(api.as_str(), format!("Unexpected listing: {e}")))?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "file" && entry.name.ends_with(".json"))
            .map(|entry| entry.name)
            .collect())
    }

    /// Turn a URL or local filesystem path into a URL.
    pub fn resolve_location(&self, input: &str) -> Result<Url> {
        resolve_location(input)
    }

    /// Resolve `input` and reject it unless the policy accepts it.
    fn checked_location(&self, input: &str) -> Result<Url> {
        let location = self.resolve_location(input)?;
        self.ensure_allowed(&location)?;
        Ok(location)
    }

    fn ensure_allowed(&self, location: &Url) -> Result<()> {
        let result = self.validator.validate_repository_url(location.as_str());
        if result.is_valid() {
            return Ok(());
        }
        let reasons: Vec<String> = result.errors.iter().map(|e| e.message.clone()).collect();
        Err(ZbrsError::network(location.as_str(), reasons.join("; ")))
    }
}

async fn list_local_books(base: &Url) -> Result<Vec<String>> {
    let dir = base
        .to_file_path()
        .map_err(|()| ZbrsError::network(base.as_str(), "Not a local path"))?
        .join(BOOKS_DIR);

    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| ZbrsError::io(&dir, e))?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| ZbrsError::io(&dir, e))? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && entry.path().is_file() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Accept an absolute URL or a filesystem path.
pub(crate) fn resolve_location(input: &str) -> Result<Url> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        // Single-letter schemes are Windows drive letters.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    let path = Path::new(input);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ZbrsError::io(path, e))?
            .join(path)
    };

    let url = if absolute.is_dir() {
        Url::from_directory_path(&absolute)
    } else {
        Url::from_file_path(&absolute)
    };
    url.map_err(|()| ZbrsError::network(input, "Not a valid URL or path"))
}

/// Point `url` at its `manifest.json`.
pub(crate) fn manifest_url(url: &Url) -> Result<Url> {
    if url.path().ends_with(MANIFEST_FILE) {
        return Ok(url.clone());
    }

    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    let separator = if base.path().ends_with('/') { "" } else { "/" };
    let normalized = format!("{}{separator}{MANIFEST_FILE}", base.as_str());
    Url::parse(&normalized).map_err(|e| ZbrsError::network(url.as_str(), e.to_string()))
}

/// Directory URL of a manifest, without `manifest.json` or a trailing slash.
pub(crate) fn base_url(manifest: &Url) -> String {
    let raw = manifest.as_str();
    raw.strip_suffix(MANIFEST_FILE)
        .unwrap_or(raw)
        .trim_end_matches('/')
        .to_string()
}

/// Append a relative path to a base URL string.
pub(crate) fn join_url(base: &str, relative: &str) -> Result<Url> {
    let relative = relative.trim_start_matches("./").trim_start_matches('/');
    let joined = if relative.is_empty() || relative == "." {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), relative)
    };
    Url::parse(&joined).map_err(|e| ZbrsError::network(&joined, e.to_string()))
}

/// Compare names so that embedded numbers sort by value (`2` before `10`).
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let (a_chunk, a_rest) = split_chunk(a);
        let (b_chunk, b_rest) = split_chunk(b);
        let a_num = a_chunk.starts_with(|c: char| c.is_ascii_digit());
        let b_num = b_chunk.starts_with(|c: char| c.is_ascii_digit());

        let ord = if a_num && b_num {
            let a_trim = a_chunk.trim_start_matches('0');
            let b_trim = b_chunk.trim_start_matches('0');
            a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim))
                .then_with(|| a_chunk.len().cmp(&b_chunk.len()))
        } else {
            a_chunk.cmp(b_chunk)
        };
        if ord != Ordering::Equal {
            return ord;
        }
        a = a_rest;
        b = b_rest;
    }
}

/// Split off the leading run of digits or non-digits.
fn split_chunk(s: &str) -> (&str, &str) {
    let digits = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    s.split_at(end)
}
