//! Pipeline configuration
//!
//! Handles loading the security policy and discovery settings from
//! environment variables with sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Security policy shared by the validator and discovery.
///
/// Built once per pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Accept plain `http://` URLs (default: false)
    pub allow_http: bool,
    /// Maximum declared repository size in bytes (default: 500 MiB)
    pub max_repository_size: u64,
    /// Maximum size of a single downloaded file in bytes (default: 50 MiB)
    pub max_file_size: u64,
    /// When non-empty, only these domains (and their subdomains) are accepted
    pub allowed_domains: Vec<String>,
    /// Domains (and their subdomains) that are always rejected
    pub blocked_domains: Vec<String>,
    /// Manifests must carry content checksums (default: true)
    pub require_checksums: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allow_http: false,
            max_repository_size: 500 * MIB,
            max_file_size: 50 * MIB,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            require_checksums: true,
        }
    }
}

impl SecurityPolicy {
    /// Load the policy from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allow_http = std::env::var("ZBRS_ALLOW_HTTP")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(defaults.allow_http);

        let max_repository_size = std::env::var("ZBRS_MAX_REPOSITORY_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|mb| mb * MIB)
            .unwrap_or(defaults.max_repository_size);

        let max_file_size = std::env::var("ZBRS_MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|mb| mb * MIB)
            .unwrap_or(defaults.max_file_size);

        let allowed_domains = std::env::var("ZBRS_ALLOWED_DOMAINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let blocked_domains = std::env::var("ZBRS_BLOCKED_DOMAINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        // Checksums required by default, can be relaxed with ZBRS_REQUIRE_CHECKSUMS=false
        let require_checksums = std::env::var("ZBRS_REQUIRE_CHECKSUMS")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.require_checksums);

        Self {
            allow_http,
            max_repository_size,
            max_file_size,
            allowed_domains,
            blocked_domains,
            require_checksums,
        }
    }

    /// Whether `host` equals or is a subdomain of any domain in `list`.
    pub(crate) fn host_matches(host: &str, list: &[String]) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        list.iter().any(|domain| {
            let domain = domain.trim_start_matches('.').to_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }

    pub fn is_blocked(&self, host: &str) -> bool {
        Self::host_matches(host, &self.blocked_domains)
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_domains.is_empty() || Self::host_matches(host, &self.allowed_domains)
    }
}

/// Settings for one discovery/import pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: SecurityPolicy,
    /// Repository index URLs consulted by `discover_repositories`
    pub sources: Vec<String>,
    /// Timeout for manifest and index fetches (default: 30s)
    pub json_timeout: Duration,
    /// Timeout for book and bulk downloads (default: 60s)
    pub download_timeout: Duration,
    /// Lifetime of cached repository indexes (default: 5 minutes)
    pub cache_ttl: Duration,
    /// Retry attempts for transient HTTP failures (default: 3)
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: SecurityPolicy::default(),
            sources: Vec::new(),
            json_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
            max_retries: 3,
            user_agent: format!("zbrs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let sources = std::env::var("ZBRS_SOURCES")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let json_timeout = std::env::var("ZBRS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.json_timeout);

        let download_timeout = std::env::var("ZBRS_DOWNLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.download_timeout);

        let max_retries = std::env::var("ZBRS_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        Self {
            policy: SecurityPolicy::from_env(),
            sources,
            json_timeout,
            download_timeout,
            max_retries,
            ..defaults
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
