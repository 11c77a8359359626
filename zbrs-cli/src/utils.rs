//! Common utility functions shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use tracing::debug;
use zbrs_core::storage::{MemoryStore, RepositoryStore, SqliteStore};
use zbrs_core::{Severity, ValidationIssue, ValidationResult};

/// Read and parse a JSON document, tolerating a UTF-8 byte order mark.
pub fn load_json(path: &Path) -> Result<Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    let value = serde_json::from_slice(body)
        .map_err(|e| crate::exit_codes::CommandFailure::data(format!("Invalid JSON: {e}")))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Parsed JSON");
    Ok(value)
}

/// Open the SQLite store at `database`, or an in-memory store when absent.
pub async fn open_store(database: Option<&str>) -> Result<Arc<dyn RepositoryStore>> {
    match database {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .with_context(|| format!("Failed to open database {url}"))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// One line per issue: severity, code, path and message.
pub fn format_issue(issue: &ValidationIssue) -> String {
    let label = match issue.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    match &issue.path {
        Some(path) if !path.is_empty() => {
            format!("{label} [{}] {}: {}", issue.code, path.dimmed(), issue.message)
        }
        _ => format!("{label} [{}] {}", issue.code, issue.message),
    }
}

/// Print every error and warning of a validation result.
pub fn print_issues(result: &ValidationResult, indent: &str) {
    for issue in result.errors.iter().chain(&result.warnings) {
        println!("{indent}{}", format_issue(issue));
    }
}

/// Format a millisecond duration for humans.
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    }
}
