//! Import options, progress events and results.

use serde::{Deserialize, Serialize};

use super::validation::{ValidationIssue, ValidationResult};

/// Options for one import invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Repository URL or local path (directory or `manifest.json`).
    pub url: String,
    /// Replace an already imported repository with the same id.
    #[serde(default)]
    pub overwrite_existing: bool,
    /// Verify declared book and child-manifest checksums before persisting.
    #[serde(default = "default_true")]
    pub validate_checksums: bool,
}

fn default_true() -> bool {
    true
}

impl ImportOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            overwrite_existing: false,
            validate_checksums: true,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn checksums(mut self, validate: bool) -> Self {
        self.validate_checksums = validate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Discovering,
    Validating,
    Downloading,
    Processing,
    Complete,
    Error,
}

impl std::fmt::Display for ImportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Discovering => "discovering",
            Self::Validating => "validating",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Transient progress event emitted while an import runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub stage: ImportStage,
    /// 0..=100
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_book: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_books: Option<usize>,
}

impl ImportProgress {
    pub fn new(stage: ImportStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
            current_book: None,
            total_books: None,
        }
    }

    pub fn with_books(mut self, current: usize, total: usize) -> Self {
        self.current_book = Some(current);
        self.total_books = Some(total);
        self
    }
}

/// Final outcome of one import invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    pub books_imported: usize,
    #[serde(default)]
    pub translations_imported: Vec<String>,
    #[serde(default)]
    pub translations_skipped: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
    pub duration_ms: u64,
}

impl ImportResult {
    pub(crate) fn absorb(&mut self, validation: ValidationResult) {
        self.errors.extend(validation.errors);
        self.warnings.extend(validation.warnings);
    }
}
