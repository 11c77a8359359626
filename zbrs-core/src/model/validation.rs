//! Validation outcome types shared by the validator, discovery and importer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable code of a validation error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // Structure
    SchemaViolation,
    UnknownManifestType,
    InvalidRepositoryType,
    MissingPublisher,
    NoTranslations,
    MissingContent,
    MissingLanguage,
    MissingTranslationInfo,
    DuplicateTranslationIds,
    DuplicateTranslationDirectories,
    DeprecatedTranslation,
    UnsafeBookPath,

    // Business rules
    BookCountMismatch,
    BookListCountMismatch,
    NonStandardCanon,
    RepositoryTooLarge,

    // Security
    MissingChecksum,
    InsecurePublisherUrl,
    InvalidPublisherUrl,
    BlockedDomain,
    DomainNotAllowed,
    InvalidUrl,
    UnsupportedProtocol,
    InsecureProtocol,

    // Books
    BookOrderMismatch,
    ChapterCountMismatch,
    IncorrectChapterNumber,
    IncorrectVerseNumber,
    EmptyVerseText,
    VerseCountMismatch,

    // Import pipeline
    NetworkError,
    ChecksumMismatch,
    RepositoryExists,
    TranslationImportFailed,
    TranslationNotFound,
    TranslationSkipped,
    NoBooksFound,
    NoBooksImported,
    BookSkipped,
    StorageError,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaViolation => "SCHEMA_VIOLATION",
            Self::UnknownManifestType => "UNKNOWN_MANIFEST_TYPE",
            Self::InvalidRepositoryType => "INVALID_REPOSITORY_TYPE",
            Self::MissingPublisher => "MISSING_PUBLISHER",
            Self::NoTranslations => "NO_TRANSLATIONS",
            Self::MissingContent => "MISSING_CONTENT",
            Self::MissingLanguage => "MISSING_LANGUAGE",
            Self::MissingTranslationInfo => "MISSING_TRANSLATION_INFO",
            Self::DuplicateTranslationIds => "DUPLICATE_TRANSLATION_IDS",
            Self::DuplicateTranslationDirectories => "DUPLICATE_TRANSLATION_DIRECTORIES",
            Self::DeprecatedTranslation => "DEPRECATED_TRANSLATION",
            Self::UnsafeBookPath => "UNSAFE_BOOK_PATH",
            Self::BookCountMismatch => "BOOK_COUNT_MISMATCH",
            Self::BookListCountMismatch => "BOOK_LIST_COUNT_MISMATCH",
            Self::NonStandardCanon => "NON_STANDARD_CANON",
            Self::RepositoryTooLarge => "REPOSITORY_TOO_LARGE",
            Self::MissingChecksum => "MISSING_CHECKSUM",
            Self::InsecurePublisherUrl => "INSECURE_PUBLISHER_URL",
            Self::InvalidPublisherUrl => "INVALID_PUBLISHER_URL",
            Self::BlockedDomain => "BLOCKED_DOMAIN",
            Self::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            Self::InvalidUrl => "INVALID_URL",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::InsecureProtocol => "INSECURE_PROTOCOL",
            Self::BookOrderMismatch => "BOOK_ORDER_MISMATCH",
            Self::ChapterCountMismatch => "CHAPTER_COUNT_MISMATCH",
            Self::IncorrectChapterNumber => "INCORRECT_CHAPTER_NUMBER",
            Self::IncorrectVerseNumber => "INCORRECT_VERSE_NUMBER",
            Self::EmptyVerseText => "EMPTY_VERSE_TEXT",
            Self::VerseCountMismatch => "VERSE_COUNT_MISMATCH",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Self::RepositoryExists => "REPOSITORY_EXISTS",
            Self::TranslationImportFailed => "TRANSLATION_IMPORT_FAILED",
            Self::TranslationNotFound => "TRANSLATION_NOT_FOUND",
            Self::TranslationSkipped => "TRANSLATION_SKIPPED",
            Self::NoBooksFound => "NO_BOOKS_FOUND",
            Self::NoBooksImported => "NO_BOOKS_IMPORTED",
            Self::BookSkipped => "BOOK_SKIPPED",
            Self::StorageError => "STORAGE_ERROR",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation error or warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    /// JSON pointer into the validated document, e.g. `/chapters/2/number`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            severity: Severity::Error,
            details: None,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            severity: Severity::Warning,
            details: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {} (at {})", self.code, self.message, path),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Outcome of validating one document.
///
/// Validity is derived from the error list, so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an issue in the list matching its severity.
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn error(&mut self, code: IssueCode, message: impl Into<String>, path: impl Into<String>) {
        self.push(ValidationIssue::error(code, message).at(path));
    }

    pub fn warning(&mut self, code: IssueCode, message: impl Into<String>, path: impl Into<String>) {
        self.push(ValidationIssue::warning(code, message).at(path));
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            valid: bool,
            errors: &'a [ValidationIssue],
            warnings: &'a [ValidationIssue],
        }

        Wire {
            valid: self.is_valid(),
            errors: &self.errors,
            warnings: &self.warnings,
        }
        .serialize(serializer)
    }
}

/// Result of comparing a file's digest with the expected one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub valid: bool,
    pub expected: String,
    /// `sha256:<hex>` of the bytes read, empty when the file was unreadable.
    pub actual: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
