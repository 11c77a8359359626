//! Manifest, book, URL and file integrity validation.
//!
//! The validator never fails on defects in its input. Every check returns a
//! [`ValidationResult`] so callers decide whether to proceed.
//!
//! Checks run in this order, stopping only when the schema check fails:
//!
//! 1. JSON Schema conformance (one error per violation, path = JSON pointer)
//! 2. Shape-specific structure (parent type, publisher, duplicates, content)
//! 3. Business rules (testament counts, canon split, declared size)
//! 4. Security rules (checksums, publisher URL, domains)

mod schema;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::checksum::calculate_checksum;
use crate::config::SecurityPolicy;
use crate::error::{Result, ZbrsError};
use crate::model::{
    IntegrityCheck, IssueCode, ManifestKind, ParentManifest, TechnicalInfo, TranslationManifest,
    TranslationStatus, ValidationIssue, ValidationResult, ZbrsBook,
};

/// Number of books in the standard Protestant canon and its split.
const STANDARD_CANON: (u32, u32, u32) = (66, 39, 27);

/// Stateless-per-call validator bound to one security policy.
pub struct Validator {
    policy: Arc<SecurityPolicy>,
    parent_schema: jsonschema::Validator,
    translation_schema: jsonschema::Validator,
    book_schema: jsonschema::Validator,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Compile the built-in schemas for the given policy.
    pub fn new(policy: Arc<SecurityPolicy>) -> Result<Self> {
        Ok(Self {
            policy,
            parent_schema: compile(&schema::parent_manifest_schema())?,
            translation_schema: compile(&schema::translation_manifest_schema())?,
            book_schema: compile(&schema::book_schema())?,
        })
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Validate a manifest of either shape.
    pub fn validate_manifest(&self, raw: &Value) -> ValidationResult {
        match ManifestKind::classify(raw) {
            Some(ManifestKind::Parent) => self.validate_parent_manifest(raw),
            Some(ManifestKind::Translation) => self.validate_translation_manifest(raw),
            None => {
                let mut result = ValidationResult::new();
                result.error(
                    IssueCode::UnknownManifestType,
                    "Manifest is neither a parent (translations + publisher) nor a translation (content)",
                    "",
                );
                result
            }
        }
    }

    pub fn validate_parent_manifest(&self, raw: &Value) -> ValidationResult {
        let mut result = schema_check(&self.parent_schema, raw);
        if !result.is_valid() {
            return result;
        }

        let Some(manifest) = decode::<ParentManifest>(raw, &mut result) else {
            return result;
        };

        self.check_parent_structure(&manifest, &mut result);
        self.check_declared_size(&manifest.technical, &mut result);
        self.check_parent_security(&manifest, &mut result);
        result
    }

    pub fn validate_translation_manifest(&self, raw: &Value) -> ValidationResult {
        let mut result = schema_check(&self.translation_schema, raw);
        if !result.is_valid() {
            return result;
        }

        check_translation_blocks(raw, &mut result);
        if !result.is_valid() {
            return result;
        }

        let Some(manifest) = decode::<TranslationManifest>(raw, &mut result) else {
            return result;
        };

        check_translation_content(&manifest, &mut result);
        self.check_declared_size(&manifest.technical, &mut result);
        self.check_translation_security(&manifest, &mut result);
        result
    }

    /// Validate a book file. `expected_order` is the canonical position the
    /// caller expects this book to occupy, when known.
    pub fn validate_book(&self, raw: &Value, expected_order: Option<u32>) -> ValidationResult {
        self.check_book(raw, expected_order).0
    }

    /// Validate a book and hand back the decoded content when it parsed.
    pub(crate) fn check_book(
        &self,
        raw: &Value,
        expected_order: Option<u32>,
    ) -> (ValidationResult, Option<ZbrsBook>) {
        let mut result = schema_check(&self.book_schema, raw);
        if !result.is_valid() {
            return (result, None);
        }
        let Some(book) = decode::<ZbrsBook>(raw, &mut result) else {
            return (result, None);
        };

        if let Some(expected) = expected_order {
            if book.book.order != expected {
                result.push(
                    ValidationIssue::error(
                        IssueCode::BookOrderMismatch,
                        format!(
                            "Book '{}' declares order {} but was expected at position {}",
                            book.book.id, book.book.order, expected
                        ),
                    )
                    .at("/book/order")
                    .with_details(json!({ "expected": expected, "actual": book.book.order })),
                );
            }
        }

        if book.book.chapters_count as usize != book.chapters.len() {
            result.push(
                ValidationIssue::error(
                    IssueCode::ChapterCountMismatch,
                    format!(
                        "Book declares {} chapters but contains {}",
                        book.book.chapters_count,
                        book.chapters.len()
                    ),
                )
                .at("/book/chapters_count")
                .with_details(json!({
                    "declared": book.book.chapters_count,
                    "actual": book.chapters.len()
                })),
            );
        }

        for (ci, chapter) in book.chapters.iter().enumerate() {
            let expected_chapter = ci as u32 + 1;
            if chapter.number != expected_chapter {
                result.push(
                    ValidationIssue::error(
                        IssueCode::IncorrectChapterNumber,
                        format!(
                            "Chapter at position {} is numbered {}",
                            expected_chapter, chapter.number
                        ),
                    )
                    .at(format!("/chapters/{ci}/number"))
                    .with_details(json!({ "expected": expected_chapter, "actual": chapter.number })),
                );
            }

            for (vi, verse) in chapter.verses.iter().enumerate() {
                let expected_verse = vi as u32 + 1;
                if verse.number != expected_verse {
                    result.push(
                        ValidationIssue::error(
                            IssueCode::IncorrectVerseNumber,
                            format!(
                                "Verse at position {} of chapter {} is numbered {}",
                                expected_verse, chapter.number, verse.number
                            ),
                        )
                        .at(format!("/chapters/{ci}/verses/{vi}/number"))
                        .with_details(json!({ "expected": expected_verse, "actual": verse.number })),
                    );
                }
                if verse.text.trim().is_empty() {
                    result.error(
                        IssueCode::EmptyVerseText,
                        format!("Verse {}:{} has no text", chapter.number, verse.number),
                        format!("/chapters/{ci}/verses/{vi}/text"),
                    );
                }
            }
        }

        let actual_verses = book.actual_verse_count();
        if actual_verses != book.book.verses_count as usize {
            result.push(
                ValidationIssue::error(
                    IssueCode::VerseCountMismatch,
                    format!(
                        "Book declares {} verses but contains {}",
                        book.book.verses_count, actual_verses
                    ),
                )
                .at("/book/verses_count")
                .with_details(json!({
                    "declared": book.book.verses_count,
                    "actual": actual_verses
                })),
            );
        }

        (result, Some(book))
    }

    /// Check that a repository URL uses an accepted protocol and domain.
    pub fn validate_repository_url(&self, raw_url: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                result.push(ValidationIssue::error(
                    IssueCode::InvalidUrl,
                    format!("Invalid URL '{raw_url}': {e}"),
                ));
                return result;
            }
        };

        match url.scheme() {
            "https" | "file" => {}
            "http" if self.policy.allow_http => {}
            "http" => {
                result.push(ValidationIssue::error(
                    IssueCode::InsecureProtocol,
                    format!("Plain HTTP is not allowed: {raw_url}"),
                ));
            }
            other => {
                result.push(ValidationIssue::error(
                    IssueCode::UnsupportedProtocol,
                    format!("Unsupported protocol '{other}' (expected http, https or file)"),
                ));
                return result;
            }
        }

        if url.scheme() == "file" {
            return result;
        }

        let Some(host) = url.host_str() else {
            result.push(ValidationIssue::error(
                IssueCode::InvalidUrl,
                format!("URL has no host: {raw_url}"),
            ));
            return result;
        };

        if self.policy.is_blocked(host) {
            result.push(ValidationIssue::error(
                IssueCode::BlockedDomain,
                format!("Domain '{host}' is blocked"),
            ));
        } else if !self.policy.is_allowed(host) {
            result.push(ValidationIssue::error(
                IssueCode::DomainNotAllowed,
                format!("Domain '{host}' is not on the allow list"),
            ));
        }

        result
    }

    /// Hash a file on disk and compare it with `expected_checksum`.
    ///
    /// Unreadable files yield a non-matching result with an empty digest.
    pub async fn validate_file_integrity(
        &self,
        path: impl AsRef<Path>,
        expected_checksum: &str,
    ) -> IntegrityCheck {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let actual = calculate_checksum(&bytes);
                debug!(path = %path.display(), bytes = bytes.len(), "Hashed file");
                IntegrityCheck {
                    valid: actual == expected_checksum,
                    expected: expected_checksum.to_string(),
                    actual,
                    error: None,
                }
            }
            Err(e) => IntegrityCheck {
                valid: false,
                expected: expected_checksum.to_string(),
                actual: String::new(),
                error: Some(format!("Failed to read {}: {e}", path.display())),
            },
        }
    }

    fn check_parent_structure(&self, manifest: &ParentManifest, result: &mut ValidationResult) {
        if manifest.repository.kind != "parent" {
            result.error(
                IssueCode::InvalidRepositoryType,
                format!(
                    "Parent manifest must declare type \"parent\", found \"{}\"",
                    manifest.repository.kind
                ),
                "/repository/type",
            );
        }

        if manifest.publisher.is_none() {
            result.error(
                IssueCode::MissingPublisher,
                "Parent manifest must declare a publisher",
                "/publisher",
            );
        }

        if manifest.translations.is_empty() {
            result.warning(
                IssueCode::NoTranslations,
                "Parent manifest declares no translations",
                "/translations",
            );
        }

        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut directories: HashMap<String, usize> = HashMap::new();
        for (i, reference) in manifest.translations.iter().enumerate() {
            if let Some(first) = ids.get(reference.id.as_str()) {
                result.push(
                    ValidationIssue::error(
                        IssueCode::DuplicateTranslationIds,
                        format!("Translation id '{}' is declared more than once", reference.id),
                    )
                    .at(format!("/translations/{i}/id"))
                    .with_details(json!({ "id": reference.id, "first_index": first })),
                );
            } else {
                ids.insert(&reference.id, i);
            }

            let directory = normalize_directory(&reference.directory);
            if let Some(first) = directories.get(&directory) {
                result.push(
                    ValidationIssue::error(
                        IssueCode::DuplicateTranslationDirectories,
                        format!(
                            "Translation directory '{}' is used more than once",
                            reference.directory
                        ),
                    )
                    .at(format!("/translations/{i}/directory"))
                    .with_details(json!({ "directory": reference.directory, "first_index": first })),
                );
            } else {
                directories.insert(directory, i);
            }

            if reference.status == TranslationStatus::Deprecated {
                result.warning(
                    IssueCode::DeprecatedTranslation,
                    format!("Translation '{}' is deprecated", reference.id),
                    format!("/translations/{i}/status"),
                );
            }
        }
    }

    fn check_declared_size(&self, technical: &TechnicalInfo, result: &mut ValidationResult) {
        if let Some(size) = technical.size {
            if size > self.policy.max_repository_size {
                result.push(
                    ValidationIssue::error(
                        IssueCode::RepositoryTooLarge,
                        format!(
                            "Declared size {} bytes exceeds the limit of {} bytes",
                            size, self.policy.max_repository_size
                        ),
                    )
                    .at("/technical/size")
                    .with_details(json!({ "size": size, "max": self.policy.max_repository_size })),
                );
            }
        }
    }

    fn check_parent_security(&self, manifest: &ParentManifest, result: &mut ValidationResult) {
        if self.policy.require_checksums {
            for (i, reference) in manifest.translations.iter().enumerate() {
                if reference.checksum.is_none() {
                    result.error(
                        IssueCode::MissingChecksum,
                        format!("Translation '{}' has no checksum", reference.id),
                        format!("/translations/{i}/checksum"),
                    );
                }
            }
        }

        let Some(url) = manifest.publisher.as_ref().and_then(|p| p.url.as_deref()) else {
            return;
        };
        match Url::parse(url) {
            Ok(parsed) => {
                if parsed.scheme() == "http" && !self.policy.allow_http {
                    result.warning(
                        IssueCode::InsecurePublisherUrl,
                        format!("Publisher URL uses plain HTTP: {url}"),
                        "/publisher/url",
                    );
                }
                if let Some(host) = parsed.host_str() {
                    if self.policy.is_blocked(host) {
                        result.error(
                            IssueCode::BlockedDomain,
                            format!("Publisher domain '{host}' is blocked"),
                            "/publisher/url",
                        );
                    }
                }
            }
            Err(e) => {
                result.error(
                    IssueCode::InvalidPublisherUrl,
                    format!("Publisher URL '{url}' is malformed: {e}"),
                    "/publisher/url",
                );
            }
        }
    }

    fn check_translation_security(
        &self,
        manifest: &TranslationManifest,
        result: &mut ValidationResult,
    ) {
        if self.policy.require_checksums && manifest.technical.checksum.is_none() {
            result.error(
                IssueCode::MissingChecksum,
                "Translation manifest has no technical checksum",
                "/technical/checksum",
            );
        }
    }
}

/// Presence of the blocks a translation manifest needs before it can decode.
fn check_translation_blocks(raw: &Value, result: &mut ValidationResult) {
    if raw.get("content").is_none_or(Value::is_null) {
        result.error(
            IssueCode::MissingContent,
            "Translation manifest must declare a content block",
            "/content",
        );
    }
    let repository = raw.get("repository");
    if repository.and_then(|r| r.get("language")).is_none_or(Value::is_null) {
        result.error(
            IssueCode::MissingLanguage,
            "Translation manifest must declare repository.language",
            "/repository/language",
        );
    }
    if repository.and_then(|r| r.get("translation")).is_none_or(Value::is_null) {
        result.error(
            IssueCode::MissingTranslationInfo,
            "Translation manifest must declare repository.translation",
            "/repository/translation",
        );
    }
}

fn check_translation_content(manifest: &TranslationManifest, result: &mut ValidationResult) {
    let content = &manifest.content;
    let (old, new) = (content.testament.old, content.testament.new);

    if old.checked_add(new) != Some(content.books_count) {
        result.push(
            ValidationIssue::error(
                IssueCode::BookCountMismatch,
                format!(
                    "Testament counts ({old} + {new}) do not match books_count {}",
                    content.books_count
                ),
            )
            .at("/content/books_count")
            .with_details(json!({ "old": old, "new": new, "books_count": content.books_count })),
        );
    }

    let (canon_total, canon_old, canon_new) = STANDARD_CANON;
    if content.books_count == canon_total && (old, new) != (canon_old, canon_new) {
        result.warning(
            IssueCode::NonStandardCanon,
            format!("66-book canon with a non-standard {old}/{new} split"),
            "/content/testament",
        );
    }

    if let Some(books) = &content.books {
        if books.len() != content.books_count as usize {
            result.warning(
                IssueCode::BookListCountMismatch,
                format!(
                    "Book list has {} entries but books_count is {}",
                    books.len(),
                    content.books_count
                ),
                "/content/books",
            );
        }
        for (i, book) in books.iter().enumerate() {
            if !is_safe_relative_path(&book.path) {
                result.error(
                    IssueCode::UnsafeBookPath,
                    format!("Book path '{}' must be relative to the translation", book.path),
                    format!("/content/books/{i}/path"),
                );
            }
        }
    }
}

/// A relative path with no scheme, no root and no parent traversal.
pub(crate) fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains("://")
        && !path.starts_with('/')
        && !path.starts_with('\\')
        && !path.contains(':')
        && path.split(['/', '\\']).all(|segment| segment != "..")
}

fn normalize_directory(directory: &str) -> String {
    directory
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string()
}

fn compile(schema: &Value) -> Result<jsonschema::Validator> {
    jsonschema::Validator::new(schema)
        .map_err(|e| ZbrsError::Schema(format!("Failed to compile schema: {e}")))
}

fn schema_check(schema: &jsonschema::Validator, raw: &Value) -> ValidationResult {
    let mut result = ValidationResult::new();
    if let Err(errors) = schema.validate(raw) {
        for error in errors {
            result.error(
                IssueCode::SchemaViolation,
                error.to_string(),
                error.instance_path.to_string(),
            );
        }
    }
    result
}

fn decode<T: DeserializeOwned>(raw: &Value, result: &mut ValidationResult) -> Option<T> {
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            result.error(IssueCode::SchemaViolation, e.to_string(), "");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(Arc::new(SecurityPolicy::default())).unwrap()
    }

    fn validator_with(policy: SecurityPolicy) -> Validator {
        Validator::new(Arc::new(policy)).unwrap()
    }

    fn digest(seed: &str) -> String {
        calculate_checksum(seed.as_bytes())
    }

    fn translation_manifest(old: u32, new: u32, total: u32) -> Value {
        json!({
            "zbrs_version": "1.0",
            "repository": {
                "id": "web",
                "name": "World English Bible",
                "version": "1.0.0",
                "language": { "code": "en", "name": "English", "direction": "ltr" },
                "translation": { "type": "dynamic", "year": 2000 }
            },
            "content": {
                "books_count": total,
                "testament": { "old": old, "new": new }
            },
            "technical": { "encoding": "UTF-8", "checksum": digest("web") }
        })
    }

    fn parent_manifest(translations: Value) -> Value {
        json!({
            "zbrs_version": "1.2",
            "repository": {
                "id": "bibles",
                "name": "Bible Collection",
                "version": "2.0.0",
                "type": "parent"
            },
            "publisher": { "name": "Example Society", "url": "https://bibles.example.org" },
            "translations": translations,
            "technical": { "encoding": "UTF-8" }
        })
    }

    fn reference(id: &str, directory: &str) -> Value {
        json!({
            "id": id,
            "name": id.to_uppercase(),
            "directory": directory,
            "language": "en",
            "status": "active",
            "checksum": digest(id)
        })
    }

    fn book(chapters: Value, chapters_count: u32, verses_count: u32) -> Value {
        json!({
            "book": {
                "id": "gen", "name": "Genesis", "abbreviation": "Gen", "order": 1,
                "testament": "old", "chapters_count": chapters_count, "verses_count": verses_count
            },
            "chapters": chapters
        })
    }

    fn chapter(number: u32, verses: u32) -> Value {
        let verses: Vec<Value> = (1..=verses)
            .map(|n| json!({ "number": n, "text": format!("verse {n}") }))
            .collect();
        json!({ "number": number, "verses": verses })
    }

    #[test]
    fn test_valid_translation_manifest() {
        let result = validator().validate_manifest(&translation_manifest(39, 27, 66));
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_book_count_mismatch_iff_sum_differs() {
        let v = validator();
        for (old, new, total) in [(39, 27, 66), (39, 27, 65), (1, 1, 2), (2, 0, 3), (0, 0, 0)] {
            let result = v.validate_manifest(&translation_manifest(old, new, total));
            assert_eq!(
                result.has_error(IssueCode::BookCountMismatch),
                old + new != total,
                "old={old} new={new} total={total}"
            );
            assert_eq!(result.is_valid(), result.errors.is_empty());
        }
    }

    #[test]
    fn test_testament_counts_near_u32_max() {
        let result =
            validator().validate_manifest(&translation_manifest(4_000_000_000, 4_000_000_000, 4));
        assert!(result.has_error(IssueCode::BookCountMismatch));
        assert!(!result.is_valid());

        let result = validator().validate_manifest(&translation_manifest(u32::MAX, 0, u32::MAX));
        assert!(!result.has_error(IssueCode::BookCountMismatch));
    }

    #[test]
    fn test_non_standard_canon_is_warning() {
        let result = validator().validate_manifest(&translation_manifest(40, 26, 66));
        assert!(result.is_valid());
        assert!(result.has_warning(IssueCode::NonStandardCanon));
    }

    #[test]
    fn test_schema_failure_short_circuits() {
        let mut raw = translation_manifest(39, 27, 66);
        raw["repository"]["version"] = json!("1.0");
        raw["technical"]["checksum"] = json!("md5:abc");
        raw["content"]["testament"]["old"] = json!(1);

        let result = validator().validate_manifest(&raw);
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .all(|e| e.code == IssueCode::SchemaViolation));
        assert!(result
            .errors
            .iter()
            .any(|e| e.path.as_deref() == Some("/repository/version")));
        assert!(result
            .errors
            .iter()
            .any(|e| e.path.as_deref() == Some("/technical/checksum")));
    }

    #[test]
    fn test_zbrs_version_pattern() {
        let mut raw = translation_manifest(39, 27, 66);
        raw["zbrs_version"] = json!("2.0");
        let result = validator().validate_manifest(&raw);
        assert!(result.has_error(IssueCode::SchemaViolation));
    }

    #[test]
    fn test_missing_translation_checksum_under_policy() {
        let mut raw = translation_manifest(39, 27, 66);
        raw["technical"].as_object_mut().unwrap().remove("checksum");

        let strict = validator().validate_manifest(&raw);
        assert!(strict.has_error(IssueCode::MissingChecksum));

        let relaxed = validator_with(SecurityPolicy {
            require_checksums: false,
            ..SecurityPolicy::default()
        })
        .validate_manifest(&raw);
        assert!(relaxed.is_valid());
    }

    #[test]
    fn test_translation_missing_language_block() {
        let mut raw = translation_manifest(39, 27, 66);
        raw["repository"].as_object_mut().unwrap().remove("language");
        let result = validator().validate_translation_manifest(&raw);
        assert!(result.has_error(IssueCode::MissingLanguage));
    }

    #[test]
    fn test_translation_missing_content_block() {
        let mut raw = translation_manifest(39, 27, 66);
        raw.as_object_mut().unwrap().remove("content");
        let result = validator().validate_translation_manifest(&raw);
        assert!(result.has_error(IssueCode::MissingContent));
    }

    #[test]
    fn test_declared_size_limit() {
        let mut raw = translation_manifest(39, 27, 66);
        raw["technical"]["size"] = json!(2048);
        let result = validator_with(SecurityPolicy {
            max_repository_size: 1024,
            ..SecurityPolicy::default()
        })
        .validate_manifest(&raw);
        assert!(result.has_error(IssueCode::RepositoryTooLarge));
    }

    #[test]
    fn test_unsafe_book_paths() {
        let mut raw = translation_manifest(1, 1, 2);
        raw["content"]["books"] = json!([
            { "path": "books/01.json" },
            { "path": "../../etc/passwd" },
            { "path": "file:///etc/passwd" }
        ]);
        let result = validator().validate_manifest(&raw);
        let unsafe_paths: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::UnsafeBookPath)
            .filter_map(|e| e.path.clone())
            .collect();
        assert_eq!(
            unsafe_paths,
            vec!["/content/books/1/path", "/content/books/2/path"]
        );
        assert!(result.has_warning(IssueCode::BookListCountMismatch));
    }

    #[test]
    fn test_valid_parent_manifest() {
        let raw = parent_manifest(json!([reference("kjv", "kjv"), reference("web", "web")]));
        let result = validator().validate_manifest(&raw);
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_duplicate_translation_ids() {
        let raw = parent_manifest(json!([reference("kjv", "kjv-a"), reference("kjv", "kjv-b")]));
        let result = validator().validate_manifest(&raw);
        assert!(result.has_error(IssueCode::DuplicateTranslationIds));
        assert!(!result.has_error(IssueCode::DuplicateTranslationDirectories));
        let dup = result
            .errors
            .iter()
            .find(|e| e.code == IssueCode::DuplicateTranslationIds)
            .unwrap();
        assert_eq!(dup.path.as_deref(), Some("/translations/1/id"));
    }

    #[test]
    fn test_duplicate_translation_directories() {
        let raw = parent_manifest(json!([reference("kjv", "shared"), reference("web", "shared/")]));
        let result = validator().validate_manifest(&raw);
        assert!(result.has_error(IssueCode::DuplicateTranslationDirectories));
    }

    #[test]
    fn test_empty_translations_is_warning() {
        let raw = parent_manifest(json!([]));
        let result = validator().validate_manifest(&raw);
        assert!(result.is_valid());
        assert!(result.has_warning(IssueCode::NoTranslations));
    }

    #[test]
    fn test_parent_type_and_publisher() {
        let mut raw = parent_manifest(json!([reference("kjv", "kjv")]));
        raw["repository"]["type"] = json!("collection");
        raw["publisher"] = Value::Null;
        let result = validator().validate_parent_manifest(&raw);
        assert!(result.has_error(IssueCode::InvalidRepositoryType));
        assert!(result.has_error(IssueCode::MissingPublisher));
    }

    #[test]
    fn test_parent_reference_checksums_required() {
        let mut bare = reference("web", "web");
        bare.as_object_mut().unwrap().remove("checksum");
        let raw = parent_manifest(json!([reference("kjv", "kjv"), bare]));

        let result = validator().validate_manifest(&raw);
        let missing: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::MissingChecksum)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path.as_deref(), Some("/translations/1/checksum"));
    }

    #[test]
    fn test_publisher_url_rules() {
        let mut raw = parent_manifest(json!([reference("kjv", "kjv")]));
        raw["publisher"]["url"] = json!("http://bibles.example.org");
        let result = validator().validate_manifest(&raw);
        assert!(result.is_valid());
        assert!(result.has_warning(IssueCode::InsecurePublisherUrl));

        raw["publisher"]["url"] = json!("not a url");
        assert!(validator()
            .validate_manifest(&raw)
            .has_error(IssueCode::InvalidPublisherUrl));

        raw["publisher"]["url"] = json!("https://spam.example.net/about");
        let blocked = validator_with(SecurityPolicy {
            blocked_domains: vec!["example.net".into()],
            ..SecurityPolicy::default()
        })
        .validate_manifest(&raw);
        assert!(blocked.has_error(IssueCode::BlockedDomain));
    }

    #[test]
    fn test_unknown_manifest_type() {
        let result = validator().validate_manifest(&json!({ "zbrs_version": "1.0" }));
        assert!(result.has_error(IssueCode::UnknownManifestType));
    }

    #[test]
    fn test_valid_book() {
        let raw = book(json!([chapter(1, 2), chapter(2, 1)]), 2, 3);
        let result = validator().validate_book(&raw, Some(1));
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_mislabelled_third_chapter() {
        let raw = book(json!([chapter(1, 1), chapter(2, 1), chapter(5, 1)]), 3, 3);
        let result = validator().validate_book(&raw, None);
        let issue = result
            .errors
            .iter()
            .find(|e| e.code == IssueCode::IncorrectChapterNumber)
            .expect("chapter numbering error");
        assert_eq!(issue.path.as_deref(), Some("/chapters/2/number"));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_book_collects_every_defect() {
        let raw = json!({
            "book": {
                "id": "gen", "name": "Genesis", "order": 2, "testament": "old",
                "chapters_count": 3, "verses_count": 10
            },
            "chapters": [{
                "number": 1,
                "verses": [
                    { "number": 1, "text": "In the beginning" },
                    { "number": 3, "text": "   " }
                ]
            }]
        });
        let result = validator().validate_book(&raw, Some(1));
        for code in [
            IssueCode::BookOrderMismatch,
            IssueCode::ChapterCountMismatch,
            IssueCode::IncorrectVerseNumber,
            IssueCode::EmptyVerseText,
            IssueCode::VerseCountMismatch,
        ] {
            assert!(result.has_error(code), "missing {code}");
        }
        let verse = result
            .errors
            .iter()
            .find(|e| e.code == IssueCode::IncorrectVerseNumber)
            .unwrap();
        assert_eq!(verse.path.as_deref(), Some("/chapters/0/verses/1/number"));
    }

    #[test]
    fn test_book_schema_violation() {
        let raw = json!({ "book": { "id": "gen" }, "chapters": "none" });
        let result = validator().validate_book(&raw, None);
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .all(|e| e.code == IssueCode::SchemaViolation));
    }

    #[test]
    fn test_repository_url_protocols() {
        let v = validator();
        assert!(v
            .validate_repository_url("https://bibles.example.org/kjv")
            .is_valid());
        assert!(v.validate_repository_url("file:///srv/bibles/kjv").is_valid());
        assert!(v
            .validate_repository_url("http://bibles.example.org")
            .has_error(IssueCode::InsecureProtocol));
        assert!(v
            .validate_repository_url("ftp://bibles.example.org")
            .has_error(IssueCode::UnsupportedProtocol));
        assert!(v
            .validate_repository_url("not a url")
            .has_error(IssueCode::InvalidUrl));

        let permissive = validator_with(SecurityPolicy {
            allow_http: true,
            ..SecurityPolicy::default()
        });
        assert!(permissive
            .validate_repository_url("http://bibles.example.org")
            .is_valid());
    }

    #[test]
    fn test_repository_url_domain_lists() {
        let v = validator_with(SecurityPolicy {
            allowed_domains: vec!["github.com".into(), "githubusercontent.com".into()],
            blocked_domains: vec!["evil.github.com".into()],
            ..SecurityPolicy::default()
        });
        assert!(v
            .validate_repository_url("https://raw.githubusercontent.com/o/r/main/manifest.json")
            .is_valid());
        assert!(v
            .validate_repository_url("https://example.org/manifest.json")
            .has_error(IssueCode::DomainNotAllowed));
        assert!(v
            .validate_repository_url("https://evil.github.com/manifest.json")
            .has_error(IssueCode::BlockedDomain));
    }

    #[test]
    fn test_safe_relative_path() {
        assert!(is_safe_relative_path("books/01-genesis.json"));
        assert!(is_safe_relative_path("./books/a.json"));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(!is_safe_relative_path("books/../../secret.json"));
        assert!(!is_safe_relative_path("https://evil.example/book.json"));
        assert!(!is_safe_relative_path("C:\\books\\a.json"));
        assert!(!is_safe_relative_path(""));
    }

    #[tokio::test]
    async fn test_file_integrity_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01-genesis.json");
        let mut bytes = b"{\"book\":{}}".to_vec();
        std::fs::write(&path, &bytes).unwrap();

        let v = validator();
        let expected = calculate_checksum(&bytes);
        let check = v.validate_file_integrity(&path, &expected).await;
        assert!(check.valid);
        assert_eq!(check.actual, expected);

        bytes[0] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();
        let check = v.validate_file_integrity(&path, &expected).await;
        assert!(!check.valid);
        assert_ne!(check.actual, expected);
    }

    #[tokio::test]
    async fn test_file_integrity_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let check = validator()
            .validate_file_integrity(dir.path().join("missing.json"), &digest("x"))
            .await;
        assert!(!check.valid);
        assert!(check.actual.is_empty());
        assert!(check.error.is_some());
    }

    #[test]
    fn test_integrity_comparison_is_case_sensitive() {
        let lower = digest("abc");
        let upper = format!("sha256:{}", lower["sha256:".len()..].to_uppercase());
        assert_ne!(lower, upper);
    }
}
