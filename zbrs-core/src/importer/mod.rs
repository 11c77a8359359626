//! Import pipeline.
//!
//! Drives one import from a manifest URL to persisted books:
//!
//! ```text
//! discovering -> validating -> (parent fan-out | book download) -> processing -> complete | error
//! ```
//!
//! Every entry point returns an [`ImportResult`]; failures are recorded as
//! issues rather than propagated. Books are fetched one at a time and a bad
//! book is skipped without aborting its siblings. A failing translation
//! under a parent is likewise recorded and skipped.
//!
//! Writes are not transactional across books. An interrupted import can
//! leave a partially imported translation, which the next import with
//! `overwrite_existing` replaces.

mod progress;

pub use progress::{NoopProgress, ProgressSink};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use self::progress::Monotonic;
use crate::checksum::{calculate_checksum, is_sha256_digest};
use crate::config::PipelineConfig;
use crate::discovery::{base_url, join_url, parse_json, DiscoveryService};
use crate::error::{Result, ZbrsError};
use crate::model::{
    ImportOptions, ImportProgress, ImportResult, ImportStage, IssueCode, ManifestKind,
    ParentManifest, TranslationManifest, TranslationReference, TranslationStatus,
    ValidationIssue, ValidationResult, Verse, ZbrsManifest,
};
use crate::storage::{
    NewBook, NewVerse, RepositoryDbRecord, RepositoryKind, RepositoryStore, RepositoryTranslation,
};

/// Where a translation lands relative to its coordinating repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTarget {
    /// `None` imports the translation as its own top-level repository.
    pub parent_id: Option<String>,
    /// Directory below the parent; empty when standalone.
    pub directory: String,
    pub status: TranslationStatus,
    /// Digest the translation manifest bytes must match.
    pub expected_checksum: Option<String>,
}

impl TranslationTarget {
    pub fn standalone() -> Self {
        Self {
            parent_id: None,
            directory: String::new(),
            status: TranslationStatus::Active,
            expected_checksum: None,
        }
    }

    pub fn under(parent_id: impl Into<String>, reference: &TranslationReference) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            directory: reference.directory.clone(),
            status: reference.status,
            expected_checksum: reference.checksum.clone(),
        }
    }
}

/// Percentage range a step reports into.
#[derive(Debug, Clone, Copy)]
struct Band {
    start: u8,
    end: u8,
}

impl Band {
    const TRANSLATIONS: Band = Band { start: 20, end: 90 };

    fn at(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.start;
        }
        let span = usize::from(self.end - self.start);
        self.start + (span * done.min(total) / total) as u8
    }

    fn slice(&self, index: usize, total: usize) -> Band {
        Band {
            start: self.at(index, total),
            end: self.at(index + 1, total),
        }
    }
}

#[derive(Debug, Default)]
struct TranslationOutcome {
    books_imported: usize,
    issues: ValidationResult,
}

#[derive(Debug)]
struct BookSource {
    path: String,
    url: Url,
    checksum: Option<String>,
}

pub struct Importer {
    discovery: Arc<DiscoveryService>,
    store: Arc<dyn RepositoryStore>,
}

impl Importer {
    pub fn new(discovery: Arc<DiscoveryService>, store: Arc<dyn RepositoryStore>) -> Self {
        Self { discovery, store }
    }

    pub fn from_config(config: &PipelineConfig, store: Arc<dyn RepositoryStore>) -> Result<Self> {
        Ok(Self::new(Arc::new(DiscoveryService::new(config)?), store))
    }

    pub fn discovery(&self) -> &DiscoveryService {
        &self.discovery
    }

    /// Import whatever `options.url` points at, parent or translation.
    #[instrument(skip(self, options, sink), fields(url = %options.url))]
    pub async fn import_repository(
        &self,
        options: &ImportOptions,
        sink: &dyn ProgressSink,
    ) -> ImportResult {
        let start = Instant::now();
        let progress = Monotonic::new(sink);
        let mut result = ImportResult::default();

        let Some((location, bytes, raw)) = self.discover(&options.url, &progress, &mut result).await
        else {
            return finish(result, start, &progress);
        };

        match ManifestKind::classify(&raw) {
            Some(ManifestKind::Parent) => {
                self.run_parent(&location, &raw, None, options, &progress, &mut result)
                    .await;
            }
            Some(ManifestKind::Translation) => {
                self.run_standalone(&location, &bytes, &raw, options, &progress, &mut result)
                    .await;
            }
            None => result.errors.push(
                ValidationIssue::error(
                    IssueCode::UnknownManifestType,
                    "Manifest is neither a parent nor a translation",
                )
                .with_details(json!({ "url": location.as_str() })),
            ),
        }

        finish(result, start, &progress)
    }

    /// Import a parent manifest and every translation it declares.
    #[instrument(skip(self, options, sink))]
    pub async fn import_parent_repository(
        &self,
        url: &str,
        options: &ImportOptions,
        sink: &dyn ProgressSink,
    ) -> ImportResult {
        let start = Instant::now();
        let progress = Monotonic::new(sink);
        let mut result = ImportResult::default();

        if let Some((location, _, raw)) = self.discover(url, &progress, &mut result).await {
            if ManifestKind::classify(&raw) == Some(ManifestKind::Parent) {
                self.run_parent(&location, &raw, None, options, &progress, &mut result)
                    .await;
            } else {
                result.errors.push(ValidationIssue::error(
                    IssueCode::InvalidRepositoryType,
                    format!("{location} is not a parent manifest"),
                ));
            }
        }

        finish(result, start, &progress)
    }

    /// Import one translation manifest into `target`.
    #[instrument(skip(self, target, options, sink), fields(parent = ?target.parent_id))]
    pub async fn import_translation(
        &self,
        url: &str,
        target: &TranslationTarget,
        options: &ImportOptions,
        sink: &dyn ProgressSink,
    ) -> ImportResult {
        let start = Instant::now();
        let progress = Monotonic::new(sink);
        let mut result = ImportResult::default();

        if let Some((location, bytes, raw)) = self.discover(url, &progress, &mut result).await {
            let outcome = self
                .run_translation(
                    &location,
                    &bytes,
                    &raw,
                    target,
                    options,
                    &progress,
                    Band::TRANSLATIONS,
                )
                .await;
            record_translation(&mut result, translation_id(&raw), outcome);
            if result.repository_id.is_none() {
                result.repository_id = target.parent_id.clone().or_else(|| translation_id(&raw));
            }
        }

        finish(result, start, &progress)
    }

    /// Import only the translations listed in `selected` (all when empty).
    ///
    /// Success follows the same rule as a full import: no accumulated errors.
    #[instrument(skip(self, options, sink))]
    pub async fn import_repository_hierarchical(
        &self,
        url: &str,
        selected: &[String],
        options: &ImportOptions,
        sink: &dyn ProgressSink,
    ) -> ImportResult {
        let start = Instant::now();
        let progress = Monotonic::new(sink);
        let mut result = ImportResult::default();

        let Some((location, bytes, raw)) = self.discover(url, &progress, &mut result).await else {
            return finish(result, start, &progress);
        };

        let selection = (!selected.is_empty()).then_some(selected);
        match ManifestKind::classify(&raw) {
            Some(ManifestKind::Parent) => {
                self.run_parent(&location, &raw, selection, options, &progress, &mut result)
                    .await;
            }
            Some(ManifestKind::Translation) => {
                let id = translation_id(&raw).unwrap_or_default();
                if selection.is_some_and(|ids| !ids.contains(&id)) {
                    result.errors.push(ValidationIssue::error(
                        IssueCode::TranslationNotFound,
                        format!("{location} only provides translation '{id}'"),
                    ));
                } else {
                    self.run_standalone(&location, &bytes, &raw, options, &progress, &mut result)
                        .await;
                }
            }
            None => result.errors.push(ValidationIssue::error(
                IssueCode::UnknownManifestType,
                "Manifest is neither a parent nor a translation",
            )),
        }

        finish(result, start, &progress)
    }

    /// Fetch the manifest document, recording a failure as an issue.
    async fn discover(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
        result: &mut ImportResult,
    ) -> Option<(Url, Vec<u8>, Value)> {
        progress.report(ImportProgress::new(
            ImportStage::Discovering,
            0,
            format!("Fetching manifest from {url}"),
        ));

        match self.discovery.fetch_manifest_document(url).await {
            Ok(document) => {
                progress.report(ImportProgress::new(
                    ImportStage::Validating,
                    10,
                    "Validating manifest",
                ));
                Some(document)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Manifest unavailable");
                result.errors.push(issue_from_error(&e).with_details(json!({ "url": url })));
                None
            }
        }
    }

    async fn run_standalone(
        &self,
        location: &Url,
        bytes: &[u8],
        raw: &Value,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        result: &mut ImportResult,
    ) {
        let target = TranslationTarget::standalone();
        let outcome = self
            .run_translation(
                location,
                bytes,
                raw,
                &target,
                options,
                progress,
                Band::TRANSLATIONS,
            )
            .await;
        result.repository_id = translation_id(raw);
        record_translation(result, translation_id(raw), outcome);
    }

    async fn run_parent(
        &self,
        location: &Url,
        raw: &Value,
        selection: Option<&[String]>,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        result: &mut ImportResult,
    ) {
        let validation = self.discovery.validator().validate_parent_manifest(raw);
        let valid = validation.is_valid();
        result.absorb(validation);
        if !valid {
            return;
        }

        let parent: ParentManifest = match ZbrsManifest::from_value(raw.clone()) {
            Ok(ZbrsManifest::Parent(parent)) => parent,
            Ok(ZbrsManifest::Translation(_)) => {
                result.errors.push(ValidationIssue::error(
                    IssueCode::UnknownManifestType,
                    "Expected a parent manifest",
                ));
                return;
            }
            Err(e) => {
                result.errors.push(issue_from_error(&e));
                return;
            }
        };
        let parent_id = parent.repository.id.clone();
        result.repository_id = Some(parent_id.clone());

        match self.store.get_repository(&parent_id).await {
            Ok(Some(_)) if !options.overwrite_existing => {
                result.errors.push(exists_issue(&parent_id));
                return;
            }
            Ok(_) => {}
            Err(e) => {
                result.errors.push(issue_from_error(&e.into()));
                return;
            }
        }

        let record = RepositoryDbRecord {
            id: parent_id.clone(),
            name: parent.repository.name.clone(),
            description: parent.repository.description.clone(),
            version: parent.repository.version.clone(),
            kind: RepositoryKind::Parent,
            parent_id: None,
            language: None,
            created_at: parent.repository.created_at.clone(),
            updated_at: parent.repository.updated_at.clone(),
            imported_at: Utc::now(),
            metadata: raw.clone(),
        };
        if let Err(e) = self.store.upsert_repository(&record).await {
            result.errors.push(issue_from_error(&e.into()));
            return;
        }
        info!(parent = %parent_id, translations = parent.translations.len(), "Parent repository stored");

        let references: Vec<&TranslationReference> = match selection {
            None => parent.translations.iter().collect(),
            Some(ids) => {
                let mut chosen = Vec::new();
                for id in ids {
                    match parent.translations.iter().find(|t| &t.id == id) {
                        Some(reference) => chosen.push(reference),
                        None => result.warnings.push(ValidationIssue::warning(
                            IssueCode::TranslationNotFound,
                            format!("Translation '{id}' is not declared by '{parent_id}'"),
                        )),
                    }
                }
                if chosen.is_empty() {
                    result.errors.push(ValidationIssue::error(
                        IssueCode::TranslationNotFound,
                        "None of the selected translations are declared by the parent",
                    ));
                    return;
                }
                chosen
            }
        };

        let base = base_url(location);
        let total = references.len();
        for (index, reference) in references.into_iter().enumerate() {
            let band = Band::TRANSLATIONS.slice(index, total);
            progress.report(ImportProgress::new(
                ImportStage::Downloading,
                band.start,
                format!("Importing translation {} ({}/{})", reference.id, index + 1, total),
            ));

            if reference.status == TranslationStatus::Inactive {
                result.warnings.push(
                    ValidationIssue::warning(
                        IssueCode::TranslationSkipped,
                        format!("Translation '{}' is inactive", reference.id),
                    )
                    .with_details(json!({ "translation": reference.id })),
                );
                result.translations_skipped.push(reference.id.clone());
                continue;
            }

            let child = match join_url(&base, &reference.directory) {
                Ok(url) => url,
                Err(e) => {
                    self.skip_translation(result, reference, &e);
                    continue;
                }
            };
            let (child_location, bytes, child_raw) =
                match self.discovery.fetch_manifest_document(child.as_str()).await {
                    Ok(document) => document,
                    Err(e) => {
                        self.skip_translation(result, reference, &e);
                        continue;
                    }
                };

            let target = TranslationTarget::under(parent_id.clone(), reference);
            let outcome = self
                .run_translation(
                    &child_location,
                    &bytes,
                    &child_raw,
                    &target,
                    options,
                    progress,
                    band,
                )
                .await;
            record_translation(result, Some(reference.id.clone()), outcome);
        }
    }

    fn skip_translation(
        &self,
        result: &mut ImportResult,
        reference: &TranslationReference,
        error: &ZbrsError,
    ) {
        warn!(translation = %reference.id, error = %error, "Translation unavailable");
        result.errors.push(
            ValidationIssue::error(
                IssueCode::TranslationImportFailed,
                format!("Translation '{}' could not be fetched: {error}", reference.id),
            )
            .with_details(json!({ "translation": reference.id, "directory": reference.directory })),
        );
        result.translations_skipped.push(reference.id.clone());
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_translation(
        &self,
        location: &Url,
        bytes: &[u8],
        raw: &Value,
        target: &TranslationTarget,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        band: Band,
    ) -> TranslationOutcome {
        let mut outcome = TranslationOutcome::default();
        let issues = &mut outcome.issues;

        if options.validate_checksums {
            if let Some(expected) = &target.expected_checksum {
                let actual = calculate_checksum(bytes);
                if &actual != expected {
                    warn!(url = %location, "Translation manifest checksum mismatch");
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::ChecksumMismatch,
                            format!("Manifest at {location} does not match the declared checksum"),
                        )
                        .with_details(json!({ "expected": expected, "actual": actual })),
                    );
                    return outcome;
                }
            }
        }

        issues.merge(self.discovery.validator().validate_translation_manifest(raw));
        if !issues.is_valid() {
            return outcome;
        }

        let manifest: TranslationManifest = match ZbrsManifest::from_value(raw.clone()) {
            Ok(ZbrsManifest::Translation(manifest)) => manifest,
            Ok(ZbrsManifest::Parent(_)) => {
                issues.push(ValidationIssue::error(
                    IssueCode::UnknownManifestType,
                    "Expected a translation manifest",
                ));
                return outcome;
            }
            Err(e) => {
                issues.push(issue_from_error(&e));
                return outcome;
            }
        };
        let id = manifest.repository.id.clone();

        let existing = match self.store.get_repository(&id).await {
            Ok(Some(_)) if !options.overwrite_existing => {
                issues.push(exists_issue(&id));
                return outcome;
            }
            Ok(found) => found.is_some(),
            Err(e) => {
                issues.push(issue_from_error(&e.into()));
                return outcome;
            }
        };

        let books = self.resolve_books(&manifest, location, issues).await;
        if books.is_empty() {
            return outcome;
        }

        let mut verified = HashMap::new();
        if options.validate_checksums {
            match self.verify_book_checksums(&books, issues).await {
                Some(bytes) => verified = bytes,
                None => return outcome,
            }
        }

        // Previous content stays until the new books are known to be usable
        if existing {
            if let Err(e) = self.store.delete_repository_content(&id).await {
                issues.push(issue_from_error(&e.into()));
                return outcome;
            }
            debug!(repository = %id, "Cleared previous content");
        }

        if let Err(e) = self.persist_translation(&manifest, raw, target).await {
            issues.push(issue_from_error(&e));
            return outcome;
        }

        let total = books.len();
        for (index, source) in books.iter().enumerate() {
            progress.report(
                ImportProgress::new(
                    ImportStage::Downloading,
                    band.at(index, total),
                    format!("Downloading {}", source.path),
                )
                .with_books(index + 1, total),
            );

            let content = match verified.remove(&index) {
                Some(content) => content,
                None => match self.discovery.download_file(source.url.as_str(), None).await {
                    Ok(content) => content,
                    Err(e) => {
                        skip_book(issues, source, e.to_string());
                        continue;
                    }
                },
            };

            let book_raw = match parse_json(source.url.as_str(), &content) {
                Ok(value) => value,
                Err(e) => {
                    skip_book(issues, source, e.to_string());
                    continue;
                }
            };

            let (validation, book) = self.discovery.validator().check_book(&book_raw, None);
            let Some(book) = book.filter(|_| validation.is_valid()) else {
                let codes: Vec<&str> = validation.errors.iter().map(|e| e.code.as_str()).collect();
                skip_book(issues, source, format!("failed validation ({})", codes.join(", ")));
                continue;
            };
            issues.warnings.extend(validation.warnings);

            progress.report(
                ImportProgress::new(
                    ImportStage::Processing,
                    band.at(index, total),
                    format!("Storing {}", book.book.name),
                )
                .with_books(index + 1, total),
            );

            let new_book = NewBook {
                repository_id: id.clone(),
                book_id: book.book.id.clone(),
                name: book.book.name.clone(),
                abbreviation: book.book.abbreviation.clone(),
                order: book.book.order,
                testament: book.book.testament,
                chapters_count: book.book.chapters_count,
                verses_count: book.book.verses_count,
            };
            let stored = async {
                let row_id = self.store.create_book(&new_book).await?;
                for chapter in &book.chapters {
                    for verse in &chapter.verses {
                        self.store
                            .create_verse(&NewVerse {
                                book_row_id: row_id,
                                chapter: chapter.number,
                                verse: verse.number,
                                text: verse.text.clone(),
                                notes: verse_notes(verse),
                            })
                            .await?;
                    }
                }
                Ok::<_, crate::storage::StorageError>(())
            }
            .await;

            if let Err(e) = stored {
                warn!(book = %book.book.id, error = %e, "Failed to store book");
                issues.push(issue_from_error(&e.into()));
                return outcome;
            }

            debug!(book = %book.book.id, verses = book.actual_verse_count(), "Book stored");
            outcome.books_imported += 1;
        }

        if outcome.books_imported == 0 {
            outcome.issues.push(ValidationIssue::error(
                IssueCode::NoBooksImported,
                format!("No books of '{id}' could be imported"),
            ));
        } else {
            info!(
                translation = %id,
                books = outcome.books_imported,
                of = total,
                "Translation imported"
            );
        }
        outcome
    }

    /// Concrete book files: the manifest's list, else directory discovery.
    async fn resolve_books(
        &self,
        manifest: &TranslationManifest,
        location: &Url,
        issues: &mut ValidationResult,
    ) -> Vec<BookSource> {
        let base = base_url(location);

        let declared: Vec<(String, Option<String>)> = match &manifest.content.books {
            Some(books) if !books.is_empty() => books
                .iter()
                .map(|b| (b.path.clone(), b.checksum.clone()))
                .collect(),
            _ => match self.discovery.list_book_files(&base).await {
                Ok(paths) => paths.into_iter().map(|p| (p, None)).collect(),
                Err(e) => {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::NoBooksFound,
                            format!("No book list in the manifest and discovery failed: {e}"),
                        )
                        .at("/content/books"),
                    );
                    return Vec::new();
                }
            },
        };

        let mut books = Vec::with_capacity(declared.len());
        for (path, checksum) in declared {
            match join_url(&base, &path) {
                Ok(url) if url.scheme() == location.scheme() => books.push(BookSource {
                    path,
                    url,
                    checksum,
                }),
                Ok(url) => issues.warning(
                    IssueCode::UnsafeBookPath,
                    format!("Book '{path}' resolves to {url}, outside the repository"),
                    "/content/books",
                ),
                Err(e) => issues.warning(IssueCode::UnsafeBookPath, e.to_string(), "/content/books"),
            }
        }

        if books.is_empty() {
            issues.error(
                IssueCode::NoBooksFound,
                format!("No book files found for '{}'", manifest.repository.id),
                "/content/books",
            );
        }
        books
    }

    /// Verify every declared book digest before anything is persisted.
    ///
    /// Returns the verified bytes keyed by book index, or `None` on the first
    /// mismatch.
    async fn verify_book_checksums(
        &self,
        books: &[BookSource],
        issues: &mut ValidationResult,
    ) -> Option<HashMap<usize, Vec<u8>>> {
        let mut verified = HashMap::new();
        let mut unchecked = 0usize;

        for (index, source) in books.iter().enumerate() {
            let Some(expected) = source.checksum.as_deref().filter(|c| is_sha256_digest(c)) else {
                unchecked += 1;
                continue;
            };

            let content = match self.discovery.download_file(source.url.as_str(), None).await {
                Ok(content) => content,
                Err(e) => {
                    debug!(book = %source.path, error = %e, "Book unavailable during checksum pass");
                    continue;
                }
            };

            let actual = calculate_checksum(&content);
            if actual != expected {
                warn!(book = %source.path, "Book checksum mismatch");
                issues.push(
                    ValidationIssue::error(
                        IssueCode::ChecksumMismatch,
                        format!("Book '{}' does not match its declared checksum", source.path),
                    )
                    .with_details(json!({
                        "book": source.path,
                        "expected": expected,
                        "actual": actual
                    })),
                );
                return None;
            }
            verified.insert(index, content);
        }

        if unchecked > 0 {
            issues.warning(
                IssueCode::MissingChecksum,
                format!("{unchecked} of {} book(s) have no sha256 checksum and were not verified", books.len()),
                "/content/books",
            );
        }
        Some(verified)
    }

    async fn persist_translation(
        &self,
        manifest: &TranslationManifest,
        raw: &Value,
        target: &TranslationTarget,
    ) -> Result<()> {
        let repository = &manifest.repository;
        let kind = match target.parent_id {
            Some(_) => RepositoryKind::Translation,
            None => RepositoryKind::Parent,
        };

        self.store
            .upsert_repository(&RepositoryDbRecord {
                id: repository.id.clone(),
                name: repository.name.clone(),
                description: repository.description.clone(),
                version: repository.version.clone(),
                kind,
                parent_id: target.parent_id.clone(),
                language: Some(repository.language.code.clone()),
                created_at: repository.created_at.clone(),
                updated_at: repository.updated_at.clone(),
                imported_at: Utc::now(),
                metadata: raw.clone(),
            })
            .await?;

        self.store
            .create_repository_translation(&RepositoryTranslation {
                parent_id: target
                    .parent_id
                    .clone()
                    .unwrap_or_else(|| repository.id.clone()),
                translation_id: repository.id.clone(),
                name: repository.name.clone(),
                directory: target.directory.clone(),
                language: repository.language.code.clone(),
                status: target.status,
            })
            .await?;

        debug!(translation = %repository.id, kind = kind.as_str(), "Translation record stored");
        Ok(())
    }
}

fn record_translation(result: &mut ImportResult, id: Option<String>, outcome: TranslationOutcome) {
    let succeeded = outcome.issues.is_valid();
    result.books_imported += outcome.books_imported;
    result.absorb(outcome.issues);

    let Some(id) = id else { return };
    if succeeded {
        result.translations_imported.push(id);
    } else {
        result.translations_skipped.push(id);
    }
}

fn finish(mut result: ImportResult, start: Instant, progress: &dyn ProgressSink) -> ImportResult {
    result.success = result.errors.is_empty();
    result.duration_ms = start.elapsed().as_millis() as u64;

    if result.success {
        progress.report(ImportProgress::new(
            ImportStage::Complete,
            100,
            format!("Imported {} book(s)", result.books_imported),
        ));
        info!(
            repository = ?result.repository_id,
            books = result.books_imported,
            warnings = result.warnings.len(),
            duration_ms = result.duration_ms,
            "Import complete"
        );
    } else {
        progress.report(ImportProgress::new(
            ImportStage::Error,
            0,
            format!("Import failed with {} error(s)", result.errors.len()),
        ));
        warn!(
            repository = ?result.repository_id,
            errors = result.errors.len(),
            books = result.books_imported,
            "Import failed"
        );
    }
    result
}

fn translation_id(raw: &Value) -> Option<String> {
    raw.pointer("/repository/id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn skip_book(issues: &mut ValidationResult, source: &BookSource, reason: String) {
    warn!(book = %source.path, reason = %reason, "Skipping book");
    issues.push(
        ValidationIssue::warning(
            IssueCode::BookSkipped,
            format!("Skipped {}: {reason}", source.path),
        )
        .with_details(json!({ "book": source.path, "url": source.url.as_str() })),
    );
}

fn exists_issue(id: &str) -> ValidationIssue {
    ValidationIssue::error(
        IssueCode::RepositoryExists,
        format!("Repository '{id}' is already imported; enable overwrite to replace it"),
    )
    .with_details(json!({ "repository": id }))
}

fn verse_notes(verse: &Verse) -> Option<Value> {
    if verse.footnotes.is_empty() && verse.cross_references.is_empty() && verse.study_notes.is_empty()
    {
        return None;
    }
    Some(json!({
        "footnotes": verse.footnotes,
        "cross_references": verse.cross_references,
        "study_notes": verse.study_notes,
    }))
}

fn issue_from_error(error: &ZbrsError) -> ValidationIssue {
    let code = match error {
        ZbrsError::Network { .. } | ZbrsError::Io { .. } => IssueCode::NetworkError,
        ZbrsError::Integrity { .. } => IssueCode::ChecksumMismatch,
        ZbrsError::Storage(_) => IssueCode::StorageError,
        ZbrsError::InvalidManifest { .. } | ZbrsError::Decode(_) | ZbrsError::Schema(_) => {
            IssueCode::SchemaViolation
        }
    };
    ValidationIssue::error(code, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_scaling() {
        let band = Band::TRANSLATIONS;
        assert_eq!(band.at(0, 4), 20);
        assert_eq!(band.at(2, 4), 55);
        assert_eq!(band.at(4, 4), 90);
        assert_eq!(band.at(0, 0), 20);

        let second = band.slice(1, 2);
        assert_eq!((second.start, second.end), (55, 90));
    }

    #[test]
    fn test_record_translation_outcomes() {
        let mut result = ImportResult::default();
        record_translation(
            &mut result,
            Some("kjv".into()),
            TranslationOutcome {
                books_imported: 2,
                ..Default::default()
            },
        );

        let mut failed = TranslationOutcome::default();
        failed
            .issues
            .error(IssueCode::MissingChecksum, "missing", "/technical/checksum");
        record_translation(&mut result, Some("web".into()), failed);

        assert_eq!(result.books_imported, 2);
        assert_eq!(result.translations_imported, vec!["kjv"]);
        assert_eq!(result.translations_skipped, vec!["web"]);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_issue_codes_for_errors() {
        let network = issue_from_error(&ZbrsError::network("https://h.example", "timeout"));
        assert_eq!(network.code, IssueCode::NetworkError);
        let storage = issue_from_error(&ZbrsError::Storage(
            crate::storage::StorageError::Query("locked".into()),
        ));
        assert_eq!(storage.code, IssueCode::StorageError);
    }
}
