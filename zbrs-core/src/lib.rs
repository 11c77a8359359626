//! ZBRS Core - discovery, validation and import of Bible repositories
//!
//! This crate turns a ZBRS repository (a `manifest.json` plus book files,
//! served over HTTP(S) or from a local checkout) into persisted books and
//! verses.
//!
//! # Features
//!
//! - Schema, structural, business and security validation of parent
//!   manifests, translation manifests and book files
//! - Discovery across repository indexes with a TTL cache
//! - SHA-256 integrity checks of manifests and books
//! - A fault-tolerant importer that skips bad books and translations
//!   instead of aborting
//! - Pluggable storage with in-memory and SQLite implementations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zbrs_core::{ImportOptions, Importer, MemoryStore, NoopProgress, PipelineConfig};
//!
//! # async fn example() -> zbrs_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let importer = Importer::from_config(&PipelineConfig::default(), store)?;
//!
//! let options = ImportOptions::new("https://example.org/bibles/kjv");
//! let result = importer.import_repository(&options, &NoopProgress).await;
//! println!("imported {} books, success = {}", result.books_imported, result.success);
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod config;
pub mod discovery;
pub mod error;
pub mod importer;
pub mod model;
pub mod storage;
pub mod validator;

// Re-export main types for convenience
pub use checksum::{calculate_checksum, is_sha256_digest, CHECKSUM_PREFIX};
pub use config::{PipelineConfig, SecurityPolicy};
pub use discovery::{
    DirectoryScan, DiscoveryReport, DiscoveryService, HierarchicalScan, ScanError,
    ScannedRepository, ScannedTranslation, SourceFailure,
};
pub use error::{Result, ZbrsError};
pub use importer::{Importer, NoopProgress, ProgressSink, TranslationTarget};
pub use model::{
    ImportOptions, ImportProgress, ImportResult, ImportStage, IntegrityCheck, IssueCode,
    ManifestKind, ParentManifest, RepositoryIndex, Severity, TranslationManifest,
    ValidationIssue, ValidationResult, ZbrsBook, ZbrsManifest,
};
pub use storage::{MemoryStore, RepositoryStore, StorageError};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
pub use validator::Validator;
