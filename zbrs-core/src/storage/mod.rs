//! Storage contract consumed by the importer.
//!
//! The importer never talks to a database directly. It is handed an
//! `Arc<dyn RepositoryStore>` at construction, so tests and dry runs can use
//! [`MemoryStore`] while the CLI persists into SQLite.

mod error;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use error::StorageError;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Testament, TranslationStatus};

/// Role of a persisted repository row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    /// Coordinating record that owns translations. Standalone translations
    /// are stored with this kind and linked to themselves.
    Parent,
    /// Translation imported underneath a parent.
    Translation,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Translation => "translation",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StorageError> {
        match value {
            "parent" => Ok(Self::Parent),
            "translation" => Ok(Self::Translation),
            other => Err(StorageError::Serialization(format!(
                "Unknown repository kind: {other}"
            ))),
        }
    }
}

/// Persisted form of an imported repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDbRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub kind: RepositoryKind,
    pub parent_id: Option<String>,
    /// ISO language code, set for translation content.
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub imported_at: DateTime<Utc>,
    /// Full manifest document as imported.
    pub metadata: Value,
}

/// Link between a coordinating repository and one of its translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTranslation {
    pub parent_id: String,
    pub translation_id: String,
    pub name: String,
    /// Directory relative to the parent; empty for standalone translations.
    pub directory: String,
    pub language: String,
    pub status: TranslationStatus,
}

/// Book row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub repository_id: String,
    pub book_id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub order: u32,
    pub testament: Testament,
    pub chapters_count: u32,
    pub verses_count: u32,
}

/// Verse row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVerse {
    pub book_row_id: i64,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Footnotes, cross references and study notes, when present.
    pub notes: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub row_id: i64,
    pub repository_id: String,
    pub book_id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub order: u32,
    pub testament: Testament,
    pub chapters_count: u32,
    pub verses_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

impl BookRecord {
    /// Whether `query` names this book by id or abbreviation, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        self.book_id.eq_ignore_ascii_case(query)
            || self
                .abbreviation
                .as_deref()
                .is_some_and(|abbr| abbr.eq_ignore_ascii_case(query))
    }
}

/// Persistence operations used by the importer and the reading commands.
///
/// Implementations serialize their own writes. The importer issues one write
/// at a time and never relies on a transaction spanning several calls.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryDbRecord>, StorageError>;

    /// Insert or replace the record with the same id.
    async fn upsert_repository(&self, record: &RepositoryDbRecord) -> Result<(), StorageError>;

    /// Insert a book and return its row id.
    async fn create_book(&self, book: &NewBook) -> Result<i64, StorageError>;

    async fn create_verse(&self, verse: &NewVerse) -> Result<(), StorageError>;

    /// Insert or replace the link identified by (parent, translation).
    async fn create_repository_translation(
        &self,
        link: &RepositoryTranslation,
    ) -> Result<(), StorageError>;

    async fn get_translations(
        &self,
        parent_id: &str,
    ) -> Result<Vec<RepositoryTranslation>, StorageError>;

    /// Remove every book and verse stored for `repository_id`.
    async fn delete_repository_content(&self, repository_id: &str) -> Result<(), StorageError>;

    async fn list_repositories(&self) -> Result<Vec<RepositoryDbRecord>, StorageError>;

    /// Look a book up by id or abbreviation, case-insensitively.
    async fn find_book(
        &self,
        repository_id: &str,
        query: &str,
    ) -> Result<Option<BookRecord>, StorageError>;

    /// Verses of one chapter in verse order.
    async fn get_chapter(
        &self,
        book_row_id: i64,
        chapter: u32,
    ) -> Result<Vec<VerseRecord>, StorageError>;
}
