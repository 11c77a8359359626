//! SQLite implementation of the repository store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use super::{
    BookRecord, NewBook, NewVerse, RepositoryDbRecord, RepositoryKind, RepositoryStore,
    RepositoryTranslation, StorageError, VerseRecord,
};

/// SQLite-backed repository store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct RepositoryRow {
    id: String,
    name: String,
    description: Option<String>,
    version: String,
    kind: String,
    parent_id: Option<String>,
    language: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    imported_at: DateTime<Utc>,
    metadata: String,
}

impl TryFrom<RepositoryRow> for RepositoryDbRecord {
    type Error = StorageError;

    fn try_from(row: RepositoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            version: row.version,
            kind: RepositoryKind::parse(&row.kind)?,
            parent_id: row.parent_id,
            language: row.language,
            created_at: row.created_at,
            updated_at: row.updated_at,
            imported_at: row.imported_at,
            metadata: serde_json::from_str(&row.metadata)?,
        })
    }
}

#[derive(FromRow)]
struct TranslationRow {
    parent_id: String,
    translation_id: String,
    name: String,
    directory: String,
    language: String,
    status: String,
}

impl TryFrom<TranslationRow> for RepositoryTranslation {
    type Error = StorageError;

    fn try_from(row: TranslationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            parent_id: row.parent_id,
            translation_id: row.translation_id,
            name: row.name,
            directory: row.directory,
            language: row.language,
            status: from_label(&row.status)?,
        })
    }
}

#[derive(FromRow)]
struct BookRow {
    row_id: i64,
    repository_id: String,
    book_id: String,
    name: String,
    abbreviation: Option<String>,
    book_order: i64,
    testament: String,
    chapters_count: i64,
    verses_count: i64,
}

impl TryFrom<BookRow> for BookRecord {
    type Error = StorageError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            row_id: row.row_id,
            repository_id: row.repository_id,
            book_id: row.book_id,
            name: row.name,
            abbreviation: row.abbreviation,
            order: to_u32(row.book_order, "book_order")?,
            testament: from_label(&row.testament)?,
            chapters_count: to_u32(row.chapters_count, "chapters_count")?,
            verses_count: to_u32(row.verses_count, "verses_count")?,
        })
    }
}

#[derive(FromRow)]
struct VerseRow {
    chapter: i64,
    verse: i64,
    text: String,
    notes: Option<String>,
}

/// Decode a lowercase enum label stored as TEXT.
fn to_u32(value: i64, column: &str) -> Result<u32, StorageError> {
    u32::try_from(value)
        .map_err(|_| StorageError::Serialization(format!("{column} out of range: {value}")))
}

fn from_label<T: DeserializeOwned>(label: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_value(Value::String(label.to_string()))?)
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url` and apply
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(database = %database_url, "Repository store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Wrap an existing pool whose schema is already migrated.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepositoryStore for SqliteStore {
    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryDbRecord>, StorageError> {
        let row: Option<RepositoryRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, version, kind, parent_id, language,
                   created_at, updated_at, imported_at, metadata
            FROM repositories
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn upsert_repository(&self, record: &RepositoryDbRecord) -> Result<(), StorageError> {
        let metadata = serde_json::to_string(&record.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO repositories
                (id, name, description, version, kind, parent_id, language,
                 created_at, updated_at, imported_at, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                version = excluded.version,
                kind = excluded.kind,
                parent_id = excluded.parent_id,
                language = excluded.language,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                imported_at = excluded.imported_at,
                metadata = excluded.metadata
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.version)
        .bind(record.kind.as_str())
        .bind(&record.parent_id)
        .bind(&record.language)
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .bind(record.imported_at)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        tracing::debug!(repository = %record.id, kind = record.kind.as_str(), "Upserted repository");
        Ok(())
    }

    async fn create_book(&self, book: &NewBook) -> Result<i64, StorageError> {
        let row_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books
                (repository_id, book_id, name, abbreviation, book_order, testament,
                 chapters_count, verses_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING row_id
            "#,
        )
        .bind(&book.repository_id)
        .bind(&book.book_id)
        .bind(&book.name)
        .bind(&book.abbreviation)
        .bind(i64::from(book.order))
        .bind(book.testament.as_str())
        .bind(i64::from(book.chapters_count))
        .bind(i64::from(book.verses_count))
        .fetch_one(&self.pool)
        .await?;

        Ok(row_id)
    }

    async fn create_verse(&self, verse: &NewVerse) -> Result<(), StorageError> {
        let notes = verse.notes.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO verses (book_row_id, chapter, verse, text, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(verse.book_row_id)
        .bind(i64::from(verse.chapter))
        .bind(i64::from(verse.verse))
        .bind(&verse.text)
        .bind(notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_repository_translation(
        &self,
        link: &RepositoryTranslation,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO repository_translations
                (parent_id, translation_id, name, directory, language, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (parent_id, translation_id) DO UPDATE SET
                name = excluded.name,
                directory = excluded.directory,
                language = excluded.language,
                status = excluded.status
            "#,
        )
        .bind(&link.parent_id)
        .bind(&link.translation_id)
        .bind(&link.name)
        .bind(&link.directory)
        .bind(&link.language)
        .bind(link.status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_translations(
        &self,
        parent_id: &str,
    ) -> Result<Vec<RepositoryTranslation>, StorageError> {
        let rows: Vec<TranslationRow> = sqlx::query_as(
            r#"
            SELECT parent_id, translation_id, name, directory, language, status
            FROM repository_translations
            WHERE parent_id = ?1
            ORDER BY translation_id
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_repository_content(&self, repository_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM books WHERE repository_id = ?1")
            .bind(repository_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            repository = %repository_id,
            books = result.rows_affected(),
            "Deleted repository content"
        );
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryDbRecord>, StorageError> {
        let rows: Vec<RepositoryRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, version, kind, parent_id, language,
                   created_at, updated_at, imported_at, metadata
            FROM repositories
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_book(
        &self,
        repository_id: &str,
        query: &str,
    ) -> Result<Option<BookRecord>, StorageError> {
        let row: Option<BookRow> = sqlx::query_as(
            r#"
            SELECT row_id, repository_id, book_id, name, abbreviation, book_order,
                   testament, chapters_count, verses_count
            FROM books
            WHERE repository_id = ?1
              AND (lower(book_id) = lower(?2) OR lower(abbreviation) = lower(?2))
            ORDER BY book_order
            LIMIT 1
            "#,
        )
        .bind(repository_id)
        .bind(query)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_chapter(
        &self,
        book_row_id: i64,
        chapter: u32,
    ) -> Result<Vec<VerseRecord>, StorageError> {
        let rows: Vec<VerseRow> = sqlx::query_as(
            r#"
            SELECT chapter, verse, text, notes
            FROM verses
            WHERE book_row_id = ?1 AND chapter = ?2
            ORDER BY verse
            "#,
        )
        .bind(book_row_id)
        .bind(i64::from(chapter))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(VerseRecord {
                    chapter: to_u32(row.chapter, "chapter")?,
                    verse: to_u32(row.verse, "verse")?,
                    text: row.text,
                    notes: row.notes.as_deref().map(serde_json::from_str).transpose()?,
                })
            })
            .collect()
    }
}
