//! In-memory store for tests and dry runs.
//!
//! Nothing survives the process. Keyed maps give the same upsert semantics
//! as the SQLite store.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    BookRecord, NewBook, NewVerse, RepositoryDbRecord, RepositoryStore, RepositoryTranslation,
    StorageError, VerseRecord,
};

#[derive(Default)]
pub struct MemoryStore {
    repositories: DashMap<String, RepositoryDbRecord>,
    /// (parent_id, translation_id) -> link
    translations: DashMap<(String, String), RepositoryTranslation>,
    /// book row id -> book
    books: DashMap<i64, BookRecord>,
    /// book row id -> verses in insertion order
    verses: DashMap<i64, Vec<VerseRecord>>,
    next_book_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Books stored for one repository, in canonical order.
    pub fn books_for(&self, repository_id: &str) -> Vec<BookRecord> {
        let mut books: Vec<BookRecord> = self
            .books
            .iter()
            .filter(|entry| entry.repository_id == repository_id)
            .map(|entry| entry.value().clone())
            .collect();
        books.sort_by_key(|book| book.order);
        books
    }

    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    pub fn verse_count(&self, repository_id: &str) -> usize {
        self.books_for(repository_id)
            .iter()
            .map(|book| self.verses.get(&book.row_id).map_or(0, |v| v.len()))
            .sum()
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryDbRecord>, StorageError> {
        Ok(self.repositories.get(id).map(|r| r.value().clone()))
    }

    async fn upsert_repository(&self, record: &RepositoryDbRecord) -> Result<(), StorageError> {
        self.repositories.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn create_book(&self, book: &NewBook) -> Result<i64, StorageError> {
        if !self.repositories.contains_key(&book.repository_id) {
            return Err(StorageError::NotFound(format!(
                "repository {}",
                book.repository_id
            )));
        }

        let row_id = self.next_book_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.books.insert(
            row_id,
            BookRecord {
                row_id,
                repository_id: book.repository_id.clone(),
                book_id: book.book_id.clone(),
                name: book.name.clone(),
                abbreviation: book.abbreviation.clone(),
                order: book.order,
                testament: book.testament,
                chapters_count: book.chapters_count,
                verses_count: book.verses_count,
            },
        );
        Ok(row_id)
    }

    async fn create_verse(&self, verse: &NewVerse) -> Result<(), StorageError> {
        if !self.books.contains_key(&verse.book_row_id) {
            return Err(StorageError::NotFound(format!("book {}", verse.book_row_id)));
        }

        self.verses
            .entry(verse.book_row_id)
            .or_default()
            .push(VerseRecord {
                chapter: verse.chapter,
                verse: verse.verse,
                text: verse.text.clone(),
                notes: verse.notes.clone(),
            });
        Ok(())
    }

    async fn create_repository_translation(
        &self,
        link: &RepositoryTranslation,
    ) -> Result<(), StorageError> {
        self.translations.insert(
            (link.parent_id.clone(), link.translation_id.clone()),
            link.clone(),
        );
        Ok(())
    }

    async fn get_translations(
        &self,
        parent_id: &str,
    ) -> Result<Vec<RepositoryTranslation>, StorageError> {
        let mut links: Vec<RepositoryTranslation> = self
            .translations
            .iter()
            .filter(|entry| entry.parent_id == parent_id)
            .map(|entry| entry.value().clone())
            .collect();
        links.sort_by(|a, b| a.translation_id.cmp(&b.translation_id));
        Ok(links)
    }

    async fn delete_repository_content(&self, repository_id: &str) -> Result<(), StorageError> {
        let row_ids: Vec<i64> = self
            .books
            .iter()
            .filter(|entry| entry.repository_id == repository_id)
            .map(|entry| *entry.key())
            .collect();
        for row_id in row_ids {
            self.books.remove(&row_id);
            self.verses.remove(&row_id);
        }
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryDbRecord>, StorageError> {
        let mut records: Vec<RepositoryDbRecord> = self
            .repositories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn find_book(
        &self,
        repository_id: &str,
        query: &str,
    ) -> Result<Option<BookRecord>, StorageError> {
        Ok(self
            .books_for(repository_id)
            .into_iter()
            .find(|book| book.matches(query)))
    }

    async fn get_chapter(
        &self,
        book_row_id: i64,
        chapter: u32,
    ) -> Result<Vec<VerseRecord>, StorageError> {
        let mut verses: Vec<VerseRecord> = self
            .verses
            .get(&book_row_id)
            .map(|v| v.iter().filter(|v| v.chapter == chapter).cloned().collect())
            .unwrap_or_default();
        verses.sort_by_key(|v| v.verse);
        Ok(verses)
    }
}
