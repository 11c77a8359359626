//! Plain data shapes for manifests, book content, validation outcomes and
//! import bookkeeping.

mod book;
mod import;
mod index;
mod manifest;
mod validation;

pub use book::{
    BookInfo, BookMetadata, Chapter, CrossReference, Footnote, Testament, Verse, ZbrsBook,
};
pub use import::{ImportOptions, ImportProgress, ImportResult, ImportStage};
pub use index::{IndexEntry, IndexFormat, RepositoryIndex};
pub use manifest::{
    ContentBookReference, ContentFeatures, ContentInfo, LanguageInfo, ManifestKind,
    ParentManifest, ParentRepositoryInfo, Publisher, TechnicalInfo, TestamentCounts,
    TextDirection, TranslationInfo, TranslationManifest, TranslationReference,
    TranslationRepositoryInfo, TranslationStatus, ZbrsManifest,
};
pub use validation::{IntegrityCheck, IssueCode, Severity, ValidationIssue, ValidationResult};
