//! Read command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use zbrs_core::storage::{StorageError, VerseRecord};

use crate::exit_codes::CommandFailure;
use crate::utils::open_store;
use crate::GlobalOptions;

/// Execute the read command.
pub async fn execute(
    global: &GlobalOptions,
    database: &str,
    translation: &str,
    book: &str,
    chapter: u32,
) -> Result<()> {
    let store = open_store(Some(database)).await?;

    if store
        .get_repository(translation)
        .await
        .context("Failed to load translation")?
        .is_none()
    {
        return Err(StorageError::NotFound(format!("translation '{translation}'")).into());
    }

    let record = store
        .find_book(translation, book)
        .await
        .context("Failed to look up book")?
        .ok_or_else(|| StorageError::NotFound(format!("book '{book}' in '{translation}'")))?;

    if chapter == 0 || chapter > record.chapters_count {
        return Err(CommandFailure::usage(format!(
            "{} has chapters 1-{}, got {chapter}",
            record.name, record.chapters_count
        ))
        .into());
    }

    let verses = store
        .get_chapter(record.row_id, chapter)
        .await
        .context("Failed to load chapter")?;

    if !global.quiet {
        println!("{}\n", format!("{} {}", record.name, chapter).bold());
    }
    for verse in &verses {
        println!("{}", format_verse(verse));
    }
    Ok(())
}

fn format_verse(verse: &VerseRecord) -> String {
    format!("{:>3} {}", verse.verse.to_string().dimmed(), verse.text)
}
