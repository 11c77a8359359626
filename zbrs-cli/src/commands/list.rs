//! List command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use colored::Colorize;
use zbrs_core::storage::RepositoryDbRecord;

use crate::utils::open_store;
use crate::GlobalOptions;

/// Execute the list command.
pub async fn execute(global: &GlobalOptions, database: &str) -> Result<()> {
    let store = open_store(Some(database)).await?;
    let repositories = store
        .list_repositories()
        .await
        .context("Failed to list repositories")?;

    let by_language = group_by_language(&repositories);
    if by_language.is_empty() {
        if !global.quiet {
            println!("No translations imported yet");
        }
        return Ok(());
    }

    for (language, translations) in by_language {
        if !global.quiet {
            println!("{}", language.bold());
        }
        for record in translations {
            if global.quiet {
                println!("{}", record.id);
            } else {
                println!(
                    "   {:<20} {} {}",
                    record.id,
                    record.name,
                    format!("v{}", record.version).dimmed()
                );
            }
        }
    }
    Ok(())
}

/// Translations keyed by language code; coordinating records without a
/// language are left out.
fn group_by_language(records: &[RepositoryDbRecord]) -> BTreeMap<&str, Vec<&RepositoryDbRecord>> {
    let mut groups: BTreeMap<&str, Vec<&RepositoryDbRecord>> = BTreeMap::new();
    for record in records {
        if let Some(language) = record.language.as_deref() {
            groups.entry(language).or_default().push(record);
        }
    }
    for translations in groups.values_mut() {
        translations.sort_by(|a, b| a.id.cmp(&b.id));
    }
    groups
}
