//! Import command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};
use zbrs_core::{
    ImportOptions, ImportProgress, ImportResult, Importer, IssueCode, NoopProgress,
    ProgressSink,
};

use crate::exit_codes::CommandFailure;
use crate::utils::{format_duration, format_issue, open_store};
use crate::GlobalOptions;

pub struct ImportArgs {
    pub source: String,
    pub database: Option<String>,
    pub overwrite: bool,
    pub skip_checksums: bool,
    pub translations: Vec<String>,
    pub json: bool,
}

/// Execute the import command.
pub async fn execute(global: &GlobalOptions, args: ImportArgs) -> Result<()> {
    let store = open_store(args.database.as_deref()).await?;
    if args.database.is_none() {
        warn!("No database given, importing into memory (dry run)");
        if !global.quiet && !args.json {
            eprintln!("{}", "No --database given: dry run, nothing is persisted".yellow());
        }
    }

    let importer = Importer::from_config(&global.config, Arc::clone(&store))
        .context("Failed to initialize importer")?;

    // Local paths are accepted as well as URLs
    let location = importer
        .discovery()
        .resolve_location(&args.source)
        .with_context(|| format!("Invalid repository location: {}", args.source))?;

    let options = ImportOptions::new(location.as_str())
        .overwrite(args.overwrite)
        .checksums(!args.skip_checksums);

    let show_progress = !global.quiet && !args.json;
    let printer = |p: ImportProgress| {
        let books = match (p.current_book, p.total_books) {
            (Some(current), Some(total)) => format!(" ({current}/{total})"),
            _ => String::new(),
        };
        eprintln!(
            "{:>4} {:<11} {}{}",
            format!("{}%", p.progress).dimmed(),
            p.stage,
            p.message,
            books
        );
    };

    let sink: &dyn ProgressSink = if show_progress { &printer } else { &NoopProgress };

    let result = if args.translations.is_empty() {
        importer.import_repository(&options, sink).await
    } else {
        importer
            .import_repository_hierarchical(location.as_str(), &args.translations, &options, sink)
            .await
    };

    info!(
        success = result.success,
        books = result.books_imported,
        duration_ms = result.duration_ms,
        "Import finished"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize import result")?
        );
    } else if !global.quiet {
        print_summary(&result);
    }

    if result.success {
        Ok(())
    } else {
        Err(failure(&result).into())
    }
}

fn print_summary(result: &ImportResult) {
    println!();
    if result.success {
        println!("{}", "Import succeeded".green().bold());
    } else {
        println!("{}", "Import failed".red().bold());
    }
    if let Some(id) = &result.repository_id {
        println!("   {} {}", "Repository:".dimmed(), id);
    }
    println!("   {} {}", "Books:".dimmed(), result.books_imported);
    if !result.translations_imported.is_empty() {
        println!(
            "   {} {}",
            "Translations:".dimmed(),
            result.translations_imported.join(", ")
        );
    }
    if !result.translations_skipped.is_empty() {
        println!(
            "   {} {}",
            "Skipped:".dimmed(),
            result.translations_skipped.join(", ").yellow()
        );
    }
    println!("   {} {}", "Duration:".dimmed(), format_duration(result.duration_ms));

    for issue in result.errors.iter().chain(&result.warnings) {
        println!("   {}", format_issue(issue));
    }
}

/// Pick the exit code for a failed import from its error list.
fn failure(result: &ImportResult) -> CommandFailure {
    let message = format!("import failed with {} error(s)", result.errors.len());
    let unreachable = result.books_imported == 0
        && !result.errors.is_empty()
        && result.errors.iter().all(|e| e.code == IssueCode::NetworkError);

    if unreachable {
        CommandFailure::network(message)
    } else {
        CommandFailure::data(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{DATA_ERROR, NETWORK_ERROR};
    use zbrs_core::ValidationIssue;

    #[test]
    fn test_unreachable_repository_maps_to_network() {
        let result = ImportResult {
            errors: vec![ValidationIssue::error(IssueCode::NetworkError, "timeout")],
            ..Default::default()
        };
        assert_eq!(failure(&result).code, NETWORK_ERROR);
    }

    #[test]
    fn test_rejected_repository_maps_to_data_error() {
        let result = ImportResult {
            errors: vec![
                ValidationIssue::error(IssueCode::NetworkError, "timeout"),
                ValidationIssue::error(IssueCode::ChecksumMismatch, "bad digest"),
            ],
            ..Default::default()
        };
        assert_eq!(failure(&result).code, DATA_ERROR);
    }
}
