//! Validate command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use zbrs_core::{ManifestKind, Validator};

use crate::exit_codes::CommandFailure;
use crate::utils::{load_json, print_issues};
use crate::GlobalOptions;

/// Execute the validate command.
pub async fn execute(global: &GlobalOptions, file: PathBuf, book: bool, json: bool) -> Result<()> {
    let raw = load_json(&file)?;

    let validator = Validator::new(Arc::new(global.config.policy.clone()))
        .context("Failed to initialize validator")?;

    let (label, result) = if book {
        ("book", validator.validate_book(&raw, None))
    } else {
        let label = match ManifestKind::classify(&raw) {
            Some(ManifestKind::Parent) => "parent manifest",
            Some(ManifestKind::Translation) => "translation manifest",
            None => "manifest",
        };
        (label, validator.validate_manifest(&raw))
    };

    info!(
        path = %file.display(),
        valid = result.is_valid(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Validated {label}"
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize validation result")?
        );
    } else if !global.quiet {
        if result.is_valid() {
            println!("{} {} ({})", "VALID".green().bold(), file.display(), label);
        } else {
            println!("{} {} ({})", "INVALID".red().bold(), file.display(), label);
        }
        print_issues(&result, "   ");
    }

    if result.is_valid() {
        Ok(())
    } else {
        Err(CommandFailure::data(format!(
            "{} failed validation with {} error(s)",
            file.display(),
            result.errors.len()
        ))
        .into())
    }
}
