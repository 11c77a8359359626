//! Checksum command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use zbrs_core::{calculate_checksum, is_sha256_digest, Validator};

use crate::exit_codes::CommandFailure;
use crate::GlobalOptions;

/// Execute the checksum command.
pub async fn execute(global: &GlobalOptions, file: PathBuf, expect: Option<String>) -> Result<()> {
    let Some(expected) = expect else {
        let bytes = tokio::fs::read(&file)
            .await
            .with_context(|| format!("Failed to read file: {}", file.display()))?;
        println!("{}  {}", calculate_checksum(&bytes), file.display());
        return Ok(());
    };

    if !is_sha256_digest(&expected) {
        return Err(CommandFailure::usage(format!(
            "--expect must look like sha256:<64 hex digits>, got {expected}"
        ))
        .into());
    }
    // Surface a missing file as an input error rather than a mismatch
    tokio::fs::metadata(&file)
        .await
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let validator = Validator::new(Arc::new(global.config.policy.clone()))
        .context("Failed to initialize validator")?;
    let check = validator.validate_file_integrity(&file, &expected).await;

    if check.valid {
        if !global.quiet {
            println!("{} {}", "MATCH".green().bold(), file.display());
        }
        Ok(())
    } else {
        if !global.quiet {
            println!("{} {}", "MISMATCH".red().bold(), file.display());
            println!("   {} {}", "Expected:".dimmed(), check.expected);
            println!("   {} {}", "Actual:".dimmed(), check.actual);
        }
        Err(CommandFailure::data(format!("checksum mismatch for {}", file.display())).into())
    }
}
