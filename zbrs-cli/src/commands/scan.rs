//! Scan command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use zbrs_core::{DiscoveryService, ScannedTranslation};

use crate::exit_codes::CommandFailure;
use crate::utils::print_issues;
use crate::GlobalOptions;

/// Execute the scan command.
pub async fn execute(global: &GlobalOptions, dir: PathBuf, hierarchical: bool) -> Result<()> {
    let discovery =
        DiscoveryService::new(&global.config).context("Failed to initialize discovery")?;

    if hierarchical {
        scan_parent(&discovery, dir, global.quiet).await
    } else {
        scan_flat(&discovery, dir, global.quiet).await
    }
}

async fn scan_flat(discovery: &DiscoveryService, dir: PathBuf, quiet: bool) -> Result<()> {
    let scan = discovery
        .scan_directory_for_repositories(&dir)
        .await
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    if !quiet {
        for repo in &scan.repositories {
            println!(
                "{} {} {} ({}, v{})",
                "OK".green().bold(),
                repo.manifest.id(),
                repo.path.display().to_string().dimmed(),
                repo.manifest.kind(),
                repo.manifest.version()
            );
            print_issues(&repo.validation, "   ");
        }
        for error in &scan.errors {
            println!("{} {}: {}", "FAIL".red().bold(), error.path.display(), error.message);
            if let Some(validation) = &error.validation {
                print_issues(validation, "   ");
            }
        }
        println!(
            "\n{} repositories, {} failed",
            scan.repositories.len(),
            scan.errors.len()
        );
    }

    if scan.errors.is_empty() {
        Ok(())
    } else {
        Err(CommandFailure::data(format!(
            "{} repositories under {} failed validation",
            scan.errors.len(),
            dir.display()
        ))
        .into())
    }
}

async fn scan_parent(discovery: &DiscoveryService, dir: PathBuf, quiet: bool) -> Result<()> {
    let scan = discovery
        .scan_hierarchical_repository(&dir)
        .await
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    let failed: Vec<&ScannedTranslation> =
        scan.translations.iter().filter(|t| !t.is_ok()).collect();

    if !quiet {
        println!(
            "{} {} ({} translations)",
            scan.parent.repository.id.bold(),
            scan.parent.repository.name,
            scan.translations.len()
        );
        print_issues(&scan.parent_validation, "   ");

        for translation in &scan.translations {
            let status = if translation.is_ok() {
                "OK".green().bold()
            } else {
                "FAIL".red().bold()
            };
            println!("   {} {} ({})", status, translation.id, translation.directory);
            if let Some(error) = &translation.error {
                println!("      {}", error);
            }
            if let Some(validation) = &translation.validation {
                print_issues(validation, "      ");
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CommandFailure::data(format!(
            "{} of {} translations failed validation",
            failed.len(),
            scan.translations.len()
        ))
        .into())
    }
}
