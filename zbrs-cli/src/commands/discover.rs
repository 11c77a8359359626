//! Discover command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use zbrs_core::DiscoveryService;

use crate::exit_codes::CommandFailure;
use crate::GlobalOptions;

/// Execute the discover command.
pub async fn execute(mut global: GlobalOptions, sources: Vec<String>) -> Result<()> {
    if !sources.is_empty() {
        global.config.sources = sources;
    }
    if global.config.sources.is_empty() {
        return Err(
            CommandFailure::usage("no index sources: pass --source or set ZBRS_SOURCES").into(),
        );
    }

    let discovery =
        DiscoveryService::new(&global.config).context("Failed to initialize discovery")?;
    let report = discovery.discover_repositories().await;

    for entry in &report.repositories {
        if global.quiet {
            println!("{}", entry.url);
            continue;
        }
        let language = entry.language.as_deref().unwrap_or("-");
        println!("{:<24} {:<6} {}", entry.id.bold(), language, entry.name);
        println!("   {}", entry.url.dimmed());
    }
    for failure in &report.failures {
        eprintln!("{} {}: {}", "unreachable".yellow(), failure.source, failure.error);
    }

    // Every source failing is an outage, some failing is not
    if report.repositories.is_empty() && report.failures.len() == global.config.sources.len() {
        return Err(CommandFailure::network("no index source could be read").into());
    }
    Ok(())
}
