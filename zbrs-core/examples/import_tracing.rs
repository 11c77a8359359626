//! Example demonstrating import pipeline tracing instrumentation.
//!
//! Run with: cargo run -p zbrs-core --example import_tracing -- <repository url or path>

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};
use zbrs_core::{ImportOptions, ImportProgress, Importer, MemoryStore, PipelineConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("zbrs_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let Some(source) = std::env::args().nth(1) else {
        eprintln!("usage: import_tracing <repository url or path>");
        return;
    };

    println!("=== ZBRS Import Tracing Demo ===\n");

    let config = PipelineConfig::from_env();
    println!("Policy: {:?}\n", config.policy);

    let store = Arc::new(MemoryStore::new());
    let importer = match Importer::from_config(&config, store.clone()) {
        Ok(importer) => importer,
        Err(e) => {
            eprintln!("Failed to create importer: {}", e);
            return;
        }
    };

    let sink = |p: ImportProgress| println!("[{:>3}%] {:<11} {}", p.progress, p.stage, p.message);
    let result = importer
        .import_repository(&ImportOptions::new(source), &sink)
        .await;

    if result.success {
        println!("\n✅ Success!");
    } else {
        println!("\n❌ Failed:");
    }
    println!("   Books:    {}", result.books_imported);
    println!("   Imported: {:?}", result.translations_imported);
    println!("   Skipped:  {:?}", result.translations_skipped);
    for issue in result.errors.iter().chain(&result.warnings) {
        println!("   {}", issue);
    }
    println!("   Stored repositories: {}", store.repository_count());
}
