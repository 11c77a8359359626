//! ZBRS CLI - import, validate and read Bible repositories.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use zbrs_core::PipelineConfig;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Validation failed, checksum mismatch or import failed
  66  Input file not found
  69  Repository or index source unreachable
  74  I/O or database error";

#[derive(Parser)]
#[command(name = "zbrs")]
#[command(author, version, about = "Discover, validate and import ZBRS Bible repositories", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Only print errors and machine-readable output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Accept plain http:// repository URLs
    #[arg(long, global = true)]
    allow_http: bool,

    /// Do not require manifest checksums
    #[arg(long, global = true)]
    no_require_checksums: bool,

    /// When to colorize output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a repository (URL or local path) into a database
    Import {
        /// Repository URL, manifest URL or local directory
        #[arg(value_name = "SOURCE")]
        source: String,

        /// SQLite database URL; without it the import is a dry run in memory
        #[arg(long, env = "ZBRS_DATABASE_URL")]
        database: Option<String>,

        /// Replace the content of a repository that was imported before
        #[arg(long)]
        overwrite: bool,

        /// Skip book checksum verification
        #[arg(long)]
        skip_checksums: bool,

        /// Import only these translation ids (repeatable)
        #[arg(short, long = "translation", value_name = "ID")]
        translations: Vec<String>,

        /// Print the import result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a manifest or book file
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Validate the file as a book instead of a manifest
        #[arg(long)]
        book: bool,

        /// Print the validation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan a local directory for repositories
    Scan {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Treat DIR as a parent repository and scan its translations
        #[arg(long)]
        hierarchical: bool,
    },

    /// Compute or verify the SHA-256 checksum of a file
    Checksum {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Expected digest (sha256:<hex>); fails when it does not match
        #[arg(long, value_name = "DIGEST")]
        expect: Option<String>,
    },

    /// List repositories advertised by index sources
    Discover {
        /// Index URL to query (repeatable, defaults to ZBRS_SOURCES)
        #[arg(long = "source", value_name = "URL")]
        sources: Vec<String>,
    },

    /// List imported translations grouped by language
    List {
        #[arg(long, env = "ZBRS_DATABASE_URL")]
        database: String,
    },

    /// Print one chapter of an imported translation
    Read {
        #[arg(long, env = "ZBRS_DATABASE_URL")]
        database: String,

        /// Translation (repository) id
        #[arg(value_name = "TRANSLATION")]
        translation: String,

        /// Book id or abbreviation
        #[arg(value_name = "BOOK")]
        book: String,

        #[arg(value_name = "CHAPTER")]
        chapter: u32,
    },
}

/// Settings shared by every subcommand.
pub struct GlobalOptions {
    pub quiet: bool,
    pub config: PipelineConfig,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "zbrs_core=debug,zbrs_cli=debug,info" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::from_env();
    if cli.allow_http {
        config.policy.allow_http = true;
    }
    if cli.no_require_checksums {
        config.policy.require_checksums = false;
    }
    let global = GlobalOptions {
        quiet: cli.quiet,
        config,
    };

    match cli.command {
        Commands::Import {
            source,
            database,
            overwrite,
            skip_checksums,
            translations,
            json,
        } => {
            let args = commands::import::ImportArgs {
                source,
                database,
                overwrite,
                skip_checksums,
                translations,
                json,
            };
            commands::import::execute(&global, args).await
        }
        Commands::Validate { file, book, json } => {
            commands::validate::execute(&global, file, book, json).await
        }
        Commands::Scan { dir, hierarchical } => {
            commands::scan::execute(&global, dir, hierarchical).await
        }
        Commands::Checksum { file, expect } => {
            commands::checksum::execute(&global, file, expect).await
        }
        Commands::Discover { sources } => commands::discover::execute(global, sources).await,
        Commands::List { database } => commands::list::execute(&global, &database).await,
        Commands::Read {
            database,
            translation,
            book,
            chapter,
        } => commands::read::execute(&global, &database, &translation, &book, chapter).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.verbose);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
