//! Subcommand implementations.

pub mod checksum;
pub mod discover;
pub mod import;
pub mod list;
pub mod read;
pub mod scan;
pub mod validate;
