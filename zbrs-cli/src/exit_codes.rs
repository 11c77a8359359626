//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts and CI jobs tell a rejected repository apart from
//! an unreachable one or a missing input file.

use thiserror::Error;
use zbrs_core::{StorageError, ZbrsError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (validation failed, checksum mismatch, failed import).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (repository host or index source unreachable).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (database or output failure).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Failure a command has already reported, carrying the exit code to use.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub code: i32,
    pub message: String,
}

impl CommandFailure {
    pub fn data(message: impl Into<String>) -> Self {
        Self {
            code: DATA_ERROR,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            code: NETWORK_ERROR,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: USAGE_ERROR,
            message: message.into(),
        }
    }
}

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify by the first typed cause in the chain
        let code = err
            .chain()
            .find_map(|cause| {
                if let Some(failure) = cause.downcast_ref::<CommandFailure>() {
                    Some(failure.code)
                } else if let Some(zbrs) = cause.downcast_ref::<ZbrsError>() {
                    Some(classify_zbrs(zbrs))
                } else if let Some(storage) = cause.downcast_ref::<StorageError>() {
                    Some(classify_storage(storage))
                } else {
                    cause.downcast_ref::<std::io::Error>().map(classify_io)
                }
            })
            .unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify_zbrs(err: &ZbrsError) -> i32 {
    match err {
        ZbrsError::Network { .. } => NETWORK_ERROR,
        ZbrsError::InvalidManifest { .. }
        | ZbrsError::Integrity { .. }
        | ZbrsError::Decode(_) => DATA_ERROR,
        ZbrsError::Io { source, .. } => classify_io(source),
        ZbrsError::Storage(storage) => classify_storage(storage),
        ZbrsError::Schema(_) => GENERAL_ERROR,
    }
}

fn classify_storage(err: &StorageError) -> i32 {
    match err {
        StorageError::NotFound(_) => INPUT_ERROR,
        _ => IO_ERROR,
    }
}

fn classify_io(err: &std::io::Error) -> i32 {
    match err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => INPUT_ERROR,
        _ => IO_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_missing_file_is_input_error() {
        let err = std::fs::read("/definitely/not/here.json")
            .context("Failed to read file")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);
    }

    #[test]
    fn test_network_error_is_unavailable() {
        let err = anyhow::Error::new(ZbrsError::network("https://x.org", "timeout"))
            .context("Failed to import");
        assert_eq!(ExitCode::from_anyhow(&err).code, NETWORK_ERROR);
    }

    #[test]
    fn test_command_failure_keeps_code() {
        let err = anyhow::Error::new(CommandFailure::data("1 validation error(s)"));
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, DATA_ERROR);
        assert_eq!(exit.message.as_deref(), Some("1 validation error(s)"));
    }

    #[test]
    fn test_missing_book_is_input_error() {
        let err = anyhow::Error::new(StorageError::NotFound("book 'xyz'".into()));
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);
    }

    #[test]
    fn test_untyped_error_is_general() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);
    }
}
