//! The error type shared by every part of the library.

use crate::device::ErrorLog;

/// Errors produced while enumerating disks or querying a single disk.
///
/// An enumeration pass turns most of these into soft errors: they are
/// rendered with `Display` and appended to the pass' [`ErrorLog`]. Only
/// failures that leave nothing to iterate over, or an empty table at the
/// end of the pass, are returned to the caller as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Disk enumeration is not supported on {0}")]
    UnsupportedPlatform(String),

    #[error("Required tool `{0}` was not found in PATH")]
    MissingTool(String),

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}. Output: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Could not parse the output of `{command}`: {reason}. Output: {output}")]
    Parse {
        command: String,
        reason: String,
        output: String,
    },

    #[error("No disks found")]
    NoDisksFound { errors: ErrorLog },

    #[error("`{0}` does not look like a disk identifier")]
    UnknownDisk(String),

    #[error("No block size reported for {0}")]
    NoBlockSize(String),
}

impl Error {
    pub(crate) fn parse(command: &str, reason: impl ToString, output: &[u8]) -> Self {
        Error::Parse {
            command: command.to_string(),
            reason: reason.to_string(),
            output: String::from_utf8_lossy(output).trim().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
