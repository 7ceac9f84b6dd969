//! Error types for loading descriptors and applying commands.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for apply operations.
pub type ApplyResult<T> = Result<T, ApplyError>;

/// Errors surfaced to the user while applying a command or opening a folder.
///
/// None of these abort the extension; each one is local to a single
/// apply, reload, or open operation.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The external command could not be started.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error while talking to a running process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A multiplexed invocation returned a different number of fields.
    #[error("Command '{identifier}' returned {actual} fields, expected {expected}")]
    FragmentMismatch { identifier: String, expected: usize, actual: usize },

    /// The descriptor names a mode this crate does not know.
    #[error("Command '{identifier}' has unknown mode '{mode}'")]
    UnknownMode { identifier: String, mode: String },

    /// The platform file manager reported a failure.
    #[error("Opening {} failed", .directory.display())]
    FolderOpen { directory: PathBuf, detail: String },

    /// No action is registered under this name.
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

impl ApplyError {
    /// Detail text shown under the notification title, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Spawn { source, .. } => Some(source.to_string()),
            Self::FolderOpen { detail, .. } if !detail.is_empty() => Some(detail.clone()),
            _ => None,
        }
    }
}

/// Errors while scanning the command directory. Each one skips what it
/// names and is reported; the rest of the scan continues.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundled samples could not be written to a new command directory.
    #[error("Failed to populate {}: {source}", .path.display())]
    Seed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory, or one of its entries, could not be listed.
    #[error("Failed to list {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid descriptor JSON.
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but the descriptor is unusable.
    #[error("Invalid descriptor {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}
