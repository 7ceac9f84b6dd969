//! Command descriptor data structures.
//!
//! Defines the `CommandDescriptor` loaded from one JSON file in the
//! command directory, and the dispatch mode it selects.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::LoadError;

/// Mode string for one invocation per selection.
pub const MODE_REPLACE: &str = "replace-command";

/// Mode string for all selections multiplexed into one invocation.
pub const MODE_REPLACE_MULTI: &str = "replaceMulti-command";

/// How a command's output is folded back into the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One invocation per non-empty selection, each written back on its own.
    #[default]
    SingleReplace,
    /// All selections joined by NUL into one invocation and split back apart.
    MultiplexReplace,
    /// A mode string this crate does not recognize. Rejected at apply time.
    Unknown(String),
}

impl DispatchMode {
    /// Parse a descriptor `mode` value. Never fails; unrecognized strings are kept.
    pub fn parse(mode: &str) -> Self {
        match mode {
            MODE_REPLACE => Self::SingleReplace,
            MODE_REPLACE_MULTI => Self::MultiplexReplace,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The string used for this mode in descriptor files.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleReplace => MODE_REPLACE,
            Self::MultiplexReplace => MODE_REPLACE_MULTI,
            Self::Unknown(mode) => mode,
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of a descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorFile {
    /// Executable path or name
    pub command: String,

    /// Arguments passed verbatim
    pub args: Vec<String>,

    /// Label shown in the menu
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,

    /// Dispatch mode; defaults to `replace-command`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// A filter command loaded from the command directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Identifier derived from the file name without extension
    pub identifier: String,

    /// Executable to spawn
    pub executable: String,

    /// Ordered argument list
    pub arguments: Vec<String>,

    /// How output is applied
    pub mode: DispatchMode,

    /// Menu label
    pub display_label: String,

    /// File this descriptor was loaded from
    pub source: PathBuf,
}

impl CommandDescriptor {
    /// Create a descriptor with minimal required fields.
    pub fn new(identifier: impl Into<String>, executable: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            display_label: identifier.clone(),
            identifier,
            executable: executable.into(),
            arguments: Vec::new(),
            mode: DispatchMode::SingleReplace,
            source: PathBuf::new(),
        }
    }

    /// Build a descriptor from parsed file contents.
    pub fn from_file(identifier: &str, file: DescriptorFile, source: &Path) -> Self {
        let mode = file.mode.as_deref().map(DispatchMode::parse).unwrap_or_default();
        let display_label = file
            .command_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| identifier.to_string());

        Self {
            identifier: identifier.to_string(),
            executable: file.command,
            arguments: file.args,
            mode,
            display_label,
            source: source.to_path_buf(),
        }
    }

    /// Parse a descriptor from JSON text.
    pub fn parse(identifier: &str, content: &str, source: &Path) -> Result<Self, LoadError> {
        let file: DescriptorFile = serde_json::from_str(content)
            .map_err(|e| LoadError::Parse { path: source.to_path_buf(), source: e })?;

        if file.command.trim().is_empty() {
            return Err(LoadError::Invalid {
                path: source.to_path_buf(),
                reason: "'command' must not be empty".to_string(),
            });
        }

        Ok(Self::from_file(identifier, file, source))
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the dispatch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the menu label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = label.into();
        self
    }

    /// The command line as shown in diagnostics: executable then arguments.
    pub fn command_line(&self) -> String {
        if self.arguments.is_empty() {
            self.executable.clone()
        } else {
            format!("{} {}", self.executable, self.arguments.join(" "))
        }
    }
}
