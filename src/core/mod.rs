//! Core types and functionality for apply-command.
//!
//! This module contains the command registry, the process runner, the
//! selection reconciler, and the dispatch modes built on top of them.

mod config;
mod descriptor;
mod dispatch;
mod error;
mod folder;
mod notify;
mod registry;
mod runner;
mod selection;

pub use config::{Config, GeneralConfig, LOCAL_CONFIG_FILE};
pub use descriptor::{
    CommandDescriptor, DescriptorFile, DispatchMode, MODE_REPLACE, MODE_REPLACE_MULTI,
};
pub use dispatch::{
    apply_command, join_fields, sanitize_field, split_fields, ApplyReport, Target,
    FIELD_SEPARATOR,
};
pub use error::{ApplyError, ApplyResult, LoadError};
pub use folder::{
    file_manager_command, interpret_launch, open_folder, LaunchOutcome, LaunchRunner, Launcher,
    Platform, SystemLauncher,
};
#[cfg(feature = "notifications")]
pub use notify::DesktopNotifier;
pub use notify::{Level, LogNotifier, Notification, Notifier, RecordingNotifier};
pub use registry::{
    ensure_command_directory, identifier_for, load_descriptor, load_descriptors,
    CommandRegistry, LoadReport, BUNDLED_SAMPLES, DESCRIPTOR_EXTENSION,
};
pub use runner::{diagnostic_line, ExecutionResult, ProcessRunner, SubprocessRunner};
pub use selection::{
    apply, classify, transact, write_selection, Classification, Editor, InvalidRange, MarkerId,
    Selection, SelectionSet, TextBuffer, TextRange,
};
