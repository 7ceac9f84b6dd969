#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_self)]

//! # apply-command
//!
//! Run external filter commands (formatters, sorters, text transformers)
//! over editor selections and fold their output back into the buffer.
//!
//! ## Features
//!
//! - **Command directory**: one JSON descriptor per command, seeded with samples
//! - **Per-selection dispatch**: every selection filtered by its own process
//! - **Multiplexed dispatch**: all selections in one process, NUL-separated
//! - **Atomic writes**: multiplexed results land as a single undo step
//!
//! ## Descriptor format
//!
//! ```json
//! {
//!   "commandName": "Uppercase each selection",
//!   "command": "tr",
//!   "args": ["a-z", "A-Z"],
//!   "mode": "replaceMulti-command"
//! }
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use apply_command::{apply_command, CommandDescriptor, SubprocessRunner, TextBuffer};
//!
//! # async fn demo() {
//! let mut buffer = TextBuffer::new("b\na\n");
//! let sort = CommandDescriptor::new("sort", "sort");
//! let runner = SubprocessRunner::new(std::env::temp_dir());
//!
//! let report = apply_command(&mut buffer, &sort, &runner).await;
//! assert!(report.is_success());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::len_without_is_empty)]

pub mod app;
pub mod core;

// Re-export commonly used types
pub use app::{Action, App, CommandSurface, ContextMenu, MenuItem};
pub use core::{
    apply_command, ApplyError, ApplyReport, CommandDescriptor, CommandRegistry, Config,
    DispatchMode, Editor, ExecutionResult, Notifier, ProcessRunner, SubprocessRunner, TextBuffer,
    TextRange,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name, used as the prefix of every action name
pub const PACKAGE_NAME: &str = "apply-command";
