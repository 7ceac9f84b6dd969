//! Opening the command directory in the platform file manager.
//!
//! The launcher for each platform comes from one lookup, and the result of
//! running it is interpreted by a pure function, so neither needs a real
//! file manager to test.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as ProcessCommand;

use super::error::{ApplyError, ApplyResult};

/// Platforms with a distinct file manager launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// A file manager invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    /// Executable to run
    pub command: PathBuf,

    /// Arguments, ending with the directory
    pub args: Vec<String>,

    /// Human name of the file manager
    pub label: &'static str,
}

/// The launcher for `platform`. `system_root` is Windows' `SystemRoot`.
pub fn file_manager_command(
    platform: Platform,
    directory: &Path,
    system_root: Option<&str>,
) -> Launcher {
    let directory = directory.display().to_string();
    match platform {
        Platform::MacOs => Launcher {
            command: PathBuf::from("open"),
            args: vec!["-R".to_string(), directory],
            label: "Finder",
        },
        Platform::Windows => Launcher {
            command: system_root
                .filter(|root| !root.is_empty())
                .map(|root| Path::new(root).join("explorer.exe"))
                .unwrap_or_else(|| PathBuf::from("explorer.exe")),
            args: vec![directory],
            label: "Explorer",
        },
        Platform::Other => Launcher {
            command: PathBuf::from("xdg-open"),
            args: vec![directory],
            label: "File Manager",
        },
    }
}

/// How a launcher exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,

    /// Captured stderr
    pub stderr: String,
}

/// Decide whether a launcher run failed.
///
/// Explorer exits with 1 and prints nothing even when it opened the folder,
/// so that case counts as success.
pub fn interpret_launch(
    platform: Platform,
    directory: &Path,
    outcome: &LaunchOutcome,
) -> ApplyResult<()> {
    let detail = outcome.stderr.lines().collect::<Vec<_>>().join("\n");

    let mut failed = outcome.code != Some(0);
    if platform == Platform::Windows && outcome.code == Some(1) && detail.is_empty() {
        failed = false;
    }

    if failed {
        Err(ApplyError::FolderOpen { directory: directory.to_path_buf(), detail })
    } else {
        Ok(())
    }
}

/// Runs a launcher and reports how it exited.
#[async_trait]
pub trait LaunchRunner: Send + Sync {
    async fn launch(&self, launcher: &Launcher) -> std::io::Result<LaunchOutcome>;
}

/// Runs launchers as real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl LaunchRunner for SystemLauncher {
    async fn launch(&self, launcher: &Launcher) -> std::io::Result<LaunchOutcome> {
        let output = ProcessCommand::new(&launcher.command)
            .args(&launcher.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(LaunchOutcome {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Open `directory` in the file manager for `platform`.
pub async fn open_folder<L>(launcher: &L, platform: Platform, directory: &Path) -> ApplyResult<()>
where
    L: LaunchRunner + ?Sized,
{
    let system_root = std::env::var("SystemRoot").ok();
    let command = file_manager_command(platform, directory, system_root.as_deref());
    tracing::debug!(launcher = ?command.command, args = ?command.args, "Opening folder");

    let outcome = launcher.launch(&command).await.map_err(|e| ApplyError::FolderOpen {
        directory: directory.to_path_buf(),
        detail: e.to_string(),
    })?;

    interpret_launch(platform, directory, &outcome)
}
