//! apply-command - run filter commands over text.
//!
//! A small host for the library: loads the command directory, applies a
//! command to a file or stdin, and manages the directory itself.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use apply_command::core::{Level, LogNotifier, Notification, Notifier, RecordingNotifier};
use apply_command::{App, Config, Editor, MenuItem, TextBuffer, TextRange};

/// Run external filter commands over text selections
#[derive(Parser)]
#[command(name = "apply-command")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Command directory (overrides the config file)
    #[arg(long, global = true, env = "APPLY_COMMAND_DIR")]
    command_dir: Option<String>,

    /// Raise desktop notifications for failures
    #[arg(long, global = true)]
    notify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available commands
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a command to a file or stdin
    Apply {
        /// Command identifier (descriptor file name without .json)
        identifier: String,

        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Byte range to filter, as START:END; repeat for multiple selections
        #[arg(short, long = "range", value_parser = parse_range)]
        ranges: Vec<TextRange>,

        /// Write the result back to the file instead of stdout
        #[arg(short, long, requires = "file")]
        write: bool,
    },

    /// Rescan the command directory and show the menu
    Reload,

    /// Open the command directory in the file manager
    OpenFolder,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn parse_range(value: &str) -> Result<TextRange, String> {
    let (start, end) =
        value.split_once(':').ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start = start.trim().parse::<usize>().map_err(|e| format!("bad start: {e}"))?;
    let end = end.trim().parse::<usize>().map_err(|e| format!("bad end: {e}"))?;
    Ok(TextRange::new(start, end))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let mut config = Config::load()?;
    if let Some(dir) = cli.command_dir.clone() {
        config = config.with_command_directory(dir);
    }

    match cli.command {
        Commands::List { format } => cmd_list(config, &format),
        Commands::Apply { identifier, file, ranges, write } => {
            cmd_apply(config, cli.notify, &identifier, file, ranges, write)
        }
        Commands::Reload => cmd_reload(config, cli.notify),
        Commands::OpenFolder => cmd_open_folder(config, cli.notify),
        Commands::Config { path } => cmd_config(&config, path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Build the notifier chain for this run.
fn notifier(desktop: bool) -> (Arc<RecordingNotifier>, Arc<dyn Notifier>) {
    let recorder = Arc::new(RecordingNotifier::new());
    let outer: Arc<dyn Notifier> = if desktop {
        Arc::new(Forward { first: recorder.clone(), second: desktop_notifier() })
    } else {
        recorder.clone()
    };
    (recorder, outer)
}

#[cfg(feature = "notifications")]
fn desktop_notifier() -> Arc<dyn Notifier> {
    Arc::new(apply_command::core::DesktopNotifier)
}

#[cfg(not(feature = "notifications"))]
fn desktop_notifier() -> Arc<dyn Notifier> {
    Arc::new(LogNotifier)
}

/// Sends each notification to two notifiers.
struct Forward {
    first: Arc<RecordingNotifier>,
    second: Arc<dyn Notifier>,
}

impl Notifier for Forward {
    fn notify(&self, notification: Notification) {
        self.first.notify(notification.clone());
        self.second.notify(notification);
    }
}

/// Print and clear the errors recorded so far. Returns how many there were.
fn print_errors(recorder: &RecordingNotifier) -> usize {
    let errors: Vec<_> =
        recorder.drain().into_iter().filter(|n| n.level == Level::Error).collect();
    for error in &errors {
        eprintln!("error: {}", error.message);
        if let Some(detail) = &error.detail {
            for line in detail.lines() {
                eprintln!("  {line}");
            }
        }
    }
    errors.len()
}

/// List available commands.
fn cmd_list(config: Config, format: &str) -> Result<()> {
    let (recorder, notifier) = notifier(false);
    let mut app = App::new(config).with_notifier(notifier);
    app.activate();
    print_errors(&recorder);

    match format {
        "json" => {
            let commands: Vec<_> = app
                .commands()
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "identifier": c.identifier,
                        "label": c.display_label,
                        "command": c.executable,
                        "args": c.arguments,
                        "mode": c.mode.as_str(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&commands)?);
        }
        _ => {
            for cmd in app.commands() {
                println!("{:<24} {} [{}]", cmd.identifier, cmd.display_label, cmd.mode);
            }
            println!("\nTotal: {} commands", app.commands().len());
        }
    }

    Ok(())
}

/// Apply a command to a file or stdin.
fn cmd_apply(
    config: Config,
    desktop: bool,
    identifier: &str,
    file: Option<PathBuf>,
    ranges: Vec<TextRange>,
    write: bool,
) -> Result<()> {
    let text = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let mut buffer = TextBuffer::new(text);
    if !ranges.is_empty() {
        buffer.select(ranges)?;
    }

    let (recorder, notifier) = notifier(desktop);
    let mut app = App::new(config).with_notifier(notifier);
    app.activate();
    print_errors(&recorder);

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(app.apply(identifier, &mut buffer));

    if print_errors(&recorder) > 0 || report.is_err() {
        anyhow::bail!("'{identifier}' did not apply cleanly");
    }

    match (&file, write) {
        (Some(path), true) => std::fs::write(path, buffer.text())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(buffer.text().as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Reload and print the menu.
fn cmd_reload(config: Config, desktop: bool) -> Result<()> {
    let (recorder, notifier) = notifier(desktop);
    let mut app = App::new(config).with_notifier(notifier);
    let count = app.reload();
    print_errors(&recorder);

    println!("Loaded {count} commands from {}", app.command_directory().display());
    if let Some(menu) = app.surface().menu() {
        println!("{}", menu.label);
        for item in &menu.submenu {
            match item {
                MenuItem::Command { label, action } => println!("  {label:<28} {action}"),
                MenuItem::Separator => println!("  ---"),
            }
        }
    }

    Ok(())
}

/// Open the command directory.
fn cmd_open_folder(config: Config, desktop: bool) -> Result<()> {
    let (recorder, notifier) = notifier(desktop);
    let mut app = App::new(config).with_notifier(notifier);
    app.activate();

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(app.view_command_folder());
    print_errors(&recorder);
    result?;

    Ok(())
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(config)?;
    println!("{toml}");
    println!("# command directory: {}", config.command_directory().display());

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "apply-command", &mut io::stdout());
}
