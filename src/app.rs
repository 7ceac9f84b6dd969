//! Application state and the command surface.
//!
//! The `App` struct owns the loaded commands and the actions registered for
//! them, and routes invoked actions to the dispatch layer. Every failure is
//! reported through the configured [`Notifier`].

use std::path::Path;
use std::sync::Arc;

use crate::core::{
    apply_command, open_folder, ApplyError, ApplyReport, ApplyResult, CommandDescriptor,
    CommandRegistry, Config, Editor, LaunchRunner, LogNotifier, Notifier, Platform,
    ProcessRunner, SubprocessRunner, SystemLauncher,
};
use crate::PACKAGE_NAME;

/// Label of the context menu entry holding every command.
pub const MENU_LABEL: &str = "Apply command";

/// What an action does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the command with this identifier
    Apply(String),
    /// Rescan the command directory and rebuild every registration
    ReloadCommand,
    /// Open the command directory in the file manager
    ViewCommandFolder,
}

impl Action {
    /// Fully qualified action name, e.g. `apply-command:apply-sort`.
    pub fn name(&self) -> String {
        match self {
            Self::Apply(identifier) => format!("{PACKAGE_NAME}:apply-{identifier}"),
            Self::ReloadCommand => format!("{PACKAGE_NAME}:reload-command"),
            Self::ViewCommandFolder => format!("{PACKAGE_NAME}:view-command-folder"),
        }
    }
}

/// One registered action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub action: Action,
}

/// An entry in the command submenu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Command { label: String, action: String },
    Separator,
}

/// The context menu: one labelled entry with a submenu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub label: String,
    pub submenu: Vec<MenuItem>,
}

/// Owned set of registrations. Rebuilding disposes everything first.
#[derive(Debug, Clone, Default)]
pub struct CommandSurface {
    registrations: Vec<Registration>,
    menu: Option<ContextMenu>,
}

impl CommandSurface {
    /// Drop every registration and the menu, then register `commands` plus
    /// the utility actions.
    pub fn rebuild(&mut self, commands: &[CommandDescriptor]) {
        self.dispose();

        let mut submenu = Vec::with_capacity(commands.len() + 3);
        for command in commands {
            let action = Action::Apply(command.identifier.clone());
            submenu.push(MenuItem::Command {
                label: command.display_label.clone(),
                action: action.name(),
            });
            self.register(action);
        }

        submenu.push(MenuItem::Separator);
        for (label, action) in [
            ("Reload command", Action::ReloadCommand),
            ("View command directory", Action::ViewCommandFolder),
        ] {
            submenu.push(MenuItem::Command { label: label.to_string(), action: action.name() });
            self.register(action);
        }

        self.menu = Some(ContextMenu { label: MENU_LABEL.to_string(), submenu });
    }

    /// Remove everything.
    pub fn dispose(&mut self) {
        self.registrations.clear();
        self.menu = None;
    }

    fn register(&mut self, action: Action) {
        self.registrations.push(Registration { name: action.name(), action });
    }

    /// Look up an action by its full name.
    pub fn resolve(&self, name: &str) -> Option<&Action> {
        self.registrations.iter().find(|r| r.name == name).map(|r| &r.action)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }
}

/// Main application state.
pub struct App {
    /// Application configuration
    pub config: Config,

    /// Commands from the last load
    registry: CommandRegistry,

    /// Registered actions and menu
    surface: CommandSurface,

    /// Runs filter commands
    runner: Arc<dyn ProcessRunner>,

    /// Runs the file manager
    launcher: Arc<dyn LaunchRunner>,

    /// Receives every reported failure
    notifier: Arc<dyn Notifier>,

    /// Selects the file manager launcher
    platform: Platform,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("surface", &self.surface)
            .field("platform", &self.platform)
            .finish()
    }
}

impl App {
    /// Create an application for `config`. Nothing is loaded until [`App::activate`].
    pub fn new(config: Config) -> Self {
        let directory = config.command_directory();
        Self {
            registry: CommandRegistry::new(&directory),
            surface: CommandSurface::default(),
            runner: Arc::new(SubprocessRunner::new(directory)),
            launcher: Arc::new(SystemLauncher),
            notifier: Arc::new(LogNotifier),
            platform: Platform::current(),
            config,
        }
    }

    /// Use a different process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Use a different file manager launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn LaunchRunner>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Use a different notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Pretend to run on `platform`.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Load commands and register their actions. Returns the command count.
    ///
    /// Every skipped descriptor is reported through the notifier.
    pub fn activate(&mut self) -> usize {
        for error in self.registry.load() {
            self.notifier.add_error(&error.to_string(), None);
        }
        self.surface.rebuild(self.registry.get_all());
        self.registry.len()
    }

    /// Rescan the command directory and rebuild the surface.
    ///
    /// Invocations already running keep the descriptor they started with.
    pub fn reload(&mut self) -> usize {
        let count = self.activate();
        tracing::info!(count, directory = ?self.registry.directory(), "Reloaded commands");
        count
    }

    /// Unregister everything.
    pub fn deactivate(&mut self) {
        self.surface.dispose();
    }

    /// Commands from the last load.
    pub fn commands(&self) -> &[CommandDescriptor] {
        self.registry.get_all()
    }

    /// The command directory.
    pub fn command_directory(&self) -> &Path {
        self.registry.directory()
    }

    pub fn surface(&self) -> &CommandSurface {
        &self.surface
    }

    /// Run the command `identifier` over the editor.
    ///
    /// Failures are reported through the notifier and also returned in the
    /// report.
    pub async fn apply<E>(&self, identifier: &str, editor: &mut E) -> ApplyResult<ApplyReport>
    where
        E: Editor + ?Sized,
    {
        let Some(descriptor) = self.registry.get_by_id(identifier).cloned() else {
            let err = ApplyError::UnknownAction(Action::Apply(identifier.to_string()).name());
            self.notifier.report(&err);
            return Err(err);
        };

        let report = apply_command(editor, &descriptor, self.runner.as_ref()).await;
        for (_, error) in &report.failures {
            self.notifier.report(error);
        }
        Ok(report)
    }

    /// Open the command directory in the platform file manager.
    pub async fn view_command_folder(&self) -> ApplyResult<()> {
        let result =
            open_folder(self.launcher.as_ref(), self.platform, self.registry.directory()).await;
        if let Err(ref e) = result {
            self.notifier.report(e);
        }
        result
    }

    /// Invoke a registered action by its full name.
    pub async fn invoke<E>(&mut self, name: &str, editor: &mut E) -> ApplyResult<()>
    where
        E: Editor + ?Sized,
    {
        let Some(action) = self.surface.resolve(name).cloned() else {
            let err = ApplyError::UnknownAction(name.to_string());
            self.notifier.report(&err);
            return Err(err);
        };

        match action {
            Action::Apply(identifier) => self.apply(&identifier, editor).await.map(|_| ()),
            Action::ReloadCommand => {
                self.reload();
                Ok(())
            }
            Action::ViewCommandFolder => self.view_command_folder().await,
        }
    }
}
