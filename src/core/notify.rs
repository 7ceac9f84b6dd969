//! User-facing notifications.
//!
//! Every reported failure goes through a [`Notifier`] as a dismissible
//! notification; nothing is swallowed.

use parking_lot::Mutex;

use super::error::ApplyError;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub detail: Option<String>,
}

impl Notification {
    /// Notification for a failed operation.
    pub fn from_error(error: &ApplyError) -> Self {
        Self { level: Level::Error, message: error.to_string(), detail: error.detail() }
    }
}

/// The host's dismissible-notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn add_error(&self, message: &str, detail: Option<&str>) {
        self.notify(Notification {
            level: Level::Error,
            message: message.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    fn add_success(&self, message: &str) {
        self.notify(Notification {
            level: Level::Success,
            message: message.to_string(),
            detail: None,
        });
    }

    /// Report an apply error.
    fn report(&self, error: &ApplyError) {
        self.notify(Notification::from_error(error));
    }
}

/// Notifier that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => tracing::info!(message = %notification.message, "Notification"),
            Level::Error => tracing::error!(
                message = %notification.message,
                detail = notification.detail.as_deref().unwrap_or(""),
                "Notification"
            ),
        }
    }
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Recorded errors only.
    pub fn errors(&self) -> Vec<Notification> {
        self.notifications.lock().iter().filter(|n| n.level == Level::Error).cloned().collect()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        LogNotifier.notify(notification.clone());
        self.notifications.lock().push(notification);
    }
}

/// Notifier that raises desktop notifications.
#[cfg(feature = "notifications")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

#[cfg(feature = "notifications")]
impl Notifier for DesktopNotifier {
    fn notify(&self, notification: Notification) {
        use notify_rust::Notification as DesktopNotification;

        use crate::PACKAGE_NAME;

        LogNotifier.notify(notification.clone());

        let icon = match notification.level {
            Level::Success => "dialog-information",
            Level::Error => "dialog-error",
        };
        let result = DesktopNotification::new()
            .summary(&format!("{}: {}", PACKAGE_NAME, notification.message))
            .body(notification.detail.as_deref().unwrap_or(""))
            .icon(icon)
            .appname(PACKAGE_NAME)
            .show();

        if let Err(e) = result {
            tracing::debug!(error = %e, "Desktop notification failed");
        }
    }
}
