//! Primitives provided by the host application.

use async_trait::async_trait;

use crate::events::WindowEvent;
use crate::models::InstallDialogResult;

/// The application window receiving update events.
pub trait AppWindow: Send + Sync {
    /// Pushes an event to the UI. Delivery is best-effort.
    fn send(&self, event: WindowEvent);
}

/// Native dialogs.
#[async_trait]
pub trait Dialogs: Send + Sync {
    /// Asks whether to install the downloaded update now.
    async fn ask_restart_and_install(&self, app_name: &str) -> InstallDialogResult;

    /// Shows a blocking error box.
    async fn show_error_box(&self, title: &str, content: &str);
}

/// Desktop notifications.
pub trait Notifier: Send + Sync {
    /// Shows a notification. Delivery is best-effort.
    fn notify(&self, title: &str, body: &str);
}
