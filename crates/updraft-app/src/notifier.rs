//! Desktop notifications through the platform notification service.

use updraft_core::Notifier;

/// How long a notification stays on screen.
#[cfg(feature = "notifications")]
const NOTIFICATION_TIMEOUT_MS: u32 = 5000;

/// [`Notifier`] showing native desktop notifications.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    /// Creates a notifier posting as `app_name`.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Name notifications are posted under.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
}

impl Notifier for DesktopNotifier {
    #[cfg(feature = "notifications")]
    fn notify(&self, title: &str, body: &str) {
        use notify_rust::Notification;

        match Notification::new()
            .summary(title)
            .body(body)
            .appname(&self.app_name)
            .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
            .show()
        {
            Ok(_) => tracing::debug!(title, "Notification shown"),
            Err(e) => tracing::warn!(error = %e, title, "Failed to show notification"),
        }
    }

    #[cfg(not(feature = "notifications"))]
    fn notify(&self, title: &str, _body: &str) {
        tracing::debug!(title, "Notifications compiled out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_under_application_name() {
        let notifier = DesktopNotifier::new("Rocket");
        assert_eq!(notifier.app_name(), "Rocket");
    }
}
