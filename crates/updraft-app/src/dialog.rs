//! Native dialogs through `rfd`.

use async_trait::async_trait;
use rfd::{AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
use tracing::debug;

use updraft_core::{Dialogs, InstallDialogResult};

/// Label of the confirming button.
pub const INSTALL_BUTTON: &str = "Install and restart";
/// Label of the deferring button.
pub const LATER_BUTTON: &str = "Later";

const INSTALL_DETAIL: &str = "It will be installed the next time you restart the application.";

/// [`Dialogs`] shown as native message boxes.
#[derive(Debug, Default, Clone)]
pub struct RfdDialogs;

impl RfdDialogs {
    pub fn new() -> Self {
        Self
    }
}

/// Text of the install question for `app_name`.
pub fn install_message(app_name: &str) -> String {
    format!(
        "A new version of {} has been downloaded.\n\n{}",
        app_name, INSTALL_DETAIL
    )
}

/// Maps the clicked button to an answer. Closing the dialog means "Later".
pub fn interpret(result: &MessageDialogResult) -> InstallDialogResult {
    match result {
        MessageDialogResult::Ok | MessageDialogResult::Yes => InstallDialogResult::InstallAndRestart,
        MessageDialogResult::Custom(label) if label == INSTALL_BUTTON => {
            InstallDialogResult::InstallAndRestart
        }
        _ => InstallDialogResult::Later,
    }
}

#[async_trait]
impl Dialogs for RfdDialogs {
    async fn ask_restart_and_install(&self, app_name: &str) -> InstallDialogResult {
        let result = AsyncMessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(app_name)
            .set_description(install_message(app_name))
            .set_buttons(MessageButtons::OkCancelCustom(
                INSTALL_BUTTON.to_string(),
                LATER_BUTTON.to_string(),
            ))
            .show()
            .await;

        debug!(?result, "Install dialog closed");
        interpret(&result)
    }

    async fn show_error_box(&self, title: &str, content: &str) {
        AsyncMessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(title)
            .set_description(content)
            .set_buttons(MessageButtons::Ok)
            .show()
            .await;
    }
}
