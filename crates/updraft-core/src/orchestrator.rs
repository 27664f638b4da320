//! Bridges backend notifications to the application window and to
//! UI-triggered commands.
//!
//! Every request flow (a download, the background auto-update) owns its own
//! backend subscription and drops it once the flow resolves, so repeated
//! checks and downloads never fan out into duplicate notifications.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::UpdateBackend;
use crate::config::OrchestratorConfig;
use crate::error::{ErrorPayload, Result, UpdateError};
use crate::events::{BackendEvent, WindowEvent};
use crate::host::{AppWindow, Dialogs, Notifier};
use crate::models::{
    AppInfo, InstallDialogResult, ProgressInfo, UpdateCheckResult, UpdateInfo, UpdateNotification,
};

/// Argument of a download progress callback: a tick, or the failure that
/// ended the download.
pub type ProgressResult<'a> = std::result::Result<&'a ProgressInfo, &'a UpdateError>;

/// Title of the modal shown when the background flow fails.
const ERROR_BOX_TITLE: &str = "Error: ";

/// Title of the notification sent when a check-triggered download completes.
const READY_NOTIFICATION_TITLE: &str = "A new update is ready to install";

/// How the background auto-update flow ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoUpdateOutcome {
    /// Not a packaged build; nothing was checked.
    NotPackaged,
    /// The running version is current.
    UpToDate,
    /// An update exists but automatic download is off.
    Pending(UpdateInfo),
    /// Downloaded; the user chose "Later".
    Deferred(UpdateInfo),
    /// Downloaded; the installer hand-over is scheduled.
    InstallScheduled(UpdateInfo),
}

/// Keeps the availability bridge alive. Dropping it stops the bridge.
#[derive(Debug)]
pub struct BridgeHandle {
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stops forwarding notifications.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Returns true once the bridge has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The update orchestrator.
///
/// Holds no update state of its own; it is cheap to clone and every clone
/// talks to the same backend, window and dialogs.
#[derive(Clone)]
pub struct UpdateOrchestrator {
    backend: Arc<dyn UpdateBackend>,
    window: Arc<dyn AppWindow>,
    dialogs: Arc<dyn Dialogs>,
    notifier: Option<Arc<dyn Notifier>>,
    app: AppInfo,
    config: OrchestratorConfig,
}

impl UpdateOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        backend: Arc<dyn UpdateBackend>,
        window: Arc<dyn AppWindow>,
        dialogs: Arc<dyn Dialogs>,
        app: AppInfo,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            backend,
            window,
            dialogs,
            notifier: None,
            app,
            config,
        }
    }

    /// Sets the notifier told about updates downloaded after a check.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Returns the application identity.
    pub fn app(&self) -> &AppInfo {
        &self.app
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Starts forwarding availability notices to the window as
    /// `update-can-available`. Attach once per window.
    pub fn attach(&self) -> BridgeHandle {
        let mut events = self.backend.subscribe();
        let window = Arc::clone(&self.window);
        let version = self.app.version.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => forward_availability(window.as_ref(), &version, event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Update bridge lagged behind backend notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Update bridge stopped");
        });

        BridgeHandle { task }
    }

    /// Checks the feed for a newer version.
    ///
    /// Refuses with [`UpdateError::Packaging`] outside packaged builds without
    /// touching the backend; any backend failure comes back as
    /// [`UpdateError::Network`].
    ///
    /// When an update is found and `auto_download` is set, the download starts
    /// in the background and the notifier is told once it completes. That
    /// download does not produce `download-progress` events.
    pub async fn check_for_update(&self) -> Result<UpdateCheckResult> {
        if !self.app.is_packaged {
            warn!("Update check requested from a build that is not packaged");
            return Err(UpdateError::Packaging);
        }

        debug!("check-update");
        let result = self.backend.check_for_updates().await.map_err(|e| {
            warn!(error = %e, "Update check failed");
            e.into_network()
        })?;

        if result.is_update_available && self.config.auto_download {
            self.download_and_notify();
        }

        Ok(result)
    }

    /// Downloads in the background and sends the "ready to install"
    /// notification on success.
    fn download_and_notify(&self) -> JoinHandle<()> {
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let mut on_progress = log_background_progress;
            match run_download(orchestrator.backend.as_ref(), &mut on_progress).await {
                Ok(info) => orchestrator.notify_downloaded(&info),
                Err(UpdateError::InProgress) => debug!("Update download already running"),
                Err(e) => {
                    warn!(error = %e, "Update download after check failed");
                    orchestrator
                        .window
                        .send(WindowEvent::UpdateError(ErrorPayload::from_error(&e)));
                }
            }
        })
    }

    fn notify_downloaded(&self, update: &UpdateInfo) {
        info!(version = %update.version, "Update downloaded after check");
        if let Some(notifier) = &self.notifier {
            notifier.notify(
                READY_NOTIFICATION_TITLE,
                &ready_notification_body(&self.app.name, &update.version),
            );
        }
    }

    /// Downloads the update on a background task.
    ///
    /// `on_progress` receives every tick, or the error that ended the
    /// download. `on_complete` runs once, after a successful download.
    pub fn start_download<P, C>(&self, on_progress: P, on_complete: C) -> JoinHandle<()>
    where
        P: FnMut(ProgressResult<'_>) + Send + 'static,
        C: FnOnce(UpdateInfo) + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        info!("start-downloading");

        tokio::spawn(async move {
            let mut on_progress = on_progress;
            match run_download(backend.as_ref(), &mut on_progress).await {
                Ok(info) => on_complete(info),
                Err(e) => on_progress(Err(&e)),
            }
        })
    }

    /// `start-download` wired to the window: ticks become `download-progress`,
    /// failure `update-error`, completion `update-downloaded` followed by the
    /// install prompt when `prompt_on_downloaded` is set.
    pub fn download_to_window(&self) -> JoinHandle<()> {
        let window = Arc::clone(&self.window);
        let orchestrator = self.clone();

        self.start_download(
            move |progress| match progress {
                Ok(progress) => {
                    debug!(percent = progress.percent, "download-progress");
                    window.send(WindowEvent::DownloadProgress(progress.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "Update download failed");
                    window.send(WindowEvent::UpdateError(ErrorPayload::from_error(e)));
                }
            },
            move |info| {
                info!(version = %info.version, "update-downloaded");
                orchestrator.window.send(WindowEvent::UpdateDownloaded);
                if orchestrator.config.prompt_on_downloaded {
                    tokio::spawn(async move {
                        orchestrator.confirm_and_install(&info).await;
                    });
                }
            },
        )
    }

    /// Asks the user whether to install now. On "Install and restart" the
    /// installer hand-over is scheduled after the configured delay and not
    /// awaited; on "Later" nothing happens.
    pub async fn confirm_and_install(&self, update: &UpdateInfo) -> InstallDialogResult {
        let answer = self.dialogs.ask_restart_and_install(&self.app.name).await;

        match answer {
            InstallDialogResult::Later => {
                info!(version = %update.version, "Install deferred, update stays pending");
            }
            InstallDialogResult::InstallAndRestart => {
                info!(version = %update.version, "Restarting to install update");
                self.schedule_install();
            }
        }

        answer
    }

    /// `quit-and-install`: hands over to the installer immediately.
    pub async fn quit_and_install(&self) -> Result<()> {
        info!("quit-and-install");
        self.backend.quit_and_install(false, false).await
    }

    /// Background flow run at startup: check, download when allowed, then
    /// prompt. Failures also raise the modal error box.
    pub async fn auto_update(&self) -> Result<AutoUpdateOutcome> {
        if !self.app.is_packaged {
            info!("Skipping update check, not a packaged build");
            return Ok(AutoUpdateOutcome::NotPackaged);
        }

        let result = match self.backend.check_for_updates().await {
            Ok(result) => result,
            Err(e) => {
                self.report_unhandled(&e).await;
                return Err(e);
            }
        };

        if !result.is_update_available {
            debug!(version = %result.current_version, "Already on latest version");
            return Ok(AutoUpdateOutcome::UpToDate);
        }

        if !self.config.auto_download {
            return Ok(AutoUpdateOutcome::Pending(result.version_info));
        }

        let mut on_progress = log_background_progress;
        match run_download(self.backend.as_ref(), &mut on_progress).await {
            Ok(info) => match self.confirm_and_install(&info).await {
                InstallDialogResult::InstallAndRestart => {
                    Ok(AutoUpdateOutcome::InstallScheduled(info))
                }
                InstallDialogResult::Later => Ok(AutoUpdateOutcome::Deferred(info)),
            },
            Err(e) => {
                self.report_unhandled(&e).await;
                Err(e)
            }
        }
    }

    fn schedule_install(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let window = Arc::clone(&self.window);
        let delay = self.config.install_delay_duration();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = backend.quit_and_install(true, true).await {
                error!(error = %e, "Failed to hand over to the installer");
                window.send(WindowEvent::UpdateError(ErrorPayload::from_error(&e)));
            }
        })
    }

    async fn report_unhandled(&self, error: &UpdateError) {
        error!(error = %error, "Update failed");
        let content = error.to_string();
        let content = if content.is_empty() {
            "unknown".to_string()
        } else {
            content
        };
        self.dialogs.show_error_box(ERROR_BOX_TITLE, &content).await;
    }
}

fn forward_availability(window: &dyn AppWindow, version: &str, event: BackendEvent) {
    match event {
        BackendEvent::CheckingForUpdate => debug!("checking-for-update"),
        BackendEvent::UpdateAvailable(info) => {
            info!(current = version, new = %info.version, "update-available");
            window.send(WindowEvent::UpdateCanAvailable(UpdateNotification {
                update: true,
                version: version.to_string(),
                new_version: Some(info.version),
            }));
        }
        BackendEvent::UpdateNotAvailable(info) => {
            debug!(current = version, latest = %info.version, "update-not-available");
            window.send(WindowEvent::UpdateCanAvailable(UpdateNotification {
                update: false,
                version: version.to_string(),
                new_version: Some(info.version),
            }));
        }
        BackendEvent::Error(detail) => warn!(error = %detail, "Update backend reported an error"),
        BackendEvent::DownloadProgress(_) | BackendEvent::UpdateDownloaded(_) => {}
    }
}

/// Body of the "ready to install" notification.
fn ready_notification_body(app_name: &str, version: &str) -> String {
    format!(
        "{} version {} has been downloaded and is ready to install.",
        app_name, version
    )
}

fn log_background_progress(progress: ProgressResult<'_>) {
    if let Ok(progress) = progress {
        debug!(
            percent = progress.percent,
            bytes_per_second = progress.bytes_per_second,
            "Background download progress"
        );
    }
}

/// Runs one download. Resolves exactly once, with the backend's download
/// result; progress notifications are forwarded until then and the
/// subscription is dropped on return.
///
/// The download is polled before any notification is read, so a backend that
/// refuses with [`UpdateError::InProgress`] does so before ticks of the
/// download already running reach `on_progress`.
async fn run_download<P>(backend: &dyn UpdateBackend, on_progress: &mut P) -> Result<UpdateInfo>
where
    P: FnMut(ProgressResult<'_>),
{
    let mut events = backend.subscribe();
    let mut download = backend.download_update();
    let mut closed = false;

    let result = loop {
        tokio::select! {
            biased;
            result = &mut download => break result,
            event = events.recv(), if !closed => match event {
                Ok(BackendEvent::DownloadProgress(progress)) => on_progress(Ok(&progress)),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dropped download progress notifications");
                }
                Err(RecvError::Closed) => closed = true,
            },
        }
    };

    // Queued ticks belong to another download.
    if matches!(result, Err(UpdateError::InProgress)) {
        return result;
    }

    // Ticks the backend queued before resolving.
    loop {
        match events.try_recv() {
            Ok(BackendEvent::DownloadProgress(progress)) => on_progress(Ok(&progress)),
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    result
}
