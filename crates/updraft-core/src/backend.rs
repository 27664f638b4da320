//! Contract implemented by update backends.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::BackendEvent;
use crate::models::{UpdateCheckResult, UpdateInfo};

/// The component that talks to the update feed, downloads installers and
/// hands control over to them.
///
/// Backends report progress and life-cycle changes as [`BackendEvent`]s on a
/// broadcast channel; every call to [`subscribe`](Self::subscribe) returns an
/// independent receiver that only sees events sent after it was created.
#[async_trait]
pub trait UpdateBackend: Send + Sync {
    /// Subscribes to life-cycle notifications.
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;

    /// Asks the feed whether a newer version exists.
    ///
    /// Emits `CheckingForUpdate`, then `UpdateAvailable` or
    /// `UpdateNotAvailable` (or `Error`).
    async fn check_for_updates(&self) -> Result<UpdateCheckResult>;

    /// Downloads the update found by the last check.
    ///
    /// Emits `DownloadProgress` ticks, then `UpdateDownloaded` (or `Error`).
    async fn download_update(&self) -> Result<UpdateInfo>;

    /// Quits the application and runs the downloaded installer.
    ///
    /// On success the application must exit: the backend either ends the
    /// process itself or returns `Ok` after signalling the host to shut down.
    async fn quit_and_install(&self, silent: bool, force_run_after: bool) -> Result<()>;
}
