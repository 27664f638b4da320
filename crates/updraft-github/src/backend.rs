//! [`UpdateBackend`] over GitHub Releases.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semver::Version;
use tokio::sync::{broadcast, Notify};

use updraft_core::{
    BackendEvent, ProgressInfo, Result, UpdateBackend, UpdateCheckResult, UpdateError, UpdateInfo,
};

use crate::config::GitHubFeedConfig;
use crate::download::{download_to_file, network};
use crate::installer::{execute, plan_install};
use crate::release::{
    is_update_available, parse_checksum, platform_asset_patterns, select_release, GitHubAsset,
    GitHubRelease,
};

/// Capacity of the notification channel.
const EVENT_CAPACITY: usize = 64;

/// Release found by the last check, waiting to be downloaded.
#[derive(Debug, Clone)]
pub struct PendingRelease {
    pub info: UpdateInfo,
    pub asset: Option<GitHubAsset>,
    pub checksum_asset: Option<GitHubAsset>,
}

/// State of an ongoing or completed update.
#[derive(Debug, Clone)]
pub enum UpdateState {
    /// No update activity.
    Idle,
    /// Checking for updates.
    Checking,
    /// Update available.
    Available(PendingRelease),
    /// Downloading update.
    Downloading(ProgressInfo),
    /// Download complete, ready to install.
    Ready { info: UpdateInfo, path: PathBuf },
    /// Error occurred.
    Error(String),
}

/// Update backend reading a GitHub repository's releases.
#[derive(Debug)]
pub struct GitHubBackend {
    config: GitHubFeedConfig,
    current_version: Version,
    client: reqwest::Client,
    events: broadcast::Sender<BackendEvent>,
    state: RwLock<UpdateState>,
    last_checked: RwLock<Option<DateTime<Utc>>>,
    downloading: AtomicBool,
    exit_signal: Option<Arc<Notify>>,
}

/// Clears the download flag when a download ends or its future is dropped.
/// A download abandoned mid-transfer leaves the release available again.
struct DownloadGuard<'a> {
    backend: &'a GitHubBackend,
    pending: PendingRelease,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .backend
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, UpdateState::Downloading(_)) {
            tracing::debug!(version = %self.pending.info.version, "Download abandoned");
            *state = UpdateState::Available(self.pending.clone());
        }
        drop(state);
        self.backend.downloading.store(false, Ordering::SeqCst);
    }
}

impl GitHubBackend {
    /// Creates a backend for `config`.
    pub fn new(config: GitHubFeedConfig) -> Result<Self> {
        let current_version = Version::parse(&config.current_version)
            .map_err(|e| UpdateError::VersionParse(format!("{}: {}", config.current_version, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", config.repo_name, config.current_version))
            .build()
            .map_err(network)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            current_version,
            client,
            events,
            state: RwLock::new(UpdateState::Idle),
            last_checked: RwLock::new(None),
            downloading: AtomicBool::new(false),
            exit_signal: None,
        })
    }

    /// Makes `quit_and_install` notify `signal` once the installer is running
    /// instead of ending the process. The host must then shut down.
    pub fn with_exit_signal(mut self, signal: Arc<Notify>) -> Self {
        self.exit_signal = Some(signal);
        self
    }

    /// Returns the running version.
    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    /// Returns the current update state.
    pub fn state(&self) -> UpdateState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// When the feed was last checked successfully.
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self
            .last_checked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: UpdateState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn emit(&self, event: BackendEvent) {
        tracing::trace!(event = event.name(), "Backend notification");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn request_exit(&self) -> Result<()> {
        match &self.exit_signal {
            Some(signal) => {
                signal.notify_one();
                Ok(())
            }
            None => std::process::exit(0),
        }
    }

    fn fail(&self, error: &UpdateError) {
        tracing::warn!(error = %error, "Update backend error");
        self.set_state(UpdateState::Error(error.to_string()));
        self.emit(BackendEvent::Error(error.detail()));
    }

    fn asset_patterns(&self) -> Vec<String> {
        match &self.config.asset_patterns {
            Some(patterns) => patterns.clone(),
            None => platform_asset_patterns()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Fetches the newest usable release.
    async fn fetch_release(&self) -> Result<Option<GitHubRelease>> {
        if self.config.allow_prerelease {
            let releases: Vec<GitHubRelease> = self
                .client
                .get(format!("{}?per_page=10", self.config.releases_url()))
                .header("Accept", "application/vnd.github+json")
                .send()
                .await
                .map_err(network)?
                .error_for_status()
                .map_err(network)?
                .json()
                .await
                .map_err(network)?;
            return Ok(select_release(releases, true));
        }

        let response = self
            .client
            .get(self.config.latest_release_url())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(network)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let release: GitHubRelease = response
            .error_for_status()
            .map_err(network)?
            .json()
            .await
            .map_err(network)?;
        Ok(select_release(vec![release], false))
    }

    /// Builds the check result for a fetched release.
    fn evaluate(&self, release: Option<GitHubRelease>) -> Result<(UpdateCheckResult, Option<PendingRelease>)> {
        let current = self.current_version.to_string();

        let Some(release) = release else {
            tracing::debug!("No releases found");
            let result = UpdateCheckResult {
                is_update_available: false,
                version_info: UpdateInfo::new(current.clone()),
                current_version: current,
            };
            return Ok((result, None));
        };

        let version = release.version()?;
        let available =
            is_update_available(&self.current_version, &version, self.config.allow_downgrade);

        let patterns = self.asset_patterns();
        let asset = release.find_compatible_asset(&patterns).cloned();
        let info = release.to_update_info(asset.as_ref());

        let result = UpdateCheckResult {
            is_update_available: available,
            version_info: info.clone(),
            current_version: current,
        };

        let pending = available.then(|| PendingRelease {
            info,
            asset,
            checksum_asset: release.checksum_asset().cloned(),
        });

        Ok((result, pending))
    }

    async fn fetch_checksum(&self, manifest: &GitHubAsset, asset_name: &str) -> Result<Option<String>> {
        let content = self
            .client
            .get(&manifest.browser_download_url)
            .send()
            .await
            .map_err(network)?
            .error_for_status()
            .map_err(network)?
            .text()
            .await
            .map_err(network)?;

        let checksum = parse_checksum(&content, asset_name);
        if checksum.is_none() {
            tracing::warn!(asset = asset_name, manifest = %manifest.name, "Asset missing from checksum manifest");
        }
        Ok(checksum)
    }

    async fn download_pending(&self, pending: PendingRelease) -> Result<UpdateInfo> {
        let asset = pending.asset.ok_or(UpdateError::NoCompatibleAsset)?;
        let mut info = pending.info;

        let expected = match &pending.checksum_asset {
            Some(manifest) => self.fetch_checksum(manifest, &asset.name).await?,
            None => None,
        };

        let dest = self.config.resolved_download_dir().join(&asset.name);
        self.set_state(UpdateState::Downloading(ProgressInfo::new(asset.size, 0, 0, 0)));

        download_to_file(
            &self.client,
            &asset.browser_download_url,
            &dest,
            asset.size,
            expected.as_deref(),
            |progress| {
                self.set_state(UpdateState::Downloading(progress.clone()));
                self.emit(BackendEvent::DownloadProgress(progress));
            },
        )
        .await?;

        if let Some(file) = info.files.iter_mut().find(|f| f.name == asset.name) {
            file.sha256 = expected;
        }

        self.set_state(UpdateState::Ready {
            info: info.clone(),
            path: dest,
        });
        Ok(info)
    }
}

#[async_trait]
impl UpdateBackend for GitHubBackend {
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    async fn check_for_updates(&self) -> Result<UpdateCheckResult> {
        tracing::debug!(owner = %self.config.repo_owner, repo = %self.config.repo_name, "Checking for updates");
        self.emit(BackendEvent::CheckingForUpdate);

        let previous = self.state();
        self.set_state(UpdateState::Checking);

        let evaluated = match self.fetch_release().await {
            Ok(release) => self.evaluate(release),
            Err(e) => Err(e),
        };

        let (result, pending) = match evaluated {
            Ok(evaluated) => evaluated,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        *self
            .last_checked
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        match (pending, previous) {
            // Keep an already downloaded copy of the same release installable.
            (Some(pending), UpdateState::Ready { info, path }) if info.version == pending.info.version => {
                self.set_state(UpdateState::Ready { info, path });
            }
            (Some(pending), _) => self.set_state(UpdateState::Available(pending)),
            (None, _) => self.set_state(UpdateState::Idle),
        }

        if result.is_update_available {
            tracing::info!(
                current = %result.current_version,
                latest = %result.version_info.version,
                "New version available"
            );
            self.emit(BackendEvent::UpdateAvailable(result.version_info.clone()));
        } else {
            tracing::debug!(version = %result.current_version, "Already on latest version");
            self.emit(BackendEvent::UpdateNotAvailable(result.version_info.clone()));
        }

        Ok(result)
    }

    async fn download_update(&self) -> Result<UpdateInfo> {
        let pending = match self.state() {
            UpdateState::Available(pending) => pending,
            UpdateState::Ready { info, .. } => {
                tracing::debug!(version = %info.version, "Update already downloaded");
                self.emit(BackendEvent::UpdateDownloaded(info.clone()));
                return Ok(info);
            }
            UpdateState::Downloading(_) => return Err(UpdateError::InProgress),
            _ => {
                let e = UpdateError::Library("no update available, check for updates first".into());
                self.fail(&e);
                return Err(e);
            }
        };

        if self.downloading.swap(true, Ordering::SeqCst) {
            return Err(UpdateError::InProgress);
        }

        let guard = DownloadGuard {
            backend: self,
            pending: pending.clone(),
        };
        let result = self.download_pending(pending.clone()).await;

        let result = match result {
            Ok(info) => {
                self.emit(BackendEvent::UpdateDownloaded(info.clone()));
                Ok(info)
            }
            Err(e) => {
                self.fail(&e);
                // The release is still there; allow another attempt.
                self.set_state(UpdateState::Available(pending));
                Err(e)
            }
        };
        drop(guard);
        result
    }

    async fn quit_and_install(&self, silent: bool, force_run_after: bool) -> Result<()> {
        let UpdateState::Ready { info, path } = self.state() else {
            return Err(UpdateError::NothingToInstall);
        };

        let plan = plan_install(
            &path,
            silent,
            force_run_after,
            std::env::var_os("APPIMAGE").map(PathBuf::from),
        );
        execute(&plan)?;

        tracing::info!(version = %info.version, "Installer started, exiting");
        self.request_exit()
    }
}
