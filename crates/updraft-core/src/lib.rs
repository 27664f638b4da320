//! Updraft Core - update orchestration for desktop applications.
//!
//! This crate bridges an update backend (feed check, download, installer
//! hand-over) to the application window and native dialogs:
//!
//! - [`UpdateBackend`]: what a backend must provide
//! - [`AppWindow`] / [`Dialogs`]: what the host must provide
//! - [`UpdateOrchestrator`]: `check-update`, `start-download`,
//!   `quit-and-install`, plus the background auto-update flow
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use updraft_core::{AppInfo, OrchestratorConfig, UpdateOrchestrator};
//!
//! let orchestrator = UpdateOrchestrator::new(
//!     backend,
//!     window,
//!     dialogs,
//!     AppInfo::new("Updraft", "1.0.0", true),
//!     OrchestratorConfig::default(),
//! );
//! let _bridge = orchestrator.attach();
//! orchestrator.auto_update().await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod models;
pub mod orchestrator;

pub use backend::UpdateBackend;
pub use config::OrchestratorConfig;
pub use error::{ErrorDetail, ErrorPayload, Result, UpdateError};
pub use events::{BackendEvent, WindowEvent};
pub use host::{AppWindow, Dialogs, Notifier};
pub use models::{
    AppInfo, InstallDialogResult, ProgressInfo, UpdateCheckResult, UpdateFileInfo, UpdateInfo,
    UpdateNotification,
};
pub use orchestrator::{AutoUpdateOutcome, BridgeHandle, ProgressResult, UpdateOrchestrator};
