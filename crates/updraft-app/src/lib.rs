//! Updraft - self-update service for desktop applications.
//!
//! This crate holds the host side of the binary:
//!
//! - [`config`]: `updater.json` settings
//! - [`dialog`]: native install and error dialogs
//! - [`environment`]: packaged-build detection
//! - [`notifier`]: desktop notifications

pub mod config;
pub mod dialog;
pub mod environment;
pub mod notifier;

pub use config::{ConfigError, UpdaterConfig};
pub use dialog::RfdDialogs;
pub use notifier::DesktopNotifier;
