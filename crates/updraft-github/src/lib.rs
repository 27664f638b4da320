//! GitHub Releases backend for Updraft.
//!
//! Checks a repository's releases for a newer version, downloads the
//! installer matching the running platform (verifying it against a published
//! checksum manifest when there is one) and hands control over to it.

pub mod backend;
pub mod config;
pub mod download;
pub mod installer;
pub mod release;

pub use backend::{GitHubBackend, PendingRelease, UpdateState};
pub use config::GitHubFeedConfig;
pub use installer::InstallPlan;
pub use release::{GitHubAsset, GitHubRelease};
