//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay between accepting the install prompt and quitting (1 ms).
pub const DEFAULT_INSTALL_DELAY_MS: u64 = 1;

/// Behaviour switches for [`UpdateOrchestrator`](crate::UpdateOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Download automatically when a check finds an update.
    pub auto_download: bool,
    /// Ask "install and restart?" when a UI-requested download completes.
    pub prompt_on_downloaded: bool,
    /// Delay before handing over to the installer, so the dialog can close.
    pub install_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_download: true,
            prompt_on_downloaded: true,
            install_delay_ms: DEFAULT_INSTALL_DELAY_MS,
        }
    }
}

impl OrchestratorConfig {
    /// Enable or disable automatic download.
    pub fn auto_download(mut self, enabled: bool) -> Self {
        self.auto_download = enabled;
        self
    }

    /// Enable or disable the prompt after UI-requested downloads.
    pub fn prompt_on_downloaded(mut self, enabled: bool) -> Self {
        self.prompt_on_downloaded = enabled;
        self
    }

    /// Set the install delay.
    pub fn install_delay(mut self, delay: Duration) -> Self {
        self.install_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the install delay.
    pub fn install_delay_duration(&self) -> Duration {
        Duration::from_millis(self.install_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrchestratorConfig::default();
        assert!(config.auto_download);
        assert!(config.prompt_on_downloaded);
        assert_eq!(config.install_delay_duration(), Duration::from_millis(1));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"auto_download": false}"#).unwrap();
        assert!(!config.auto_download);
        assert!(config.prompt_on_downloaded);
        assert_eq!(config.install_delay_ms, DEFAULT_INSTALL_DELAY_MS);
    }

    #[test]
    fn install_delay_saturates() {
        let config = OrchestratorConfig::default().install_delay(Duration::from_millis(250));
        assert_eq!(config.install_delay_ms, 250);

        let config = OrchestratorConfig::default().install_delay(Duration::MAX);
        assert_eq!(config.install_delay_ms, u64::MAX);
    }
}
