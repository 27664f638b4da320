//! Streamed installer download with progress ticks and checksum check.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use updraft_core::{ProgressInfo, UpdateError};

/// Minimum time between two progress ticks.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn network(e: reqwest::Error) -> UpdateError {
    UpdateError::Network(e.to_string())
}

/// Turns received chunk sizes into throttled [`ProgressInfo`] ticks.
#[derive(Debug)]
pub struct ProgressMeter {
    total: u64,
    transferred: u64,
    pending_delta: u64,
    started: Instant,
    last_tick: Option<Instant>,
}

impl ProgressMeter {
    /// Creates a meter for a download of `total` bytes (0 when unknown).
    pub fn new(total: u64, started: Instant) -> Self {
        Self {
            total,
            transferred: 0,
            pending_delta: 0,
            started,
            last_tick: None,
        }
    }

    /// Records a received chunk; returns a tick when one is due.
    pub fn record(&mut self, len: u64, now: Instant) -> Option<ProgressInfo> {
        self.transferred += len;
        self.pending_delta += len;

        let due = self
            .last_tick
            .map_or(true, |last| now.duration_since(last) >= PROGRESS_INTERVAL);
        if due {
            Some(self.tick(now))
        } else {
            None
        }
    }

    /// Final tick, always emitted once the body is complete.
    pub fn finish(&mut self, now: Instant) -> ProgressInfo {
        if self.total == 0 {
            self.total = self.transferred;
        }
        self.tick(now)
    }

    /// Bytes received so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn tick(&mut self, now: Instant) -> ProgressInfo {
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let bytes_per_second = if elapsed > 0.0 {
            (self.transferred as f64 / elapsed) as u64
        } else {
            0
        };
        let delta = std::mem::take(&mut self.pending_delta);
        self.last_tick = Some(now);
        ProgressInfo::new(self.total, delta, self.transferred, bytes_per_second)
    }
}

/// Lowercase hex digest.
fn finalize_hex(hasher: Sha256) -> String {
    format!("{:x}", hasher.finalize())
}

/// Downloads `url` to `dest`, reporting ticks through `on_progress`.
///
/// The body is written to `<dest>.part` and renamed once complete and, when
/// `expected_sha256` is given, verified.
pub async fn download_to_file<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    size_hint: u64,
    expected_sha256: Option<&str>,
    mut on_progress: F,
) -> Result<u64, UpdateError>
where
    F: FnMut(ProgressInfo),
{
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(network)?
        .error_for_status()
        .map_err(network)?;

    let total = response.content_length().unwrap_or(size_hint);
    tracing::info!(url, total, "Downloading update");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    let mut file = tokio::fs::File::create(&part).await?;
    let mut hasher = Sha256::new();
    let mut meter = ProgressMeter::new(total, Instant::now());

    while let Some(chunk) = response.chunk().await.map_err(network)? {
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        if let Some(progress) = meter.record(chunk.len() as u64, Instant::now()) {
            on_progress(progress);
        }
    }
    file.flush().await?;
    drop(file);
    on_progress(meter.finish(Instant::now()));

    if let Some(expected) = expected_sha256 {
        let actual = finalize_hex(hasher);
        if !actual.eq_ignore_ascii_case(expected) {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(UpdateError::ChecksumMismatch {
                expected: expected.to_lowercase(),
                actual,
            });
        }
        tracing::info!("Checksum verified");
    }

    tokio::fs::rename(&part, dest).await?;
    tracing::info!(path = ?dest, bytes = meter.transferred(), "Update downloaded");
    Ok(meter.transferred())
}
