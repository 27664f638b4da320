//! API route handlers.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use updraft_core::{AppWindow, ErrorPayload, UpdateCheckResult, WindowEvent};

use crate::error::{ApiError, Result};
use crate::models::{AcceptedResponse, VersionResponse};
use crate::state::AppState;

/// Time given to the 202 response to leave before the process exits.
const INSTALL_HANDOVER_DELAY: Duration = Duration::from_millis(100);

/// POST /api/update/check - Ask the feed for a newer version.
pub async fn check_update(State(state): State<AppState>) -> Result<Json<UpdateCheckResult>> {
    let result = state
        .orchestrator
        .check_for_update()
        .await
        .map_err(ApiError::Check)?;

    debug!(
        available = result.is_update_available,
        latest = %result.version_info.version,
        "check-update answered"
    );
    Ok(Json(result))
}

/// POST /api/update/download - Start downloading; progress arrives as events.
pub async fn start_download(
    State(state): State<AppState>,
) -> (StatusCode, Json<AcceptedResponse>) {
    // Completion and failures are reported on the event stream.
    drop(state.orchestrator.download_to_window());
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new("start-download")),
    )
}

/// POST /api/update/install - Quit and run the downloaded installer.
pub async fn quit_and_install(
    State(state): State<AppState>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let orchestrator = state.orchestrator.clone();
    let window = state.window.clone();

    tokio::spawn(async move {
        tokio::time::sleep(INSTALL_HANDOVER_DELAY).await;
        if let Err(e) = orchestrator.quit_and_install().await {
            warn!(error = %e, "quit-and-install failed");
            window.send(WindowEvent::UpdateError(ErrorPayload::from_error(&e)));
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new("quit-and-install")),
    )
}

/// GET /api/update/events - Window events as server-sent events.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!(
        subscribers = state.window.receiver_count() + 1,
        "Event stream connected"
    );

    let stream = BroadcastStream::new(state.window.subscribe()).filter_map(|event| match event {
        Ok(event) => Some(Ok(to_sse_event(&event))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped, "Event stream lagged, events dropped");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/version - Application identity.
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    let app = state.orchestrator.app();
    Json(VersionResponse {
        name: app.name.clone(),
        version: app.version.clone(),
        packaged: app.is_packaged,
    })
}

/// SSE event named after the window channel, JSON payload as data.
fn to_sse_event(event: &WindowEvent) -> Event {
    Event::default()
        .event(event.channel())
        .data(event.payload().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use updraft_core::ProgressInfo;

    #[test]
    fn sse_event_carries_channel_and_payload() {
        let event = to_sse_event(&WindowEvent::DownloadProgress(ProgressInfo::new(
            200, 50, 100, 25,
        )));
        let text = format!("{:?}", event);
        assert!(text.contains("download-progress"));
        assert!(text.contains("bytesPerSecond"));
    }
}
