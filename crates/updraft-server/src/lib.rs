//! Updraft Server - local HTTP API for the application UI.
//!
//! The UI triggers update actions over HTTP and follows their outcome on a
//! server-sent event stream whose event names are the window channels.
//!
//! ## Endpoints
//!
//! - `POST /api/update/check` - Check the feed for a newer version
//! - `POST /api/update/download` - Start downloading the update
//! - `POST /api/update/install` - Quit and run the installer
//! - `GET /api/update/events` - Stream of window events (SSE)
//! - `GET /api/version` - Application name, version and packaging state
//!
//! ## Example
//!
//! ```ignore
//! use updraft_server::{AppState, Server, ServerConfig};
//!
//! let server = Server::new(ServerConfig::default(), AppState::new(orchestrator, window))?;
//! server.run().await?;
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;
pub mod window;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;
pub use window::BroadcastWindow;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48766;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48766).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router over `state`.
pub fn build_router(state: AppState) -> Router {
    // The UI may be served from a file:// or dev-server origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/update/check", post(handlers::check_update))
        .route("/api/update/download", post(handlers::start_download))
        .route("/api/update/install", post(handlers::quit_and_install))
        .route("/api/update/events", get(handlers::events))
        .route("/api/version", get(handlers::version))
        .layer(cors)
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server serving `state`.
    pub fn new(config: ServerConfig, state: AppState) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Updraft API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow rebinding while a previous instance's sockets linger in TIME_WAIT.
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use updraft_core::{
        AppInfo, BackendEvent, Dialogs, InstallDialogResult, OrchestratorConfig, ProgressInfo,
        UpdateBackend, UpdateCheckResult, UpdateError, UpdateInfo, UpdateOrchestrator,
        WindowEvent,
    };

    struct FakeBackend {
        events: broadcast::Sender<BackendEvent>,
        check: std::result::Result<bool, UpdateError>,
        installs: Mutex<Vec<(bool, bool)>>,
    }

    impl FakeBackend {
        fn new(check: std::result::Result<bool, UpdateError>) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                events,
                check,
                installs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl UpdateBackend for FakeBackend {
        fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
            self.events.subscribe()
        }

        async fn check_for_updates(&self) -> updraft_core::Result<UpdateCheckResult> {
            let available = self.check.clone()?;
            Ok(UpdateCheckResult {
                is_update_available: available,
                version_info: UpdateInfo::new("2.0.0"),
                current_version: "1.0.0".to_string(),
            })
        }

        async fn download_update(&self) -> updraft_core::Result<UpdateInfo> {
            let _ = self
                .events
                .send(BackendEvent::DownloadProgress(ProgressInfo::new(10, 10, 10, 10)));
            let info = UpdateInfo::new("2.0.0");
            let _ = self.events.send(BackendEvent::UpdateDownloaded(info.clone()));
            Ok(info)
        }

        async fn quit_and_install(
            &self,
            silent: bool,
            force_run_after: bool,
        ) -> updraft_core::Result<()> {
            self.installs
                .lock()
                .unwrap()
                .push((silent, force_run_after));
            Ok(())
        }
    }

    struct DeclineDialogs;

    #[async_trait]
    impl Dialogs for DeclineDialogs {
        async fn ask_restart_and_install(&self, _app_name: &str) -> InstallDialogResult {
            InstallDialogResult::Later
        }

        async fn show_error_box(&self, _title: &str, _content: &str) {}
    }

    fn create_test_app(
        backend: Arc<FakeBackend>,
        packaged: bool,
    ) -> (Router, Arc<BroadcastWindow>) {
        let window = Arc::new(BroadcastWindow::new(16));
        let orchestrator = UpdateOrchestrator::new(
            backend,
            window.clone(),
            Arc::new(DeclineDialogs),
            AppInfo::new("Rocket", "1.0.0", packaged),
            OrchestratorConfig::default(),
        );
        let state = AppState::new(orchestrator, window.clone());
        (build_router(state), window)
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_check_update_available() {
        let (app, _) = create_test_app(FakeBackend::new(Ok(true)), true);

        let response = app.oneshot(post("/api/update/check")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["isUpdateAvailable"], true);
        assert_eq!(json["versionInfo"]["version"], "2.0.0");
        assert_eq!(json["currentVersion"], "1.0.0");
    }

    #[tokio::test]
    async fn test_check_not_packaged() {
        let (app, _) = create_test_app(FakeBackend::new(Ok(true)), false);

        let response = app.oneshot(post("/api/update/check")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

        let json = body_json(response).await;
        assert_eq!(
            json["message"],
            "The update feature is only available after the package."
        );
        assert_eq!(json["error"]["kind"], "packaging");
    }

    #[tokio::test]
    async fn test_check_network_failure() {
        let backend = FakeBackend::new(Err(UpdateError::Library("feed unreachable".into())));
        let (app, _) = create_test_app(backend, true);

        let response = app.oneshot(post("/api/update/check")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Network error");
        assert_eq!(json["error"]["kind"], "network");
        assert!(json["error"]["detail"]
            .as_str()
            .unwrap()
            .contains("feed unreachable"));
    }

    #[tokio::test]
    async fn test_download_reports_on_window() {
        let (app, window) = create_test_app(FakeBackend::new(Ok(true)), true);
        let mut events = window.subscribe();

        let response = app.oneshot(post("/api/update/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let first = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, WindowEvent::DownloadProgress(_)));

        let second = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, WindowEvent::UpdateDownloaded);
    }

    #[tokio::test]
    async fn test_install_runs_after_response() {
        let backend = FakeBackend::new(Ok(true));
        let (app, _) = create_test_app(backend.clone(), true);

        let response = app.oneshot(post("/api/update/install")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(backend.installs.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*backend.installs.lock().unwrap(), vec![(false, false)]);
    }

    #[tokio::test]
    async fn test_events_is_sse() {
        let (app, _) = create_test_app(FakeBackend::new(Ok(false)), true);

        let request = Request::builder()
            .method("GET")
            .uri("/api/update/events")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
    }

    #[tokio::test]
    async fn test_version() {
        let (app, _) = create_test_app(FakeBackend::new(Ok(false)), false);

        let request = Request::builder()
            .method("GET")
            .uri("/api/version")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["name"], "Rocket");
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["packaged"], false);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_server_config_with_port() {
        let config = ServerConfig::default().with_port(9000);
        assert_eq!(config.port, 9000);
    }
}
