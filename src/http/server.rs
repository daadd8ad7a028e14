//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all simulation handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Evaluate the failure cycle once per request
//! - Optional request dumps, artificial delay and body echo

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::{check_delay_fits_timeout, parse_status_code};
use crate::config::{ServerConfig, ValidationError};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::observability::{RecordedRequest, RequestRecorder};
use crate::simulation::FailureCycle;

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to open request log: {0}")]
    RequestLog(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cycle: Arc<FailureCycle>,
    pub recorder: Option<Arc<RequestRecorder>>,
    pub echo: bool,
    pub delay: Duration,
    pub max_body_bytes: usize,
}

/// HTTP server for the failure simulator.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    cycle: Arc<FailureCycle>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, StartupError> {
        let default_code = parse_status_code("response.status_code", config.response.status_code)?;
        check_delay_fits_timeout(&config.response, &config.timeouts)?;
        let cycle = FailureCycle::from_settings(&config.failure, default_code)?;
        let recorder = RequestRecorder::from_config(&config.request_log)?;
        Ok(Self::with_parts(config, cycle, recorder))
    }

    /// Create a server around an already constructed cycle and recorder.
    pub fn with_parts(
        config: ServerConfig,
        cycle: FailureCycle,
        recorder: Option<RequestRecorder>,
    ) -> Self {
        let cycle = Arc::new(cycle);
        let state = AppState {
            cycle: cycle.clone(),
            recorder: recorder.map(Arc::new),
            echo: config.response.echo,
            delay: Duration::from_millis(config.response.delay_ms),
            max_body_bytes: config.response.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            cycle,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(simulate_handler))
            .route("/", any(simulate_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            failure_simulation = self.cycle.is_enabled(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shared failure cycle.
    pub fn cycle(&self) -> &Arc<FailureCycle> {
        &self.cycle
    }
}

/// Catch-all handler.
/// Dumps the request, advances the cycle and answers with its status.
async fn simulate_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    if let Some(recorder) = &state.recorder {
        recorder.record(&RecordedRequest::capture(&parts, &body, remote_addr));
    }

    let outcome = state.cycle.evaluate_outcome();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        status = outcome.status.as_u16(),
        phase = outcome.phase.as_str(),
        "Simulated response"
    );

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    metrics::record_outcome(&outcome, start_time);

    let mut response = if state.echo {
        let mut response = Response::new(Body::from(body));
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        response
    } else {
        Response::new(Body::empty())
    };
    *response.status_mut() = outcome.status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RequestLogConfig, RequestLogFormat};
    use crate::http::request::X_REQUEST_ID;
    use crate::simulation::CycleSnapshot;
    use tower::ServiceExt;

    fn failing_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.failure.enabled = true;
        config.failure.failure_count = 2;
        config.failure.success_count = 1;
        config.failure.failure_code = 503;
        config.failure.success_code = 200;
        config
    }

    async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_across_paths_and_methods() {
        let server = HttpServer::new(failing_config()).unwrap();
        let router = server.router();

        let mut statuses = Vec::new();
        for (method, path) in [
            ("GET", "/"),
            ("POST", "/a/b"),
            ("DELETE", "/x?y=1"),
            ("PUT", "/"),
            ("GET", "/deep/nested/path"),
            ("HEAD", "/"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(path)
                .body(Body::empty())
                .unwrap();
            statuses.push(send(&router, request).await.status().as_u16());
        }

        assert_eq!(statuses, vec![503, 503, 200, 503, 503, 200]);
    }

    #[tokio::test]
    async fn test_disabled_returns_default_code() {
        let mut config = ServerConfig::default();
        config.response.status_code = 202;
        let server = HttpServer::new(config).unwrap();
        let router = server.router();

        for _ in 0..4 {
            assert_eq!(send(&router, get("/")).await.status(), StatusCode::ACCEPTED);
        }
        assert_eq!(server.cycle().snapshot(), CycleSnapshot::default());
    }

    #[tokio::test]
    async fn test_echo_body() {
        let mut config = ServerConfig::default();
        config.response.echo = true;
        let server = HttpServer::new(config).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"k":1}"#))
            .unwrap();
        let response = send(&server.router(), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"k":1}"#);
    }

    #[tokio::test]
    async fn test_no_echo_empty_body() {
        let server = HttpServer::new(ServerConfig::default()).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("ignored"))
            .unwrap();
        let response = send(&server.router(), request).await;
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_body_limit_does_not_advance_cycle() {
        let mut config = failing_config();
        config.response.max_body_bytes = 4;
        let server = HttpServer::new(config).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("way too long"))
            .unwrap();
        let response = send(&server.router(), request).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(server.cycle().snapshot(), CycleSnapshot::default());
    }

    #[tokio::test]
    async fn test_request_id_generated_and_preserved() {
        let server = HttpServer::new(ServerConfig::default()).unwrap();
        let router = server.router();

        let response = send(&router, get("/")).await;
        assert!(response.headers().contains_key(&X_REQUEST_ID));

        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "client-chosen")
            .body(Body::empty())
            .unwrap();
        let response = send(&router, request).await;
        assert_eq!(response.headers()[&X_REQUEST_ID], "client-chosen");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applied() {
        let mut config = ServerConfig::default();
        config.response.delay_ms = 250;
        let server = HttpServer::new(config).unwrap();
        assert_eq!(server.config().response.delay_ms, 250);

        let start = tokio::time::Instant::now();
        let response = send(&server.router(), get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_delay_longer_than_timeout_rejected() {
        let mut config = failing_config();
        config.timeouts.request_secs = 1;
        config.response.delay_ms = 2000;
        assert!(matches!(
            HttpServer::new(config),
            Err(StartupError::Config(ValidationError::DelayExceedsTimeout {
                delay_ms: 2000,
                request_secs: 1,
            }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_responses_keep_cycle_codes() {
        let mut config = failing_config();
        config.failure.failure_count = 1;
        config.timeouts.request_secs = 1;
        config.response.delay_ms = 900;
        let server = HttpServer::new(config).unwrap();
        let router = server.router();

        let mut statuses = Vec::new();
        for _ in 0..4 {
            statuses.push(send(&router, get("/")).await.status().as_u16());
        }
        assert_eq!(statuses, vec![503, 200, 503, 200]);
    }

    #[tokio::test]
    async fn test_request_log_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.jsonl");
        let mut config = ServerConfig::default();
        config.request_log = RequestLogConfig {
            enabled: true,
            format: RequestLogFormat::Json,
            output: Some(path.clone()),
        };
        let server = HttpServer::new(config).unwrap();

        let request = Request::builder()
            .method("PATCH")
            .uri("/items/9")
            .body(Body::from("payload"))
            .unwrap();
        send(&server.router(), request).await;

        let written = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(value["method"], "PATCH");
        assert_eq!(value["uri"], "/items/9");
        assert_eq!(value["body"], "payload");
        assert!(value["headers"]["x-request-id"][0].is_string());
    }

    #[test]
    fn test_invalid_cycle_rejected() {
        let mut config = failing_config();
        config.failure.success_count = -1;
        assert!(matches!(
            HttpServer::new(config),
            Err(StartupError::Config(ValidationError::NegativeCount { .. }))
        ));
    }
}
