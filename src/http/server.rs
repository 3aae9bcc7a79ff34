//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create Axum Router with the webhook and status handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Spawn the background range refresher alongside the server
//! - Gate every webhook on origin verification before dispatch

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GuardConfig;
use crate::dispatch::classify::HookPayload;
use crate::dispatch::{Destination, ForwardError, Forwarder, SourceClassifier};
use crate::http::request::{request_id, RequestIdLayer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::verification::allowlist::Allowlist;
use crate::verification::refresher::Refresher;
use crate::verification::verifier::OriginVerifier;
use crate::verification::TrustState;

/// Upper bound on a buffered webhook payload. The provider caps webhook
/// bodies at 25 MB.
const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<OriginVerifier>,
    pub classifier: Arc<SourceClassifier>,
    pub forwarder: Arc<Forwarder>,
    pub allowlist: Arc<Allowlist>,
}

/// HTTP server for the webhook guard.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    trust: TrustState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and
    /// bootstrapped trust state.
    pub fn new(config: GuardConfig, trust: TrustState) -> Result<Self, ForwardError> {
        let verifier = Arc::new(OriginVerifier::new(
            trust.allowlist.clone(),
            trust.source.clone(),
        ));
        let forwarder = Arc::new(Forwarder::new(&config.forward.proxy_url)?);

        let state = AppState {
            verifier,
            classifier: Arc::new(SourceClassifier::new()),
            forwarder,
            allowlist: trust.allowlist.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            trust,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GuardConfig, state: AppState) -> Router {
        Router::new()
            .route("/webhook", post(webhook_handler))
            .route("/status", get(status_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Spawns the background refresher; both it and the server exit when
    /// the shutdown coordinator fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let refresher = Refresher::new(
            self.trust.allowlist.clone(),
            self.trust.source.clone(),
            Duration::from_secs(self.config.trust.refresh_interval_secs),
        );
        let refresher_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            refresher.run(refresher_shutdown).await;
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

/// Liveness/readiness probe. The process only reaches the listener after
/// the initial snapshot loaded, so answering at all implies readiness.
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "trusted_ranges": state.allowlist.len(),
    }))
}

/// Main webhook handler.
/// Verifies the origin, classifies the payload, and relays downstream.
async fn webhook_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    let trusted = match state.verifier.verify(request.headers(), peer).await {
        Ok(trusted) => trusted,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting request with unusable source address");
            metrics::record_webhook(400, start_time);
            return (StatusCode::BAD_REQUEST, "Unable to determine source address").into_response();
        }
    };
    if !trusted {
        tracing::warn!(request_id = %request_id, peer = %peer, "Request from unauthorized source");
        metrics::record_webhook(401, start_time);
        return (StatusCode::UNAUTHORIZED, "Request from unauthorized source").into_response();
    }

    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_PAYLOAD_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Unreadable webhook body");
            metrics::record_webhook(400, start_time);
            return (StatusCode::BAD_REQUEST, "Unreadable request body").into_response();
        }
    };

    let payload: HookPayload = match serde_json::from_slice(&body_bytes) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Malformed webhook payload");
            metrics::record_webhook(400, start_time);
            return (StatusCode::BAD_REQUEST, "Malformed webhook payload").into_response();
        }
    };

    let destination = match state
        .classifier
        .destination_for(&payload.repository.git_url)
    {
        Ok(destination) => destination,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                repository = %payload.repository.full_name,
                error = %e,
                "Webhook could not be classified"
            );
            metrics::record_webhook(422, start_time);
            return (StatusCode::UNPROCESSABLE_ENTITY, "Unclassifiable webhook source").into_response();
        }
    };

    match destination {
        Destination::Shared => {
            tracing::debug!(
                request_id = %request_id,
                repository = %payload.repository.full_name,
                "Relaying verified webhook downstream"
            );
            match state.forwarder.forward(parts, body_bytes).await {
                Ok(response) => {
                    metrics::record_webhook(response.status().as_u16(), start_time);
                    response
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Downstream relay failed");
                    metrics::record_webhook(502, start_time);
                    (StatusCode::BAD_GATEWAY, "Downstream relay failed").into_response()
                }
            }
        }
        Destination::Dedicated => {
            tracing::warn!(
                request_id = %request_id,
                repository = %payload.repository.full_name,
                "Destination kind not yet supported"
            );
            metrics::record_webhook(422, start_time);
            (StatusCode::UNPROCESSABLE_ENTITY, "Destination kind not yet supported").into_response()
        }
    }
}
