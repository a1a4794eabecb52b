use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use const_format::formatcp;
use prometheus::{Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ROOT_BODY: &str = formatcp!(
    "{} {}: consumer groups lag is sent to StatsD; self metrics are at '/metrics'",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_VERSION")
);

// As defined by Prometheus: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#basic-info
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
struct HttpServiceState {
    metrics: Arc<Registry>,
}

/// Serve HTTP requests on `listen_on`, until `shutdown_token` is cancelled.
///
/// # Arguments
///
/// * `listen_on` - Address to bind to
/// * `shutdown_token` - Cancelled when it's time to shut down
/// * `metrics` - Registry exposed at `/metrics`
pub async fn init(listen_on: SocketAddr, shutdown_token: CancellationToken, metrics: Arc<Registry>) {
    // Assemble the HTTP Service State object, that will be passed to the routes
    let state = HttpServiceState {
        metrics,
    };

    // Setup Router
    let app = Router::new()
        // `GET /` goes to `root`
        .route("/", get(root))
        .route("/metrics", get(prometheus_metrics))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state);

    let listener = match TcpListener::bind(listen_on).await {
        Ok(l) => l,
        Err(e) => {
            error!("Unable to listen on '{listen_on}': {e}");
            return;
        },
    };

    // Setup Server, with Graceful Shutdown
    info!("Begin listening on '{}'...", listen_on);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move { shutdown_token.cancelled().await });
    if let Err(e) = server.await {
        error!("HTTP server terminated with an error: {e}");
    }
}

async fn root() -> &'static str {
    ROOT_BODY
}

async fn prometheus_metrics(State(state): State<HttpServiceState>) -> impl IntoResponse {
    let mut status = StatusCode::OK;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE));

    let mut body = String::new();
    let metrics_family = state.metrics.gather();
    if let Err(e) = TextEncoder.encode_utf8(&metrics_family, &mut body) {
        status = StatusCode::INTERNAL_SERVER_ERROR;
        body = format!("Failed to encode metrics: {e}");
    }

    (status, headers, body)
}
