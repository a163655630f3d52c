//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router: WebSocket endpoint plus a fallback that
//!   dispatches everything else to the controller router
//! - Wire up middleware (request id, CORS headers, tracing)
//! - Serve plain TCP or TLS with graceful shutdown

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_server::tls_rustls::RustlsConfig;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::{ServiceConfig, TlsConfig};
use crate::http::response::ApiResponse;
use crate::http::websocket::ws_handler;
use crate::lifecycle::{Application, ShutdownSignal};
use crate::observability::metrics;
use crate::realtime::SubscriptionServer;
use crate::routing::{RouteOutcome, Router};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub subscriptions: Arc<SubscriptionServer>,
}

/// HTTP server for the timezone service.
pub struct HttpServer {
    router: axum::Router,
    config: ServiceConfig,
    subscriptions: Arc<SubscriptionServer>,
}

impl HttpServer {
    pub fn new(config: ServiceConfig, app: &Application) -> Self {
        let state = AppState {
            router: Arc::clone(&app.router),
            subscriptions: Arc::clone(&app.subscriptions),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            subscriptions: Arc::clone(&app.subscriptions),
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> axum::Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            ));

        axum::Router::new()
            .route(&config.realtime.path, get(ws_handler))
            .fallback(dispatch)
            .with_state(state)
            .layer(middleware)
    }

    /// The fully layered router, for serving elsewhere or driving in tests.
    pub fn into_router(self) -> axum::Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// On shutdown the subscription server is closed first so WebSocket
    /// sessions end; in-flight requests then get the configured grace period.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = self.config.shutdown.grace_period();
        let subscriptions = Arc::clone(&self.subscriptions);
        let mut graceful = shutdown.clone();
        let serve = axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                graceful.recv().await;
                tracing::info!("Shutdown signal received");
                subscriptions.shutdown();
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = grace_elapsed(shutdown, grace) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, forcing shutdown");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(address = %addr, cert = %tls.cert_path, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let signal_handle = handle.clone();
        let grace = self.config.shutdown.grace_period();
        let subscriptions = Arc::clone(&self.subscriptions);
        tokio::spawn(async move {
            shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            subscriptions.shutdown();
            signal_handle.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

async fn grace_elapsed(mut shutdown: ShutdownSignal, grace: Duration) {
    shutdown.recv().await;
    tokio::time::sleep(grace).await;
}

/// Route everything that is not the WebSocket endpoint.
async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let start = Instant::now();

    let response = match state.router.handle_request(&method, uri.path()) {
        RouteOutcome::Matched(response) => response,
        RouteOutcome::NotMatched => {
            tracing::debug!(method = %method, path = %uri.path(), "No route matched");
            ApiResponse::not_found()
        }
    };

    metrics::record_request(method.as_str(), response.status.as_u16(), start);
    response.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let config = ServiceConfig::default();
        let application = Application::build(&config);
        HttpServer::new(config, &application).into_router()
    }

    async fn get(uri: &str) -> (StatusCode, axum::http::HeaderMap, Option<Value>) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).ok();
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_time_route() {
        let (status, _, body) = get("/time/America/New_York").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["timezone"], "America/New_York");
    }

    #[tokio::test]
    async fn test_encoded_slash_is_decoded() {
        let (status, _, body) = get("/time/America%2FNew_York").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["timezone"], "America/New_York");
    }

    #[tokio::test]
    async fn test_invalid_timezone() {
        let (status, _, body) = get("/time/Mars/Olympus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = body.unwrap();
        assert_eq!(body["error"], "Invalid timezone");
        assert_eq!(body["requested_timezone"], "Mars/Olympus");
    }

    #[tokio::test]
    async fn test_rejected_identifiers_echo_request() {
        for (uri, requested) in [
            ("/time/NotATimezone", "NotATimezone"),
            ("/time/Invalid/Timezone", "Invalid/Timezone"),
            ("/time/%20", " "),
        ] {
            let (status, _, body) = get(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body.unwrap()["requested_timezone"], requested);
        }
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let (status, _, body) = get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap()["example"], "/time/Etc/UTC");
    }

    #[tokio::test]
    async fn test_time_without_identifier_is_not_found() {
        for path in ["/time", "/time/"] {
            let (status, _, body) = get(path).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body.unwrap()["example"], "/time/Etc/UTC");
        }
    }

    #[tokio::test]
    async fn test_cors_and_request_id_headers() {
        let (_, headers, _) = get("/healthcheck").await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
        assert!(headers.contains_key("x-request-id"));

        let (_, headers, _) = get("/missing").await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_non_get_method_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/healthcheck")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
