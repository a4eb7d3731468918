use crate::{
    api::handlers::{auth::AuthState, health, root},
    store::DataStore,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, options},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub mod error;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, the raw `OpenAPI`
/// document, `OPTIONS /health`, request ids, tracing, CORS and shared state.
pub fn app(store: DataStore, auth: Arc<AuthState>, cors: CorsLayer) -> Router {
    let (router, openapi) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(openapi) }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    store: DataStore,
    auth: Arc<AuthState>,
    cors_origin: &str,
) -> Result<()> {
    let cors = cors_layer(cors_origin)?;
    let app = app(store, auth, cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// `*` allows every origin, method and header; otherwise a comma separated list
/// of exact origins.
///
/// # Errors
/// Returns an error if an origin is not a valid `scheme://host[:port]`.
pub fn cors_layer(cors_origin: &str) -> Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if cors_origin.trim() == "*" {
        return Ok(cors.allow_origin(Any));
    }

    let origins = cors_origin
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(origin_header)
        .collect::<Result<Vec<_>>>()?;

    if origins.is_empty() {
        return Err(anyhow!("CORS origin list is empty"));
    }

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

fn origin_header(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
