use crate::{store::DataStore, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, Instrument, info_span};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: String,
    pub commit: String,
    pub name: String,
    pub version: String,
    pub data_service: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Data service is reachable", body = Health),
        (status = 503, description = "Data service is unconfigured or unreachable", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(method: Method, Extension(store): Extension<DataStore>) -> impl IntoResponse {
    let data_service = match store.get() {
        Ok(service) => {
            let span = info_span!("data.ping");
            match service.health().instrument(span).await {
                Ok(()) => "ok",
                Err(err) => {
                    error!("Data service health check failed: {}", err);
                    "error"
                }
            }
        }
        Err(_) => "unconfigured",
    };
    let is_healthy = data_service == "ok";

    let health = Health {
        status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_service: data_service.to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    if is_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
