//! End-to-end flows through the public router over the in-memory store.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use badacall::{
    api::{app, cors_layer, handlers::auth::{AuthConfig, AuthState}},
    store::{DataStore, MemoryStore},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router(memory: Arc<MemoryStore>) -> Result<Router> {
    let auth = AuthState::new(
        &AuthConfig::new(SecretString::from("integration-secret")).with_bcrypt_cost(4),
    )?;
    Ok(app(DataStore::new(memory), Arc::new(auth), cors_layer("*")?))
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

#[tokio::test]
async fn banner_health_and_docs() -> Result<()> {
    let memory = Arc::new(MemoryStore::with_user_constraints());
    let router = router(memory.clone())?;

    let (status, banner) = call(&router, Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banner, json!({"message": "badacall API", "status": "running"}));

    let (status, health) = call(&router, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["data_service"], "ok");
    assert_eq!(health["name"], "badacall");

    memory.set_offline(true);
    let (status, health) = call(&router, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["data_service"], "error");

    let (status, doc) = call(&router, Method::GET, "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "badacall");
    assert!(doc["paths"]["/reports/{id}/cancel"]["put"].is_object());
    Ok(())
}

#[tokio::test]
async fn request_id_and_cors_headers() -> Result<()> {
    let router = router(Arc::new(MemoryStore::new()))?;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .context("missing x-request-id")?;
    assert_eq!(request_id.len(), 26);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "trace-me")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(&b"trace-me"[..])
    );

    let preflight = router
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/reports/emergency")
                .header(header::ORIGIN, "https://app.badacall.kr")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(
        preflight
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.as_bytes()),
        Some(&b"*"[..])
    );
    Ok(())
}

#[tokio::test]
async fn device_first_journey() -> Result<()> {
    let router = router(Arc::new(MemoryStore::with_user_constraints()))?;

    let (status, onboarded) = call(
        &router,
        Method::POST,
        "/onboarding/setup",
        None,
        Some(json!({
            "device_id": "android-3f9c",
            "name": "Lee Sun",
            "phone": "010-4444-5555",
            "boat_name": "Geobuk-ho",
            "emergency_contact_1_name": "Harbor office",
            "emergency_contact_1_phone": "061-123-4567",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(onboarded["device_id"], "android-3f9c");
    let token = onboarded["access_token"]
        .as_str()
        .context("missing token")?
        .to_string();

    let (status, profile) = call(
        &router,
        Method::GET,
        "/onboarding/profile/android-3f9c",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["boat_name"], "Geobuk-ho");
    assert_eq!(profile["emergency_contacts"][0]["name"], "Harbor office");

    for (latitude, at) in [
        (34.70, "2024-06-01T05:00:00Z"),
        (34.72, "2024-06-01T05:10:00Z"),
    ] {
        let (status, ping) = call(
            &router,
            Method::POST,
            "/location/update",
            None,
            Some(json!({
                "device_id": "android-3f9c",
                "latitude": latitude,
                "longitude": 126.4,
                "timestamp": at,
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ping["user_id"], onboarded["user_id"]);
    }

    let (status, current) = call(
        &router,
        Method::GET,
        "/location/current?device_id=android-3f9c",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["latitude"], 34.72);

    let (_, stats) = call(
        &router,
        Method::GET,
        "/location/stats?device_id=android-3f9c",
        None,
        None,
    )
    .await?;
    assert_eq!(stats["total_count"], 2);
    assert_eq!(stats["first_record"], "2024-06-01T05:00:00Z");
    assert_eq!(stats["last_record"], "2024-06-01T05:10:00Z");

    let (status, report) = call(
        &router,
        Method::POST,
        "/reports/emergency",
        Some(&token),
        Some(json!({
            "emergency_type": "man_overboard",
            "location_latitude": current["latitude"],
            "location_longitude": current["longitude"],
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "pending");
    assert_eq!(report["device_id"], "android-3f9c");

    let (status, history) = call(&router, Method::GET, "/reports/history", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["id"], report["id"]);

    let (status, updated) = call(
        &router,
        Method::PUT,
        "/onboarding/profile/android-3f9c",
        Some(&token),
        Some(json!({
            "name": "Lee Sun",
            "phone": "010-4444-5555",
            "boat_number": "JN-1024",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["boat_number"], "JN-1024");
    assert_eq!(updated["boat_name"], Value::Null);
    assert_eq!(updated["emergency_contacts"], json!([]));
    Ok(())
}
