//! Router-level tests for the auth endpoints, backed by the in-memory store.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use super::{AuthConfig, AuthState};
use crate::{
    api::{app, cors_layer, handlers::test_support::{token_of, TestApp}},
    store::{DataStore, USERS},
};

#[tokio::test]
async fn register_then_me() -> Result<()> {
    let app = TestApp::new()?;
    let registered = app.register("A", "010-1", "pw").await?;
    assert_eq!(registered["token_type"], "bearer");

    let token = token_of(&registered)?;
    let (status, _, me) = app.send(Method::GET, "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "A");
    assert_eq!(me["phone"], "010-1");
    assert_eq!(me["id"], registered["user_id"]);
    assert_eq!(me["emergency_contacts"], json!([]));
    assert!(me.get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_phone_is_conflict_without_second_row() -> Result<()> {
    let app = TestApp::new()?;
    app.register("A", "010-1", "pw").await?;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "B", "phone": "010-1", "password": "other"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "phone number already registered");
    assert_eq!(app.memory.rows(USERS).len(), 1);
    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> Result<()> {
    let app = TestApp::new()?;

    let (status, _, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": " ", "phone": "010-1", "password": "pw"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "A", "phone": "call me", "password": "pw"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "A", "phone": "010-1"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.memory.rows(USERS).is_empty());
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let app = TestApp::new()?;
    app.register("A", "010-1", "right").await?;

    let (ok, _, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"phone": "010-1", "password": "right"})),
        )
        .await?;
    assert_eq!(ok, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let wrong_password = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"phone": "010-1", "password": "wrong"})),
        )
        .await?;
    assert_eq!(app.auth.decoy_checks(), 0);
    let unknown_phone = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"phone": "010-9", "password": "right"})),
        )
        .await?;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_phone);
    // the unknown phone still ran one bcrypt verification
    assert_eq!(app.auth.decoy_checks(), 1);
    Ok(())
}

#[tokio::test]
async fn device_only_accounts_cannot_password_login() -> Result<()> {
    let app = TestApp::new()?;
    let (status, _, _) = app
        .send(
            Method::POST,
            "/onboarding/setup",
            None,
            Some(json!({"device_id": "dev-1", "name": "C", "phone": "010-3"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"phone": "010-3", "password": ""})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "invalid phone number or password");
    assert_eq!(app.auth.decoy_checks(), 1);
    Ok(())
}

#[tokio::test]
async fn protected_routes_challenge() -> Result<()> {
    let app = TestApp::new()?;

    let (status, challenge, body) = app.send(Method::GET, "/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer"));
    assert_eq!(body["detail"], "not authenticated");

    let (status, challenge, _) = app
        .send(Method::GET, "/auth/me", Some("not.a.token"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer"));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let registered = app.register("A", "010-1", "pw").await?;
    let user_id = registered["user_id"].as_str().context("user_id")?;

    let stale = app
        .auth
        .tokens()
        .issue_at(user_id, Utc::now() - Duration::minutes(31))?;
    let (status, _, body) = app.send(Method::GET, "/auth/me", Some(&stale), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "token expired");
    Ok(())
}

#[tokio::test]
async fn refresh_issues_a_working_token() -> Result<()> {
    let app = TestApp::new()?;
    let registered = app.register("A", "010-1", "pw").await?;
    let token = token_of(&registered)?;

    let (status, _, refreshed) = app
        .send(Method::POST, "/auth/refresh", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["user_id"], registered["user_id"]);

    let fresh = token_of(&refreshed)?;
    let (status, _, _) = app.send(Method::GET, "/auth/me", Some(&fresh), None).await?;
    assert_eq!(status, StatusCode::OK);

    // the old token stays valid until it expires
    let (status, _, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unconfigured_store_is_unavailable() -> Result<()> {
    let auth = Arc::new(AuthState::new(
        &AuthConfig::new(SecretString::from("router-secret")).with_bcrypt_cost(4),
    )?);
    let router = app(DataStore::unconfigured(), auth, cors_layer("*")?);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"phone": "010-1", "password": "pw"}).to_string()))?;
    let response = router.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
