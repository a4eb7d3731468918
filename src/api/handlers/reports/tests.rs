//! Router-level tests for the report lifecycle endpoints.

use anyhow::{Context, Result};
use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};

use super::lifecycle::{self, ReportPatch, ReportStatus};
use crate::{
    api::handlers::test_support::{token_of, TestApp},
    store::REPORTS,
};

fn emergency(latitude: f64) -> Value {
    json!({
        "emergency_type": "engine_failure",
        "location_latitude": latitude,
        "location_longitude": 126.3,
        "description": "engine stopped near the breakwater",
    })
}

async fn file_report(app: &TestApp, token: &str) -> Result<String> {
    let (status, _, body) = app
        .send(Method::POST, "/reports/emergency", Some(token), Some(emergency(34.7)))
        .await?;
    assert_eq!(status, StatusCode::OK, "report failed: {body}");
    body["id"].as_str().map(str::to_string).context("missing id")
}

#[tokio::test]
async fn onboarded_device_files_and_cancels() -> Result<()> {
    let app = TestApp::new()?;
    let onboarded = app.onboard("dev-1", "010-1").await?;
    let token = token_of(&onboarded)?;

    let (status, _, report) = app
        .send(Method::POST, "/reports/emergency", Some(&token), Some(emergency(34.7)))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "pending");
    assert_eq!(report["type"], "manual");
    assert_eq!(report["user_id"], onboarded["user_id"]);
    assert_eq!(report["device_id"], "dev-1");
    assert_eq!(report["reported_at"], report["updated_at"]);

    let id = report["id"].as_str().context("missing id")?;
    let cancel_uri = format!("/reports/{id}/cancel");

    let (status, _, cancelled) = app.send(Method::PUT, &cancel_uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _, body) = app.send(Method::PUT, &cancel_uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "only pending reports can be cancelled");

    let (status, _, current) = app
        .send(Method::GET, &format!("/reports/status/{id}"), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["status"], "cancelled");
    Ok(())
}

#[tokio::test]
async fn cancel_completed_keeps_status() -> Result<()> {
    let app = TestApp::new()?;
    let token = token_of(&app.register("A", "010-1", "pw").await?)?;
    let id = file_report(&app, &token).await?;

    lifecycle::update(
        app.memory.as_ref(),
        &id,
        ReportPatch {
            status: Some(ReportStatus::Completed),
            ..ReportPatch::default()
        },
        Utc::now(),
    )
    .await?;

    let (status, _, _) = app
        .send(Method::PUT, &format!("/reports/{id}/cancel"), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rows = app.memory.rows(REPORTS);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("status"), Some(&json!("completed")));
    Ok(())
}

#[tokio::test]
async fn other_users_reports_are_not_found() -> Result<()> {
    let app = TestApp::new()?;
    let owner = token_of(&app.register("A", "010-1", "pw").await?)?;
    let other = token_of(&app.register("B", "010-2", "pw").await?)?;
    let id = file_report(&app, &owner).await?;

    let (status, _, body) = app
        .send(Method::PUT, &format!("/reports/{id}/cancel"), Some(&other), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "report not found");

    let (status, _, _) = app
        .send(Method::GET, &format!("/reports/status/{id}"), Some(&other), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, history) = app
        .send(Method::GET, "/reports/history", Some(&other), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));

    // still pending for the owner
    let (_, _, current) = app
        .send(Method::GET, &format!("/reports/status/{id}"), Some(&owner), None)
        .await?;
    assert_eq!(current["status"], "pending");
    Ok(())
}

#[tokio::test]
async fn auto_detection_needs_onboarded_device() -> Result<()> {
    let app = TestApp::new()?;
    let detection = |device: &str| {
        json!({
            "device_id": device,
            "location_latitude": 35.1,
            "location_longitude": 129.0,
            "accident_probability": 0.93,
            "sensor_data": {"acceleration": [0.1, 9.8, 24.0]},
        })
    };

    let (status, _, body) = app
        .send(Method::POST, "/reports/auto-detection", None, Some(detection("ghost")))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "device not onboarded");
    assert!(app.memory.rows(REPORTS).is_empty());

    let onboarded = app.onboard("dev-7", "010-7").await?;
    let (status, _, report) = app
        .send(Method::POST, "/reports/auto-detection", None, Some(detection("dev-7")))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["type"], "auto_detection");
    assert_eq!(report["status"], "pending");
    assert_eq!(report["user_id"], onboarded["user_id"]);
    assert_eq!(report["accident_probability"], 0.93);
    assert_eq!(report["sensor_data"]["acceleration"][2], 24.0);
    Ok(())
}

#[tokio::test]
async fn auto_detection_probability_is_bounded() -> Result<()> {
    let app = TestApp::new()?;
    app.onboard("dev-1", "010-1").await?;

    let (status, _, _) = app
        .send(
            Method::POST,
            "/reports/auto-detection",
            None,
            Some(json!({
                "device_id": "dev-1",
                "location_latitude": 35.1,
                "location_longitude": 129.0,
                "accident_probability": 1.5,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn emergency_requires_token_and_valid_coordinates() -> Result<()> {
    let app = TestApp::new()?;

    let (status, challenge, _) = app
        .send(Method::POST, "/reports/emergency", None, Some(emergency(34.7)))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer"));

    let token = token_of(&app.register("A", "010-1", "pw").await?)?;
    let (status, _, _) = app
        .send(Method::POST, "/reports/emergency", Some(&token), Some(emergency(120.0)))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/reports/emergency",
            Some(&token),
            Some(json!({
                "emergency_type": "sea_monster",
                "location_latitude": 34.0,
                "location_longitude": 126.0,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.memory.rows(REPORTS).is_empty());
    Ok(())
}

#[tokio::test]
async fn history_is_newest_first_and_paginated() -> Result<()> {
    let app = TestApp::new()?;
    let token = token_of(&app.register("A", "010-1", "pw").await?)?;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(file_report(&app, &token).await?);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (status, _, page) = app
        .send(Method::GET, "/reports/history?limit=2", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<_> = page
        .as_array()
        .context("history is not an array")?
        .iter()
        .filter_map(|report| report["id"].as_str())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);

    let (_, _, rest) = app
        .send(Method::GET, "/reports/history?limit=2&offset=2", Some(&token), None)
        .await?;
    assert_eq!(rest.as_array().map(Vec::len), Some(1));

    for bad in ["limit=0", "limit=101", "offset=-1", "limit=ten"] {
        let (status, _, _) = app
            .send(Method::GET, &format!("/reports/history?{bad}"), Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{bad}");
    }
    Ok(())
}
