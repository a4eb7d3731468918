//! Shared harness for router-level handler tests.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        Method, Request, StatusCode,
    },
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::auth::{AuthConfig, AuthState};
use crate::{
    api::{app, cors_layer},
    store::{DataStore, MemoryStore},
};

pub(crate) struct TestApp {
    pub router: Router,
    pub auth: Arc<AuthState>,
    pub memory: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let memory = Arc::new(MemoryStore::with_user_constraints());
        let auth = Arc::new(AuthState::new(
            &AuthConfig::new(SecretString::from("router-secret")).with_bcrypt_cost(4),
        )?);
        let router = app(DataStore::new(memory.clone()), auth.clone(), cors_layer("*")?);
        Ok(Self {
            router,
            auth,
            memory,
        })
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Option<String>, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response is not JSON")?
        };
        Ok((status, challenge, json))
    }

    pub async fn register(&self, name: &str, phone: &str, password: &str) -> Result<Value> {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": name, "phone": phone, "password": password})),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        Ok(body)
    }

    pub async fn onboard(&self, device_id: &str, phone: &str) -> Result<Value> {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/onboarding/setup",
                None,
                Some(json!({"device_id": device_id, "name": "Skipper", "phone": phone})),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "onboarding failed: {body}");
        Ok(body)
    }
}

pub(crate) fn token_of(body: &Value) -> Result<String> {
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .context("missing access_token")
}

