//! `PostgREST` (Supabase) client.
//!
//! Tables are reached at `{url}/rest/v1/{table}`. Every request carries the
//! service key twice, as `apikey` and as a bearer token, and writes ask for
//! `Prefer: return=representation` so the stored rows come back in the response.

use super::{DataService, Direction, Filter, Query, Row, StoreError, StoreFuture};
use crate::APP_USER_AGENT;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{debug, info_span, Instrument};
use url::Url;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone)]
pub struct PostgrestConfig {
    pub url: Url,
    pub key: SecretString,
    pub timeout: Duration,
}

impl PostgrestConfig {
    #[must_use]
    pub fn new(url: Url, key: SecretString) -> Self {
        Self {
            url,
            key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for PostgrestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestConfig")
            .field("url", &self.url.as_str())
            .field("key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct PostgrestClient {
    client: Client,
    base: String,
    key: SecretString,
}

impl PostgrestClient {
    /// Build the HTTP client. No request is made until the first call.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: PostgrestConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base: config.url.as_str().trim_end_matches('/').to_string(),
            key: config.key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let key = self.key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Accept", "application/json")
    }

    async fn send_rows(&self, builder: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = builder.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                StoreError::Timeout
            } else {
                StoreError::Decode(err.to_string())
            }
        })?;

        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(StoreError::Decode(format!("expected a row, got {other}"))),
                })
                .collect(),
            Value::Object(row) => Ok(vec![row]),
            other => Err(StoreError::Decode(format!(
                "expected an array of rows, got {other}"
            ))),
        }
    }
}

impl fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base", &self.base)
            .field("key", &"***")
            .finish()
    }
}

impl DataService for PostgrestClient {
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
        let span = info_span!("data.request", db.system = "postgrest", db.operation = "SELECT", db.table = table);
        Box::pin(
            async move {
                let builder = self
                    .request(Method::GET, &self.table_url(table))
                    .query(&query_params(query));
                let rows = self.send_rows(builder).await?;
                debug!(rows = rows.len(), "select complete");
                Ok(rows)
            }
            .instrument(span),
        )
    }

    fn insert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row> {
        let span = info_span!("data.request", db.system = "postgrest", db.operation = "INSERT", db.table = table);
        Box::pin(
            async move {
                let builder = self
                    .request(Method::POST, &self.table_url(table))
                    .header("Prefer", "return=representation")
                    .json(&Value::Object(row));
                self.send_rows(builder)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
            }
            .instrument(span),
        )
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        patch: Row,
        filters: &'a [Filter],
    ) -> StoreFuture<'a, Vec<Row>> {
        let span = info_span!("data.request", db.system = "postgrest", db.operation = "UPDATE", db.table = table);
        Box::pin(
            async move {
                let builder = self
                    .request(Method::PATCH, &self.table_url(table))
                    .header("Prefer", "return=representation")
                    .query(&filter_params(filters))
                    .json(&Value::Object(patch));
                self.send_rows(builder).await
            }
            .instrument(span),
        )
    }

    fn delete<'a>(&'a self, table: &'a str, filters: &'a [Filter]) -> StoreFuture<'a, Vec<Row>> {
        let span = info_span!("data.request", db.system = "postgrest", db.operation = "DELETE", db.table = table);
        Box::pin(
            async move {
                let builder = self
                    .request(Method::DELETE, &self.table_url(table))
                    .header("Prefer", "return=representation")
                    .query(&filter_params(filters));
                self.send_rows(builder).await
            }
            .instrument(span),
        )
    }

    fn health(&self) -> StoreFuture<'_, ()> {
        let span = info_span!("data.request", db.system = "postgrest", db.operation = "PING");
        Box::pin(
            async move {
                let url = format!("{}/rest/v1/", self.base);
                let response = self
                    .request(Method::GET, &url)
                    .send()
                    .await
                    .map_err(transport_error)?;
                check_status(response).await.map(|_| ())
            }
            .instrument(span),
        )
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Unreachable(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// `PostgREST` errors are JSON objects with a `message`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.column.clone(), format!("eq.{}", filter.param_value())))
        .collect()
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();

    if !query.columns.is_empty() {
        params.push(("select".to_string(), query.columns.join(",")));
    }

    params.extend(filter_params(&query.filters));

    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }

    params
}
