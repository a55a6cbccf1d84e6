//! Supabase (PostgREST) gateway for the bookings table.

use std::fmt;

use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SelectQuery};
use crate::util::{compact_text, is_http_url, sanitize};

#[derive(Clone)]
pub struct SupabaseRestClient {
    rest_url: String,
    api_key: String,
    client: Client,
}

impl fmt::Debug for SupabaseRestClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseRestClient")
            .field("rest_url", &self.rest_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseRestClient {
    pub fn new(url: &str, api_key: impl Into<String>) -> Result<Self> {
        let rest_url = normalize_rest_url(url)?;
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(SyncError::backend("Supabase API key must not be empty"));
        }

        Ok(Self {
            rest_url,
            api_key,
            client: Client::builder()
                .build()
                .map_err(|error| SyncError::backend(sanitize(&error)))?,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, urlencoding::encode(table))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Rows requested per page. PostgREST caps a single response at its
/// `max-rows` setting (1000 on hosted Supabase).
const PAGE_SIZE: usize = 1000;

struct Page {
    rows: Vec<Value>,
    /// Total match count from `Content-Range`, when the server reports one.
    total: Option<usize>,
}

impl SupabaseRestClient {
    async fn select_page(
        &self,
        query: &SelectQuery,
        offset: usize,
        limit: usize,
    ) -> Result<Page> {
        let response = self
            .authorized(self.client.get(self.table_url(&query.table)))
            .query(&select_params(query, offset, limit))
            .header("Accept", "application/json")
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|error| {
                SyncError::backend(format!("Supabase query failed: {}", sanitize(&error)))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::backend(format!(
                "Supabase query failed: {}",
                parse_api_error(status, &body)
            )));
        }

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total);
        let rows = response.json::<Vec<Value>>().await.map_err(|error| {
            SyncError::backend(format!(
                "Supabase query returned invalid JSON: {}",
                sanitize(&error)
            ))
        })?;
        Ok(Page { rows, total })
    }
}

impl BookingStore for SupabaseRestClient {
    /// Reads every matching row, following pages until the reported total
    /// (or a short page) is reached.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        loop {
            let wanted = query
                .limit
                .map_or(PAGE_SIZE, |limit| limit.saturating_sub(rows.len()).min(PAGE_SIZE));
            if wanted == 0 {
                break;
            }

            let page = self.select_page(query, rows.len(), wanted).await?;
            let fetched = page.rows.len();
            rows.extend(page.rows);

            let done = match page.total {
                Some(total) => rows.len() >= total,
                None => fetched < wanted,
            };
            if fetched == 0 || done {
                break;
            }
        }
        Ok(rows)
    }

    async fn upsert(&self, table: &str, record: &Value, conflict_key: &str) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|error| SyncError::backend(sanitize(&error)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::backend(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

fn select_params(
    query: &SelectQuery,
    offset: usize,
    limit: usize,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", query.columns.clone())];
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order", format!("{}.{direction}", order.column)));
    }
    params.push(("limit", limit.to_string()));
    params.push(("offset", offset.to_string()));
    params
}

/// Total from a `Content-Range` value such as `0-999/2400` or `*/0`.
fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Accepts the project URL with or without the `/rest/v1` suffix.
pub fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SyncError::backend("Supabase URL must not be empty"));
    }
    if !is_http_url(trimmed) {
        return Err(SyncError::backend(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return match payload.hint.filter(|hint| !hint.trim().is_empty()) {
                Some(hint) => format!(
                    "{} ({}; hint: {})",
                    message.trim(),
                    status.as_u16(),
                    hint.trim()
                ),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
