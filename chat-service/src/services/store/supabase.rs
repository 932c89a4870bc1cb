//! Supabase data store client.
//!
//! Talks to the project's PostgREST endpoint (`{url}/rest/v1/{table}`) with
//! the anon key, mirroring what the Supabase client libraries send.

use super::{DataStore, Query, StoreError};
use crate::config::SupabaseConfig;
use crate::services::metrics;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

/// Accept header asking PostgREST for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST code for "zero or multiple rows" on a single-object request.
const NO_SINGLE_ROW: &str = "PGRST116";

/// Supabase client for interacting with the PostgREST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
}

/// PostgREST error response.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Check if Supabase is configured (URL and key are set).
    pub fn is_configured(&self) -> bool {
        !self.config.url.is_empty() && !self.config.anon_key.expose_secret().is_empty()
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.anon_key.expose_secret();
        builder
            .header("apikey", key.as_str())
            .bearer_auth(key)
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response, StoreError> {
        if !self.is_configured() {
            return Err(StoreError::NotConfigured(
                "SUPABASE_URL and SUPABASE_ANON_KEY must be set".to_string(),
            ));
        }

        let start = Instant::now();
        let result = self.request(builder).send().await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::record_provider_call("supabase", operation, false, start.elapsed());
                return Err(StoreError::Network(e.to_string()));
            }
        };

        let ok = response.status().is_success();
        metrics::record_provider_call("supabase", operation, ok, start.elapsed());

        if ok {
            return Ok(response);
        }

        Err(Self::error_from(response).await)
    }

    async fn error_from(response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<PostgrestError>(&body) {
            Ok(err)
                if status == StatusCode::NOT_ACCEPTABLE
                    && err.code.as_deref() == Some(NO_SINGLE_ROW) =>
            {
                StoreError::NotFound
            }
            Ok(err) => StoreError::Api {
                status: status.as_u16(),
                message: err.message,
            },
            Err(_) => StoreError::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            },
        }
    }

    async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        // DELETE/PATCH without representation answer with an empty body
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body)
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?
        {
            Value::Array(rows) => Ok(rows),
            other => Ok(vec![other]),
        }
    }
}

#[async_trait]
impl DataStore for SupabaseStore {
    #[tracing::instrument(skip(self, query), fields(store = "supabase"))]
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let builder = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(&query.to_params());

        let response = self.send("select", builder).await?;
        Self::rows(response).await
    }

    #[tracing::instrument(skip(self, query), fields(store = "supabase"))]
    async fn select_single(&self, table: &str, query: &Query) -> Result<Value, StoreError> {
        let builder = self
            .client
            .get(self.table_url(table))
            .header(header::ACCEPT, SINGLE_OBJECT)
            .query(&[("select", "*")])
            .query(&query.to_params());

        let response = self.send("select_single", builder).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))
    }

    #[tracing::instrument(skip(self, record), fields(store = "supabase"))]
    async fn insert(&self, table: &str, record: &Value) -> Result<Vec<Value>, StoreError> {
        if !record.is_object() {
            return Err(StoreError::InvalidPayload(
                "record must be a JSON object".to_string(),
            ));
        }

        let builder = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&[("select", "*")])
            .json(&[record]);

        let response = self.send("insert", builder).await?;
        Self::rows(response).await
    }

    #[tracing::instrument(skip(self, query, changes), fields(store = "supabase"))]
    async fn update(
        &self,
        table: &str,
        query: &Query,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        if !changes.is_object() {
            return Err(StoreError::InvalidPayload(
                "changes must be a JSON object".to_string(),
            ));
        }

        let builder = self
            .client
            .patch(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&[("select", "*")])
            .query(&query.to_params())
            .json(changes);

        let response = self.send("update", builder).await?;
        Self::rows(response).await
    }

    #[tracing::instrument(skip(self, query), fields(store = "supabase"))]
    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError> {
        let builder = self
            .client
            .delete(self.table_url(table))
            .query(&query.to_params());

        self.send("delete", builder).await?;
        Ok(())
    }
}
