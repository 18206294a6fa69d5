//! Time-series backend contract (§6 external collaborator). The query
//! *string* construction in `builder` is in scope; the transport here is
//! a thin `reqwest`-based client, matching the retrieved pack's
//! external-call style (`knhk-sidecar::client`'s HTTP wrapper around a
//! warm-orchestrator endpoint).

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::builder::Row;
use crate::error::BackendError;

/// §5: explicit time-series query/write timeouts.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(60);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// The read/write surface `ic-query`/`ic-worker` need from the
/// time-series store. Kept narrow and async-trait-based so tests can
/// substitute an in-memory fake without standing up a real database.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn query_rows(&self, query: &str) -> Result<Vec<Row>, BackendError>;
    async fn query_count(&self, query: &str) -> Result<i64, BackendError>;
    async fn write_point(&self, line_protocol: &str) -> Result<(), BackendError>;
    async fn ping(&self) -> Result<(), BackendError>;
}

/// A pivot-style HTTP backend, shaped after InfluxDB's `/api/v2/query`
/// (Flux) and `/api/v2/write` (line protocol) endpoints.
pub struct HttpInfluxBackend {
    client: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
}

impl HttpInfluxBackend {
    pub fn new(url: impl Into<String>, org: impl Into<String>, bucket: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Backend for HttpInfluxBackend {
    async fn query_rows(&self, query: &str) -> Result<Vec<Row>, BackendError> {
        let endpoint = format!("{}/api/v2/query?org={}", self.url, self.org);
        let response = tokio::time::timeout(
            QUERY_TIMEOUT,
            self.client
                .post(&endpoint)
                .bearer_auth(&self.token)
                .header("Content-Type", "application/vnd.flux")
                .header("Accept", "application/json")
                .body(query.to_string())
                .send(),
        )
        .await
        .map_err(|_| BackendError::Timeout(QUERY_TIMEOUT))??;

        let rows: Vec<Row> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(rows)
    }

    async fn query_count(&self, query: &str) -> Result<i64, BackendError> {
        #[derive(serde::Deserialize)]
        struct CountRow {
            #[serde(rename = "_value")]
            value: i64,
        }
        let endpoint = format!("{}/api/v2/query?org={}", self.url, self.org);
        let response = tokio::time::timeout(
            QUERY_TIMEOUT,
            self.client
                .post(&endpoint)
                .bearer_auth(&self.token)
                .header("Content-Type", "application/vnd.flux")
                .header("Accept", "application/json")
                .body(query.to_string())
                .send(),
        )
        .await
        .map_err(|_| BackendError::Timeout(QUERY_TIMEOUT))??;

        let rows: Vec<CountRow> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(rows.first().map(|r| r.value).unwrap_or(0))
    }

    async fn write_point(&self, line_protocol: &str) -> Result<(), BackendError> {
        let endpoint = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=ns",
            self.url, self.org, self.bucket
        );
        let response = tokio::time::timeout(
            WRITE_TIMEOUT,
            self.client
                .post(&endpoint)
                .bearer_auth(&self.token)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(line_protocol.to_string())
                .send(),
        )
        .await
        .map_err(|_| BackendError::Timeout(WRITE_TIMEOUT))??;

        if !response.status().is_success() {
            warn!(status = %response.status(), "time-series write rejected");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let endpoint = format!("{}/health", self.url);
        tokio::time::timeout(Duration::from_secs(2), self.client.get(&endpoint).send())
            .await
            .map_err(|_| BackendError::Timeout(Duration::from_secs(2)))??;
        Ok(())
    }
}
