//! OpenSearch client and bulk sink
//!
//! Talks to the OpenSearch REST API over HTTP: index existence and creation,
//! `_bulk` writes keyed by document identity, a cluster ping and document
//! counts for operational checks.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BatchOutcome, IndexDocument, IndexSink, RejectedDocument};
use crate::config::OpenSearchConfig;
use crate::{Error, Result};

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Identity reported by `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub distribution: Option<String>,
    #[serde(default)]
    pub number: String,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

/// Thin HTTP client for one OpenSearch index
#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    client: Client,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
    refresh: bool,
}

impl OpenSearchClient {
    /// Create a client from the sink configuration
    pub fn new(config: &OpenSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::http("Failed to build HTTP client", e))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), password) => Some((user.clone(), password.clone().unwrap_or_default())),
            (None, _) => None,
        };

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            credentials,
            refresh: config.refresh,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} failed", what), e))
    }

    /// Fetch cluster identity; fails when the service is unreachable
    pub async fn ping(&self) -> Result<ClusterInfo> {
        let response = self.send(self.client.get(self.url("/")), "Ping").await?;
        let response = ensure_success(response, "Ping").await?;
        response
            .json::<ClusterInfo>()
            .await
            .map_err(|e| Error::http("Failed to decode cluster info", e))
    }

    pub async fn index_exists(&self) -> Result<bool> {
        let response = self
            .send(self.client.head(self.url(&self.index)), "Index lookup")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Error::sink(format!(
                "Index lookup for '{}' returned status {}",
                self.index, status
            ))),
        }
    }

    /// Create the index; an index created concurrently counts as success
    pub async fn create_index(&self, mapping: &Value) -> Result<()> {
        let response = self
            .send(
                self.client.put(self.url(&self.index)).json(mapping),
                "Index creation",
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Created index '{}'", self.index);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("resource_already_exists_exception") {
            debug!("Index '{}' was created concurrently", self.index);
            return Ok(());
        }

        Err(Error::sink(format!(
            "Index creation for '{}' returned status {}: {}",
            self.index, status, body
        )))
    }

    /// Number of documents currently in the index
    pub async fn document_count(&self) -> Result<u64> {
        let path = format!("{}/_count", self.index);
        let response = self
            .send(self.client.get(self.url(&path)), "Document count")
            .await?;
        let response = ensure_success(response, "Document count").await?;
        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| Error::http("Failed to decode count response", e))?;
        Ok(count.count)
    }

    /// Send one `_bulk` request and match item results to the documents
    pub async fn bulk(&self, documents: &[IndexDocument]) -> Result<BatchOutcome> {
        if documents.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let body = render_bulk_body(&self.index, documents)?;
        let mut request = self
            .client
            .post(self.url("/_bulk"))
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(body);
        if self.refresh {
            request = request.query(&[("refresh", "true")]);
        }

        let response = self.send(request, "Bulk request").await?;
        let response = ensure_success(response, "Bulk request").await?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::http("Failed to read bulk response", e))?;

        parse_bulk_response(&text, documents)
    }
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::sink(format!(
        "{} returned status {}: {}",
        what, status, body
    )))
}

/// Render documents as NDJSON `index` actions
pub fn render_bulk_body(index: &str, documents: &[IndexDocument]) -> Result<String> {
    let mut body = String::new();
    for document in documents {
        let action = json!({ "index": { "_index": index, "_id": document.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&document.body)?);
        body.push('\n');
    }
    Ok(body)
}

/// Interpret a `_bulk` response body against the documents that were sent
pub fn parse_bulk_response(text: &str, documents: &[IndexDocument]) -> Result<BatchOutcome> {
    let response: BulkResponse = serde_json::from_str(text)
        .map_err(|e| Error::json("Failed to decode bulk response", e))?;

    if response.items.len() != documents.len() {
        return Err(Error::sink(format!(
            "Bulk response has {} items for {} documents",
            response.items.len(),
            documents.len()
        )));
    }

    let mut outcome = BatchOutcome::default();
    for (item, document) in response.items.into_iter().zip(documents) {
        let Some(result) = item.into_values().next() else {
            return Err(Error::sink("Bulk response item has no action result"));
        };

        if (200..300).contains(&result.status) {
            outcome.written += 1;
            continue;
        }

        let rejected = RejectedDocument {
            id: result.id.unwrap_or_else(|| document.id.clone()),
            line_number: document.line_number,
            status: result.status,
            reason: describe_item_error(result.error.as_ref()),
        };
        warn!(
            "Line {}: document '{}' rejected ({}): {}",
            rejected.line_number, rejected.id, rejected.status, rejected.reason
        );
        outcome.rejected.push(rejected);
    }

    if response.errors && outcome.rejected.is_empty() {
        debug!("Bulk response flagged errors but every item succeeded");
    }

    Ok(outcome)
}

fn describe_item_error(error: Option<&Value>) -> String {
    let Some(error) = error else {
        return "unknown error".to_string();
    };
    let kind = error.get("type").and_then(Value::as_str);
    let reason = error.get("reason").and_then(Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => error.to_string(),
    }
}

/// Bulk-writing sink backed by [`OpenSearchClient`]
#[derive(Debug, Clone)]
pub struct OpenSearchSink {
    client: OpenSearchClient,
    create_index: bool,
}

impl OpenSearchSink {
    pub fn new(client: OpenSearchClient, create_index: bool) -> Self {
        Self {
            client,
            create_index,
        }
    }

    pub fn client(&self) -> &OpenSearchClient {
        &self.client
    }
}

#[async_trait]
impl IndexSink for OpenSearchSink {
    async fn ensure_index(&mut self, mapping: &Value) -> Result<()> {
        if self.client.index_exists().await? {
            debug!("Index '{}' already exists", self.client.index());
            return Ok(());
        }

        if !self.create_index {
            return Err(Error::sink(format!(
                "Index '{}' does not exist and index creation is disabled",
                self.client.index()
            )));
        }

        self.client.create_index(mapping).await
    }

    async fn write_batch(&mut self, documents: Vec<IndexDocument>) -> Result<BatchOutcome> {
        debug!("Sending bulk request with {} documents", documents.len());
        self.client.bulk(&documents).await
    }
}
