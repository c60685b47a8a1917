//! Elasticsearch-compatible REST backend

use super::{BulkSummary, DocumentStore, IDENTIFIER_FIELD, TYPE_FIELD, VIEWS_FIELD};
use crate::config::DEFAULT_ID_PAGE_SIZE;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
    #[serde(default)]
    sort: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<std::collections::HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReindexResponse {
    #[serde(default)]
    failures: Vec<Value>,
}

/// Document store speaking the Elasticsearch REST dialect
#[derive(Debug)]
pub struct HttpDocumentStore {
    base_url: String,
    http: reqwest::Client,
    auth_token: Option<String>,
    page_size: usize,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::from_store)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            auth_token,
            page_size: DEFAULT_ID_PAGE_SIZE,
        })
    }

    /// Hits fetched per page when listing ids
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    async fn failure(resp: reqwest::Response, what: &str) -> SyncError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        SyncError::store(
            Some(status.as_u16()),
            format!("{} failed with status {}: {}", what, status, body),
        )
    }

    /// Page through every hit of `query` in `index`, sorted by `_id`.
    ///
    /// Returns `None` if the index does not exist.
    async fn search_all(
        &self,
        index: &str,
        query: Value,
        source: Value,
    ) -> Result<Option<Vec<Hit>>> {
        let url = format!(
            "{}/{}/_search?ignore_unavailable=true&allow_no_indices=true",
            self.base_url, index
        );
        let mut all = Vec::new();
        let mut search_after: Option<Vec<Value>> = None;

        loop {
            let mut body = json!({
                "size": self.page_size,
                "query": query,
                "_source": source,
                "sort": [{ "_id": "asc" }],
            });
            if let Some(after) = &search_after {
                body["search_after"] = Value::Array(after.clone());
            }

            let resp = self
                .add_auth(self.http.post(&url))
                .json(&body)
                .send()
                .await
                .map_err(SyncError::from_store)?;
            match resp.status().as_u16() {
                200 => {}
                404 => return Ok(None),
                _ => return Err(Self::failure(resp, &format!("Search in {}", index)).await),
            }

            let page: SearchResponse = resp.json().await.map_err(SyncError::from_store)?;
            let count = page.hits.hits.len();
            search_after = page.hits.hits.last().and_then(|h| h.sort.clone());
            all.extend(page.hits.hits);

            if count < self.page_size || search_after.is_none() {
                break;
            }
        }

        Ok(Some(all))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let url = format!("{}/{}", self.base_url, index);
        let resp = self
            .add_auth(self.http.put(&url))
            .json(body)
            .send()
            .await
            .map_err(SyncError::from_store)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, &format!("Creation of index {}", index)).await);
        }
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        let url = format!("{}/{}", self.base_url, index);
        let resp = self
            .add_auth(self.http.delete(&url))
            .send()
            .await
            .map_err(SyncError::from_store)?;
        match resp.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::failure(resp, &format!("Deletion of index {}", index)).await),
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = format!("{}/{}", self.base_url, index);
        let resp = self
            .add_auth(self.http.head(&url))
            .send()
            .await
            .map_err(SyncError::from_store)?;
        match resp.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SyncError::store(
                Some(status),
                format!("Unexpected status {} checking index {}", status, index),
            )),
        }
    }

    async fn bulk(&self, index: &str, payload: &str) -> Result<BulkSummary> {
        let url = format!("{}/{}/_bulk", self.base_url, index);
        debug!(index, chars = payload.len(), "sending bulk request");
        let resp = self
            .add_auth(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload.to_string())
            .send()
            .await
            .map_err(SyncError::from_store)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, &format!("Bulk request to {}", index)).await);
        }

        let response: BulkResponse = resp.json().await.map_err(SyncError::from_store)?;
        let mut summary = BulkSummary::default();
        for item in response.items {
            for (action, outcome) in item {
                let id = outcome.id.clone().unwrap_or_default();
                match (action.as_str(), outcome.status) {
                    ("delete", 404) => summary.not_found += 1,
                    ("delete", s) if s < 300 => summary.deleted += 1,
                    (_, s) if s < 300 => summary.indexed += 1,
                    (_, s) => {
                        let reason = outcome
                            .error
                            .as_ref()
                            .and_then(|e| e.get("reason"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .or(outcome.result.clone())
                            .unwrap_or_else(|| format!("status {}", s));
                        summary.failed.push((id, reason));
                    }
                }
            }
        }
        Ok(summary)
    }

    async fn reindex(&self, source: &str, target: &str) -> Result<()> {
        let url = format!("{}/_reindex?wait_for_completion=true", self.base_url);
        let body = json!({
            "source": { "index": source },
            "dest": { "index": target },
        });
        let resp = self
            .add_auth(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(SyncError::from_store)?;
        if !resp.status().is_success() {
            return Err(
                Self::failure(resp, &format!("Reindex {} -> {}", source, target)).await,
            );
        }
        let response: ReindexResponse = resp.json().await.map_err(SyncError::from_store)?;
        if !response.failures.is_empty() {
            return Err(SyncError::store(
                None,
                format!(
                    "Reindex {} -> {} reported {} failures",
                    source,
                    target,
                    response.failures.len()
                ),
            ));
        }
        Ok(())
    }

    async fn document_ids(&self, index: &str, target_type: &str) -> Result<Vec<String>> {
        let query = json!({ "term": { TYPE_FIELD: target_type } });
        let hits = self.search_all(index, query, json!(false)).await?;
        Ok(hits
            .unwrap_or_default()
            .into_iter()
            .map(|hit| hit.id)
            .collect())
    }

    async fn identifiers(&self, pattern: &str) -> Result<HashSet<String>> {
        let hits = self
            .search_all(pattern, json!({ "match_all": {} }), json!([IDENTIFIER_FIELD]))
            .await?;
        let mut identifiers = HashSet::new();
        for hit in hits.unwrap_or_default() {
            let values = hit
                .source
                .as_ref()
                .and_then(|s| s.get(IDENTIFIER_FIELD))
                .and_then(Value::as_array);
            match values {
                Some(values) => {
                    identifiers.extend(values.iter().filter_map(Value::as_str).map(str::to_string))
                }
                None => {
                    identifiers.insert(hit.id);
                }
            }
        }
        Ok(identifiers)
    }

    async fn top_views(&self, index: &str, size: usize) -> Result<Vec<u64>> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let body = json!({
            "size": size,
            "_source": [VIEWS_FIELD],
            "query": { "exists": { "field": VIEWS_FIELD } },
            "sort": [{ VIEWS_FIELD: { "order": "desc" } }],
        });
        let resp = self
            .add_auth(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(SyncError::from_store)?;
        match resp.status().as_u16() {
            200 => {}
            404 => return Ok(Vec::new()),
            _ => return Err(Self::failure(resp, &format!("View query on {}", index)).await),
        }

        let page: SearchResponse = resp.json().await.map_err(SyncError::from_store)?;
        Ok(page
            .hits
            .hits
            .iter()
            .filter_map(|hit| hit.source.as_ref()?.get(VIEWS_FIELD)?.as_u64())
            .collect())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let url = format!("{}/{}/_doc/{}", self.base_url, index, id);
        let resp = self
            .add_auth(self.http.get(&url))
            .send()
            .await
            .map_err(SyncError::from_store)?;
        match resp.status().as_u16() {
            200 => {
                let hit: Hit = resp.json().await.map_err(SyncError::from_store)?;
                Ok(hit.source)
            }
            404 => Ok(None),
            _ => {
                warn!(index, id, "unexpected status reading document");
                Err(Self::failure(resp, &format!("Read of {}/{}", index, id)).await)
            }
        }
    }
}
