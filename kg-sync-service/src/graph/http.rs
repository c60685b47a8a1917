//! HTTP client for the graph-query service

use super::GraphQueryClient;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use kg_sync_protocol::{BadgeCollection, SourcePage, Stage, BADGE_VOCAB, INSTANCE_IRI_PREFIX};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Fixed seed of the per-type badge registration instance ids.
const BADGE_REGISTRATION_SEED: &str = "8909ab6c-45c9-4b57-9f8a-6111eef752f6";

const SEARCH_VOCAB: &str = "https://search.kg.ebrains.eu";

/// HTTP-based graph service client
#[derive(Debug)]
pub struct HttpGraphClient {
    base_url: String,
    http: reqwest::Client,
    auth_token: Option<String>,
    space: String,
}

impl HttpGraphClient {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        space: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::from_graph)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            auth_token,
            space: space.into(),
        })
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    /// Instance id under which the badges of `target_type` are registered.
    pub fn badge_registration_id(target_type: &str) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("{}/{}", BADGE_REGISTRATION_SEED, target_type).as_bytes(),
        )
    }

    fn badge_document(target_type: &str, badges: &BadgeCollection) -> Value {
        let mut holders = Map::new();
        holders.insert(
            "@type".to_string(),
            Value::String(format!("{}/Badges", SEARCH_VOCAB)),
        );
        for (badge, ids) in badges.iter() {
            let refs = ids
                .iter()
                .map(|id| json!({ "@id": format!("{}{}", INSTANCE_IRI_PREFIX, id) }))
                .collect();
            holders.insert(badge.property(), Value::Array(refs));
        }
        let mut document = Map::new();
        document.insert(
            "@type".to_string(),
            Value::String(format!("{}/SearchAggregations", SEARCH_VOCAB)),
        );
        document.insert(BADGE_VOCAB.to_string(), Value::Object(holders));
        document.insert(
            format!("{}/vocab/forType", SEARCH_VOCAB),
            Value::String(target_type.to_string()),
        );
        Value::Object(document)
    }

    async fn expect_success(resp: reqwest::Response, what: &str) -> Result<()> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SyncError::graph(
            Some(status.as_u16()),
            format!("{} failed with status {}: {}", what, status, body),
        ))
    }
}

#[async_trait]
impl GraphQueryClient for HttpGraphClient {
    async fn execute_query(
        &self,
        query_id: &str,
        stage: Stage,
        from: u64,
        size: u64,
    ) -> Result<SourcePage> {
        let url = format!(
            "{}/queries/{}/instances?stage={}&from={}&size={}",
            self.base_url, query_id, stage, from, size
        );
        debug!(%url, "executing query");
        let resp = self
            .add_auth(self.http.get(&url))
            .send()
            .await
            .map_err(SyncError::from_graph)?;

        match resp.status().as_u16() {
            200 => {
                let page: SourcePage = resp.json().await.map_err(SyncError::from_graph)?;
                Ok(page)
            }
            status => Err(SyncError::graph(
                Some(status),
                format!("Unexpected status {} from {}", status, url),
            )),
        }
    }

    async fn upload_query(&self, query_id: &str, payload: &str) -> Result<()> {
        let url = format!("{}/queries/{}?space={}", self.base_url, query_id, self.space);
        let resp = self
            .add_auth(self.http.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(SyncError::from_graph)?;
        Self::expect_success(resp, &format!("Upload of query {}", query_id)).await
    }

    async fn publish_badges(&self, target_type: &str, badges: &BadgeCollection) -> Result<()> {
        let id = Self::badge_registration_id(target_type);
        let document = Self::badge_document(target_type, badges);

        let url = format!("{}/instances/{}", self.base_url, id);
        let resp = self
            .add_auth(self.http.put(&url))
            .json(&document)
            .send()
            .await
            .map_err(SyncError::from_graph)?;

        if resp.status().as_u16() == 404 {
            let create_url = format!("{}?space={}", url, self.space);
            let resp = self
                .add_auth(self.http.post(&create_url))
                .json(&document)
                .send()
                .await
                .map_err(SyncError::from_graph)?;
            Self::expect_success(resp, "Badge registration").await?;
        } else {
            Self::expect_success(resp, "Badge update").await?;
        }

        let release_url = format!("{}/release", url);
        let resp = self
            .add_auth(self.http.put(&release_url))
            .send()
            .await
            .map_err(SyncError::from_graph)?;
        Self::expect_success(resp, "Badge release").await
    }
}
