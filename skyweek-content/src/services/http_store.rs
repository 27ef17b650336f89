//! REST document store client
//!
//! Speaks the PostgREST dialect: equality filters as `field=eq.value`
//! query parameters, upserts as POST with `on_conflict` and
//! `Prefer: resolution=merge-duplicates`.

use super::store_client::{Collection, Document, DocumentStore, Filter, StoreError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("skyweek-content/", env!("CARGO_PKG_VERSION"));

/// HTTP document store client
pub struct HttpDocumentStore {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.name())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn read_documents(response: reqwest::Response) -> Result<Vec<Document>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Vec<Document>>()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }
}

/// Query parameters for an equality filter
pub fn filter_query(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|(field, value)| (field.clone(), format!("eq.{}", value)))
        .collect()
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        debug!(url = %url, filter = ?filter, "Querying document store");

        let response = self
            .authorized(self.http_client.get(&url))
            .query(&[("select", "*")])
            .query(&filter_query(filter))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::read_documents(response).await
    }

    async fn upsert(
        &self,
        collection: Collection,
        record: Document,
        conflict_key: &[&str],
    ) -> Result<Document, StoreError> {
        let url = self.collection_url(collection);
        debug!(url = %url, on_conflict = %conflict_key.join(","), "Upserting document");

        let response = self
            .authorized(self.http_client.post(&url))
            .query(&[("on_conflict", conflict_key.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[record])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::read_documents(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Parse("upsert returned no representation".to_string()))
    }
}
