//! HTTP record store speaking the hosted service's PostgREST dialect.
//!
//! Reads and writes only; the service's realtime transport is not spoken here,
//! so pair this store with [`DetachedFeed`](crate::services::record_store::DetachedFeed).

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::{debug, warn};

use crate::services::record_store::RecordStore;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StoreError;
use crate::types::settings::StoreSettings;

/// Record store client for `<base_url>/rest/v1/<table>`.
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    access_token: RwLock<Option<String>>,
}

impl RestRecordStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
            access_token: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self::new(&settings.base_url, &settings.api_key, &settings.table)
    }

    fn table_url(&self) -> Result<Url, StoreError> {
        let raw = format!("{}/rest/v1/{}", self.base_url, self.table);
        Url::parse(&raw).map_err(|e| StoreError::Transport(format!("invalid url '{}': {}", raw, e)))
    }

    /// `GET` target listing one owner's rows newest first.
    pub fn query_url(&self, owner_id: &str) -> Result<Url, StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", owner_id))
            .append_pair("order", "created_at.desc");
        Ok(url)
    }

    /// `DELETE` target for a single row.
    pub fn delete_url(&self, id: &str) -> Result<Url, StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        Ok(url)
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let bearer = self
            .access_token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .unwrap_or_else(|| self.api_key.clone());

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| StoreError::Transport(format!("invalid api key header: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|e| StoreError::Transport(format!("invalid bearer header: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "Record store rejected request");
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let url = self.query_url(owner_id)?;
        debug!(%url, "Querying bookmarks");
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<Vec<Bookmark>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn insert(&self, fields: &NewBookmark) -> Result<Bookmark, StoreError> {
        let url = self.table_url()?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&[fields]);
        let response = self.send(request).await?;
        let mut rows = response
            .json::<Vec<Bookmark>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::Decode("insert returned no rows".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let url = self.delete_url(id)?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    /// Without a user token the bearer falls back to the api key.
    fn authorize(&self, access_token: Option<&str>) {
        let token = access_token.map(String::from);
        debug!(user_token = token.is_some(), "Updating record store authorization");
        match self.access_token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}
