//! REST document resolver.
//!
//! Resolving a document takes two calls against the backend:
//!
//! 1. `GET /rest/v1/{table}?id=eq.{id}&select=id,updated_at,file_path`
//! 2. `POST /storage/v1/object/sign/{bucket}/{file_path}` with `{"expiresIn": secs}`
//!
//! Any failure along the way becomes a `ResolveError`; nothing panics and
//! nothing is retried here. The sync coordinator decides what a failure means.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tour_common::RemoteConfig;
use tour_core::{DocumentId, DocumentMetadata, DocumentResolver, ResolveError};

use crate::error::{normalize_base_url, RemoteResult};

/// Columns read from the documents table
const SELECT_COLUMNS: &str = "id,updated_at,file_path";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct DocumentRow {
    updated_at: DateTime<Utc>,
    file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Resolves document metadata through the backend's REST and storage APIs
#[derive(Debug, Clone)]
pub struct RestDocumentResolver {
    client: Client,
    base_url: String,
    api_key: String,
    /// User session token; the anon key is used when absent
    access_token: Option<String>,
    table: String,
    bucket: String,
    expires_in: u64,
}

impl RestDocumentResolver {
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(client, config)
    }

    /// Build on an existing HTTP client
    pub fn with_client(client: Client, config: &RemoteConfig) -> RemoteResult<Self> {
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.url)?,
            api_key: config.api_key.clone(),
            access_token: None,
            table: config.documents_table.clone(),
            bucket: config.documents_bucket.clone(),
            expires_in: config.signed_url_expiry_secs,
        })
    }

    /// Authenticate requests as a signed-in user
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn row_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Signing endpoint of one storage object; path segments are percent-encoded
    fn sign_url(&self, file_path: &str) -> Result<Url, ResolveError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ResolveError::Signing(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ResolveError::Signing(format!("cannot sign under {}", self.base_url)))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", "sign", self.bucket.as_str()])
            .extend(file_path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// The storage API answers with a path relative to `/storage/v1`
    fn absolute_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_string();
        }
        format!(
            "{}/storage/v1/{}",
            self.base_url,
            signed.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn fetch_row(&self, id: &DocumentId) -> Result<DocumentRow, ResolveError> {
        let response = self
            .authorized(self.client.get(self.row_url()))
            .query(&[("id", format!("eq.{id}")), ("select", SELECT_COLUMNS.to_string())])
            .send()
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound);
        }
        if !status.is_success() {
            return Err(ResolveError::Lookup(format!("backend returned {status}")));
        }

        let rows: Vec<DocumentRow> = response
            .json()
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;
        rows.into_iter().next().ok_or(ResolveError::NotFound)
    }

    async fn sign(&self, file_path: &str) -> Result<String, ResolveError> {
        let response = self
            .authorized(self.client.post(self.sign_url(file_path)?))
            .json(&SignRequest {
                expires_in: self.expires_in,
            })
            .send()
            .await
            .map_err(|e| ResolveError::Signing(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Signing(format!("storage returned {status}")));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Signing(e.to_string()))?;
        Ok(self.absolute_url(&body.signed_url))
    }
}

#[async_trait]
impl DocumentResolver for RestDocumentResolver {
    #[tracing::instrument(skip(self), fields(document_id = %id))]
    async fn resolve(&self, id: &DocumentId) -> Result<DocumentMetadata, ResolveError> {
        let row = self.fetch_row(id).await?;
        let url = self.sign(&row.file_path).await?;

        tracing::debug!(updated_at = %row.updated_at, "Resolved document metadata");
        Ok(DocumentMetadata::new(row.updated_at, url))
    }
}
