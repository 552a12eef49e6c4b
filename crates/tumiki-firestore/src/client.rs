use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tumiki_storage::{Document, DocumentStore, FieldFilter, Record, StorageError, StorageResult};

use crate::codec::{WireDocument, decode_document, encode, encode_fields};
use crate::config::FirestoreConfig;
use crate::retry::with_retry;
use crate::token::AccessTokenProvider;

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<WireDocument>,
}

/// Firestore REST API client.
///
/// Every call gets a bearer token from the configured
/// [`AccessTokenProvider`], runs under the configured request timeout and is
/// retried on transient failures.
#[derive(Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    config: FirestoreConfig,
    documents_root: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("documents_root", &self.documents_root)
            .finish_non_exhaustive()
    }
}

impl FirestoreClient {
    pub fn new(config: FirestoreConfig, tokens: Arc<dyn AccessTokenProvider>) -> StorageResult<Self> {
        if config.project_id.trim().is_empty() {
            return Err(StorageError::configuration("Firestore project id is empty"));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::configuration(format!("failed to build HTTP client: {e}")))?;
        let documents_root = config.documents_root();
        Ok(Self {
            http,
            config,
            documents_root,
            tokens,
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_root,
            urlencoding::encode(collection),
            urlencoding::encode(id)
        )
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Success statuses are returned as-is; so is 404 when `allow_not_found`
    /// is set. Every other status becomes [`StorageError::Backend`].
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        url: &str,
        body: Option<&Value>,
        allow_not_found: bool,
    ) -> StorageResult<reqwest::Response> {
        with_retry(&self.config.retry, operation, || {
            let method = method.clone();
            async move {
                let token = self.tokens.access_token().await?;
                let mut request = self.http.request(method, url).bearer_auth(token);
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request.send().await.map_err(map_transport_error)?;

                let status = response.status();
                if status.is_success() || (allow_not_found && status == StatusCode::NOT_FOUND) {
                    return Ok(response);
                }
                if status == StatusCode::UNAUTHORIZED {
                    self.tokens.invalidate().await;
                }
                let message = response.text().await.unwrap_or_default();
                let err = StorageError::backend(status.as_u16(), message);
                tracing::warn!(
                    operation,
                    status = status.as_u16(),
                    category = %err.category(),
                    "document store request failed"
                );
                Err(err)
            }
        })
        .await
    }

    fn structured_query(collection: &str, filters: &[FieldFilter]) -> Value {
        let field_filter = |f: &FieldFilter| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": f.field },
                    "op": "EQUAL",
                    "value": encode(&f.value),
                }
            })
        };

        let mut query = json!({ "from": [{ "collectionId": collection }] });
        match filters {
            [] => {}
            [single] => {
                query["where"] = field_filter(single);
            }
            many => {
                query["where"] = json!({
                    "compositeFilter": {
                        "op": "AND",
                        "filters": many.iter().map(field_filter).collect::<Vec<_>>(),
                    }
                });
            }
        }
        json!({ "structuredQuery": query })
    }
}

fn map_transport_error(err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::timeout(err.to_string())
    } else if err.is_decode() {
        StorageError::serialization(err.to_string())
    } else {
        StorageError::connection(err.to_string())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> StorageResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::serialization(format!("unexpected document store response: {e}")))
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let url = self.document_url(collection, id);
        let response = self.send("get_document", Method::GET, &url, None, true).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(collection, id, "document not found");
            return Ok(None);
        }
        let doc: WireDocument = read_json(response).await?;
        Ok(Some(decode_document(&doc)))
    }

    async fn query_collection(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> StorageResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_root);
        let body = Self::structured_query(collection, filters);
        let response = self
            .send("query_collection", Method::POST, &url, Some(&body), false)
            .await?;
        let items: Vec<RunQueryItem> = read_json(response).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| decode_document(&doc))
            .collect())
    }

    async fn upsert_document(&self, collection: &str, id: &str, fields: Record) -> StorageResult<()> {
        let url = self.document_url(collection, id);
        let body = json!({ "fields": encode_fields(&fields) });
        self.send("upsert_document", Method::PATCH, &url, Some(&body), false)
            .await?;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StorageResult<()> {
        let url = self.document_url(collection, id);
        let response = self
            .send("delete_document", Method::DELETE, &url, None, true)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(collection, id, "delete of missing document ignored");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}
