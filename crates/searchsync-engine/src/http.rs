//! HTTP implementation of the search engine interface.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::bulk::{encode_body, BulkAction, BulkResponse};
use crate::error::EngineError;

/// One action within an atomic alias update.
///
/// The engine applies the whole action list atomically, which is what
/// makes the reindex cutover safe: readers see either the old binding or
/// the new one, never an alias bound to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    /// Bind `alias` to `index`.
    Add {
        /// Physical index name.
        index: String,
        /// Alias name.
        alias: String,
    },
    /// Unbind `alias` from `index`.
    Remove {
        /// Physical index name.
        index: String,
        /// Alias name.
        alias: String,
    },
}

/// Search engine operations the pipeline depends on.
///
/// Implemented over HTTP for real deployments; tests supply in-memory
/// mocks.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Submit a bulk request against `index` and return the raw response.
    ///
    /// Callers must not invoke this with an empty action list.
    async fn bulk(&self, index: &str, actions: &[BulkAction]) -> Result<BulkResponse, EngineError>;

    /// Create a new physical index.
    async fn create_index(&self, name: &str) -> Result<(), EngineError>;

    /// Delete a physical index.
    async fn delete_index(&self, name: &str) -> Result<(), EngineError>;

    /// Physical indices currently bound to `alias` (empty when the alias
    /// does not exist yet).
    async fn alias_indices(&self, alias: &str) -> Result<Vec<String>, EngineError>;

    /// Apply a list of alias actions atomically.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError>;

    /// Every physical index with the aliases bound to it.
    async fn all_aliases(&self) -> Result<HashMap<String, Vec<String>>, EngineError>;
}

/// Connection settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine base URL (e.g. "http://localhost:9200").
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl EngineConfig {
    /// Create a config for the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Elasticsearch-compatible REST client.
pub struct HttpSearchEngine {
    client: Client,
    base_url: String,
}

impl HttpSearchEngine {
    /// Create a new client from connection settings.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Surface non-success statuses as [`EngineError::Status`].
    async fn check(response: Response) -> Result<Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(EngineError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchEngine for HttpSearchEngine {
    async fn bulk(&self, index: &str, actions: &[BulkAction]) -> Result<BulkResponse, EngineError> {
        let body = encode_body(actions);
        debug!(index = %index, actions = actions.len(), "Submitting bulk request");

        let response = self
            .client
            .post(self.url(&format!("{}/_bulk", index)))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn create_index(&self, name: &str) -> Result<(), EngineError> {
        let response = self.client.put(self.url(name)).send().await?;
        Self::check(response).await?;
        debug!(index = %name, "Created index");
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), EngineError> {
        let response = self.client.delete(self.url(name)).send().await?;
        Self::check(response).await?;
        debug!(index = %name, "Deleted index");
        Ok(())
    }

    async fn alias_indices(&self, alias: &str) -> Result<Vec<String>, EngineError> {
        let response = self
            .client
            .get(self.url(&format!("_alias/{}", alias)))
            .send()
            .await?;

        // A missing alias is a normal pre-first-reindex condition.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response = Self::check(response).await?;
        let bindings: HashMap<String, serde_json::Value> = response.json().await?;
        Ok(bindings.into_keys().collect())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
        let response = self
            .client
            .post(self.url("_aliases"))
            .json(&json!({ "actions": actions }))
            .send()
            .await?;
        Self::check(response).await?;
        debug!(actions = actions.len(), "Applied alias actions");
        Ok(())
    }

    async fn all_aliases(&self) -> Result<HashMap<String, Vec<String>>, EngineError> {
        let response = self.client.get(self.url("_alias")).send().await?;
        let response = Self::check(response).await?;

        let bindings: HashMap<String, AliasEntry> = response.json().await?;
        Ok(bindings
            .into_iter()
            .map(|(index, entry)| (index, entry.aliases.into_keys().collect()))
            .collect())
    }
}

#[derive(Debug, serde::Deserialize)]
struct AliasEntry {
    #[serde(default)]
    aliases: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_action_wire_shape() {
        let actions = vec![
            AliasAction::Remove {
                index: "products_20240101000000000".to_string(),
                alias: "products".to_string(),
            },
            AliasAction::Add {
                index: "products_20240201000000000".to_string(),
                alias: "products".to_string(),
            },
        ];

        let encoded = serde_json::to_value(&actions).unwrap();
        assert_eq!(
            encoded,
            json!([
                {"remove": {"index": "products_20240101000000000", "alias": "products"}},
                {"add": {"index": "products_20240201000000000", "alias": "products"}}
            ])
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let engine =
            HttpSearchEngine::new(EngineConfig::new("http://localhost:9200/")).unwrap();
        assert_eq!(engine.url("_aliases"), "http://localhost:9200/_aliases");
    }

    #[test]
    fn test_alias_entry_parsing() {
        let raw = r#"{
            "products_20240101000000000": {"aliases": {"products": {}}},
            "orphan_20230101000000000": {"aliases": {}}
        }"#;
        let bindings: HashMap<String, AliasEntry> = serde_json::from_str(raw).unwrap();

        assert_eq!(
            bindings["products_20240101000000000"]
                .aliases
                .keys()
                .collect::<Vec<_>>(),
            vec!["products"]
        );
        assert!(bindings["orphan_20230101000000000"].aliases.is_empty());
    }
}
