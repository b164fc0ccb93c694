//! Upstream Indexer Client
//!
//! Pending transactions are not in the database; the node-side indexer
//! serves them over HTTP. Every response uses the envelope
//! `{"result": ..., "error": {"message", "userMessage"}, "continuationToken"}`.
//! A `null` result for a single record means it does not exist.

use async_trait::async_trait;
use ledgerline_core::{
    ConfigError, LedgerError, LedgerResult, MemPool, RawTransaction, TransactionDetail,
    TransactionSummary, UpstreamError, ValidationError,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ApiConfig;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexerEnvelope<T> {
    result: Option<T>,
    error: Option<IndexerErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexerErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    user_message: Option<String>,
}

impl IndexerErrorBody {
    fn describe(self) -> String {
        match self.user_message {
            Some(user) if !user.is_empty() => user,
            _ => self.message,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// HTTP client for the indexer's mempool endpoints.
#[derive(Clone)]
pub struct IndexerClient {
    client: reqwest::Client,
    base: Url,
    base_url: String,
}

impl IndexerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "LEDGERLINE_INDEXER_URL".to_string(),
            value: base_url.to_string(),
            reason,
        };

        let trimmed = base_url.trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            base,
            base_url: trimmed.to_string(),
        })
    }

    /// Client for the configured indexer, if any.
    pub fn from_config(config: &ApiConfig) -> Result<Option<Self>, ConfigError> {
        config
            .indexer_url
            .as_deref()
            .map(|url| Self::new(url, config.indexer_timeout))
            .transpose()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/seg/seg/...`, each segment percent-encoded on its own so
    /// caller input can never add path levels or a query.
    fn endpoint(&self, segments: &[&str]) -> LedgerResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::RequestFailed {
                url: self.base_url.clone(),
                reason: "base URL cannot take a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url` and unwrap the envelope.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> LedgerResult<Option<T>> {
        let result = self.fetch(url).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Unable to load indexer data");
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> LedgerResult<Option<T>> {
        let shown = url.to_string();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::RequestFailed {
                url: shown.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::BadStatus {
                url: shown,
                status: status.as_u16(),
            }
            .into());
        }

        let envelope: IndexerEnvelope<T> =
            response
                .json()
                .await
                .map_err(|e| UpstreamError::InvalidResponse {
                    url: shown.clone(),
                    reason: e.to_string(),
                })?;

        if let Some(error) = envelope.error {
            return Err(UpstreamError::ErrorResponse {
                url: shown,
                message: error.describe(),
            }
            .into());
        }

        Ok(envelope.result)
    }
}

/// A caller-supplied path segment. Dot segments would be dropped by URL
/// normalization, so they are refused rather than silently rewritten.
fn segment<'a>(field: &str, value: &'a str) -> LedgerResult<&'a str> {
    if matches!(value, "" | "." | "..") {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "not a valid path segment".to_string(),
        }
        .into());
    }
    Ok(value)
}

fn with_limit(mut url: Url, count: u64) -> Url {
    url.query_pairs_mut().append_pair("limit", &count.to_string());
    url
}

impl std::fmt::Debug for IndexerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl MemPool for IndexerClient {
    async fn transaction(&self, hash: &str) -> LedgerResult<TransactionDetail> {
        let url = self.endpoint(&["api", "MemPool", "Transaction", segment("hash", hash)?])?;
        self.get(url).await?.ok_or_else(LedgerError::not_found)
    }

    async fn transaction_raw(&self, hash: &str) -> LedgerResult<RawTransaction> {
        let url = self.endpoint(&[
            "api",
            "MemPool",
            "Transaction",
            segment("hash", hash)?,
            "Raw",
        ])?;
        self.get(url).await?.ok_or_else(LedgerError::not_found)
    }

    async fn address_transactions(
        &self,
        address: &str,
        count: u64,
    ) -> LedgerResult<Vec<TransactionSummary>> {
        let url = self.endpoint(&[
            "api",
            "MemPool",
            "Address",
            segment("address", address)?,
            "Transactions",
        ])?;
        let txs = self.get(with_limit(url, count)).await?;
        Ok(txs.unwrap_or_default())
    }

    async fn transactions(&self, count: u64) -> LedgerResult<Vec<TransactionSummary>> {
        let url = self.endpoint(&["api", "MemPool", "Transactions"])?;
        let txs = self.get(with_limit(url, count)).await?;
        Ok(txs.unwrap_or_default())
    }
}
