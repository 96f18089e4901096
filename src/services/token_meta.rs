//! Token metadata lookups against Helius `getAssetBatch`.

use crate::error::ApiError;
use crate::fetch::{BatchRunner, FailureInfo, IdChunk, aggregate, chunk_ids};
use crate::models::{FailureDetail, TokenMetadataResponse};
use crate::upstream::HeliusClient;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

const REQUEST_ID: &str = "investAssist";

/// Extracts the asset identifiers from a request body.
///
/// `ids` may be a single string or an array of strings. Validation happens
/// before any upstream call.
///
/// # Errors
/// Returns [`ApiError::InvalidRequest`] with the message for the first rule
/// the body breaks.
pub fn parse_ids(body: &Value) -> Result<Vec<String>, ApiError> {
    let ids = match body.get("ids") {
        None | Some(Value::Null) => {
            return Err(ApiError::InvalidRequest(
                "Token IDs array is required".to_string(),
            ));
        }
        Some(Value::String(id)) => vec![id.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(|id| id.trim().to_string()))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| {
                ApiError::InvalidRequest("All token IDs must be strings".to_string())
            })?,
        Some(_) => {
            return Err(ApiError::InvalidRequest(
                "All token IDs must be strings".to_string(),
            ));
        }
    };

    if ids.is_empty() || ids.iter().any(String::is_empty) {
        return Err(ApiError::InvalidRequest(
            "At least one token ID is required".to_string(),
        ));
    }
    Ok(ids)
}

/// Fetches asset metadata in chunks with bounded concurrency.
#[derive(Debug, Clone)]
pub struct TokenMetaService {
    client: HeliusClient,
    runner: BatchRunner,
    chunk_size: usize,
}

impl TokenMetaService {
    /// Creates the service.
    #[must_use]
    pub fn new(client: HeliusClient, runner: BatchRunner, chunk_size: usize) -> Self {
        Self {
            client,
            runner,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Fetches metadata for `ids`, concatenating chunk results in input order.
    ///
    /// # Errors
    /// Returns [`ApiError::AggregateFailure`] when every chunk failed.
    pub async fn fetch(&self, ids: &[String]) -> Result<TokenMetadataResponse, ApiError> {
        let batch_id = Uuid::new_v4();
        let span = info_span!("token_meta", %batch_id, ids = ids.len());
        self.fetch_chunks(ids).instrument(span).await
    }

    async fn fetch_chunks(&self, ids: &[String]) -> Result<TokenMetadataResponse, ApiError> {
        let chunks = chunk_ids(ids, self.chunk_size);
        let chunk_count = chunks.len();
        info!(chunks = chunk_count, "fetching token metadata");

        let client = &self.client;
        let result = self
            .runner
            .run(chunks, |chunk: IdChunk| async move {
                let request_id = format!("{REQUEST_ID}-{}", chunk.ordinal);
                client.get_asset_batch(&request_id, &chunk.ids).await
            })
            .await;

        let report = aggregate(result);
        let failures: Vec<FailureDetail> = report
            .failed
            .iter()
            .cloned()
            .map(|info| self.chunk_failure(info, ids))
            .collect();

        if report.is_complete_failure {
            warn!(chunks = chunk_count, "every chunk failed");
            return Err(ApiError::AggregateFailure {
                message: format!("Failed to fetch token metadata: all {chunk_count} chunks failed"),
                failures,
            });
        }

        let partial = report.is_partial_failure;
        if partial {
            warn!(
                failed = failures.len(),
                chunks = chunk_count,
                "some chunks failed"
            );
        }

        let result: Vec<Value> = report.into_values().into_iter().flatten().collect();
        info!(
            chunks_ok = chunk_count - failures.len(),
            chunks = chunk_count,
            results = result.len(),
            "token metadata fetched"
        );

        Ok(TokenMetadataResponse {
            jsonrpc: "2.0".to_string(),
            id: REQUEST_ID.to_string(),
            result,
            partial,
            failures,
        })
    }

    /// Failure detail naming the identifiers the chunk at `info.index` carried.
    fn chunk_failure(&self, info: FailureInfo, ids: &[String]) -> FailureDetail {
        let start = info.index.saturating_mul(self.chunk_size).min(ids.len());
        let end = start.saturating_add(self.chunk_size).min(ids.len());
        FailureDetail {
            offset: Some(start),
            ids: ids[start..end].to_vec(),
            ..FailureDetail::from(info)
        }
    }
}

#[cfg(test)]
mod tests;
