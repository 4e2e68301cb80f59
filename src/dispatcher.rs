use std::collections::HashMap;
use std::future::Future;

use tokio::task::{self, JoinSet};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, PipelineError};
use crate::reconcile;
use crate::types::{AnalysisSummary, DisplayMode, InternalRecord, LookupRecord, STATUS_QUERIED};

/// Fetch `/query/{ip}` for every identifier concurrently and wait for all of them.
///
/// Results come back in input order, regardless of completion order. A failed
/// lookup never aborts the others; it is returned as `Err` in its own slot.
pub async fn fetch_details(
    client: &ApiClient,
    ips: &[String],
) -> Vec<Result<LookupRecord, ApiError>> {
    let lookups = ips.iter().map(|ip| {
        let client = client.clone();
        let ip = ip.clone();
        async move { client.query(&ip).await }
    });
    settle_in_order(lookups).await
}

/// Spawn every future, wait for all of them and return outcomes in spawn order.
///
/// A task that panics or is cancelled yields `ApiError::TaskFailed` in its slot.
async fn settle_in_order<T, F, I>(futures: I) -> Vec<Result<T, ApiError>>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    I: IntoIterator<Item = F>,
{
    let mut set = JoinSet::new();
    let mut slot_of: HashMap<task::Id, usize> = HashMap::new();
    for (idx, fut) in futures.into_iter().enumerate() {
        let handle = set.spawn(async move { (idx, fut.await) });
        slot_of.insert(handle.id(), idx);
    }

    let mut slots: Vec<Option<Result<T, ApiError>>> =
        std::iter::repeat_with(|| None).take(slot_of.len()).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => {
                warn!("lookup task failed to complete: {e}");
                if let Some(&idx) = slot_of.get(&e.id()) {
                    slots[idx] = Some(Err(ApiError::TaskFailed(e.to_string())));
                }
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(ApiError::TaskFailed("task did not complete".into())))
        })
        .collect()
}

/// Query mode: one record per identifier, in input order.
///
/// Successful lookups get the `Consultado` status; failures become error rows
/// carrying the requested IP.
pub async fn dispatch_query(client: &ApiClient, ips: &[String]) -> Vec<LookupRecord> {
    let outcomes = fetch_details(client, ips).await;
    let mut failed = 0usize;
    let mut rejected = 0usize;
    let records: Vec<LookupRecord> = ips
        .iter()
        .zip(outcomes)
        .map(|(ip, outcome)| match outcome {
            Ok(mut record) => {
                if record.ip.is_empty() {
                    record.ip = ip.clone();
                }
                record.status = STATUS_QUERIED.to_string();
                record
            }
            Err(e) => {
                failed += 1;
                if e.is_unauthorized() {
                    rejected += 1;
                }
                warn!(%ip, "query failed: {e}");
                LookupRecord::failed(ip.clone(), &e)
            }
        })
        .collect();
    if rejected > 0 {
        warn!(rejected, "API key was rejected; check the configured key");
    }
    info!(total = records.len(), failed, "query batch settled");
    records
}

/// Analyze mode: one batched request, then mode-specific reconciliation.
///
/// A failing analyze call aborts the whole batch with `BatchFailed`.
pub async fn dispatch_analyze(
    client: &ApiClient,
    ips: &[String],
    mode: DisplayMode,
) -> Result<Vec<LookupRecord>, PipelineError> {
    let records = match mode {
        DisplayMode::External => {
            let summary = client.analyze(ips).await.map_err(batch_error)?.analysis_summary;
            analyze_external(client, ips, summary).await
        }
        DisplayMode::Internal => {
            let internal: Vec<InternalRecord> =
                client.analyze_internal(ips).await.map_err(batch_error)?;
            reconcile::reconcile_internal(ips, internal)
        }
    };
    info!(total = records.len(), ?mode, "analyze batch settled");
    Ok(records)
}

async fn analyze_external(
    client: &ApiClient,
    ips: &[String],
    summary: Vec<AnalysisSummary>,
) -> Vec<LookupRecord> {
    let summary = reconcile::align_summary(ips, summary);
    let wanted: Vec<String> = summary
        .iter()
        .filter_map(|s| s.as_ref().map(|s| s.ip.clone()))
        .collect();
    let details = fetch_details(client, &wanted).await;
    reconcile::merge_external(ips, summary, details)
}

fn batch_error(e: ApiError) -> PipelineError {
    match e {
        ApiError::Decode(msg) => PipelineError::Unexpected(msg),
        other => PipelineError::BatchFailed(other.to_string()),
    }
}
