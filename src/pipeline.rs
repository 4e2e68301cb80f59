//! Command handlers shared by the CLI and the embedded UI.
//!
//! Fetching never touches a [`Session`](crate::table::Session); callers install
//! the returned [`Batch`] with `Session::replace` once it has settled. Overlapping
//! batches are not serialized: whichever is installed last wins.

use tracing::info;

use crate::client::ApiClient;
use crate::dispatcher;
use crate::error::PipelineError;
use crate::input;
use crate::types::{Batch, DisplayMode};

/// Query every IP in `raw` individually. Per-IP failures become error rows.
pub async fn run_query(client: &ApiClient, raw: &str) -> Result<Batch, PipelineError> {
    let ips = input::normalize(raw)?;
    info!(count = ips.len(), "running query batch");
    let records = dispatcher::dispatch_query(client, &ips).await;
    Ok(Batch {
        mode: DisplayMode::External,
        records,
    })
}

/// Submit every IP in `raw` for analysis in the given mode.
pub async fn run_analyze(
    client: &ApiClient,
    raw: &str,
    mode: DisplayMode,
) -> Result<Batch, PipelineError> {
    let ips = input::normalize(raw)?;
    info!(count = ips.len(), ?mode, "running analyze batch");
    let records = dispatcher::dispatch_analyze(client, &ips, mode).await?;
    Ok(Batch { mode, records })
}
