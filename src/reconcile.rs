//! Joins analyze responses back onto the submitted identifier list.
//!
//! Every submitted IP yields exactly one record, in submission order. Response
//! entries are matched by `ip`; repeated IPs are matched first-come first-served,
//! and entries for IPs that were never submitted are dropped.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{
    error_status, AnalysisSummary, InternalRecord, LookupRecord, STATUS_INTERNAL_DEFAULT,
};

/// Status used when the API response has no entry for a submitted IP.
pub const MISSING_FROM_RESULT: &str = "missing from analysis result";

/// Reorder `items` to follow `ips`, leaving `None` where nothing matched.
fn align_by_ip<T>(ips: &[String], items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<Option<T>> {
    let mut by_ip: HashMap<String, VecDeque<T>> = HashMap::new();
    for item in items {
        by_ip.entry(key(&item).to_string()).or_default().push_back(item);
    }

    let aligned: Vec<Option<T>> = ips
        .iter()
        .map(|ip| by_ip.get_mut(ip).and_then(VecDeque::pop_front))
        .collect();

    let extra: usize = by_ip.values().map(VecDeque::len).sum();
    if extra > 0 {
        warn!(extra, "response contained entries for IPs that were not submitted");
    }
    aligned
}

/// Align the external analysis summary with the submitted IPs.
pub fn align_summary(
    ips: &[String],
    summary: Vec<AnalysisSummary>,
) -> Vec<Option<AnalysisSummary>> {
    align_by_ip(ips, summary, |s| s.ip.as_str())
}

/// Merge aligned summaries with their detail lookups.
///
/// `details` holds one outcome per `Some` entry of `summary`, in the same order.
/// A successful detail keeps its fields and takes the summary's status. A failed
/// detail keeps the summary status and appends the failure.
pub fn merge_external(
    ips: &[String],
    summary: Vec<Option<AnalysisSummary>>,
    details: Vec<Result<LookupRecord, ApiError>>,
) -> Vec<LookupRecord> {
    let mut details = details.into_iter();
    ips.iter()
        .zip(summary)
        .map(|(ip, entry)| {
            let Some(entry) = entry else {
                return LookupRecord::failed(ip.clone(), MISSING_FROM_RESULT);
            };
            if let Some(msg) = &entry.message {
                debug!(ip = %entry.ip, status = %entry.status, "{msg}");
            }
            match details.next() {
                Some(Ok(detail)) => merge_one(&entry, detail),
                Some(Err(e)) => {
                    warn!(ip = %entry.ip, "detail lookup failed: {e}");
                    LookupRecord {
                        ip: entry.ip.clone(),
                        status: format!("{} | {}", entry.status, error_status(&e)),
                        ..Default::default()
                    }
                }
                None => LookupRecord::failed(entry.ip.clone(), "detail lookup missing"),
            }
        })
        .collect()
}

fn merge_one(summary: &AnalysisSummary, mut detail: LookupRecord) -> LookupRecord {
    if detail.ip.is_empty() {
        detail.ip = summary.ip.clone();
    }
    detail.status = summary.status.clone();
    detail
}

/// Convert the internal analysis payload into records aligned with `ips`.
pub fn reconcile_internal(ips: &[String], records: Vec<InternalRecord>) -> Vec<LookupRecord> {
    align_by_ip(ips, records, |r| r.ip.as_str())
        .into_iter()
        .zip(ips)
        .map(|(entry, ip)| match entry {
            Some(r) => LookupRecord {
                ip: r.ip,
                open_ports_details: r.open_ports_details,
                security_recommendations: r.security_recommendations,
                status: r
                    .status
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| STATUS_INTERNAL_DEFAULT.to_string()),
                ..Default::default()
            },
            None => LookupRecord::failed(ip.clone(), MISSING_FROM_RESULT),
        })
        .collect()
}
