use serde::{Deserialize, Serialize};

/// Status written on rows produced by a successful `/query/{ip}` lookup.
pub const STATUS_QUERIED: &str = "Consultado";

/// Status given to internal-analysis records that arrive without one.
pub const STATUS_INTERNAL_DEFAULT: &str = "analyzed (internal)";

/// Prefix of every locally produced error status.
pub const ERROR_PREFIX: &str = "Erro";

/// Build the status string for a row whose lookup failed.
pub fn error_status(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}: {message}")
}

/// One risk entry attached to an internally analyzed host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecurityRecommendation {
    pub risk: String,
    pub details: String,
}

/// The reconciled per-IP row used for display and export.
///
/// The field set is the union of what external and internal analysis return;
/// which of them are shown depends on [`DisplayMode`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LookupRecord {
    #[serde(default, alias = "IP")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Either a comma separated string or a JSON list, depending on the API version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_ports: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abuse_score: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_ports_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_recommendations: Option<Vec<SecurityRecommendation>>,
    #[serde(default)]
    pub status: String,
}

impl LookupRecord {
    /// A row carrying only the IP and an error status; every other field is absent.
    pub fn failed(ip: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            ip: ip.into(),
            status: error_status(message),
            ..Default::default()
        }
    }
}

/// Which column set is active for the current result set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    External,
    Internal,
}

/// Request body of `POST /analyze` and `POST /analyze/internal`.
#[derive(Serialize, Debug, Clone)]
pub struct AnalyzeRequest<'a> {
    pub ips: &'a [String],
}

/// One entry of the external analysis summary.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    #[serde(alias = "IP")]
    pub ip: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Success body of `POST /analyze`.
#[derive(Deserialize, Debug, Clone)]
pub struct AnalyzeResponse {
    pub analysis_summary: Vec<AnalysisSummary>,
}

/// One entry of the `POST /analyze/internal` success body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InternalRecord {
    pub ip: String,
    #[serde(default)]
    pub open_ports_details: Option<String>,
    /// `null` and absent both decode to `None`.
    #[serde(default)]
    pub security_recommendations: Option<Vec<SecurityRecommendation>>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorBody {
    pub error: String,
}

/// A completed batch: the records to display and the mode they were fetched in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Batch {
    pub mode: DisplayMode,
    pub records: Vec<LookupRecord>,
}
