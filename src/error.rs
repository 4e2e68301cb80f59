use thiserror::Error;

/// Failure of a single call to the remote API.
///
/// `Display` yields the bare message, which is what ends up in a row's status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("lookup task failed: {0}")]
    TaskFailed(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Remote { status: 401, .. })
    }
}

/// Failure of a whole command (query, analyze, sort, export).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("enter at least one IP address")]
    EmptyInput,

    #[error("analysis failed: {0}")]
    BatchFailed(String),

    #[error("unknown column for the current view: {0}")]
    UnknownColumn(String),

    #[error("no results to export")]
    NothingToExport,

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}
