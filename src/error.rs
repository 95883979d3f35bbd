use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid project URL: {0}")]
    InvalidUrl(String),
    #[error("question pagination stopped at {received} of {total} items")]
    ShortPagination { received: usize, total: usize },
    #[error("question {question_id} has a cyclic mapping: {}", chain.join(" -> "))]
    CyclicMapping {
        question_id: String,
        chain: Vec<String>,
    },
    #[error("checkpoint {} has columns {found:?}, expected {expected:?}", path.display())]
    CheckpointSchema {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("checkpoint row {key} has {found} columns, expected {expected}")]
    RowWidth {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("checkpoint {} is closed", path.display())]
    CheckpointClosed { path: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            HarvestError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            HarvestError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
