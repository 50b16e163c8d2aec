//! Errors from the query-service adaptor.
//!
//! Per spec.md §7, a failing sub-request degrades to an empty result
//! rather than failing the whole batch — these variants exist for
//! logging and for the single-request API, not for propagation out of
//! `batch_alarms`/`batch_logs`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
