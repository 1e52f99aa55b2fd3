/**
 * Responsibility
 * - meaning of store failures as seen by the executor and handlers
 */
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),
    #[error("duplicate value for a unique field in {0}")]
    Duplicate(&'static str),
    #[error("unsupported store operation: {0}")]
    Unsupported(&'static str),
}

pub type RepoResult<T> = Result<T, RepoError>;
