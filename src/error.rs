use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::StoreName;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum LookoutError {
    #[error("{store} dependency failed during {operation}: {message}")]
    Dependency {
        store: StoreName,
        operation: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Logging(String),
}

impl LookoutError {
    /// Wrap a store failure that the caller must see, e.g. a canonical lookup fault.
    pub fn dependency(store: StoreName, operation: impl Into<String>, err: &StoreError) -> Self {
        LookoutError::Dependency {
            store,
            operation: operation.into(),
            message: err.to_string(),
        }
    }
}

impl From<crate::config::ConfigError> for LookoutError {
    fn from(err: crate::config::ConfigError) -> Self {
        LookoutError::Config(err.to_string())
    }
}

/// Failure reported by a store adapter.
///
/// Adapters own their timeouts and retries; by the time an error reaches the
/// core it is final for this request.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),
}
