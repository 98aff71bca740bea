use thiserror::Error;

use crate::models::Backend;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{table} '{value}' is not in the weight table")]
    Lookup { table: WeightTable, value: String },
    #[error("required field '{field}' is missing")]
    FieldAbsent { field: &'static str },
    #[error("could not parse timestamp '{value}'")]
    Timestamp { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightTable {
    Severity,
    Priority,
}

impl std::fmt::Display for WeightTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightTable::Severity => write!(f, "severity"),
            WeightTable::Priority => write!(f, "priority"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{backend:?} request failed: {source}")]
    Http {
        backend: Backend,
        #[source]
        source: reqwest::Error,
    },
    #[error("{backend:?} returned status {status}")]
    Status {
        backend: Backend,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {backend:?} snapshot {path}: {source}")]
    Snapshot {
        backend: Backend,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {backend:?} snapshot {path}: {source}")]
    Decode {
        backend: Backend,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
