//! Error types.
//!
//! `StoreError` covers failures talking to the log store; those abort the
//! request. `SkipReason` classifies a single record that could not be used
//! by a reducer; those are logged and the record is dropped.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading from a log store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A collection file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// The backend answered with something we could not decode.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// The store is not configured well enough to connect.
    #[error("store configuration error: {0}")]
    Config(String),
}

/// Why a record was left out of an aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not an integer: {value}")]
    NotInteger { field: &'static str, value: String },

    #[error("unknown session event `{0}`")]
    UnknownEvent(String),

    #[error("timestamp arithmetic overflowed")]
    Overflow,
}
