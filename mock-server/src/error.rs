use std::io;

use thiserror::Error;

/// Errors raised while setting up test cases.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("test case already registered: {method} {path}")]
    Duplicate { method: String, path: String },

    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to read fixture {path}: {source}")]
    FixtureIo {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid fixture {path}: {source}")]
    FixtureParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
