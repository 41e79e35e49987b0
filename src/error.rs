use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("invalid solver configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("node '{code}' not found")]
    NodeNotFound { code: String },

    #[error("link {origin} -> {dest} not found")]
    EdgeNotFound { origin: String, dest: String },

    #[error("node '{code}' already exists")]
    DuplicateNode { code: String },

    #[error("link {origin} -> {dest} already exists")]
    DuplicateEdge { origin: String, dest: String },

    #[error("code '{code}' is reserved for internal nodes")]
    ReservedCode { code: String },

    #[error("node '{code}' is not a {expected}")]
    WrongKind { code: String, expected: &'static str },

    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation} failed for '{target}'")]
    Scenario {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<NetworkError>,
    },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("{file}:{line}: {reason}")]
    InvalidRecord {
        file: String,
        line: u64,
        reason: String,
    },
}

impl NetworkError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn node_not_found(code: impl Into<String>) -> Self {
        Self::NodeNotFound { code: code.into() }
    }

    pub(crate) fn in_scenario(self, operation: &'static str, target: impl Into<String>) -> Self {
        match self {
            // keep cancellation recognisable to callers
            cancelled @ Self::Cancelled { .. } => cancelled,
            other => Self::Scenario {
                operation,
                target: target.into(),
                source: Box::new(other),
            },
        }
    }
}
