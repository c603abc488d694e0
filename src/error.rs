// Error type shared by the library modules. The binary wraps these in
// `anyhow` for context; only `main` decides what the process exit is.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading configuration and
/// printing a redirect URL.
#[derive(Debug, Error)]
pub enum CamcogError {
    /// Required configuration is missing or has an invalid value.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid base address {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The remote service could not be reached, or the request could not be built.
    #[error("request to remote service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered with a status of 300 or above.
    #[error("remote service error: {message}")]
    Service { status: u16, message: String },

    /// A success status whose body is not the expected JSON shape.
    #[error("could not decode {what} response: {source}")]
    Protocol {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("ambiguous or absent remote account for subject {subject_id} ({found} records)")]
    SubjectCardinality { subject_id: String, found: usize },

    #[error("no access code for subject {subject} ({found} records)")]
    AccessCodeCardinality { subject: String, found: usize },

    #[error("could not read batch file: {0}")]
    BatchInput(#[from] csv::Error),

    #[error("invalid batch row {line}: {reason}")]
    InvalidRow { line: usize, reason: String },

    /// A batch row failed; the batch stops here.
    #[error("row {line} (subject {subject_id}): {source}")]
    Row {
        line: usize,
        subject_id: String,
        #[source]
        source: Box<CamcogError>,
    },

    #[error("could not write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CamcogError {
    /// True when the remote service answered fine but returned the wrong
    /// number of records.
    pub fn is_cardinality(&self) -> bool {
        match self {
            CamcogError::SubjectCardinality { .. } | CamcogError::AccessCodeCardinality { .. } => {
                true
            }
            CamcogError::Row { source, .. } => source.is_cardinality(),
            _ => false,
        }
    }

    /// HTTP status carried by a service error, looking through row context.
    pub fn status(&self) -> Option<u16> {
        match self {
            CamcogError::Service { status, .. } => Some(*status),
            CamcogError::Row { source, .. } => source.status(),
            _ => None,
        }
    }
}
