// Error types for the GCP document model.
//
// `GcpError` covers everything that can go wrong while turning text into a
// `GcpDocument`. Every row-level variant carries the 1-based line number and
// the raw line so a front-end can render a precise message without keeping
// the source around. `SessionError` wraps those together with the I/O and
// indexing failures of an editing session.

use std::path::PathBuf;

/// Failures produced by the GCP parser.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GcpError {
    #[error("line {line}: unrecognized coordinate system `{text}` (expected EPSG:<code> or a +proj= string)")]
    InvalidCrsFormat { line: usize, text: String },

    #[error("line {line}: expected at least {expected} fields, found {found}: `{text}`")]
    MalformedRow {
        line: usize,
        text: String,
        found: usize,
        expected: usize,
    },

    #[error("line {line}, field {column} ({field}): invalid value `{token}`: `{text}`")]
    InvalidCoordinate {
        line: usize,
        column: usize,
        field: &'static str,
        token: String,
        text: String,
    },

    #[error("no ground control points found ({rejected} rows rejected)")]
    EmptyDocument { rejected: usize },
}

impl GcpError {
    /// Line the error is attributed to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            GcpError::InvalidCrsFormat { line, .. }
            | GcpError::MalformedRow { line, .. }
            | GcpError::InvalidCoordinate { line, .. } => Some(*line),
            GcpError::EmptyDocument { .. } => None,
        }
    }
}

/// Failures produced by a [`GcpSession`](super::GcpSession).
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Gcp(#[from] GcpError),
    #[error("no GCP point at index {index} (session holds {len})")]
    NoSuchPoint { index: usize, len: usize },
    #[error("{field} `{value}` cannot be written to a GCP file: it is empty or contains whitespace")]
    UnstorableField { field: &'static str, value: String },
}
