//! Error type for the recoverable failure family: file I/O, OBJ/MTL parse
//! errors and image decode failures.
//!
//! Configuration and asset-authoring mistakes (shader compile failure,
//! exceeding the light cap, a face referencing a missing vertex) are not
//! represented here; those panic.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A malformed OBJ/MTL record. Aborts the whole load; partial geometry
    /// is not a usable asset.
    #[error("parse error on line {line} `{text}`: {reason}")]
    Parse {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("error decoding image {path}: {reason}")]
    Image { path: PathBuf, reason: String },

    #[error("no material called {0}")]
    UnknownMaterial(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(line: usize, text: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
