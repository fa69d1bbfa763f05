use std::path::PathBuf;

use thiserror::Error;

use crate::normalize::NormalizeError;

/// Errors that abort a conversion
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("flatness must be a positive number, got {0}")]
    InvalidFlatness(f64),

    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not create a working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("XML parsing error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("document has no <svg> root element")]
    MissingRoot,

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("interrupted")]
    Interrupted,
}
