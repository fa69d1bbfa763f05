//! Normalization of a working copy before it is flattened
//!
//! Normalization runs an external editor over the copy so every shape ends up
//! as a `<path>` in an unlocked, visible layer.

mod inkscape;

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

use crate::svg::LayerManifest;

pub use inkscape::{ChildGuard, InkscapeCommandLine, InkscapeNormalizer};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("could not run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not wait for {}: {source}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("command failed: {command} ({status})")]
    Failed { command: String, status: ExitStatus },
    #[error("{} was interrupted", program.display())]
    Interrupted { program: PathBuf },
}

/// Rewrites `document` in place
pub trait Normalizer {
    fn normalize(&self, document: &Path, manifest: &LayerManifest) -> Result<(), NormalizeError>;
}

/// Leaves the document untouched, for input that is already paths only
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Normalizer for Passthrough {
    fn normalize(&self, _document: &Path, _manifest: &LayerManifest) -> Result<(), NormalizeError> {
        Ok(())
    }
}
