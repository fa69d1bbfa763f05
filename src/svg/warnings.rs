use thiserror::Error;
use tracing::warn;

use super::path::PathDataError;
use super::transform::TransformSyntaxError;

/// Non-fatal problem found while reading or walking a drawing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("path '{shape}' has unparsable path data: {error}")]
    InvalidPathData { shape: String, error: PathDataError },
    #[error("path '{shape}' collapsed to a single point")]
    DegenerateShape { shape: String },
    #[error("element <{tag}> is not a path")]
    UnsupportedElement { tag: String },
    #[error("<{tag}> has an invalid transform '{value}': {error}")]
    InvalidTransform {
        tag: String,
        value: String,
        error: TransformSyntaxError,
    },
    #[error("layer '{name}' is not listed in the layer manifest")]
    UnlistedLayer { name: String },
}

impl Warning {
    fn kind(&self) -> &'static str {
        match self {
            Warning::InvalidPathData { .. } => "paths with unparsable data were skipped",
            Warning::DegenerateShape { .. } => "sub-paths collapsed to a single point and were dropped",
            Warning::UnsupportedElement { .. } => "non-path elements were skipped",
            Warning::InvalidTransform { .. } => "invalid transforms were replaced by identity",
            Warning::UnlistedLayer { .. } => "layers were missing from the layer manifest",
        }
    }
}

/// Warnings collected over one conversion, reported once at the end
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.items.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.items.extend(warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    /// First shape whose path data failed to parse
    pub fn first_invalid_path(&self) -> Option<&Warning> {
        self.items
            .iter()
            .find(|w| matches!(w, Warning::InvalidPathData { .. }))
    }

    /// One line per kind of warning, with a count and the first occurrence
    pub fn summary(&self) -> Vec<String> {
        let mut kinds: Vec<(&'static str, usize, &Warning)> = Vec::new();
        for warning in &self.items {
            let kind = warning.kind();
            match kinds.iter_mut().find(|(k, _, _)| *k == kind) {
                Some((_, count, _)) => *count += 1,
                None => kinds.push((kind, 1, warning)),
            }
        }
        kinds
            .into_iter()
            .map(|(kind, count, first)| format!("{} {} (first: {})", count, kind, first))
            .collect()
    }

    /// Log the summary through `tracing`
    pub fn report(&self) {
        for line in self.summary() {
            warn!("{}", line);
        }
    }
}
