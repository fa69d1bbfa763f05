//! Layered SVG to DXF flattening
//!
//! This module reads an Inkscape-style SVG document, walks its layer/group
//! tree while composing transforms, flattens every path into polylines
//! within a flatness tolerance and serializes the result as DXF.

pub mod bounds;
pub mod collect;
pub mod curve;
pub mod manifest;
pub mod parser;
pub mod path;
pub(crate) mod scan;
pub mod style;
pub mod transform;
pub mod types;
pub mod warnings;
pub mod writer;

// Re-export main public API
pub use collect::{Collected, LayerCollector, collect};
pub use curve::{Flatten, flatten_cubic};
pub use manifest::{LayerEntry, LayerManifest};
pub use parser::parse_svg;
pub use path::{PathDataError, parse_path_data, polygonize};
pub use transform::{TransformScope, TransformStack, parse_transform};
pub use types::*;
pub use warnings::{Warning, Warnings};
pub use writer::build;
