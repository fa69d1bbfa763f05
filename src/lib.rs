//! # svg2dxf
//!
//! Flatten layered SVG drawings (as saved by Inkscape) into DXF polylines
//! for CNC, laser and CAD work.
//!
//! ## Features
//!
//! - **Curve flattening**: cubic, quadratic and arc segments become line
//!   segments within a flatness tolerance
//! - **Layers**: Inkscape layers map to DXF layers in document order
//! - **Normalization**: optionally run Inkscape over a copy of the drawing so
//!   text, shapes and strokes become plain paths first
//!
//! ## Example
//!
//! ```rust,ignore
//! use svg2dxf::convert::convert_str;
//! use svg2dxf::svg::LayerManifest;
//!
//! let svg = std::fs::read_to_string("drawing.svg").unwrap();
//! let (dxf, warnings) = convert_str(&svg, 0.2, &LayerManifest::default()).unwrap();
//! std::fs::write("drawing.dxf", dxf).unwrap();
//! warnings.report();
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod interrupt;
pub mod normalize;
pub mod svg;

// Re-export commonly used items
pub use config::AppConfig;
pub use convert::{ConvertOptions, Conversion, convert_file, convert_str};
pub use error::ConvertError;
pub use interrupt::InterruptFlag;
pub use normalize::{InkscapeNormalizer, Normalizer, Passthrough};
pub use svg::{LayerManifest, TargetDocument, Warnings};
