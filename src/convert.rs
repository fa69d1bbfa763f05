use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

use crate::error::ConvertError;
use crate::interrupt::InterruptFlag;
use crate::normalize::{NormalizeError, Normalizer};
use crate::svg::{LayerManifest, Warnings, build, collect, parse_svg};

/// Default maximum deviation of a flattened curve, in output units (mm)
pub const DEFAULT_FLATNESS: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub flatness: f64,
    /// Checked between steps; a raised flag abandons the conversion
    pub interrupt: InterruptFlag,
}

impl ConvertOptions {
    pub fn with_flatness(flatness: f64) -> Self {
        Self {
            flatness,
            ..Self::default()
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            flatness: DEFAULT_FLATNESS,
            interrupt: InterruptFlag::default(),
        }
    }
}

/// Outcome of a successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub output: PathBuf,
    pub layers: usize,
    pub polylines: usize,
    pub warnings: Warnings,
}

/// Reject tolerances that cannot bound a flattening
pub fn validate_flatness(flatness: f64) -> Result<f64, ConvertError> {
    if flatness.is_finite() && flatness > 0.0 {
        Ok(flatness)
    } else {
        Err(ConvertError::InvalidFlatness(flatness))
    }
}

/// `input` with its extension replaced by `.dxf`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("dxf")
}

/// Flatten already-normalized SVG text into DXF bytes
pub fn convert_str(
    svg: &str,
    flatness: f64,
    manifest: &LayerManifest,
) -> Result<(Vec<u8>, Warnings), ConvertError> {
    let flatness = validate_flatness(flatness)?;
    let document = parse_svg(svg)?;
    let collected = collect(&document, flatness, manifest);
    Ok((build(&collected.document), collected.warnings))
}

/// Convert the SVG file at `input` into a DXF file at `output`.
///
/// The source is never modified: layers are read from it, then a copy in a
/// temporary directory is handed to `normalizer` and flattened. The output
/// only appears once it is completely written.
///
/// When `options.interrupt` is raised the conversion stops at the next step
/// with [`ConvertError::Interrupted`]; the working copy is removed and
/// `output` is left as it was.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
    normalizer: &dyn Normalizer,
) -> Result<Conversion, ConvertError> {
    let flatness = validate_flatness(options.flatness)?;

    let source = read(input)?;
    let manifest = LayerManifest::from_document(&parse_svg(&source)?);
    debug!(layers = manifest.entries().len(), "read layer manifest");

    let work_dir = TempDir::new().map_err(ConvertError::WorkDir)?;
    let file_name = input
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("drawing.svg"));
    let working_copy = work_dir.path().join(file_name);
    fs::write(&working_copy, &source).map_err(|source| ConvertError::Write {
        path: working_copy.clone(),
        source,
    })?;

    check_interrupt(&options.interrupt)?;
    normalizer
        .normalize(&working_copy, &manifest)
        .map_err(|e| match e {
            NormalizeError::Interrupted { .. } => ConvertError::Interrupted,
            e => e.into(),
        })?;
    check_interrupt(&options.interrupt)?;

    let normalized = read(&working_copy)?;
    let document = parse_svg(&normalized)?;
    let collected = collect(&document, flatness, &manifest);
    let bytes = build(&collected.document);

    check_interrupt(&options.interrupt)?;
    write_atomically(output, &bytes)?;
    info!(
        output = %output.display(),
        layers = collected.document.layer_count(),
        polylines = collected.document.polyline_count(),
        "wrote DXF"
    );
    collected.warnings.report();

    Ok(Conversion {
        output: output.to_path_buf(),
        layers: collected.document.layer_count(),
        polylines: collected.document.polyline_count(),
        warnings: collected.warnings,
    })
}

fn check_interrupt(interrupt: &InterruptFlag) -> Result<(), ConvertError> {
    if interrupt.is_set() {
        debug!("conversion interrupted");
        return Err(ConvertError::Interrupted);
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, ConvertError> {
    fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a temporary file next to `path`, then rename it into place
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let write_error = |source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_flatness() {
        assert_eq!(validate_flatness(0.2).unwrap(), 0.2);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                validate_flatness(bad),
                Err(ConvertError::InvalidFlatness(_))
            ));
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("drawings/part.svg")),
            PathBuf::from("drawings/part.dxf")
        );
        assert_eq!(default_output_path(Path::new("part")), PathBuf::from("part.dxf"));
    }

    #[test]
    fn test_convert_str_rejects_flatness_before_parsing() {
        let result = convert_str("not xml at all", 0.0, &LayerManifest::default());
        assert!(matches!(result, Err(ConvertError::InvalidFlatness(_))));
    }

    #[test]
    fn test_write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dxf");
        fs::write(&path, b"old").unwrap();
        write_atomically(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomically_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.dxf");
        assert!(matches!(
            write_atomically(&path, b"x"),
            Err(ConvertError::Write { .. })
        ));
    }
}
