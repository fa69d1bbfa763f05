use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use svg2dxf::convert::{ConvertOptions, convert_file, default_output_path};
use svg2dxf::normalize::{NormalizeError, Normalizer, Passthrough};
use svg2dxf::svg::LayerManifest;
use svg2dxf::{ConvertError, InterruptFlag};

const DRAWING: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape"
     width="50mm" height="50mm" viewBox="0 0 50 50">
  <g inkscape:groupmode="layer" id="layer1" inkscape:label="Cut">
    <path id="line" d="M0 0 L10 10" style="fill:none"/>
  </g>
  <g inkscape:groupmode="layer" id="layer2" inkscape:label="Score*">
    <path id="box" d="M0 0 h5 v5 h-5 z" style="fill:none"/>
  </g>
</svg>"#;

/// Records what it was asked to do and swaps the working copy's content
struct RewritingNormalizer {
    replacement: &'static str,
    seen: RefCell<Vec<(PathBuf, Vec<(String, String, bool)>)>>,
}

impl Normalizer for RewritingNormalizer {
    fn normalize(&self, document: &Path, manifest: &LayerManifest) -> Result<(), NormalizeError> {
        let layers = manifest
            .entries()
            .iter()
            .map(|e| (e.id.clone(), e.name.clone(), e.use_paths))
            .collect();
        self.seen.borrow_mut().push((document.to_path_buf(), layers));
        fs::write(document, self.replacement).unwrap();
        Ok(())
    }
}

struct FailingNormalizer;

impl Normalizer for FailingNormalizer {
    fn normalize(&self, _document: &Path, _manifest: &LayerManifest) -> Result<(), NormalizeError> {
        Err(NormalizeError::Spawn {
            program: PathBuf::from("inkscape"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    }
}

/// Stands in for Ctrl-C arriving while the editor runs
struct InterruptingNormalizer {
    interrupt: InterruptFlag,
    working_copy: RefCell<Option<PathBuf>>,
}

impl Normalizer for InterruptingNormalizer {
    fn normalize(&self, document: &Path, _manifest: &LayerManifest) -> Result<(), NormalizeError> {
        *self.working_copy.borrow_mut() = Some(document.to_path_buf());
        self.interrupt.set();
        Ok(())
    }
}

/// An editor killed by the interrupt
struct KilledNormalizer;

impl Normalizer for KilledNormalizer {
    fn normalize(&self, _document: &Path, _manifest: &LayerManifest) -> Result<(), NormalizeError> {
        Err(NormalizeError::Interrupted {
            program: PathBuf::from("inkscape"),
        })
    }
}

fn setup() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("drawing.svg");
    fs::write(&input, DRAWING).unwrap();
    (dir, input)
}

#[test]
fn test_passthrough_conversion_writes_output() {
    let (_dir, input) = setup();
    let output = default_output_path(&input);

    let conversion = convert_file(&input, &output, &ConvertOptions::default(), &Passthrough).unwrap();
    assert_eq!(conversion.output, output);
    assert_eq!(conversion.layers, 2);
    assert_eq!(conversion.polylines, 2);
    assert!(conversion.warnings.is_empty());

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("\nCut\n"));
    assert!(text.contains("\nScore\n"));
    assert!(text.ends_with("0\nEOF\n"));
}

#[test]
fn test_normalizer_works_on_a_copy() {
    let (dir, input) = setup();
    let output = dir.path().join("out.dxf");
    let normalizer = RewritingNormalizer {
        replacement: r#"<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
  <g inkscape:groupmode="layer" id="layer2" inkscape:label="renamed by editor">
    <path d="M0 0 L1 0 L1 1"/>
  </g>
</svg>"#,
        seen: RefCell::new(Vec::new()),
    };

    let conversion = convert_file(&input, &output, &ConvertOptions::default(), &normalizer).unwrap();

    let seen = normalizer.seen.borrow();
    assert_eq!(seen.len(), 1);
    let (working_copy, layers) = &seen[0];
    assert_ne!(working_copy, &input);
    assert_eq!(working_copy.file_name(), input.file_name());
    // The temporary directory is gone once the conversion returns
    assert!(!working_copy.exists());
    assert_eq!(
        layers,
        &vec![
            ("layer1".to_string(), "Cut".to_string(), false),
            ("layer2".to_string(), "Score".to_string(), true),
        ]
    );

    // Source untouched, output built from the normalized copy, named by the manifest
    assert_eq!(fs::read_to_string(&input).unwrap(), DRAWING);
    assert_eq!(conversion.layers, 1);
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("\nScore\n"));
    assert!(!text.contains("renamed by editor"));
}

#[test]
fn test_invalid_flatness_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.svg");
    let output = dir.path().join("out.dxf");

    for flatness in [0.0, -0.5, f64::NAN] {
        let err = convert_file(&input, &output, &ConvertOptions::with_flatness(flatness), &Passthrough).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFlatness(_)), "{:?}", err);
    }
    assert!(!output.exists());
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.svg");
    let err = convert_file(&input, &dir.path().join("out.dxf"), &ConvertOptions::default(), &Passthrough)
        .unwrap_err();
    assert!(matches!(err, ConvertError::Read { ref path, .. } if *path == input));
    assert!(err.to_string().contains("missing.svg"));
}

#[test]
fn test_failures_leave_existing_output_alone() {
    let (dir, input) = setup();
    let output = dir.path().join("out.dxf");
    fs::write(&output, "previous").unwrap();

    let err = convert_file(&input, &output, &ConvertOptions::default(), &FailingNormalizer).unwrap_err();
    assert!(matches!(err, ConvertError::Normalize(NormalizeError::Spawn { .. })));
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");

    fs::write(&input, "<svg><g></svg>").unwrap();
    let err = convert_file(&input, &output, &ConvertOptions::default(), &Passthrough).unwrap_err();
    assert!(matches!(err, ConvertError::Xml { .. }));
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn test_interrupt_cleans_up_and_writes_nothing() {
    let (dir, input) = setup();
    let output = dir.path().join("out.dxf");
    let options = ConvertOptions::default();
    let normalizer = InterruptingNormalizer {
        interrupt: options.interrupt.clone(),
        working_copy: RefCell::new(None),
    };

    let err = convert_file(&input, &output, &options, &normalizer).unwrap_err();
    assert!(matches!(err, ConvertError::Interrupted), "{:?}", err);

    let working_copy = normalizer.working_copy.borrow().clone().unwrap();
    assert!(!working_copy.exists());
    assert!(!working_copy.parent().unwrap().exists());
    assert!(!output.exists());
    assert_eq!(fs::read_to_string(&input).unwrap(), DRAWING);
}

#[test]
fn test_interrupted_editor_keeps_previous_output() {
    let (dir, input) = setup();
    let output = dir.path().join("out.dxf");
    fs::write(&output, "previous").unwrap();

    let err = convert_file(&input, &output, &ConvertOptions::default(), &KilledNormalizer).unwrap_err();
    assert!(matches!(err, ConvertError::Interrupted), "{:?}", err);
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn test_raised_interrupt_stops_before_normalizing() {
    let (dir, input) = setup();
    let output = dir.path().join("out.dxf");
    let options = ConvertOptions::default();
    options.interrupt.set();
    let normalizer = RewritingNormalizer {
        replacement: DRAWING,
        seen: RefCell::new(Vec::new()),
    };

    let err = convert_file(&input, &output, &options, &normalizer).unwrap_err();
    assert!(matches!(err, ConvertError::Interrupted));
    assert!(normalizer.seen.borrow().is_empty());
    assert!(!output.exists());
}

#[test]
fn test_default_output_path_replaces_extension() {
    assert_eq!(
        default_output_path(Path::new("/work/panel.v2.svg")),
        PathBuf::from("/work/panel.v2.dxf")
    );
}
