//! ASCII DXF (R12) serialization of a flattened drawing.
//!
//! Every vertex is flipped to the y-up convention here and nowhere else.

use std::fmt::Write as _;

use tracing::debug;

use super::bounds::Bounds;
use super::style::layer_color;
use super::types::{FlattenedPolyline, Point, TargetDocument};

const ACAD_VERSION: &str = "AC1009";
const LINETYPE: &str = "CONTINUOUS";

/// Format a number with 6 decimal places, treating -0 as 0
fn f(n: f64) -> String {
    let n = if n == 0.0 { 0.0 } else { n };
    format!("{:.6}", n)
}

/// Drawing coordinates (y down) to DXF coordinates (y up)
fn flip(p: &Point) -> Point {
    Point::new(p.x, -p.y)
}

/// Group-code/value pairs accumulated into one ASCII buffer
struct DxfWriter {
    out: String,
}

impl DxfWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn pair(&mut self, code: u16, value: impl std::fmt::Display) {
        // Writing into a String cannot fail
        let _ = write!(self.out, "{}\n{}\n", code, value);
    }

    fn point(&mut self, p: Point) {
        self.pair(10, f(p.x));
        self.pair(20, f(p.y));
        self.pair(30, f(0.0));
    }

    fn section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn header(&mut self, extents: Option<Bounds>) {
        let (min, max) = match extents {
            Some(b) => (b.min(), b.max()),
            None => (Point::new(0.0, 0.0), Point::new(0.0, 0.0)),
        };
        self.section("HEADER");
        self.pair(9, "$ACADVER");
        self.pair(1, ACAD_VERSION);
        self.pair(9, "$EXTMIN");
        self.point(min);
        self.pair(9, "$EXTMAX");
        self.point(max);
        self.end_section();
    }

    fn tables(&mut self, layers: &[&str]) {
        self.section("TABLES");

        self.pair(0, "TABLE");
        self.pair(2, "LTYPE");
        self.pair(70, 1);
        self.pair(0, "LTYPE");
        self.pair(2, LINETYPE);
        self.pair(70, 0);
        self.pair(3, "Solid line");
        self.pair(72, 65);
        self.pair(73, 0);
        self.pair(40, f(0.0));
        self.pair(0, "ENDTAB");

        self.pair(0, "TABLE");
        self.pair(2, "LAYER");
        self.pair(70, layers.len());
        for (position, name) in layers.iter().enumerate() {
            self.pair(0, "LAYER");
            self.pair(2, name);
            self.pair(70, 0);
            self.pair(62, layer_color(position));
            self.pair(6, LINETYPE);
        }
        self.pair(0, "ENDTAB");

        self.end_section();
    }

    fn polyline(&mut self, layer: &str, polyline: &FlattenedPolyline) {
        self.pair(0, "POLYLINE");
        self.pair(8, layer);
        self.pair(66, 1);
        self.pair(70, u8::from(polyline.is_closed()));
        self.point(Point::new(0.0, 0.0));
        for p in polyline.points() {
            self.pair(0, "VERTEX");
            self.pair(8, layer);
            self.point(flip(p));
        }
        self.pair(0, "SEQEND");
        self.pair(8, layer);
    }

    fn finish(mut self) -> String {
        self.pair(0, "EOF");
        self.out
    }
}

/// Serialize `document` as an R12 DXF file.
///
/// Layers come out in first-encounter order and polylines in walk order
/// within each layer. The output carries no timestamps or handles, so equal
/// input gives byte-identical output.
pub fn build(document: &TargetDocument) -> Vec<u8> {
    let extents = Bounds::of_points(
        document
            .layers()
            .flat_map(|(_, polylines)| polylines)
            .flat_map(|polyline| polyline.points().iter().map(flip)),
    );

    let mut w = DxfWriter::new();
    w.header(extents);
    let layers: Vec<&str> = document.layers().map(|(name, _)| name).collect();
    w.tables(&layers);

    w.section("ENTITIES");
    for (name, polylines) in document.layers() {
        for polyline in polylines {
            w.polyline(name, polyline);
        }
    }
    w.end_section();

    let out = w.finish();
    debug!(
        layers = document.layer_count(),
        polylines = document.polyline_count(),
        bytes = out.len(),
        "built DXF"
    );
    out.into_bytes()
}
