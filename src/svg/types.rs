use indexmap::IndexMap;

use super::warnings::Warning;

/// 2D point in the coordinate space of whoever holds it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at parameter `t` on the segment from `self` to `other`
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance to the closed segment `a`-`b`; degenerates to point distance when `a == b`
    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len_sq = dx * dx + dy * dy;
        if len_sq <= f64::EPSILON {
            return self.distance(a);
        }
        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
        self.distance(&Point::new(a.x + t * dx, a.y + t * dy))
    }

    pub fn approx_eq(&self, other: &Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

/// 2D affine transformation matrix [a, b, c, d, e, f]
/// Represents: | a  c  e |
///             | b  d  f |
///             | 0  0  1 |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`, same matrix as SVG `rotate()`
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// Compose two transforms: self * other (`other` is applied first)
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }
}

/// Absolute path command, already resolved from the SVG path grammar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Cubic Bezier from the current pen position
    CurveTo(Point, Point, Point),
    Close,
}

/// A `<path>` element. Path data is kept raw and parsed during the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: Option<String>,
    pub transform: Transform,
    pub data: String,
    /// Fill regions close every sub-path; stroke outlines keep open sub-paths open
    pub filled: bool,
}

impl Shape {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            id: None,
            transform: Transform::identity(),
            data: data.into(),
            filled: true,
        }
    }

    /// Identifier used in diagnostics
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<unnamed path>")
    }
}

/// Inkscape layer (`<g inkscape:groupmode="layer">`)
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: Option<String>,
    pub label: Option<String>,
    pub transform: Transform,
    pub children: Vec<Element>,
}

/// Plain grouping element; contributes a transform but no layer name
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Option<String>,
    pub transform: Transform,
    pub children: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Layer(Layer),
    Group(Group),
    Shape(Shape),
}

impl Element {
    pub fn transform(&self) -> &Transform {
        match self {
            Element::Layer(l) => &l.transform,
            Element::Group(g) => &g.transform,
            Element::Shape(s) => &s.transform,
        }
    }

    pub fn children(&self) -> &[Element] {
        match self {
            Element::Layer(l) => &l.children,
            Element::Group(g) => &g.children,
            Element::Shape(_) => &[],
        }
    }
}

/// Parsed, normalized drawing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Maps user units to output units (viewBox and physical size)
    pub root_transform: Transform,
    pub children: Vec<Element>,
    /// Problems found while reading the tree, surfaced with the walk's warnings
    pub issues: Vec<Warning>,
}

/// Straight-segment approximation of one sub-path
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedPolyline {
    points: Vec<Point>,
    closed: bool,
    layer: String,
}

impl FlattenedPolyline {
    /// Returns `None` when fewer than two points remain
    pub fn new(points: Vec<Point>, closed: bool, layer: impl Into<String>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self {
            points,
            closed,
            layer: layer.into(),
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }
}

/// Layer name -> polylines, in first-encounter order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetDocument {
    layers: IndexMap<String, Vec<FlattenedPolyline>>,
}

impl TargetDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer so it keeps its position even if it stays empty
    pub fn declare_layer(&mut self, name: &str) {
        if !self.layers.contains_key(name) {
            self.layers.insert(name.to_string(), Vec::new());
        }
    }

    pub fn push(&mut self, polyline: FlattenedPolyline) {
        match self.layers.get_mut(polyline.layer()) {
            Some(polylines) => polylines.push(polyline),
            None => {
                self.layers
                    .insert(polyline.layer().to_string(), vec![polyline]);
            }
        }
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &[FlattenedPolyline])> {
        self.layers
            .iter()
            .map(|(name, polylines)| (name.as_str(), polylines.as_slice()))
    }

    pub fn layer(&self, name: &str) -> Option<&[FlattenedPolyline]> {
        self.layers.get(name).map(Vec::as_slice)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn polyline_count(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.polyline_count() == 0
    }
}
