use std::f64::consts::{FRAC_PI_2, PI};
use std::iter::FusedIterator;

use super::types::Point;

/// Subdivision depth at which a segment is emitted regardless of its error.
/// Bounds the output at 2^16 points per curve for degenerate input.
pub const MAX_DEPTH: u32 = 16;

/// Cubic Bezier segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicSegment {
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Point on the curve at parameter `t`
    pub fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }

    /// Distance of the control points from the chord p0-p3.
    ///
    /// The curve lies inside the hull of its control points, so this bounds
    /// the true deviation from the chord from above. It is not the exact
    /// maximum deviation; flat-enough curves may be split one level early.
    pub fn flatness_error(&self) -> f64 {
        let d1 = self.p1.distance_to_segment(&self.p0, &self.p3);
        let d2 = self.p2.distance_to_segment(&self.p0, &self.p3);
        d1.max(d2)
    }

    /// de Casteljau split at t = 0.5. The right half keeps `p3` bit-for-bit.
    pub fn split_half(&self) -> (CubicSegment, CubicSegment) {
        let m01 = self.p0.lerp(&self.p1, 0.5);
        let m12 = self.p1.lerp(&self.p2, 0.5);
        let m23 = self.p2.lerp(&self.p3, 0.5);
        let m012 = m01.lerp(&m12, 0.5);
        let m123 = m12.lerp(&m23, 0.5);
        let mid = m012.lerp(&m123, 0.5);
        (
            CubicSegment::new(self.p0, m01, m012, mid),
            CubicSegment::new(mid, m123, m23, self.p3),
        )
    }
}

/// Lazily emitted chord endpoints approximating one cubic, in curve order.
///
/// The start point is implicit; the last item is exactly `p3`.
#[derive(Debug, Clone)]
pub struct Flatten {
    pending: Vec<(CubicSegment, u32)>,
    flatness: f64,
}

impl Iterator for Flatten {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        while let Some((segment, depth)) = self.pending.pop() {
            // NaN flatness fails the comparison and falls through to the depth bound
            if depth >= MAX_DEPTH || segment.flatness_error() <= self.flatness {
                return Some(segment.p3);
            }
            let (left, right) = segment.split_half();
            self.pending.push((right, depth + 1));
            self.pending.push((left, depth + 1));
        }
        None
    }
}

impl FusedIterator for Flatten {}

/// Flatten the cubic p0..p3 into line segments within `flatness`
pub fn flatten_cubic(p0: Point, p1: Point, p2: Point, p3: Point, flatness: f64) -> Flatten {
    Flatten {
        pending: vec![(CubicSegment::new(p0, p1, p2, p3), 0)],
        flatness,
    }
}

/// Convert an SVG elliptical arc into cubic pieces of at most 90 degrees.
///
/// Each item is `[control1, control2, end]`; the start of the first piece is
/// `from`. Coincident endpoints yield nothing, a zero radius yields a straight
/// cubic, and radii too small to span the endpoints are scaled up.
pub fn arc_to_cubics(
    from: Point,
    radii: (f64, f64),
    x_axis_rotation: f64,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> Vec<[Point; 3]> {
    if from.approx_eq(&to, 1e-12) {
        return Vec::new();
    }
    let mut rx = radii.0.abs();
    let mut ry = radii.1.abs();
    if rx <= f64::EPSILON || ry <= f64::EPSILON {
        return vec![[from, to, to]];
    }

    let (sin_phi, cos_phi) = x_axis_rotation.to_radians().sin_cos();
    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let mut coef = (num / den).max(0.0).sqrt();
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;
    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;
    let theta1 = angle(1.0, 0.0, ux, uy);
    let mut sweep_angle = angle(ux, uy, vx, vy);
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= 2.0 * PI;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += 2.0 * PI;
    }

    let pieces = ((sweep_angle.abs() / FRAC_PI_2).ceil() as usize).max(1);
    let delta = sweep_angle / pieces as f64;
    let k = 4.0 / 3.0 * (delta / 4.0).tan();
    let map = |ex: f64, ey: f64| {
        Point::new(
            cx + rx * ex * cos_phi - ry * ey * sin_phi,
            cy + rx * ex * sin_phi + ry * ey * cos_phi,
        )
    };

    let mut out = Vec::with_capacity(pieces);
    for i in 0..pieces {
        let t1 = theta1 + i as f64 * delta;
        let t2 = t1 + delta;
        let (s1, c1) = t1.sin_cos();
        let (s2, c2) = t2.sin_cos();
        let ctrl1 = map(c1 - k * s1, s1 + k * c1);
        let ctrl2 = map(c2 + k * s2, s2 - k * c2);
        let end = if i + 1 == pieces { to } else { map(c2, s2) };
        out.push([ctrl1, ctrl2, end]);
    }
    out
}
