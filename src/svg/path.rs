use thiserror::Error;

use super::curve::{arc_to_cubics, flatten_cubic};
use super::scan::Scanner;
use super::types::{FlattenedPolyline, PathCommand, Point, Transform};

/// Points closer than this are treated as the same vertex
const COINCIDENT: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathDataError {
    #[error("path data must start with a moveto")]
    MissingMoveTo,
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
    #[error("missing or malformed arguments for '{command}' at offset {offset}")]
    MissingArguments { command: char, offset: usize },
    #[error("number out of range at offset {offset}")]
    InvalidNumber { offset: usize },
}

/// Parse SVG path data (`d`) into absolute move/line/cubic/close commands.
///
/// Quadratics are degree-elevated, smooth segments reflect the previous
/// control point and arcs become cubic pieces.
pub fn parse_path_data(data: &str) -> Result<Vec<PathCommand>, PathDataError> {
    let mut s = Scanner::new(data);
    let mut commands = Vec::new();

    let mut pen = Point::new(0.0, 0.0);
    let mut subpath_start = pen;
    // Second control point of the previous cubic / control of the previous quadratic
    let mut last_cubic_ctrl: Option<Point> = None;
    let mut last_quad_ctrl: Option<Point> = None;
    let mut command: Option<u8> = None;

    loop {
        s.skip_separators();
        let Some(next) = s.peek() else {
            break;
        };

        let offset = s.offset();
        if next.is_ascii_alphabetic() {
            s.bump();
            command = Some(next);
        } else if command.is_none() || !s.at_number() {
            if commands.is_empty() {
                return Err(PathDataError::MissingMoveTo);
            }
            return Err(PathDataError::UnexpectedCharacter {
                ch: data[offset..].chars().next().unwrap_or('?'),
                offset,
            });
        }

        let Some(cmd) = command else {
            return Err(PathDataError::MissingMoveTo);
        };
        if commands.is_empty() && !matches!(cmd, b'M' | b'm') {
            return Err(PathDataError::MissingMoveTo);
        }

        let relative = cmd.is_ascii_lowercase();
        let origin = if relative { pen } else { Point::new(0.0, 0.0) };
        let missing = || PathDataError::MissingArguments {
            command: cmd as char,
            offset,
        };
        let point = |s: &mut Scanner| -> Result<Point, PathDataError> {
            let x = argument(s, missing)?;
            let y = argument(s, missing)?;
            Ok(Point::new(origin.x + x, origin.y + y))
        };

        match cmd.to_ascii_uppercase() {
            b'M' => {
                pen = point(&mut s)?;
                subpath_start = pen;
                commands.push(PathCommand::MoveTo(pen));
                // Extra coordinate pairs are implicit linetos
                command = Some(if relative { b'l' } else { b'L' });
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            b'L' => {
                pen = point(&mut s)?;
                commands.push(PathCommand::LineTo(pen));
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            b'H' => {
                let x = argument(&mut s, missing)?;
                pen = Point::new(origin.x + x, pen.y);
                commands.push(PathCommand::LineTo(pen));
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            b'V' => {
                let y = argument(&mut s, missing)?;
                pen = Point::new(pen.x, origin.y + y);
                commands.push(PathCommand::LineTo(pen));
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            b'C' => {
                let c1 = point(&mut s)?;
                let c2 = point(&mut s)?;
                let end = point(&mut s)?;
                commands.push(PathCommand::CurveTo(c1, c2, end));
                pen = end;
                last_cubic_ctrl = Some(c2);
                last_quad_ctrl = None;
            }
            b'S' => {
                let c1 = reflect(last_cubic_ctrl, pen);
                let c2 = point(&mut s)?;
                let end = point(&mut s)?;
                commands.push(PathCommand::CurveTo(c1, c2, end));
                pen = end;
                last_cubic_ctrl = Some(c2);
                last_quad_ctrl = None;
            }
            b'Q' => {
                let ctrl = point(&mut s)?;
                let end = point(&mut s)?;
                commands.push(quadratic_to_cubic(pen, ctrl, end));
                pen = end;
                last_quad_ctrl = Some(ctrl);
                last_cubic_ctrl = None;
            }
            b'T' => {
                let ctrl = reflect(last_quad_ctrl, pen);
                let end = point(&mut s)?;
                commands.push(quadratic_to_cubic(pen, ctrl, end));
                pen = end;
                last_quad_ctrl = Some(ctrl);
                last_cubic_ctrl = None;
            }
            b'A' => {
                let rx = argument(&mut s, missing)?;
                let ry = argument(&mut s, missing)?;
                let rotation = argument(&mut s, missing)?;
                s.skip_separators();
                let large_arc = s.flag().ok_or_else(missing)?;
                s.skip_separators();
                let sweep = s.flag().ok_or_else(missing)?;
                let end = point(&mut s)?;
                for [c1, c2, to] in arc_to_cubics(pen, (rx, ry), rotation, large_arc, sweep, end) {
                    commands.push(PathCommand::CurveTo(c1, c2, to));
                }
                pen = end;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            b'Z' => {
                commands.push(PathCommand::Close);
                pen = subpath_start;
                // Z takes no arguments; numbers after it are an error
                command = None;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            _ => {
                return Err(PathDataError::UnexpectedCharacter {
                    ch: cmd as char,
                    offset,
                });
            }
        }
    }

    Ok(commands)
}

/// Next numeric argument; an overflowing literal is reported where it starts
fn argument(s: &mut Scanner, missing: impl Fn() -> PathDataError) -> Result<f64, PathDataError> {
    s.skip_separators();
    match s.number() {
        Some(value) => Ok(value),
        None if s.at_non_finite() => Err(PathDataError::InvalidNumber { offset: s.offset() }),
        None => Err(missing()),
    }
}

fn reflect(ctrl: Option<Point>, pen: Point) -> Point {
    match ctrl {
        Some(c) => Point::new(2.0 * pen.x - c.x, 2.0 * pen.y - c.y),
        None => pen,
    }
}

fn quadratic_to_cubic(from: Point, ctrl: Point, to: Point) -> PathCommand {
    PathCommand::CurveTo(
        from.lerp(&ctrl, 2.0 / 3.0),
        to.lerp(&ctrl, 2.0 / 3.0),
        to,
    )
}

/// Result of flattening one shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygonized {
    pub polylines: Vec<FlattenedPolyline>,
    /// Sub-paths that collapsed to a single point
    pub discarded: usize,
}

/// One sub-path being accumulated, in output coordinates
struct SubPath {
    points: Vec<Point>,
}

impl SubPath {
    fn starting_at(p: Point) -> Self {
        Self { points: vec![p] }
    }

    fn push(&mut self, p: Point) {
        if let Some(last) = self.points.last()
            && last.approx_eq(&p, COINCIDENT)
        {
            return;
        }
        self.points.push(p);
    }

    fn start(&self) -> Point {
        self.points[0]
    }
}

struct Polygonizer<'a> {
    transform: &'a Transform,
    flatness: f64,
    filled: bool,
    layer: &'a str,
    current: Option<SubPath>,
    out: Polygonized,
}

impl Polygonizer<'_> {
    fn finish(&mut self, closed: bool) {
        let Some(mut sub) = self.current.take() else {
            return;
        };
        let closed = closed || self.filled;
        if closed {
            // The closing edge is implicit, never a repeated vertex
            let start = sub.start();
            while sub.points.len() > 1
                && sub
                    .points
                    .last()
                    .is_some_and(|last| last.approx_eq(&start, COINCIDENT))
            {
                sub.points.pop();
            }
        }
        match FlattenedPolyline::new(sub.points, closed, self.layer) {
            Some(polyline) => self.out.polylines.push(polyline),
            None => self.out.discarded += 1,
        }
    }

    /// Sub-path to draw into, opened at the pen when a segment follows a close
    fn subpath(&mut self, pen: Point) -> &mut SubPath {
        self.current
            .get_or_insert_with(|| SubPath::starting_at(pen))
    }
}

/// Flatten parsed path commands under `transform`, one polyline per sub-path.
///
/// Curves are transformed before flattening, so `flatness` is measured in
/// output units.
pub fn polygonize(
    commands: &[PathCommand],
    transform: &Transform,
    flatness: f64,
    filled: bool,
    layer: &str,
) -> Polygonized {
    let mut state = Polygonizer {
        transform,
        flatness,
        filled,
        layer,
        current: None,
        out: Polygonized::default(),
    };
    // Pen position in output coordinates
    let mut pen = transform.apply(Point::new(0.0, 0.0));

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                state.finish(false);
                pen = state.transform.apply(p);
                state.current = Some(SubPath::starting_at(pen));
            }
            PathCommand::LineTo(p) => {
                let to = state.transform.apply(p);
                state.subpath(pen).push(to);
                pen = to;
            }
            PathCommand::CurveTo(c1, c2, end) => {
                let t = state.transform;
                let (c1, c2, end) = (t.apply(c1), t.apply(c2), t.apply(end));
                let flatness = state.flatness;
                let sub = state.subpath(pen);
                for p in flatten_cubic(pen, c1, c2, end, flatness) {
                    sub.push(p);
                }
                pen = end;
            }
            PathCommand::Close => {
                if let Some(sub) = state.current.as_mut() {
                    let start = sub.start();
                    sub.push(start);
                    pen = start;
                }
                state.finish(true);
            }
        }
    }
    state.finish(false);

    state.out
}
