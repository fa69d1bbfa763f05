use std::ops::{Deref, DerefMut};

use thiserror::Error;

use super::scan::Scanner;
use super::types::Transform;

/// Composed transforms along the current branch of a depth-first walk
#[derive(Debug, Default)]
pub struct TransformStack {
    stack: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose `transform` onto the current top and push the result
    pub fn push(&mut self, transform: &Transform) {
        let composed = self.current().compose(transform);
        self.stack.push(composed);
    }

    /// Restore the previous top
    pub fn pop(&mut self) -> Option<Transform> {
        self.stack.pop()
    }

    /// Effective transform, identity when nothing is pushed
    pub fn current(&self) -> Transform {
        self.stack.last().copied().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push `transform` for the lifetime of the returned guard
    pub fn scope(&mut self, transform: &Transform) -> TransformScope<'_> {
        self.push(transform);
        TransformScope { stack: self }
    }
}

/// Pops its transform when dropped, on every exit path
pub struct TransformScope<'a> {
    stack: &'a mut TransformStack,
}

impl Deref for TransformScope<'_> {
    type Target = TransformStack;

    fn deref(&self) -> &TransformStack {
        self.stack
    }
}

impl DerefMut for TransformScope<'_> {
    fn deref_mut(&mut self) -> &mut TransformStack {
        self.stack
    }
}

impl Drop for TransformScope<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transform list near offset {offset}")]
pub struct TransformSyntaxError {
    pub offset: usize,
}

/// Parse an SVG `transform` attribute value, e.g. `translate(5 5) rotate(30)`
pub fn parse_transform(text: &str) -> Result<Transform, TransformSyntaxError> {
    let mut s = Scanner::new(text);
    let mut result = Transform::identity();

    loop {
        s.skip_separators();
        if s.is_at_end() {
            break;
        }

        let name_start = s.offset();
        let mut name = String::new();
        while let Some(b) = s.peek() {
            if b.is_ascii_alphabetic() {
                name.push(b as char);
                s.bump();
            } else {
                break;
            }
        }
        s.skip_whitespace();
        if name.is_empty() || s.bump() != Some(b'(') {
            return Err(TransformSyntaxError { offset: name_start });
        }

        let mut args = Vec::with_capacity(6);
        loop {
            s.skip_separators();
            if s.peek() == Some(b')') {
                s.bump();
                break;
            }
            match s.number() {
                Some(n) => args.push(n),
                None => return Err(TransformSyntaxError { offset: s.offset() }),
            }
        }

        let t = match (name.as_str(), args.as_slice()) {
            ("matrix", &[a, b, c, d, e, f]) => Transform::new(a, b, c, d, e, f),
            ("translate", &[tx]) => Transform::translate(tx, 0.0),
            ("translate", &[tx, ty]) => Transform::translate(tx, ty),
            ("scale", &[sx]) => Transform::scale(sx, sx),
            ("scale", &[sx, sy]) => Transform::scale(sx, sy),
            ("rotate", &[angle]) => Transform::rotate(angle),
            ("rotate", &[angle, cx, cy]) => Transform::translate(cx, cy)
                .compose(&Transform::rotate(angle))
                .compose(&Transform::translate(-cx, -cy)),
            ("skewX", &[angle]) => Transform::skew_x(angle),
            ("skewY", &[angle]) => Transform::skew_y(angle),
            _ => return Err(TransformSyntaxError { offset: name_start }),
        };
        result = result.compose(&t);
    }

    Ok(result)
}
