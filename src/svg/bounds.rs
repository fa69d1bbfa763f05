use super::types::Point;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Zero-size box at `p`
    pub fn at(p: Point) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Smallest box holding every point, `None` for an empty iterator
    pub fn of_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut points = points.into_iter();
        let mut bounds = Self::at(points.next()?);
        for p in points {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn min(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn max(&self) -> Point {
        Point::new(self.max_x, self.max_y)
    }
}
