//! Pixel space rectangles

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Integer pixel bounding box, both corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box2I {
    pub min: Point2<i32>,
    pub max: Point2<i32>,
}
impl Box2I {
    pub fn new(min: Point2<i32>, max: Point2<i32>) -> Self {
        Self { min, max }
    }
    /// Bounding box of a `width` x `height` pixel array starting at pixel (0,0)
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self {
            min: Point2::new(0, 0),
            max: Point2::new(width as i32 - 1, height as i32 - 1),
        }
    }
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }
    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }
    /// Swaps the x and y axis of both corners
    pub fn transposed(&self) -> Self {
        Self {
            min: Point2::new(self.min.y, self.min.x),
            max: Point2::new(self.max.y, self.max.x),
        }
    }
    /// Returns the pixel edges corners, counter-clockwise from the minimum corner
    pub fn edge_corners(&self) -> [Point2<f64>; 4] {
        let (x0, y0) = (self.min.x as f64 - 0.5, self.min.y as f64 - 0.5);
        let (x1, y1) = (self.max.x as f64 + 0.5, self.max.y as f64 + 0.5);
        [
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }
    /// Checks if a point falls within the pixel edges of the box
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x as f64 - 0.5
            && point.x <= self.max.x as f64 + 0.5
            && point.y >= self.min.y as f64 - 0.5
            && point.y <= self.max.y as f64 + 0.5
    }
}

/// Minimum and maximum pixel values of a detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}
impl PixelBounds {
    /// Smallest bounds enclosing all the points
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point2<f64>>) -> Self {
        points.into_iter().fold(
            Self {
                xmin: f64::INFINITY,
                xmax: f64::NEG_INFINITY,
                ymin: f64::INFINITY,
                ymax: f64::NEG_INFINITY,
            },
            |b, p| Self {
                xmin: b.xmin.min(p.x),
                xmax: b.xmax.max(p.x),
                ymin: b.ymin.min(p.y),
                ymax: b.ymax.max(p.y),
            },
        )
    }
    /// Swaps the (xmin,xmax) pair with the (ymin,ymax) pair
    pub fn transposed(&self) -> Self {
        Self {
            xmin: self.ymin,
            xmax: self.ymax,
            ymin: self.xmin,
            ymax: self.xmax,
        }
    }
    /// Returns `(xmin, xmax, ymin, ymax)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.xmax, self.ymin, self.ymax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_dimensions() {
        let bbox = Box2I::from_dimensions(4072, 4000);
        assert_eq!(bbox.max, Point2::new(4071, 3999));
        assert_eq!((bbox.width(), bbox.height()), (4072, 4000));
        let t = bbox.transposed();
        assert_eq!((t.width(), t.height()), (4000, 4072));
    }

    #[test]
    fn box_contains_pixel_edges() {
        let bbox = Box2I::from_dimensions(10, 20);
        assert!(bbox.contains(&Point2::new(-0.5, 19.5)));
        assert!(!bbox.contains(&Point2::new(9.6, 0.)));
        assert!(!bbox.contains(&Point2::new(f64::NAN, 0.)));
    }

    #[test]
    fn enclosing_bounds() {
        let points = [
            Point2::new(1., -2.),
            Point2::new(-3., 4.),
            Point2::new(0.5, 0.5),
        ];
        let b = PixelBounds::enclosing(&points);
        assert_eq!(b.as_tuple(), (-3., 1., -2., 4.));
        assert_eq!(b.transposed().as_tuple(), (-2., 4., -3., 1.));
    }
}
