//! Axis-aligned bounding rectangle used for every overlap test
//!
//! Coordinates follow screen conventions: `(x, y)` is the upper-left
//! corner and `y` grows downward, so `top == y` and `bottom == y + height`.

use std::fmt;

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Point2, Vec2};

/// Axis-aligned bounding box (AABB) in world-space units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// X-coordinate of the upper-left corner
    pub x: f32,
    /// Y-coordinate of the upper-left corner
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Bounds {
    /// Create a new rectangle from its upper-left corner and size
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from a location and a size vector
    #[must_use]
    pub fn from_location_size(location: Point2, size: Vec2) -> Self {
        Self::new(location.x, location.y, size.x, size.y)
    }

    /// Create a rectangle of the given size centered on a point
    #[must_use]
    pub fn from_center(center: Point2, size: Vec2) -> Self {
        Self::new(center.x - size.x / 2.0, center.y - size.y / 2.0, size.x, size.y)
    }

    /// X-coordinate of the left edge
    #[must_use]
    pub const fn left(&self) -> f32 {
        self.x
    }

    /// Y-coordinate of the top edge
    #[must_use]
    pub const fn top(&self) -> f32 {
        self.y
    }

    /// X-coordinate of the right edge
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Y-coordinate of the bottom edge
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Upper-left corner
    #[must_use]
    pub fn location(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Width and height as a vector
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check whether the open interiors of two rectangles overlap
    ///
    /// Rectangles that only share an edge do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        other.x < self.right() && self.x < other.right() && other.y < self.bottom() && self.y < other.bottom()
    }

    /// Check whether `other` lies wholly inside this rectangle (edges inclusive)
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.x <= other.x && other.right() <= self.right() && self.y <= other.y && other.bottom() <= self.bottom()
    }

    /// Check whether a point lies inside this rectangle
    ///
    /// Endpoint exclusive: a point on the right or bottom edge is outside.
    #[must_use]
    pub fn contains_point(&self, point: Point2) -> bool {
        self.x <= point.x && point.x < self.right() && self.y <= point.y && point.y < self.bottom()
    }

    /// Copy of this rectangle moved by `delta`
    #[must_use]
    pub fn offset(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Copy of this rectangle moved so its upper-left corner sits at `location`
    #[must_use]
    pub fn with_location(&self, location: Point2) -> Self {
        Self::new(location.x, location.y, self.width, self.height)
    }

    /// Copy of this rectangle grown by `dx` on the left and right and `dy` on the top and bottom
    #[must_use]
    pub fn inflate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x - dx, self.y - dy, self.width + dx * 2.0, self.height + dy * 2.0)
    }

    /// Overlapping region of two rectangles
    ///
    /// Rectangles touching along an edge yield a zero-area result; disjoint
    /// rectangles yield `None`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        (right >= x && bottom >= y).then(|| Self::new(x, y, right - x, bottom - y))
    }

    /// Smallest rectangle enclosing both rectangles
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Self::new(x, y, right - x, bottom - y)
    }

    /// Split into four equal quadrants: top-left, top-right, bottom-left, bottom-right
    #[must_use]
    pub fn quadrants(&self) -> [Self; 4] {
        let half_width = self.width / 2.0;
        let half_height = self.height / 2.0;
        let center_x = self.x + half_width;
        let center_y = self.y + half_height;

        [
            Self::new(self.x, self.y, half_width, half_height),
            Self::new(center_x, self.y, half_width, half_height),
            Self::new(self.x, center_y, half_width, half_height),
            Self::new(center_x, center_y, half_width, half_height),
        ]
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X: {}, Y: {}, Width: {}, Height: {}", self.x, self.y, self.width, self.height)
    }
}

impl AbsDiffEq for Bounds {
    type Epsilon = f32;

    fn default_epsilon() -> Self::Epsilon {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon)
            && self.y.abs_diff_eq(&other.y, epsilon)
            && self.width.abs_diff_eq(&other.width, epsilon)
            && self.height.abs_diff_eq(&other.height, epsilon)
    }
}

impl RelativeEq for Bounds {
    fn default_max_relative() -> Self::Epsilon {
        f32::EPSILON
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
            && self.width.relative_eq(&other.width, epsilon, max_relative)
            && self.height.relative_eq(&other.height, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_intersects_overlapping() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 10.0, 10.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let right = Bounds::new(10.0, 0.0, 10.0, 10.0);
        let below = Bounds::new(0.0, 10.0, 10.0, 10.0);

        assert!(!a.intersects(&right));
        assert!(!a.intersects(&below));
    }

    #[test]
    fn test_contains_is_edge_inclusive() {
        let outer = Bounds::new(0.0, 0.0, 100.0, 100.0);

        assert!(outer.contains(&outer));
        assert!(outer.contains(&Bounds::new(90.0, 90.0, 10.0, 10.0)));
        assert!(!outer.contains(&Bounds::new(95.0, 95.0, 10.0, 10.0)));
        assert!(!outer.contains(&Bounds::new(-1.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_contains_point_excludes_far_edges() {
        let rect = Bounds::new(0.0, 0.0, 4.0, 4.0);

        assert!(rect.contains_point(Point2::new(0.0, 0.0)));
        assert!(rect.contains_point(Point2::new(3.9, 3.9)));
        assert!(!rect.contains_point(Point2::new(4.0, 2.0)));
        assert!(!rect.contains_point(Point2::new(2.0, 4.0)));
    }

    #[test]
    fn test_quadrants_tile_parent() {
        let parent = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let [tl, tr, bl, br] = parent.quadrants();

        assert_eq!(tl, Bounds::new(0.0, 0.0, 50.0, 25.0));
        assert_eq!(tr, Bounds::new(50.0, 0.0, 50.0, 25.0));
        assert_eq!(bl, Bounds::new(0.0, 25.0, 50.0, 25.0));
        assert_eq!(br, Bounds::new(50.0, 25.0, 50.0, 25.0));
        assert_eq!(tl.union(&br), parent);
    }

    #[test]
    fn test_intersection_and_union() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 10.0, 10.0);

        assert_eq!(a.intersection(&b), Some(Bounds::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.union(&b), Bounds::new(0.0, 0.0, 15.0, 15.0));
        assert_eq!(a.intersection(&Bounds::new(50.0, 50.0, 1.0, 1.0)), None);
    }

    #[test]
    fn test_offset_inflate_center() {
        let rect = Bounds::new(10.0, 20.0, 4.0, 6.0);

        assert_relative_eq!(rect.offset(Vec2::new(-10.0, 5.0)), Bounds::new(0.0, 25.0, 4.0, 6.0));
        assert_relative_eq!(rect.inflate(1.0, 2.0), Bounds::new(9.0, 18.0, 6.0, 10.0));
        assert_eq!(rect.center(), Point2::new(12.0, 23.0));
        assert_relative_eq!(Bounds::from_center(rect.center(), rect.size()), rect);
    }

    #[test]
    fn test_approximate_equality() {
        let a = Bounds::new(0.1 + 0.2, 0.0, 1.0, 1.0);
        let b = Bounds::new(0.3, 0.0, 1.0, 1.0);

        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    #[test]
    fn test_display() {
        let rect = Bounds::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(rect.to_string(), "X: 1, Y: 2, Width: 3, Height: 4");
    }
}
