//! Math utilities and types
//!
//! The collision engine works in 2D world space; everything here is a thin
//! alias over `nalgebra` so callers can pass vectors straight through.

pub use nalgebra::Vector2;

/// 2D vector type (offsets, sizes, velocities)
pub type Vec2 = Vector2<f32>;

/// 2D point type (locations, centers)
pub type Point2 = nalgebra::Point2<f32>;
