//! Spatial partitioning data structures
//!
//! Provides the hierarchical index used by broad-phase collision
//! detection to cull pairs that cannot possibly overlap.

mod quadtree;

pub use quadtree::{Quadtree, QuadtreeConfig, QuadtreeError, QuadtreeNode, QueryStats, Spatial};
