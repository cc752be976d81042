//! # Collision Engine
//!
//! Broad-phase 2D collision detection and resolution for games, built on a
//! region quadtree.
//!
//! ## Features
//!
//! - **Quadtree Index**: Adaptive subdivision with merge-on-remove
//! - **Resolution Pass**: Sequential remove/query/resolve/reinsert per tick
//! - **Collision Layers**: Bitmask filtering of which partners an entity hears about
//! - **Configuration**: TOML and RON settings files
//!
//! ## Quick Start
//!
//! ```rust
//! use collision_engine::prelude::*;
//!
//! struct Ball {
//!     bounds: Bounds,
//! }
//!
//! impl SpatialEntity for Ball {
//!     fn bounds(&self) -> Bounds {
//!         self.bounds
//!     }
//!
//!     fn resolve_collision(&mut self, other: Bounds) -> Result<(), ResolutionError> {
//!         // Step back out of the partner along x
//!         if self.bounds.x < other.x {
//!             self.bounds.x = other.left() - self.bounds.width;
//!         } else {
//!             self.bounds.x = other.right();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), CollisionError> {
//!     let mut engine = CollisionEngine::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
//!
//!     let a = collidable(Ball { bounds: Bounds::new(10.0, 10.0, 10.0, 10.0) });
//!     let b = collidable(Ball { bounds: Bounds::new(15.0, 10.0, 10.0, 10.0) });
//!     engine.add_collidable(&a)?;
//!     engine.add_collidable(&b)?;
//!
//!     let stats = engine.update()?;
//!     assert_eq!(stats.processed, 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod bounds;
pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;

pub use bounds::Bounds;
pub use config::{CollisionConfig, Config, ConfigError, ConfigFormat};
pub use physics::{CollisionEngine, CollisionError, UpdateStats};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        bounds::Bounds,
        config::{CollisionConfig, Config, ConfigError, ConfigFormat},
        foundation::math::{Point2, Vec2},
        physics::{
            collidable, Collidable, CollisionEngine, CollisionError, CollisionLayers,
            EntityHandle, EntityKey, ResolutionError, SpatialEntity, UpdateStats,
        },
        spatial::{Quadtree, QuadtreeConfig, QuadtreeError, QueryStats, Spatial},
    };
}
