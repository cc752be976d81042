//! Physics module for broad-phase collision detection and resolution
//!
//! Provides the spatial entity contract, collision layer filtering, and the
//! engine that keeps a quadtree in step with moving entities.

pub mod collision_engine;
pub mod collision_layers;
pub mod entity;

pub use collision_engine::{CollisionEngine, CollisionError, UpdateStats};
pub use collision_layers::CollisionLayers;
pub use entity::{collidable, Collidable, EntityHandle, EntityKey, ResolutionError, SpatialEntity};
