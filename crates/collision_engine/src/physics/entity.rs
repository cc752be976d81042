//! Spatial entity contract
//!
//! Anything the game wants collision callbacks for implements
//! [`SpatialEntity`]. The game loop owns its entities as [`Collidable`]s;
//! the engine only ever keeps a non-owning [`EntityHandle`] to them, so an
//! entity's lifetime stays under the game loop's control.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bounds::Bounds;
use crate::physics::collision_layers::CollisionLayers;
use crate::spatial::Spatial;

/// Error type returned by a failing resolution callback
pub type ResolutionError = Box<dyn Error + Send + Sync>;

/// Capability every collidable entity exposes to the engine
pub trait SpatialEntity {
    /// Current bounds of the entity
    fn bounds(&self) -> Bounds;

    /// Called once for every partner this entity overlaps during a pass
    ///
    /// `other` is the partner's bounds at the time of the call. The entity is
    /// expected to adjust its own bounds here; the engine re-reads them when
    /// it puts the entity back into the index.
    fn resolve_collision(&mut self, other: Bounds) -> Result<(), ResolutionError>;

    /// Layers this entity sits on
    ///
    /// No layers by default, which every mask accepts.
    fn collision_layer(&self) -> CollisionLayers {
        CollisionLayers::empty()
    }

    /// Layers of partners this entity wants to be told about
    fn collision_mask(&self) -> CollisionLayers {
        CollisionLayers::ALL
    }

    /// Whether this entity should look for its own collisions this tick
    ///
    /// Entities that report `false` (static scenery, sleeping bodies) stay
    /// indexed and are still reported to others, but get no callbacks.
    fn is_dirty(&self) -> bool {
        true
    }
}

/// Shared, game-loop-owned entity as handed to the engine
pub type Collidable = Rc<RefCell<dyn SpatialEntity>>;

/// Wrap an entity so it can be registered with the engine
pub fn collidable<E: SpatialEntity + 'static>(entity: E) -> Collidable {
    Rc::new(RefCell::new(entity))
}

/// Reference identity of a collidable
///
/// Derived from the address of the shared allocation, so two handles are
/// equal only when they point at the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(usize);

impl EntityKey {
    /// Identity of the given collidable
    pub fn of(collidable: &Collidable) -> Self {
        Self(Rc::as_ptr(collidable).cast::<()>() as usize)
    }
}

/// Non-owning reference to a registered collidable
///
/// The weak reference keeps the allocation (but not the entity) around, so
/// a key can never be recycled while a handle to it exists.
#[derive(Clone)]
pub struct EntityHandle {
    key: EntityKey,
    entity: Weak<RefCell<dyn SpatialEntity>>,
}

impl EntityHandle {
    /// Create a handle to the given collidable
    pub fn new(collidable: &Collidable) -> Self {
        Self {
            key: EntityKey::of(collidable),
            entity: Rc::downgrade(collidable),
        }
    }

    /// Identity of the referenced entity
    pub const fn key(&self) -> EntityKey {
        self.key
    }

    /// Get the entity if the game loop still owns it
    pub fn upgrade(&self) -> Option<Collidable> {
        self.entity.upgrade()
    }

    /// Check whether the entity has been dropped
    pub fn is_detached(&self) -> bool {
        self.entity.strong_count() == 0
    }
}

impl Spatial for EntityHandle {
    type Key = EntityKey;

    fn key(&self) -> EntityKey {
        self.key
    }

    fn bounds(&self) -> Option<Bounds> {
        self.upgrade().map(|entity| entity.borrow().bounds())
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("key", &self.key)
            .field("detached", &self.is_detached())
            .finish()
    }
}
