//! Broad-phase collision engine
//!
//! Owns the quadtree and the registry of active collidables and runs one
//! resolution pass per tick. Entities the game moved since the last pass are
//! first filed again under their new bounds, then every dirty entity goes
//! through these steps in registration order:
//!
//! 1. take the entity out of the tree,
//! 2. query the tree with the entity's bounds (so it can never find itself),
//! 3. tell the entity about every partner it overlaps,
//! 4. put it back using whatever bounds it has after step 3.
//!
//! The pass is sequential and in place. An entity processed later in a tick
//! sees the already-corrected bounds of the entities before it and the
//! stale bounds of the ones after it, so outcomes depend on registration
//! order. That is a single relaxation pass, not a simultaneous solve.

use std::collections::HashSet;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::bounds::Bounds;
use crate::config::CollisionConfig;
use crate::physics::entity::{Collidable, EntityHandle, EntityKey, ResolutionError};
use crate::spatial::{Quadtree, QuadtreeConfig, QuadtreeError};

/// Collision engine errors
#[derive(Error, Debug)]
pub enum CollisionError {
    /// The spatial index refused a collidable
    #[error("quadtree rejected collidable: {0}")]
    Index(#[from] QuadtreeError),

    /// A resolution callback failed; the pass stopped at this entity
    #[error("collision resolution failed for {entity:?}: {source}")]
    Resolution {
        /// Entity whose callback failed
        entity: EntityKey,
        /// Error returned by the callback
        #[source]
        source: ResolutionError,
    },
}

/// Summary of one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Collidables that went through remove/query/resolve/reinsert
    pub processed: usize,
    /// Collidables that reported themselves clean and were left in place
    pub skipped: usize,
    /// Collidables moved to a different node because the game moved them
    pub refiled: usize,
    /// Resolution callbacks invoked
    pub resolutions: usize,
    /// Handles dropped because their entity no longer exists
    pub purged: usize,
}

/// Quadtree-backed broad-phase collision engine
#[derive(Debug)]
pub struct CollisionEngine {
    tree: Quadtree<EntityHandle>,

    /// Registration order, which is also the processing order of a pass
    registry: Vec<EntityHandle>,

    /// Membership index over `registry`
    members: HashSet<EntityKey>,
}

impl CollisionEngine {
    /// Create an engine whose index covers `world`
    pub fn new(world: Bounds) -> Self {
        Self::with_config(world, QuadtreeConfig::default())
    }

    /// Create an engine with a custom quadtree configuration
    ///
    /// Out-of-region collidables are always accepted: they are kept at the
    /// root rather than being lost near the world edges.
    pub fn with_config(world: Bounds, config: QuadtreeConfig) -> Self {
        let config = config.with_out_of_bounds(true);
        debug!(
            "Creating collision engine over {} (bucket capacity {}, max depth {})",
            world, config.bucket_capacity, config.max_depth
        );

        Self {
            tree: Quadtree::with_config(world, config),
            registry: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Create an engine from a loaded configuration
    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::with_config(config.world, config.quadtree)
    }

    /// Register a collidable and index it
    ///
    /// Returns `Ok(false)` without touching anything if the same instance is
    /// already registered.
    pub fn add_collidable(&mut self, collidable: &Collidable) -> Result<bool, CollisionError> {
        let handle = EntityHandle::new(collidable);
        let key = handle.key();

        if self.members.contains(&key) {
            debug!("Collidable {:?} is already registered", key);
            return Ok(false);
        }

        self.tree.insert(handle.clone())?;
        self.members.insert(key);
        self.registry.push(handle);
        Ok(true)
    }

    /// Unregister a collidable and drop it from the index
    ///
    /// Returns `false` if it was not registered.
    pub fn remove_collidable(&mut self, collidable: &Collidable) -> bool {
        let key = EntityKey::of(collidable);
        if !self.members.remove(&key) {
            debug!("Collidable {:?} is not registered", key);
            return false;
        }

        if let Some(index) = self.registry.iter().position(|handle| handle.key() == key) {
            let handle = self.registry.remove(index);
            self.tree.remove(&handle);
        }
        true
    }

    /// Unregister every collidable
    pub fn clear(&mut self) {
        debug!("Clearing {} collidables", self.registry.len());
        self.tree.clear();
        self.registry.clear();
        self.members.clear();
    }

    /// File every live collidable under its current bounds
    ///
    /// Called at the start of every [`update`](Self::update). Call it directly
    /// to query with [`find_collisions`](Self::find_collisions) after moving
    /// entities outside a pass. Returns how many collidables changed node.
    pub fn sync(&mut self) -> Result<usize, CollisionError> {
        let mut refiled = 0;
        for handle in &self.registry {
            if self.tree.refresh(handle)? {
                refiled += 1;
            }
        }

        if refiled > 0 {
            trace!("Refiled {} moved collidables", refiled);
        }
        Ok(refiled)
    }

    /// Run one resolution pass over every collidable in registration order
    ///
    /// Collidables whose [`is_dirty`](crate::physics::SpatialEntity::is_dirty) is `false` keep
    /// their place in the index and are still reported to others, but are
    /// not checked themselves.
    ///
    /// The first failing callback stops the pass and its error is returned.
    /// The failing entity is put back into the index before returning, so the
    /// registry and the tree agree again once this call is over; entities
    /// after it are simply not processed this tick.
    pub fn update(&mut self) -> Result<UpdateStats, CollisionError> {
        let mut stats = UpdateStats {
            refiled: self.sync()?,
            ..UpdateStats::default()
        };
        let mut index = 0;

        while index < self.registry.len() {
            let handle = self.registry[index].clone();

            let Some(subject) = handle.upgrade() else {
                warn!("Purging collidable {:?}: dropped without being removed", handle.key());
                self.tree.remove(&handle);
                self.members.remove(&handle.key());
                self.registry.remove(index);
                stats.purged += 1;
                continue;
            };

            if !subject.borrow().is_dirty() {
                stats.skipped += 1;
                index += 1;
                continue;
            }

            self.tree.remove(&handle);
            let resolved = self.resolve(&handle, &subject);
            self.tree.insert(handle)?;

            stats.resolutions += resolved?;
            stats.processed += 1;
            index += 1;
        }

        trace!(
            "Resolution pass: {} processed, {} skipped, {} resolutions, {} purged",
            stats.processed,
            stats.skipped,
            stats.resolutions,
            stats.purged
        );
        Ok(stats)
    }

    /// Notify `subject` of every indexed partner it overlaps
    fn resolve(&self, handle: &EntityHandle, subject: &Collidable) -> Result<usize, CollisionError> {
        let (bounds, mask) = {
            let entity = subject.borrow();
            (entity.bounds(), entity.collision_mask())
        };

        let mut resolutions = 0;
        for partner in self.tree.find_collisions(&bounds) {
            let Some(partner) = partner.upgrade() else {
                continue;
            };
            let (partner_bounds, layer) = {
                let entity = partner.borrow();
                (entity.bounds(), entity.collision_layer())
            };
            if !mask.accepts(layer) {
                continue;
            }

            subject
                .borrow_mut()
                .resolve_collision(partner_bounds)
                .map_err(|source| CollisionError::Resolution {
                    entity: handle.key(),
                    source,
                })?;
            resolutions += 1;
        }

        if resolutions > 0 {
            trace!("{:?} resolved {} collisions at {}", handle.key(), resolutions, bounds);
        }
        Ok(resolutions)
    }

    /// Find every live registered collidable overlapping `bounds`
    ///
    /// The index reflects positions as of the last [`update`](Self::update)
    /// or [`sync`](Self::sync).
    pub fn find_collisions(&self, bounds: &Bounds) -> Vec<Collidable> {
        self.tree
            .find_collisions(bounds)
            .iter()
            .filter_map(EntityHandle::upgrade)
            .collect()
    }

    /// Check whether this exact instance is registered
    pub fn contains(&self, collidable: &Collidable) -> bool {
        self.members.contains(&EntityKey::of(collidable))
    }

    /// Number of registered collidables
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Live registered collidables in registration order
    pub fn collidables(&self) -> Vec<Collidable> {
        self.registry.iter().filter_map(EntityHandle::upgrade).collect()
    }

    /// Read-only access to the index (for visualization and diagnostics)
    pub const fn quadtree(&self) -> &Quadtree<EntityHandle> {
        &self.tree
    }

    /// World region covered by the index
    pub const fn world(&self) -> Bounds {
        self.tree.region()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::entity::{collidable, SpatialEntity};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Crate {
        bounds: Bounds,
        hits: Vec<Bounds>,
    }

    impl Crate {
        fn shared(x: f32, y: f32, width: f32, height: f32) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                bounds: Bounds::new(x, y, width, height),
                hits: Vec::new(),
            }))
        }
    }

    impl SpatialEntity for Crate {
        fn bounds(&self) -> Bounds {
            self.bounds
        }

        fn resolve_collision(&mut self, other: Bounds) -> Result<(), ResolutionError> {
            self.hits.push(other);
            Ok(())
        }
    }

    fn world() -> Bounds {
        Bounds::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut engine = CollisionEngine::new(world());
        let a: Collidable = Crate::shared(1.0, 1.0, 5.0, 5.0);

        assert!(engine.add_collidable(&a).unwrap());
        assert!(!engine.add_collidable(&a).unwrap());

        assert_eq!(engine.len(), 1);
        assert_eq!(engine.quadtree().len(), 1);
    }

    #[test]
    fn test_remove_unregistered_is_noop() {
        let mut engine = CollisionEngine::new(world());
        let a: Collidable = Crate::shared(1.0, 1.0, 5.0, 5.0);
        let stranger: Collidable = Crate::shared(1.0, 1.0, 5.0, 5.0);
        engine.add_collidable(&a).unwrap();

        assert!(!engine.remove_collidable(&stranger));
        assert_eq!(engine.len(), 1);
        assert!(engine.contains(&a));
        assert!(!engine.contains(&stranger));
    }

    #[test]
    fn test_equal_bounds_are_distinct_entities() {
        let mut engine = CollisionEngine::new(world());
        let a = Crate::shared(10.0, 10.0, 5.0, 5.0);
        let b = Crate::shared(10.0, 10.0, 5.0, 5.0);
        let (a_dyn, b_dyn): (Collidable, Collidable) = (a.clone(), b.clone());
        engine.add_collidable(&a_dyn).unwrap();
        engine.add_collidable(&b_dyn).unwrap();

        let stats = engine.update().unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.resolutions, 2);
        assert_eq!(a.borrow().hits, vec![Bounds::new(10.0, 10.0, 5.0, 5.0)]);
        assert_eq!(b.borrow().hits, vec![Bounds::new(10.0, 10.0, 5.0, 5.0)]);
    }

    #[test]
    fn test_update_keeps_index_in_lockstep() {
        let mut engine = CollisionEngine::with_config(world(), QuadtreeConfig::default().with_bucket_capacity(2));
        let crates: Vec<Collidable> = (0..12)
            .map(|i| Crate::shared(i as f32 * 8.0, i as f32 * 8.0, 4.0, 4.0) as Collidable)
            .collect();
        for c in &crates {
            engine.add_collidable(c).unwrap();
        }

        engine.update().unwrap();
        engine.update().unwrap();

        assert_eq!(engine.quadtree().len(), crates.len());
        for c in &crates {
            assert!(engine.quadtree().contains(&EntityHandle::new(c)));
        }
    }

    #[test]
    fn test_find_collisions_returns_live_entities() {
        let mut engine = CollisionEngine::new(world());
        let a: Collidable = collidable(Crate {
            bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
            hits: Vec::new(),
        });
        engine.add_collidable(&a).unwrap();

        let found = engine.find_collisions(&Bounds::new(5.0, 5.0, 1.0, 1.0));

        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &a));
        assert!(engine.find_collisions(&Bounds::new(50.0, 50.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut engine = CollisionEngine::new(world());
        let a: Collidable = Crate::shared(1.0, 1.0, 5.0, 5.0);
        engine.add_collidable(&a).unwrap();

        engine.clear();

        assert!(engine.is_empty());
        assert!(engine.quadtree().is_empty());
        assert!(!engine.contains(&a));
        assert_eq!(engine.world(), world());
    }
}
