//! End-to-end resolution passes through the public API

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use collision_engine::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Test entity that records every partner it is told about
struct Tracker {
    bounds: Bounds,
    seen: Vec<Bounds>,
    nudge: Vec2,
    layer: CollisionLayers,
    mask: CollisionLayers,
    dirty: bool,
    jammed: Rc<Cell<bool>>,
}

impl Tracker {
    fn at(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            bounds: Bounds::new(x, y, width, height),
            seen: Vec::new(),
            nudge: Vec2::zeros(),
            layer: CollisionLayers::empty(),
            mask: CollisionLayers::ALL,
            dirty: true,
            jammed: Rc::new(Cell::new(false)),
        }
    }

    fn nudged(mut self, dx: f32, dy: f32) -> Self {
        self.nudge = Vec2::new(dx, dy);
        self
    }

    fn on(mut self, layer: CollisionLayers, mask: CollisionLayers) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    fn resting(mut self) -> Self {
        self.dirty = false;
        self
    }

    fn jammed_by(mut self, flag: &Rc<Cell<bool>>) -> Self {
        self.jammed = Rc::clone(flag);
        self
    }
}

impl SpatialEntity for Tracker {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn resolve_collision(&mut self, other: Bounds) -> Result<(), ResolutionError> {
        if self.jammed.get() {
            return Err("tracker jammed".into());
        }
        self.seen.push(other);
        self.bounds = self.bounds.offset(self.nudge);
        Ok(())
    }

    fn collision_layer(&self) -> CollisionLayers {
        self.layer
    }

    fn collision_mask(&self) -> CollisionLayers {
        self.mask
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn spawn(engine: &mut CollisionEngine, tracker: Tracker) -> (Rc<RefCell<Tracker>>, Collidable) {
    let typed = Rc::new(RefCell::new(tracker));
    let shared: Collidable = typed.clone();
    assert!(engine.add_collidable(&shared).unwrap());
    (typed, shared)
}

fn world() -> Bounds {
    Bounds::new(0.0, 0.0, 100.0, 100.0)
}

#[test]
fn add_then_remove_leaves_nothing_behind() {
    let mut engine = CollisionEngine::new(world());
    let (_, a) = spawn(&mut engine, Tracker::at(10.0, 10.0, 5.0, 5.0));

    assert!(engine.contains(&a));
    assert_eq!(engine.find_collisions(&Bounds::new(12.0, 12.0, 1.0, 1.0)).len(), 1);

    assert!(engine.remove_collidable(&a));
    assert!(!engine.remove_collidable(&a));

    assert!(engine.is_empty());
    assert!(engine.quadtree().is_empty());
    assert!(engine.find_collisions(&Bounds::new(12.0, 12.0, 1.0, 1.0)).is_empty());
}

#[test]
fn repeated_registration_is_ignored() {
    let mut engine = CollisionEngine::new(world());
    let (tracker, a) = spawn(&mut engine, Tracker::at(10.0, 10.0, 5.0, 5.0));

    assert!(!engine.add_collidable(&a).unwrap());
    let stats = engine.update().unwrap();

    assert_eq!(engine.len(), 1);
    assert_eq!(stats.processed, 1);
    assert!(tracker.borrow().seen.is_empty());
}

#[test]
fn lone_entity_never_collides_with_itself() {
    let mut engine = CollisionEngine::new(world());
    let (tracker, _a) = spawn(&mut engine, Tracker::at(40.0, 40.0, 20.0, 20.0));

    let stats = engine.update().unwrap();

    assert_eq!(stats.resolutions, 0);
    assert!(tracker.borrow().seen.is_empty());
}

#[test]
fn later_entities_see_corrected_bounds() {
    let mut engine = CollisionEngine::new(world());
    let (a, _a) = spawn(&mut engine, Tracker::at(0.0, 0.0, 10.0, 10.0).nudged(1.0, 1.0));
    let (b, _b) = spawn(&mut engine, Tracker::at(5.0, 5.0, 10.0, 10.0));

    let stats = engine.update().unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.resolutions, 2);
    assert_eq!(a.borrow().seen, vec![Bounds::new(5.0, 5.0, 10.0, 10.0)]);
    assert_eq!(b.borrow().seen, vec![Bounds::new(1.0, 1.0, 10.0, 10.0)]);
}

#[test]
fn moved_entities_are_reindexed() {
    let mut engine = CollisionEngine::with_config(world(), QuadtreeConfig::default().with_bucket_capacity(2));
    let (_, a) = spawn(&mut engine, Tracker::at(10.0, 10.0, 4.0, 4.0).nudged(60.0, 60.0));
    let (_, _b) = spawn(&mut engine, Tracker::at(12.0, 12.0, 4.0, 4.0));
    let _crowd: Vec<Collidable> = (0..6)
        .map(|i| spawn(&mut engine, Tracker::at(30.0 + i as f32 * 10.0, 5.0, 2.0, 2.0)).1)
        .collect();

    engine.update().unwrap();

    let found = engine.find_collisions(&Bounds::new(71.0, 71.0, 1.0, 1.0));
    assert_eq!(found.len(), 1);
    assert!(Rc::ptr_eq(&found[0], &a));
    assert!(engine.quadtree().contains(&EntityHandle::new(&a)));
    assert_eq!(engine.quadtree().len(), engine.len());
}

#[test]
fn entities_moved_between_ticks_are_found_where_they_are() {
    let mut engine = CollisionEngine::with_config(world(), QuadtreeConfig::default().with_bucket_capacity(1));
    let (a, _a) = spawn(&mut engine, Tracker::at(10.0, 10.0, 5.0, 5.0));
    let (b, _b) = spawn(&mut engine, Tracker::at(70.0, 70.0, 5.0, 5.0));
    let (_, _c) = spawn(&mut engine, Tracker::at(85.0, 85.0, 5.0, 5.0));

    b.borrow_mut().bounds = Bounds::new(12.0, 12.0, 5.0, 5.0);
    let stats = engine.update().unwrap();

    assert_eq!(stats.refiled, 1);
    assert_eq!(a.borrow().seen, vec![Bounds::new(12.0, 12.0, 5.0, 5.0)]);
    assert_eq!(b.borrow().seen, vec![Bounds::new(10.0, 10.0, 5.0, 5.0)]);
    assert_eq!(engine.find_collisions(&Bounds::new(16.0, 16.0, 1.0, 1.0)).len(), 1);
}

#[test]
fn sync_catches_moves_outside_a_pass() {
    let mut engine = CollisionEngine::with_config(world(), QuadtreeConfig::default().with_bucket_capacity(1));
    let (_, _a) = spawn(&mut engine, Tracker::at(10.0, 10.0, 5.0, 5.0));
    let (b, b_dyn) = spawn(&mut engine, Tracker::at(70.0, 70.0, 5.0, 5.0));
    let (_, _c) = spawn(&mut engine, Tracker::at(85.0, 85.0, 5.0, 5.0));

    b.borrow_mut().bounds = Bounds::new(30.0, 60.0, 5.0, 5.0);

    assert_eq!(engine.sync().unwrap(), 1);
    let found = engine.find_collisions(&Bounds::new(31.0, 61.0, 1.0, 1.0));
    assert_eq!(found.len(), 1);
    assert!(Rc::ptr_eq(&found[0], &b_dyn));
    assert_eq!(engine.sync().unwrap(), 0);
}

#[test]
fn clean_entities_are_reported_but_not_checked() {
    let mut engine = CollisionEngine::new(world());
    let (wall, _wall) = spawn(&mut engine, Tracker::at(20.0, 0.0, 10.0, 100.0).resting());
    let (ball, _ball) = spawn(&mut engine, Tracker::at(25.0, 40.0, 10.0, 10.0));

    let stats = engine.update().unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.resolutions, 1);
    assert!(wall.borrow().seen.is_empty());
    assert_eq!(ball.borrow().seen, vec![Bounds::new(20.0, 0.0, 10.0, 100.0)]);
    assert_eq!(engine.quadtree().len(), 2);
}

#[test]
fn entities_outside_the_world_still_collide() {
    let mut engine = CollisionEngine::new(world());
    let (a, _a) = spawn(&mut engine, Tracker::at(200.0, 200.0, 10.0, 10.0));
    let (b, _b) = spawn(&mut engine, Tracker::at(205.0, 205.0, 10.0, 10.0));

    let stats = engine.update().unwrap();

    assert_eq!(stats.resolutions, 2);
    assert_eq!(a.borrow().seen, vec![Bounds::new(205.0, 205.0, 10.0, 10.0)]);
    assert_eq!(b.borrow().seen, vec![Bounds::new(200.0, 200.0, 10.0, 10.0)]);
}

#[test]
fn failing_callback_stops_the_pass_and_keeps_the_index_whole() {
    let mut engine = CollisionEngine::new(world());
    let jam = Rc::new(Cell::new(true));
    let (a, a_dyn) = spawn(&mut engine, Tracker::at(10.0, 10.0, 10.0, 10.0));
    let (_, b_dyn) = spawn(&mut engine, Tracker::at(12.0, 12.0, 10.0, 10.0).jammed_by(&jam));
    let (c, c_dyn) = spawn(&mut engine, Tracker::at(14.0, 14.0, 10.0, 10.0));

    let err = engine.update().unwrap_err();

    match err {
        CollisionError::Resolution { entity, .. } => assert_eq!(entity, EntityKey::of(&b_dyn)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(a.borrow().seen.len(), 2);
    assert!(c.borrow().seen.is_empty());

    assert_eq!(engine.len(), 3);
    assert_eq!(engine.quadtree().len(), 3);
    for entity in [&a_dyn, &b_dyn, &c_dyn] {
        assert!(engine.quadtree().contains(&EntityHandle::new(entity)));
    }

    jam.set(false);
    let stats = engine.update().unwrap();
    assert_eq!(stats.processed, 3);
    assert_eq!(c.borrow().seen.len(), 2);
}

#[test]
fn dropped_entities_are_purged() {
    let mut engine = CollisionEngine::new(world());
    let (survivor, _keep) = spawn(&mut engine, Tracker::at(10.0, 10.0, 10.0, 10.0));
    {
        let (_, gone) = spawn(&mut engine, Tracker::at(12.0, 12.0, 10.0, 10.0));
        drop(gone);
    }

    let stats = engine.update().unwrap();

    assert_eq!(stats.purged, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.quadtree().len(), 1);
    assert!(survivor.borrow().seen.is_empty());
}

#[test]
fn masks_filter_partners_one_way() {
    let mut engine = CollisionEngine::new(world());
    let (bullet, _bullet) = spawn(
        &mut engine,
        Tracker::at(10.0, 10.0, 10.0, 10.0).on(CollisionLayers::PROJECTILE, CollisionLayers::ENEMY),
    );
    let (enemy, _enemy) = spawn(
        &mut engine,
        Tracker::at(12.0, 12.0, 10.0, 10.0).on(CollisionLayers::ENEMY, CollisionLayers::ALL),
    );
    let (coin, _coin) = spawn(
        &mut engine,
        Tracker::at(14.0, 14.0, 10.0, 10.0).on(CollisionLayers::PICKUP, CollisionLayers::PLAYER),
    );

    let stats = engine.update().unwrap();

    assert_eq!(bullet.borrow().seen, vec![Bounds::new(12.0, 12.0, 10.0, 10.0)]);
    assert_eq!(enemy.borrow().seen.len(), 2);
    assert!(coin.borrow().seen.is_empty());
    assert_eq!(stats.resolutions, 3);
}

#[test]
fn masks_must_cover_every_partner_layer() {
    let mut engine = CollisionEngine::new(world());
    let (hunter, _hunter) = spawn(
        &mut engine,
        Tracker::at(10.0, 10.0, 10.0, 10.0).on(CollisionLayers::PLAYER, CollisionLayers::ENEMY),
    );
    let (_, _carrier) = spawn(
        &mut engine,
        Tracker::at(12.0, 12.0, 5.0, 5.0).on(CollisionLayers::ENEMY | CollisionLayers::PICKUP, CollisionLayers::ALL),
    );
    let (_, _plain) = spawn(&mut engine, Tracker::at(14.0, 14.0, 5.0, 5.0));

    engine.update().unwrap();

    assert_eq!(hunter.borrow().seen, vec![Bounds::new(14.0, 14.0, 5.0, 5.0)]);
}

#[test]
fn query_work_grows_slower_than_population() {
    fn average_tests(count: usize) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let world = Bounds::new(0.0, 0.0, 1000.0, 1000.0);
        let mut engine = CollisionEngine::new(world);
        let mut owned = Vec::with_capacity(count);
        for _ in 0..count {
            let tracker = Tracker::at(rng.gen_range(0.0..998.0), rng.gen_range(0.0..998.0), 2.0, 2.0);
            let shared: Collidable = Rc::new(RefCell::new(tracker));
            engine.add_collidable(&shared).unwrap();
            owned.push(shared);
        }

        let queries = 200;
        let tested: usize = (0..queries)
            .map(|_| {
                let query = Bounds::new(rng.gen_range(0.0..996.0), rng.gen_range(0.0..996.0), 4.0, 4.0);
                engine.quadtree().query_stats(&query).items_tested
            })
            .sum();
        tested as f64 / f64::from(queries)
    }

    let small = average_tests(500);
    let large = average_tests(4000);

    assert!(large < small * 4.0, "500 -> {small}, 4000 -> {large}");
    assert!(large < 4000.0 * 0.05, "4000 -> {large}");
}
