//! Arena Collision Demo
//!
//! Headless simulation of boxes drifting around a walled arena:
//! - Boxes move every tick and bounce off the arena walls
//! - The collision engine pushes overlapping boxes apart
//! - Boxes are periodically despawned and respawned, some of them dropped
//!   without unregistering so the engine has to purge them
//!
//! Usage: `arena_demo [config.toml|config.ron]`

use std::cell::RefCell;
use std::rc::Rc;

use collision_engine::foundation::logging;
use collision_engine::prelude::*;
use log::{debug, info};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use slotmap::{new_key_type, SlotMap};

// Simulation settings
const NUM_BOXES: usize = 300;
const TICKS: u32 = 600;
const DT: f32 = 1.0 / 60.0;
const REPORT_INTERVAL: u32 = 60;

// Box settings
const MIN_SIZE: f32 = 4.0;
const MAX_SIZE: f32 = 16.0;
const MAX_SPEED: f32 = 120.0;

// Churn: every CHURN_INTERVAL ticks, CHURN_COUNT boxes leave and as many arrive
const CHURN_INTERVAL: u32 = 120;
const CHURN_COUNT: usize = 20;

new_key_type! {
    /// Key of a box owned by the arena
    struct BoxKey;
}

struct ArenaBox {
    bounds: Bounds,
    velocity: Vec2,
    contacts: u32,
}

impl ArenaBox {
    /// Advance by one tick and bounce off the arena walls
    fn step(&mut self, dt: f32, arena: &Bounds) {
        self.bounds = self.bounds.offset(self.velocity * dt);

        if self.bounds.left() < arena.left() {
            self.bounds.x = arena.left();
            self.velocity.x = self.velocity.x.abs();
        } else if self.bounds.right() > arena.right() {
            self.bounds.x = arena.right() - self.bounds.width;
            self.velocity.x = -self.velocity.x.abs();
        }

        if self.bounds.top() < arena.top() {
            self.bounds.y = arena.top();
            self.velocity.y = self.velocity.y.abs();
        } else if self.bounds.bottom() > arena.bottom() {
            self.bounds.y = arena.bottom() - self.bounds.height;
            self.velocity.y = -self.velocity.y.abs();
        }
    }
}

impl SpatialEntity for ArenaBox {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn resolve_collision(&mut self, other: Bounds) -> Result<(), ResolutionError> {
        let Some(overlap) = self.bounds.intersection(&other) else {
            return Ok(());
        };
        let away = self.bounds.center() - other.center();

        // Push out along the axis of least penetration
        if overlap.width < overlap.height {
            let push = if away.x < 0.0 { -overlap.width } else { overlap.width };
            self.bounds = self.bounds.offset(Vec2::new(push, 0.0));
            self.velocity.x = push.signum() * self.velocity.x.abs();
        } else {
            let push = if away.y < 0.0 { -overlap.height } else { overlap.height };
            self.bounds = self.bounds.offset(Vec2::new(0.0, push));
            self.velocity.y = push.signum() * self.velocity.y.abs();
        }

        self.contacts += 1;
        Ok(())
    }
}

struct Arena {
    engine: CollisionEngine,
    boxes: SlotMap<BoxKey, Rc<RefCell<ArenaBox>>>,
    rng: ThreadRng,
}

impl Arena {
    fn new(config: &CollisionConfig) -> Self {
        Self {
            engine: CollisionEngine::from_config(config),
            boxes: SlotMap::with_key(),
            rng: rand::thread_rng(),
        }
    }

    fn spawn_box(&mut self) -> Result<BoxKey, CollisionError> {
        let arena = self.engine.world();
        let size = self.rng.gen_range(MIN_SIZE..MAX_SIZE);
        let bounds = Bounds::new(
            self.rng.gen_range(arena.left()..arena.right() - size),
            self.rng.gen_range(arena.top()..arena.bottom() - size),
            size,
            size,
        );
        let velocity = Vec2::new(
            self.rng.gen_range(-MAX_SPEED..MAX_SPEED),
            self.rng.gen_range(-MAX_SPEED..MAX_SPEED),
        );

        let arena_box = Rc::new(RefCell::new(ArenaBox {
            bounds,
            velocity,
            contacts: 0,
        }));
        let shared: Collidable = arena_box.clone();
        self.engine.add_collidable(&shared)?;
        Ok(self.boxes.insert(arena_box))
    }

    /// Despawn a random handful of boxes and spawn replacements
    ///
    /// Every other departing box is dropped without being unregistered; the
    /// engine notices on its next pass.
    fn churn(&mut self) -> Result<(), CollisionError> {
        let keys: Vec<BoxKey> = self.boxes.keys().collect();
        let leaving: Vec<BoxKey> = keys.choose_multiple(&mut self.rng, CHURN_COUNT).copied().collect();

        for (i, key) in leaving.into_iter().enumerate() {
            let Some(arena_box) = self.boxes.remove(key) else {
                continue;
            };
            if i % 2 == 0 {
                let shared: Collidable = arena_box;
                self.engine.remove_collidable(&shared);
            }
        }

        for _ in 0..CHURN_COUNT {
            self.spawn_box()?;
        }
        debug!("Churned {} boxes, {} registered", CHURN_COUNT, self.engine.len());
        Ok(())
    }

    fn step(&mut self, dt: f32) {
        let arena = self.engine.world();
        for arena_box in self.boxes.values() {
            arena_box.borrow_mut().step(dt, &arena);
        }
    }

    fn report(&self, tick: u32, stats: &UpdateStats) {
        let tree = self.engine.quadtree();
        info!(
            "tick {:>4}: {} boxes, {} refiled, {} resolutions, {} purged, tree depth {}, {} leaves",
            tick,
            stats.processed,
            stats.refiled,
            stats.resolutions,
            stats.purged,
            tree.depth(),
            tree.leaves().len()
        );
    }
}

fn load_config() -> Result<CollisionConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => CollisionConfig::load_from_file(&path)?,
        None => CollisionConfig::new(Bounds::new(0.0, 0.0, 800.0, 600.0)),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);

    info!("=== Arena Collision Demo ===");
    info!(
        "World {}, bucket capacity {}, max depth {}",
        config.world, config.quadtree.bucket_capacity, config.quadtree.max_depth
    );

    let mut arena = Arena::new(&config);
    for _ in 0..NUM_BOXES {
        arena.spawn_box()?;
    }

    let mut total_resolutions = 0;
    for tick in 1..=TICKS {
        arena.step(DT);
        let stats = arena.engine.update()?;
        total_resolutions += stats.resolutions;

        if tick % REPORT_INTERVAL == 0 {
            arena.report(tick, &stats);
        }
        if tick % CHURN_INTERVAL == 0 {
            arena.churn()?;
        }
    }

    let busiest = arena
        .boxes
        .values()
        .map(|arena_box| arena_box.borrow().contacts)
        .max()
        .unwrap_or(0);
    let center = config.world.center();
    let window = Bounds::from_center(center, Vec2::new(64.0, 64.0));
    let query = arena.engine.quadtree().query_stats(&window);

    info!(
        "Done: {} resolutions over {} ticks, busiest box had {} contacts",
        total_resolutions, TICKS, busiest
    );
    info!(
        "Center query touched {} nodes and tested {} of {} boxes ({} hits)",
        query.nodes_visited,
        query.items_tested,
        arena.engine.len(),
        query.matches
    );

    Ok(())
}
