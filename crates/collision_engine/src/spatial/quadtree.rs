//! Quadtree spatial partitioning structure
//!
//! Divides a fixed 2D world region into hierarchical quadrants for fast
//! overlap queries. A node splits into four children once the number of
//! items stored directly at it reaches the bucket capacity, as long as the
//! maximum depth has not been reached.
//!
//! Every item lives at exactly one node: the deepest node whose region fully
//! contains the item's bounds. Items straddling a split line stay at the
//! ancestor that contains them, so nothing is ever duplicated across
//! siblings.
//!
//! The tree remembers the bounds each item was filed under. Items that move
//! are found again through those bounds, and [`Quadtree::refresh`] moves them
//! to the node matching where they are now.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::Bounds;

/// Something that can be stored in a [`Quadtree`]
pub trait Spatial {
    /// Identity of the item; two items are the same only if their keys match
    type Key: Copy + Eq + Hash + fmt::Debug;

    /// Identity key
    fn key(&self) -> Self::Key;

    /// Current bounds, or `None` if the item no longer has a location
    fn bounds(&self) -> Option<Bounds>;
}

/// Errors raised by quadtree insertion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuadtreeError {
    /// Item does not fit inside the tree's region and out-of-bounds items are disallowed
    #[error("item bounds ({bounds}) lie outside the quadtree region ({region})")]
    OutOfBounds {
        /// Bounds of the rejected item
        bounds: Bounds,
        /// Region covered by the tree
        region: Bounds,
    },

    /// Item has no bounds to place it by
    #[error("item has no bounds; its owner is no longer alive")]
    Detached,
}

/// Configuration for quadtree behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    /// Items stored directly at a node before it gets quartered
    pub bucket_capacity: usize,

    /// Maximum subdivision depth (the root is depth 0)
    pub max_depth: u32,

    /// Collapse a subtree back into its parent once it holds no more than `bucket_capacity` items
    pub merge_on_remove: bool,

    /// Accept items whose bounds are not inside the tree region; they are kept at the root
    pub allow_out_of_bounds: bool,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 32,
            max_depth: 5,
            merge_on_remove: true,
            allow_out_of_bounds: false,
        }
    }
}

impl QuadtreeConfig {
    /// Set the bucket capacity
    #[must_use]
    pub const fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    /// Set the maximum depth
    #[must_use]
    pub const fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable or disable merging on removal
    #[must_use]
    pub const fn with_merge_on_remove(mut self, enabled: bool) -> Self {
        self.merge_on_remove = enabled;
        self
    }

    /// Allow or reject items outside the tree region
    #[must_use]
    pub const fn with_out_of_bounds(mut self, allowed: bool) -> Self {
        self.allow_out_of_bounds = allowed;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket_capacity == 0 {
            return Err("Bucket capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Work done by a single overlap query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Nodes whose direct items were scanned
    pub nodes_visited: usize,
    /// Exact pairwise intersection tests performed
    pub items_tested: usize,
    /// Items that intersected the query
    pub matches: usize,
}

/// Single node in the quadtree hierarchy
#[derive(Debug, Clone)]
pub struct QuadtreeNode<T> {
    region: Bounds,
    items: Vec<T>,
    children: Option<Box<[QuadtreeNode<T>; 4]>>,
    depth: u32,
}

impl<T: Spatial> QuadtreeNode<T> {
    fn new(region: Bounds, depth: u32) -> Self {
        Self {
            region,
            items: Vec::new(),
            children: None,
            depth,
        }
    }

    /// World-space region covered by this node
    pub const fn region(&self) -> Bounds {
        self.region
    }

    /// Items stored directly at this node
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Child quadrants in top-left, top-right, bottom-left, bottom-right order
    pub fn children(&self) -> Option<&[QuadtreeNode<T>; 4]> {
        self.children.as_deref()
    }

    /// Depth in the tree (0 = root)
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Check if this node is a leaf (has no children)
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Count items in this node and all descendants
    pub fn count_items(&self) -> usize {
        let nested: usize = self
            .children
            .as_deref()
            .map_or(0, |children| children.iter().map(Self::count_items).sum());
        self.items.len() + nested
    }

    fn containing_child_mut(&mut self, bounds: &Bounds) -> Option<&mut Self> {
        self.children
            .as_deref_mut()?
            .iter_mut()
            .find(|child| child.region.contains(bounds))
    }

    /// Deepest existing node whose region contains `bounds`
    fn resting_node(&self, bounds: &Bounds) -> &Self {
        self.children
            .as_deref()
            .and_then(|children| children.iter().find(|child| child.region.contains(bounds)))
            .map_or(self, |child| child.resting_node(bounds))
    }

    fn insert(&mut self, item: T, bounds: Bounds, config: &QuadtreeConfig, filed: &HashMap<T::Key, Bounds>) {
        if self.is_leaf() && self.items.len() >= config.bucket_capacity {
            self.subdivide(config, filed);
        }

        if let Some(child) = self.containing_child_mut(&bounds) {
            child.insert(item, bounds, config, filed);
            return;
        }

        self.items.push(item);
    }

    fn subdivide(&mut self, config: &QuadtreeConfig, filed: &HashMap<T::Key, Bounds>) {
        if self.children.is_some() || self.depth >= config.max_depth {
            return;
        }

        let [top_left, top_right, bottom_left, bottom_right] = self.region.quadrants();
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            Self::new(top_left, depth),
            Self::new(top_right, depth),
            Self::new(bottom_left, depth),
            Self::new(bottom_right, depth),
        ]));

        // Only items that fit wholly inside one quadrant move down
        let mut moved = 0;
        for item in std::mem::take(&mut self.items) {
            let Some(bounds) = filed.get(&item.key()).copied() else {
                self.items.push(item);
                continue;
            };
            match self.containing_child_mut(&bounds) {
                Some(child) => {
                    child.insert(item, bounds, config, filed);
                    moved += 1;
                }
                None => self.items.push(item),
            }
        }

        debug!(
            "Subdivided quadtree node at depth {} ({}): {} moved down, {} kept",
            self.depth,
            self.region,
            moved,
            self.items.len()
        );
    }

    fn remove_direct(&mut self, key: T::Key) -> Option<T> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        Some(self.items.remove(index))
    }

    /// Follow the insertion path for `bounds` and remove the item from wherever that path ends
    fn remove_along_path(&mut self, key: T::Key, bounds: &Bounds, config: &QuadtreeConfig) -> Option<T> {
        let removed = match self.containing_child_mut(bounds) {
            Some(child) => child.remove_along_path(key, bounds, config),
            None => self.remove_direct(key),
        };

        if removed.is_some() {
            self.merge_if_sparse(config);
        }
        removed
    }

    fn merge_if_sparse(&mut self, config: &QuadtreeConfig) {
        if !config.merge_on_remove || self.is_leaf() || self.count_up_to(config.bucket_capacity) > config.bucket_capacity {
            return;
        }

        if let Some(children) = self.children.take() {
            for child in *children {
                child.drain_into(&mut self.items);
            }
        }

        debug!(
            "Merged quadtree node at depth {} ({}) back into a leaf with {} items",
            self.depth,
            self.region,
            self.items.len()
        );
    }

    /// Count items in this subtree, stopping early once `cap` is exceeded
    fn count_up_to(&self, cap: usize) -> usize {
        let mut total = self.items.len();
        if let Some(children) = self.children.as_deref() {
            for child in children {
                if total > cap {
                    break;
                }
                total += child.count_up_to(cap - total);
            }
        }
        total
    }

    fn drain_into(self, out: &mut Vec<T>) {
        out.extend(self.items);
        if let Some(children) = self.children {
            for child in *children {
                child.drain_into(out);
            }
        }
    }

    fn max_depth_reached(&self) -> u32 {
        self.children.as_deref().map_or(self.depth, |children| {
            children
                .iter()
                .map(Self::max_depth_reached)
                .max()
                .unwrap_or(self.depth)
        })
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Self>) {
        match self.children.as_deref() {
            None => leaves.push(self),
            Some(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    fn collect_at_depth<'a>(&'a self, target_depth: u32, nodes: &mut Vec<&'a Self>) {
        if self.depth == target_depth {
            nodes.push(self);
        } else if let Some(children) = self.children.as_deref() {
            for child in children {
                child.collect_at_depth(target_depth, nodes);
            }
        }
    }
}

/// Quadtree spatial partitioning structure over a fixed world region
#[derive(Debug, Clone)]
pub struct Quadtree<T: Spatial> {
    root: QuadtreeNode<T>,
    config: QuadtreeConfig,

    /// Bounds each stored item was filed under
    filed: HashMap<T::Key, Bounds>,
}

impl<T: Spatial> Quadtree<T> {
    /// Create a quadtree covering `region` with the default configuration
    pub fn new(region: Bounds) -> Self {
        Self::with_config(region, QuadtreeConfig::default())
    }

    /// Create a quadtree covering `region`
    pub fn with_config(region: Bounds, config: QuadtreeConfig) -> Self {
        Self {
            root: QuadtreeNode::new(region, 0),
            config,
            filed: HashMap::new(),
        }
    }

    /// Region covered by the root node
    pub const fn region(&self) -> Bounds {
        self.root.region
    }

    /// Active configuration
    pub const fn config(&self) -> &QuadtreeConfig {
        &self.config
    }

    /// Root node (for visualization)
    pub const fn root(&self) -> &QuadtreeNode<T> {
        &self.root
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.filed.len()
    }

    /// Check whether the tree holds no items
    pub fn is_empty(&self) -> bool {
        self.filed.is_empty()
    }

    /// Check whether the root has never been split (or has been merged back)
    pub const fn is_leaf(&self) -> bool {
        self.root.is_leaf()
    }

    fn check_region(&self, bounds: &Bounds) -> Result<(), QuadtreeError> {
        if self.config.allow_out_of_bounds || self.root.region.contains(bounds) {
            return Ok(());
        }
        Err(QuadtreeError::OutOfBounds {
            bounds: *bounds,
            region: self.root.region,
        })
    }

    /// Insert an item at the deepest node whose region fully contains it
    ///
    /// Inserting an item that is already stored files it again under its
    /// current bounds.
    pub fn insert(&mut self, item: T) -> Result<(), QuadtreeError> {
        let bounds = item.bounds().ok_or(QuadtreeError::Detached)?;
        self.check_region(&bounds)?;

        let key = item.key();
        if self.filed.contains_key(&key) {
            self.take(key);
        }

        trace!("Inserting {:?} at {}", key, bounds);
        self.root.insert(item, bounds, &self.config, &self.filed);
        self.filed.insert(key, bounds);
        Ok(())
    }

    /// Remove an item by identity
    ///
    /// The bounds the item was filed under pick the search path, so an item
    /// that moved (or lost its bounds) since insertion is still found.
    /// Returns `false` when the item was not stored.
    pub fn remove(&mut self, item: &T) -> bool {
        self.take(item.key()).is_some()
    }

    fn take(&mut self, key: T::Key) -> Option<T> {
        let bounds = self.filed.remove(&key)?;
        let removed = self.root.remove_along_path(key, &bounds, &self.config);
        debug_assert!(removed.is_some(), "{key:?} was filed under {bounds} but is not on its path");
        removed
    }

    /// File an item again if it moved since it was inserted
    ///
    /// An item that still belongs to the same node only has its filed bounds
    /// updated; otherwise it is moved to the node matching its current
    /// bounds. Returns `Ok(true)` when the item changed node. Items that are
    /// not stored or have no bounds are left alone. A move out of the region
    /// fails with [`QuadtreeError::OutOfBounds`] unless out-of-bounds items
    /// are allowed, and the item then stays where it was.
    pub fn refresh(&mut self, item: &T) -> Result<bool, QuadtreeError> {
        let key = item.key();
        let (Some(filed), Some(current)) = (self.filed.get(&key).copied(), item.bounds()) else {
            return Ok(false);
        };
        if filed == current {
            return Ok(false);
        }
        self.check_region(&current)?;

        if std::ptr::eq(self.root.resting_node(&filed), self.root.resting_node(&current)) {
            self.filed.insert(key, current);
            return Ok(false);
        }

        let Some(stored) = self.take(key) else {
            return Ok(false);
        };
        trace!("Re-filing {:?} from {} to {}", key, filed, current);
        self.root.insert(stored, current, &self.config, &self.filed);
        self.filed.insert(key, current);
        Ok(true)
    }

    /// Check whether an item with the same identity is stored
    pub fn contains(&self, item: &T) -> bool {
        self.filed.contains_key(&item.key())
    }

    /// Find every stored item whose bounds intersect `bounds`
    pub fn find_collisions(&self, bounds: &Bounds) -> Vec<T>
    where
        T: Clone,
    {
        let mut collisions = Vec::new();
        self.visit_overlapping(bounds, |item| collisions.push(item.clone()));
        collisions
    }

    /// Find every stored item whose bounds intersect those of `item`
    ///
    /// The query does not filter out `item` itself; remove it first if it is
    /// stored. An item without bounds collides with nothing.
    pub fn find_collisions_with(&self, item: &T) -> Vec<T>
    where
        T: Clone,
    {
        item.bounds()
            .map_or_else(Vec::new, |bounds| self.find_collisions(&bounds))
    }

    /// Run an overlap query and report how much work it did
    pub fn query_stats(&self, bounds: &Bounds) -> QueryStats {
        self.visit_overlapping(bounds, |_| {})
    }

    fn visit_overlapping<F>(&self, bounds: &Bounds, mut visit: F) -> QueryStats
    where
        F: FnMut(&T),
    {
        let mut stats = QueryStats::default();
        let mut nodes = VecDeque::new();
        nodes.push_back(&self.root);

        // The root is always scanned since out-of-region items live there
        while let Some(node) = nodes.pop_front() {
            stats.nodes_visited += 1;

            for item in &node.items {
                stats.items_tested += 1;
                if item.bounds().is_some_and(|other| other.intersects(bounds)) {
                    stats.matches += 1;
                    visit(item);
                }
            }

            if let Some(children) = node.children.as_deref() {
                nodes.extend(children.iter().filter(|child| child.region.intersects(bounds)));
            }
        }

        stats
    }

    /// All stored items, breadth first
    pub fn elements(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut elements = Vec::with_capacity(self.filed.len());
        let mut nodes = VecDeque::new();
        nodes.push_back(&self.root);

        while let Some(node) = nodes.pop_front() {
            if let Some(children) = node.children.as_deref() {
                nodes.extend(children.iter());
            }
            elements.extend(node.items.iter().cloned());
        }

        elements
    }

    /// Deepest level that currently has nodes
    pub fn depth(&self) -> u32 {
        self.root.max_depth_reached()
    }

    /// Get all leaf nodes (for visualization)
    pub fn leaves(&self) -> Vec<&QuadtreeNode<T>> {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&mut leaves);
        leaves
    }

    /// Get all nodes at a specific depth (for visualization)
    pub fn nodes_at_depth(&self, depth: u32) -> Vec<&QuadtreeNode<T>> {
        let mut nodes = Vec::new();
        self.root.collect_at_depth(depth, &mut nodes);
        nodes
    }

    /// Remove every item and collapse the tree to a single root
    pub fn clear(&mut self) {
        self.root = QuadtreeNode::new(self.root.region, 0);
        self.filed.clear();
    }
}
