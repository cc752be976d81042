//! Collision layer system for filtering which partners an entity hears about
//!
//! Every collidable sits on zero or more layers and carries a mask of the
//! layers it wants to be told about. A partner gets through only if the mask
//! covers all of its layers. By default entities sit on no layer and accept
//! every layer, so an engine that never touches layers reports every overlap.

use bitflags::bitflags;

bitflags! {
    /// Collision layer bits, usable both as a category and as a mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionLayers: u32 {
        /// Player character layer
        const PLAYER = 1 << 0;
        /// Enemy character layer
        const ENEMY = 1 << 1;
        /// Projectiles (bullets, missiles, etc.)
        const PROJECTILE = 1 << 2;
        /// Static environment geometry
        const ENVIRONMENT = 1 << 3;
        /// Trigger volumes
        const TRIGGER = 1 << 4;
        /// Pickups and collectibles
        const PICKUP = 1 << 5;
        /// Every layer, including user-defined bits
        const ALL = u32::MAX;
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionLayers {
    /// Check whether a mask accepts a partner sitting on `layer`
    ///
    /// Every bit of `layer` must be in the mask, so a partner on no layer is
    /// always accepted. One-directional: only the subject's mask is
    /// consulted, since only the subject is notified.
    #[must_use]
    pub const fn accepts(self, layer: Self) -> bool {
        self.contains(layer)
    }

    /// Layer for a user-defined bit
    ///
    /// Bits 0..=5 are the built-in layers, so user layers use 8..=31.
    /// Debug builds panic outside that range; release builds keep the low
    /// five bits of `bit`.
    #[must_use]
    pub const fn custom(bit: u32) -> Self {
        debug_assert!(matches!(bit, 8..=31), "custom layers use bits 8..=31");
        Self::from_bits_retain(1 << (bit & 31))
    }
}
