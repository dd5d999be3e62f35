//! Movement intent input component.

use bevy::prelude::*;

/// The velocity a character wants to move with this tick, in world
/// space.
///
/// Gameplay code writes this; the controller consumes it every fixed
/// update and resolves the resulting displacement against the world.
/// The intent is not cleared after use, so a held direction keeps the
/// character moving.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct MoveIntent {
    /// Desired world-space velocity in units per second.
    pub velocity: Vec3,
}

impl MoveIntent {
    /// Create an intent with the given world-space velocity.
    pub fn new(velocity: Vec3) -> Self {
        Self { velocity }
    }

    /// An intent that holds the character still.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Replace the horizontal part of the intent, keeping the vertical
    /// component (gravity, jumps) untouched.
    pub fn set_lateral(&mut self, lateral: Vec3, up: Vec3) {
        let vertical = up * self.velocity.dot(up);
        self.velocity = lateral - up * lateral.dot(up) + vertical;
    }
}
