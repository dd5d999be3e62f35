//! Queryable movement state markers.
//!
//! These zero-sized components mirror the current
//! [`GroundedState`](crate::grounding::GroundedState) so gameplay
//! systems can filter queries (`With<Grounded>`, `Added<Falling>`)
//! instead of inspecting the probe result by hand. They are kept in
//! sync by the controller once per fixed update.

use bevy::prelude::*;

/// Standing on walkable ground.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// In contact with ground too steep to walk on.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Sliding;

/// Not in contact with any ground.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Falling;
