//! Geometry query backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the character controller. This allows swapping between
//! collision engines (Rapier3D, custom broadphase, test doubles)
//! without touching the movement code.

use bevy::prelude::*;

use crate::collision::SurfaceHit;

/// Trait for geometry query backend implementations.
///
/// The controller never talks to a physics engine directly. Every sweep,
/// overlap test, and push goes through this trait, with the mover entity
/// identifying whose collision shape to use.
///
/// The `rapier3d` feature ships `Rapier3dBackend`, an implementation for
/// Bevy Rapier3D. Integration tests implement the trait over analytic
/// geometry instead.
pub trait KinematicQueryBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Sweep the mover's collision shape from a pose along a direction
    /// and return the earliest obstruction, if any.
    ///
    /// A returned hit with `distance == 0.0` means the shape already
    /// overlaps geometry at the start pose.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `mover` - Entity whose collision shape is swept (excluded from results)
    /// * `position` - Shape origin in world space
    /// * `rotation` - Shape orientation
    /// * `direction` - Sweep direction (should be normalized)
    /// * `max_distance` - Maximum sweep distance
    fn sweep(
        world: &mut World,
        mover: Entity,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit>;

    /// Whether the mover's shape placed at the given pose overlaps any
    /// other geometry.
    fn overlaps(world: &mut World, mover: Entity, position: Vec3, rotation: Quat) -> bool;

    /// Whether the given entity is a dynamic body the character may
    /// shove aside. Backends without dynamics report `false`.
    fn is_pushable(_world: &World, _entity: Entity) -> bool {
        false
    }

    /// Apply a push impulse to a dynamic body at a world-space point.
    fn apply_push(_world: &mut World, _entity: Entity, _point: Vec3, _impulse: Vec3) {}

    /// Velocity of a body at a world-space point, including rotation.
    /// Used to inherit velocity from physics debris the character stands
    /// on. Backends without dynamics report `None`.
    fn body_point_velocity(_world: &World, _entity: Entity, _point: Vec3) -> Option<Vec3> {
        None
    }

    /// Get the fixed timestep delta time.
    fn fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|time| time.delta_secs())
            .filter(|&delta| delta > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
