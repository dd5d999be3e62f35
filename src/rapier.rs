//! Rapier3D geometry query backend implementation.
//!
//! This module provides the query backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! The character entity must carry a Rapier [`Collider`]; that shape is
//! what gets swept through the world. A kinematic rigid body keeps the
//! character registered with Rapier's query pipeline without letting the
//! physics step move it.

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::KinematicQueryBackend;
use crate::collision::SurfaceHit;

/// Rapier3D backend for the character controller.
///
/// Shape sweeps and overlap tests go through Rapier's query pipeline;
/// push impulses are forwarded to `ExternalImpulse` so Rapier's next
/// step integrates them.
pub struct Rapier3dBackend;

impl Rapier3dBackend {
    fn query_filter(mover: Entity) -> QueryFilter<'static> {
        QueryFilter::default()
            .exclude_collider(mover)
            .exclude_sensors()
    }
}

impl KinematicQueryBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn sweep(
        world: &mut World,
        mover: Entity,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        let shape = world.get::<Collider>(mover)?.clone();

        let mut state =
            SystemState::<Query<&RapierContext, With<DefaultRapierContext>>>::new(world);
        let rapier_context = state.get(world);
        let context = rapier_context.get_single().ok()?;

        context
            .cast_shape(
                position,
                rotation,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: true,
                    ..default()
                },
                Self::query_filter(mover),
            )
            .map(|(hit_entity, hit)| {
                let normal = hit
                    .details
                    .map(|details| details.normal1)
                    .unwrap_or(-direction);
                let point = hit
                    .details
                    .map(|details| details.witness1)
                    .unwrap_or(position + direction * hit.time_of_impact);
                SurfaceHit::new(hit.time_of_impact, normal, point, Some(hit_entity))
            })
    }

    fn overlaps(world: &mut World, mover: Entity, position: Vec3, rotation: Quat) -> bool {
        let Some(shape) = world.get::<Collider>(mover).cloned() else {
            return false;
        };

        let mut state =
            SystemState::<Query<&RapierContext, With<DefaultRapierContext>>>::new(world);
        let rapier_context = state.get(world);
        let Ok(context) = rapier_context.get_single() else {
            return false;
        };

        let mut overlapping = false;
        context.intersections_with_shape(
            position,
            rotation,
            &shape,
            Self::query_filter(mover),
            |_entity| {
                overlapping = true;
                false
            },
        );
        overlapping
    }

    fn is_pushable(world: &World, entity: Entity) -> bool {
        matches!(world.get::<RigidBody>(entity), Some(RigidBody::Dynamic))
    }

    fn apply_push(world: &mut World, entity: Entity, point: Vec3, impulse: Vec3) {
        let center = world
            .get::<GlobalTransform>(entity)
            .map(|transform| transform.translation())
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation));

        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
            if let Some(center) = center {
                ext_impulse.torque_impulse += (point - center).cross(impulse);
            }
        } else if let Some(mut velocity) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            velocity.linvel += impulse;
        }
    }

    fn body_point_velocity(world: &World, entity: Entity, point: Vec3) -> Option<Vec3> {
        // Only free-moving bodies hand over their velocity; kinematic
        // and fixed floors are handled by the platform path.
        if !matches!(world.get::<RigidBody>(entity), Some(RigidBody::Dynamic)) {
            return None;
        }
        let velocity = world.get::<Velocity>(entity)?;
        let center = world
            .get::<GlobalTransform>(entity)
            .map(|transform| transform.translation())
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation))?;

        Some(velocity.linvel + velocity.angvel.cross(point - center))
    }
}

/// Plugin for the Rapier3D backend.
///
/// All queries are pulled on demand through the query pipeline, so no
/// extra systems are needed; this exists to satisfy the backend
/// contract.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Bundle for creating a character with Rapier3D collision.
///
/// The rigid body is kinematic: the controller owns the transform and
/// Rapier only provides collision queries. Rotation is locked so physics
/// interactions never tip the character over.
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// Kinematic body keeps the collider in Rapier's query pipeline.
    pub rigid_body: RigidBody,
    /// Rotation locked so the character stays upright.
    pub locked_axes: LockedAxes,
    /// The collision shape swept by the controller.
    pub collider: Collider,
}

impl Rapier3dCharacterBundle {
    /// A vertical capsule character, the usual choice.
    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            locked_axes: LockedAxes::ROTATION_LOCKED,
            collider: Collider::capsule_y(half_height, radius),
        }
    }
}
