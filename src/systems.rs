//! Core controller systems.
//!
//! The movement systems are exclusive (`&mut World`) because every
//! geometry query goes through the backend trait's static methods, which
//! need the whole world. They run in a fixed order each tick: ground
//! probe, movement resolution, ground snap, then marker sync.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::backend::KinematicQueryBackend;
use crate::bounce::{get_bounces, BounceTrace, SweepSource};
use crate::collision::SurfaceHit;
use crate::config::BounceConfig;
use crate::grounding::{ground_velocity, GroundedState, LastGroundedState, VelocityHistory};
use crate::intent::MoveIntent;
use crate::platform::MovingPlatform;
use crate::state::{Falling, Grounded, Sliding};
use crate::step::snap_down;

/// Adapts the backend's static query methods to the solver's
/// [`SweepSource`] trait for one mover.
struct BackendSweepSource<'w, B: KinematicQueryBackend> {
    world: &'w mut World,
    mover: Entity,
    push_enabled: bool,
    _backend: PhantomData<B>,
}

impl<'w, B: KinematicQueryBackend> BackendSweepSource<'w, B> {
    fn new(world: &'w mut World, mover: Entity, push_enabled: bool) -> Self {
        Self {
            world,
            mover,
            push_enabled,
            _backend: PhantomData,
        }
    }
}

impl<B: KinematicQueryBackend> SweepSource for BackendSweepSource<'_, B> {
    fn sweep(
        &mut self,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        B::sweep(self.world, self.mover, position, rotation, direction, max_distance)
    }

    fn overlaps(&mut self, position: Vec3, rotation: Quat) -> bool {
        B::overlaps(self.world, self.mover, position, rotation)
    }

    fn is_pushable(&self, entity: Entity) -> bool {
        self.push_enabled && B::is_pushable(self.world, entity)
    }

    fn apply_push(&mut self, entity: Entity, point: Vec3, impulse: Vec3) {
        B::apply_push(self.world, entity, point, impulse);
    }
}

/// Probe downward from every character and refresh its
/// [`GroundedState`], keeping the previous tick's state in
/// [`LastGroundedState`] for transition detection.
pub fn update_grounded<B: KinematicQueryBackend>(world: &mut World) {
    let movers: Vec<(Entity, Vec3, Quat, BounceConfig)> = world
        .query_filtered::<(Entity, &Transform, &BounceConfig), With<GroundedState>>()
        .iter(world)
        .map(|(entity, transform, config)| {
            (entity, transform.translation, transform.rotation, *config)
        })
        .collect();

    for (entity, position, rotation, config) in movers {
        let hit = B::sweep(
            world,
            entity,
            position,
            rotation,
            -config.up,
            config.ground_check_distance,
        );
        let mut state = GroundedState::classify(hit, &config);

        // While standing, precompute what leaving this floor would hand
        // over: platform transfer first, then dynamic-body point
        // velocity, then the character's own smoothed velocity.
        if state.standing_on_ground {
            let platform = state.floor.and_then(|floor| {
                let platform = world.get::<MovingPlatform>(floor)?;
                let center = world
                    .get::<Transform>(floor)
                    .map(|t| t.translation)
                    .unwrap_or(state.point);
                Some(platform.motion_at(state.point, center))
            });
            let body_velocity = state
                .floor
                .and_then(|floor| B::body_point_velocity(world, floor, state.point));
            let smoothed = world
                .get::<VelocityHistory>(entity)
                .and_then(|history| history.average());

            state.inherited_velocity =
                ground_velocity(platform.as_ref(), body_velocity, smoothed, &config);
        }

        let previous = world.get::<GroundedState>(entity).copied();
        if let (Some(previous), Some(mut last)) =
            (previous, world.get_mut::<LastGroundedState>(entity))
        {
            last.0 = previous;
        }
        if let Some(mut slot) = world.get_mut::<GroundedState>(entity) {
            *slot = state;
        }
    }
}

/// Resolve each character's movement intent through the bounce solver
/// and apply the resulting displacement to its transform.
///
/// Characters standing on a [`MovingPlatform`] first inherit the
/// platform's frame displacement at the contact point, scaled by the
/// platform's `movement_weight`.
pub fn resolve_movement<B: KinematicQueryBackend>(world: &mut World) {
    let dt = B::fixed_timestep(world);

    let movers: Vec<(Entity, Vec3, Quat, BounceConfig, Vec3, GroundedState)> = world
        .query::<(Entity, &Transform, &BounceConfig, &MoveIntent, &GroundedState)>()
        .iter(world)
        .map(|(entity, transform, config, intent, grounded)| {
            (
                entity,
                transform.translation,
                transform.rotation,
                *config,
                intent.velocity,
                *grounded,
            )
        })
        .collect();

    for (entity, position, rotation, config, intent_velocity, grounded) in movers {
        let mut momentum = intent_velocity * dt;

        // Riders move with their platform.
        if grounded.standing_on_ground {
            if let Some(floor) = grounded.floor {
                let platform = world.get::<MovingPlatform>(floor).copied();
                let center = world.get::<Transform>(floor).map(|t| t.translation);
                if let (Some(platform), Some(center)) = (platform, center) {
                    momentum += platform.velocity_at_point(grounded.point, center)
                        * platform.movement_weight
                        * dt;
                }
            }
        }

        let mut source =
            BackendSweepSource::<B>::new(&mut *world, entity, config.push_enabled);
        let bounces = get_bounces(position, rotation, momentum, &config, &mut source);

        let final_position = bounces
            .last()
            .map(|bounce| bounce.final_position)
            .unwrap_or(position);

        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = final_position;
        }

        if dt > 0.0 {
            let velocity = (final_position - position) / dt;
            if let Some(mut history) = world.get_mut::<VelocityHistory>(entity) {
                history.push(velocity);
            }
        }

        if let Some(mut trace) = world.get_mut::<BounceTrace>(entity) {
            trace.records = bounces;
        }
    }
}

/// Glue characters to ground that falls away beneath them.
///
/// Runs after movement resolution. Only applies to characters that were
/// standing at the start of the tick and are not deliberately moving
/// upward (a jump must not be cancelled by the snap).
pub fn snap_to_ground<B: KinematicQueryBackend>(world: &mut World) {
    let movers: Vec<(Entity, Vec3, Quat, BounceConfig)> = world
        .query::<(Entity, &Transform, &BounceConfig, &MoveIntent, &GroundedState)>()
        .iter(world)
        .filter(|(_, _, config, intent, grounded)| {
            grounded.standing_on_ground && intent.velocity.dot(config.up) <= config.epsilon
        })
        .map(|(entity, transform, config, _, _)| {
            (entity, transform.translation, transform.rotation, *config)
        })
        .collect();

    for (entity, position, rotation, config) in movers {
        let mut source = BackendSweepSource::<B>::new(&mut *world, entity, false);
        let adjusted = snap_down(position, rotation, &config, &mut source);

        if adjusted != position {
            if let Some(mut transform) = world.get_mut::<Transform>(entity) {
                transform.translation = adjusted;
            }
        }
    }
}

/// Mirror each character's [`GroundedState`] into the queryable marker
/// components, and log landing / takeoff transitions.
pub fn sync_state_markers(
    mut commands: Commands,
    query: Query<(
        Entity,
        &GroundedState,
        Option<&LastGroundedState>,
        Has<Grounded>,
        Has<Sliding>,
        Has<Falling>,
    )>,
) {
    for (entity, state, last, has_grounded, has_sliding, has_falling) in &query {
        if let Some(last) = last {
            if state.standing_on_ground && !last.0.standing_on_ground {
                debug!("character {entity} landed at distance {}", state.distance);
            } else if !state.standing_on_ground && last.0.standing_on_ground {
                debug!("character {entity} left the ground");
            }
        }

        let grounded = state.is_grounded();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded);
        } else if !grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>();
        }

        if state.sliding && !has_sliding {
            commands.entity(entity).insert(Sliding);
        } else if !state.sliding && has_sliding {
            commands.entity(entity).remove::<Sliding>();
        }

        if state.falling && !has_falling {
            commands.entity(entity).insert(Falling);
        } else if !state.falling && has_falling {
            commands.entity(entity).remove::<Falling>();
        }
    }
}
