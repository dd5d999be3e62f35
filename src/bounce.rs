//! The sweep-and-bounce movement solver.
//!
//! [`get_bounces`] resolves a desired displacement against the environment
//! by repeatedly sweeping the mover's volume, advancing to the first
//! obstruction, and deflecting the remaining momentum along the hit
//! surface. Each discrete segment of that resolution is recorded as a
//! [`Bounce`], so the full return value is a replayable trace of the pass.
//!
//! The solver is pure geometry: it talks to the environment only through
//! the [`SweepSource`] trait, which backends implement on top of their
//! physics engine and tests implement with analytic shapes.

use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

use crate::collision::SurfaceHit;
use crate::config::BounceConfig;
use crate::step::{attempt_snap_up, snap_down};

/// Stability floor for `dir.dot(-normal)` when converting skin width into
/// a pull-back distance along the sweep direction.
const DOT_EPSILON: f32 = 0.005;

/// Geometry queries the solver needs during one resolution pass.
///
/// The environment is treated as a read-only snapshot for the duration of
/// the pass; the only side effect is [`apply_push`](SweepSource::apply_push),
/// which is fire-and-forget.
pub trait SweepSource {
    /// Sweep the mover's volume from `position` (oriented by `rotation`)
    /// along `direction` for up to `max_distance`, reporting the earliest
    /// surface hit. `direction` is normalized.
    fn sweep(
        &mut self,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit>;

    /// Whether the mover's volume at the given pose overlaps any other
    /// volume. Used by the step resolver to validate a candidate raised
    /// pose.
    fn overlaps(&mut self, position: Vec3, rotation: Quat) -> bool {
        let _ = (position, rotation);
        false
    }

    /// Whether the entity carries a dynamic, non-kinematic body that the
    /// mover may shove aside.
    fn is_pushable(&self, entity: Entity) -> bool {
        let _ = entity;
        false
    }

    /// Forward a push impulse to the hit body at the contact point.
    fn apply_push(&mut self, entity: Entity, point: Vec3, impulse: Vec3) {
        let _ = (entity, point, impulse);
    }
}

/// How one movement segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Default)]
pub enum BounceAction {
    /// Clean, unobstructed movement for the full remaining momentum.
    Move,
    /// Deflected off a surface; momentum was decayed and reprojected.
    Bounce,
    /// Climbed a step; momentum direction was preserved.
    SnapUp,
    /// Final resting record of every resolution pass.
    #[default]
    Stop,
    /// The sweep started already overlapping geometry. The pass ends
    /// without movement; the caller decides what "stuck" means.
    Invalid,
}

/// One discrete segment of movement resolution.
///
/// Immutable once produced. The ordered sequence emitted by
/// [`get_bounces`] is the solver's complete trace for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Default)]
pub struct Bounce {
    /// Pose position at the start of this segment.
    pub initial_position: Vec3,
    /// Pose position at the end of this segment.
    pub final_position: Vec3,
    /// Momentum budget at the start of this segment.
    pub initial_momentum: Vec3,
    /// Momentum budget left after this segment.
    pub remaining_momentum: Vec3,
    /// How the segment ended.
    pub action: BounceAction,
}

impl Bounce {
    fn new(
        initial_position: Vec3,
        final_position: Vec3,
        initial_momentum: Vec3,
        remaining_momentum: Vec3,
        action: BounceAction,
    ) -> Self {
        Self {
            initial_position,
            final_position,
            initial_momentum,
            remaining_momentum,
            action,
        }
    }

    fn stop(position: Vec3, leftover: Vec3) -> Self {
        Self {
            initial_position: position,
            final_position: position,
            initial_momentum: leftover,
            remaining_momentum: leftover,
            action: BounceAction::Stop,
        }
    }

    /// Net displacement of this segment.
    #[inline]
    pub fn displacement(&self) -> Vec3 {
        self.final_position - self.initial_position
    }
}

/// The most recent resolution trace for a character, overwritten every
/// fixed update.
///
/// Useful for debugging movement (draw the segments), for gameplay that
/// reacts to wall hits, and for tests.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct BounceTrace {
    /// The ordered records of the last pass. Empty before the first tick.
    pub records: Vec<Bounce>,
}

impl BounceTrace {
    /// Whether any segment of the last pass struck a surface.
    pub fn hit_anything(&self) -> bool {
        self.records.iter().any(|bounce| {
            matches!(
                bounce.action,
                BounceAction::Bounce | BounceAction::SnapUp | BounceAction::Invalid
            )
        })
    }

    /// The final resting position of the last pass, if it ran.
    pub fn final_position(&self) -> Option<Vec3> {
        self.records.last().map(|bounce| bounce.final_position)
    }
}

/// Resolve a desired displacement into an ordered sequence of bounces.
///
/// The sequence always ends with a [`BounceAction::Stop`] record carrying
/// the final resting position. An [`BounceAction::Invalid`] record (the
/// sweep started inside geometry) terminates resolution early; the `Stop`
/// that follows it sits at the original position.
///
/// The loop is bounded by `config.max_bounces` plus the terminal records,
/// so it terminates even on degenerate geometry.
pub fn get_bounces(
    position: Vec3,
    rotation: Quat,
    momentum: Vec3,
    config: &BounceConfig,
    source: &mut impl SweepSource,
) -> Vec<Bounce> {
    let mut bounces = Vec::new();
    let mut position = position;
    let mut remaining = momentum;
    let initial_direction = momentum.normalize_or_zero();
    let mut bounce_count: u32 = 0;
    let mut snapped_up = false;

    while remaining.length() >= config.epsilon && bounce_count <= config.max_bounces {
        // Corner geometry can deflect momentum back the way we came.
        // Moving that way would oscillate, so end the pass instead.
        if remaining.normalize_or_zero().dot(initial_direction) < 0.0 {
            break;
        }

        let bounce = single_bounce(position, rotation, remaining, config, source);
        position = bounce.final_position;
        remaining = bounce.remaining_momentum;
        bounces.push(bounce);

        match bounce.action {
            BounceAction::Move | BounceAction::Invalid => break,
            BounceAction::SnapUp => {
                snapped_up = true;
                bounce_count += 1;
            }
            _ => bounce_count += 1,
        }
    }

    // Reattach to whatever ground a climbed step put us above.
    if snapped_up {
        position = snap_down(position, rotation, config, source);
    }

    bounces.push(Bounce::stop(position, remaining));
    bounces
}

/// Resolve a single movement segment: one sweep and whatever reaction it
/// warrants.
///
/// Returns exactly one record, never a [`BounceAction::Stop`]. A `Move`
/// or `Invalid` record means the pass should end; anything else leaves
/// momentum for further iterations. The caller owns loop termination and
/// must not pass zero momentum.
pub fn single_bounce(
    position: Vec3,
    rotation: Quat,
    momentum: Vec3,
    config: &BounceConfig,
    source: &mut impl SweepSource,
) -> Bounce {
    let total_distance = momentum.length();
    let direction = momentum / total_distance;
    let mut remaining = momentum;

    let hit = source.sweep(position, rotation, direction, total_distance);

    // A hit at or past the end of the sweep (within epsilon) is a
    // touch, not an obstruction.
    let hit = hit.filter(|h| h.distance < total_distance - config.epsilon);

    let Some(hit) = hit else {
        // Clean, unobstructed move.
        return Bounce::new(
            position,
            position + momentum,
            momentum,
            Vec3::ZERO,
            BounceAction::Move,
        );
    };

    if hit.is_overlapping() {
        // Started inside geometry. Report and bail; a nudge-out pass
        // is the caller's decision, not ours.
        debug!(
            "sweep started overlapping at {:?}; aborting resolution",
            position
        );
        return Bounce::new(position, position, momentum, Vec3::ZERO, BounceAction::Invalid);
    }

    // Advance to just short of the surface. The pull-back keeps a
    // skin-width gap so the next sweep never starts in contact.
    let fraction = hit.distance / total_distance;
    let safe_distance = pull_back(hit.distance, direction, hit.normal, config.skin_width);
    let advanced = position + direction * safe_distance;
    remaining *= 1.0 - fraction;

    // Shove dynamic bodies out of the way. This runs before the angle
    // decay; swapping the order changes the numbers for pushable hits.
    if config.push_enabled {
        if let Some(entity) = hit.entity {
            if source.is_pushable(entity) {
                let impulse = remaining * (1.0 - config.push_decay);
                source.apply_push(entity, hit.point, impulse);
                remaining *= config.push_decay;
            }
        }
    }

    if config.can_snap_up {
        if let Some(raised) = attempt_snap_up(advanced, rotation, &hit, remaining, config, source) {
            // A climbed step keeps the momentum direction; no angular
            // decay for this segment.
            return Bounce::new(position, raised, momentum, remaining, BounceAction::SnapUp);
        }
    }

    // Glancing blows preserve more momentum, head-on blows lose more,
    // but a bounce never drops below 10% nor amplifies.
    let factor = bounce_decay_factor(direction, hit.normal, config.angle_power);
    remaining = project_momentum_safe(remaining * factor, hit.normal, config.up);

    Bounce::new(position, advanced, momentum, remaining, BounceAction::Bounce)
}

/// Reduce a hit distance so the mover keeps `skin_width` of clearance
/// from the surface, measured along the surface normal. Never negative.
#[inline]
fn pull_back(hit_distance: f32, direction: Vec3, normal: Vec3, skin_width: f32) -> f32 {
    let dot = direction.dot(-normal).max(DOT_EPSILON);
    (hit_distance - skin_width / dot).max(0.0)
}

/// Momentum retained after deflecting off a surface, as a function of the
/// impact angle.
///
/// The angle between the surface normal and the momentum is normalized
/// against a 90-degree scale: a grazing contact (90 degrees) maps to 0,
/// a head-on impact (180 degrees) maps to 1. The retained fraction is
/// `(1 - normalized)^angle_power * 0.9 + 0.1`, clamped to `[0.1, 1.0]`.
pub fn bounce_decay_factor(momentum_dir: Vec3, normal: Vec3, angle_power: f32) -> f32 {
    let angle = normal.angle_between(momentum_dir);
    let normalized = ((angle - FRAC_PI_2) / FRAC_PI_2).clamp(0.0, 1.0);
    ((1.0 - normalized).powf(angle_power) * 0.9 + 0.1).clamp(0.1, 1.0)
}

/// Reproject momentum onto the plane of a hit surface without changing
/// its magnitude.
///
/// If the projection degenerates (momentum parallel to the normal), the
/// plane perpendicular to `up` is used instead; if that also degenerates,
/// an arbitrary direction in the hit plane is chosen. The returned vector
/// always has the same magnitude as the input.
pub fn project_momentum_safe(momentum: Vec3, plane_normal: Vec3, up: Vec3) -> Vec3 {
    let magnitude = momentum.length();
    if magnitude == 0.0 {
        return Vec3::ZERO;
    }

    let normal = plane_normal.normalize_or_zero();
    let projected = momentum - normal * momentum.dot(normal);
    if let Some(dir) = projected.try_normalize() {
        return dir * magnitude;
    }

    let up = up.normalize_or_zero();
    let along_up = momentum - up * momentum.dot(up);
    if let Some(dir) = along_up.try_normalize() {
        return dir * magnitude;
    }

    normal.any_orthonormal_vector() * magnitude
}
