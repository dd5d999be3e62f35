//! Step-up and snap-down resolution.
//!
//! When the bounce solver strikes a low obstruction near the mover's feet,
//! [`attempt_snap_up`] decides whether it is a climbable step (a stair or
//! curb) and teleports the mover on top of it. [`snap_down`] is the
//! inverse adjustment: it glues the mover to ground that falls away
//! beneath it, and reattaches the mover after a successful climb.

use bevy::prelude::*;

use crate::bounce::SweepSource;
use crate::collision::SurfaceHit;
use crate::config::BounceConfig;

/// Try to climb the obstruction described by `hit`.
///
/// All of the following must hold, otherwise the obstruction is left to
/// ordinary bounce handling:
///
/// - the obstruction point sits between the mover's feet and
///   `config.vertical_snap_up` above them;
/// - the obstruction surface is a near-vertical riser (ramps slide);
/// - a forward probe just above the obstruction finds
///   `config.step_up_depth` of clear space, so the mover will not wedge
///   into a wall right behind the edge.
///
/// The climb itself is attempted in two phases: first a tight snap to the
/// measured step height, then a fallback to the full configured height if
/// something blocks the tight pose. Returns the raised position on
/// success.
pub fn attempt_snap_up(
    position: Vec3,
    rotation: Quat,
    hit: &SurfaceHit,
    momentum: Vec3,
    config: &BounceConfig,
    source: &mut impl SweepSource,
) -> Option<Vec3> {
    let foot = config.foot_position(position);
    let step_height = (hit.point - foot).dot(config.up);

    // Taller than the step limit is a wall; below the feet is irrelevant.
    if step_height <= config.epsilon || step_height > config.vertical_snap_up {
        return None;
    }

    // Ramps are handled by sliding, not snapping.
    if hit.normal.dot(config.up).abs() > config.max_riser_dot {
        return None;
    }

    // Climbing needs a horizontal heading.
    let lateral = momentum - config.up * momentum.dot(config.up);
    let forward = lateral.try_normalize()?;

    // Probe forward from just above the obstruction point. A surface
    // closer than the step depth means a wall sits right behind the
    // edge and climbing would wedge the mover into it.
    let probe_origin = position + config.up * (step_height + config.epsilon * 2.0);
    if let Some(block) = source.sweep(probe_origin, rotation, forward, config.step_up_depth) {
        if block.distance < config.step_up_depth - config.epsilon {
            return None;
        }
    }

    // Tight fit first, full configured height as the fallback.
    snap_to_height(position, rotation, step_height + config.epsilon, config, source)
        .or_else(|| snap_to_height(position, rotation, config.vertical_snap_up, config, source))
}

/// Raise the mover by `height` if the space above is clear and the
/// resulting pose is unobstructed.
fn snap_to_height(
    position: Vec3,
    rotation: Quat,
    height: f32,
    config: &BounceConfig,
    source: &mut impl SweepSource,
) -> Option<Vec3> {
    if let Some(ceiling) = source.sweep(position, rotation, config.up, height) {
        if ceiling.distance < height {
            return None;
        }
    }

    let raised = position + config.up * height;
    if source.overlaps(raised, rotation) {
        return None;
    }

    Some(raised)
}

/// Sweep downward by up to `config.vertical_snap_down` and rest the mover
/// just above whatever surface is found.
///
/// Returns the adjusted position, or the input position unchanged when
/// there is no ground within range or the mover is already in contact.
pub fn snap_down(
    position: Vec3,
    rotation: Quat,
    config: &BounceConfig,
    source: &mut impl SweepSource,
) -> Vec3 {
    let down = -config.up;
    let Some(hit) = source.sweep(position, rotation, down, config.vertical_snap_down) else {
        return position;
    };

    if hit.is_overlapping() || hit.distance <= config.epsilon {
        return position;
    }

    position + down * (hit.distance - config.epsilon)
}
