//! Sweep query result structures.
//!
//! A [`SurfaceHit`] describes the earliest obstruction found when sweeping
//! the mover's volume along a direction. It is produced by the geometry
//! query backend and consumed by the bounce solver.

use bevy::prelude::*;

/// The closest obstruction along a sweep.
///
/// A `distance` of exactly `0.0` means the swept volume already overlapped
/// another volume at the start of the sweep. That is a degenerate state,
/// not a collision, and the solver reports it as
/// [`BounceAction::Invalid`](crate::bounce::BounceAction::Invalid) instead
/// of deflecting off it.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Distance travelled along the sweep direction before the hit.
    pub distance: f32,
    /// Outward surface normal at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if the backend tracks one).
    pub entity: Option<Entity>,
}

impl SurfaceHit {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Whether the sweep started already overlapping the hit volume.
    #[inline]
    pub fn is_overlapping(&self) -> bool {
        self.distance <= 0.0
    }
}
