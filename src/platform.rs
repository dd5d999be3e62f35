//! Moving platform support.
//!
//! Attach a [`MovingPlatform`] to any floor entity that should carry
//! characters standing on it. The controller reads the platform's
//! velocity at the contact point each tick, drags riders along by
//! `movement_weight`, and hands over `transfer_weight` of the velocity
//! when a rider leaves.

use bevy::prelude::*;

use crate::grounding::PlatformMotion;

/// Marks a floor entity as a rider-carrying platform and describes its
/// motion for the current tick.
///
/// The fields are inputs: whatever moves the platform (animation, a
/// script, a physics joint) is responsible for keeping `velocity` and
/// `angular_velocity` current.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MovingPlatform {
    /// Linear velocity of the platform origin.
    pub velocity: Vec3,
    /// Angular velocity about the platform origin (axis scaled by rad/s).
    pub angular_velocity: Vec3,
    /// Fraction of platform motion applied to riders while they stand on
    /// it. `1.0` carries riders exactly; `0.0` lets them slip.
    pub movement_weight: f32,
    /// Fraction of platform velocity a rider keeps when leaving.
    pub transfer_weight: f32,
    /// When set, departing riders inherit no velocity at all, regardless
    /// of `transfer_weight`.
    pub suppress_transfer: bool,
}

impl Default for MovingPlatform {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            movement_weight: 1.0,
            transfer_weight: 1.0,
            suppress_transfer: false,
        }
    }
}

impl MovingPlatform {
    /// Platform velocity at a world-space point, including the
    /// contribution of rotation about `center`.
    pub fn velocity_at_point(&self, point: Vec3, center: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(point - center)
    }

    /// Capture the motion this platform imparts at `point` for the
    /// grounding pass.
    pub fn motion_at(&self, point: Vec3, center: Vec3) -> PlatformMotion {
        PlatformMotion {
            velocity: self.velocity_at_point(point, center),
            movement_weight: self.movement_weight,
            transfer_weight: self.transfer_weight,
            suppress_transfer: self.suppress_transfer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_at_center_is_linear_velocity() {
        let platform = MovingPlatform {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            ..default()
        };

        assert_eq!(
            platform.velocity_at_point(Vec3::ZERO, Vec3::ZERO),
            Vec3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn rotation_adds_tangential_velocity() {
        // Spinning about +Y at 1 rad/s; a point one unit along +X moves
        // toward -Z (Y cross X = -Z).
        let platform = MovingPlatform {
            angular_velocity: Vec3::Y,
            ..default()
        };

        let v = platform.velocity_at_point(Vec3::X, Vec3::ZERO);
        assert!((v - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn motion_capture_carries_weights() {
        let platform = MovingPlatform {
            velocity: Vec3::new(2.0, 0.0, 0.0),
            movement_weight: 0.5,
            transfer_weight: 0.25,
            ..default()
        };

        let motion = platform.motion_at(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(motion.velocity, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(motion.transfer_velocity(), Vec3::new(0.25, 0.0, 0.0));
    }
}
