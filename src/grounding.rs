//! Ground detection and floor velocity inheritance.
//!
//! Each tick a downward probe classifies the mover's relationship to the
//! ground ([`GroundedState`]), and [`ground_velocity`] decides what
//! velocity the mover inherits from whatever it is standing on when it
//! leaves the floor.

use bevy::prelude::*;

use crate::collision::SurfaceHit;
use crate::config::BounceConfig;

/// Result of the per-tick ground probe.
///
/// `ground_detected` is a loose signal (anything within
/// `ground_check_distance`); `standing_on_ground` is the tight contact
/// test used for movement decisions. A probe that starts overlapping the
/// floor never counts as standing.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GroundedState {
    /// Whether the probe found any surface within `ground_check_distance`.
    pub ground_detected: bool,
    /// Distance to the detected surface, or `ground_check_distance` when
    /// nothing was found.
    pub distance: f32,
    /// Angle in radians between the surface normal and the configured up.
    pub angle: f32,
    /// Surface normal of the detected ground.
    pub normal: Vec3,
    /// World position of the probe contact.
    pub point: Vec3,
    /// The entity being stood on, when the backend tracks one.
    #[reflect(ignore)]
    pub floor: Option<Entity>,
    /// Whether the surface is within `grounded_distance` (tight contact).
    pub standing_on_ground: bool,
    /// Standing, but the surface is steeper than `max_walk_angle`.
    pub sliding: bool,
    /// Not in tight contact with any ground.
    pub falling: bool,
    /// The velocity the character would inherit from this floor when
    /// leaving it (see [`ground_velocity`]). Zero while airborne.
    pub inherited_velocity: Vec3,
}

impl Default for GroundedState {
    fn default() -> Self {
        Self {
            ground_detected: false,
            distance: f32::MAX,
            angle: 0.0,
            normal: Vec3::Y,
            point: Vec3::ZERO,
            floor: None,
            standing_on_ground: false,
            sliding: false,
            falling: true,
            inherited_velocity: Vec3::ZERO,
        }
    }
}

impl GroundedState {
    /// Classify a downward probe result.
    pub fn classify(hit: Option<SurfaceHit>, config: &BounceConfig) -> Self {
        let Some(hit) = hit else {
            return Self {
                distance: config.ground_check_distance,
                ..default()
            };
        };

        let angle = hit.normal.angle_between(config.up);
        // An overlapping probe gives no usable separation distance, so
        // contact is only claimed for a strictly positive gap.
        let standing = !hit.is_overlapping() && hit.distance <= config.grounded_distance;
        let sliding = standing && angle > config.max_walk_angle;

        Self {
            ground_detected: true,
            distance: hit.distance,
            angle,
            normal: hit.normal,
            point: hit.point,
            floor: hit.entity,
            standing_on_ground: standing,
            sliding,
            falling: !standing,
            inherited_velocity: Vec3::ZERO,
        }
    }

    /// Standing on walkable ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.standing_on_ground && !self.sliding
    }
}

/// Copy of the previous tick's [`GroundedState`], kept so the state
/// marker sync can detect transitions (landing, leaving the ground).
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct LastGroundedState(pub GroundedState);

/// Motion attributes of a floor that actively carries riders.
///
/// Captured from the floor entity's
/// [`MovingPlatform`](crate::platform::MovingPlatform) at the mover's
/// contact point.
#[derive(Debug, Clone, Copy)]
pub struct PlatformMotion {
    /// Platform velocity at the contact point.
    pub velocity: Vec3,
    /// How strongly the platform drags riders along while they stand on it.
    pub movement_weight: f32,
    /// How much platform velocity riders keep when leaving it.
    pub transfer_weight: f32,
    /// Platform refuses to hand its velocity to departing riders.
    pub suppress_transfer: bool,
}

impl PlatformMotion {
    /// The velocity a departing rider inherits from this platform.
    pub fn transfer_velocity(&self) -> Vec3 {
        if self.suppress_transfer {
            Vec3::ZERO
        } else {
            self.velocity * self.movement_weight * self.transfer_weight
        }
    }
}

/// Decide what velocity the mover inherits from its floor.
///
/// Priority order:
/// 1. a platform that declares rider handling, even one that suppresses
///    the transfer entirely;
/// 2. the contact-point velocity of a plain dynamic body, clamped to
///    `max_launch_speed`;
/// 3. the mover's own smoothed velocity, clamped the same way;
/// 4. zero.
pub fn ground_velocity(
    platform: Option<&PlatformMotion>,
    body_point_velocity: Option<Vec3>,
    smoothed_velocity: Option<Vec3>,
    config: &BounceConfig,
) -> Vec3 {
    if let Some(platform) = platform {
        return platform.transfer_velocity();
    }
    if let Some(velocity) = body_point_velocity {
        return velocity.clamp_length_max(config.max_launch_speed);
    }
    if let Some(velocity) = smoothed_velocity {
        return velocity.clamp_length_max(config.max_launch_speed);
    }
    Vec3::ZERO
}

const VELOCITY_WINDOW: usize = 8;

/// Sliding window of recent world velocities, used to smooth out the
/// jitter of per-tick displacement before it becomes launch velocity.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct VelocityHistory {
    samples: Vec<Vec3>,
    cursor: usize,
}

impl VelocityHistory {
    /// Record a velocity sample, evicting the oldest once the window is
    /// full.
    pub fn push(&mut self, velocity: Vec3) {
        if self.samples.len() < VELOCITY_WINDOW {
            self.samples.push(velocity);
        } else {
            self.samples[self.cursor] = velocity;
        }
        self.cursor = (self.cursor + 1) % VELOCITY_WINDOW;
    }

    /// Average of the recorded samples, or `None` when empty.
    pub fn average(&self) -> Option<Vec3> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<Vec3>() / self.samples.len() as f32)
    }

    /// Drop all samples (used when teleporting the mover).
    pub fn reset(&mut self) {
        self.samples.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_hit(distance: f32) -> SurfaceHit {
        SurfaceHit::new(distance, Vec3::Y, Vec3::ZERO, Some(Entity::from_raw(7)))
    }

    #[test]
    fn no_hit_is_falling() {
        let config = BounceConfig::default();
        let state = GroundedState::classify(None, &config);

        assert!(!state.ground_detected);
        assert!(!state.standing_on_ground);
        assert!(state.falling);
        assert_eq!(state.distance, config.ground_check_distance);
    }

    #[test]
    fn close_flat_ground_is_standing() {
        let config = BounceConfig::default();
        let state = GroundedState::classify(Some(flat_hit(0.02)), &config);

        assert!(state.ground_detected);
        assert!(state.standing_on_ground);
        assert!(!state.sliding);
        assert!(!state.falling);
        assert!(state.is_grounded());
        assert_eq!(state.floor, Some(Entity::from_raw(7)));
    }

    #[test]
    fn distant_ground_is_detected_but_not_standing() {
        let config = BounceConfig::default();
        let state = GroundedState::classify(Some(flat_hit(1.0)), &config);

        assert!(state.ground_detected);
        assert!(!state.standing_on_ground);
        assert!(state.falling);
    }

    #[test]
    fn overlapping_probe_is_not_standing() {
        let config = BounceConfig::default();
        let state = GroundedState::classify(Some(flat_hit(0.0)), &config);

        assert!(state.ground_detected);
        assert!(!state.standing_on_ground);
        assert!(state.falling);
    }

    #[test]
    fn steep_contact_is_sliding() {
        let config = BounceConfig::default();
        // 80 degrees from up, well past the walkable limit.
        let normal = Vec3::new(0.985, 0.174, 0.0).normalize();
        let hit = SurfaceHit::new(0.02, normal, Vec3::ZERO, None);
        let state = GroundedState::classify(Some(hit), &config);

        assert!(state.standing_on_ground);
        assert!(state.sliding);
        assert!(!state.is_grounded());
    }

    #[test]
    fn platform_outranks_dynamic_body() {
        let config = BounceConfig::default();
        let platform = PlatformMotion {
            velocity: Vec3::new(2.0, 0.0, 0.0),
            movement_weight: 1.0,
            transfer_weight: 1.0,
            suppress_transfer: false,
        };

        let inherited = ground_velocity(
            Some(&platform),
            Some(Vec3::new(0.0, 0.0, 9.0)),
            None,
            &config,
        );

        assert_eq!(inherited, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn suppressing_platform_yields_zero_even_with_body_velocity() {
        let config = BounceConfig::default();
        let platform = PlatformMotion {
            velocity: Vec3::new(2.0, 0.0, 0.0),
            movement_weight: 1.0,
            transfer_weight: 1.0,
            suppress_transfer: true,
        };

        let inherited = ground_velocity(
            Some(&platform),
            Some(Vec3::new(0.0, 0.0, 9.0)),
            None,
            &config,
        );

        assert_eq!(inherited, Vec3::ZERO);
    }

    #[test]
    fn transfer_weight_scales_inherited_velocity() {
        let platform = PlatformMotion {
            velocity: Vec3::new(4.0, 0.0, 0.0),
            movement_weight: 1.0,
            transfer_weight: 0.5,
            suppress_transfer: false,
        };

        assert_eq!(platform.transfer_velocity(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn body_velocity_is_clamped_to_launch_speed() {
        let config = BounceConfig::default();
        let inherited = ground_velocity(None, Some(Vec3::new(100.0, 0.0, 0.0)), None, &config);

        assert!((inherited.length() - config.max_launch_speed).abs() < 1e-4);
    }

    #[test]
    fn smoothed_velocity_is_last_resort() {
        let config = BounceConfig::default();
        let inherited = ground_velocity(None, None, Some(Vec3::new(1.0, 0.0, 0.0)), &config);

        assert_eq!(inherited, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ground_velocity(None, None, None, &config), Vec3::ZERO);
    }

    #[test]
    fn velocity_history_averages_samples() {
        let mut history = VelocityHistory::default();
        assert_eq!(history.average(), None);

        history.push(Vec3::new(1.0, 0.0, 0.0));
        history.push(Vec3::new(3.0, 0.0, 0.0));

        assert_eq!(history.average(), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn velocity_history_evicts_oldest() {
        let mut history = VelocityHistory::default();
        for _ in 0..VELOCITY_WINDOW {
            history.push(Vec3::ZERO);
        }
        for _ in 0..VELOCITY_WINDOW {
            history.push(Vec3::new(2.0, 0.0, 0.0));
        }

        assert_eq!(history.average(), Some(Vec3::new(2.0, 0.0, 0.0)));
    }
}
