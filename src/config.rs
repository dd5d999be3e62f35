//! Controller configuration components.
//!
//! [`BounceConfig`] holds every tunable the bounce solver, the step
//! resolver, and the grounding pass read. It is owned by the caller and
//! never mutated by the solver during a resolution pass.

use bevy::prelude::*;

/// Configuration for the sweep-and-bounce movement resolution.
///
/// All distances are in world units. The solver treats this component as
/// read-only for the duration of one resolution pass.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct BounceConfig {
    // === Bounce Solver ===
    /// Maximum number of `Bounce`/`SnapUp` segments resolved per pass.
    /// Hard circuit-breaker against pathological geometry.
    pub max_bounces: u32,

    /// Fraction of momentum retained after shoving a push-capable body
    /// (0.0 to 1.0). The remainder is transferred as the push impulse.
    pub push_decay: f32,

    /// Whether pushing dynamic bodies is enabled at all.
    pub push_enabled: bool,

    /// Exponent shaping the angle-based momentum decay. Higher values
    /// punish head-on collisions harder while leaving glancing blows
    /// mostly untouched.
    pub angle_power: f32,

    /// Minimum meaningful momentum/displacement. Below this the
    /// resolution pass ends.
    pub epsilon: f32,

    /// Gap kept between the mover and any surface it advances toward,
    /// so the next sweep never starts in contact.
    pub skin_width: f32,

    // === Orientation ===
    /// The "up" direction for this character.
    pub up: Vec3,

    /// Distance from the pose position down to the mover's feet along `up`.
    /// For a capsule centered on the pose, this is half_height + radius.
    pub foot_offset: f32,

    // === Step-Up / Snap-Down ===
    /// Whether obstructions near the feet may be climbed as steps.
    pub can_snap_up: bool,

    /// Maximum height above the feet an obstruction may sit and still be
    /// treated as a climbable step.
    pub vertical_snap_up: f32,

    /// Maximum downward teleport distance used to glue the mover to
    /// descending ground.
    pub vertical_snap_down: f32,

    /// Forward clearance required behind a step edge for a snap-up to
    /// succeed. A wall closer than this would wedge the mover.
    pub step_up_depth: f32,

    /// Maximum |normal . up| for a surface to count as a vertical riser.
    /// Ramps exceed this and are handled by ordinary sliding instead.
    pub max_riser_dot: f32,

    // === Grounding ===
    /// Length of the per-tick downward ground probe.
    pub ground_check_distance: f32,

    /// Tight threshold within which a downward hit counts as standing
    /// on ground.
    pub grounded_distance: f32,

    /// Maximum surface angle (radians from `up`) that is walkable.
    /// Steeper ground produces the sliding state.
    pub max_walk_angle: f32,

    /// Clamp applied to any velocity inherited from the floor when
    /// leaving it (jumping off platforms or physics debris).
    pub max_launch_speed: f32,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            // Bounce solver
            max_bounces: 5,
            push_decay: 0.9,
            push_enabled: true,
            angle_power: 0.5,
            epsilon: 0.001,
            skin_width: 0.01,

            // Orientation
            up: Vec3::Y,
            foot_offset: 0.9,

            // Step-up / snap-down
            can_snap_up: true,
            vertical_snap_up: 0.3,
            vertical_snap_down: 0.35,
            step_up_depth: 0.1,
            max_riser_dot: 0.34,

            // Grounding
            ground_check_distance: 5.0,
            grounded_distance: 0.05,
            max_walk_angle: std::f32::consts::FRAC_PI_3, // 60 degrees
            max_launch_speed: 5.0,
        }
    }
}

impl BounceConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config tuned for a responsive player character.
    pub fn player() -> Self {
        Self {
            max_bounces: 5,
            vertical_snap_up: 0.35,
            ..default()
        }
    }

    /// Create a config for AI-controlled characters: no pushing, fewer
    /// bounce iterations.
    pub fn npc() -> Self {
        Self {
            max_bounces: 3,
            push_enabled: false,
            ..default()
        }
    }

    /// The foot position for a mover whose pose position is `position`.
    #[inline]
    pub fn foot_position(&self, position: Vec3) -> Vec3 {
        position - self.up * self.foot_offset
    }

    /// Whether a ground surface with the given normal is walkable.
    #[inline]
    pub fn is_walkable(&self, normal: Vec3) -> bool {
        normal.angle_between(self.up) <= self.max_walk_angle
    }

    /// Builder: set the up direction. The vector is normalized; a
    /// zero-length input keeps the previous value.
    pub fn with_up(mut self, up: Vec3) -> Self {
        let normalized = up.normalize_or_zero();
        if normalized != Vec3::ZERO {
            self.up = normalized;
        }
        self
    }

    /// Builder: set the maximum bounce count.
    pub fn with_max_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    /// Builder: set the push decay factor.
    pub fn with_push_decay(mut self, decay: f32) -> Self {
        self.push_decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Builder: enable or disable pushing.
    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.push_enabled = enabled;
        self
    }

    /// Builder: set the angle decay exponent.
    pub fn with_angle_power(mut self, power: f32) -> Self {
        self.angle_power = power;
        self
    }

    /// Builder: set the snap-up parameters.
    pub fn with_snap_up(mut self, height: f32, depth: f32) -> Self {
        self.can_snap_up = true;
        self.vertical_snap_up = height;
        self.step_up_depth = depth;
        self
    }

    /// Builder: disable step climbing.
    pub fn without_snap_up(mut self) -> Self {
        self.can_snap_up = false;
        self
    }

    /// Builder: set the snap-down distance.
    pub fn with_snap_down(mut self, distance: f32) -> Self {
        self.vertical_snap_down = distance;
        self
    }

    /// Builder: set the distance from pose position to the feet.
    pub fn with_foot_offset(mut self, offset: f32) -> Self {
        self.foot_offset = offset;
        self
    }

    /// Builder: set the maximum walkable angle (radians).
    pub fn with_max_walk_angle(mut self, angle: f32) -> Self {
        self.max_walk_angle = angle;
        self
    }

    /// Builder: set the grounded distance threshold.
    pub fn with_grounded_distance(mut self, distance: f32) -> Self {
        self.grounded_distance = distance;
        self
    }

    /// Builder: set the inherited-velocity clamp.
    pub fn with_max_launch_speed(mut self, speed: f32) -> Self {
        self.max_launch_speed = speed;
        self
    }
}
