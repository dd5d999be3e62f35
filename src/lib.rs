//! # `bounce_character_controller`
//!
//! A 3D kinematic character controller built on an iterative
//! sweep-and-bounce solver, with physics backend abstraction.
//!
//! This crate provides a deterministic, tuneable character controller
//! that:
//! - Resolves movement by sweeping the collision volume and deflecting
//!   off surfaces, never by solver forces
//! - Records every resolution pass as a replayable trace of bounces
//! - Climbs stairs and curbs with a two-phase step-up
//! - Snaps to ground that falls away beneath the character
//! - Rides moving platforms and inherits their velocity on departure
//! - Shoves dynamic bodies aside, shedding momentum into push impulses
//! - Abstracts the geometry queries for easy backend swapping (Rapier3D
//!   included behind the `rapier3d` feature)
//!
//! ## Architecture
//!
//! The controller is **kinematic**: it owns its transform outright.
//! 1. A downward probe classifies the character's relationship to the
//!    ground each tick
//! 2. The desired velocity (plus any platform carry) becomes a momentum
//!    budget for the tick
//! 3. The bounce solver spends that budget against the environment,
//!    sweeping and deflecting until it is exhausted
//! 4. Marker components mirror the resulting state for gameplay queries
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use bounce_character_controller::prelude::*;
//!
//! // Components for a player character
//! let config = BounceConfig::player();
//! let intent = MoveIntent::idle();
//!
//! // Spawn these with a `CharacterControllerBundle` and a collision
//! // shape understood by your backend
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod bounce;
pub mod collision;
pub mod config;
pub mod grounding;
pub mod intent;
pub mod platform;
pub mod state;
pub mod step;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::KinematicQueryBackend;
    pub use crate::bounce::{
        get_bounces, single_bounce, Bounce, BounceAction, BounceTrace, SweepSource,
    };
    pub use crate::collision::SurfaceHit;
    pub use crate::config::BounceConfig;
    pub use crate::grounding::{GroundedState, VelocityHistory};
    pub use crate::intent::MoveIntent;
    pub use crate::platform::MovingPlatform;
    pub use crate::state::{Falling, Grounded, Sliding};
    pub use crate::{CharacterControllerBundle, CharacterControllerPlugin};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// Everything a character entity needs besides its transform and the
/// backend's collision shape.
#[derive(Bundle, Default)]
pub struct CharacterControllerBundle {
    /// Solver tunables.
    pub config: config::BounceConfig,
    /// Desired velocity input.
    pub intent: intent::MoveIntent,
    /// Current ground probe result.
    pub grounded: grounding::GroundedState,
    /// Previous tick's ground probe result.
    pub last_grounded: grounding::LastGroundedState,
    /// Smoothed velocity window.
    pub velocity_history: grounding::VelocityHistory,
    /// Last resolution trace.
    pub trace: bounce::BounceTrace,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a geometry query backend `B` which
/// provides the actual collision queries (shape sweeps, overlap tests,
/// push impulses).
///
/// # Type Parameters
/// - `B`: The backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With the Rapier3D backend (requires the `rapier3d` feature):
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use bounce_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::KinematicQueryBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::KinematicQueryBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::KinematicQueryBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::BounceConfig>();
        app.register_type::<bounce::Bounce>();
        app.register_type::<bounce::BounceAction>();
        app.register_type::<bounce::BounceTrace>();
        app.register_type::<grounding::GroundedState>();
        app.register_type::<grounding::LastGroundedState>();
        app.register_type::<grounding::VelocityHistory>();
        app.register_type::<intent::MoveIntent>();
        app.register_type::<platform::MovingPlatform>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Sliding>();
        app.register_type::<state::Falling>();

        // Add the backend plugin
        app.add_plugins(B::plugin());

        // Core systems run in FixedUpdate for deterministic movement
        app.add_systems(
            FixedUpdate,
            (
                systems::update_grounded::<B>,
                systems::resolve_movement::<B>,
                systems::snap_to_ground::<B>,
                systems::sync_state_markers,
            )
                .chain(),
        );
    }
}
