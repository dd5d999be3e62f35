//! Integration tests for the character controller.
//!
//! These tests run the full plugin pipeline (ground probe, bounce
//! resolution, ground snap, marker sync) against a backend made of
//! analytic half-space planes, so no physics engine is involved and
//! every outcome is exact.

use bevy::prelude::*;
use bounce_character_controller::backend::NoOpBackendPlugin;
use bounce_character_controller::grounding::LastGroundedState;
use bounce_character_controller::prelude::*;
use bounce_character_controller::CharacterControllerBundle;

// ==================== Analytic Test Backend ====================

/// A half-space obstruction: all points with `normal . p - offset < 0`
/// are solid.
struct MockPlane {
    normal: Vec3,
    offset: f32,
    entity: Option<Entity>,
}

impl MockPlane {
    fn floor() -> Self {
        Self {
            normal: Vec3::Y,
            offset: 0.0,
            entity: None,
        }
    }

    fn new(normal: Vec3, through: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            offset: normal.dot(through),
            entity: None,
        }
    }

    fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }
}

#[derive(Resource, Default)]
struct MockGeometry {
    planes: Vec<MockPlane>,
}

/// Marks a mock plane's entity as shovable; pushes land in [`PushLog`].
#[derive(Component)]
struct Pushable;

#[derive(Resource, Default)]
struct PushLog(Vec<(Entity, Vec3)>);

struct MockBackend;

impl KinematicQueryBackend for MockBackend {
    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }

    fn sweep(
        world: &mut World,
        _mover: Entity,
        position: Vec3,
        _rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<SurfaceHit> {
        let geometry = world.resource::<MockGeometry>();
        let mut best: Option<SurfaceHit> = None;

        for plane in &geometry.planes {
            let height = plane.normal.dot(position) - plane.offset;
            if height <= 0.0 {
                return Some(SurfaceHit::new(0.0, plane.normal, position, plane.entity));
            }

            let toward = direction.dot(plane.normal);
            if toward >= -1e-6 {
                continue;
            }

            let t = height / -toward;
            if t <= max_distance && best.map_or(true, |b| t < b.distance) {
                best = Some(SurfaceHit::new(
                    t,
                    plane.normal,
                    position + direction * t,
                    plane.entity,
                ));
            }
        }

        best
    }

    fn overlaps(world: &mut World, _mover: Entity, position: Vec3, _rotation: Quat) -> bool {
        world
            .resource::<MockGeometry>()
            .planes
            .iter()
            .any(|plane| plane.normal.dot(position) - plane.offset <= 0.0)
    }

    fn is_pushable(world: &World, entity: Entity) -> bool {
        world.get::<Pushable>(entity).is_some()
    }

    fn apply_push(world: &mut World, entity: Entity, _point: Vec3, impulse: Vec3) {
        world.resource_mut::<PushLog>().0.push((entity, impulse));
    }
}

// ==================== Harness ====================

fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(CharacterControllerPlugin::<MockBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app.init_resource::<MockGeometry>();
    app.init_resource::<PushLog>();

    app.finish();
    app.cleanup();
    app
}

fn add_plane(app: &mut App, plane: MockPlane) {
    app.world_mut()
        .resource_mut::<MockGeometry>()
        .planes
        .push(plane);
}

fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    spawn_character_with_config(app, position, BounceConfig::default())
}

fn spawn_character_with_config(app: &mut App, position: Vec3, config: BounceConfig) -> Entity {
    let transform = Transform::from_translation(position);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            CharacterControllerBundle {
                config,
                ..default()
            },
        ))
        .id()
}

fn set_intent(app: &mut App, entity: Entity, velocity: Vec3) {
    if let Some(mut intent) = app.world_mut().get_mut::<MoveIntent>(entity) {
        intent.velocity = velocity;
    }
}

/// Run one controller tick. The fixed schedule is driven directly so
/// the tick count is exact regardless of wall-clock time.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

fn position_of(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

// ==================== Grounding Tests ====================

mod grounding {
    use super::*;

    #[test]
    fn character_near_floor_is_grounded() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));

        tick(&mut app);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.ground_detected);
        assert!(state.standing_on_ground);
        assert!(state.is_grounded());

        assert!(app.world().get::<Grounded>(character).is_some());
        assert!(app.world().get::<Falling>(character).is_none());
    }

    #[test]
    fn airborne_character_is_falling() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let character = spawn_character(&mut app, Vec3::new(0.0, 3.0, 0.0));

        tick(&mut app);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.ground_detected);
        assert!(!state.standing_on_ground);
        assert!(state.falling);
        assert!((state.distance - 3.0).abs() < 0.01);

        assert!(app.world().get::<Falling>(character).is_some());
        assert!(app.world().get::<Grounded>(character).is_none());
    }

    #[test]
    fn steep_ground_produces_sliding_marker() {
        let mut app = create_test_app();
        // A 75-degree slope under the character.
        let normal = Vec3::new(0.966, 0.259, 0.0).normalize();
        add_plane(&mut app, MockPlane::new(normal, Vec3::ZERO));
        // Close enough that the vertical probe still lands within the
        // grounded distance despite the slope.
        let character = spawn_character(&mut app, normal * 0.01);

        tick(&mut app);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.standing_on_ground);
        assert!(state.sliding);

        assert!(app.world().get::<Sliding>(character).is_some());
        assert!(app.world().get::<Grounded>(character).is_none());
    }

    #[test]
    fn landing_updates_markers_and_history() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.0, 0.0));
        set_intent(&mut app, character, Vec3::new(0.0, -5.0, 0.0));

        run_ticks(&mut app, 60);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.standing_on_ground, "character should have landed");
        assert!(position_of(&app, character).y < 0.05);

        assert!(app.world().get::<Grounded>(character).is_some());
        assert!(app.world().get::<Falling>(character).is_none());

        // The previous tick's state survives for transition detection.
        let last = app.world().get::<LastGroundedState>(character).unwrap();
        assert!(last.0.standing_on_ground);
    }
}

// ==================== Movement Tests ====================

mod movement {
    use super::*;

    #[test]
    fn intent_moves_character_across_open_floor() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));
        set_intent(&mut app, character, Vec3::new(2.0, 0.0, 0.0));

        run_ticks(&mut app, 60);

        let position = position_of(&app, character);
        assert!(
            (position.x - 2.0).abs() < 0.05,
            "one second at 2 m/s should cover ~2 units, got {}",
            position.x
        );
        // Snapped down to rest just above the floor.
        assert!(position.y.abs() < 0.01);
    }

    #[test]
    fn wall_stops_forward_motion() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        add_plane(
            &mut app,
            MockPlane::new(Vec3::NEG_X, Vec3::new(3.0, 0.0, 0.0)),
        );
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));
        set_intent(&mut app, character, Vec3::new(5.0, 0.0, 0.0));

        run_ticks(&mut app, 120);

        let position = position_of(&app, character);
        assert!(position.x < 3.0, "wall at x=3 breached: {}", position.x);
        assert!(position.x > 2.9, "character should reach the wall");

        let trace = app.world().get::<BounceTrace>(character).unwrap();
        assert!(trace.hit_anything());
    }

    #[test]
    fn angled_wall_deflects_motion_along_it() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        add_plane(
            &mut app,
            MockPlane::new(Vec3::new(-1.0, 0.0, 1.0), Vec3::new(2.0, 0.0, 0.0)),
        );
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));
        set_intent(&mut app, character, Vec3::new(3.0, 0.0, 0.0));

        run_ticks(&mut app, 120);

        let position = position_of(&app, character);
        assert!(
            position.z > 0.5,
            "motion should deflect along the wall, got z = {}",
            position.z
        );
        // Never through the wall.
        let breach = Vec3::new(-1.0, 0.0, 1.0).normalize().dot(position)
            - Vec3::new(-1.0, 0.0, 1.0).normalize().dot(Vec3::new(2.0, 0.0, 0.0));
        assert!(breach > -0.001);
    }

    #[test]
    fn every_pass_ends_with_a_stop_record() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        // Airborne so the ground snap leaves the resolved position alone.
        let character = spawn_character(&mut app, Vec3::new(0.0, 3.0, 0.0));
        set_intent(&mut app, character, Vec3::new(1.0, 0.0, 0.0));

        tick(&mut app);

        let trace = app.world().get::<BounceTrace>(character).unwrap();
        assert!(!trace.records.is_empty());
        assert_eq!(trace.records.last().unwrap().action, BounceAction::Stop);
        assert_eq!(
            trace.final_position().unwrap(),
            position_of(&app, character)
        );
    }

    #[test]
    fn pushable_wall_receives_impulses() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let crate_entity = app.world_mut().spawn(Pushable).id();
        add_plane(
            &mut app,
            MockPlane::new(Vec3::NEG_X, Vec3::new(1.0, 0.0, 0.0)).with_entity(crate_entity),
        );
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));
        set_intent(&mut app, character, Vec3::new(5.0, 0.0, 0.0));

        run_ticks(&mut app, 30);

        let log = app.world().resource::<PushLog>();
        assert!(!log.0.is_empty(), "pushes should have been applied");
        let (pushed, impulse) = log.0[0];
        assert_eq!(pushed, crate_entity);
        assert!(impulse.x > 0.0, "push should point into the wall");
    }

    #[test]
    fn push_disabled_config_never_pushes() {
        let mut app = create_test_app();
        add_plane(&mut app, MockPlane::floor());
        let crate_entity = app.world_mut().spawn(Pushable).id();
        add_plane(
            &mut app,
            MockPlane::new(Vec3::NEG_X, Vec3::new(1.0, 0.0, 0.0)).with_entity(crate_entity),
        );
        let character = spawn_character_with_config(
            &mut app,
            Vec3::new(0.0, 0.02, 0.0),
            BounceConfig::default().with_push_enabled(false),
        );
        set_intent(&mut app, character, Vec3::new(5.0, 0.0, 0.0));

        run_ticks(&mut app, 30);

        assert!(app.world().resource::<PushLog>().0.is_empty());
    }
}

// ==================== Moving Platform Tests ====================

mod platforms {
    use super::*;

    #[test]
    fn standing_rider_is_carried() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                MovingPlatform {
                    velocity: Vec3::new(1.0, 0.0, 0.0),
                    ..default()
                },
            ))
            .id();
        add_plane(&mut app, MockPlane::floor().with_entity(platform));
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));

        run_ticks(&mut app, 60);

        let position = position_of(&app, character);
        assert!(
            (position.x - 1.0).abs() < 0.05,
            "rider should be carried ~1 unit, got {}",
            position.x
        );
    }

    #[test]
    fn movement_weight_scales_the_carry() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                MovingPlatform {
                    velocity: Vec3::new(1.0, 0.0, 0.0),
                    movement_weight: 0.5,
                    ..default()
                },
            ))
            .id();
        add_plane(&mut app, MockPlane::floor().with_entity(platform));
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));

        run_ticks(&mut app, 60);

        let position = position_of(&app, character);
        assert!(
            (position.x - 0.5).abs() < 0.05,
            "half weight should carry ~0.5 units, got {}",
            position.x
        );
    }

    #[test]
    fn rider_inherits_platform_transfer_velocity() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                MovingPlatform {
                    velocity: Vec3::new(1.0, 0.0, 0.0),
                    transfer_weight: 0.5,
                    ..default()
                },
            ))
            .id();
        add_plane(&mut app, MockPlane::floor().with_entity(platform));
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));

        tick(&mut app);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.standing_on_ground);
        assert!((state.inherited_velocity - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn suppressing_platform_hands_over_nothing() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                MovingPlatform {
                    velocity: Vec3::new(1.0, 0.0, 0.0),
                    suppress_transfer: true,
                    ..default()
                },
            ))
            .id();
        add_plane(&mut app, MockPlane::floor().with_entity(platform));
        let character = spawn_character(&mut app, Vec3::new(0.0, 0.02, 0.0));

        tick(&mut app);

        let state = app.world().get::<GroundedState>(character).unwrap();
        assert!(state.standing_on_ground);
        assert_eq!(state.inherited_velocity, Vec3::ZERO);
    }

    #[test]
    fn airborne_character_is_not_carried() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((
                Transform::default(),
                MovingPlatform {
                    velocity: Vec3::new(1.0, 0.0, 0.0),
                    ..default()
                },
            ))
            .id();
        add_plane(&mut app, MockPlane::floor().with_entity(platform));
        let character = spawn_character(&mut app, Vec3::new(0.0, 2.0, 0.0));

        run_ticks(&mut app, 60);

        let position = position_of(&app, character);
        assert!(
            position.x.abs() < 0.001,
            "airborne character should not be carried, got {}",
            position.x
        );
    }
}
