//! Headless demo: страж патрулирует, игрок заходит в поле зрения
//!
//! Игрок идёт вдоль стены к стражу; в логах видны переходы
//! Patrol → Suspicious → Alerted и атаки.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use sentinel_simulation::{
    create_headless_app, spawn_sentinel, AgentConfig, Body2D, DetectionConfig, Geometry, Health,
    LayerMask, ObstacleWorld, PatrolRoute, Player, SentinelEvent, SentinelSignal, LAYER_ENVIRONMENT,
    LAYER_TERRAIN,
};

/// Игрок медленно идёт к стражу по -X
fn walk_player(time: Res<Time>, mut players: Query<&mut Body2D, With<Player>>) {
    for mut body in players.iter_mut() {
        if body.position.x > 1.0 {
            body.position.x -= 0.8 * time.delta_secs();
        }
    }
}

fn print_transitions(mut events: EventReader<SentinelEvent>) {
    for event in events.read() {
        if let SentinelSignal::StateChanged { from, to } = event.signal {
            println!("{:?}: {:?} → {:?}", event.agent, from, to);
        }
    }
}

fn main() {
    let seed = 42;
    println!("Starting sentinel headless demo (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(20)))
        .insert_resource(Geometry::new(
            ObstacleWorld::new()
                .with_rect(Vec2::new(-1.0, 2.0), Vec2::new(9.0, 2.5), LayerMask(LAYER_ENVIRONMENT))
                .with_circle(Vec2::new(4.0, -3.0), 0.8, LayerMask(LAYER_TERRAIN)),
        ))
        .add_systems(FixedUpdate, walk_player)
        .add_systems(Update, print_transitions);

    let guard = spawn_sentinel(
        app.world_mut(),
        Body2D::at(Vec2::new(-2.0, 0.0)),
        PatrolRoute::new([Vec2::new(-2.0, 0.0), Vec2::new(0.0, 0.0)]),
        DetectionConfig::default(),
        AgentConfig::default(),
    );
    let player = app
        .world_mut()
        .spawn((Player, Body2D::at(Vec2::new(7.0, 0.5)), Health::new(100)))
        .id();

    // 20 секунд симуляции (50 frame × 20ms)
    for tick in 0..1000 {
        app.update();

        if tick % 250 == 0 {
            let world = app.world();
            if let (Some(sentinel), Some(health)) = (
                world.get::<sentinel_simulation::Sentinel>(guard),
                world.get::<Health>(player),
            ) {
                println!(
                    "Tick {}: {:?}, detection {:.2}, player hp {}/{}",
                    tick,
                    sentinel.state_kind(),
                    sentinel.perception().detection_level(),
                    health.current,
                    health.max
                );
            }
        }
    }

    println!("Simulation complete!");
}
