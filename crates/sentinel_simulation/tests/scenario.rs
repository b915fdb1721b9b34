//! End-to-end сценарии через публичный API (без ECS)
//!
//! Игрок входит в поле зрения, агент накапливает подозрение, переходит по
//! thresholds; конфиги грузятся из JSON как из внешнего loader'а.

use bevy::prelude::*;
use sentinel_simulation::{
    AgentConfig, Body2D, DetectionConfig, LayerMask, ObstacleWorld, PatrolRoute, PlayerView,
    Sentinel, SentinelContext, SentinelSignal, StateKind, LAYER_ENVIRONMENT,
};

const TICK: f32 = 0.2;

struct Scene {
    detection: DetectionConfig,
    config: AgentConfig,
    route: PatrolRoute,
    world: ObstacleWorld,
    player: Option<PlayerView>,
    now: f32,
}

impl Scene {
    fn new(detection: DetectionConfig) -> Self {
        Self {
            detection,
            config: AgentConfig::default(),
            route: PatrolRoute::default(),
            world: ObstacleWorld::new(),
            player: Some(PlayerView {
                entity: Entity::PLACEHOLDER,
                position: Vec2::new(3.0, 0.0),
            }),
            now: 0.0,
        }
    }

    fn run(&mut self, sentinel: &mut Sentinel, body: &mut Body2D, ticks: usize) {
        for _ in 0..ticks {
            let ctx = SentinelContext {
                detection: &self.detection,
                config: &self.config,
                route: &self.route,
                geometry: &self.world,
                player: &self.player,
                now: self.now,
            };
            sentinel.tick_frame(TICK, body, &ctx);
            sentinel.tick_physics(TICK, body, &ctx);
            self.now += TICK;
        }
    }
}

fn scenario_detection() -> DetectionConfig {
    DetectionConfig {
        view_radius: 5.0,
        view_angle: 90.0,
        suspicion_threshold: 0.3,
        alert_threshold: 0.8,
        suspicion_build_time: 2.0,
        ..Default::default()
    }
}

#[test]
fn test_player_in_view_for_eight_intervals_makes_agent_suspicious() {
    let mut scene = Scene::new(scenario_detection());
    let mut sentinel = Sentinel::new(3);
    let mut body = Body2D::default();

    scene.run(&mut sentinel, &mut body, 8);

    let perception = sentinel.perception();
    assert!((perception.suspicion_accumulation() - 0.8).abs() < 1e-4);
    assert!((perception.detection_level() - 0.716).abs() < 1e-3);
    assert_eq!(sentinel.state_kind(), StateKind::Suspicious);
}

#[test]
fn test_patrol_jumps_straight_to_alerted_on_big_step() {
    // build_time = 1 интервал: level 0 → 1.0 за один update
    let mut scene = Scene::new(DetectionConfig {
        suspicion_build_time: TICK,
        ..scenario_detection()
    });
    let mut sentinel = Sentinel::new(3);
    let mut body = Body2D::default();

    scene.run(&mut sentinel, &mut body, 1);

    assert_eq!(sentinel.state_kind(), StateKind::Alerted);
    let signals = sentinel.drain_signals();
    assert!(!signals.contains(&SentinelSignal::Suspicious(true)));
    assert!(signals.contains(&SentinelSignal::Alerted(true)));
}

#[test]
fn test_wall_hides_player_and_agent_stays_calm() {
    let mut scene = Scene::new(scenario_detection());
    scene.world = ObstacleWorld::new().with_rect(
        Vec2::new(1.0, -2.0),
        Vec2::new(1.5, 2.0),
        LayerMask(LAYER_ENVIRONMENT),
    );
    let mut sentinel = Sentinel::new(3);
    let mut body = Body2D::default();

    scene.run(&mut sentinel, &mut body, 30);

    assert!(!sentinel.perception().can_see_player());
    assert_eq!(sentinel.perception().detection_level(), 0.0);
    assert_eq!(sentinel.state_kind(), StateKind::Patrol);
}

#[test]
fn test_alert_then_lost_sight_searches_and_gives_up() {
    let mut scene = Scene::new(DetectionConfig {
        suspicion_build_time: TICK,
        memory_duration: 20.0,
        ..scenario_detection()
    });
    scene.config.search_duration = 1.0;
    let mut sentinel = Sentinel::new(3);
    let mut body = Body2D::default();

    scene.run(&mut sentinel, &mut body, 1);
    assert_eq!(sentinel.state_kind(), StateKind::Alerted);

    // Игрок исчез за спиной
    if let Some(player) = scene.player.as_mut() {
        player.position = Vec2::new(-20.0, 0.0);
    }
    scene.run(&mut sentinel, &mut body, 1);
    assert_eq!(sentinel.state_kind(), StateKind::Search);

    // search_duration 1s → обратно в Patrol
    scene.run(&mut sentinel, &mut body, 7);
    assert_eq!(sentinel.state_kind(), StateKind::Patrol);
}

#[test]
fn test_configs_load_from_json_with_defaults() {
    let detection: DetectionConfig = serde_json::from_str(
        r#"{ "view_radius": 5.0, "view_angle": 90.0, "suspicion_build_time": 2.0 }"#,
    )
    .expect("detection config");
    assert_eq!(detection.view_radius(), 5.0);
    assert_eq!(detection.alert_threshold, DetectionConfig::default().alert_threshold);
    assert!(detection.validate().is_ok());

    let config: AgentConfig =
        serde_json::from_str(r#"{ "base_speed": 3.5, "recovery": { "teleport_cooldown": 8.0 } }"#)
            .expect("agent config");
    assert_eq!(config.base_speed, 3.5);
    assert_eq!(config.recovery.teleport_cooldown, 8.0);
    assert_eq!(config.recovery.vanish_delay, AgentConfig::default().recovery.vanish_delay);

    let broken: DetectionConfig =
        serde_json::from_str(r#"{ "suspicion_threshold": 0.9, "alert_threshold": 0.5 }"#)
            .expect("parses, but invalid");
    assert!(broken.validate().is_err());
}
