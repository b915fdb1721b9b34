//! Tests for Sentinel (composite agent: ticks, triggers, recovery)

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::agent::{Sentinel, SentinelContext};
    use crate::behavior::StateKind;
    use crate::components::{Body2D, PatrolRoute};
    use crate::config::{AgentConfig, DetectionConfig};
    use crate::geometry::{LayerMask, ObstacleWorld, LAYER_ENVIRONMENT, LAYER_TERRAIN};
    use crate::perception::PlayerView;
    use crate::signals::SentinelSignal;

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
        /// Игрок в 3 метрах перед агентом, маршрута нет (агент стоит)
        fn new() -> Self {
            Self {
                detection: DetectionConfig {
                    view_radius: 5.0,
                    view_angle: 90.0,
                    suspicion_threshold: 0.3,
                    alert_threshold: 0.8,
                    suspicion_build_time: 2.0,
                    ..Default::default()
                },
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

        fn ctx(&self) -> SentinelContext<'_> {
            SentinelContext {
                detection: &self.detection,
                config: &self.config,
                route: &self.route,
                geometry: &self.world,
                player: &self.player,
                now: self.now,
            }
        }

        fn physics(&mut self, sentinel: &mut Sentinel, body: &mut Body2D, ticks: usize) {
            for _ in 0..ticks {
                sentinel.tick_physics(TICK, body, &self.ctx());
                self.now += TICK;
            }
        }

        fn frame(&self, sentinel: &mut Sentinel, body: &Body2D, delta: f32) {
            sentinel.tick_frame(delta, body, &self.ctx());
        }
    }

    fn damage_count(signals: &[SentinelSignal]) -> usize {
        signals
            .iter()
            .filter(|s| matches!(s, SentinelSignal::Damage { .. }))
            .count()
    }

    /// Игрок вплотную + мгновенный build → Alerted за один интервал
    fn alerted_at_melee(scene: &mut Scene) -> (Sentinel, Body2D) {
        scene.detection.suspicion_build_time = TICK;
        if let Some(player) = scene.player.as_mut() {
            player.position = Vec2::new(1.0, 0.0);
        }
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();
        scene.physics(&mut sentinel, &mut body, 1);
        assert_eq!(sentinel.state_kind(), StateKind::Alerted);
        sentinel.drain_signals();
        (sentinel, body)
    }

    #[test]
    fn test_eight_intervals_in_view_make_agent_suspicious() {
        let mut scene = Scene::new();
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        scene.physics(&mut sentinel, &mut body, 8);

        let level = sentinel.perception().detection_level();
        assert!((level - 0.8f32.powf(1.5)).abs() < 1e-4, "level = {}", level);
        assert!(sentinel.perception().can_see_player());
        assert_eq!(sentinel.state_kind(), StateKind::Suspicious);

        let signals = sentinel.drain_signals();
        assert!(signals.contains(&SentinelSignal::Suspicious(true)));
        assert!(signals.contains(&SentinelSignal::StateChanged {
            from: StateKind::Patrol,
            to: StateKind::Suspicious,
        }));
        assert!(sentinel.drain_signals().is_empty());
    }

    #[test]
    fn test_patrol_moves_towards_first_waypoint() {
        let mut scene = Scene::new();
        scene.player = None;
        scene.route = PatrolRoute::new([Vec2::new(0.0, 5.0), Vec2::new(5.0, 5.0)]);
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        scene.physics(&mut sentinel, &mut body, 5);

        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
        assert!((body.position - Vec2::new(0.0, 2.0)).length() < 1e-4);
        assert!((body.facing - Vec2::Y).length() < 1e-5);
        assert_eq!(
            sentinel.recovery().snapshot().map(|s| s.index),
            Some(0),
            "patrol snapshot обновляется в Patrol"
        );
    }

    #[test]
    fn test_alerted_agent_attacks_after_windup() {
        let mut scene = Scene::new();
        let (mut sentinel, body) = alerted_at_melee(&mut scene);

        scene.frame(&mut sentinel, &body, 0.05);
        assert!(sentinel.is_attacking());
        let started = sentinel.drain_signals();
        assert_eq!(
            started,
            vec![SentinelSignal::CanAct(false), SentinelSignal::AttackStarted]
        );

        scene.frame(&mut sentinel, &body, 0.25);
        assert_eq!(damage_count(&sentinel.drain_signals()), 0);

        scene.frame(&mut sentinel, &body, 0.125);
        assert_eq!(
            sentinel.drain_signals(),
            vec![SentinelSignal::Damage {
                target: Entity::PLACEHOLDER,
                amount: scene.config.attack_damage,
            }]
        );

        scene.frame(&mut sentinel, &body, 0.25);
        assert!(!sentinel.is_attacking());
    }

    #[test]
    fn test_no_attack_outside_alerted_or_range() {
        let mut scene = Scene::new();
        let mut sentinel = Sentinel::new(1);
        let body = Body2D::default();

        // Patrol: игрок рядом, но атаки нет
        if let Some(player) = scene.player.as_mut() {
            player.position = Vec2::new(0.5, 0.0);
        }
        scene.frame(&mut sentinel, &body, 0.1);
        assert!(!sentinel.is_attacking());

        let (mut alerted, body) = alerted_at_melee(&mut scene);
        if let Some(player) = scene.player.as_mut() {
            player.position = Vec2::new(2.0, 0.0);
        }
        scene.frame(&mut alerted, &body, 0.1);
        assert!(!alerted.is_attacking());
    }

    #[test]
    fn test_flee_mid_windup_cancels_damage() {
        let mut scene = Scene::new();
        let (mut sentinel, mut body) = alerted_at_melee(&mut scene);

        scene.frame(&mut sentinel, &body, 0.05);
        assert!(sentinel.is_attacking());

        assert!(sentinel.flee(2.0, &mut body, &scene.ctx()));
        assert_eq!(sentinel.state_kind(), StateKind::Flee);

        scene.frame(&mut sentinel, &body, 1.0);
        let signals = sentinel.drain_signals();
        assert_eq!(damage_count(&signals), 0);
        assert!(signals.contains(&SentinelSignal::CanAct(true)));
        assert!(!sentinel.is_attacking());
    }

    #[test]
    fn test_flee_runs_away_then_returns_to_patrol() {
        let mut scene = Scene::new();
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        assert!(sentinel.flee(1.0, &mut body, &scene.ctx()));
        scene.physics(&mut sentinel, &mut body, 2);

        // Игрок на +X → бежим в -X со скоростью 2 × base_speed
        assert!((body.position - Vec2::new(-1.6, 0.0)).length() < 1e-3);

        scene.physics(&mut sentinel, &mut body, 5);
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
    }

    #[test]
    fn test_distract_freezes_movement_without_changing_state() {
        let mut scene = Scene::new();
        scene.player = None;
        scene.route = PatrolRoute::new([Vec2::new(10.0, 0.0)]);
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        assert!(sentinel.distract(1.0));
        assert!(!sentinel.distract(5.0), "повторный distract — no-op");

        scene.physics(&mut sentinel, &mut body, 4);
        assert_eq!(body.position, Vec2::ZERO);
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
        assert!(sentinel.is_distracted());

        scene.physics(&mut sentinel, &mut body, 2);
        assert!(!sentinel.is_distracted());
        assert!(body.position.x > 0.0);
    }

    #[test]
    fn test_distraction_does_not_extend_flee() {
        let mut scene = Scene::new();
        scene.player = None;
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        assert!(sentinel.flee(1.0, &mut body, &scene.ctx()));
        assert!(sentinel.distract(3.0));
        scene.physics(&mut sentinel, &mut body, 7);

        // Стоим на месте, но flee-таймер дотикал
        assert_eq!(body.position, Vec2::ZERO);
        assert!(sentinel.is_distracted());
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
    }

    #[test]
    fn test_push_adds_decaying_knockback() {
        let mut scene = Scene::new();
        scene.player = None;
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        sentinel.push(Vec2::new(0.0, 4.0));
        scene.physics(&mut sentinel, &mut body, 1);

        assert!((body.position.y - 0.8).abs() < 1e-4);
        assert!(sentinel.knockback().y < 4.0);

        scene.physics(&mut sentinel, &mut body, 30);
        assert_eq!(sentinel.knockback(), Vec2::ZERO);
    }

    #[test]
    fn test_terrain_collision_runs_recovery_back_to_patrol_snapshot() {
        let mut scene = Scene::new();
        scene.player = None;
        scene.route = PatrolRoute::new([Vec2::new(0.0, 6.0), Vec2::new(6.0, 6.0)]);
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();
        scene.physics(&mut sentinel, &mut body, 2);
        sentinel.drain_signals();

        // Не terrain → игнор
        let env = LayerMask(LAYER_ENVIRONMENT);
        assert!(!sentinel.on_collision(env, &mut body, &scene.ctx()));

        let terrain = LayerMask(LAYER_TERRAIN);
        let stuck_at = body.position;
        assert!(sentinel.on_collision(terrain, &mut body, &scene.ctx()));
        assert!(!sentinel.on_collision(terrain, &mut body, &scene.ctx()));
        assert!(sentinel.is_recovering());

        scene.physics(&mut sentinel, &mut body, 2);
        assert!(!body.visible && !body.collider_enabled);
        assert!(!sentinel.can_detect_player());

        scene.physics(&mut sentinel, &mut body, 5);
        assert!(!sentinel.is_recovering());
        assert_eq!(body.position, Vec2::new(0.0, 6.0));
        assert!(body.visible && body.collider_enabled);
        assert!(sentinel.can_detect_player());
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);

        let signals = sentinel.drain_signals();
        assert_eq!(
            signals
                .iter()
                .filter_map(|s| match s {
                    SentinelSignal::VanishEffect { position } => Some(*position),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            vec![stuck_at, Vec2::new(0.0, 6.0)]
        );

        // Cooldown 5s с начала первого recovery
        assert!(!sentinel.force_recovery(&mut body, &scene.ctx()));
        scene.now += 5.0;
        assert!(sentinel.force_recovery(&mut body, &scene.ctx()));
    }

    #[test]
    fn test_recovery_without_patrol_snapshot_uses_first_waypoint() {
        let mut scene = Scene::new();
        scene.route = PatrolRoute::new([Vec2::new(-4.0, 2.0), Vec2::new(4.0, 2.0)]);
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::at(Vec2::new(1.0, -1.0));

        // Ни одного Patrol тика: сразу Flee
        sentinel.flee(10.0, &mut body, &scene.ctx());
        assert!(sentinel.force_recovery(&mut body, &scene.ctx()));
        assert_eq!(sentinel.recovery().snapshot(), None);

        scene.physics(&mut sentinel, &mut body, 7);
        assert_eq!(body.position, Vec2::new(-4.0, 2.0));
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
    }

    #[test]
    fn test_deactivate_revokes_everything_and_freezes() {
        let mut scene = Scene::new();
        let (mut sentinel, mut body) = alerted_at_melee(&mut scene);
        scene.frame(&mut sentinel, &body, 0.05);
        sentinel.distract(3.0);

        sentinel.deactivate();
        assert!(!sentinel.is_active());
        assert!(!sentinel.is_attacking());
        assert!(!sentinel.is_distracted());
        assert!(!sentinel.distract(1.0));

        let before = body;
        scene.physics(&mut sentinel, &mut body, 5);
        scene.frame(&mut sentinel, &body, 1.0);
        assert_eq!(body, before);
        assert_eq!(damage_count(&sentinel.drain_signals()), 0);

        sentinel.activate();
        scene.physics(&mut sentinel, &mut body, 1);
        assert!(sentinel.is_active());
    }

    #[test]
    fn test_deactivate_mid_recovery_restores_body_on_activate() {
        let mut scene = Scene::new();
        scene.player = None;
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        sentinel.force_recovery(&mut body, &scene.ctx());
        scene.physics(&mut sentinel, &mut body, 2);
        assert!(!body.visible);

        sentinel.deactivate();
        assert!(!sentinel.is_recovering());
        sentinel.activate();
        scene.physics(&mut sentinel, &mut body, 1);

        assert!(body.visible && body.collider_enabled);
        assert!(sentinel.can_detect_player());
    }

    #[test]
    fn test_disabled_detection_keeps_agent_calm() {
        let mut scene = Scene::new();
        let mut sentinel = Sentinel::new(1);
        let mut body = Body2D::default();

        sentinel.disable_detection();
        assert!(!sentinel.can_detect_player());
        scene.physics(&mut sentinel, &mut body, 20);

        assert_eq!(sentinel.state_kind(), StateKind::Patrol);
        assert_eq!(sentinel.perception().detection_level(), 0.0);

        sentinel.enable_detection();
        scene.physics(&mut sentinel, &mut body, 8);
        assert_eq!(sentinel.state_kind(), StateKind::Suspicious);
    }

    #[test]
    fn test_blinded_while_alerted_settles_in_search_then_patrol() {
        let mut scene = Scene::new();
        let (mut sentinel, mut body) = alerted_at_melee(&mut scene);
        scene.physics(&mut sentinel, &mut body, 2);
        assert_eq!(sentinel.perception().detection_level(), 1.0);
        sentinel.drain_signals();

        sentinel.disable_detection();
        scene.physics(&mut sentinel, &mut body, 10);
        assert_eq!(sentinel.state_kind(), StateKind::Search);

        // search_duration 5s → Patrol, дальше без эскалации
        scene.physics(&mut sentinel, &mut body, 40);
        assert_eq!(sentinel.state_kind(), StateKind::Patrol);

        let transitions: Vec<_> = sentinel
            .drain_signals()
            .into_iter()
            .filter_map(|signal| match signal {
                SentinelSignal::StateChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (StateKind::Alerted, StateKind::Search),
                (StateKind::Search, StateKind::Patrol),
            ]
        );
    }
}
