//! Behavior State Machine: transitions, enter/execute/exit.
//!
//! Transition table (thresholds из DetectionConfig/AgentConfig):
//!
//! ```text
//! Patrol      level ≥ alert → Alerted; level ≥ suspicion → Suspicious
//! Suspicious  level ≥ 1.0 → Alerted;   level ≤ calm → Patrol
//! Alerted     потерял из виду → Search
//! Search      level ≥ 1.0 → Alerted;   elapsed ≥ search_duration | level ≤ calm → Patrol
//! Flee        remaining ≤ 0 → Patrol
//! ```
//!
//! Exit любого state отзывает State-scoped continuations (epoch) и шлёт
//! idle Movement signal; обнуление velocity тела делает Sentinel.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use super::state::{BehaviorState, MovementIntent, StateKind, StateRequest};
use crate::components::PatrolRoute;
use crate::config::{AgentConfig, DetectionConfig};
use crate::continuation::Epochs;
use crate::geometry::RaycastProvider;
use crate::perception::PerceptionState;
use crate::signals::SentinelSignal;
use crate::steering::avoid_obstacles;

/// Множители скорости относительно base_speed
pub const SUSPICIOUS_SPEED_FACTOR: f32 = 0.5;
pub const ALERTED_SPEED_FACTOR: f32 = 1.5;
pub const FLEE_SPEED_FACTOR: f32 = 2.0;

/// Порядок осмотра на waypoint'е (4 cardinal directions)
pub const LOOK_DIRECTIONS: [Vec2; 4] = [Vec2::Y, Vec2::X, Vec2::NEG_Y, Vec2::NEG_X];

/// Всё, что state читает за tick (агент его не владеет)
pub struct BehaviorContext<'a> {
    pub position: Vec2,
    pub perception: &'a PerceptionState,
    pub detection: &'a DetectionConfig,
    pub config: &'a AgentConfig,
    pub route: &'a PatrolRoute,
    pub geometry: &'a dyn RaycastProvider,
    /// Текущая позиция игрока (если locator его нашёл)
    pub player_position: Option<Vec2>,
}

impl BehaviorContext<'_> {
    /// Направление к цели через steering; None — уже на месте
    fn steer_towards(&self, target: Vec2, arrival_distance: f32) -> Option<Vec2> {
        let to_target = target - self.position;
        if to_target.length() <= arrival_distance {
            return None;
        }
        let desired = to_target.try_normalize()?;
        Some(avoid_obstacles(
            self.position,
            desired,
            &self.config.steering,
            self.geometry,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorMachine {
    state: BehaviorState,
    /// С какого waypoint'а продолжить патруль при следующем входе в Patrol
    patrol_index: usize,
    warned_empty_route: bool,
}

impl Default for BehaviorMachine {
    fn default() -> Self {
        Self {
            state: BehaviorState::Patrol {
                route_index: 0,
                waiting: false,
                wait_elapsed: 0.0,
            },
            patrol_index: 0,
            warned_empty_route: false,
        }
    }
}

impl BehaviorMachine {
    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    /// Текущий patrol waypoint (index, позиция) — только пока в Patrol
    pub fn patrol_target(&self, route: &PatrolRoute) -> Option<(usize, Vec2)> {
        let BehaviorState::Patrol { route_index, .. } = self.state else {
            return None;
        };
        let index = route.wrap_index(route_index)?;
        Some((index, route.waypoints[index]))
    }

    /// Threshold/timer transitions для текущего state
    pub fn evaluate(&self, ctx: &BehaviorContext) -> Option<StateRequest> {
        let level = ctx.perception.detection_level();
        let calm = ctx.config.calm_level;
        // Detection выключен: level заморожен, эскалация только по свежему восприятию
        let perceiving = ctx.perception.can_detect_player();

        match &self.state {
            BehaviorState::Patrol { .. } if !perceiving => None,
            BehaviorState::Patrol { .. } => {
                if level >= ctx.detection.alert_threshold {
                    Some(StateRequest::Alerted)
                } else if level >= ctx.detection.suspicion_threshold {
                    Some(StateRequest::Suspicious)
                } else {
                    None
                }
            }
            BehaviorState::Suspicious => {
                if perceiving && level >= 1.0 {
                    Some(StateRequest::Alerted)
                } else if level <= calm {
                    Some(StateRequest::Patrol)
                } else {
                    None
                }
            }
            BehaviorState::Alerted => {
                if ctx.perception.can_see_player() {
                    None
                } else {
                    Some(StateRequest::Search)
                }
            }
            BehaviorState::Search { elapsed } => {
                if level >= 1.0 && ctx.perception.can_see_player() {
                    Some(StateRequest::Alerted)
                } else if *elapsed >= ctx.config.search_duration || level <= calm {
                    Some(StateRequest::Patrol)
                } else {
                    None
                }
            }
            BehaviorState::Flee { remaining, .. } => {
                if *remaining <= 0.0 {
                    Some(StateRequest::Patrol)
                } else {
                    None
                }
            }
        }
    }

    /// exit текущего → enter нового
    pub fn transition(
        &mut self,
        request: StateRequest,
        ctx: &BehaviorContext,
        epochs: &mut Epochs,
        signals: &mut Vec<SentinelSignal>,
        rng: &mut impl Rng,
    ) {
        let from = self.state.kind();

        self.exit(signals);
        epochs.revoke_state();

        self.state = self.enter(request, ctx, signals, rng);
        self.announce(from, signals);
    }

    /// Принудительный Patrol с конкретного waypoint'а (stuck-recovery)
    pub fn restart_patrol(
        &mut self,
        index: usize,
        epochs: &mut Epochs,
        signals: &mut Vec<SentinelSignal>,
    ) {
        let from = self.state.kind();

        self.exit(signals);
        epochs.revoke_state();

        self.patrol_index = index;
        self.state = BehaviorState::Patrol {
            route_index: index,
            waiting: false,
            wait_elapsed: 0.0,
        };
        self.announce(from, signals);
    }

    fn announce(&self, from: StateKind, signals: &mut Vec<SentinelSignal>) {
        let to = self.state.kind();
        signals.push(SentinelSignal::StateChanged { from, to });
        crate::log(&format!("🔀 Sentinel: {:?} → {:?}", from, to));
    }

    fn exit(&mut self, signals: &mut Vec<SentinelSignal>) {
        match &self.state {
            BehaviorState::Patrol { route_index, .. } => {
                self.patrol_index = *route_index;
            }
            BehaviorState::Suspicious => signals.push(SentinelSignal::Suspicious(false)),
            BehaviorState::Alerted => signals.push(SentinelSignal::Alerted(false)),
            BehaviorState::Search { .. } | BehaviorState::Flee { .. } => {}
        }
        // Остаточная скорость гасится
        signals.push(SentinelSignal::Movement {
            direction: Vec2::ZERO,
            moving: false,
        });
    }

    fn enter(
        &mut self,
        request: StateRequest,
        ctx: &BehaviorContext,
        signals: &mut Vec<SentinelSignal>,
        rng: &mut impl Rng,
    ) -> BehaviorState {
        match request {
            StateRequest::Patrol => BehaviorState::Patrol {
                route_index: self.patrol_index,
                waiting: false,
                wait_elapsed: 0.0,
            },
            StateRequest::Suspicious => {
                signals.push(SentinelSignal::Suspicious(true));
                BehaviorState::Suspicious
            }
            StateRequest::Alerted => {
                signals.push(SentinelSignal::Alerted(true));
                BehaviorState::Alerted
            }
            StateRequest::Search => BehaviorState::Search { elapsed: 0.0 },
            StateRequest::Flee { duration } => {
                // Направление фиксируется на входе: от игрока, иначе случайное
                let away = ctx
                    .player_position
                    .and_then(|player| (ctx.position - player).try_normalize());
                let direction = away.unwrap_or_else(|| {
                    let angle = rng.gen_range(0.0..TAU);
                    Vec2::new(angle.cos(), angle.sin())
                });
                BehaviorState::Flee {
                    remaining: duration,
                    direction,
                }
            }
        }
    }

    /// Per-tick поведение активного state
    pub fn execute(&mut self, delta: f32, ctx: &BehaviorContext) -> MovementIntent {
        let speed = ctx.config.base_speed;

        match &mut self.state {
            BehaviorState::Patrol {
                route_index,
                waiting,
                wait_elapsed,
            } => {
                let Some(index) = ctx.route.wrap_index(*route_index) else {
                    if !self.warned_empty_route {
                        crate::log_warning("Sentinel: patrol route is empty, staying idle");
                        self.warned_empty_route = true;
                    }
                    return MovementIntent::HOLD;
                };
                // Маршрут мог укоротиться — re-clamp
                *route_index = index;

                if *waiting {
                    *wait_elapsed += delta;
                    let wait_time = ctx.config.patrol_wait_time;

                    if *wait_elapsed >= wait_time {
                        *waiting = false;
                        *wait_elapsed = 0.0;
                        *route_index = ctx.route.next_index(index);
                        return MovementIntent::HOLD;
                    }

                    let slot = ((*wait_elapsed / wait_time) * LOOK_DIRECTIONS.len() as f32) as usize;
                    let look = LOOK_DIRECTIONS[slot.min(LOOK_DIRECTIONS.len() - 1)];
                    return MovementIntent::hold_facing(look);
                }

                let waypoint = ctx.route.waypoints[index];
                match ctx.steer_towards(waypoint, ctx.config.waypoint_arrival_distance) {
                    Some(direction) => MovementIntent::moving(direction, speed),
                    None => {
                        *waiting = true;
                        *wait_elapsed = 0.0;
                        MovementIntent::HOLD
                    }
                }
            }

            BehaviorState::Suspicious => {
                let Some(target) = ctx.perception.last_known_position() else {
                    return MovementIntent::HOLD;
                };
                match ctx.steer_towards(target, ctx.config.search_arrival_distance) {
                    Some(direction) => {
                        let mut intent =
                            MovementIntent::moving(direction, speed * SUSPICIOUS_SPEED_FACTOR);
                        // Смотрим на точку, а не вдоль обхода препятствия
                        intent.facing = (target - ctx.position).try_normalize();
                        intent
                    }
                    None => MovementIntent::hold_facing(target - ctx.position),
                }
            }

            BehaviorState::Alerted => {
                let Some(player) = ctx.player_position.filter(|_| ctx.perception.can_see_player())
                else {
                    return MovementIntent::HOLD;
                };
                match ctx.steer_towards(player, ctx.config.attack_range) {
                    Some(direction) => {
                        let mut intent =
                            MovementIntent::moving(direction, speed * ALERTED_SPEED_FACTOR);
                        intent.facing = (player - ctx.position).try_normalize();
                        intent
                    }
                    // В радиусе атаки: стоим, combat check в tick_frame
                    None => MovementIntent::hold_facing(player - ctx.position),
                }
            }

            BehaviorState::Search { elapsed } => {
                *elapsed += delta;
                let Some(target) = ctx.perception.last_known_position() else {
                    return MovementIntent::HOLD;
                };
                match ctx.steer_towards(target, ctx.config.search_arrival_distance) {
                    Some(direction) => MovementIntent::moving(direction, speed),
                    None => MovementIntent::HOLD,
                }
            }

            BehaviorState::Flee {
                remaining,
                direction,
            } => {
                *remaining -= delta;
                let steered =
                    avoid_obstacles(ctx.position, *direction, &ctx.config.steering, ctx.geometry);
                MovementIntent::moving(steered, speed * FLEE_SPEED_FACTOR)
            }
        }
    }
}
