//! Sentinel — NPC-агент: perception + behavior + combat + recovery.
//!
//! Host loop зовёт два тика:
//! - `tick_frame(dt)` — per-frame: combat check (только в Alerted)
//! - `tick_physics(dt)` — fixed: perception interval, recovery, transitions,
//!   движение через steering
//!
//! External triggers (item effects): `distract`, `flee`, `push`;
//! столкновения с terrain → `on_collision` (stuck-recovery).
//! Исходящие intent'ы копятся в outbox (`drain_signals`).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::behavior::{BehaviorContext, BehaviorMachine, BehaviorState, StateKind, StateRequest};
use crate::combat::CombatState;
use crate::components::{Body2D, PatrolRoute};
use crate::config::{AgentConfig, DetectionConfig};
use crate::continuation::{CancelScope, Cancelled, Continuation, Epochs};
use crate::geometry::{LayerMask, RaycastProvider};
use crate::perception::{Observer, PerceptionState, PlayerLocator};
use crate::recovery::RecoveryState;
use crate::signals::SentinelSignal;

#[cfg(test)]
mod agent_tests;

/// Knockback меньше этого считается погашенным
const KNOCKBACK_EPSILON: f32 = 1e-3;

/// Read-only collaborators одного тика
pub struct SentinelContext<'a> {
    pub detection: &'a DetectionConfig,
    pub config: &'a AgentConfig,
    pub route: &'a PatrolRoute,
    pub geometry: &'a dyn RaycastProvider,
    pub player: &'a dyn PlayerLocator,
    /// Время симуляции (секунды), для recovery cooldown
    pub now: f32,
}

/// NPC агент (владеет своим Perception/Behavior/Recovery state)
#[derive(Component, Debug, Clone)]
#[require(Body2D, PatrolRoute, DetectionConfig, AgentConfig)]
pub struct Sentinel {
    perception: PerceptionState,
    machine: BehaviorMachine,
    combat: CombatState,
    /// Distraction override (Agent scope: переживает смену state)
    distraction: Option<Continuation<()>>,
    recovery: RecoveryState,
    epochs: Epochs,
    active: bool,
    knockback: Vec2,
    signals: Vec<SentinelSignal>,
    rng: ChaCha8Rng,
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Sentinel {
    /// `seed` — per-agent RNG (Flee fallback direction)
    pub fn new(seed: u64) -> Self {
        Self {
            perception: PerceptionState::default(),
            machine: BehaviorMachine::default(),
            combat: CombatState::default(),
            distraction: None,
            recovery: RecoveryState::default(),
            epochs: Epochs::default(),
            active: true,
            knockback: Vec2::ZERO,
            signals: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    // ------------------------------------------------------------------
    // Read-only
    // ------------------------------------------------------------------

    pub fn perception(&self) -> &PerceptionState {
        &self.perception
    }

    pub fn state(&self) -> &BehaviorState {
        self.machine.state()
    }

    pub fn state_kind(&self) -> StateKind {
        self.machine.kind()
    }

    pub fn recovery(&self) -> &RecoveryState {
        &self.recovery
    }

    pub fn is_attacking(&self) -> bool {
        self.combat.is_attacking()
    }

    pub fn is_distracted(&self) -> bool {
        self.distraction.is_some()
    }

    pub fn is_recovering(&self) -> bool {
        self.recovery.is_recovering()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn knockback(&self) -> Vec2 {
        self.knockback
    }

    /// Забрать накопленные сигналы (outbox очищается)
    pub fn drain_signals(&mut self) -> Vec<SentinelSignal> {
        std::mem::take(&mut self.signals)
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Per-frame tick: attack sequence + combat check
    pub fn tick_frame(&mut self, delta: f32, body: &Body2D, ctx: &SentinelContext) {
        if !self.active {
            return;
        }

        let target = self.perception.player();
        self.combat
            .advance(delta, ctx.config, &self.epochs, target, &mut self.signals);

        if self.recovery.is_recovering()
            || self.distraction.is_some()
            || self.machine.kind() != StateKind::Alerted
        {
            return;
        }

        let Some(player) = target.and_then(|entity| ctx.player.resolve(entity)) else {
            return;
        };

        let distance = body.position.distance(player.position);
        if self.combat.can_start(distance, ctx.config) {
            self.combat.start(ctx.config, &self.epochs, &mut self.signals);
        }
    }

    /// Fixed tick: perception → transitions → execute → movement
    pub fn tick_physics(&mut self, delta: f32, body: &mut Body2D, ctx: &SentinelContext) {
        if !self.active {
            return;
        }

        if self.recovery.is_recovering() {
            if let Some(index) = self.recovery.advance(
                delta,
                &self.epochs,
                body,
                &mut self.perception,
                ctx.route,
                &mut self.signals,
            ) {
                self.machine
                    .restart_patrol(index, &mut self.epochs, &mut self.signals);
            }
            return;
        }
        self.recovery.restore_if_hidden(body, &mut self.perception);

        let distracted = self.advance_distraction(delta);

        let observer = Observer {
            position: body.position,
            facing: body.facing,
        };
        self.perception
            .tick(delta, ctx.detection, observer, ctx.player, ctx.geometry);

        let behavior = BehaviorContext {
            position: body.position,
            perception: &self.perception,
            detection: ctx.detection,
            config: ctx.config,
            route: ctx.route,
            geometry: ctx.geometry,
            player_position: player_position(&self.perception, ctx.player),
        };

        if let Some(request) = self.machine.evaluate(&behavior) {
            self.machine.transition(
                request,
                &behavior,
                &mut self.epochs,
                &mut self.signals,
                &mut self.rng,
            );
            body.velocity = Vec2::ZERO;
        }

        if let Some((index, position)) = self.machine.patrol_target(ctx.route) {
            self.recovery.record_patrol(index, position);
        }

        // Таймеры state (Flee.remaining, Search.elapsed) идут и во время distraction
        let intent = self.machine.execute(delta, &behavior);

        if distracted {
            self.apply_movement(delta, body, Vec2::ZERO, None, ctx.config);
        } else if self.combat.is_attacking() {
            // Во время атаки стоим (CanAct(false))
            self.apply_movement(delta, body, Vec2::ZERO, intent.facing, ctx.config);
        } else {
            self.apply_movement(delta, body, intent.velocity, intent.facing, ctx.config);
        }
    }

    /// true пока distraction активен
    fn advance_distraction(&mut self, delta: f32) -> bool {
        let Some(distraction) = self.distraction.as_mut() else {
            return false;
        };

        match distraction.advance(delta, &self.epochs) {
            Ok(_) if distraction.is_finished() => {
                crate::log("🎯 Sentinel: distraction over");
                self.distraction = None;
                false
            }
            Ok(_) => true,
            Err(Cancelled) => {
                self.distraction = None;
                false
            }
        }
    }

    fn apply_movement(
        &mut self,
        delta: f32,
        body: &mut Body2D,
        velocity: Vec2,
        facing: Option<Vec2>,
        config: &AgentConfig,
    ) {
        body.velocity = velocity + self.knockback;
        body.position += body.velocity * delta;
        if let Some(facing) = facing {
            body.look_towards(facing);
        }

        self.knockback *= (-config.knockback_damping * delta).exp();
        if self.knockback.length() < KNOCKBACK_EPSILON {
            self.knockback = Vec2::ZERO;
        }

        self.signals.push(SentinelSignal::Movement {
            direction: velocity.normalize_or_zero(),
            moving: velocity.length_squared() > f32::EPSILON,
        });
    }

    // ------------------------------------------------------------------
    // External triggers (item effects)
    // ------------------------------------------------------------------

    /// Заморозить движение на `duration` (state не меняется). Повторный
    /// вызов во время distraction — no-op.
    pub fn distract(&mut self, duration: f32) -> bool {
        if !self.active || self.distraction.is_some() {
            return false;
        }
        self.distraction =
            Some(Continuation::new(self.epochs.token(CancelScope::Agent)).then(duration, ()));
        crate::log(&format!("🎯 Sentinel: distracted for {:.1}s", duration));
        true
    }

    /// Принудительный Flee из любого state
    pub fn flee(&mut self, duration: f32, body: &mut Body2D, ctx: &SentinelContext) -> bool {
        if !self.active || self.recovery.is_recovering() {
            return false;
        }
        self.distraction = None;

        let behavior = BehaviorContext {
            position: body.position,
            perception: &self.perception,
            detection: ctx.detection,
            config: ctx.config,
            route: ctx.route,
            geometry: ctx.geometry,
            player_position: player_position(&self.perception, ctx.player),
        };
        self.machine.transition(
            StateRequest::Flee { duration },
            &behavior,
            &mut self.epochs,
            &mut self.signals,
            &mut self.rng,
        );
        body.velocity = Vec2::ZERO;
        true
    }

    /// Knockback impulse (затухает с knockback_damping)
    pub fn push(&mut self, impulse: Vec2) {
        if !self.active || self.recovery.is_recovering() {
            return;
        }
        self.knockback += impulse;
    }

    /// Столкновение тела; recovery только для terrain_mask
    pub fn on_collision(&mut self, layer: LayerMask, body: &mut Body2D, ctx: &SentinelContext) -> bool {
        if !layer.intersects(ctx.config.recovery.terrain_mask) {
            return false;
        }
        self.force_recovery(body, ctx)
    }

    /// Recovery без collision trigger'а (те же guard'ы: in-progress + cooldown)
    pub fn force_recovery(&mut self, body: &mut Body2D, ctx: &SentinelContext) -> bool {
        if !self.active || !self.recovery.can_begin(ctx.now, &ctx.config.recovery) {
            return false;
        }

        if let Some((index, position)) = self.machine.patrol_target(ctx.route) {
            self.recovery.record_patrol(index, position);
        }

        // Recovery подавляет обычное поведение целиком
        self.epochs.revoke_state();
        self.combat.cancel(&mut self.signals);
        self.distraction = None;
        self.knockback = Vec2::ZERO;
        body.velocity = Vec2::ZERO;

        self.recovery.begin(
            ctx.now,
            body.position,
            &ctx.config.recovery,
            &self.epochs,
            &mut self.signals,
        )
    }

    // ------------------------------------------------------------------
    // Activation / detection toggle
    // ------------------------------------------------------------------

    /// Выключить агента: все continuations отозваны, тики заморожены
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.epochs.revoke_all();
        self.combat.cancel(&mut self.signals);
        self.distraction = None;
        self.recovery.cancel();
        self.knockback = Vec2::ZERO;
        crate::log("💤 Sentinel: deactivated");
    }

    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        crate::log("🔔 Sentinel: activated");
    }

    pub fn enable_detection(&mut self) {
        self.perception.enable_detection();
    }

    pub fn disable_detection(&mut self) {
        self.perception.disable_detection();
    }

    pub fn can_detect_player(&self) -> bool {
        self.perception.can_detect_player()
    }
}

/// Позиция отслеживаемого игрока, иначе первого найденного по tag
fn player_position(perception: &PerceptionState, locator: &dyn PlayerLocator) -> Option<Vec2> {
    perception
        .player()
        .and_then(|entity| locator.resolve(entity))
        .or_else(|| locator.find_player())
        .map(|view| view.position)
}
