//! Combat engagement: melee attack sequence агента.
//!
//! # Attack Flow
//!
//! ```text
//! tick_frame: Alerted + player в attack_range + cooldown прошёл
//!   ↓
//! CanAct(false) + AttackStarted (wind-up начинается)
//!   ↓ attack_windup (0.3s)
//! Strike → Damage { target, amount }
//!   ↓ attack_recovery (0.2s)
//! Finish → CanAct(true), attack-in-progress сброшен
//! ```
//!
//! Sequence — continuation со State-scoped токеном: смена BehaviorState
//! посреди wind-up отменяет удар (урон не наносится).

use bevy::prelude::*;

use crate::config::AgentConfig;
use crate::continuation::{CancelScope, Cancelled, Continuation, Epochs};
use crate::signals::SentinelSignal;

/// Шаги attack sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStep {
    /// Конец wind-up: урон по игроку
    Strike,
    /// Конец recovery: можно снова двигаться/атаковать
    Finish,
}

/// Combat state агента (attack-in-progress + cooldown)
#[derive(Debug, Clone, Default)]
pub struct CombatState {
    attack: Option<Continuation<AttackStep>>,
    /// Секунды с начала последней атаки (None — ещё не атаковал)
    since_last_attack: Option<f32>,
}

impl CombatState {
    pub fn is_attacking(&self) -> bool {
        self.attack.is_some()
    }

    /// Прошёл ли cooldown с последней атаки
    pub fn is_ready(&self, config: &AgentConfig) -> bool {
        self.since_last_attack
            .is_none_or(|elapsed| elapsed >= config.attack_cooldown)
    }

    /// Условия старта атаки (без учёта текущего BehaviorState)
    pub fn can_start(&self, distance_to_player: f32, config: &AgentConfig) -> bool {
        !self.is_attacking() && distance_to_player <= config.attack_range && self.is_ready(config)
    }

    /// Запустить attack sequence (re-entrant вызов — no-op)
    pub fn start(
        &mut self,
        config: &AgentConfig,
        epochs: &Epochs,
        signals: &mut Vec<SentinelSignal>,
    ) -> bool {
        if self.is_attacking() {
            return false;
        }

        self.attack = Some(
            Continuation::new(epochs.token(CancelScope::State))
                .then(config.attack_windup, AttackStep::Strike)
                .then(config.attack_recovery, AttackStep::Finish),
        );
        self.since_last_attack = Some(0.0);

        signals.push(SentinelSignal::CanAct(false));
        signals.push(SentinelSignal::AttackStarted);
        crate::log("⚔️ Sentinel: attack started (wind-up)");
        true
    }

    /// Продвинуть cooldown и активную атаку
    ///
    /// `target` — игрок, которому достанется Strike (weak handle из Perception).
    pub fn advance(
        &mut self,
        delta: f32,
        config: &AgentConfig,
        epochs: &Epochs,
        target: Option<Entity>,
        signals: &mut Vec<SentinelSignal>,
    ) {
        if let Some(elapsed) = self.since_last_attack.as_mut() {
            *elapsed += delta;
        }

        let Some(attack) = self.attack.as_mut() else {
            return;
        };

        match attack.advance(delta, epochs) {
            Ok(steps) => {
                for step in steps {
                    match step {
                        AttackStep::Strike => match target {
                            Some(target) => {
                                signals.push(SentinelSignal::Damage {
                                    target,
                                    amount: config.attack_damage,
                                });
                                crate::log(&format!(
                                    "💥 Sentinel: strike {:?} for {}",
                                    target, config.attack_damage
                                ));
                            }
                            None => crate::log("💨 Sentinel: strike missed (no target)"),
                        },
                        AttackStep::Finish => {
                            self.attack = None;
                            signals.push(SentinelSignal::CanAct(true));
                        }
                    }
                }
            }
            Err(Cancelled) => {
                crate::log("🚫 Sentinel: attack cancelled (state changed)");
                self.cancel(signals);
            }
        }
    }

    /// Сбросить attack-in-progress (deactivate, отменённый токен)
    pub fn cancel(&mut self, signals: &mut Vec<SentinelSignal>) {
        if self.attack.take().is_some() {
            signals.push(SentinelSignal::CanAct(true));
        }
    }
}
