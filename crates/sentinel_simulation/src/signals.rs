//! Исходящие сигналы агента (animation/visual intent sink, combat, effects)
//!
//! Core никогда не читает состояние анимации обратно — только пишет intent'ы
//! в outbox. ECS слой переводит их в `SentinelEvent` и применяет урон.

use bevy::prelude::*;

use crate::behavior::StateKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SentinelSignal {
    /// Направление движения + moving flag (каждый physics tick)
    Movement { direction: Vec2, moving: bool },
    /// "alerted" animation flag
    Alerted(bool),
    /// "suspicious" animation flag
    Suspicious(bool),
    /// Attack trigger (начало wind-up)
    AttackStarted,
    /// false = "cannot move/attack" на время атаки
    CanAct(bool),
    /// Урон player health collaborator'у
    Damage { target: Entity, amount: u32 },
    /// Vanish effect hook (stuck-recovery)
    VanishEffect { position: Vec2 },
    StateChanged { from: StateKind, to: StateKind },
}
