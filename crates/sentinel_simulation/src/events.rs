//! Sentinel events (host ↔ ECS)
//!
//! Входящие: item effects, terrain collisions, detection toggles.
//! Исходящие: SentinelEvent (animation/visual intent), DamageDealt.

use bevy::prelude::*;

use crate::geometry::LayerMask;
use crate::signals::SentinelSignal;

/// Item effect, применённый к агенту (distract / flee / push)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ItemEffect {
    pub target: Entity,
    pub effect: ItemEffectKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemEffectKind {
    /// Заморозить движение на N секунд
    Distract(f32),
    /// Принудительный Flee на N секунд
    Flee(f32),
    /// Knockback impulse
    Push(Vec2),
}

/// Host physics: тело агента столкнулось с геометрией слоя `layer`
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct TerrainCollision {
    pub agent: Entity,
    pub layer: LayerMask,
}

/// Включить/выключить обнаружение игрока (stealth ability)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DetectionToggle {
    pub agent: Entity,
    pub enabled: bool,
}

/// Intent агента для animation/visual подписчиков
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SentinelEvent {
    pub agent: Entity,
    pub signal: SentinelSignal,
}

/// Урон, реально снятый с Health игрока
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub amount: u32,
}
