//! Behavior states (closed tagged variant) и их параметры.

use bevy::prelude::*;

/// Активное поведение агента (ровно одно)
///
/// Lifecycle: создаётся при переходе, enter один раз, execute каждый physics
/// tick, exit один раз перед следующим enter.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorState {
    /// Patrol — обход маршрута, пауза с осмотром на каждом waypoint'е
    Patrol {
        route_index: usize,
        waiting: bool,
        /// Сколько уже стоим на waypoint'е (секунды)
        wait_elapsed: f32,
    },

    /// Suspicious — идём проверить last known position (медленно)
    Suspicious,

    /// Alerted — преследуем видимого игрока, бой в радиусе атаки
    Alerted,

    /// Search — потеряли из виду, обыскиваем last known position
    Search {
        elapsed: f32,
    },

    /// Flee — бегство в фиксированном направлении (item effect)
    Flee {
        remaining: f32,
        direction: Vec2,
    },
}

impl BehaviorState {
    pub fn kind(&self) -> StateKind {
        match self {
            BehaviorState::Patrol { .. } => StateKind::Patrol,
            BehaviorState::Suspicious => StateKind::Suspicious,
            BehaviorState::Alerted => StateKind::Alerted,
            BehaviorState::Search { .. } => StateKind::Search,
            BehaviorState::Flee { .. } => StateKind::Flee,
        }
    }
}

/// Тег state без payload (для сигналов, логов, сравнений в тестах)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum StateKind {
    Patrol,
    Suspicious,
    Alerted,
    Search,
    Flee,
}

/// Запрос перехода (threshold-based или external trigger)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateRequest {
    Patrol,
    Suspicious,
    Alerted,
    Search,
    Flee { duration: f32 },
}

impl StateRequest {
    pub fn kind(&self) -> StateKind {
        match self {
            StateRequest::Patrol => StateKind::Patrol,
            StateRequest::Suspicious => StateKind::Suspicious,
            StateRequest::Alerted => StateKind::Alerted,
            StateRequest::Search => StateKind::Search,
            StateRequest::Flee { .. } => StateKind::Flee,
        }
    }
}

/// Результат execute: скорость + куда смотреть
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntent {
    pub velocity: Vec2,
    pub facing: Option<Vec2>,
}

impl MovementIntent {
    /// Стоять на месте
    pub const HOLD: MovementIntent = MovementIntent {
        velocity: Vec2::ZERO,
        facing: None,
    };

    pub fn hold_facing(direction: Vec2) -> Self {
        Self {
            velocity: Vec2::ZERO,
            facing: direction.try_normalize(),
        }
    }

    pub fn moving(direction: Vec2, speed: f32) -> Self {
        Self {
            velocity: direction * speed,
            facing: direction.try_normalize(),
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.length_squared() > f32::EPSILON
    }
}
