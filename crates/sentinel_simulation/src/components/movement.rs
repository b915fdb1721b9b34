//! Movement компоненты: 2D тело агента/игрока

use bevy::prelude::*;

/// 2D тело (позиция, скорость, ориентация, видимость)
///
/// Архитектура:
/// - Sentinel пишет velocity/facing в tick_physics и интегрирует position
/// - Host physics может корректировать position (collision resolution) и
///   сообщать о столкновениях через `TerrainCollision`
/// - collider_enabled/visible выключаются на время stuck-recovery
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Body2D {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Unit vector взгляда (для vision cone)
    pub facing: Vec2,
    pub collider_enabled: bool,
    pub visible: bool,
}

impl Default for Body2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            facing: Vec2::X,
            collider_enabled: true,
            visible: true,
        }
    }
}

impl Body2D {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn facing(mut self, facing: Vec2) -> Self {
        self.facing = facing.try_normalize().unwrap_or(Vec2::X);
        self
    }

    /// Повернуться в направлении (zero vector игнорируется)
    pub fn look_towards(&mut self, direction: Vec2) {
        if let Some(direction) = direction.try_normalize() {
            self.facing = direction;
        }
    }

    /// Угол взгляда (градусы от +X) — для visualizer'а
    pub fn facing_angle_degrees(&self) -> f32 {
        self.facing.y.atan2(self.facing.x).to_degrees()
    }
}
