//! Steering/Avoidance — local reactive obstacle avoidance
//!
//! 5 probe rays {0°, +45°, -45°, +90°, -90°} от желаемого направления.
//! Нормали попаданий усредняются, берём перпендикуляр к средней нормали со
//! знаком "вперёд" (dot с desired ≥ 0) и смешиваем с desired.
//! Без случайности — одинаковая геометрия даёт одинаковый результат.

use bevy::prelude::*;

use crate::config::SteeringConfig;
use crate::geometry::{rotate_degrees, RaycastProvider};

/// Углы probe rays относительно desired direction (градусы)
pub const PROBE_ANGLES: [f32; 5] = [0.0, 45.0, -45.0, 90.0, -90.0];

/// Скорректировать желаемое направление с учётом препятствий рядом
///
/// `desired` — unit vector. Zero vector → zero (движение не нужно).
/// Без попаданий возвращается `desired` без изменений.
pub fn avoid_obstacles(
    origin: Vec2,
    desired: Vec2,
    config: &SteeringConfig,
    geometry: &dyn RaycastProvider,
) -> Vec2 {
    if desired.length_squared() <= f32::EPSILON {
        return Vec2::ZERO;
    }

    let mut normal_sum = Vec2::ZERO;
    let mut hits = 0;

    for angle in PROBE_ANGLES {
        let probe = rotate_degrees(desired, angle);
        if let Some(hit) = geometry.raycast(origin, probe, config.ray_distance, config.obstacle_mask) {
            normal_sum += hit.normal;
            hits += 1;
        }
    }

    if hits == 0 {
        return desired;
    }

    // Нормали взаимно погасились (узкий коридор) — коррекции нет
    let Some(average_normal) = (normal_sum / hits as f32).try_normalize() else {
        return desired;
    };

    let mut perpendicular = average_normal.perp();
    if perpendicular.dot(desired) < 0.0 {
        perpendicular = -perpendicular;
    }

    (desired + perpendicular * config.avoidance_force)
        .try_normalize()
        .unwrap_or(desired)
}
