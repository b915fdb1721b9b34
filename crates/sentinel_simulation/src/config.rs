//! Параметры агента: детекция (vision + suspicion) и поведение (скорости, бой, recovery).
//!
//! Оба конфига — immutable Components, общие для всех агентов одного типа.
//! Загружаются внешним loader'ом через serde (`#[serde(default)]` — можно
//! указывать только отличающиеся поля).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::LayerMask;

/// Ошибка валидации конфига (единственный fallible API в core)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be > 0 (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("suspicion_threshold ({suspicion}) must be below alert_threshold ({alert})")]
    ThresholdOrder { suspicion: f32, alert: f32 },
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// DetectionConfig
// ============================================================================

/// Параметры восприятия (vision cone + suspicion curve)
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Component)]
#[serde(default)]
pub struct DetectionConfig {
    /// Дальность зрения (метры)
    pub view_radius: f32,
    /// Полный угол vision cone (градусы, 0-360)
    pub view_angle: f32,
    /// Слои, блокирующие line-of-sight
    pub obstacle_mask: LayerMask,
    /// detection_level для перехода Patrol → Suspicious
    pub suspicion_threshold: f32,
    /// detection_level для перехода Patrol → Alerted
    pub alert_threshold: f32,
    /// Время непрерывной видимости до accumulation = 1.0 (секунды)
    pub suspicion_build_time: f32,
    /// Сколько агент помнит игрока после потери из виду (секунды)
    pub memory_duration: f32,
    /// Интервал perception update (секунды), независим от tick rate
    pub check_interval: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            view_radius: 8.0,
            view_angle: 90.0,
            obstacle_mask: LayerMask::OBSTACLES,
            suspicion_threshold: 0.3,
            alert_threshold: 0.8,
            suspicion_build_time: 3.0,
            memory_duration: 5.0,
            check_interval: 0.2,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("view_radius", self.view_radius)?;
        in_range("view_angle", self.view_angle, 0.0, 360.0)?;
        in_range("suspicion_threshold", self.suspicion_threshold, 0.0, 1.0)?;
        in_range("alert_threshold", self.alert_threshold, 0.0, 1.0)?;
        if self.suspicion_threshold >= self.alert_threshold {
            return Err(ConfigError::ThresholdOrder {
                suspicion: self.suspicion_threshold,
                alert: self.alert_threshold,
            });
        }
        positive("suspicion_build_time", self.suspicion_build_time)?;
        non_negative("memory_duration", self.memory_duration)?;
        positive("check_interval", self.check_interval)?;
        Ok(())
    }

    // Read-only доступ для visualizer'а (vision cone mesh)

    pub fn view_angle(&self) -> f32 {
        self.view_angle
    }

    pub fn view_radius(&self) -> f32 {
        self.view_radius
    }

    pub fn obstacle_mask(&self) -> LayerMask {
        self.obstacle_mask
    }
}

// ============================================================================
// AgentConfig
// ============================================================================

/// Параметры local avoidance (5 probe rays)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct SteeringConfig {
    /// Длина probe rays (метры)
    pub ray_distance: f32,
    /// Вес perpendicular коррекции
    pub avoidance_force: f32,
    /// Слои, которые обходим
    pub obstacle_mask: LayerMask,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            ray_distance: 1.5,
            avoidance_force: 1.5,
            obstacle_mask: LayerMask::OBSTACLES,
        }
    }
}

/// Параметры stuck-recovery (vanish → warp → reappear)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Минимальный интервал между teleport'ами (секунды)
    pub teleport_cooldown: f32,
    /// Пауза между vanish effect и скрытием (секунды)
    pub vanish_delay: f32,
    /// Сколько агент остаётся скрытым (секунды)
    pub disappear_duration: f32,
    /// Collision с этими слоями = "застрял"
    pub terrain_mask: LayerMask,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            teleport_cooldown: 5.0,
            vanish_delay: 0.2,
            disappear_duration: 1.0,
            terrain_mask: LayerMask::TERRAIN,
        }
    }
}

/// Параметры поведения агента
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Component)]
#[serde(default)]
pub struct AgentConfig {
    /// Базовая скорость (м/с); Suspicious ×0.5, Alerted ×1.5, Flee ×2
    pub base_speed: f32,
    /// Пауза на waypoint'е (секунды), делится на 4 взгляда по сторонам
    pub patrol_wait_time: f32,
    pub waypoint_arrival_distance: f32,
    pub search_arrival_distance: f32,
    /// Таймаут Search → Patrol (секунды)
    pub search_duration: f32,
    /// detection_level, ниже которого агент "успокаивается"
    pub calm_level: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub attack_damage: u32,
    /// Wind-up до нанесения урона (секунды)
    pub attack_windup: f32,
    /// Recovery после удара до снятия attack-in-progress (секунды)
    pub attack_recovery: f32,
    /// Затухание knockback impulse (1/сек)
    pub knockback_damping: f32,
    pub steering: SteeringConfig,
    pub recovery: RecoveryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            patrol_wait_time: 2.0,
            waypoint_arrival_distance: 0.2,
            search_arrival_distance: 0.5,
            search_duration: 5.0,
            calm_level: 0.1,
            attack_range: 1.2,
            attack_cooldown: 1.5,
            attack_damage: 10,
            attack_windup: 0.3,
            attack_recovery: 0.2,
            knockback_damping: 6.0,
            steering: SteeringConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("base_speed", self.base_speed)?;
        non_negative("patrol_wait_time", self.patrol_wait_time)?;
        non_negative("waypoint_arrival_distance", self.waypoint_arrival_distance)?;
        non_negative("search_arrival_distance", self.search_arrival_distance)?;
        non_negative("search_duration", self.search_duration)?;
        in_range("calm_level", self.calm_level, 0.0, 1.0)?;
        non_negative("attack_range", self.attack_range)?;
        non_negative("attack_cooldown", self.attack_cooldown)?;
        non_negative("attack_windup", self.attack_windup)?;
        non_negative("attack_recovery", self.attack_recovery)?;
        non_negative("knockback_damping", self.knockback_damping)?;
        positive("steering.ray_distance", self.steering.ray_distance)?;
        non_negative("steering.avoidance_force", self.steering.avoidance_force)?;
        non_negative("recovery.teleport_cooldown", self.recovery.teleport_cooldown)?;
        non_negative("recovery.vanish_delay", self.recovery.vanish_delay)?;
        non_negative("recovery.disappear_duration", self.recovery.disappear_duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        assert_eq!(DetectionConfig::default().validate(), Ok(()));
        assert_eq!(AgentConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_detection_config_rejects_bad_values() {
        let config = DetectionConfig {
            view_radius: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "view_radius",
                value: 0.0
            })
        );

        let config = DetectionConfig {
            view_angle: 400.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "view_angle", .. })
        ));

        let config = DetectionConfig {
            suspicion_threshold: 0.9,
            alert_threshold: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOrder { .. })));
    }

    #[test]
    fn test_agent_config_rejects_negative_durations() {
        let mut config = AgentConfig::default();
        config.recovery.disappear_duration = -1.0;

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "recovery.disappear_duration must be >= 0 (got -1)"
        );
    }
}
