//! Perception Engine — vision test + suspicion accumulator + memory
//!
//! Работает на своём интервале (`DetectionConfig::check_interval`, default 0.2s),
//! независимо от physics tick rate — ограничивает стоимость raycast'ов.
//!
//! Suspicion curve (три режима):
//! - видим сейчас: accumulation растёт на interval/build_time, level = acc^1.5
//! - не видим, но "recently seen": спад в 3 раза медленнее, level = acc^1.5
//! - забыли (или никогда не видели): линейный спад, level = acc

use bevy::prelude::*;

use crate::config::DetectionConfig;
use crate::geometry::{angle_between_degrees, RaycastProvider};


/// Экспонента power curve (медленный рост в начале, резкий в конце)
pub const DETECTION_CURVE_EXPONENT: f32 = 1.5;

/// Во сколько раз "recently seen" decay медленнее build
pub const MEMORY_DECAY_DIVISOR: f32 = 3.0;

/// Игрок, найденный PlayerLocator'ом
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub entity: Entity,
    pub position: Vec2,
}

/// Player locator (lookup по identity tag / по сохранённому handle)
///
/// Composition root резолвит игрока один раз за tick и передаёт агентам —
/// никаких глобальных find-by-tag внутри core.
pub trait PlayerLocator {
    /// Поиск по identity tag (первый найденный игрок)
    fn find_player(&self) -> Option<PlayerView>;

    /// Lookup по handle, сохранённому в PerceptionState
    fn resolve(&self, entity: Entity) -> Option<PlayerView>;
}

impl PlayerLocator for Option<PlayerView> {
    fn find_player(&self) -> Option<PlayerView> {
        *self
    }

    fn resolve(&self, entity: Entity) -> Option<PlayerView> {
        self.filter(|view| view.entity == entity)
    }
}

impl PlayerLocator for Vec<PlayerView> {
    fn find_player(&self) -> Option<PlayerView> {
        self.first().copied()
    }

    fn resolve(&self, entity: Entity) -> Option<PlayerView> {
        self.iter().find(|view| view.entity == entity).copied()
    }
}

/// Позиция и взгляд наблюдателя на момент проверки
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub position: Vec2,
    /// Unit vector
    pub facing: Vec2,
}

/// Visibility test, дешёвые проверки первыми (short-circuit):
/// 1. угол между facing и направлением на цель < view_angle/2
/// 2. distance ≤ view_radius
/// 3. line-of-sight raycast по obstacle_mask без попаданий
pub fn is_target_visible(
    config: &DetectionConfig,
    observer: Observer,
    target: Vec2,
    geometry: &dyn RaycastProvider,
) -> bool {
    let to_target = target - observer.position;
    let distance = to_target.length();

    // Стоим в точке цели — направление не определено, считаем видимым
    let Some(direction) = to_target.try_normalize() else {
        return true;
    };

    let Some(facing) = observer.facing.try_normalize() else {
        return false;
    };

    if angle_between_degrees(facing, direction) >= config.view_angle / 2.0 {
        return false;
    }

    if distance > config.view_radius {
        return false;
    }

    geometry
        .raycast(observer.position, direction, distance, config.obstacle_mask)
        .is_none()
}

/// Состояние восприятия одного агента (мутирует только Perception Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionState {
    can_see_player: bool,
    detection_level: f32,
    /// Линейный accumulator до power curve
    suspicion: f32,
    last_known_position: Option<Vec2>,
    /// Weak handle (identity + lookup, не ownership)
    player: Option<Entity>,
    time_since_last_seen: f32,
    recently_seen: bool,
    enabled: bool,
    interval_timer: f32,
}

impl Default for PerceptionState {
    fn default() -> Self {
        Self {
            can_see_player: false,
            detection_level: 0.0,
            suspicion: 0.0,
            last_known_position: None,
            player: None,
            time_since_last_seen: 0.0,
            recently_seen: false,
            enabled: true,
            interval_timer: 0.0,
        }
    }
}

impl PerceptionState {
    // ------------------------------------------------------------------
    // Read-only outputs (Behavior State Machine, visualizer)
    // ------------------------------------------------------------------

    pub fn can_see_player(&self) -> bool {
        self.can_see_player
    }

    pub fn detection_level(&self) -> f32 {
        self.detection_level
    }

    pub fn suspicion_accumulation(&self) -> f32 {
        self.suspicion
    }

    /// Валидна только пока handle игрока сохранён
    pub fn last_known_position(&self) -> Option<Vec2> {
        self.player.and(self.last_known_position)
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn time_since_last_seen(&self) -> f32 {
        self.time_since_last_seen
    }

    pub fn recently_seen(&self) -> bool {
        self.recently_seen
    }

    // ------------------------------------------------------------------
    // Detection toggle (stealth ability и т.п.)
    // ------------------------------------------------------------------

    pub fn enable_detection(&mut self) {
        self.enabled = true;
    }

    pub fn disable_detection(&mut self) {
        self.enabled = false;
        self.can_see_player = false;
    }

    pub fn can_detect_player(&self) -> bool {
        self.enabled
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Продвинуть interval timer; вызывает `update_perception` на каждом
    /// полном интервале. Возвращает сколько раз обновились.
    pub fn tick(
        &mut self,
        delta: f32,
        config: &DetectionConfig,
        observer: Observer,
        locator: &dyn PlayerLocator,
        geometry: &dyn RaycastProvider,
    ) -> u32 {
        if config.check_interval <= 0.0 {
            return 0;
        }

        self.interval_timer += delta;
        let mut updates = 0;

        while self.interval_timer >= config.check_interval {
            self.interval_timer -= config.check_interval;
            self.update_perception(config, observer, locator, geometry);
            updates += 1;
        }

        updates
    }

    /// Один perception update (ровно один интервал)
    pub fn update_perception(
        &mut self,
        config: &DetectionConfig,
        observer: Observer,
        locator: &dyn PlayerLocator,
        geometry: &dyn RaycastProvider,
    ) {
        if !self.enabled {
            self.can_see_player = false;
            return;
        }

        // Handle потерян (despawn) → пробуем заново по tag
        let target = match self.player {
            Some(entity) => locator.resolve(entity).or_else(|| locator.find_player()),
            None => locator.find_player(),
        };

        // Игрока нет — не трогаем ни видимость, ни suspicion
        let Some(target) = target else {
            return;
        };

        let interval = config.check_interval;
        let visible = is_target_visible(config, observer, target.position, geometry);

        if visible {
            if !self.recently_seen {
                crate::log(&format!(
                    "👁️ Perception: spotted player {:?} at {:?}",
                    target.entity, target.position
                ));
            }
            self.can_see_player = true;
            self.player = Some(target.entity);
            self.last_known_position = Some(target.position);
            self.time_since_last_seen = 0.0;
            self.recently_seen = true;
        } else {
            self.can_see_player = false;
            self.time_since_last_seen += interval;

            if self.recently_seen && self.time_since_last_seen > config.memory_duration {
                crate::log(&format!(
                    "👻 Perception: forgot player {:?} after {:.1}s",
                    self.player, self.time_since_last_seen
                ));
                self.player = None;
                self.last_known_position = None;
                self.recently_seen = false;
            }
        }

        self.update_suspicion(visible, interval / config.suspicion_build_time);
    }

    fn update_suspicion(&mut self, visible: bool, step: f32) {
        if visible {
            self.suspicion = (self.suspicion + step).clamp(0.0, 1.0);
            self.detection_level = self.suspicion.powf(DETECTION_CURVE_EXPONENT);
        } else if self.recently_seen {
            self.suspicion = (self.suspicion - step / MEMORY_DECAY_DIVISOR).clamp(0.0, 1.0);
            self.detection_level = self.suspicion.powf(DETECTION_CURVE_EXPONENT);
        } else {
            self.suspicion = (self.suspicion - step).max(0.0);
            self.detection_level = self.suspicion;
        }
    }
}

#[cfg(test)]
impl PerceptionState {
    /// Готовое состояние для тестов поведения (без прогона интервалов)
    pub(crate) fn for_tests(suspicion: f32, seen: Option<PlayerView>, visible: bool) -> Self {
        let recently_seen = seen.is_some();
        Self {
            can_see_player: visible,
            detection_level: if recently_seen {
                suspicion.powf(DETECTION_CURVE_EXPONENT)
            } else {
                suspicion
            },
            suspicion,
            last_known_position: seen.map(|view| view.position),
            player: seen.map(|view| view.entity),
            recently_seen,
            ..Default::default()
        }
    }
}
