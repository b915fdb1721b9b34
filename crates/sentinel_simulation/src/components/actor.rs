//! Компоненты игрока: Player marker, Health

use bevy::prelude::*;

/// Marker: игрок (identity tag для PlayerLocator lookup)
///
/// Автоматически добавляет Health и Body2D через Required Components.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Health, crate::components::Body2D)]
pub struct Player;

/// Здоровье игрока (player health collaborator)
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    /// Применить урон, вернуть сколько реально снято
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_apply_damage() {
        let mut health = Health::new(30);

        assert_eq!(health.apply_damage(10), 10);
        assert_eq!(health.current, 20);
        assert!(health.is_alive());

        assert_eq!(health.apply_damage(100), 20); // Saturating
        assert_eq!(health.current, 0);
        assert!(!health.is_alive());
    }
}
