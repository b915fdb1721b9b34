//! Sentinel Simulation Core
//!
//! Perception + behavior ядро NPC-стража для 2D stealth: видит ли агент
//! игрока, насколько он насторожен, какое поведение исполняет
//! (patrol / suspicious / alerted / search / flee), обход препятствий и
//! выход из застревания.
//!
//! Архитектура:
//! - Core (agent, perception, behavior, steering, recovery) = plain Rust с
//!   явным `dt` и trait-collaborators (`RaycastProvider`, `PlayerLocator`)
//! - ECS (systems, events) = тонкая обвязка на Bevy 0.16 (Update / FixedUpdate)

use bevy::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod agent;
pub mod behavior;
pub mod combat;
pub mod components;
pub mod config;
pub mod continuation;
pub mod events;
pub mod geometry;
pub mod logger;
pub mod perception;
pub mod recovery;
pub mod signals;
pub mod steering;
pub mod systems;

// Re-export для удобства
pub use agent::{Sentinel, SentinelContext};
pub use behavior::{BehaviorState, StateKind};
pub use components::*;
pub use config::{AgentConfig, ConfigError, DetectionConfig, RecoveryConfig, SteeringConfig};
pub use events::{
    DamageDealt, DetectionToggle, ItemEffect, ItemEffectKind, SentinelEvent, TerrainCollision,
};
pub use geometry::{
    direction_from_angle, Geometry, LayerMask, ObstacleWorld, RaycastHit, RaycastProvider,
    LAYER_ACTORS, LAYER_ENVIRONMENT, LAYER_TERRAIN,
};
pub use perception::{PerceptionState, PlayerLocator, PlayerView};
pub use signals::SentinelSignal;
pub use systems::{SentinelBundle, SentinelPlugin};

// Logger API на уровне crate (crate::log(...))
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, ConsoleLogger, LogLevel, LogPrinter, MemoryLogger,
};

/// Fixed timestep симуляции (physics tick)
pub const FIXED_HZ: f64 = 50.0;

/// Главный plugin симуляции
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 50Hz для physics tick
            .insert_resource(Time::<Fixed>::from_hz(FIXED_HZ))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            .add_plugins(SentinelPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed для RNG нового агента
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

/// Создаёт minimal Bevy App для headless симуляции (тесты, demo)
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins((MinimalPlugins, SentinelPlugin))
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(FIXED_HZ)); // 50Hz FixedUpdate

    app
}

/// Заспавнить стража с seed'ом из DeterministicRng
pub fn spawn_sentinel(
    world: &mut World,
    body: Body2D,
    route: PatrolRoute,
    detection: DetectionConfig,
    config: AgentConfig,
) -> Entity {
    let seed = world
        .get_resource_mut::<DeterministicRng>()
        .map(|mut rng| rng.next_seed())
        .unwrap_or_default();

    world
        .spawn(SentinelBundle::new(seed, body, route, detection, config))
        .id()
}
