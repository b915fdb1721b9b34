//! Spawn helpers: SentinelBundle с валидацией конфигов.

use bevy::prelude::*;

use crate::agent::Sentinel;
use crate::components::{Body2D, PatrolRoute};
use crate::config::{AgentConfig, DetectionConfig};

/// Всё, что нужно агенту в ECS
#[derive(Bundle, Clone)]
pub struct SentinelBundle {
    pub sentinel: Sentinel,
    pub body: Body2D,
    pub route: PatrolRoute,
    pub detection: DetectionConfig,
    pub config: AgentConfig,
}

impl SentinelBundle {
    /// Невалидный конфиг логируется и заменяется на default
    pub fn new(
        seed: u64,
        body: Body2D,
        route: PatrolRoute,
        detection: DetectionConfig,
        config: AgentConfig,
    ) -> Self {
        let detection = match detection.validate() {
            Ok(()) => detection,
            Err(err) => {
                crate::log_error(&format!(
                    "DetectionConfig rejected ({}), using defaults",
                    err
                ));
                DetectionConfig::default()
            }
        };

        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                crate::log_error(&format!("AgentConfig rejected ({}), using defaults", err));
                AgentConfig::default()
            }
        };

        if route.is_empty() {
            crate::log_warning("SentinelBundle: empty patrol route, agent will idle in Patrol");
        }

        Self {
            sentinel: Sentinel::new(seed),
            body,
            route,
            detection,
            config,
        }
    }
}
