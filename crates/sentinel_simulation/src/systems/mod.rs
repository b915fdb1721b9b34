//! ECS wiring: Sentinel plugin + системы
//!
//! Порядок выполнения:
//! - FixedUpdate: item effects → terrain collisions → detection toggles →
//!   physics tick → dispatch signals
//! - Update: frame tick (combat check) → dispatch signals

use bevy::prelude::*;

use crate::events::{DamageDealt, DetectionToggle, ItemEffect, SentinelEvent, TerrainCollision};
use crate::geometry::Geometry;

pub mod sentinel;
pub mod spawn;


pub use sentinel::{
    apply_detection_toggles, apply_item_effects, dispatch_sentinel_signals,
    handle_terrain_collisions, sentinel_frame_tick, sentinel_physics_tick,
};
pub use spawn::SentinelBundle;

/// Sentinel Plugin
///
/// Регистрирует события и системы агентов. Geometry resource по умолчанию —
/// пустой ObstacleWorld (host вставляет свой provider до или после plugin'а).
pub struct SentinelPlugin;

impl Plugin for SentinelPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ItemEffect>()
            .add_event::<TerrainCollision>()
            .add_event::<DetectionToggle>()
            .add_event::<SentinelEvent>()
            .add_event::<DamageDealt>()
            .init_resource::<Geometry>()
            .add_systems(
                FixedUpdate,
                (
                    apply_item_effects,
                    handle_terrain_collisions,
                    apply_detection_toggles,
                    sentinel_physics_tick,
                    dispatch_sentinel_signals,
                )
                    .chain(), // Последовательно для детерминизма
            )
            .add_systems(
                Update,
                (sentinel_frame_tick, dispatch_sentinel_signals).chain(),
            );
    }
}
