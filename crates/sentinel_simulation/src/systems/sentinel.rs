//! Sentinel systems: тики агентов, item effects, collisions, signals.

use bevy::prelude::*;

use crate::agent::{Sentinel, SentinelContext};
use crate::components::{Body2D, Health, PatrolRoute, Player};
use crate::config::{AgentConfig, DetectionConfig};
use crate::events::{
    DamageDealt, DetectionToggle, ItemEffect, ItemEffectKind, SentinelEvent, TerrainCollision,
};
use crate::geometry::Geometry;
use crate::perception::PlayerView;
use crate::signals::SentinelSignal;

type SentinelQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static mut Sentinel,
        &'static mut Body2D,
        &'static DetectionConfig,
        &'static AgentConfig,
        &'static PatrolRoute,
    ),
    Without<Player>,
>;

type PlayerQuery<'w, 's> = Query<'w, 's, (Entity, &'static Body2D), (With<Player>, Without<Sentinel>)>;

/// Игроки в детерминированном порядке (по entity index)
fn collect_players(players: &PlayerQuery) -> Vec<PlayerView> {
    let mut views: Vec<PlayerView> = players
        .iter()
        .map(|(entity, body)| PlayerView {
            entity,
            position: body.position,
        })
        .collect();
    views.sort_by_key(|view| view.entity.index());
    views
}

/// Система: item effects → distract / flee / push
pub fn apply_item_effects(
    mut effects: EventReader<ItemEffect>,
    mut sentinels: SentinelQuery,
    players: PlayerQuery,
    geometry: Res<Geometry>,
    time: Res<Time>,
) {
    if effects.is_empty() {
        return;
    }
    let views = collect_players(&players);

    for effect in effects.read() {
        let Ok((mut sentinel, mut body, detection, config, route)) = sentinels.get_mut(effect.target)
        else {
            crate::log_warning(&format!(
                "ItemEffect: target {:?} is not a sentinel, ignored",
                effect.target
            ));
            continue;
        };

        match effect.effect {
            ItemEffectKind::Distract(duration) => {
                sentinel.distract(duration);
            }
            ItemEffectKind::Flee(duration) => {
                let ctx = SentinelContext {
                    detection,
                    config,
                    route,
                    geometry: geometry.provider(),
                    player: &views,
                    now: time.elapsed_secs(),
                };
                sentinel.flee(duration, &mut body, &ctx);
            }
            ItemEffectKind::Push(impulse) => sentinel.push(impulse),
        }
    }
}

/// Система: столкновения с terrain → stuck-recovery
pub fn handle_terrain_collisions(
    mut collisions: EventReader<TerrainCollision>,
    mut sentinels: SentinelQuery,
    players: PlayerQuery,
    geometry: Res<Geometry>,
    time: Res<Time>,
) {
    if collisions.is_empty() {
        return;
    }
    let views = collect_players(&players);

    for collision in collisions.read() {
        let Ok((mut sentinel, mut body, detection, config, route)) =
            sentinels.get_mut(collision.agent)
        else {
            continue;
        };

        let ctx = SentinelContext {
            detection,
            config,
            route,
            geometry: geometry.provider(),
            player: &views,
            now: time.elapsed_secs(),
        };
        sentinel.on_collision(collision.layer, &mut body, &ctx);
    }
}

/// Система: stealth ability вкл/выкл обнаружение
pub fn apply_detection_toggles(
    mut toggles: EventReader<DetectionToggle>,
    mut sentinels: Query<&mut Sentinel>,
) {
    for toggle in toggles.read() {
        let Ok(mut sentinel) = sentinels.get_mut(toggle.agent) else {
            continue;
        };
        if toggle.enabled {
            sentinel.enable_detection();
        } else {
            sentinel.disable_detection();
        }
    }
}

/// Система: fixed tick (perception, recovery, transitions, movement)
pub fn sentinel_physics_tick(
    mut sentinels: SentinelQuery,
    players: PlayerQuery,
    geometry: Res<Geometry>,
    time: Res<Time>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }
    let views = collect_players(&players);

    for (mut sentinel, mut body, detection, config, route) in sentinels.iter_mut() {
        let ctx = SentinelContext {
            detection,
            config,
            route,
            geometry: geometry.provider(),
            player: &views,
            now: time.elapsed_secs(),
        };
        sentinel.tick_physics(delta, &mut body, &ctx);
    }
}

/// Система: per-frame tick (attack sequence, combat check)
pub fn sentinel_frame_tick(
    mut sentinels: SentinelQuery,
    players: PlayerQuery,
    geometry: Res<Geometry>,
    time: Res<Time>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }
    let views = collect_players(&players);

    for (mut sentinel, body, detection, config, route) in sentinels.iter_mut() {
        let ctx = SentinelContext {
            detection,
            config,
            route,
            geometry: geometry.provider(),
            player: &views,
            now: time.elapsed_secs(),
        };
        sentinel.tick_frame(delta, &body, &ctx);
    }
}

/// Система: outbox агентов → SentinelEvent; Damage → Health игрока + DamageDealt
pub fn dispatch_sentinel_signals(
    mut sentinels: Query<(Entity, &mut Sentinel)>,
    mut healths: Query<&mut Health, With<Player>>,
    mut sentinel_events: EventWriter<SentinelEvent>,
    mut damage_events: EventWriter<DamageDealt>,
) {
    for (agent, mut sentinel) in sentinels.iter_mut() {
        for signal in sentinel.drain_signals() {
            if let SentinelSignal::Damage { target, amount } = signal {
                match healths.get_mut(target) {
                    Ok(mut health) => {
                        let applied = health.apply_damage(amount);
                        crate::log(&format!(
                            "🩸 {:?} hit {:?} for {} (hp {}/{})",
                            agent, target, applied, health.current, health.max
                        ));
                        damage_events.write(DamageDealt {
                            attacker: agent,
                            target,
                            amount: applied,
                        });
                    }
                    Err(_) => crate::log_warning(&format!(
                        "Damage from {:?}: target {:?} has no Health, ignored",
                        agent, target
                    )),
                }
            }

            sentinel_events.write(SentinelEvent { agent, signal });
        }
    }
}
