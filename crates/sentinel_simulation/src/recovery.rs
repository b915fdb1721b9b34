//! Stuck-Recovery: hide → warp → reappear, когда агент застрял в terrain.
//!
//! ```text
//! collision с terrain_mask (или force_recovery)
//!   ↓ guard: не в процессе + teleport_cooldown прошёл
//! snapshot patrol point, VanishEffect(здесь)
//!   ↓ vanish_delay (0.2s)
//! Hide: collider off, invisible, perception off, velocity = 0
//!   ↓ disappear_duration (1s)
//! Reappear: VanishEffect(destination), warp, restore → Patrol
//! ```
//!
//! Destination: последний patrol snapshot, иначе первый waypoint маршрута,
//! иначе текущая позиция. Snapshot хранится явно (Option), без сравнения
//! позиции с нулём — waypoint в origin валиден.

use bevy::prelude::*;

use crate::components::{Body2D, PatrolRoute};
use crate::config::RecoveryConfig;
use crate::continuation::{CancelScope, Cancelled, Continuation, Epochs};
use crate::perception::PerceptionState;
use crate::signals::SentinelSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    Hide,
    Reappear,
}

/// Куда вернуться после warp'а (последний waypoint, к которому шли в Patrol)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatrolSnapshot {
    pub index: usize,
    pub position: Vec2,
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryState {
    sequence: Option<Continuation<RecoveryStep>>,
    last_teleport_time: Option<f32>,
    snapshot: Option<PatrolSnapshot>,
    /// Агент сейчас скрыт (Hide выполнен, Reappear ещё нет)
    hidden: bool,
    /// Detection toggle до Hide (восстанавливаем как было)
    detection_was_enabled: bool,
}

impl RecoveryState {
    pub fn is_recovering(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn snapshot(&self) -> Option<PatrolSnapshot> {
        self.snapshot
    }

    pub fn last_teleport_time(&self) -> Option<f32> {
        self.last_teleport_time
    }

    /// Обновляется только пока агент в Patrol
    pub fn record_patrol(&mut self, index: usize, position: Vec2) {
        self.snapshot = Some(PatrolSnapshot { index, position });
    }

    /// Guard: in-progress flag + cooldown с последнего старта
    pub fn can_begin(&self, now: f32, config: &RecoveryConfig) -> bool {
        if self.is_recovering() {
            return false;
        }
        self.last_teleport_time
            .is_none_or(|last| now - last >= config.teleport_cooldown)
    }

    /// Запустить sequence; false если guard не пропустил
    pub fn begin(
        &mut self,
        now: f32,
        position: Vec2,
        config: &RecoveryConfig,
        epochs: &Epochs,
        signals: &mut Vec<SentinelSignal>,
    ) -> bool {
        if !self.can_begin(now, config) {
            return false;
        }

        self.last_teleport_time = Some(now);
        self.sequence = Some(
            Continuation::new(epochs.token(CancelScope::Agent))
                .then(config.vanish_delay, RecoveryStep::Hide)
                .then(config.disappear_duration, RecoveryStep::Reappear),
        );

        signals.push(SentinelSignal::VanishEffect { position });
        crate::log(&format!("🌀 Recovery: stuck at {:?}, vanishing", position));
        true
    }

    /// Точка возврата: snapshot → первый waypoint → None
    pub fn destination(&self, route: &PatrolRoute) -> Option<PatrolSnapshot> {
        self.snapshot.or_else(|| {
            route.first().map(|position| PatrolSnapshot { index: 0, position })
        })
    }

    /// Продвинуть sequence. Some(index) — recovery закончен, нужен Patrol с index
    pub fn advance(
        &mut self,
        delta: f32,
        epochs: &Epochs,
        body: &mut Body2D,
        perception: &mut PerceptionState,
        route: &PatrolRoute,
        signals: &mut Vec<SentinelSignal>,
    ) -> Option<usize> {
        let sequence = self.sequence.as_mut()?;

        let steps = match sequence.advance(delta, epochs) {
            Ok(steps) => steps,
            Err(Cancelled) => {
                self.sequence = None;
                self.restore(body, perception);
                return None;
            }
        };

        let mut finished = None;
        for step in steps {
            match step {
                RecoveryStep::Hide => self.hide(body, perception),
                RecoveryStep::Reappear => {
                    let destination = self.destination(route);
                    let target = destination.map_or(body.position, |snapshot| snapshot.position);

                    signals.push(SentinelSignal::VanishEffect { position: target });
                    body.position = target;
                    self.restore(body, perception);
                    self.sequence = None;

                    crate::log(&format!("✨ Recovery: reappeared at {:?}", target));
                    finished = Some(destination.map_or(0, |snapshot| snapshot.index));
                }
            }
        }

        finished
    }

    /// Оборвать sequence (deactivate); тело восстановится на
    /// ближайшем `restore_if_hidden`
    pub fn cancel(&mut self) {
        self.sequence = None;
    }

    /// Вернуть collider/visibility/detection, если sequence оборвался скрытым
    pub fn restore_if_hidden(&mut self, body: &mut Body2D, perception: &mut PerceptionState) {
        if self.hidden && !self.is_recovering() {
            self.restore(body, perception);
        }
    }

    fn hide(&mut self, body: &mut Body2D, perception: &mut PerceptionState) {
        body.collider_enabled = false;
        body.visible = false;
        body.velocity = Vec2::ZERO;

        self.detection_was_enabled = perception.can_detect_player();
        perception.disable_detection();
        self.hidden = true;
    }

    fn restore(&mut self, body: &mut Body2D, perception: &mut PerceptionState) {
        if !self.hidden {
            return;
        }
        body.collider_enabled = true;
        body.visible = true;
        if self.detection_was_enabled {
            perception.enable_detection();
        }
        self.hidden = false;
    }
}
