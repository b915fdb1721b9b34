//! Scheduled continuations с cancellation token
//!
//! Timed sequences (attack wind-up, distraction, stuck-recovery) — не корутины и
//! не спящие потоки, а явные очереди шагов с таймером. Host loop двигает таймер
//! через `advance(dt)`, созревшие шаги возвращаются вызывающему коду.
//!
//! Каждая continuation несёт `CancelToken`. Scope определяет, что её отменяет:
//! - `State`: любой переход BehaviorState (attack из Alerted не переживёт смену state)
//! - `Agent`: только deactivate/destroy агента (distraction, recovery)

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelScope {
    State,
    Agent,
}

/// Snapshot epoch'ов на момент планирования
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken {
    scope: CancelScope,
    state_epoch: u32,
    agent_epoch: u32,
}

/// Epoch счётчики агента (инкремент = отзыв всех выданных токенов)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Epochs {
    state: u32,
    agent: u32,
}

impl Epochs {
    pub fn token(&self, scope: CancelScope) -> CancelToken {
        CancelToken {
            scope,
            state_epoch: self.state,
            agent_epoch: self.agent,
        }
    }

    /// Смена state: отзываем State-scoped токены
    pub fn revoke_state(&mut self) {
        self.state = self.state.wrapping_add(1);
    }

    /// Deactivate/destroy: отзываем всё
    pub fn revoke_all(&mut self) {
        self.state = self.state.wrapping_add(1);
        self.agent = self.agent.wrapping_add(1);
    }

    pub fn is_valid(&self, token: &CancelToken) -> bool {
        if token.agent_epoch != self.agent {
            return false;
        }
        match token.scope {
            CancelScope::State => token.state_epoch == self.state,
            CancelScope::Agent => true,
        }
    }
}

/// Continuation отозвана — оставшиеся шаги не должны выполниться
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Очередь отложенных шагов
///
/// Delay каждого шага отсчитывается от предыдущего шага (или от старта).
#[derive(Debug, Clone)]
pub struct Continuation<S> {
    token: CancelToken,
    steps: VecDeque<(f32, S)>,
    timer: f32,
}

impl<S> Continuation<S> {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            steps: VecDeque::new(),
            timer: 0.0,
        }
    }

    /// Добавить шаг через `delay` секунд после предыдущего
    pub fn then(mut self, delay: f32, step: S) -> Self {
        self.steps.push_back((delay.max(0.0), step));
        self
    }

    /// Продвинуть таймер; вернуть созревшие шаги по порядку
    pub fn advance(&mut self, delta: f32, epochs: &Epochs) -> Result<Vec<S>, Cancelled> {
        if !epochs.is_valid(&self.token) {
            self.steps.clear();
            return Err(Cancelled);
        }

        self.timer += delta;
        let mut due = Vec::new();

        while let Some((delay, _)) = self.steps.front() {
            if *delay > self.timer {
                break;
            }
            self.timer -= *delay;
            if let Some((_, step)) = self.steps.pop_front() {
                due.push(step);
            }
        }

        Ok(due)
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }
}
