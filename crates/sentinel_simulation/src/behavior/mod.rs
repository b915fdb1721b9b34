//! Behavior State Machine модуль
//!
//! Exactly one active state на агента. Transitions по detection level
//! (thresholds) и таймерам; Flee — только external trigger (item effect).

pub mod machine;
pub mod state;


pub use machine::{
    BehaviorContext, BehaviorMachine, ALERTED_SPEED_FACTOR, FLEE_SPEED_FACTOR, LOOK_DIRECTIONS,
    SUSPICIOUS_SPEED_FACTOR,
};
pub use state::{BehaviorState, MovementIntent, StateKind, StateRequest};
