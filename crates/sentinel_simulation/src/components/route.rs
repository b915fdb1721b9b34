//! Маршрут патруля (cyclic waypoints)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Циклическая последовательность waypoints (после последнего → index 0)
///
/// Read-only во время обхода; текущий index принадлежит Patrol state.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Component)]
pub struct PatrolRoute {
    pub waypoints: Vec<Vec2>,
}

impl PatrolRoute {
    pub fn new(waypoints: impl IntoIterator<Item = Vec2>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index, приведённый к текущей длине маршрута (маршрут мог укоротиться)
    pub fn wrap_index(&self, index: usize) -> Option<usize> {
        if self.waypoints.is_empty() {
            None
        } else {
            Some(index % self.waypoints.len())
        }
    }

    pub fn waypoint(&self, index: usize) -> Option<Vec2> {
        self.wrap_index(index).map(|i| self.waypoints[i])
    }

    pub fn next_index(&self, index: usize) -> usize {
        self.wrap_index(index + 1).unwrap_or(0)
    }

    pub fn first(&self) -> Option<Vec2> {
        self.waypoints.first().copied()
    }
}
