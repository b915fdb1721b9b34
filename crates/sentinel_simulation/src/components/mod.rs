//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: игрок и его здоровье (Player, Health)
//! - movement: 2D тело агента (Body2D)
//! - route: маршрут патруля (PatrolRoute)

pub mod actor;
pub mod movement;
pub mod route;

// Re-exports для удобного импорта
pub use actor::*;
pub use movement::*;
pub use route::*;
