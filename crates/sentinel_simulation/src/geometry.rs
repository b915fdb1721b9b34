//! Geometry queries: collision layers, raycast provider, reference obstacle world.
//!
//! Perception (line-of-sight) и Steering (obstacle probing) не знают ничего про
//! физический движок — они видят только `RaycastProvider`. Host подключает свою
//! реализацию через `Geometry` resource; `ObstacleWorld` — простая 2D реализация
//! для headless тестов и demo.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Collision layers
// ============================================================================

/// Layer 1: Actors (player, NPC)
pub const LAYER_ACTORS: u32 = 0b1;

/// Layer 2: Environment (стены, ящики — блокируют LOS и обходятся steering'ом)
pub const LAYER_ENVIRONMENT: u32 = 0b10;

/// Layer 3: Terrain (скалы/рельеф — столкновение запускает stuck-recovery)
pub const LAYER_TERRAIN: u32 = 0b100;

/// Битовая маска слоёв (фильтр для raycast и collision events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask: всё что блокирует взгляд и движение (environment + terrain)
    pub const OBSTACLES: LayerMask = LayerMask(LAYER_ENVIRONMENT | LAYER_TERRAIN);

    /// Mask: только terrain (триггер stuck-recovery)
    pub const TERRAIN: LayerMask = LayerMask(LAYER_TERRAIN);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

// ============================================================================
// Raycast provider
// ============================================================================

/// Результат raycast (ближайшее пересечение)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Vec2,
    /// Нормаль поверхности в точке попадания (unit)
    pub normal: Vec2,
    pub distance: f32,
    pub layer: LayerMask,
}

/// Geometry/raycast capability (реализуется host'ом)
///
/// `direction` — unit vector. Возвращает ближайшее попадание на дистанции
/// `<= max_distance` среди объектов, чей слой пересекается с `filter`.
pub trait RaycastProvider: Send + Sync + 'static {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: LayerMask,
    ) -> Option<RaycastHit>;
}

/// Resource: активный geometry provider
#[derive(Resource)]
pub struct Geometry(pub Box<dyn RaycastProvider>);

impl Geometry {
    pub fn new(provider: impl RaycastProvider) -> Self {
        Self(Box::new(provider))
    }

    pub fn provider(&self) -> &dyn RaycastProvider {
        self.0.as_ref()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(ObstacleWorld::default())
    }
}

// ============================================================================
// Direction helpers
// ============================================================================

/// Повернуть вектор на угол (градусы, против часовой)
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Unit direction из угла (градусы от +X, против часовой)
///
/// Helper для visualizer'а vision cone: края конуса = facing ± view_angle/2.
pub fn direction_from_angle(angle_degrees: f32) -> Vec2 {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    Vec2::new(cos, sin)
}

/// Угол между двумя unit векторами (градусы, 0..=180)
pub fn angle_between_degrees(a: Vec2, b: Vec2) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

// ============================================================================
// ObstacleWorld — reference 2D implementation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Circle {
        center: Vec2,
        radius: f32,
        layer: LayerMask,
    },
    /// Axis-aligned box
    Rect {
        min: Vec2,
        max: Vec2,
        layer: LayerMask,
    },
}

impl Obstacle {
    pub fn layer(&self) -> LayerMask {
        match self {
            Obstacle::Circle { layer, .. } | Obstacle::Rect { layer, .. } => *layer,
        }
    }

    /// Пересечение луча с obstacle (distance по лучу + нормаль)
    fn intersect(&self, origin: Vec2, direction: Vec2) -> Option<(f32, Vec2)> {
        match self {
            Obstacle::Circle { center, radius, .. } => {
                intersect_circle(origin, direction, *center, *radius)
            }
            Obstacle::Rect { min, max, .. } => intersect_rect(origin, direction, *min, *max),
        }
    }
}

/// Статичный набор obstacles (circles + AABB)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleWorld {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circle(mut self, center: Vec2, radius: f32, layer: LayerMask) -> Self {
        self.obstacles.push(Obstacle::Circle {
            center,
            radius,
            layer,
        });
        self
    }

    pub fn with_rect(mut self, min: Vec2, max: Vec2, layer: LayerMask) -> Self {
        self.obstacles.push(Obstacle::Rect {
            min: min.min(max),
            max: min.max(max),
            layer,
        });
        self
    }
}

impl RaycastProvider for ObstacleWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: LayerMask,
    ) -> Option<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        let mut nearest: Option<RaycastHit> = None;

        for obstacle in &self.obstacles {
            if !obstacle.layer().intersects(filter) {
                continue;
            }

            let Some((distance, normal)) = obstacle.intersect(origin, direction) else {
                continue;
            };

            if distance > max_distance {
                continue;
            }

            if nearest.is_none_or(|best| distance < best.distance) {
                nearest = Some(RaycastHit {
                    point: origin + direction * distance,
                    normal,
                    distance,
                    layer: obstacle.layer(),
                });
            }
        }

        nearest
    }
}

/// Ray vs circle. Origin внутри круга → попадание на дистанции 0.
fn intersect_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<(f32, Vec2)> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;

    // Снаружи и смотрим от круга
    if c > 0.0 && b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()).max(0.0);
    let point = origin + direction * t;
    let normal = (point - center).try_normalize().unwrap_or(-direction);

    Some((t, normal))
}

/// Ray vs AABB (slab method). Origin внутри box → попадание на дистанции 0.
fn intersect_rect(origin: Vec2, direction: Vec2, min: Vec2, max: Vec2) -> Option<(f32, Vec2)> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut near_normal = -direction;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);

        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let mut t1 = (lo - o) / d;
        let mut t2 = (hi - o) / d;
        // Входим через грань со стороны, противоположной направлению луча
        let mut entry_normal = Vec2::ZERO;
        entry_normal[axis] = -d.signum();

        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        if t1 > t_near {
            t_near = t1;
            near_normal = entry_normal;
        }
        t_far = t_far.min(t2);

        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }

    if t_near < 0.0 {
        // Origin внутри box
        return Some((0.0, -direction));
    }

    Some((t_near, near_normal))
}
