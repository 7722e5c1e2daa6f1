//! Spatial queries over loaded terrain: swept collision gathering, voxel
//! raycasting, fluid-flow sampling, free-space and supporting-surface
//! search. Each query takes the shared lock once and holds it for the
//! whole call, so the terrain it sees is a consistent snapshot.

use cgmath::{InnerSpace, MetricSpace, Zero};
use forage_core::{AABB, BlockstateId, Position, Vec3};

use super::World;

/// Result of a successful [`World::raycast`]: the block that was hit, the
/// voxel it occupies, and the face normal of the crossed boundary (zero if
/// the ray started inside the hit voxel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaycastHit {
    pub block: BlockstateId,
    pub pos: Position,
    pub normal: Position,
}

impl World {
    /// Collision boxes of every solid block a box sweeping along `movement`
    /// could touch. The scanned volume is the box expanded by half the
    /// movement on each axis -- a swept-volume bound, not a continuous
    /// sweep. The returned list is unordered.
    pub fn get_colliders(&self, aabb: &AABB, movement: Vec3) -> Vec<AABB> {
        let swept = AABB::new(
            aabb.center() + movement * 0.5,
            aabb.half_size() + movement.map(f64::abs) * 0.5,
        );
        let min = AABB::min(&swept);
        let max = AABB::max(&swept);

        let mut out = Vec::with_capacity(32);
        let state = self.state.read();
        for y in (min.y.floor() as i32 - 1)..=(max.y.floor() as i32) {
            for z in (min.z.floor() as i32)..=(max.z.floor() as i32) {
                for x in (min.x.floor() as i32)..=(max.x.floor() as i32) {
                    let pos = Position::new(x, y, z);
                    let Some(block) = self.blockstate_at(&state, pos) else {
                        continue;
                    };
                    if !block.is_solid() {
                        continue;
                    }
                    out.extend(block.colliders_at(pos));
                }
            }
        }
        out
    }

    /// Walk the voxel grid from `origin` along `direction` until a block's
    /// collider intersects the ray or the walk exceeds `max_radius`.
    ///
    /// Grid traversal after Amanatides & Woo: step one voxel boundary at a
    /// time along whichever axis has the smallest remaining parametric
    /// distance, preferring x, then y, then z on exact ties so results are
    /// reproducible.
    ///
    /// # Panics
    /// A zero-length `direction` is a caller bug and panics.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_radius: f64) -> Option<RaycastHit> {
        assert!(
            direction != Vec3::zero(),
            "raycast called with a zero-length direction"
        );

        let mut pos = Position::new(
            origin.x.floor() as i32,
            origin.y.floor() as i32,
            origin.z.floor() as i32,
        );

        // Per-axis voxel increment, and the parametric distance to each
        // axis' next grid line (t_max) plus the distance between successive
        // lines (t_delta).
        let step = direction.map(|d| ((0.0 < d) as i8 - (d < 0.0) as i8) as f64);
        let mut t_max = Vec3::zero();
        let mut t_delta = Vec3::zero();
        for i in 0..3 {
            let on_grid_line = origin[i].round() == origin[i];
            t_max[i] = if direction[i] < 0.0 && on_grid_line {
                0.0
            } else if direction[i] > 0.0 {
                let to_boundary = if origin[i] == 0.0 {
                    1.0
                } else {
                    origin[i].ceil() - origin[i]
                };
                to_boundary / direction[i].abs()
            } else if direction[i] < 0.0 {
                (origin[i] - origin[i].floor()) / direction[i].abs()
            } else {
                f64::MAX
            };
            t_delta[i] = if direction[i] == 0.0 {
                f64::MAX
            } else {
                step[i] / direction[i]
            };
        }

        let radius = max_radius / direction.magnitude();
        let mut normal = Position::new(0, 0, 0);

        let state = self.state.read();
        loop {
            if let Some(id) = state.block_at(pos, self.air)
                && let Some(block) = self.registry.blockstate(id)
                && !block.is_air()
                && block
                    .colliders_at(pos)
                    .iter()
                    .any(|collider| collider.intersect(origin, direction))
            {
                return Some(RaycastHit {
                    block: id,
                    pos,
                    normal,
                });
            }

            let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
                0
            } else if t_max.y <= t_max.z {
                1
            } else {
                2
            };
            if t_max[axis] > radius {
                return None;
            }
            t_max[axis] += t_delta[axis];
            match axis {
                0 => {
                    pos.x += step.x as i32;
                    normal = Position::new(-(step.x as i32), 0, 0);
                }
                1 => {
                    pos.y += step.y as i32;
                    normal = Position::new(0, -(step.y as i32), 0);
                }
                _ => {
                    pos.z += step.z as i32;
                    normal = Position::new(0, 0, -(step.z as i32));
                }
            }
        }
    }

    /// Flow direction of the fluid at `pos`, from the fluid-height
    /// differences against its four horizontal neighbors, with the
    /// waterfall-edge bias and downward pull for falling columns. Zero for
    /// anything that is not fluid or waterlogged. The numeric recipe
    /// matches vanilla so bot physics stays in step with the server.
    pub fn get_flow(&self, pos: Position) -> Vec3 {
        const HORIZONTAL: [Position; 4] = [
            Position::new(0, 0, -1),
            Position::new(1, 0, 0),
            Position::new(0, 0, 1),
            Position::new(-1, 0, 0),
        ];

        let state = self.state.read();
        let mut flow = Vec3::zero();

        let Some(block) = self.blockstate_at(&state, pos) else {
            return flow;
        };
        if !block.is_fluid_or_waterlogged() {
            return flow;
        }

        let current_height = block.fluid_height();
        for offset in HORIZONTAL {
            let neighbour_pos = pos + offset;
            let Some(neighbour) = self.blockstate_at(&state, neighbour_pos) else {
                continue;
            };
            // Water and lava do not pull on each other.
            if neighbour.is_fluid_or_waterlogged()
                && neighbour.is_water_or_waterlogged() != block.is_water_or_waterlogged()
            {
                continue;
            }

            let neighbour_height = neighbour.fluid_height();
            if neighbour_height == 0.0 {
                if !neighbour.is_solid() {
                    // Fluid one below the neighbour means we are at the
                    // edge of a drop; bias the flow over it.
                    let below_pos = neighbour_pos + Position::new(0, -1, 0);
                    if let Some(below) = self.blockstate_at(&state, below_pos)
                        && (!below.is_fluid_or_waterlogged()
                            || below.is_water_or_waterlogged() == block.is_water_or_waterlogged())
                    {
                        let below_height = below.fluid_height();
                        if below_height > 0.0 {
                            let pull = current_height - below_height + 0.888_888_9;
                            flow.x += f64::from(pull * offset.x as f32);
                            flow.z += f64::from(pull * offset.z as f32);
                        }
                    }
                }
            } else {
                let pull = current_height - neighbour_height;
                flow.x += f64::from(pull * offset.x as f32);
                flow.z += f64::from(pull * offset.z as f32);
            }
        }

        if block.is_fluid_falling() {
            for offset in HORIZONTAL {
                let neighbour_pos = pos + offset;
                let Some(neighbour) = self.blockstate_at(&state, neighbour_pos) else {
                    continue;
                };
                let Some(above) =
                    self.blockstate_at(&state, neighbour_pos + Position::new(0, 1, 0))
                else {
                    continue;
                };
                if neighbour.is_solid() && above.is_solid() {
                    flow = normalize_or_zero(flow);
                    flow.y -= 6.0;
                    break;
                }
            }
        }

        normalize_or_zero(flow)
    }

    /// Whether nothing solid (and, with `fluid_collide`, nothing fluid)
    /// geometrically intersects `aabb`.
    pub fn is_free(&self, aabb: &AABB, fluid_collide: bool) -> bool {
        let min = aabb.min();
        let max = aabb.max();

        let state = self.state.read();
        for y in (min.y.floor() as i32 - 1)..=(max.y.floor() as i32) {
            for z in (min.z.floor() as i32)..=(max.z.floor() as i32) {
                for x in (min.x.floor() as i32)..=(max.x.floor() as i32) {
                    let pos = Position::new(x, y, z);
                    let Some(block) = self.blockstate_at(&state, pos) else {
                        continue;
                    };
                    if block.is_fluid() {
                        if !fluid_collide {
                            continue;
                        }
                    } else if !block.is_solid() {
                        continue;
                    }
                    if block
                        .colliders_at(pos)
                        .iter()
                        .any(|collider| aabb.collide(collider))
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Position of the solid block whose collider intersecting `aabb` is
    /// nearest by center-to-center squared distance, if any intersects.
    pub fn get_supporting_block_pos(&self, aabb: &AABB) -> Option<Position> {
        let min = aabb.min();
        let max = aabb.max();

        let state = self.state.read();
        let mut closest: Option<Position> = None;
        let mut min_distance = f64::MAX;
        for y in (min.y.floor() as i32 - 1)..=(max.y.floor() as i32) {
            for z in (min.z.floor() as i32)..=(max.z.floor() as i32) {
                for x in (min.x.floor() as i32)..=(max.x.floor() as i32) {
                    let pos = Position::new(x, y, z);
                    let Some(block) = self.blockstate_at(&state, pos) else {
                        continue;
                    };
                    if !block.is_solid() {
                        continue;
                    }
                    for collider in block.colliders_at(pos) {
                        if !aabb.collide(&collider) {
                            continue;
                        }
                        let distance = aabb.center().distance2(collider.center());
                        if distance < min_distance {
                            min_distance = distance;
                            closest = Some(pos);
                        }
                    }
                }
            }
        }
        closest
    }
}

/// Vanilla's `Vec3::normalize`: vectors shorter than 1e-4 collapse to zero
/// instead of producing NaN.
fn normalize_or_zero(v: Vec3) -> Vec3 {
    let length = v.magnitude();
    if length < 1.0e-4 { Vec3::zero() } else { v / length }
}
