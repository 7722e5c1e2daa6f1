use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::Vec3;

/// Blocks along each horizontal axis of a chunk column.
pub const CHUNK_WIDTH: i32 = 16;
/// Blocks along the vertical axis of one chunk section.
pub const SECTION_HEIGHT: i32 = 16;

/// Absolute voxel position in the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk column this voxel belongs to. Floor division, so negative
    /// coordinates resolve to negative chunk coordinates: (-1, y, -1) is in
    /// chunk (-1, -1), not (0, 0).
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_WIDTH),
            z: self.z.div_euclid(CHUNK_WIDTH),
        }
    }

    /// Column-local position: x and z wrapped into `0..16` (Euclidean modulo,
    /// never negative), y untouched.
    pub const fn local(&self) -> Position {
        Position {
            x: self.x.rem_euclid(CHUNK_WIDTH),
            y: self.y,
            z: self.z.rem_euclid(CHUNK_WIDTH),
        }
    }

    /// The voxel's minimum corner as a continuous point.
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Position) {
        *self = *self + rhs;
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Position {
    fn sub_assign(&mut self, rhs: Position) {
        *self = *self - rhs;
    }
}

impl Neg for Position {
    type Output = Position;
    fn neg(self) -> Position {
        Position::new(-self.x, -self.y, -self.z)
    }
}

/// Chunk column key (each column is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World position of the column's minimum corner at the given y.
    pub const fn block_origin(&self, y: i32) -> Position {
        Position::new(self.x * CHUNK_WIDTH, y, self.z * CHUNK_WIDTH)
    }
}

/// 16x16x16 section coordinate, used by batched block updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// World position of the section's minimum corner.
    pub const fn origin(&self) -> Position {
        Position::new(
            self.x * CHUNK_WIDTH,
            self.y * SECTION_HEIGHT,
            self.z * CHUNK_WIDTH,
        )
    }
}
