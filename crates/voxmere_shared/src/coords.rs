use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_SIZE;

/// Chunks per axis held by the toroidal chunk buffer unless configured otherwise.
pub const DEFAULT_BUFFER_RADIUS: usize = 128;
/// Largest buffer radius a store will allocate.
pub const MAX_BUFFER_RADIUS: usize = 256;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        self + ChunkPos::new(dx, dy, dz)
    }
}

impl LocalPos {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }
}

/// Horizontal extent of the generated world, in chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldDims {
    pub x: u32,
    pub z: u32,
}

impl WorldDims {
    pub const fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Dims used before anything has been generated: the whole buffer.
    pub fn from_buffer_radius(buffer_radius: usize) -> Self {
        let side = buffer_radius as u32;
        Self { x: side, z: side }
    }

    /// Largest world x inside the generated area.
    pub fn max_block_x(self) -> i32 {
        (self.x as i32) * CHUNK_SIZE as i32 - 1
    }

    /// Largest world z inside the generated area.
    pub fn max_block_z(self) -> i32 {
        (self.z as i32) * CHUNK_SIZE as i32 - 1
    }

    pub fn fits_buffer(self, buffer_radius: usize) -> bool {
        (self.x as usize) <= buffer_radius && (self.z as usize) <= buffer_radius
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for ChunkPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for ChunkPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    (value.div_euclid(divisor), value.rem_euclid(divisor))
}

pub fn world_to_chunk(world_pos: IVec3) -> (ChunkPos, LocalPos) {
    let size = CHUNK_SIZE as i32;

    let (chunk_x, local_x) = div_rem_floor(world_pos.x, size);
    let (chunk_y, local_y) = div_rem_floor(world_pos.y, size);
    let (chunk_z, local_z) = div_rem_floor(world_pos.z, size);

    (
        ChunkPos {
            x: chunk_x,
            y: chunk_y,
            z: chunk_z,
        },
        LocalPos {
            x: local_x as u8,
            y: local_y as u8,
            z: local_z as u8,
        },
    )
}

pub fn chunk_to_world(chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
    let size = CHUNK_SIZE as i32;
    IVec3::new(
        chunk_pos.x * size + i32::from(local.x),
        chunk_pos.y * size + i32::from(local.y),
        chunk_pos.z * size + i32::from(local.z),
    )
}

/// Block slot within a chunk, laid out as `x * R² + y * R + z`.
pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x) * CHUNK_AREA + usize::from(local.y) * CHUNK_SIZE + usize::from(local.z)
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < CHUNK_VOLUME, "chunk index out of bounds: {index}");

    let x = index / CHUNK_AREA;
    let rem = index % CHUNK_AREA;
    let y = rem / CHUNK_SIZE;
    let z = rem % CHUNK_SIZE;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

/// Slot of a chunk in a toroidal buffer with `buffer_radius` chunks per axis.
///
/// Coordinates wrap with a floored modulus, so chunk `-1` shares a slot with
/// chunk `buffer_radius - 1`.
pub fn chunk_slot(chunk_pos: ChunkPos, buffer_radius: usize) -> usize {
    let radius = buffer_radius as i64;
    let wrap = |v: i32| i64::from(v).rem_euclid(radius) as usize;
    wrap(chunk_pos.x) * buffer_radius * buffer_radius
        + wrap(chunk_pos.y) * buffer_radius
        + wrap(chunk_pos.z)
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        chunk_slot, chunk_to_world, index_to_local, local_to_index,
        world_to_chunk, ChunkPos, LocalPos, CHUNK_SIZE, CHUNK_VOLUME,
    };

    #[test]
    fn local_to_index_round_trips_back_to_local_coords() {
        for x in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for z in 0..CHUNK_SIZE {
                    let local = LocalPos::new(x as u8, y as u8, z as u8);
                    let index = local_to_index(local);
                    assert!(index < CHUNK_VOLUME);
                    assert_eq!(index_to_local(index), local);
                }
            }
        }
    }

    #[test]
    fn local_index_is_x_major_then_y_then_z() {
        assert_eq!(local_to_index(LocalPos::new(0, 0, 1)), 1);
        assert_eq!(local_to_index(LocalPos::new(0, 1, 0)), CHUNK_SIZE);
        assert_eq!(local_to_index(LocalPos::new(1, 0, 0)), CHUNK_SIZE * CHUNK_SIZE);
        assert_eq!(local_to_index(LocalPos::new(15, 15, 15)), CHUNK_VOLUME - 1);
    }

    #[test]
    fn chunk_pos_arithmetic_is_component_wise() {
        let a = ChunkPos { x: 10, y: -2, z: 4 };
        let b = ChunkPos { x: -3, y: 8, z: 1 };

        assert_eq!(a + b, ChunkPos { x: 7, y: 6, z: 5 });
        assert_eq!(a - b, ChunkPos { x: 13, y: -10, z: 3 });
        assert_eq!(a.offset(1, 1, -1), ChunkPos::new(11, -1, 3));

        let mut c = a;
        c += b;
        assert_eq!(c, ChunkPos { x: 7, y: 6, z: 5 });
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn world_to_chunk_handles_negative_and_positive_coordinates() {
        let (chunk0, local0) = world_to_chunk(IVec3::new(-1, -1, -1));
        assert_eq!(chunk0, ChunkPos { x: -1, y: -1, z: -1 });
        assert_eq!(local0, LocalPos::new(15, 15, 15));

        let (chunk1, local1) = world_to_chunk(IVec3::new(17, 3, 40));
        assert_eq!(chunk1, ChunkPos::new(1, 0, 2));
        assert_eq!(local1, LocalPos::new(1, 3, 8));

        let (chunk2, local2) = world_to_chunk(IVec3::new(32, 64, 0));
        assert_eq!(chunk2, ChunkPos::new(2, 4, 0));
        assert_eq!(local2, LocalPos::new(0, 0, 0));
    }

    #[test]
    fn world_chunk_round_trip_covers_a_mixed_sign_range() {
        for x in -40..40 {
            for y in [-33, -16, -1, 0, 15, 16, 95, 191] {
                for z in [-17, -1, 0, 1, 31, 66] {
                    let world = IVec3::new(x, y, z);
                    let (chunk, local) = world_to_chunk(world);
                    assert!(usize::from(local.x) < CHUNK_SIZE);
                    assert!(usize::from(local.y) < CHUNK_SIZE);
                    assert!(usize::from(local.z) < CHUNK_SIZE);
                    assert_eq!(chunk_to_world(chunk, local), world);
                }
            }
        }
    }

    #[test]
    fn chunk_slot_wraps_toroidally() {
        let radius = 8;
        assert_eq!(chunk_slot(ChunkPos::new(0, 0, 0), radius), 0);
        assert_eq!(chunk_slot(ChunkPos::new(0, 0, 1), radius), 1);
        assert_eq!(chunk_slot(ChunkPos::new(0, 1, 0), radius), 8);
        assert_eq!(chunk_slot(ChunkPos::new(1, 0, 0), radius), 64);
        assert_eq!(
            chunk_slot(ChunkPos::new(-1, 0, 0), radius),
            chunk_slot(ChunkPos::new(7, 0, 0), radius)
        );
        assert_eq!(
            chunk_slot(ChunkPos::new(3, 9, -2), radius),
            chunk_slot(ChunkPos::new(3, 1, 6), radius)
        );
        assert!(chunk_slot(ChunkPos::new(-100, 77, -3), radius) < radius * radius * radius);
    }
}
