use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockRegistry, DrawStyle, TexQuad, TextureFaceSet};
use crate::chunk::ChunkData;
use crate::coords::{chunk_to_world, local_to_index, ChunkPos, LocalPos, WorldDims, CHUNK_SIZE};

const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;
const UP: [f32; 3] = [0.0, 1.0, 0.0];

/// Brightness multiplier per face direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceShades {
    pub top: f32,
    pub bottom: f32,
    /// Faces pointing towards +x.
    pub left: f32,
    /// Faces pointing towards -x.
    pub right: f32,
    /// Faces pointing towards +z.
    pub front: f32,
    /// Faces pointing towards -z.
    pub back: f32,
}

impl Default for FaceShades {
    fn default() -> Self {
        Self {
            top: 0.9,
            // Darker than every side face.
            bottom: 0.5,
            left: 0.8,
            right: 0.55,
            front: 0.65,
            back: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshStyle {
    pub block_half_extent: f32,
    /// Height of a fluid surface above its cell centre.
    pub fluid_surface_offset: f32,
    pub foliage_half_width: f32,
    pub shades: FaceShades,
}

impl Default for MeshStyle {
    fn default() -> Self {
        Self {
            block_half_extent: 0.5,
            fluid_surface_offset: 0.35,
            foliage_half_width: 0.4,
            shades: FaceShades::default(),
        }
    }
}

impl MeshStyle {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.block_half_extent.is_finite() || self.block_half_extent <= 0.0 {
            self.block_half_extent = defaults.block_half_extent;
        }
        self.block_half_extent = self.block_half_extent.clamp(0.05, 1.0);
        if !self.fluid_surface_offset.is_finite() {
            self.fluid_surface_offset = defaults.fluid_surface_offset;
        }
        self.fluid_surface_offset = self
            .fluid_surface_offset
            .clamp(-self.block_half_extent, self.block_half_extent);
        if !self.foliage_half_width.is_finite() {
            self.foliage_half_width = defaults.foliage_half_width;
        }
        self.foliage_half_width = self.foliage_half_width.clamp(0.0, self.block_half_extent);

        for shade in [
            &mut self.shades.top,
            &mut self.shades.bottom,
            &mut self.shades.left,
            &mut self.shades.right,
            &mut self.shades.front,
            &mut self.shades.back,
        ] {
            *shade = if shade.is_finite() { shade.clamp(0.0, 1.0) } else { 1.0 };
        }
    }
}

/// Quad list: every four consecutive vertices form one face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 4]>,
    pub normals: Vec<[f32; 3]>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.positions.len() / 4
    }

    /// Two triangles per quad, for renderers without quad primitives.
    pub fn triangle_indices(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.quad_count() * 6);
        for quad in 0..self.quad_count() as u32 {
            let base = quad * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        indices
    }

    fn push_quad(&mut self, corners: [[f32; 3]; 4], uv: &TexQuad, color: [u8; 4], normal: [f32; 3]) {
        self.positions.extend_from_slice(&corners);
        for corner in 0..4 {
            self.tex_coords.push([uv[corner * 2], uv[corner * 2 + 1]]);
        }
        self.colors.extend_from_slice(&[color; 4]);
        self.normals.extend_from_slice(&[normal; 4]);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMeshes {
    pub opaque: ChunkMesh,
    pub fluid: ChunkMesh,
}

impl ChunkMeshes {
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.fluid.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChunkNeighbors<'a> {
    pub pos_x: Option<&'a ChunkData>,
    pub neg_x: Option<&'a ChunkData>,
    pub pos_y: Option<&'a ChunkData>,
    pub neg_y: Option<&'a ChunkData>,
    pub pos_z: Option<&'a ChunkData>,
    pub neg_z: Option<&'a ChunkData>,
}

/// Everything besides block data the builder reads.
#[derive(Clone, Copy, Debug)]
pub struct MeshContext<'a> {
    pub registry: &'a BlockRegistry,
    pub style: &'a MeshStyle,
    pub dims: WorldDims,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Face {
    Top,
    Bottom,
    Front,
    Back,
    Left,
    Right,
}

#[derive(Copy, Clone)]
struct FaceSpec {
    face: Face,
    offset: [i32; 3],
    normal: [f32; 3],
    corners: [[f32; 3]; 4],
}

const FACE_SPECS: [FaceSpec; 6] = [
    FaceSpec {
        face: Face::Top,
        offset: [0, 1, 0],
        normal: [0.0, 1.0, 0.0],
        corners: [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
    },
    FaceSpec {
        face: Face::Bottom,
        offset: [0, -1, 0],
        normal: [0.0, -1.0, 0.0],
        corners: [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
    },
    FaceSpec {
        face: Face::Front,
        offset: [0, 0, 1],
        normal: [0.0, 0.0, 1.0],
        corners: [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
    },
    FaceSpec {
        face: Face::Back,
        offset: [0, 0, -1],
        normal: [0.0, 0.0, -1.0],
        corners: [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]],
    },
    FaceSpec {
        face: Face::Left,
        offset: [1, 0, 0],
        normal: [1.0, 0.0, 0.0],
        corners: [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]],
    },
    FaceSpec {
        face: Face::Right,
        offset: [-1, 0, 0],
        normal: [-1.0, 0.0, 0.0],
        corners: [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
    },
];

// Diagonal quads as the (x, z) signs of their two vertical edges.
const CROSS_QUADS: [[[f32; 2]; 2]; 4] = [
    [[1.0, 1.0], [-1.0, -1.0]],
    [[-1.0, 1.0], [1.0, -1.0]],
    [[-1.0, -1.0], [1.0, 1.0]],
    [[1.0, -1.0], [-1.0, 1.0]],
];

pub fn shade_color(shade: f32) -> [u8; 4] {
    let level = (255.0 * f64::from(shade)) as u8;
    [level, level, level, 255]
}

fn face_shade(shades: &FaceShades, face: Face) -> f32 {
    match face {
        Face::Top => shades.top,
        Face::Bottom => shades.bottom,
        Face::Front => shades.front,
        Face::Back => shades.back,
        Face::Left => shades.left,
        Face::Right => shades.right,
    }
}

fn face_texture(textures: &TextureFaceSet, face: Face) -> &TexQuad {
    match face {
        Face::Top => &textures.top,
        Face::Bottom => &textures.bottom,
        _ => &textures.side,
    }
}

/// Faces on the outer boundary of the generated area are never drawn,
/// except the top, which is always eligible.
fn at_world_edge(face: Face, world: IVec3, dims: WorldDims) -> bool {
    match face {
        Face::Top => false,
        Face::Bottom => world.y == 0,
        Face::Front => world.z == dims.max_block_z(),
        Face::Back => world.z == 0,
        Face::Left => world.x == dims.max_block_x(),
        Face::Right => world.x == 0,
    }
}

/// Builds the opaque and fluid meshes for one chunk.
///
/// Output is a pure function of the chunk, its six neighbours and `ctx`.
pub fn build_chunk_meshes(
    chunk: &ChunkData,
    neighbors: &ChunkNeighbors<'_>,
    chunk_pos: ChunkPos,
    ctx: &MeshContext<'_>,
) -> ChunkMeshes {
    let mut meshes = ChunkMeshes::default();

    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let local = LocalPos::new(x as u8, y as u8, z as u8);
                let block = chunk.blocks[local_to_index(local)];
                if block == BlockId::AIR {
                    continue;
                }
                let props = ctx.registry.get_properties(block);
                let world = chunk_to_world(chunk_pos, local);
                let Some(textures) = props.texture_at(world) else {
                    continue;
                };
                let coords = [x as i32, y as i32, z as i32];

                match props.draw_style {
                    DrawStyle::Solid => {
                        append_solid_block(&mut meshes.opaque, chunk, neighbors, coords, world, textures, ctx)
                    }
                    DrawStyle::CrossFoliage => {
                        append_cross_foliage(&mut meshes.opaque, world, textures, ctx.style)
                    }
                    DrawStyle::Fluid => append_fluid_surface(
                        &mut meshes.fluid,
                        chunk,
                        neighbors,
                        block,
                        coords,
                        world,
                        textures,
                        ctx,
                    ),
                }
            }
        }
    }

    meshes
}

fn append_solid_block(
    mesh: &mut ChunkMesh,
    chunk: &ChunkData,
    neighbors: &ChunkNeighbors<'_>,
    coords: [i32; 3],
    world: IVec3,
    textures: &TextureFaceSet,
    ctx: &MeshContext<'_>,
) {
    let n = ctx.style.block_half_extent;
    let centre = world.as_vec3().to_array();

    for spec in FACE_SPECS {
        if at_world_edge(spec.face, world, ctx.dims) {
            continue;
        }
        let adjacent = sample_block(
            chunk,
            neighbors,
            [coords[0] + spec.offset[0], coords[1] + spec.offset[1], coords[2] + spec.offset[2]],
        );
        if !ctx.registry.is_transparent(adjacent) {
            continue;
        }

        let corners = spec.corners.map(|c| {
            [centre[0] + c[0] * n, centre[1] + c[1] * n, centre[2] + c[2] * n]
        });
        mesh.push_quad(
            corners,
            face_texture(textures, spec.face),
            shade_color(face_shade(&ctx.style.shades, spec.face)),
            spec.normal,
        );
    }
}

fn append_cross_foliage(
    mesh: &mut ChunkMesh,
    world: IVec3,
    textures: &TextureFaceSet,
    style: &MeshStyle,
) {
    let n = style.block_half_extent;
    let m = style.foliage_half_width;
    let [cx, cy, cz] = world.as_vec3().to_array();
    let color = shade_color(style.shades.left);

    for [top, bottom] in CROSS_QUADS {
        let corners = [
            [cx + top[0] * m, cy + n, cz + top[1] * m],
            [cx + bottom[0] * m, cy + n, cz + bottom[1] * m],
            [cx + bottom[0] * m, cy - n, cz + bottom[1] * m],
            [cx + top[0] * m, cy - n, cz + top[1] * m],
        ];
        mesh.push_quad(corners, &textures.top, color, UP);
    }
}

#[allow(clippy::too_many_arguments)]
fn append_fluid_surface(
    mesh: &mut ChunkMesh,
    chunk: &ChunkData,
    neighbors: &ChunkNeighbors<'_>,
    block: BlockId,
    coords: [i32; 3],
    world: IVec3,
    textures: &TextureFaceSet,
    ctx: &MeshContext<'_>,
) {
    let above = sample_block(chunk, neighbors, [coords[0], coords[1] + 1, coords[2]]);
    if above == block || !ctx.registry.is_transparent(above) {
        return;
    }

    let n = ctx.style.block_half_extent;
    let surface = ctx.style.fluid_surface_offset;
    let [cx, cy, cz] = world.as_vec3().to_array();
    let top = FACE_SPECS[0];
    let corners = top
        .corners
        .map(|c| [cx + c[0] * n, cy + surface, cz + c[2] * n]);
    mesh.push_quad(corners, &textures.top, shade_color(ctx.style.shades.top), top.normal);
}

/// Reads a block relative to `chunk`, looking one step into a face neighbour
/// when the coordinate leaves the chunk. Missing neighbours read as air.
pub fn sample_block(chunk: &ChunkData, neighbors: &ChunkNeighbors<'_>, coords: [i32; 3]) -> BlockId {
    let [x, y, z] = coords;

    if in_chunk_bounds(x) && in_chunk_bounds(y) && in_chunk_bounds(z) {
        return sample_chunk_local(chunk, x, y, z);
    }

    let neighbor = match (axis_out(x), axis_out(y), axis_out(z)) {
        (-1, 0, 0) => neighbors.neg_x,
        (1, 0, 0) => neighbors.pos_x,
        (0, -1, 0) => neighbors.neg_y,
        (0, 1, 0) => neighbors.pos_y,
        (0, 0, -1) => neighbors.neg_z,
        (0, 0, 1) => neighbors.pos_z,
        _ => None,
    };

    match neighbor {
        Some(neighbor_chunk) => sample_chunk_local(
            neighbor_chunk,
            wrap_to_local(x),
            wrap_to_local(y),
            wrap_to_local(z),
        ),
        None => BlockId::AIR,
    }
}

fn sample_chunk_local(chunk: &ChunkData, x: i32, y: i32, z: i32) -> BlockId {
    chunk.get(LocalPos::new(x as u8, y as u8, z as u8))
}

fn in_chunk_bounds(value: i32) -> bool {
    (0..CHUNK_SIZE_I32).contains(&value)
}

fn axis_out(value: i32) -> i8 {
    if value < 0 {
        -1
    } else if value >= CHUNK_SIZE_I32 {
        1
    } else {
        0
    }
}

fn wrap_to_local(value: i32) -> i32 {
    value.rem_euclid(CHUNK_SIZE_I32)
}
