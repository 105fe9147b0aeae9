use glam::IVec3;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::block::{register_default_blocks, BlockId, BlockProperties, BlockRegistry};
use crate::chunk::ChunkData;
use crate::coords::{
    chunk_slot, world_to_chunk, ChunkPos, WorldDims, CHUNK_SIZE, DEFAULT_BUFFER_RADIUS, MAX_BUFFER_RADIUS,
};
use crate::events::{channel, EventReceiver, EventSender, MeshEvent};
use crate::mesh::{build_chunk_meshes, ChunkMeshes, ChunkNeighbors, MeshContext, MeshStyle};

/// Columns are scanned this high when looking for the surface.
pub const SURFACE_SCAN_HEIGHT: i32 = 192;

const LAST_LOCAL: u8 = (CHUNK_SIZE - 1) as u8;

struct StoredChunk {
    pos: ChunkPos,
    data: ChunkData,
}

/// Block storage for the world plus the meshes built from it.
///
/// Chunks live in a toroidal buffer of `buffer_radius³` slots addressed by
/// [`chunk_slot`]. Chunks further apart than the buffer share a slot, so the
/// world must stay within `buffer_radius` chunks along each axis.
pub struct ChunkStore {
    buffer_radius: usize,
    slots: Vec<Option<Box<StoredChunk>>>,
    meshes: FxHashMap<usize, ChunkMeshes>,
    dims: WorldDims,
    registry: BlockRegistry,
    style: MeshStyle,
    mesh_events: Option<EventSender<MeshEvent>>,
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new(register_default_blocks(), DEFAULT_BUFFER_RADIUS)
    }
}

impl ChunkStore {
    /// `buffer_radius` is clamped to `1..=MAX_BUFFER_RADIUS`.
    pub fn new(registry: BlockRegistry, buffer_radius: usize) -> Self {
        let buffer_radius = buffer_radius.clamp(1, MAX_BUFFER_RADIUS);
        let slot_count = buffer_radius * buffer_radius * buffer_radius;
        Self {
            buffer_radius,
            slots: std::iter::repeat_with(|| None).take(slot_count).collect(),
            meshes: FxHashMap::default(),
            dims: WorldDims::from_buffer_radius(buffer_radius),
            registry,
            style: MeshStyle::default(),
            mesh_events: None,
        }
    }

    pub fn with_mesh_style(mut self, style: MeshStyle) -> Self {
        self.style = style;
        self
    }

    pub fn buffer_radius(&self) -> usize {
        self.buffer_radius
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn mesh_style(&self) -> &MeshStyle {
        &self.style
    }

    pub fn dims(&self) -> WorldDims {
        self.dims
    }

    pub fn set_dims(&mut self, dims: WorldDims) {
        self.dims = dims;
    }

    /// Starts a mesh event stream. A later call replaces the earlier receiver.
    pub fn subscribe_mesh_events(&mut self) -> EventReceiver<MeshEvent> {
        let (tx, rx) = channel();
        self.mesh_events = Some(tx);
        rx
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkData> {
        self.slots[self.slot(pos)].as_ref().map(|stored| &stored.data)
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunk(pos).is_some()
    }

    /// Loaded chunks with the position each was stored under.
    pub fn loaded_chunks(&self) -> impl Iterator<Item = (ChunkPos, &ChunkData)> {
        self.slots
            .iter()
            .flatten()
            .map(|stored| (stored.pos, &stored.data))
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn chunk_meshes(&self, pos: ChunkPos) -> Option<&ChunkMeshes> {
        self.meshes.get(&self.slot(pos))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn get_block(&self, world_pos: IVec3) -> BlockId {
        let (chunk_pos, local) = world_to_chunk(world_pos);
        self.chunk(chunk_pos)
            .map_or(BlockId::AIR, |chunk| chunk.get(local))
    }

    pub fn block_properties(&self, world_pos: IVec3) -> &BlockProperties {
        self.registry.get_properties(self.get_block(world_pos))
    }

    /// Writes a block and rebuilds the meshes it can affect.
    pub fn set_block(&mut self, world_pos: IVec3, block: BlockId) -> BlockId {
        let previous = self.set_block_deferred(world_pos, block);
        self.rebuild_chunks(affected_chunks(world_pos));
        previous
    }

    /// Writes a block without touching any mesh. Missing chunks are created
    /// filled with air.
    pub fn set_block_deferred(&mut self, world_pos: IVec3, block: BlockId) -> BlockId {
        let (chunk_pos, local) = world_to_chunk(world_pos);
        let slot = self.slot(chunk_pos);
        let stored = self.slots[slot].get_or_insert_with(|| {
            trace!("allocating chunk {:?} for block write", chunk_pos);
            Box::new(StoredChunk {
                pos: chunk_pos,
                data: ChunkData::new_empty(),
            })
        });
        let previous = stored.data.get(local);
        stored.data.set(local, block);
        previous
    }

    pub fn remove_block(&mut self, world_pos: IVec3) -> BlockId {
        self.set_block(world_pos, BlockId::AIR)
    }

    /// Replaces a whole chunk and rebuilds its meshes.
    pub fn add_chunk(&mut self, pos: ChunkPos, data: ChunkData) {
        self.insert_chunk(pos, data);
        self.rebuild_chunk(pos);
    }

    /// Replaces a whole chunk without rebuilding anything.
    pub fn insert_chunk(&mut self, pos: ChunkPos, data: ChunkData) {
        let slot = self.slot(pos);
        self.slots[slot] = Some(Box::new(StoredChunk { pos, data }));
    }

    /// Drops a chunk and releases its meshes.
    pub fn remove_chunk(&mut self, pos: ChunkPos) -> Option<ChunkData> {
        let slot = self.slot(pos);
        if self.meshes.remove(&slot).is_some() {
            self.emit(MeshEvent::Released { pos });
        }
        self.slots[slot].take().map(|stored| stored.data)
    }

    /// Drops every chunk and mesh.
    pub fn clear(&mut self) {
        let positions: Vec<ChunkPos> = self.loaded_chunks().map(|(pos, _)| pos).collect();
        for pos in positions {
            self.remove_chunk(pos);
        }
        self.meshes.clear();
    }

    /// Rebuilds one chunk's meshes. Returns false when the chunk is not loaded.
    pub fn rebuild_chunk(&mut self, pos: ChunkPos) -> bool {
        self.rebuild_chunks([pos]) == 1
    }

    /// Rebuilds meshes for every loaded chunk in `positions`.
    ///
    /// Meshes are built in parallel against a read-only view of the store and
    /// installed afterwards in chunk order.
    pub fn rebuild_chunks<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = ChunkPos>,
    {
        let mut unique: Vec<ChunkPos> = positions
            .into_iter()
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        unique.sort_unstable();

        let built: Vec<(ChunkPos, ChunkMeshes)> = {
            let ctx = MeshContext {
                registry: &self.registry,
                style: &self.style,
                dims: self.dims,
            };
            let jobs: Vec<(ChunkPos, &ChunkData, ChunkNeighbors<'_>)> = unique
                .iter()
                .filter_map(|&pos| self.chunk(pos).map(|chunk| (pos, chunk, self.neighbors(pos))))
                .collect();
            jobs.par_iter()
                .map(|(pos, chunk, neighbors)| {
                    (*pos, build_chunk_meshes(chunk, neighbors, *pos, &ctx))
                })
                .collect()
        };

        let count = built.len();
        for (pos, meshes) in built {
            self.install_meshes(pos, meshes);
        }
        if count > 1 {
            debug!("rebuilt {} chunk meshes", count);
        }
        count
    }

    pub fn rebuild_all(&mut self) -> usize {
        let positions: Vec<ChunkPos> = self.loaded_chunks().map(|(pos, _)| pos).collect();
        self.rebuild_chunks(positions)
    }

    /// Lowest air cell in the column at `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        (0..SURFACE_SCAN_HEIGHT).find(|&y| self.get_block(IVec3::new(x, y, z)) == BlockId::AIR)
    }

    /// Starts a group of writes whose mesh rebuilds are deferred until the
    /// batch is flushed. Dropping the batch keeps the writes but rebuilds
    /// nothing.
    pub fn batch(&mut self) -> BlockBatch<'_> {
        BlockBatch {
            store: self,
            touched: FxHashSet::default(),
        }
    }

    fn slot(&self, pos: ChunkPos) -> usize {
        chunk_slot(pos, self.buffer_radius)
    }

    fn neighbors(&self, pos: ChunkPos) -> ChunkNeighbors<'_> {
        ChunkNeighbors {
            pos_x: self.chunk(pos.offset(1, 0, 0)),
            neg_x: self.chunk(pos.offset(-1, 0, 0)),
            pos_y: self.chunk(pos.offset(0, 1, 0)),
            neg_y: self.chunk(pos.offset(0, -1, 0)),
            pos_z: self.chunk(pos.offset(0, 0, 1)),
            neg_z: self.chunk(pos.offset(0, 0, -1)),
        }
    }

    fn install_meshes(&mut self, pos: ChunkPos, meshes: ChunkMeshes) {
        let opaque_quads = meshes.opaque.quad_count();
        let fluid_quads = meshes.fluid.quad_count();
        let slot = self.slot(pos);
        let previous = self.meshes.insert(slot, meshes);
        self.emit(MeshEvent::Installed {
            pos,
            opaque_quads,
            fluid_quads,
            replaced: previous.is_some(),
        });
        drop(previous);
    }

    fn emit(&mut self, event: MeshEvent) {
        let disconnected = self
            .mesh_events
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_err());
        if disconnected {
            trace!("mesh event receiver dropped; unsubscribing");
            self.mesh_events = None;
        }
    }
}

/// Chunks whose meshes can change when the block at `world_pos` changes:
/// its own chunk plus any face neighbour it borders.
pub fn affected_chunks(world_pos: IVec3) -> impl Iterator<Item = ChunkPos> {
    let (chunk_pos, local) = world_to_chunk(world_pos);
    let step = |value: u8| match value {
        0 => Some(-1),
        LAST_LOCAL => Some(1),
        _ => None,
    };
    let x = step(local.x).map(|s| chunk_pos.offset(s, 0, 0));
    let y = step(local.y).map(|s| chunk_pos.offset(0, s, 0));
    let z = step(local.z).map(|s| chunk_pos.offset(0, 0, s));
    std::iter::once(chunk_pos).chain(x).chain(y).chain(z)
}

/// Deferred-rebuild write handle returned by [`ChunkStore::batch`].
///
/// Writes land in the store immediately and are visible to [`BlockBatch::get`];
/// only mesh rebuilds wait for [`BlockBatch::flush`].
pub struct BlockBatch<'a> {
    store: &'a mut ChunkStore,
    touched: FxHashSet<ChunkPos>,
}

impl<'a> BlockBatch<'a> {
    pub fn get(&self, world_pos: IVec3) -> BlockId {
        self.store.get_block(world_pos)
    }

    pub fn set(&mut self, world_pos: IVec3, block: BlockId) -> BlockId {
        self.touched.extend(affected_chunks(world_pos));
        self.store.set_block_deferred(world_pos, block)
    }

    pub fn insert_chunk(&mut self, pos: ChunkPos, data: ChunkData) {
        self.store.insert_chunk(pos, data);
        self.touched.insert(pos);
        for (dx, dy, dz) in [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)] {
            self.touched.insert(pos.offset(dx, dy, dz));
        }
    }

    pub fn store(&self) -> &ChunkStore {
        self.store
    }

    pub fn touched_chunks(&self) -> usize {
        self.touched.len()
    }

    /// Rebuilds every chunk the batch wrote into or bordered.
    pub fn flush(self) -> usize {
        let BlockBatch { store, touched } = self;
        store.rebuild_chunks(touched)
    }

    /// Rebuilds exactly `chunks`, ignoring what the batch tracked.
    pub fn flush_chunks<I>(self, chunks: I) -> usize
    where
        I: IntoIterator<Item = ChunkPos>,
    {
        self.store.rebuild_chunks(chunks)
    }
}
