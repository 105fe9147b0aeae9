use glam::IVec3;
use noise::{NoiseFn, Perlin};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::block::BlockId;
use crate::chunk::ChunkData;
use crate::coords::{world_to_chunk, ChunkPos, LocalPos, WorldDims, CHUNK_SIZE};
use crate::geometry::sphere_blocks;
use crate::store::{BlockBatch, ChunkStore};

const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

/// Chunk layers above each surface tile whose meshes are rebuilt after generation.
const SURFACE_CHUNK_LAYERS: i32 = 3;

#[derive(Debug, Error, PartialEq)]
pub enum WorldGenError {
    #[error("world of {dims:?} x {column_chunks} chunks does not fit a buffer of radius {buffer_radius}")]
    DimsExceedBuffer {
        dims: WorldDims,
        column_chunks: u32,
        buffer_radius: usize,
    },
    #[error("world dims must be at least one chunk on each axis, got {0:?}")]
    EmptyDims(WorldDims),
    #[error("{octaves} noise octaves but {weights} octave weights")]
    OctaveWeightMismatch { octaves: usize, weights: usize },
    #[error("at least one noise octave is required")]
    EmptyOctaves,
    #[error("water feature radius range {min}..={max} is empty")]
    InvalidRadiusRange { min: i32, max: i32 },
    #[error("tile provider `{0}` has no weighted choices")]
    EmptyTileProvider(&'static str),
    #[error("tile provider `{0}` weights overflow u32")]
    TileWeightOverflow(&'static str),
}

/// Weighted block choice used wherever generation places a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileProvider(pub Vec<(BlockId, u32)>);

impl TileProvider {
    pub fn single(block: BlockId) -> Self {
        Self(vec![(block, 1)])
    }

    pub fn weighted(choices: &[(BlockId, u32)]) -> Self {
        Self(choices.to_vec())
    }

    /// `None` when the weights do not fit in a `u32`.
    fn total_weight(&self) -> Option<u32> {
        self.0
            .iter()
            .try_fold(0u32, |total, (_, weight)| total.checked_add(*weight))
    }

    /// Picks a block by weight. Empty or overflowing providers yield air.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> BlockId {
        let total = match self.total_weight() {
            Some(total) if total > 0 => total,
            _ => return BlockId::AIR,
        };
        let mut roll = rng.u32(..total);
        for &(block, weight) in &self.0 {
            if roll < weight {
                return block;
            }
            roll -= weight;
        }
        BlockId::AIR
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileProviders {
    pub water: TileProvider,
    /// Backfill below submerged surface tiles.
    pub subaqua: TileProvider,
    pub water_feature: TileProvider,
    pub log: TileProvider,
    pub leaves: TileProvider,
    pub foliage: TileProvider,
}

impl Default for TileProviders {
    fn default() -> Self {
        Self {
            water: TileProvider::single(BlockId::WATER),
            subaqua: TileProvider::single(BlockId::SAND),
            water_feature: TileProvider::weighted(&[
                (BlockId::CLAY, 1),
                (BlockId::DIRT, 1),
                (BlockId::STONE, 1),
            ]),
            log: TileProvider::single(BlockId::LOG),
            leaves: TileProvider::weighted(&[(BlockId::LEAVES, 48), (BlockId::APPLE_LEAVES, 1)]),
            foliage: TileProvider::weighted(&[
                (BlockId::TALL_GRASS, 80),
                (BlockId::CORNFLOWER, 2),
                (BlockId::POPPY, 3),
                (BlockId::BERRY_BUSH, 1),
            ]),
        }
    }
}

impl TileProviders {
    fn named(&self) -> [(&'static str, &TileProvider); 6] {
        [
            ("water", &self.water),
            ("subaqua", &self.subaqua),
            ("water_feature", &self.water_feature),
            ("log", &self.log),
            ("leaves", &self.leaves),
            ("foliage", &self.foliage),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    pub dims: WorldDims,
    /// Chunk layers pre-filled with air in every column.
    pub column_chunks: u32,
    pub height_base: i32,
    pub water_height: i32,
    pub water_feature_chance: f64,
    pub water_feature_min_radius: i32,
    pub water_feature_max_radius: i32,
    pub tree_chance: f64,
    pub foliage_chance: f64,
    pub noise_input_scale: f64,
    pub noise_octaves: Vec<f64>,
    pub noise_octave_weights: Vec<f64>,
    pub noise_output_scale: f64,
    pub air_tile: BlockId,
    pub base_tile: BlockId,
    pub subterranean_tile: BlockId,
    pub surface_tile: BlockId,
    /// The only kind water features may replace.
    pub submerged_tile: BlockId,
    pub providers: TileProviders,
    /// Fixes every random draw when set; otherwise each run differs.
    pub seed: Option<u64>,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            dims: WorldDims::new(16, 16),
            column_chunks: 12,
            height_base: 40,
            water_height: 40,
            water_feature_chance: 0.01,
            water_feature_min_radius: 3,
            water_feature_max_radius: 6,
            tree_chance: 0.02,
            foliage_chance: 0.5,
            noise_input_scale: 12.0 / 256.0,
            noise_octaves: vec![2.0, 4.0, 9.0, 13.0],
            noise_octave_weights: vec![0.75, 0.75, 0.25, 0.25],
            noise_output_scale: 24.0,
            air_tile: BlockId::AIR,
            base_tile: BlockId::STONE,
            subterranean_tile: BlockId::DIRT,
            surface_tile: BlockId::GRASS,
            submerged_tile: BlockId::SAND,
            providers: TileProviders::default(),
            seed: None,
        }
    }
}

impl WorldGenConfig {
    /// Raised terrain with a low sea.
    pub fn high_flat_land() -> Self {
        Self {
            height_base: 60,
            water_height: 20,
            ..Self::default()
        }
    }

    pub fn validate(&self, buffer_radius: usize) -> Result<(), WorldGenError> {
        if self.dims.x == 0 || self.dims.z == 0 {
            return Err(WorldGenError::EmptyDims(self.dims));
        }
        if !self.dims.fits_buffer(buffer_radius) || self.column_chunks as usize > buffer_radius {
            return Err(WorldGenError::DimsExceedBuffer {
                dims: self.dims,
                column_chunks: self.column_chunks,
                buffer_radius,
            });
        }
        if self.noise_octaves.is_empty() {
            return Err(WorldGenError::EmptyOctaves);
        }
        if self.noise_octaves.len() != self.noise_octave_weights.len() {
            return Err(WorldGenError::OctaveWeightMismatch {
                octaves: self.noise_octaves.len(),
                weights: self.noise_octave_weights.len(),
            });
        }
        if self.water_feature_min_radius > self.water_feature_max_radius {
            return Err(WorldGenError::InvalidRadiusRange {
                min: self.water_feature_min_radius,
                max: self.water_feature_max_radius,
            });
        }
        for (name, provider) in self.providers.named() {
            match provider.total_weight() {
                None => return Err(WorldGenError::TileWeightOverflow(name)),
                Some(0) => return Err(WorldGenError::EmptyTileProvider(name)),
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn top_of_column(&self) -> i32 {
        self.column_chunks as i32 * CHUNK_SIZE_I32
    }
}

#[derive(Debug, Clone)]
pub struct GenerateWorldResult {
    pub dims: WorldDims,
    /// Surface y for every column, keyed by `(x, z)`.
    pub height_map: FxHashMap<(i32, i32), i32>,
    /// One entry per column with terrain, in generation order.
    pub surface_tiles: Vec<IVec3>,
    pub seed: u64,
}

/// Named world shapes the launcher can ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldPreset {
    #[default]
    Normal,
    HighFlatLand,
    Spikey,
    Cubes,
}

impl WorldPreset {
    pub fn base_config(self) -> WorldGenConfig {
        match self {
            WorldPreset::HighFlatLand => WorldGenConfig::high_flat_land(),
            _ => WorldGenConfig::default(),
        }
    }
}

/// Generates `preset` into `store`, sets its dims and builds meshes.
pub fn generate_preset(
    store: &mut ChunkStore,
    preset: WorldPreset,
    config: &WorldGenConfig,
) -> Result<WorldDims, WorldGenError> {
    match preset {
        WorldPreset::Normal | WorldPreset::HighFlatLand => {
            generate_normal(store, config).map(|result| result.dims)
        }
        WorldPreset::Spikey => generate_spikey(store, config.seed),
        WorldPreset::Cubes => generate_cubes(store),
    }
}

/// Noise terrain with water, features, trees and foliage.
///
/// Sets the store's dims and rebuilds the chunks around every surface tile.
pub fn generate_normal(
    store: &mut ChunkStore,
    config: &WorldGenConfig,
) -> Result<GenerateWorldResult, WorldGenError> {
    config.validate(store.buffer_radius())?;
    store.set_dims(config.dims);

    let mut batch = store.batch();
    let result = generate_world(&mut batch, config)?;
    let rebuilt = batch.flush_chunks(surface_chunks(&result.surface_tiles));
    info!(
        "generated {}x{} chunk world (seed {}), {} surface chunks meshed",
        result.dims.x, result.dims.z, result.seed, rebuilt
    );
    Ok(result)
}

/// Writes terrain through `batch` without building any meshes.
pub fn generate_world(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
) -> Result<GenerateWorldResult, WorldGenError> {
    config.validate(batch.store().buffer_radius())?;
    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    let mut rng = fastrand::Rng::with_seed(seed);

    for cx in 0..config.dims.x as i32 {
        for cy in 0..config.column_chunks as i32 {
            for cz in 0..config.dims.z as i32 {
                batch.insert_chunk(ChunkPos::new(cx, cy, cz), ChunkData::new_filled(config.air_tile));
            }
        }
    }

    let (height_map, surface_tiles) = fill_terrain(batch, config, rng.u32(..));
    debug!("terrain filled: {} surface tiles", surface_tiles.len());

    let features = place_water(batch, config, &surface_tiles, &mut rng);
    let mut carved = 0;
    for tile in &features {
        carved += carve_water_feature(batch, config, *tile, &mut rng);
    }
    debug!("{} water features replaced {} cells", features.len(), carved);

    let trees = plant_trees(batch, config, &surface_tiles, &mut rng);
    let foliage = scatter_foliage(batch, config, &surface_tiles, &mut rng);
    debug!("{} trees, {} foliage tiles", trees, foliage);

    Ok(GenerateWorldResult {
        dims: config.dims,
        height_map,
        surface_tiles,
        seed,
    })
}

fn linspace(stop: f64, count: usize) -> Vec<f64> {
    if count < 2 {
        return vec![0.0; count];
    }
    let last = (count - 1) as f64;
    (0..count).map(|i| stop * i as f64 / last).collect()
}

/// Column heights for the whole world, indexed `x * depth + z`.
fn height_field(config: &WorldGenConfig, noise_seed: u32) -> Vec<i32> {
    let perlin = Perlin::new(noise_seed);
    let width = config.dims.x as usize * CHUNK_SIZE;
    let depth = config.dims.z as usize * CHUNK_SIZE;

    let axes: Vec<(Vec<f64>, Vec<f64>)> = config
        .noise_octaves
        .iter()
        .map(|&octave| {
            (
                linspace(f64::from(config.dims.x) * octave * config.noise_input_scale, width),
                linspace(f64::from(config.dims.z) * octave * config.noise_input_scale, depth),
            )
        })
        .collect();

    let mut heights = Vec::with_capacity(width * depth);
    for x in 0..width {
        for z in 0..depth {
            let sum: f64 = axes
                .iter()
                .zip(&config.noise_octave_weights)
                .map(|((xs, zs), weight)| perlin.get([xs[x], zs[z]]) * weight)
                .sum();
            heights.push(config.height_base + (config.noise_output_scale * sum) as i32);
        }
    }
    heights
}

fn fill_terrain(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
    noise_seed: u32,
) -> (FxHashMap<(i32, i32), i32>, Vec<IVec3>) {
    let heights = height_field(config, noise_seed);
    let width = config.dims.x as i32 * CHUNK_SIZE_I32;
    let depth = config.dims.z as i32 * CHUNK_SIZE_I32;
    let top = config.top_of_column();

    let mut height_map = FxHashMap::default();
    let mut surface_tiles = Vec::new();

    for x in 0..width {
        for z in 0..depth {
            let height = heights[(x * depth + z) as usize].clamp(0, top);
            for y in 0..height {
                let mut tile = config.base_tile;
                if y > height - 4 {
                    tile = config.subterranean_tile;
                }
                if y == height - 1 {
                    tile = config.surface_tile;
                    height_map.insert((x, z), y);
                    surface_tiles.push(IVec3::new(x, y, z));
                }
                if y < config.water_height {
                    tile = config.base_tile;
                }
                batch.set(IVec3::new(x, y, z), tile);
            }
        }
    }

    (height_map, surface_tiles)
}

/// Floods every column whose surface sits below the water line and returns
/// the tiles picked to seed water features.
fn place_water(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
    surface_tiles: &[IVec3],
    rng: &mut fastrand::Rng,
) -> Vec<IVec3> {
    let mut features = Vec::new();
    for &tile in surface_tiles {
        if tile.y >= config.water_height {
            continue;
        }
        for dy in (tile.y - 2).max(0)..=tile.y {
            batch.set(IVec3::new(tile.x, dy, tile.z), config.providers.subaqua.pick(rng));
        }
        for dy in tile.y + 1..=config.water_height {
            batch.set(IVec3::new(tile.x, dy, tile.z), config.providers.water.pick(rng));
        }
        if rng.f64() < config.water_feature_chance {
            features.push(tile);
        }
    }
    features
}

fn carve_water_feature(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
    tile: IVec3,
    rng: &mut fastrand::Rng,
) -> usize {
    let replacement = config.providers.water_feature.pick(rng);
    let scaler = rng.f64() * 1.6;
    let centre = IVec3::new(tile.x, tile.y + rng.i32(-2..=2), tile.z);
    let radius = f64::from(rng.i32(
        config.water_feature_min_radius..=config.water_feature_max_radius,
    ));
    let scale = [
        rng.f64() * 2.6 * scaler,
        rng.f64() * 1.4 * scaler,
        rng.f64() * 2.6 * scaler,
    ];
    replace_within_sphere(batch, centre, radius, scale, config.submerged_tile, replacement)
}

/// Replaces cells of `expected` kind inside a scaled sphere. Returns how many changed.
pub fn replace_within_sphere(
    batch: &mut BlockBatch<'_>,
    centre: IVec3,
    radius: f64,
    scale: [f64; 3],
    expected: BlockId,
    replacement: BlockId,
) -> usize {
    let mut replaced = 0;
    for spot in sphere_blocks(centre, radius, scale) {
        if batch.get(spot) == expected {
            batch.set(spot, replacement);
            replaced += 1;
        }
    }
    replaced
}

fn plant_trees(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
    surface_tiles: &[IVec3],
    rng: &mut fastrand::Rng,
) -> usize {
    let mut planted = 0;
    for &tile in surface_tiles {
        if rng.f64() >= config.tree_chance || batch.get(tile) != config.surface_tile {
            continue;
        }
        let log = config.providers.log.pick(rng);
        let trunk = rng.i32(3..=5);
        for oy in 0..trunk {
            batch.set(tile + IVec3::new(0, oy, 0), log);
        }

        let crown = tile.y + trunk - 1;
        let radius = 0.5 + f64::from(rng.i32(2..=4));
        for spot in sphere_blocks(IVec3::new(tile.x, crown, tile.z), radius, [0.8, 1.0, 0.8]) {
            if spot.y > crown - 1 && batch.get(spot) == config.air_tile {
                batch.set(spot, config.providers.leaves.pick(rng));
            }
        }
        planted += 1;
    }
    planted
}

fn scatter_foliage(
    batch: &mut BlockBatch<'_>,
    config: &WorldGenConfig,
    surface_tiles: &[IVec3],
    rng: &mut fastrand::Rng,
) -> usize {
    let mut placed = 0;
    for &tile in surface_tiles {
        let above = tile + IVec3::Y;
        if rng.f64() < config.foliage_chance
            && batch.get(tile) == config.surface_tile
            && batch.get(above) == config.air_tile
        {
            batch.set(above, config.providers.foliage.pick(rng));
            placed += 1;
        }
    }
    placed
}

/// Chunks containing a surface tile plus the two layers above it.
pub fn surface_chunks(surface_tiles: &[IVec3]) -> FxHashSet<ChunkPos> {
    let mut chunks = FxHashSet::default();
    for &tile in surface_tiles {
        let (chunk_pos, _) = world_to_chunk(tile);
        for dy in 0..SURFACE_CHUNK_LAYERS {
            chunks.insert(chunk_pos.offset(0, dy, 0));
        }
    }
    chunks
}

/// A 10x10 field of single-chunk sand columns capped with grass and tall grass.
pub fn generate_spikey(store: &mut ChunkStore, seed: Option<u64>) -> Result<WorldDims, WorldGenError> {
    let dims = WorldDims::new(10, 10);
    if !dims.fits_buffer(store.buffer_radius()) {
        return Err(WorldGenError::DimsExceedBuffer {
            dims,
            column_chunks: 1,
            buffer_radius: store.buffer_radius(),
        });
    }
    store.set_dims(dims);
    let mut rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    let size = CHUNK_SIZE as u8;

    let mut batch = store.batch();
    for cx in 0..dims.x as i32 {
        for cz in 0..dims.z as i32 {
            let mut chunk = ChunkData::new_empty();
            for ox in 0..size {
                for oz in 0..size {
                    let height = rng.u8(size - 8..=size);
                    for y in 0..height {
                        let block = match height - y {
                            1 => BlockId::TALL_GRASS,
                            2 => BlockId::GRASS,
                            3 | 4 => BlockId::DIRT,
                            _ => BlockId::SAND,
                        };
                        chunk.set(LocalPos::new(ox, y, oz), block);
                    }
                }
            }
            batch.insert_chunk(ChunkPos::new(cx, 0, cz), chunk);
        }
    }
    let rebuilt = batch.flush();
    info!("generated spikey world, {} chunks meshed", rebuilt);
    Ok(dims)
}

/// Eight solid chunks alternating grass and stone.
pub fn generate_cubes(store: &mut ChunkStore) -> Result<WorldDims, WorldGenError> {
    let dims = WorldDims::new(2, 2);
    if !dims.fits_buffer(store.buffer_radius()) {
        return Err(WorldGenError::DimsExceedBuffer {
            dims,
            column_chunks: 2,
            buffer_radius: store.buffer_radius(),
        });
    }
    store.set_dims(dims);
    let kinds = [BlockId::GRASS, BlockId::STONE];
    let mut next = 0;
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                store.add_chunk(ChunkPos::new(x, y, z), ChunkData::new_filled(kinds[next % 2]));
                next += 1;
            }
        }
    }
    info!("generated cube world");
    Ok(dims)
}
