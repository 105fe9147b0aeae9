use std::fs;
use std::io;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use voxmere_shared::block::{BlockId, BlockRegistry};
use voxmere_shared::chunk::ChunkData;
use voxmere_shared::coords::{ChunkPos, WorldDims, MAX_BUFFER_RADIUS};
use voxmere_shared::mesh::MeshStyle;
use voxmere_shared::store::ChunkStore;

use crate::compression::Compression;
use crate::versioning::{is_supported, migrate_world_payload, CURRENT_WORLD_FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid world file magic; expected VXMW")]
    BadMagic,
    #[error("unsupported world wire format version {0}; expected 1, 2 or 3")]
    UnsupportedWireVersion(u8),
    #[error("unsupported world format version {0}")]
    UnsupportedFormat(u32),
    #[error("failed to migrate world payload from format v{from}: {reason}")]
    Migration { from: u32, reason: String },
    #[error("failed to decode world payload: {0}")]
    Decode(String),
    #[error("failed to encode world payload: {0}")]
    Encode(String),
    #[error("world payload compression failed: {0}")]
    Compression(#[source] io::Error),
    #[error("world of {dims:?} chunks does not fit a buffer of radius {buffer_radius}")]
    DimsMismatch { dims: WorldDims, buffer_radius: u32 },
    #[error("chunk {pos:?} holds unregistered block id {block:?}")]
    UnknownBlock { pos: ChunkPos, block: BlockId },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Serialize, Deserialize)]
pub(crate) struct WorldDisk {
    pub(crate) format_version: u32,
    pub(crate) dims: WorldDims,
    pub(crate) buffer_radius: u32,
    pub(crate) chunks: Vec<(ChunkPos, ChunkData)>,
}

/// Everything needed to rebuild a [`ChunkStore`]: dims, buffer size and every
/// loaded chunk. Meshes are not stored; they are rebuilt on restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldFile {
    pub dims: WorldDims,
    pub buffer_radius: u32,
    pub chunks: Vec<(ChunkPos, ChunkData)>,
}

impl WorldFile {
    pub const MAGIC: [u8; 4] = *b"VXMW";

    /// Snapshot of every loaded chunk in `store`, ordered by position.
    pub fn capture(store: &ChunkStore) -> Self {
        let mut chunks: Vec<(ChunkPos, ChunkData)> = store
            .loaded_chunks()
            .map(|(pos, chunk)| (pos, chunk.clone()))
            .collect();
        chunks.sort_unstable_by_key(|(pos, _)| *pos);
        Self {
            dims: store.dims(),
            buffer_radius: store.buffer_radius() as u32,
            chunks,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        let radius = self.buffer_radius as usize;
        if radius == 0 || radius > MAX_BUFFER_RADIUS || !self.dims.fits_buffer(radius) {
            return Err(PersistError::DimsMismatch {
                dims: self.dims,
                buffer_radius: self.buffer_radius,
            });
        }
        Ok(())
    }

    pub fn encode(&self, compression: Compression) -> Result<Vec<u8>, PersistError> {
        let disk = WorldDisk {
            format_version: CURRENT_WORLD_FORMAT_VERSION,
            dims: self.dims,
            buffer_radius: self.buffer_radius,
            chunks: self.chunks.clone(),
        };
        let encoded = bincode::serialize(&disk).map_err(|err| PersistError::Encode(err.to_string()))?;
        let packed = compression
            .compress(&encoded)
            .map_err(PersistError::Compression)?;

        let mut bytes = Vec::with_capacity(Self::MAGIC.len() + 1 + packed.len());
        bytes.extend_from_slice(&Self::MAGIC);
        bytes.push(compression.wire_byte());
        bytes.extend_from_slice(&packed);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        if bytes.len() < Self::MAGIC.len() || bytes[..4] != Self::MAGIC[..] {
            return Err(PersistError::BadMagic);
        }

        let (wire_version, wire_payload) = bytes[Self::MAGIC.len()..]
            .split_first()
            .ok_or_else(|| PersistError::Decode("missing world wire format version".to_string()))?;
        let compression = Compression::from_wire_byte(*wire_version)
            .ok_or(PersistError::UnsupportedWireVersion(*wire_version))?;
        let payload = compression
            .decompress(wire_payload)
            .map_err(PersistError::Compression)?;

        let source_version = decode_format_version(&payload)?;
        if !is_supported(source_version) {
            return Err(PersistError::UnsupportedFormat(source_version));
        }
        let migrated = migrate_world_payload(source_version, payload).map_err(|reason| {
            PersistError::Migration {
                from: source_version,
                reason,
            }
        })?;
        if source_version != CURRENT_WORLD_FORMAT_VERSION {
            info!(
                "Migrated world payload format v{} -> v{}",
                source_version, CURRENT_WORLD_FORMAT_VERSION
            );
        }

        let disk: WorldDisk =
            bincode::deserialize(&migrated).map_err(|err| PersistError::Decode(err.to_string()))?;
        let world = Self {
            dims: disk.dims,
            buffer_radius: disk.buffer_radius,
            chunks: disk.chunks,
        };
        world.validate()?;
        Ok(world)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let world = Self::decode(&bytes)?;
        debug!(
            "Read world {:?}: {} chunks, dims {}x{}",
            path,
            world.chunks.len(),
            world.dims.x,
            world.dims.z
        );
        Ok(world)
    }

    pub fn write(&self, path: impl AsRef<Path>, compression: Compression) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.encode(compression)?;
        fs::write(path, &bytes)?;
        debug!("Wrote world {:?} ({} bytes, {:?})", path, bytes.len(), compression);
        Ok(())
    }

    /// Builds a store from this snapshot and meshes every chunk.
    ///
    /// Fails without touching anything when a chunk holds a block id the
    /// registry does not know.
    pub fn restore(self, registry: BlockRegistry, style: MeshStyle) -> Result<ChunkStore, PersistError> {
        self.validate()?;
        for (pos, chunk) in &self.chunks {
            if let Some(block) = chunk.blocks.iter().find(|block| !registry.contains(**block)) {
                return Err(PersistError::UnknownBlock {
                    pos: *pos,
                    block: *block,
                });
            }
        }

        let mut store = ChunkStore::new(registry, self.buffer_radius as usize).with_mesh_style(style);
        store.set_dims(self.dims);
        for (pos, chunk) in self.chunks {
            store.insert_chunk(pos, chunk);
        }
        let meshed = store.rebuild_all();
        info!(
            "Restored world with {} chunks ({} meshed)",
            store.loaded_chunk_count(),
            meshed
        );
        Ok(store)
    }
}

fn decode_format_version(payload: &[u8]) -> Result<u32, PersistError> {
    let mut cursor = Cursor::new(payload);
    bincode::deserialize_from::<_, u32>(&mut cursor)
        .map_err(|err| PersistError::Decode(format!("failed to decode format version prefix: {err}")))
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use voxmere_shared::block::{register_default_blocks, BlockId};
    use voxmere_shared::chunk::ChunkData;
    use voxmere_shared::coords::{ChunkPos, WorldDims};
    use voxmere_shared::mesh::MeshStyle;
    use voxmere_shared::store::ChunkStore;

    use super::{PersistError, WorldFile};
    use crate::compression::Compression;

    fn sample_store() -> ChunkStore {
        let mut store = ChunkStore::new(register_default_blocks(), 8);
        store.set_dims(WorldDims::new(3, 3));
        store.set_block(IVec3::new(1, 2, 3), BlockId::BRICK);
        store.set_block(IVec3::new(40, 0, 20), BlockId::WATER);
        store.add_chunk(ChunkPos::new(1, 1, 1), ChunkData::new_filled(BlockId::STONE));
        store
    }

    #[test]
    fn worlds_survive_every_compression() {
        let store = sample_store();
        let world = WorldFile::capture(&store);
        assert_eq!(world.chunk_count(), 3);

        for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
            let bytes = world.encode(compression).expect("encode world");
            assert_eq!(&bytes[..4], b"VXMW");
            assert_eq!(bytes[4], compression.wire_byte());
            let decoded = WorldFile::decode(&bytes).expect("decode world");
            assert_eq!(decoded, world);
        }
    }

    #[test]
    fn restore_rebuilds_meshes() {
        let world = WorldFile::capture(&sample_store());
        let store = world.restore(register_default_blocks(), MeshStyle::default()).expect("restore world");

        assert_eq!(store.dims(), WorldDims::new(3, 3));
        assert_eq!(store.get_block(IVec3::new(1, 2, 3)), BlockId::BRICK);
        assert_eq!(store.get_block(IVec3::new(20, 20, 20)), BlockId::STONE);
        assert_eq!(store.mesh_count(), store.loaded_chunk_count());
    }

    #[test]
    fn files_round_trip_on_disk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("saves").join("world.vxm");
        let world = WorldFile::capture(&sample_store());
        world.write(&path, Compression::Zstd).expect("write world");

        let read = WorldFile::read(&path).expect("read world");
        assert_eq!(read, world);
    }

    #[test]
    fn bad_headers_are_rejected() {
        assert!(matches!(WorldFile::decode(b"NOPE\x01"), Err(PersistError::BadMagic)));
        assert!(matches!(WorldFile::decode(b"VX"), Err(PersistError::BadMagic)));
        assert!(matches!(
            WorldFile::decode(b"VXMW\x07abc"),
            Err(PersistError::UnsupportedWireVersion(7))
        ));
        assert!(matches!(WorldFile::decode(b"VXMW"), Err(PersistError::Decode(_))));
    }

    #[test]
    fn truncated_payload_fails_to_decode() {
        let bytes = WorldFile::capture(&sample_store())
            .encode(Compression::None)
            .expect("encode world");
        let truncated = &bytes[..bytes.len() - 100];
        assert!(matches!(WorldFile::decode(truncated), Err(PersistError::Decode(_))));
    }

    #[test]
    fn future_format_versions_are_rejected() {
        let mut bytes = b"VXMW\x01".to_vec();
        bytes.extend_from_slice(&bincode::serialize(&7u32).expect("serialize version"));
        assert!(matches!(
            WorldFile::decode(&bytes),
            Err(PersistError::UnsupportedFormat(7))
        ));
    }

    #[test]
    fn oversized_dims_are_rejected() {
        let mut world = WorldFile::capture(&sample_store());
        world.dims = WorldDims::new(9, 2);
        let bytes = world.encode(Compression::None).expect("encode world");
        assert!(matches!(
            WorldFile::decode(&bytes),
            Err(PersistError::DimsMismatch { buffer_radius: 8, .. })
        ));
    }

    #[test]
    fn huge_buffer_radius_is_rejected() {
        let world = WorldFile {
            dims: WorldDims::new(2, 2),
            buffer_radius: 3_000_000,
            chunks: Vec::new(),
        };
        let bytes = world.encode(Compression::Zstd).expect("encode world");
        assert!(matches!(
            WorldFile::decode(&bytes),
            Err(PersistError::DimsMismatch {
                buffer_radius: 3_000_000,
                ..
            })
        ));
        assert!(world
            .restore(register_default_blocks(), MeshStyle::default())
            .is_err());
    }

    #[test]
    fn unknown_blocks_fail_restore() {
        let mut world = WorldFile::capture(&sample_store());
        world.chunks[0].1.set_index(5, BlockId(999));
        assert!(matches!(
            world.restore(register_default_blocks(), MeshStyle::default()),
            Err(PersistError::UnknownBlock {
                block: BlockId(999),
                ..
            })
        ));
    }
}
