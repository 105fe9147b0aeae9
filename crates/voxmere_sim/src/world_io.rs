use std::io;
use std::path::Path;

use tracing::info;
use voxmere_persist::compression::Compression;
use voxmere_persist::{PersistError, WorldFile};
use voxmere_shared::block::register_default_blocks;
use voxmere_shared::mesh::MeshStyle;
use voxmere_shared::store::ChunkStore;
use voxmere_shared::worldgen::generate_preset;

use crate::settings::Settings;

fn to_io_error(err: PersistError) -> io::Error {
    match err {
        PersistError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}

/// Generates a fresh world from the `[world]` settings.
pub fn create_world(settings: &Settings) -> io::Result<ChunkStore> {
    let config = settings.world.generation_config()?;
    let mut store = ChunkStore::new(register_default_blocks(), settings.sim.buffer_radius)
        .with_mesh_style(settings.mesh);
    let dims = generate_preset(&mut store, settings.world.preset, &config)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
    info!(
        "Created {:?} world: {}x{} chunks, {} loaded, {} meshed",
        settings.world.preset,
        dims.x,
        dims.z,
        store.loaded_chunk_count(),
        store.mesh_count()
    );
    Ok(store)
}

pub fn load_world(path: &Path, style: MeshStyle) -> io::Result<ChunkStore> {
    let world = WorldFile::read(path).map_err(to_io_error)?;
    let store = world
        .restore(register_default_blocks(), style)
        .map_err(to_io_error)?;
    info!("Loaded world from {}", path.display());
    Ok(store)
}

pub fn save_world(store: &ChunkStore, path: &Path, compression: Compression) -> io::Result<()> {
    let world = WorldFile::capture(store);
    world.write(path, compression).map_err(to_io_error)?;
    info!(
        "Saved {} chunks to {}",
        world.chunk_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use glam::IVec3;
    use voxmere_persist::compression::Compression;
    use voxmere_shared::block::BlockId;
    use voxmere_shared::coords::WorldDims;
    use voxmere_shared::mesh::MeshStyle;
    use voxmere_shared::worldgen::WorldPreset;

    use super::{create_world, load_world, save_world};
    use crate::settings::Settings;

    fn cube_settings() -> Settings {
        let mut settings = Settings::default();
        settings.world.preset = WorldPreset::Cubes;
        settings.sim.buffer_radius = 8;
        settings
    }

    #[test]
    fn saved_worlds_load_with_meshes() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("live.vxm");
        let mut store = create_world(&cube_settings()).expect("create world");
        store.set_block(IVec3::new(40, 3, 3), BlockId::BERRY_BUSH);
        save_world(&store, &path, Compression::Lz4).expect("save world");

        let loaded = load_world(&path, MeshStyle::default()).expect("load world");
        assert_eq!(loaded.dims(), WorldDims::new(2, 2));
        assert_eq!(loaded.loaded_chunk_count(), 9);
        assert_eq!(loaded.mesh_count(), 9);
        assert_eq!(loaded.get_block(IVec3::new(40, 3, 3)), BlockId::BERRY_BUSH);
        assert_eq!(loaded.get_block(IVec3::new(0, 16, 0)), BlockId::GRASS);
    }

    #[test]
    fn missing_and_corrupt_files_are_io_errors() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = load_world(&dir.path().join("none.vxm"), MeshStyle::default())
            .err()
            .expect("missing file must fail");
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);

        let corrupt = dir.path().join("corrupt.vxm");
        std::fs::write(&corrupt, b"not a world").expect("write corrupt file");
        let err = load_world(&corrupt, MeshStyle::default())
            .err()
            .expect("corrupt file must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_worlds_are_rejected_before_generation() {
        let mut settings = Settings::default();
        settings.sim.buffer_radius = 8;
        let err = create_world(&settings).err().expect("16x16 world cannot fit radius 8");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
