use serde::{Deserialize, Serialize};
use tracing::info;

use voxmere_shared::chunk::ChunkData;
use voxmere_shared::coords::{ChunkPos, WorldDims, DEFAULT_BUFFER_RADIUS};

use crate::world_file::WorldDisk;

pub const CURRENT_WORLD_FORMAT_VERSION: u32 = 2;

/// First layout: no buffer radius, so files assumed the default buffer.
#[derive(Serialize, Deserialize)]
struct WorldDiskV1 {
    format_version: u32,
    dims: WorldDims,
    chunks: Vec<(ChunkPos, ChunkData)>,
}

pub fn is_supported(version: u32) -> bool {
    (1..=CURRENT_WORLD_FORMAT_VERSION).contains(&version)
}

pub fn migrate_world_payload(mut version: u32, mut payload: Vec<u8>) -> Result<Vec<u8>, String> {
    if version == CURRENT_WORLD_FORMAT_VERSION {
        return Ok(payload);
    }

    if !is_supported(version) {
        return Err(format!(
            "unsupported world format version {version}; current version is {CURRENT_WORLD_FORMAT_VERSION}"
        ));
    }

    while version < CURRENT_WORLD_FORMAT_VERSION {
        let next_version = version + 1;
        info!("Migrating world payload format v{version} -> v{next_version}");
        payload = migrate_one_version(version, payload)?;
        version = next_version;
    }

    Ok(payload)
}

fn migrate_one_version(version: u32, payload: Vec<u8>) -> Result<Vec<u8>, String> {
    match version {
        1 => migrate_world_v1_to_v2(payload),
        other => Err(format!(
            "missing migration path for world format v{other} -> v{}",
            other + 1
        )),
    }
}

fn migrate_world_v1_to_v2(payload: Vec<u8>) -> Result<Vec<u8>, String> {
    let v1: WorldDiskV1 = bincode::deserialize(&payload)
        .map_err(|err| format!("failed to decode v1 world payload: {err}"))?;

    let widest = v1.dims.x.max(v1.dims.z) as usize;
    let v2 = WorldDisk {
        format_version: 2,
        dims: v1.dims,
        buffer_radius: DEFAULT_BUFFER_RADIUS.max(widest) as u32,
        chunks: v1.chunks,
    };
    bincode::serialize(&v2).map_err(|err| format!("failed to encode migrated v2 payload: {err}"))
}
