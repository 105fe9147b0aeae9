use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::block::BlockId;
use crate::coords::{local_to_index, LocalPos, CHUNK_VOLUME};

/// Dense `R³` block grid for one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkData {
    pub blocks: Box<[BlockId; CHUNK_VOLUME]>,
}

impl ChunkData {
    pub fn new_empty() -> Self {
        Self::new_filled(BlockId::AIR)
    }

    pub fn new_filled(block: BlockId) -> Self {
        Self {
            blocks: Box::new([block; CHUNK_VOLUME]),
        }
    }

    pub fn get(&self, local: LocalPos) -> BlockId {
        self.blocks[local_to_index(local)]
    }

    pub fn set(&mut self, local: LocalPos, block: BlockId) {
        let index = local_to_index(local);
        self.blocks[index] = block;
    }

    pub fn get_index(&self, index: usize) -> BlockId {
        self.blocks[index]
    }

    pub fn set_index(&mut self, index: usize, block: BlockId) {
        self.blocks[index] = block;
    }

    pub fn is_uniform(&self, block: BlockId) -> bool {
        self.blocks.iter().all(|&b| b == block)
    }

    /// Number of cells holding something other than air.
    pub fn occupied_count(&self) -> usize {
        self.blocks.iter().filter(|&&b| b != BlockId::AIR).count()
    }
}

impl Default for ChunkData {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl Serialize for ChunkData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.blocks.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChunkData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let blocks = Vec::<BlockId>::deserialize(deserializer)?;
        if blocks.len() != CHUNK_VOLUME {
            return Err(de::Error::custom(format!(
                "expected {CHUNK_VOLUME} blocks, got {}",
                blocks.len()
            )));
        }

        let blocks: Box<[BlockId; CHUNK_VOLUME]> = blocks
            .into_boxed_slice()
            .try_into()
            .map_err(|_| de::Error::custom("failed to deserialize chunk block array"))?;

        Ok(Self { blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkData;
    use crate::block::BlockId;
    use crate::coords::{local_to_index, LocalPos, CHUNK_VOLUME};

    #[test]
    fn chunk_creation_and_get_set_work() {
        let mut chunk = ChunkData::new_empty();
        let pos = LocalPos { x: 3, y: 7, z: 11 };
        assert_eq!(chunk.get(pos), BlockId::AIR);
        assert!(chunk.is_uniform(BlockId::AIR));

        chunk.set(pos, BlockId::STONE);
        assert_eq!(chunk.get(pos), BlockId::STONE);
        assert_eq!(chunk.get_index(local_to_index(pos)), BlockId::STONE);
        assert_eq!(chunk.occupied_count(), 1);

        chunk.set_index(0, BlockId::GRASS);
        assert_eq!(chunk.get_index(0), BlockId::GRASS);
        assert!(!chunk.is_uniform(BlockId::AIR));
    }

    #[test]
    fn chunk_bincode_round_trip_preserves_data() {
        let mut original = ChunkData::new_filled(BlockId::DIRT);
        original.set(LocalPos { x: 0, y: 0, z: 0 }, BlockId::GRASS);
        original.set(LocalPos { x: 15, y: 15, z: 15 }, BlockId::WATER);
        original.set(LocalPos { x: 5, y: 13, z: 2 }, BlockId::POPPY);

        let encoded = bincode::serialize(&original).expect("serialize chunk");
        let decoded: ChunkData = bincode::deserialize(&encoded).expect("deserialize chunk");

        assert_eq!(decoded.blocks.len(), CHUNK_VOLUME);
        assert_eq!(decoded, original);
    }

    #[test]
    fn chunk_deserialize_rejects_wrong_length() {
        let short = vec![BlockId::AIR; 10];
        let encoded = bincode::serialize(&short).expect("serialize short vec");
        let err = bincode::deserialize::<ChunkData>(&encoded).expect_err("short chunk must fail");
        assert!(err.to_string().contains("expected"));
    }
}
