use std::collections::HashMap;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::inventory::ItemId;

/// Tiles per row and column of the texture atlas.
pub const ATLAS_TILES: u32 = 16;

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const GRASS: Self = Self(1);
    pub const SAND: Self = Self(2);
    pub const BRICK: Self = Self(3);
    pub const STONE: Self = Self(4);
    pub const DIRT: Self = Self(5);
    pub const CLAY: Self = Self(6);
    pub const LOG: Self = Self(7);
    pub const LEAVES: Self = Self(8);
    pub const APPLE_LEAVES: Self = Self(9);
    pub const TALL_GRASS: Self = Self(10);
    pub const POPPY: Self = Self(11);
    pub const CORNFLOWER: Self = Self(12);
    pub const WATER: Self = Self(13);
    pub const BERRY_BUSH: Self = Self(14);
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BlockFlags: u8 {
        /// Neighbouring faces stay visible through this block.
        const TRANSPARENT = 1 << 0;
        /// Creatures may occupy the cell.
        const PASSABLE = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawStyle {
    #[default]
    Solid,
    CrossFoliage,
    Fluid,
}

/// Atlas rectangle as four `(u, v)` corners, counter-clockwise from the origin.
pub type TexQuad = [f32; 8];

pub fn tex_coord(x: u32, y: u32) -> TexQuad {
    let m = 1.0 / ATLAS_TILES as f32;
    let dx = x as f32 * m;
    let dy = y as f32 * m;
    [dx, dy, dx + m, dy, dx + m, dy + m, dx, dy + m]
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureFaceSet {
    pub top: TexQuad,
    pub bottom: TexQuad,
    pub side: TexQuad,
}

impl TextureFaceSet {
    pub fn uniform(x: u32, y: u32) -> Self {
        let quad = tex_coord(x, y);
        Self {
            top: quad,
            bottom: quad,
            side: quad,
        }
    }

    pub fn per_face(top: (u32, u32), bottom: (u32, u32), side: (u32, u32)) -> Self {
        Self {
            top: tex_coord(top.0, top.1),
            bottom: tex_coord(bottom.0, bottom.1),
            side: tex_coord(side.0, side.1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockProperties {
    pub name: String,
    pub flags: BlockFlags,
    pub draw_style: DrawStyle,
    #[serde(default)]
    pub textures: Option<TextureFaceSet>,
    #[serde(default)]
    pub variants: Vec<TextureFaceSet>,
    #[serde(default)]
    pub drop_item: Option<ItemId>,
}

impl BlockProperties {
    pub fn is_transparent(&self) -> bool {
        self.flags.contains(BlockFlags::TRANSPARENT)
    }

    pub fn is_passable(&self) -> bool {
        self.flags.contains(BlockFlags::PASSABLE)
    }

    /// Texture set for a block at `world_pos`.
    ///
    /// Kinds with variants pick one from a generator seeded by the position,
    /// so the same cell always renders the same way.
    pub fn texture_at(&self, world_pos: IVec3) -> Option<&TextureFaceSet> {
        if self.variants.is_empty() {
            return self.textures.as_ref();
        }
        let mut rng = fastrand::Rng::with_seed(variant_seed(world_pos));
        self.variants.get(rng.usize(..self.variants.len()))
    }
}

fn variant_seed(world_pos: IVec3) -> u64 {
    let mixed = i64::from(world_pos.x) * 83 + i64::from(world_pos.y) * 41 + i64::from(world_pos.z) * 23;
    mixed as u64
}

#[derive(Default, Debug, Clone)]
pub struct BlockRegistry {
    properties: Vec<BlockProperties>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, props: BlockProperties) -> BlockId {
        if let Some(existing) = self.by_name.get(props.name.as_str()) {
            return *existing;
        }

        let next_index = self.properties.len();
        let id = BlockId(
            u16::try_from(next_index).expect("block registry exceeded BlockId capacity (u16::MAX)"),
        );

        self.by_name.insert(props.name.clone(), id);
        self.properties.push(props);
        id
    }

    /// Properties of `id`, falling back to air for unknown ids.
    pub fn get_properties(&self, id: BlockId) -> &BlockProperties {
        self.properties
            .get(id.0 as usize)
            .or_else(|| self.properties.get(BlockId::AIR.0 as usize))
            .expect("block registry is empty; call register_default_blocks() first")
    }

    pub fn get_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        (id.0 as usize) < self.properties.len()
    }

    pub fn is_transparent(&self, id: BlockId) -> bool {
        self.get_properties(id).is_transparent()
    }

    pub fn is_passable(&self, id: BlockId) -> bool {
        self.get_properties(id).is_passable()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockProperties)> {
        self.properties
            .iter()
            .enumerate()
            .map(|(index, props)| (BlockId(index as u16), props))
    }
}

pub fn register_default_blocks() -> BlockRegistry {
    fn block(name: &str, textures: TextureFaceSet) -> BlockProperties {
        BlockProperties {
            name: name.to_string(),
            flags: BlockFlags::empty(),
            draw_style: DrawStyle::Solid,
            textures: Some(textures),
            variants: Vec::new(),
            drop_item: None,
        }
    }

    fn varied(name: &str, variants: Vec<TextureFaceSet>) -> BlockProperties {
        BlockProperties {
            name: name.to_string(),
            flags: BlockFlags::empty(),
            draw_style: DrawStyle::Solid,
            textures: None,
            variants,
            drop_item: None,
        }
    }

    fn foliage(name: &str, tiles: &[(u32, u32)]) -> BlockProperties {
        BlockProperties {
            flags: BlockFlags::TRANSPARENT | BlockFlags::PASSABLE,
            draw_style: DrawStyle::CrossFoliage,
            ..varied(name, tiles.iter().map(|&(x, y)| TextureFaceSet::uniform(x, y)).collect())
        }
    }

    let mut registry = BlockRegistry::new();

    let defaults = [
        BlockProperties {
            name: "air".to_string(),
            flags: BlockFlags::TRANSPARENT | BlockFlags::PASSABLE,
            draw_style: DrawStyle::Solid,
            textures: None,
            variants: Vec::new(),
            drop_item: None,
        },
        block("grass", TextureFaceSet::per_face((1, 0), (0, 1), (0, 0))),
        block("sand", TextureFaceSet::uniform(1, 1)),
        block("brick", TextureFaceSet::uniform(2, 0)),
        BlockProperties {
            drop_item: Some(ItemId::STONE),
            ..varied(
                "stone",
                vec![TextureFaceSet::uniform(5, 1), TextureFaceSet::uniform(6, 1)],
            )
        },
        block("dirt", TextureFaceSet::uniform(0, 1)),
        varied(
            "clay",
            vec![TextureFaceSet::uniform(5, 2), TextureFaceSet::uniform(6, 2)],
        ),
        BlockProperties {
            drop_item: Some(ItemId::LOG),
            ..block("log", TextureFaceSet::per_face((4, 1), (4, 1), (3, 1)))
        },
        BlockProperties {
            flags: BlockFlags::TRANSPARENT,
            drop_item: Some(ItemId::LEAVES),
            ..varied(
                "leaves",
                (3..7).map(|x| TextureFaceSet::uniform(x, 0)).collect(),
            )
        },
        BlockProperties {
            flags: BlockFlags::TRANSPARENT,
            drop_item: Some(ItemId::APPLE),
            ..varied(
                "apple_leaves",
                (7..9).map(|x| TextureFaceSet::uniform(x, 0)).collect(),
            )
        },
        foliage("tall_grass", &[(1, 2), (3, 2), (3, 3)]),
        foliage("poppy", &[(2, 2), (2, 3)]),
        foliage("cornflower", &[(4, 2), (4, 3)]),
        BlockProperties {
            flags: BlockFlags::TRANSPARENT,
            draw_style: DrawStyle::Fluid,
            ..block("water", TextureFaceSet::uniform(0, 2))
        },
        BlockProperties {
            flags: BlockFlags::TRANSPARENT,
            drop_item: Some(ItemId::BERRY),
            ..block("berry_bush", TextureFaceSet::uniform(1, 3))
        },
    ];

    for (expected_id, props) in defaults.into_iter().enumerate() {
        let id = registry.register(props);
        debug_assert_eq!(id.0 as usize, expected_id);
    }

    registry
}
