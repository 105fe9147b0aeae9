use glam::IVec3;

use crate::inventory::{Inventory, Tools};

pub const DEFAULT_ENERGY: i32 = 40;
pub const MOVES_PER_TICK: i32 = 1;

/// A simulated creature. Its state only changes through [`crate::api::CreatureApi`]
/// and the tick boundary in [`Creature::end_tick`].
#[derive(Clone, Debug)]
pub struct Creature {
    pub location: IVec3,
    pub energy: i32,
    pub moves: i32,
    pub inventory: Inventory,
    pub tools: Tools,
    /// RGBA repeated four times, one per quad corner.
    pub color_tag: [u8; 16],
}

impl Creature {
    pub fn new(location: IVec3) -> Self {
        Self::with_color(location, [fastrand::u8(..), fastrand::u8(..), fastrand::u8(..)])
    }

    pub fn with_color(location: IVec3, rgb: [u8; 3]) -> Self {
        let corner = [rgb[0], rgb[1], rgb[2], 255];
        let mut color_tag = [0u8; 16];
        for chunk in color_tag.chunks_exact_mut(4) {
            chunk.copy_from_slice(&corner);
        }
        Self {
            location,
            energy: DEFAULT_ENERGY,
            moves: MOVES_PER_TICK,
            inventory: Inventory::new(),
            tools: Tools::new(),
            color_tag,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.energy <= 0
    }

    /// Refills moves for the next tick. Returns true when the creature died.
    pub fn end_tick(&mut self) -> bool {
        self.moves = MOVES_PER_TICK;
        self.is_dead()
    }
}
