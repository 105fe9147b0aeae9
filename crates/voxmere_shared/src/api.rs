use glam::IVec3;

use crate::block::{BlockId, BlockRegistry};
use crate::creature::Creature;
use crate::inventory::{ItemContainer, ItemId};
use crate::store::ChunkStore;

/// Furthest a creature can reach when mining, in blocks.
pub const MINE_RANGE: i32 = 5;

/// Creature resource an action can be charged against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Energy,
    Moves,
}

/// Horizontal walking direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Step along `(x, z)`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn from_offset(dx: i32, dz: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.offset() == (dx, dz))
    }

    pub fn random(rng: &mut fastrand::Rng) -> Self {
        Self::ALL[rng.usize(..Self::ALL.len())]
    }
}

/// Everything an AI script may do with its creature, bound to one creature
/// and the world for the duration of a call.
///
/// Reads always succeed. Actions return `false` on failure and never panic.
pub struct CreatureApi<'a> {
    world: &'a mut ChunkStore,
    creature: &'a mut Creature,
}

impl<'a> CreatureApi<'a> {
    pub fn new(world: &'a mut ChunkStore, creature: &'a mut Creature) -> Self {
        Self { world, creature }
    }

    pub fn location(&self) -> IVec3 {
        self.creature.location
    }

    pub fn energy(&self) -> i32 {
        self.creature.energy
    }

    pub fn moves(&self) -> i32 {
        self.creature.moves
    }

    pub fn get_block(&self, pos: IVec3) -> BlockId {
        self.world.get_block(pos)
    }

    pub fn registry(&self) -> &BlockRegistry {
        self.world.registry()
    }

    pub fn has_inventory_space(&self, quantity: u32) -> bool {
        self.creature.inventory.has_space(quantity)
    }

    pub fn inventory_snapshot(&self) -> Vec<(ItemId, u32)> {
        self.creature.inventory.snapshot()
    }

    pub fn tools_snapshot(&self) -> Vec<ItemId> {
        self.creature.tools.snapshot()
    }

    /// Runs `action` only if `resource` holds at least `cost`, and charges the
    /// cost only when the action reports success.
    pub fn require<F>(&mut self, resource: Resource, cost: i32, action: F) -> bool
    where
        F: FnOnce(&mut Self) -> bool,
    {
        if self.resource(resource) < cost {
            return false;
        }
        let succeeded = action(self);
        if succeeded {
            *self.resource_mut(resource) -= cost;
        }
        succeeded
    }

    fn resource(&self, resource: Resource) -> i32 {
        match resource {
            Resource::Energy => self.creature.energy,
            Resource::Moves => self.creature.moves,
        }
    }

    fn resource_mut(&mut self, resource: Resource) -> &mut i32 {
        match resource {
            Resource::Energy => &mut self.creature.energy,
            Resource::Moves => &mut self.creature.moves,
        }
    }

    fn within_reach(&self, pos: IVec3, range: i32) -> bool {
        (self.creature.location - pos).length_squared() <= range * range
    }

    fn passable(&self, pos: IVec3) -> bool {
        self.world.registry().is_passable(self.world.get_block(pos))
    }

    /// Walks one block, stepping down or up a single block where needed.
    /// Costs one energy and one move.
    pub fn try_walk(&mut self, direction: Direction) -> bool {
        self.require(Resource::Energy, 1, |api| {
            api.require(Resource::Moves, 1, |api| api.step(direction))
        })
    }

    fn step(&mut self, direction: Direction) -> bool {
        let (dx, dz) = direction.offset();
        let target = self.creature.location + IVec3::new(dx, 0, dz);
        let at = |dy: i32| target + IVec3::new(0, dy, 0);

        let destination = if !self.passable(at(-2)) && self.passable(at(-1)) && self.passable(at(0)) {
            Some(at(-1))
        } else if !self.passable(at(-1)) && self.passable(at(0)) && self.passable(at(1)) {
            Some(at(0))
        } else if !self.passable(at(0)) && self.passable(at(1)) && self.passable(at(2)) {
            Some(at(1))
        } else {
            None
        };

        match destination {
            Some(pos) => {
                self.creature.location = pos;
                true
            }
            None => false,
        }
    }

    /// Breaks the block at `pos` and keeps its drop. Costs one energy.
    pub fn try_mine(&mut self, pos: IVec3) -> bool {
        self.require(Resource::Energy, 1, |api| {
            if !api.within_reach(pos, MINE_RANGE) || !api.has_inventory_space(1) {
                return false;
            }
            let Some(drop) = api.world.block_properties(pos).drop_item else {
                return false;
            };
            api.world.remove_block(pos);
            api.creature.inventory.add(drop, 1);
            true
        })
    }

    /// Eats one unit of `food` from the inventory.
    pub fn try_eat(&mut self, food: ItemId) -> bool {
        let Some(energy) = food.food_energy() else {
            return false;
        };
        if self.creature.inventory.remove(food, 1).is_err() {
            return false;
        }
        self.creature.energy += energy;
        true
    }
}

/// Per-tick behaviour for a creature.
pub trait CreatureScript {
    fn tick(&mut self, api: &mut CreatureApi<'_>);
}

impl<F> CreatureScript for F
where
    F: FnMut(&mut CreatureApi<'_>),
{
    fn tick(&mut self, api: &mut CreatureApi<'_>) {
        self(api)
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{CreatureApi, CreatureScript, Direction, Resource};
    use crate::block::{register_default_blocks, BlockId};
    use crate::creature::Creature;
    use crate::inventory::{ItemContainer, ItemId};
    use crate::store::ChunkStore;

    fn world_with_floor() -> ChunkStore {
        let mut store = ChunkStore::new(register_default_blocks(), 8);
        let mut batch = store.batch();
        for x in 0..24 {
            for z in 0..24 {
                batch.set(IVec3::new(x, 39, z), BlockId::GRASS);
            }
        }
        drop(batch);
        store
    }

    fn spawn() -> Creature {
        Creature::with_color(IVec3::new(10, 40, 10), [0, 0, 0])
    }

    #[test]
    fn flat_walk_moves_and_charges_once_per_tick() {
        let mut world = world_with_floor();
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(api.try_walk(Direction::East));
        assert_eq!(api.location(), IVec3::new(11, 40, 10));
        assert_eq!(api.energy(), 39);
        assert_eq!(api.moves(), 0);

        assert!(!api.try_walk(Direction::East));
        assert_eq!(api.location(), IVec3::new(11, 40, 10));
        assert_eq!(api.energy(), 39);
    }

    #[test]
    fn walls_block_without_charging() {
        let mut world = world_with_floor();
        for y in 40..43 {
            world.set_block_deferred(IVec3::new(11, y, 10), BlockId::STONE);
        }
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(!api.try_walk(Direction::East));
        assert_eq!(api.location(), IVec3::new(10, 40, 10));
        assert_eq!(api.energy(), 40);
        assert_eq!(api.moves(), 1);
    }

    #[test]
    fn walking_steps_up_and_down_one_block() {
        let mut world = world_with_floor();
        world.set_block_deferred(IVec3::new(11, 40, 10), BlockId::DIRT);
        world.set_block_deferred(IVec3::new(10, 39, 9), BlockId::AIR);
        world.set_block_deferred(IVec3::new(10, 38, 9), BlockId::STONE);

        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);
        assert!(api.try_walk(Direction::East));
        assert_eq!(api.location(), IVec3::new(11, 41, 10));

        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);
        assert!(api.try_walk(Direction::South));
        assert_eq!(api.location(), IVec3::new(10, 39, 9));
    }

    #[test]
    fn foliage_does_not_block_walking() {
        let mut world = world_with_floor();
        world.set_block_deferred(IVec3::new(9, 40, 10), BlockId::TALL_GRASS);
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);
        assert!(api.try_walk(Direction::West));
        assert_eq!(api.location(), IVec3::new(9, 40, 10));
    }

    #[test]
    fn exhausted_creatures_cannot_act() {
        let mut world = world_with_floor();
        world.set_block_deferred(IVec3::new(10, 41, 11), BlockId::LOG);
        let mut creature = spawn();
        creature.energy = 0;
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(!api.try_walk(Direction::North));
        assert!(!api.try_mine(IVec3::new(10, 41, 11)));
        assert_eq!(api.get_block(IVec3::new(10, 41, 11)), BlockId::LOG);
        assert_eq!(api.energy(), 0);
    }

    #[test]
    fn gate_skips_action_when_short_and_keeps_cost_on_failure() {
        let mut world = world_with_floor();
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);

        let mut invoked = false;
        assert!(!api.require(Resource::Moves, 2, |_| {
            invoked = true;
            true
        }));
        assert!(!invoked);

        assert!(!api.require(Resource::Energy, 5, |_| {
            invoked = true;
            false
        }));
        assert!(invoked);
        assert_eq!(api.energy(), 40);

        assert!(api.require(Resource::Energy, 5, |_| true));
        assert_eq!(api.energy(), 35);
    }

    #[test]
    fn mining_takes_the_drop_item() {
        let mut world = world_with_floor();
        world.set_block_deferred(IVec3::new(12, 41, 10), BlockId::APPLE_LEAVES);
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(api.try_mine(IVec3::new(12, 41, 10)));
        assert_eq!(api.get_block(IVec3::new(12, 41, 10)), BlockId::AIR);
        assert_eq!(api.inventory_snapshot(), vec![(ItemId::APPLE, 1)]);
        assert_eq!(api.energy(), 39);
    }

    #[test]
    fn mining_without_a_drop_or_out_of_reach_fails() {
        let mut world = world_with_floor();
        world.set_block_deferred(IVec3::new(30, 40, 10), BlockId::LOG);
        let mut creature = spawn();
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(!api.try_mine(IVec3::new(10, 39, 10)));
        assert_eq!(api.get_block(IVec3::new(10, 39, 10)), BlockId::GRASS);
        assert!(!api.try_mine(IVec3::new(30, 40, 10)));
        assert_eq!(api.get_block(IVec3::new(30, 40, 10)), BlockId::LOG);
        assert!(api.inventory_snapshot().is_empty());
        assert_eq!(api.energy(), 40);
    }

    #[test]
    fn eating_restores_energy() {
        let mut world = world_with_floor();
        let mut creature = spawn();
        creature.inventory.add(ItemId::BERRY, 2);
        creature.inventory.add(ItemId::LOG, 1);
        let mut api = CreatureApi::new(&mut world, &mut creature);

        assert!(api.try_eat(ItemId::BERRY));
        assert_eq!(api.energy(), 48);
        assert_eq!(api.inventory_snapshot(), vec![(ItemId::LOG, 1), (ItemId::BERRY, 1)]);
        assert!(!api.try_eat(ItemId::APPLE));
        assert!(!api.try_eat(ItemId::LOG));
        assert_eq!(api.energy(), 48);
    }

    #[test]
    fn closures_run_as_scripts() {
        let mut world = world_with_floor();
        let mut creature = spawn();
        fn walk_north(api: &mut CreatureApi<'_>) {
            api.try_walk(Direction::North);
        }
        let mut script = walk_north;
        script.tick(&mut CreatureApi::new(&mut world, &mut creature));
        assert_eq!(creature.location, IVec3::new(10, 40, 11));
    }

    #[test]
    fn directions_map_to_offsets() {
        assert_eq!(Direction::from_offset(1, 0), Some(Direction::East));
        assert_eq!(Direction::from_offset(0, -1), Some(Direction::South));
        assert_eq!(Direction::from_offset(1, 1), None);
    }
}
