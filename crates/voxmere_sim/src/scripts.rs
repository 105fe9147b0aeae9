use voxmere_shared::api::{CreatureApi, CreatureScript, Direction};
use voxmere_shared::block::BlockId;
use voxmere_shared::geometry::unit_sphere_blocks;
use voxmere_shared::inventory::ItemId;

use crate::settings::ScriptKind;

/// Radius around the creature searched for apple leaves.
const APPLE_SEARCH_RADIUS: f64 = 5.0;
/// Apple pickers eat once their energy drops below this.
const HUNGRY_BELOW: i32 = 10;

pub fn build_script(kind: ScriptKind, rng: &mut fastrand::Rng) -> Box<dyn CreatureScript> {
    let rng = fastrand::Rng::with_seed(rng.u64(..));
    match kind {
        ScriptKind::Wanderer => Box::new(Wanderer { rng }),
        ScriptKind::ApplePicker => Box::new(ApplePicker { rng }),
    }
}

/// Walks in a random direction every tick.
pub struct Wanderer {
    rng: fastrand::Rng,
}

impl CreatureScript for Wanderer {
    fn tick(&mut self, api: &mut CreatureApi<'_>) {
        api.try_walk(Direction::random(&mut self.rng));
    }
}

/// Wanders and picks every apple within reach of where it started the tick.
pub struct ApplePicker {
    rng: fastrand::Rng,
}

impl CreatureScript for ApplePicker {
    fn tick(&mut self, api: &mut CreatureApi<'_>) {
        let search = unit_sphere_blocks(api.location(), APPLE_SEARCH_RADIUS);
        api.try_walk(Direction::random(&mut self.rng));
        for spot in search {
            if api.get_block(spot) == BlockId::APPLE_LEAVES {
                api.try_mine(spot);
            }
        }
        if api.energy() < HUNGRY_BELOW {
            api.try_eat(ItemId::APPLE);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;
    use voxmere_shared::api::{CreatureApi, CreatureScript};
    use voxmere_shared::block::{register_default_blocks, BlockId};
    use voxmere_shared::creature::Creature;
    use voxmere_shared::inventory::{ItemContainer, ItemId};
    use voxmere_shared::store::ChunkStore;

    use super::build_script;
    use crate::settings::ScriptKind;

    fn flat_world() -> ChunkStore {
        let mut store = ChunkStore::new(register_default_blocks(), 8);
        let mut batch = store.batch();
        for x in 0..32 {
            for z in 0..32 {
                batch.set(IVec3::new(x, 9, z), BlockId::GRASS);
            }
        }
        drop(batch);
        store
    }

    #[test]
    fn wanderer_takes_one_step_per_tick() {
        let mut world = flat_world();
        let mut creature = Creature::with_color(IVec3::new(16, 10, 16), [1, 2, 3]);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut script = build_script(ScriptKind::Wanderer, &mut rng);

        script.tick(&mut CreatureApi::new(&mut world, &mut creature));
        let moved = creature.location - IVec3::new(16, 10, 16);
        assert_eq!(moved.x.abs() + moved.z.abs(), 1);
        assert_eq!(moved.y, 0);
        assert_eq!(creature.energy, 39);
    }

    #[test]
    fn apple_picker_collects_nearby_apples() {
        let mut world = flat_world();
        world.set_block(IVec3::new(16, 12, 16), BlockId::APPLE_LEAVES);
        world.set_block(IVec3::new(18, 11, 16), BlockId::APPLE_LEAVES);
        world.set_block(IVec3::new(28, 11, 16), BlockId::APPLE_LEAVES);
        let mut creature = Creature::with_color(IVec3::new(16, 10, 16), [1, 2, 3]);
        let mut rng = fastrand::Rng::with_seed(9);
        let mut script = build_script(ScriptKind::ApplePicker, &mut rng);

        script.tick(&mut CreatureApi::new(&mut world, &mut creature));
        assert_eq!(creature.inventory.count(ItemId::APPLE), 2);
        assert_eq!(world.get_block(IVec3::new(16, 12, 16)), BlockId::AIR);
        assert_eq!(world.get_block(IVec3::new(28, 11, 16)), BlockId::APPLE_LEAVES);
    }

    #[test]
    fn hungry_apple_pickers_eat() {
        let mut world = flat_world();
        let mut creature = Creature::with_color(IVec3::new(16, 10, 16), [1, 2, 3]);
        creature.energy = 3;
        creature.inventory.add(ItemId::APPLE, 1);
        let mut rng = fastrand::Rng::with_seed(2);
        let mut script = build_script(ScriptKind::ApplePicker, &mut rng);

        script.tick(&mut CreatureApi::new(&mut world, &mut creature));
        assert_eq!(creature.inventory.count(ItemId::APPLE), 0);
        assert_eq!(creature.energy, 12);
    }
}
