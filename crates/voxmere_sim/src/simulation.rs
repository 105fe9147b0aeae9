use glam::IVec3;
use tracing::{debug, info, warn};
use voxmere_shared::api::{CreatureApi, CreatureScript};
use voxmere_shared::creature::Creature;
use voxmere_shared::store::ChunkStore;

use crate::scripts::build_script;
use crate::settings::ScriptKind;

struct Agent {
    id: u32,
    creature: Creature,
    script: Box<dyn CreatureScript>,
}

/// The world plus every living creature and the script driving it.
pub struct Simulation {
    world: ChunkStore,
    agents: Vec<Agent>,
    next_id: u32,
    tick: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub alive: usize,
    /// Ids of creatures removed at the end of this tick.
    pub died: Vec<u32>,
}

impl Simulation {
    pub fn new(world: ChunkStore) -> Self {
        Self {
            world,
            agents: Vec::new(),
            next_id: 0,
            tick: 0,
        }
    }

    pub fn world(&self) -> &ChunkStore {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn creature_count(&self) -> usize {
        self.agents.len()
    }

    pub fn creatures(&self) -> impl Iterator<Item = (u32, &Creature)> {
        self.agents.iter().map(|agent| (agent.id, &agent.creature))
    }

    pub fn add_creature(&mut self, creature: Creature, script: Box<dyn CreatureScript>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.agents.push(Agent {
            id,
            creature,
            script,
        });
        id
    }

    /// Places up to `count` creatures on the surface along `x = sx..sx + count`
    /// at `z = sz`. Columns with no surface are skipped.
    pub fn spawn_row(
        &mut self,
        sx: i32,
        sz: i32,
        count: usize,
        kind: ScriptKind,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let mut spawned = 0;
        for x in (sx..).take(count) {
            let Some(y) = self.world.surface_height(x, sz) else {
                warn!("no surface at ({}, {}); skipping spawn", x, sz);
                continue;
            };
            let rgb = [rng.u8(..), rng.u8(..), rng.u8(..)];
            let creature = Creature::with_color(IVec3::new(x, y, sz), rgb);
            self.add_creature(creature, build_script(kind, rng));
            spawned += 1;
        }
        info!("Spawned {} {:?} creatures", spawned, kind);
        spawned
    }

    /// Runs every script once, then resets moves and removes dead creatures.
    pub fn tick(&mut self) -> TickReport {
        for agent in &mut self.agents {
            let mut api = CreatureApi::new(&mut self.world, &mut agent.creature);
            agent.script.tick(&mut api);
        }

        let mut died = Vec::new();
        self.agents.retain_mut(|agent| {
            if agent.creature.end_tick() {
                info!(
                    "Creature {} died at {:?} holding {:?}",
                    agent.id,
                    agent.creature.location,
                    agent.creature.inventory.snapshot()
                );
                died.push(agent.id);
                false
            } else {
                true
            }
        });

        self.tick += 1;
        debug!("tick {}: {} alive", self.tick, self.agents.len());
        TickReport {
            tick: self.tick,
            alive: self.agents.len(),
            died,
        }
    }
}
