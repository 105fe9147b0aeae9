use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxmere_persist::compression::Compression;
use voxmere_shared::coords::{DEFAULT_BUFFER_RADIUS, MAX_BUFFER_RADIUS};
use voxmere_shared::mesh::MeshStyle;
use voxmere_shared::worldgen::{WorldGenConfig, WorldPreset};

pub const SETTINGS_PATH: &str = "voxmere.toml";
const MIN_BUFFER_RADIUS: usize = 4;
const MAX_CREATURE_COUNT: usize = 256;
const MAX_TICK_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Wanderer,
    #[default]
    ApplePicker,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldSettings,
    pub mesh: MeshStyle,
    pub sim: SimSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub preset: WorldPreset,
    pub seed: Option<u64>,
    /// Fields laid over the preset's generation config.
    pub generation: Option<toml::Table>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// Ticks to run; zero runs until interrupted.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_creature_count")]
    pub creature_count: usize,
    #[serde(default = "default_spawn_x")]
    pub spawn_x: i32,
    #[serde(default = "default_spawn_z")]
    pub spawn_z: i32,
    #[serde(default = "default_buffer_radius")]
    pub buffer_radius: usize,
    #[serde(default)]
    pub script: ScriptKind,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
    #[serde(default)]
    pub compression: Compression,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            creature_count: default_creature_count(),
            spawn_x: default_spawn_x(),
            spawn_z: default_spawn_z(),
            buffer_radius: default_buffer_radius(),
            script: ScriptKind::default(),
            save_path: None,
            compression: Compression::default(),
        }
    }
}

impl WorldSettings {
    /// The preset's config with `generation` overrides and `seed` applied.
    pub fn generation_config(&self) -> io::Result<WorldGenConfig> {
        let mut config = self.preset.base_config();
        if let Some(overrides) = &self.generation {
            let mut merged = toml::Value::try_from(&config).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("failed to serialize generation config: {e}"),
                )
            })?;
            if let toml::Value::Table(table) = &mut merged {
                for (key, value) in overrides {
                    table.insert(key.clone(), value.clone());
                }
            }
            config = merged.try_into().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid [world.generation] override: {e}"),
                )
            })?;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

impl Settings {
    pub fn sanitize(mut self) -> Self {
        self.mesh.sanitize();
        self.sim.buffer_radius = self.sim.buffer_radius.clamp(MIN_BUFFER_RADIUS, MAX_BUFFER_RADIUS);
        self.sim.creature_count = self.sim.creature_count.min(MAX_CREATURE_COUNT);
        self.sim.tick_interval_ms = self.sim.tick_interval_ms.min(MAX_TICK_INTERVAL_MS);
        self
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize settings: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    /// Loads `path`, or the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> io::Result<Self> {
        match Self::load(path) {
            Ok(settings) => Ok(settings),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize settings: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }
}

fn default_ticks() -> u64 {
    0
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_creature_count() -> usize {
    8
}

fn default_spawn_x() -> i32 {
    16
}

fn default_spawn_z() -> i32 {
    20
}

fn default_buffer_radius() -> usize {
    DEFAULT_BUFFER_RADIUS
}
