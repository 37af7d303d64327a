//! Application settings and preferences
//!
//! Persisted as JSON next to the executable's working directory, separate
//! from the NEAT config file which keeps its own INI layout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fitness::FitnessRules;

/// Default settings file
pub const SETTINGS_FILE: &str = "breakout_settings.json";

const MAX_SIM_SPEED: u32 = 64;

/// Double or halve a ticks-per-frame multiplier
pub fn step_sim_speed(speed: u32, faster: bool) -> u32 {
    if faster {
        speed.saturating_mul(2).clamp(1, MAX_SIM_SPEED)
    } else {
        (speed / 2).max(1)
    }
}

/// Launcher and training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === NEAT ===
    /// Path to the NEAT INI config
    pub neat_config_path: PathBuf,
    /// Directory under which `checkpoints_<unix-seconds>/` runs are created
    pub checkpoint_root: PathBuf,
    /// Save a checkpoint every N generations
    pub checkpoint_interval: usize,
    /// Seed for the population RNG; `None` picks one from the clock
    pub seed: Option<u64>,

    // === Episodes ===
    /// Evaluate genomes without opening a window
    pub headless: bool,
    /// Hard cap on episode length in ticks (0 disables)
    pub max_episode_ticks: u64,
    /// Simulation ticks per rendered frame while watching training
    pub sim_speed: u32,

    // === Scoring ===
    pub fitness: FitnessRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            neat_config_path: PathBuf::from("NeatConf.txt"),
            checkpoint_root: PathBuf::from("."),
            checkpoint_interval: 1,
            seed: None,

            headless: false,
            // ten simulated minutes
            max_episode_ticks: 120_000,
            sim_speed: 1,

            fitness: FitnessRules::default(),
        }
    }
}

impl Settings {
    /// Tick limit for episodes, `None` when unlimited
    pub fn episode_tick_limit(&self) -> Option<u64> {
        (self.max_episode_ticks > 0).then_some(self.max_episode_ticks)
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring invalid settings in {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
