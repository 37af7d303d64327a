//! Population snapshots on disk
//!
//! A checkpoint is a versioned JSON document holding the config text, the GA
//! state the next generation is bred from and the best genome so far.
//! Restoring one yields a population that continues exactly where training
//! stopped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use symbios_genetics::algorithms::simple::SimpleGA;
use symbios_neat::NeatGenome;

use super::config::Config;
use super::error::{CheckpointError, NeatError};
use super::population::{Champion, Population};
use super::reporting::{GenerationSnapshot, Reporter};

pub const CHECKPOINT_VERSION: u32 = 2;

/// Default file name prefix, followed by the generation number
pub const CHECKPOINT_PREFIX: &str = "checkpoint_generation_";

#[derive(Serialize)]
struct CheckpointRef<'a> {
    version: u32,
    generation: usize,
    config: String,
    ga: &'a SimpleGA<NeatGenome>,
    best: Option<&'a Champion>,
}

#[derive(Deserialize)]
struct CheckpointFile {
    version: u32,
    /// Generation the stored population will be evaluated as
    generation: usize,
    config: String,
    ga: SimpleGA<NeatGenome>,
    best: Option<Champion>,
}

/// Write the state captured in `snapshot` to `path`
pub fn save_checkpoint(
    path: &Path,
    snapshot: &GenerationSnapshot<'_>,
) -> Result<(), CheckpointError> {
    let file = CheckpointRef {
        version: CHECKPOINT_VERSION,
        generation: snapshot.generation + 1,
        config: snapshot.config.to_string(),
        ga: snapshot.ga,
        best: snapshot.best,
    };
    let json = serde_json::to_string(&file).map_err(|source| CheckpointError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    // write next to the target, then swap in
    let tmp = path.with_extension("tmp");
    let io_err = |source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    log::info!("Saving checkpoint to {}", path.display());
    Ok(())
}

/// Rebuild a population from a checkpoint file
pub fn restore_checkpoint(path: &Path) -> Result<Population, CheckpointError> {
    let text = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CheckpointFile =
        serde_json::from_str(&text).map_err(|source| CheckpointError::Format {
            path: path.to_path_buf(),
            source,
        })?;
    if file.version != CHECKPOINT_VERSION {
        return Err(CheckpointError::Version {
            found: file.version,
            expected: CHECKPOINT_VERSION,
        });
    }
    let config: Config = file.config.parse()?;
    log::info!(
        "Restored generation {} from {}",
        file.generation,
        path.display()
    );
    Ok(Population::from_parts(
        config,
        file.generation,
        file.ga,
        file.best,
    ))
}

/// Saves a checkpoint every `generation_interval` generations
pub struct Checkpointer {
    generation_interval: usize,
    dir: PathBuf,
    prefix: String,
    last_checkpoint: Option<usize>,
}

impl Checkpointer {
    pub fn new(generation_interval: usize, dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            generation_interval: generation_interval.max(1),
            dir,
            prefix: prefix.into(),
            last_checkpoint: None,
        }
    }

    pub fn path_for(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("{}{generation}", self.prefix))
    }
}

impl Reporter for Checkpointer {
    fn end_generation(&mut self, snapshot: &GenerationSnapshot<'_>) -> Result<(), NeatError> {
        let since = snapshot.generation + 1 - self.last_checkpoint.map_or(0, |g| g + 1);
        if since < self.generation_interval {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|source| CheckpointError::Io {
            path: self.dir.clone(),
            source,
        })?;
        save_checkpoint(&self.path_for(snapshot.generation), snapshot)?;
        self.last_checkpoint = Some(snapshot.generation);
        Ok(())
    }
}
