//! NEAT training glue
//!
//! Genomes, mutation, crossover and network evaluation come from
//! `symbios-neat`; selection and breeding from the `SimpleGA` of
//! `symbios-genetics`. This module reads the INI config into the library's
//! settings, drives one generation at a time, reports progress and writes
//! checkpoints and network diagrams.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod params;
pub mod population;
pub mod reporting;
pub mod visualize;

/// Position of a genome within the generation being evaluated
pub type GenomeKey = usize;

pub use checkpoint::{CHECKPOINT_PREFIX, Checkpointer, restore_checkpoint, save_checkpoint};
pub use config::Config;
pub use error::{CheckpointError, ConfigError, NeatError};
pub use population::{Champion, Population, Scorer};
pub use reporting::{LogReporter, Reporter, StatisticsReporter};
pub use visualize::{DotOptions, PinNames, SchemeReporter, genome_to_dot};

pub use symbios_neat::{NeatConfig, NeatGenome};
