use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems reading or validating a NEAT configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected `key = value` or `[section]`, found `{text}`")]
    Syntax { line: usize, text: String },
    #[error("missing section [{0}]")]
    MissingSection(String),
    #[error("[{section}] missing required key `{key}`")]
    MissingKey { section: String, key: String },
    #[error("[{section}] {key} = {value}: expected {expected}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        expected: String,
    },
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}

/// Problems writing or restoring a population snapshot
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("checkpoint {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("checkpoint format version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("checkpoint carries an invalid config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum NeatError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("no generation limit given while no_fitness_termination is set")]
    NoTermination,
    #[error("evaluation interrupted")]
    Interrupted,
    #[error("failed to write {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
