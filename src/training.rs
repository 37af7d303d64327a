//! Training orchestration
//!
//! Connects the NEAT population to the game: every genome of a generation
//! drives the paddle for one episode and receives the episode's fitness.
//! Episodes run one after another, either headless or through a window
//! supplied by the caller as an [`EpisodeRunner`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::agent::{NUM_ACTIONS, NUM_FEATURES, NetworkController};
use crate::episode::{Episode, EpisodeEnd};
use crate::fitness::FitnessRules;
use crate::neat::{
    CHECKPOINT_PREFIX, Champion, Checkpointer, Config, ConfigError, GenomeKey, LogReporter,
    NeatError, NeatGenome, PinNames, Population, SchemeReporter, Scorer, StatisticsReporter,
    restore_checkpoint,
};
use crate::settings::Settings;

/// File name of the per-run statistics table
pub const STATS_FILE: &str = "fitness_stats.csv";
/// Directory receiving `winner_<generation>.dot`
pub const SCHEMES_DIR: &str = "neuro_schemes";

/// Plays one episode to its end
pub trait EpisodeRunner {
    /// Returns [`NeatError::Interrupted`] when the user aborts the run
    fn run_episode(
        &mut self,
        episode: &mut Episode,
        generation: usize,
        genome: GenomeKey,
    ) -> Result<EpisodeEnd, NeatError>;
}

/// Steps episodes as fast as possible without a window
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessRunner;

impl EpisodeRunner for HeadlessRunner {
    fn run_episode(
        &mut self,
        episode: &mut Episode,
        _generation: usize,
        _genome: GenomeKey,
    ) -> Result<EpisodeEnd, NeatError> {
        Ok(episode.run_headless())
    }
}

/// Human-readable names of the network pins, used in DOT output
pub fn pin_names() -> PinNames {
    PinNames::new(
        &[
            "ball X",
            "ball Y",
            "X difference ball/paddle",
            "Y difference ball/paddle",
        ],
        &["move left", "stay", "move right"],
    )
}

/// The game feeds 4 inputs and reads 3 outputs
pub fn check_config(config: &Config) -> Result<(), ConfigError> {
    let genome = &config.genome;
    if genome.num_inputs != NUM_FEATURES || genome.num_outputs != NUM_ACTIONS {
        return Err(ConfigError::Unsupported(format!(
            "breakout needs num_inputs = {NUM_FEATURES} and num_outputs = {NUM_ACTIONS}, \
             config has {} and {}",
            genome.num_inputs, genome.num_outputs
        )));
    }
    Ok(())
}

/// Seed shared by every episode of one generation
pub fn episode_seed(base: u64, generation: usize) -> u64 {
    base.wrapping_add((generation as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Create `checkpoints_<stamp>` under `root`, adding `_1`, `_2`, ... when a
/// run started in the same second already owns the name
pub fn create_run_dir(root: &Path, stamp: u64) -> io::Result<PathBuf> {
    fs::create_dir_all(root)?;
    let mut attempt = 0;
    loop {
        let name = match attempt {
            0 => format!("checkpoints_{stamp}"),
            n => format!("checkpoints_{stamp}_{n}"),
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Scores genomes by letting each play one episode in turn
pub struct BreakoutEvaluator<'a> {
    runner: &'a mut dyn EpisodeRunner,
    rules: FitnessRules,
    max_ticks: Option<u64>,
    seed: u64,
}

impl<'a> BreakoutEvaluator<'a> {
    pub fn new(runner: &'a mut dyn EpisodeRunner, settings: &Settings, seed: u64) -> Self {
        Self {
            runner,
            rules: settings.fitness,
            max_ticks: settings.episode_tick_limit(),
            seed,
        }
    }
}

impl Scorer for BreakoutEvaluator<'_> {
    fn score(
        &mut self,
        generation: usize,
        key: GenomeKey,
        genome: &NeatGenome,
    ) -> Result<f32, NeatError> {
        let seed = episode_seed(self.seed, generation);
        let controller = NetworkController::from_genome(genome, key);
        let mut episode = Episode::new(seed, Box::new(controller), self.rules, self.max_ticks);
        let end = self.runner.run_episode(&mut episode, generation, key)?;
        log::debug!(
            "genome {key}: {:?}, {} bricks, fitness {:.3}",
            end.reason,
            end.bricks,
            end.fitness
        );
        Ok(end.fitness as f32)
    }
}

/// Result of a training or replay run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Directory holding checkpoints and statistics, if any were written
    pub run_dir: Option<PathBuf>,
    pub best: Option<Champion>,
    /// Next generation number the population would evaluate
    pub generation: usize,
}

/// Evolve a fresh population from the config at `config_path`
///
/// Checkpoints, statistics and network schemes go to a fresh
/// `checkpoints_<unix-seconds>/` under the settings' checkpoint root. Runs
/// until the fitness criterion is met, or for `generations` generations when
/// given.
pub fn run_learning(
    config_path: &Path,
    settings: &Settings,
    runner: &mut dyn EpisodeRunner,
    generations: Option<usize>,
) -> Result<TrainingOutcome, NeatError> {
    let config = Config::load(config_path)?;
    check_config(&config)?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let run_dir =
        create_run_dir(&settings.checkpoint_root, stamp).map_err(|source| NeatError::Report {
            path: settings.checkpoint_root.clone(),
            source,
        })?;

    let seed = settings.seed.unwrap_or_else(clock_seed);
    log::info!(
        "Training from {} (seed {seed}), writing to {}",
        config_path.display(),
        run_dir.display()
    );

    let mut population = Population::new(config, seed);
    population.add_reporter(LogReporter::new(true));
    population.add_reporter(StatisticsReporter::new(Some(run_dir.join(STATS_FILE))));
    population.add_reporter(Checkpointer::new(
        settings.checkpoint_interval,
        run_dir.clone(),
        CHECKPOINT_PREFIX,
    ));
    population.add_reporter(SchemeReporter::new(run_dir.join(SCHEMES_DIR), pin_names()));

    let mut evaluator = BreakoutEvaluator::new(runner, settings, seed);
    let best = population.run(&mut evaluator, generations)?;
    if let Some(best) = &best {
        log::info!(
            "Best genome {} of generation {} with fitness {:.3}",
            best.key,
            best.generation,
            best.fitness
        );
    }
    Ok(TrainingOutcome {
        run_dir: Some(run_dir),
        best,
        generation: population.generation(),
    })
}

/// Restore a checkpoint and evaluate exactly one generation of it
pub fn run_generation_checkpoint(
    path: &Path,
    settings: &Settings,
    runner: &mut dyn EpisodeRunner,
) -> Result<TrainingOutcome, NeatError> {
    let mut population = restore_checkpoint(path)?;
    check_config(population.config())?;
    population.add_reporter(LogReporter::new(true));
    population.add_reporter(StatisticsReporter::new(None));

    let seed = settings.seed.unwrap_or_else(clock_seed);
    let mut evaluator = BreakoutEvaluator::new(runner, settings, seed);
    let best = population.run(&mut evaluator, Some(1))?;
    Ok(TrainingOutcome {
        run_dir: None,
        best,
        generation: population.generation(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::{SAMPLE, sample};
    use crate::sim::EndReason;

    fn quick_settings(root: &Path) -> Settings {
        Settings {
            checkpoint_root: root.to_path_buf(),
            max_episode_ticks: 50,
            seed: Some(5),
            headless: true,
            ..Settings::default()
        }
    }

    /// Counts episodes and aborts after a fixed number
    struct Quitter {
        played: usize,
        limit: usize,
    }

    impl EpisodeRunner for Quitter {
        fn run_episode(
            &mut self,
            episode: &mut Episode,
            _generation: usize,
            _genome: GenomeKey,
        ) -> Result<EpisodeEnd, NeatError> {
            if self.played == self.limit {
                return Err(NeatError::Interrupted);
            }
            self.played += 1;
            Ok(episode.end(EndReason::Quit))
        }
    }

    #[test]
    fn test_evaluator_scores_every_genome() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quick_settings(dir.path());
        let mut population = Population::new(sample(), 1);
        let mut runner = HeadlessRunner;
        let mut evaluator = BreakoutEvaluator::new(&mut runner, &settings, 3);
        let genome = population.members()[0].genotype.clone();
        assert!(evaluator.score(0, 0, &genome).unwrap() >= -10.0);

        // the population itself accepts the evaluator too
        assert!(population.run(&mut evaluator, Some(1)).unwrap().is_some());
        assert!(population.members().iter().all(|m| m.fitness >= -10.0));
    }

    #[test]
    fn test_same_generation_replays_same_episode() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quick_settings(dir.path());
        let mut population = Population::new(sample(), 1);
        let genome = population.members()[0].genotype.clone();
        let mut runner = HeadlessRunner;
        let mut evaluator = BreakoutEvaluator::new(&mut runner, &settings, 3);
        let first = evaluator.score(4, 0, &genome).unwrap();
        assert_eq!(evaluator.score(4, 9, &genome).unwrap(), first);
    }

    #[test]
    fn test_wrong_pin_count_is_rejected() {
        let config = sample().with_value("DefaultGenome", "num_inputs", "5").unwrap();
        assert!(matches!(check_config(&config), Err(ConfigError::Unsupported(_))));
        assert!(check_config(&sample()).is_ok());
    }

    #[test]
    fn test_interrupt_stops_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quick_settings(dir.path());
        let mut runner = Quitter { played: 0, limit: 3 };
        let mut population = Population::new(sample(), 2);
        let mut evaluator = BreakoutEvaluator::new(&mut runner, &settings, 0);
        assert!(matches!(
            population.run(&mut evaluator, Some(1)),
            Err(NeatError::Interrupted)
        ));
        assert_eq!(runner.played, 3);
    }

    #[test]
    fn test_learning_writes_artifacts_and_replays() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("NeatConf.txt");
        fs::write(&config_path, SAMPLE).unwrap();
        let settings = quick_settings(dir.path());

        let outcome =
            run_learning(&config_path, &settings, &mut HeadlessRunner, Some(2)).unwrap();
        assert_eq!(outcome.generation, 2);
        assert!(outcome.best.is_some());
        let run_dir = outcome.run_dir.unwrap();
        assert!(run_dir.join(STATS_FILE).exists());
        let checkpoint = run_dir.join("checkpoint_generation_1");
        assert!(checkpoint.exists());
        assert!(run_dir.join(SCHEMES_DIR).join("winner_0.dot").exists());
        assert!(run_dir.join(SCHEMES_DIR).join("winner_1.dot").exists());
        assert!(!dir.path().join(SCHEMES_DIR).exists());

        let replay =
            run_generation_checkpoint(&checkpoint, &settings, &mut HeadlessRunner).unwrap();
        assert_eq!(replay.generation, 3);
        assert!(replay.run_dir.is_none());
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quick_settings(dir.path());
        let result = run_learning(
            &dir.path().join("absent.txt"),
            &settings,
            &mut HeadlessRunner,
            Some(1),
        );
        assert!(matches!(result, Err(NeatError::Config(ConfigError::Io { .. }))));
    }

    #[test]
    fn test_bundled_config_fits_the_game() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("NeatConf.txt");
        let config = Config::load(&path).unwrap();
        check_config(&config).unwrap();
        assert_eq!(config.neat.pop_size, 50);
        assert!(config.neat.elitism < config.neat.pop_size);
    }

    #[test]
    fn test_generation_seed_is_shared_and_varies() {
        assert_eq!(episode_seed(4, 0), 4);
        assert_ne!(episode_seed(4, 1), episode_seed(4, 2));
    }

    #[test]
    fn test_pin_names_cover_all_pins() {
        let names = pin_names();
        let config = sample().genome;
        assert_eq!(names.inputs.len(), config.num_inputs);
        assert_eq!(names.outputs.len(), config.num_outputs);
    }

    #[test]
    fn test_run_dirs_in_the_same_second_differ() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_run_dir(dir.path(), 1_700_000_000).unwrap();
        let second = create_run_dir(dir.path(), 1_700_000_000).unwrap();
        let third = create_run_dir(dir.path(), 1_700_000_000).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, dir.path().join("checkpoints_1700000000"));
        assert_eq!(second, dir.path().join("checkpoints_1700000000_1"));
        assert_eq!(third, dir.path().join("checkpoints_1700000000_2"));
        assert!(second.is_dir());
    }

    #[test]
    fn test_back_to_back_runs_keep_their_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("NeatConf.txt");
        fs::write(&config_path, SAMPLE).unwrap();
        let settings = quick_settings(dir.path());

        let a = run_learning(&config_path, &settings, &mut HeadlessRunner, Some(1)).unwrap();
        let b = run_learning(&config_path, &settings, &mut HeadlessRunner, Some(1)).unwrap();
        let (a, b) = (a.run_dir.unwrap(), b.run_dir.unwrap());
        assert_ne!(a, b);
        for run_dir in [a, b] {
            assert!(run_dir.join("checkpoint_generation_0").exists());
            assert!(run_dir.join(SCHEMES_DIR).join("winner_0.dot").exists());
        }
    }
}
