//! The generational loop
//!
//! Selection and breeding are done by the library's `SimpleGA`, which asks
//! for fitness through an `Evaluator` that must be `Send + Sync`. Episodes
//! may need the window, which is neither, so every generation steps the GA
//! on a scoped worker thread that hands each genome back to the calling
//! thread and waits for its score. Genomes are still scored one at a time.

use std::panic;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use symbios_genetics::algorithms::simple::SimpleGA;
use symbios_genetics::{Evaluator, Evolver, Phenotype};
use symbios_neat::NeatGenome;

use super::GenomeKey;
use super::config::{Config, InitialConnection};
use super::error::NeatError;
use super::reporting::{GenerationSnapshot, Reporter, ReporterSet};

/// Fitness handed to the GA for genomes left unscored after an abort
const ABORTED_FITNESS: f32 = -1.0e6;

/// Assigns a fitness to one genome
pub trait Scorer {
    fn score(
        &mut self,
        generation: usize,
        key: GenomeKey,
        genome: &NeatGenome,
    ) -> Result<f32, NeatError>;
}

impl<F> Scorer for F
where
    F: FnMut(usize, GenomeKey, &NeatGenome) -> Result<f32, NeatError>,
{
    fn score(
        &mut self,
        generation: usize,
        key: GenomeKey,
        genome: &NeatGenome,
    ) -> Result<f32, NeatError> {
        self(generation, key, genome)
    }
}

/// Best genome of a generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Champion {
    pub generation: usize,
    pub key: GenomeKey,
    pub fitness: f32,
    pub genome: NeatGenome,
}

impl Champion {
    /// Node and enabled connection count
    pub fn size(&self) -> (usize, usize) {
        (
            self.genome.nodes.len(),
            self.genome.num_enabled_connections(),
        )
    }
}

/// Worker side of the hand-off: sends a genome, blocks for its fitness
struct Relay {
    channel: Mutex<(Sender<NeatGenome>, Receiver<f32>)>,
    aborted: AtomicBool,
}

impl Relay {
    fn exchange(&self, genome: &NeatGenome) -> Option<f32> {
        if self.aborted.load(Ordering::Relaxed) {
            return None;
        }
        let channel = self.channel.lock().ok()?;
        channel.0.send(genome.clone()).ok()?;
        channel.1.recv().ok()
    }
}

impl Evaluator<NeatGenome> for Relay {
    fn evaluate(&self, genome: &NeatGenome) -> (f32, Vec<f32>, Vec<f32>) {
        let fitness = self.exchange(genome).unwrap_or_else(|| {
            self.aborted.store(true, Ordering::Relaxed);
            ABORTED_FITNESS
        });
        (fitness, vec![fitness], Vec::new())
    }
}

/// Step the GA once, scoring its genomes on this thread
fn step_generation(
    ga: &mut SimpleGA<NeatGenome>,
    generation: usize,
    scorer: &mut dyn Scorer,
) -> Result<(), NeatError> {
    let (genome_tx, genome_rx) = mpsc::channel();
    let (fitness_tx, fitness_rx) = mpsc::channel();
    let relay = Relay {
        channel: Mutex::new((genome_tx, fitness_rx)),
        aborted: AtomicBool::new(false),
    };

    thread::scope(|scope| {
        // the relay, and with it the genome sender, drops when the step ends
        let worker = scope.spawn(move || ga.step(&relay));

        let mut outcome = Ok(());
        for (key, genome) in genome_rx.iter().enumerate() {
            match scorer.score(generation, key, &genome) {
                Ok(fitness) => {
                    if fitness_tx.send(fitness).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        drop(fitness_tx);
        drop(genome_rx);

        if let Err(payload) = worker.join() {
            panic::resume_unwind(payload);
        }
        outcome
    })
}

pub struct Population {
    config: Config,
    ga: SimpleGA<NeatGenome>,
    generation: usize,
    best: Option<Champion>,
    reporters: ReporterSet,
}

impl Population {
    /// Random initial population wired as the config asks
    pub fn new(config: Config, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let initial: Vec<NeatGenome> = (0..config.neat.pop_size)
            .map(|_| match config.initial_connection {
                InitialConnection::Full => {
                    NeatGenome::fully_connected(config.genome.clone(), &mut rng)
                }
                InitialConnection::Unconnected => NeatGenome::minimal(config.genome.clone()),
            })
            .collect();
        let ga = SimpleGA::new(
            initial,
            config.neat.mutation_rate,
            config.neat.elitism,
            seed,
        );
        Self::from_parts(config, 0, ga, None)
    }

    pub(crate) fn from_parts(
        config: Config,
        generation: usize,
        ga: SimpleGA<NeatGenome>,
        best: Option<Champion>,
    ) -> Self {
        Self {
            config,
            ga,
            generation,
            best,
            reporters: ReporterSet::default(),
        }
    }

    pub fn add_reporter(&mut self, reporter: impl Reporter + 'static) {
        self.reporters.add(Box::new(reporter));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn ga(&self) -> &SimpleGA<NeatGenome> {
        &self.ga
    }

    /// Current members with the fitness of their last evaluation
    pub fn members(&mut self) -> &[Phenotype<NeatGenome>] {
        self.ga.population()
    }

    /// Number of generations evaluated so far, which is also the number the
    /// next generation will be evaluated as
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn best(&self) -> Option<&Champion> {
        self.best.as_ref()
    }

    /// Evolve for up to `generations` generations, or until the fitness
    /// criterion reaches the threshold when `generations` is `None`.
    ///
    /// Returns the best genome seen; `None` only if no generation ran.
    pub fn run(
        &mut self,
        scorer: &mut dyn Scorer,
        generations: Option<usize>,
    ) -> Result<Option<Champion>, NeatError> {
        if self.config.neat.no_fitness_termination && generations.is_none() {
            return Err(NeatError::NoTermination);
        }

        let mut completed = 0;
        while generations.is_none_or(|n| completed < n) {
            completed += 1;
            self.reporters.start_generation(self.generation);

            step_generation(&mut self.ga, self.generation, scorer)?;

            let members = self.ga.population();
            let Some((key, best)) = members
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.fitness.total_cmp(&b.fitness))
            else {
                break;
            };
            let champion = Champion {
                generation: self.generation,
                key,
                fitness: best.fitness,
                genome: best.genotype.clone(),
            };
            self.reporters
                .post_evaluate(&self.config, self.generation, members, &champion);
            let fitnesses: Vec<f32> = members.iter().map(|m| m.fitness).collect();

            if self
                .best
                .as_ref()
                .is_none_or(|b| champion.fitness > b.fitness)
            {
                self.best = Some(champion.clone());
            }
            let neat = &self.config.neat;
            let solved = !neat.no_fitness_termination
                && neat.fitness_criterion.apply(&fitnesses) >= neat.fitness_threshold;

            let snapshot = GenerationSnapshot {
                config: &self.config,
                generation: self.generation,
                ga: &self.ga,
                best: self.best.as_ref(),
            };
            self.reporters.end_generation(&snapshot)?;
            self.generation += 1;

            if solved {
                self.reporters.found_solution(champion.generation, &champion);
                break;
            }
        }

        if self.config.neat.no_fitness_termination {
            if let Some(best) = &self.best {
                self.reporters.found_solution(best.generation, best);
            }
        }

        Ok(self.best.clone())
    }
}
