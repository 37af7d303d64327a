//! Progress reporters attached to a population

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use symbios_genetics::Phenotype;
use symbios_genetics::algorithms::simple::SimpleGA;
use symbios_neat::NeatGenome;

use super::config::Config;
use super::error::NeatError;
use super::population::Champion;

/// Everything a reporter may look at once a generation is finished
pub struct GenerationSnapshot<'a> {
    pub config: &'a Config,
    /// Generation that was just evaluated
    pub generation: usize,
    /// GA state the next generation will be bred from
    pub ga: &'a SimpleGA<NeatGenome>,
    pub best: Option<&'a Champion>,
}

#[allow(unused_variables)]
pub trait Reporter {
    fn start_generation(&mut self, generation: usize) {}

    fn post_evaluate(
        &mut self,
        config: &Config,
        generation: usize,
        members: &[Phenotype<NeatGenome>],
        best: &Champion,
    ) {
    }

    fn end_generation(&mut self, snapshot: &GenerationSnapshot<'_>) -> Result<(), NeatError> {
        Ok(())
    }

    fn found_solution(&mut self, generation: usize, best: &Champion) {}
}

/// Fan-out to every attached reporter
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterSet {
    pub fn add(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn start_generation(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.start_generation(generation);
        }
    }

    pub fn post_evaluate(
        &mut self,
        config: &Config,
        generation: usize,
        members: &[Phenotype<NeatGenome>],
        best: &Champion,
    ) {
        for r in &mut self.reporters {
            r.post_evaluate(config, generation, members, best);
        }
    }

    pub fn end_generation(&mut self, snapshot: &GenerationSnapshot<'_>) -> Result<(), NeatError> {
        for r in &mut self.reporters {
            r.end_generation(snapshot)?;
        }
        Ok(())
    }

    pub fn found_solution(&mut self, generation: usize, best: &Champion) {
        for r in &mut self.reporters {
            r.found_solution(generation, best);
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn stdev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32).sqrt()
}

fn fitnesses(members: &[Phenotype<NeatGenome>]) -> Vec<f32> {
    members.iter().map(|m| m.fitness).collect()
}

/// Writes progress through the `log` facade
pub struct LogReporter {
    show_detail: bool,
    generation_start: Option<Instant>,
    generation_times: Vec<f64>,
}

impl LogReporter {
    pub fn new(show_detail: bool) -> Self {
        Self {
            show_detail,
            generation_start: None,
            generation_times: Vec::new(),
        }
    }
}

impl Reporter for LogReporter {
    fn start_generation(&mut self, generation: usize) {
        self.generation_start = Some(Instant::now());
        log::info!("****** Running generation {generation} ******");
    }

    fn post_evaluate(
        &mut self,
        _config: &Config,
        _generation: usize,
        members: &[Phenotype<NeatGenome>],
        best: &Champion,
    ) {
        let fitnesses = fitnesses(members);
        log::info!(
            "Population's average fitness: {:.5} stdev: {:.5}",
            mean(&fitnesses),
            stdev(&fitnesses)
        );
        log::info!(
            "Best fitness: {:.5} - size: {:?} - id {}",
            best.fitness,
            best.size(),
            best.key
        );
        if self.show_detail {
            let hidden = best.genome.hidden_ids().len();
            log::info!(
                "Best genome: {hidden} hidden nodes, {} of {} connections enabled",
                best.genome.num_enabled_connections(),
                best.genome.connections.len()
            );
        }
    }

    fn end_generation(&mut self, snapshot: &GenerationSnapshot<'_>) -> Result<(), NeatError> {
        if let Some(best) = snapshot.best {
            log::info!(
                "Best so far: {:.5} from generation {}",
                best.fitness,
                best.generation
            );
        }
        if let Some(start) = self.generation_start.take() {
            let elapsed = start.elapsed().as_secs_f64();
            self.generation_times.push(elapsed);
            let recent = &self.generation_times[self.generation_times.len().saturating_sub(10)..];
            let average = recent.iter().sum::<f64>() / recent.len() as f64;
            log::info!("Generation time: {elapsed:.3} sec ({average:.3} average)");
        }
        Ok(())
    }

    fn found_solution(&mut self, generation: usize, best: &Champion) {
        log::info!(
            "Best individual in generation {generation} meets fitness threshold - complexity: {:?}",
            best.size()
        );
    }
}

/// One row of the statistics table
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f32,
    pub mean_fitness: f32,
    pub stdev_fitness: f32,
    pub best_nodes: usize,
    pub best_connections: usize,
}

/// Keeps per-generation fitness statistics and writes them as CSV
pub struct StatisticsReporter {
    rows: Vec<GenerationStats>,
    most_fit: Vec<Champion>,
    csv_path: Option<PathBuf>,
}

impl StatisticsReporter {
    pub fn new(csv_path: Option<PathBuf>) -> Self {
        Self {
            rows: Vec::new(),
            most_fit: Vec::new(),
            csv_path,
        }
    }

    pub fn rows(&self) -> &[GenerationStats] {
        &self.rows
    }

    /// Best genome seen in any generation
    pub fn best_genome(&self) -> Option<&Champion> {
        self.most_fit
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "generation,best_fitness,mean_fitness,stdev_fitness,best_nodes,best_connections\n",
        );
        for row in &self.rows {
            out.push_str(&format!(
                "{},{:.6},{:.6},{:.6},{},{}\n",
                row.generation,
                row.best_fitness,
                row.mean_fitness,
                row.stdev_fitness,
                row.best_nodes,
                row.best_connections
            ));
        }
        out
    }
}

impl Reporter for StatisticsReporter {
    fn post_evaluate(
        &mut self,
        _config: &Config,
        generation: usize,
        members: &[Phenotype<NeatGenome>],
        best: &Champion,
    ) {
        let fitnesses = fitnesses(members);
        let (best_nodes, best_connections) = best.size();
        self.rows.push(GenerationStats {
            generation,
            best_fitness: best.fitness,
            mean_fitness: mean(&fitnesses),
            stdev_fitness: stdev(&fitnesses),
            best_nodes,
            best_connections,
        });
        self.most_fit.push(best.clone());
    }

    fn end_generation(&mut self, _snapshot: &GenerationSnapshot<'_>) -> Result<(), NeatError> {
        let Some(path) = &self.csv_path else {
            return Ok(());
        };
        fs::write(path, self.to_csv()).map_err(|source| NeatError::Report {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::sample;
    use crate::neat::population::Population;

    fn member(genome: &NeatGenome, fitness: f32) -> Phenotype<NeatGenome> {
        Phenotype {
            genotype: genome.clone(),
            fitness,
            objectives: vec![fitness],
            descriptor: Vec::new(),
        }
    }

    #[test]
    fn test_mean_and_stdev() {
        assert_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 5.0);
        assert_eq!(stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(stdev(&[]), 0.0);
    }

    #[test]
    fn test_statistics_rows_and_csv() {
        let config = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let mut stats = StatisticsReporter::new(Some(path.clone()));

        let genome = NeatGenome::minimal(config.genome.clone());
        let members = [member(&genome, 1.0), member(&genome, 3.0)];
        let best = Champion {
            generation: 4,
            key: 1,
            fitness: 3.0,
            genome: genome.clone(),
        };
        stats.post_evaluate(&config, 4, &members, &best);

        let population = Population::new(config.clone(), 1);
        let snapshot = GenerationSnapshot {
            config: &config,
            generation: 4,
            ga: population.ga(),
            best: Some(&best),
        };
        stats.end_generation(&snapshot).unwrap();

        assert_eq!(stats.rows().len(), 1);
        assert_eq!(stats.rows()[0].mean_fitness, 2.0);
        assert_eq!(stats.best_genome().map(|g| g.key), Some(1));
        let csv = fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("generation,best_fitness"));
        // 4 inputs, 3 outputs and the bias node, nothing wired
        assert_eq!(lines.next().unwrap(), "4,3.000000,2.000000,1.000000,8,0");
    }
}
