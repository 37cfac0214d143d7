//! Generational genetic search over mixtures.
//!
//! A run seeds a random population, then repeatedly ranks it, assigns
//! breeding weights to the best `breed_fraction`, and replaces it with the
//! same number of offspring bred by crossover and mutation. The best
//! individual ever seen is kept as a snapshot, so the reported fitness never
//! gets worse from one generation to the next.

use crate::error::MixError;
use crate::mixture::Mixture;
use crate::pigment::{Palette, Target};
use crate::population::{
    assign_breed_counts, breeding_pool_size, rank, BreedingTable, Individual,
};
use crate::prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Default probability that an offspring gets one random mutation.
pub const DEFAULT_MUTATION_RATE: f64 = 0.75;
/// Default share of the ranked population allowed to breed.
pub const DEFAULT_BREED_FRACTION: f64 = 0.6;
/// Default number of individuals per generation.
pub const DEFAULT_POPULATION_SIZE: usize = 5000;
/// Default generation limit.
pub const DEFAULT_MAX_GENERATIONS: usize = 100;
/// Default fitness below which a run stops early.
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 0.5;

/// Generations without improvement tolerated before escalating.
const PATIENCE: u32 = 10;
/// Patience granted after an escalation.
const ESCALATED_PATIENCE: u32 = 20;
/// Ceiling on the escalated mutation rate, as a multiple of the initial rate.
const MAX_RATE_FACTOR: f64 = 100.0;

/// Tunables for one genetic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub breed_fraction: f64,
    pub mutation_rate: f64,
    pub max_generations: usize,
    pub convergence_epsilon: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            breed_fraction: DEFAULT_BREED_FRACTION,
            mutation_rate: DEFAULT_MUTATION_RATE,
            max_generations: DEFAULT_MAX_GENERATIONS,
            convergence_epsilon: DEFAULT_CONVERGENCE_EPSILON,
        }
    }
}

impl GeneticConfig {
    /// Rejects settings that would leave the search without a breeding pool.
    pub fn validate(&self) -> Result<(), MixError> {
        if self.population_size < 3 {
            return Err(MixError::InvalidConfig(format!(
                "population_size must be at least 3, got {}",
                self.population_size
            )));
        }
        if !(self.breed_fraction > 0.0 && self.breed_fraction < 1.0) {
            return Err(MixError::InvalidConfig(format!(
                "breed_fraction must be in (0, 1), got {}",
                self.breed_fraction
            )));
        }
        let pool = breeding_pool_size(self.population_size, self.breed_fraction);
        if pool == 0 || pool >= self.population_size {
            return Err(MixError::InvalidConfig(format!(
                "breeding pool of {pool} is empty or covers the whole population of {}",
                self.population_size
            )));
        }
        if !self.mutation_rate.is_finite() || self.mutation_rate < 0.0 {
            return Err(MixError::InvalidConfig(format!(
                "mutation_rate must be a non-negative number, got {}",
                self.mutation_rate
            )));
        }
        if self.convergence_epsilon.is_nan() {
            return Err(MixError::InvalidConfig(
                "convergence_epsilon must be a number".into(),
            ));
        }
        Ok(())
    }
}

/// What the stagnation controller did after a generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StagnationEvent {
    /// Best-so-far improved; counter and rate reset.
    Improved,
    /// No improvement; `remaining` generations until escalation.
    Waiting { remaining: u32 },
    /// Patience ran out; the mutation rate was raised to `rate`.
    Escalated { rate: f64 },
}

/// Adapts the mutation rate when the search stops improving.
///
/// Starts with a patience of 10 generations. Each generation that fails to
/// beat the best-so-far fitness uses up one; when none is left the mutation
/// rate doubles (capped at 100x the initial rate) and patience resets to 20.
/// Any improvement restores the initial rate and a patience of 10.
#[derive(Debug, Clone, PartialEq)]
pub struct StagnationControl {
    initial_rate: f64,
    rate: f64,
    remaining: u32,
}

impl StagnationControl {
    pub fn new(initial_rate: f64) -> Self {
        Self {
            initial_rate,
            rate: initial_rate,
            remaining: PATIENCE,
        }
    }

    /// Current mutation rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Generations left before the next escalation.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Records one generation's outcome.
    ///
    /// `improved` means the generation beat the best-so-far fitness. A
    /// generation whose best individual differs from the last one but scores
    /// no better still counts as unchanged and spends patience.
    pub fn observe(&mut self, improved: bool) -> StagnationEvent {
        if improved {
            self.rate = self.initial_rate;
            self.remaining = PATIENCE;
            return StagnationEvent::Improved;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return StagnationEvent::Waiting {
                remaining: self.remaining,
            };
        }
        self.rate = (self.rate * 2.0).min(self.initial_rate * MAX_RATE_FACTOR);
        self.remaining = ESCALATED_PATIENCE;
        StagnationEvent::Escalated { rate: self.rate }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Best individual seen over the whole run.
    pub best: Individual,
    /// Generations bred after seeding.
    pub generations: usize,
    /// Whether the run stopped because the best fitness fell below epsilon.
    pub converged: bool,
}

/// Per-generation summary returned by [`GeneticOptimizer::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub generation: usize,
    /// Fitness of the best offspring in this generation.
    pub generation_best: f64,
    /// Best fitness seen so far, including this generation.
    pub best_so_far: f64,
    pub stagnation: StagnationEvent,
}

/// A genetic search toward one target over one palette.
#[derive(Debug, Clone)]
pub struct GeneticOptimizer {
    target: Target,
    palette: Arc<Palette>,
    config: GeneticConfig,
    population: Vec<Individual>,
    best: Individual,
    generation: usize,
    stagnation: StagnationControl,
}

impl GeneticOptimizer {
    /// Validates `config` and seeds an evaluated random population.
    pub fn new<R: RandomSource + ?Sized>(
        target: Target,
        palette: Arc<Palette>,
        config: GeneticConfig,
        rng: &mut R,
    ) -> Result<Self, MixError> {
        config.validate()?;
        if palette.is_empty() {
            return Err(MixError::InvalidPalette("palette has no pigments".into()));
        }

        let population: Vec<Individual> = (0..config.population_size)
            .map(|_| Individual::random(&palette, &target, rng))
            .collect();
        let best = best_of(&population).clone();
        debug!(
            target_name = target.name(),
            pigments = palette.len(),
            population = population.len(),
            best = best.fitness,
            "seeded population"
        );

        let stagnation = StagnationControl::new(config.mutation_rate);
        Ok(Self {
            target,
            palette,
            config,
            population,
            best,
            generation: 0,
            stagnation,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Best individual seen so far.
    pub fn best(&self) -> &Individual {
        &self.best
    }

    /// Generations bred so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn stagnation(&self) -> &StagnationControl {
        &self.stagnation
    }

    /// Whether the best-so-far fitness is below the convergence threshold.
    pub fn is_converged(&self) -> bool {
        self.best.fitness < self.config.convergence_epsilon
    }

    /// Whether [`run`](Self::run) would stop here.
    pub fn is_done(&self) -> bool {
        self.is_converged() || self.generation >= self.config.max_generations
    }

    /// Breeds one generation and updates the best-so-far snapshot.
    pub fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> GenerationReport {
        rank(&mut self.population);
        let pool = breeding_pool_size(self.population.len(), self.config.breed_fraction);
        assign_breed_counts(&mut self.population, pool);
        let table = BreedingTable::build(&self.population);

        let rate = self.stagnation.rate();
        let mut offspring = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            offspring.push(self.breed(&table, rate, rng));
        }
        self.population = offspring;
        self.generation += 1;

        let (leader, generation_best) = best_index(&self.population);
        let improved = generation_best < self.best.fitness;
        if improved {
            self.best = self.population[leader].clone();
        }

        let event = self.stagnation.observe(improved);
        if let StagnationEvent::Escalated { rate } = event {
            self.shake(leader, rng);
            info!(
                generation = self.generation,
                rate,
                best = self.best.fitness,
                "search stagnated, raising mutation rate"
            );
        }

        debug!(
            generation = self.generation,
            generation_best,
            best = self.best.fitness,
            rate = self.stagnation.rate(),
            "generation bred"
        );
        GenerationReport {
            generation: self.generation,
            generation_best,
            best_so_far: self.best.fitness,
            stagnation: event,
        }
    }

    /// Steps until converged or out of generations.
    pub fn run<R: RandomSource + ?Sized>(mut self, rng: &mut R) -> Outcome {
        while !self.is_done() {
            self.step(rng);
        }
        let converged = self.is_converged();
        info!(
            target_name = self.target.name(),
            generations = self.generation,
            fitness = self.best.fitness,
            converged,
            "genetic search finished"
        );
        Outcome {
            best: self.best,
            generations: self.generation,
            converged,
        }
    }

    /// One offspring. The draw order is fixed: both parents, the mutation
    /// coin, the crossover flips, then the mutation index and delta.
    fn breed<R: RandomSource + ?Sized>(
        &self,
        table: &BreedingTable,
        rate: f64,
        rng: &mut R,
    ) -> Individual {
        let first_index = table.sample(rng);
        let second_index = table.sample(rng);
        let first = &self.population[first_index];
        let fresh;
        let second = if first_index == second_index {
            fresh = Individual::random(&self.palette, &self.target, rng);
            &fresh
        } else {
            &self.population[second_index]
        };

        let mutate = rng.next_f64() < rate;
        let ratio = crossover_ratio(first.fitness, second.fitness);
        let mut child = Mixture::crossover(&first.mixture, &second.mixture, ratio, rng);
        if mutate {
            let index = rng.next_index(self.palette.len());
            let delta = rng.next_range(-1.0, 1.0);
            child.mutate_component(index, delta);
        }
        Individual::evaluated(child, &self.target)
    }

    /// Forces a large mutation on the current generation's best.
    fn shake<R: RandomSource + ?Sized>(&mut self, index: usize, rng: &mut R) {
        let component = rng.next_index(self.palette.len());
        let delta = rng.next_range(-1.0, 2.0);
        let individual = &mut self.population[index];
        individual.mixture.mutate_component(component, delta);
        individual.reevaluate(&self.target);
        if individual.fitness < self.best.fitness {
            self.best = individual.clone();
        }
    }
}

/// Probability of taking each component from the first parent:
/// `fitness(second) / fitness(first)`. A fitter first parent gives a ratio
/// above 1, so the child copies it entirely.
pub fn crossover_ratio(first_fitness: f64, second_fitness: f64) -> f64 {
    second_fitness / first_fitness.max(f64::MIN_POSITIVE)
}

fn best_index(population: &[Individual]) -> (usize, f64) {
    population
        .iter()
        .enumerate()
        .map(|(i, ind)| (i, ind.fitness))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, f64::INFINITY))
}

fn best_of(population: &[Individual]) -> &Individual {
    &population[best_index(population).0]
}
