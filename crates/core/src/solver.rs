//! End-to-end solving: genetic search followed by pattern-search refinement,
//! for one target or a sequence of them.

use crate::color::Srgb;
use crate::config::SolverConfig;
use crate::error::MixError;
use crate::genetic::GeneticOptimizer;
use crate::mixture::{Mixture, RecipeEntry, SIGNIFICANT_PROPORTION};
use crate::pigment::{Palette, Pigment, Target};
use crate::prng::{RandomSource, Xorshift64};
use crate::refine::PatternSearch;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// A solved target.
#[derive(Debug, Clone)]
pub struct Solution {
    pub target: Target,
    pub mixture: Mixture,
    /// Final objective value (perceptual error plus sparsity penalty).
    pub fitness: f64,
    /// Genetic generations bred before refinement.
    pub generations: usize,
    /// Whether the genetic phase hit the convergence threshold.
    pub converged: bool,
    /// Pattern-search sweeps performed.
    pub refine_iterations: usize,
}

impl Solution {
    /// The color the recipe produces.
    pub fn color(&self) -> Srgb {
        self.mixture.effective_color().srgb
    }

    /// CIE94 distance (not squared) from the mix to the target.
    pub fn delta_e(&self) -> f64 {
        self.mixture.perceptual_error(&self.target).sqrt()
    }

    /// Serializable summary for machine-readable output.
    pub fn report(&self) -> SolutionReport {
        SolutionReport {
            target: self.target.clone(),
            color: self.color(),
            fitness: self.fitness,
            delta_e: self.delta_e(),
            generations: self.generations,
            converged: self.converged,
            recipe: self.mixture.recipe(),
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}) dE94 {:.2}",
            self.target.name(),
            self.target.color().to_hex(),
            self.delta_e()
        )?;
        write!(f, "{}", self.mixture)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionReport {
    pub target: Target,
    pub color: Srgb,
    pub fitness: f64,
    pub delta_e: f64,
    pub generations: usize,
    pub converged: bool,
    pub recipe: Vec<RecipeEntry>,
}

/// Finds a recipe for `target` from `palette`, drawing randomness from `rng`.
pub fn solve<R: RandomSource + ?Sized>(
    target: &Target,
    palette: &Arc<Palette>,
    config: &SolverConfig,
    rng: &mut R,
) -> Result<Solution, MixError> {
    config.validate()?;
    let optimizer = GeneticOptimizer::new(
        target.clone(),
        Arc::clone(palette),
        config.genetic.clone(),
        rng,
    )?;
    let outcome = optimizer.run(rng);
    let refined = PatternSearch::new(target, config.refiner.clone()).run(&outcome.best);

    let solution = Solution {
        target: target.clone(),
        mixture: refined.best.mixture,
        fitness: refined.best.fitness,
        generations: outcome.generations,
        converged: outcome.converged,
        refine_iterations: refined.iterations,
    };
    info!(
        target_name = target.name(),
        color = %solution.color().to_hex(),
        fitness = solution.fitness,
        pigments = solution.mixture.significant_count(),
        "solved"
    );
    Ok(solution)
}

/// [`solve`] with a fresh [`Xorshift64`] seeded from `config.seed`.
pub fn solve_seeded(
    target: &Target,
    palette: &Arc<Palette>,
    config: &SolverConfig,
) -> Result<Solution, MixError> {
    let mut rng = Xorshift64::new(config.seed);
    solve(target, palette, config, &mut rng)
}

/// How many solutions used a base pigment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PigmentUsage {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub solutions: Vec<SolutionReport>,
    pub usage: Vec<PigmentUsage>,
}

/// Solves targets one after another against an optionally growing palette.
///
/// With growth enabled every solved mix is appended to the palette as a new
/// pigment named after its target, so later targets may build on it. The
/// usage tally only counts the base pigments the batch started with.
#[derive(Debug, Clone)]
pub struct BatchSolver {
    palette: Arc<Palette>,
    base_len: usize,
    config: SolverConfig,
    grow: bool,
    usage: Vec<usize>,
    solutions: Vec<Solution>,
}

impl BatchSolver {
    pub fn new(palette: Palette, config: SolverConfig) -> Result<Self, MixError> {
        config.validate()?;
        let base_len = palette.len();
        Ok(Self {
            palette: Arc::new(palette),
            base_len,
            config,
            grow: false,
            usage: vec![0; base_len],
            solutions: Vec::new(),
        })
    }

    /// Enables appending each solved mix to the palette.
    pub fn with_growth(mut self, grow: bool) -> Self {
        self.grow = grow;
        self
    }

    /// The palette the next target will be solved against.
    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Solves one target and records it.
    pub fn solve_next<R: RandomSource + ?Sized>(
        &mut self,
        target: &Target,
        rng: &mut R,
    ) -> Result<&Solution, MixError> {
        let solution = solve(target, &self.palette, &self.config, rng)?;

        for (count, &p) in self
            .usage
            .iter_mut()
            .zip(solution.mixture.proportions())
        {
            if p > SIGNIFICANT_PROPORTION {
                *count += 1;
            }
        }
        if self.grow {
            let pigment = Pigment::new(target.name(), solution.color());
            self.palette = Arc::new(self.palette.with_pigment(pigment));
        }

        self.solutions.push(solution);
        let index = self.solutions.len() - 1;
        Ok(&self.solutions[index])
    }

    /// Solves every target in order, stopping at the first error.
    pub fn solve_all<R: RandomSource + ?Sized>(
        &mut self,
        targets: &[Target],
        rng: &mut R,
    ) -> Result<(), MixError> {
        for target in targets {
            self.solve_next(target, rng)?;
        }
        Ok(())
    }

    /// Per base pigment, how many solutions used it above the significance
    /// threshold. Listed in palette order.
    pub fn usage(&self) -> Vec<PigmentUsage> {
        self.palette
            .iter()
            .take(self.base_len)
            .zip(&self.usage)
            .map(|(pigment, &count)| PigmentUsage {
                name: pigment.name().to_string(),
                count,
            })
            .collect()
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            solutions: self.solutions.iter().map(Solution::report).collect(),
            usage: self.usage(),
        }
    }
}
