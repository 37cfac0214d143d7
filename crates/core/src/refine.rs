//! Coordinate pattern search that polishes a mixture found by the genetic
//! search.

use crate::error::MixError;
use crate::pigment::Target;
use crate::population::Individual;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of sweeps over all pigment axes.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
/// Default initial step per axis.
pub const DEFAULT_START_STEP: f64 = 0.05;
/// Default step below which the search stops.
pub const DEFAULT_END_STEP: f64 = 1e-6;

/// Step schedule for [`PatternSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    pub max_iterations: usize,
    pub start_step: f64,
    pub end_step: f64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            start_step: DEFAULT_START_STEP,
            end_step: DEFAULT_END_STEP,
        }
    }
}

impl RefinerConfig {
    pub fn validate(&self) -> Result<(), MixError> {
        for (name, value) in [("start_step", self.start_step), ("end_step", self.end_step)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MixError::InvalidConfig(format!(
                    "refiner {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// What a refinement pass did.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub best: Individual,
    /// Sweeps performed.
    pub iterations: usize,
    /// Step size when the search stopped.
    pub final_step: f64,
    /// Fitness gained over the input.
    pub improvement: f64,
}

/// Greedy per-axis search with a halving step.
///
/// Each sweep visits every pigment axis, trying `-step` then `+step` and
/// keeping the first move that lowers fitness. A sweep with no accepted move
/// halves the step; the search ends when the step falls below `end_step` or
/// after `max_iterations` sweeps. Fitness never increases.
#[derive(Debug, Clone)]
pub struct PatternSearch<'a> {
    target: &'a Target,
    config: RefinerConfig,
}

impl<'a> PatternSearch<'a> {
    pub fn new(target: &'a Target, config: RefinerConfig) -> Self {
        Self { target, config }
    }

    pub fn run(&self, start: &Individual) -> Refinement {
        let mut current = start.clone();
        let axes = current.mixture.proportions().len();
        let mut step = self.config.start_step;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let mut changed = false;
            for axis in 0..axes {
                for delta in [-step, step] {
                    let candidate = self.probe(&current, axis, delta);
                    if candidate.fitness < current.fitness {
                        current = candidate;
                        changed = true;
                        break;
                    }
                }
            }
            if !changed {
                step /= 2.0;
                if step < self.config.end_step {
                    break;
                }
            }
        }

        let improvement = start.fitness - current.fitness;
        debug!(
            iterations,
            final_step = step,
            fitness = current.fitness,
            improvement,
            "refinement finished"
        );
        Refinement {
            best: current,
            iterations,
            final_step: step,
            improvement,
        }
    }

    fn probe(&self, from: &Individual, axis: usize, delta: f64) -> Individual {
        let mut candidate = from.clone();
        candidate.mixture.mutate_component(axis, delta);
        candidate.reevaluate(self.target);
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Srgb;
    use crate::mixture::Mixture;
    use crate::pigment::{Palette, Pigment};
    use crate::prng::Xorshift64;
    use std::sync::Arc;

    fn grey_palette() -> Arc<Palette> {
        Arc::new(
            Palette::new(vec![
                Pigment::new("Black", Srgb::BLACK),
                Pigment::new("White", Srgb::WHITE),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn default_config() {
        let c = RefinerConfig::default();
        assert_eq!(c.max_iterations, 20);
        assert!((c.start_step - 0.05).abs() < f64::EPSILON);
        assert!((c.end_step - 1e-6).abs() < f64::EPSILON);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_steps() {
        let zero = RefinerConfig {
            start_step: 0.0,
            ..RefinerConfig::default()
        };
        assert!(zero.validate().is_err());
        let negative = RefinerConfig {
            end_step: -1.0,
            ..RefinerConfig::default()
        };
        let err = negative.validate().unwrap_err();
        assert!(err.to_string().contains("end_step"), "{err}");
    }

    #[test]
    fn never_worsens_an_already_optimal_individual() {
        let palette = grey_palette();
        let target = Target::new("white", Srgb::WHITE);
        let start = Individual::evaluated(Mixture::single(&palette, 1).unwrap(), &target);
        let result = PatternSearch::new(&target, RefinerConfig::default()).run(&start);
        assert!(result.best.fitness <= start.fitness);
        assert!(result.improvement >= 0.0);
    }

    #[test]
    fn moves_toward_the_target_grey() {
        let palette = grey_palette();
        let goal = Mixture::from_proportions(&palette, vec![0.3, 0.7]).unwrap();
        let target = Target::new("grey", goal.effective_color().srgb);
        let start = Individual::evaluated(
            Mixture::from_proportions(&palette, vec![0.5, 0.5]).unwrap(),
            &target,
        );
        let config = RefinerConfig {
            max_iterations: 200,
            ..RefinerConfig::default()
        };
        let result = PatternSearch::new(&target, config).run(&start);
        assert!(result.best.fitness < start.fitness);
        let black = result.best.mixture.proportions()[0];
        assert!((black - 0.3).abs() < 0.02, "black proportion {black}");
    }

    #[test]
    fn stops_when_step_falls_below_end_step() {
        let palette = grey_palette();
        let target = Target::new("white", Srgb::WHITE);
        let start = Individual::evaluated(Mixture::single(&palette, 1).unwrap(), &target);
        let config = RefinerConfig {
            max_iterations: 1000,
            start_step: 0.05,
            end_step: 0.01,
        };
        let result = PatternSearch::new(&target, config).run(&start);
        // 0.05 -> 0.025 -> 0.0125 -> 0.00625 stops on the third flat sweep.
        assert_eq!(result.iterations, 3);
        assert!(result.final_step < 0.01);
    }

    #[test]
    fn zero_iterations_returns_input() {
        let palette = grey_palette();
        let target = Target::new("grey", Srgb::from_u32(0x808080));
        let start = Individual::evaluated(Mixture::single(&palette, 0).unwrap(), &target);
        let config = RefinerConfig {
            max_iterations: 0,
            ..RefinerConfig::default()
        };
        let result = PatternSearch::new(&target, config).run(&start);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.best.fitness, start.fitness);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn refinement_is_monotone(seed: u64, hex in 0_u32..0x100_0000) {
                let palette = Arc::new(Palette::primaries());
                let target = Target::new("t", Srgb::from_u32(hex));
                let mut rng = Xorshift64::new(seed);
                let start = Individual::random(&palette, &target, &mut rng);
                let result = PatternSearch::new(&target, RefinerConfig::default()).run(&start);
                prop_assert!(result.best.fitness <= start.fitness);
                let sum: f64 = result.best.mixture.proportions().iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9);
            }
        }
    }
}
