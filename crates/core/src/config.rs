//! Run configuration: genetic search, refinement, and the PRNG seed.

use crate::error::MixError;
use crate::genetic::{
    GeneticConfig, DEFAULT_BREED_FRACTION, DEFAULT_CONVERGENCE_EPSILON,
    DEFAULT_MAX_GENERATIONS, DEFAULT_MUTATION_RATE, DEFAULT_POPULATION_SIZE,
};
use crate::params::{param_f64, param_u64, param_usize};
use crate::refine::{
    RefinerConfig, DEFAULT_END_STEP, DEFAULT_MAX_ITERATIONS, DEFAULT_START_STEP,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default PRNG seed.
pub const DEFAULT_SEED: u64 = 42;

/// Everything needed to reproduce one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub genetic: GeneticConfig,
    pub refiner: RefinerConfig,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            genetic: GeneticConfig::default(),
            refiner: RefinerConfig::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl SolverConfig {
    /// Reads a flat JSON object such as
    /// `{"population_size": 500, "refiner_start_step": 0.1, "seed": 7}`.
    ///
    /// Missing keys take their defaults; keys with the wrong type are errors.
    /// The result is validated.
    pub fn from_json(params: &Value) -> Result<Self, MixError> {
        let config = Self {
            genetic: GeneticConfig {
                population_size: param_usize(params, "population_size", DEFAULT_POPULATION_SIZE)?,
                breed_fraction: param_f64(params, "breed_fraction", DEFAULT_BREED_FRACTION)?,
                mutation_rate: param_f64(params, "mutation_rate", DEFAULT_MUTATION_RATE)?,
                max_generations: param_usize(params, "max_generations", DEFAULT_MAX_GENERATIONS)?,
                convergence_epsilon: param_f64(
                    params,
                    "convergence_epsilon",
                    DEFAULT_CONVERGENCE_EPSILON,
                )?,
            },
            refiner: RefinerConfig {
                max_iterations: param_usize(
                    params,
                    "refiner_max_iterations",
                    DEFAULT_MAX_ITERATIONS,
                )?,
                start_step: param_f64(params, "refiner_start_step", DEFAULT_START_STEP)?,
                end_step: param_f64(params, "refiner_end_step", DEFAULT_END_STEP)?,
            },
            seed: param_u64(params, "seed", DEFAULT_SEED)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// The flat form accepted by [`from_json`](Self::from_json).
    pub fn to_json(&self) -> Value {
        json!({
            "population_size": self.genetic.population_size,
            "breed_fraction": self.genetic.breed_fraction,
            "mutation_rate": self.genetic.mutation_rate,
            "max_generations": self.genetic.max_generations,
            "convergence_epsilon": self.genetic.convergence_epsilon,
            "refiner_max_iterations": self.refiner.max_iterations,
            "refiner_start_step": self.refiner.start_step,
            "refiner_end_step": self.refiner.end_step,
            "seed": self.seed,
        })
    }

    pub fn validate(&self) -> Result<(), MixError> {
        self.genetic.validate()?;
        self.refiner.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_empty_object_gives_defaults() {
        let config = SolverConfig::from_json(&json!({})).unwrap();
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn from_json_reads_flat_keys() {
        let config = SolverConfig::from_json(&json!({
            "population_size": 120,
            "max_generations": 12,
            "refiner_max_iterations": 50,
            "refiner_start_step": 0.1,
            "seed": 9
        }))
        .unwrap();
        assert_eq!(config.genetic.population_size, 120);
        assert_eq!(config.genetic.max_generations, 12);
        assert_eq!(config.refiner.max_iterations, 50);
        assert!((config.refiner.start_step - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.seed, 9);
        assert!((config.genetic.mutation_rate - DEFAULT_MUTATION_RATE).abs() < f64::EPSILON);
    }

    #[test]
    fn from_json_rejects_wrong_type() {
        let err = SolverConfig::from_json(&json!({"population_size": "lots"})).unwrap_err();
        assert!(matches!(err, MixError::ParamTypeMismatch { .. }), "{err}");
    }

    #[test]
    fn from_json_validates() {
        let err = SolverConfig::from_json(&json!({"breed_fraction": 1.5})).unwrap_err();
        assert!(matches!(err, MixError::InvalidConfig(_)), "{err}");
        let err = SolverConfig::from_json(&json!({"refiner_end_step": 0})).unwrap_err();
        assert!(err.to_string().contains("end_step"), "{err}");
    }

    #[test]
    fn flat_json_round_trips() {
        let mut config = SolverConfig::default();
        config.genetic.population_size = 77;
        config.refiner.end_step = 1e-4;
        config.seed = 1234;
        let back = SolverConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn nested_serde_form_fills_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"genetic": {"max_generations": 3}, "seed": 5}"#).unwrap();
        assert_eq!(config.genetic.max_generations, 3);
        assert_eq!(config.genetic.population_size, DEFAULT_POPULATION_SIZE);
        assert_eq!(config.refiner, RefinerConfig::default());
        assert_eq!(config.seed, 5);
    }
}
