#![deny(unsafe_code)]
//! Core of the pigment-mix paint recipe solver.
//!
//! Given a target color and a palette of base pigments, finds the proportions
//! whose physical (Kubelka-Munk) mixture is perceptually closest to the target
//! under CIE94, preferring recipes that use fewer pigments. The search is a
//! generational genetic algorithm refined by a coordinate pattern search.
//!
//! Provides color conversions (`Srgb`, `Lab`), the spectral mixer, `Pigment`
//! and `Palette`, `Mixture`, the `GeneticOptimizer` and `PatternSearch`
//! stages, `SolverConfig`, the `RandomSource` trait with the seedable
//! `Xorshift64`, and parameter helpers.

pub mod color;
pub mod config;
pub mod error;
pub mod genetic;
pub mod mixture;
pub mod params;
pub mod pigment;
pub mod population;
pub mod prng;
pub mod refine;
pub mod solver;
pub mod spectral;

pub use color::{Lab, Srgb};
pub use config::SolverConfig;
pub use error::MixError;
pub use genetic::{GeneticConfig, GeneticOptimizer};
pub use mixture::Mixture;
pub use pigment::{Palette, Pigment, Target};
pub use population::Individual;
pub use prng::{RandomSource, Xorshift64};
pub use refine::{PatternSearch, RefinerConfig};
pub use solver::{solve, solve_seeded, BatchSolver, Solution};
