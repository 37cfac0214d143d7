//! Scored individuals and fitness-proportional parent selection.

use crate::mixture::Mixture;
use crate::pigment::{Palette, Target};
use crate::prng::RandomSource;
use std::sync::Arc;

/// A mixture together with its fitness against the run's target.
#[derive(Debug, Clone)]
pub struct Individual {
    pub mixture: Mixture,
    pub fitness: f64,
    /// Breeding weight assigned during selection; 0 outside the breeding pool.
    pub breed_count: usize,
}

impl Individual {
    /// Scores `mixture` against `target`.
    pub fn evaluated(mixture: Mixture, target: &Target) -> Self {
        let fitness = mixture.evaluate(target);
        Self {
            mixture,
            fitness,
            breed_count: 0,
        }
    }

    /// A fresh random mixture, already scored.
    pub fn random<R: RandomSource + ?Sized>(
        palette: &Arc<Palette>,
        target: &Target,
        rng: &mut R,
    ) -> Self {
        Self::evaluated(Mixture::random(palette, rng), target)
    }

    /// Re-scores after the mixture was changed in place.
    pub fn reevaluate(&mut self, target: &Target) {
        self.fitness = self.mixture.evaluate(target);
    }
}

/// Sorts ascending by fitness, best first. NaN fitness sorts last.
pub fn rank(population: &mut [Individual]) {
    population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
}

/// Size of the breeding pool: `floor(len * breed_fraction)`.
pub fn breeding_pool_size(len: usize, breed_fraction: f64) -> usize {
    (len as f64 * breed_fraction).floor() as usize
}

/// Breeding weight of a pool member: `round(fitness / threshold + 1)`.
pub fn breed_count(fitness: f64, threshold: f64) -> usize {
    (fitness / threshold.max(f64::MIN_POSITIVE) + 1.0).round() as usize
}

/// Assigns breed counts to a ranked population.
///
/// The threshold is the fitness of the first individual outside the pool;
/// every pool member gets [`breed_count`], everyone else 0. Returns the
/// threshold used.
///
/// # Panics
///
/// Panics if `pool_size >= ranked.len()`.
pub fn assign_breed_counts(ranked: &mut [Individual], pool_size: usize) -> f64 {
    let threshold = ranked[pool_size].fitness;
    for (i, individual) in ranked.iter_mut().enumerate() {
        individual.breed_count = if i < pool_size {
            breed_count(individual.fitness, threshold)
        } else {
            0
        };
    }
    threshold
}

/// Cumulative selection table over a ranked population.
///
/// Holds `(upper_bound, ranked_index)` pairs with non-decreasing bounds; a
/// draw `u` selects the first entry whose bound is `>= u`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreedingTable {
    entries: Vec<(f64, usize)>,
}

impl BreedingTable {
    /// Builds the table from the first half of a ranked population whose
    /// breed counts are already assigned.
    ///
    /// Each index `i < len / 2` contributes `breed_count_i / total`. An entry
    /// landing on the same bound as its predecessor replaces it, so a run of
    /// zero-weight members resolves to the last of them. The running bound is
    /// capped at 1.0, and a closing entry at 1.0 maps the remainder to index
    /// `len / 2 + 1`, taking over any entry already at 1.0.
    pub fn build(ranked: &[Individual]) -> Self {
        let total: usize = ranked.iter().map(|i| i.breed_count).sum();
        let total = total.max(1) as f64;
        let half = ranked.len() / 2;

        let mut entries: Vec<(f64, usize)> = Vec::with_capacity(half + 1);
        let mut cumulative = 0.0;
        for (i, individual) in ranked.iter().take(half).enumerate() {
            cumulative = (cumulative + individual.breed_count as f64 / total).min(1.0);
            match entries.last_mut() {
                Some(last) if last.0 == cumulative => *last = (cumulative, i),
                _ => entries.push((cumulative, i)),
            }
        }
        let closing = (half + 1).min(ranked.len().saturating_sub(1));
        match entries.last_mut() {
            Some(last) if last.0 == 1.0 => *last = (1.0, closing),
            _ => entries.push((1.0, closing)),
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(f64, usize)] {
        &self.entries
    }

    /// Ranked index selected by a uniform draw `u` in [0, 1).
    pub fn select(&self, u: f64) -> usize {
        let pos = self.entries.partition_point(|&(bound, _)| bound < u);
        let (_, index) = self.entries[pos.min(self.entries.len() - 1)];
        index
    }

    /// Draws one ranked index from `rng`.
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> usize {
        self.select(rng.next_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Srgb;
    use crate::prng::Xorshift64;

    fn population(fitnesses: &[f64]) -> Vec<Individual> {
        let palette = Arc::new(Palette::primaries());
        let mut rng = Xorshift64::new(1);
        fitnesses
            .iter()
            .map(|&fitness| Individual {
                mixture: Mixture::random(&palette, &mut rng),
                fitness,
                breed_count: 0,
            })
            .collect()
    }

    #[test]
    fn evaluated_individual_carries_mixture_fitness() {
        let palette = Arc::new(Palette::primaries());
        let target = Target::new("red", Srgb::from_u32(0xff0000));
        let ind = Individual::evaluated(Mixture::single(&palette, 0).unwrap(), &target);
        assert!((ind.fitness - 1.0).abs() < 0.1);
        assert_eq!(ind.breed_count, 0);
    }

    #[test]
    fn rank_sorts_best_first() {
        let mut pop = population(&[5.0, 1.0, 3.0, 2.0]);
        rank(&mut pop);
        let order: Vec<f64> = pop.iter().map(|i| i.fitness).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn pool_size_floors() {
        assert_eq!(breeding_pool_size(10, 0.6), 6);
        assert_eq!(breeding_pool_size(5000, 0.6), 3000);
        assert_eq!(breeding_pool_size(7, 0.5), 3);
    }

    #[test]
    fn breed_count_formula() {
        // round(f / thr + 1)
        assert_eq!(breed_count(2.0, 4.0), 2); // 1.5 rounds away from zero
        assert_eq!(breed_count(1.0, 4.0), 1); // 1.25
        assert_eq!(breed_count(3.9, 4.0), 2); // 1.975
        assert_eq!(breed_count(4.0, 4.0), 2);
        assert_eq!(breed_count(12.0, 4.0), 4);
    }

    #[test]
    fn assign_uses_first_individual_outside_pool_as_threshold() {
        let mut pop = population(&[1.0, 2.0, 3.0, 4.0, 8.0]);
        let threshold = assign_breed_counts(&mut pop, 3);
        assert_eq!(threshold, 4.0);
        let counts: Vec<usize> = pop.iter().map(|i| i.breed_count).collect();
        // 1/4+1 = 1.25, 2/4+1 = 1.5, 3/4+1 = 1.75
        assert_eq!(counts, vec![1, 2, 2, 0, 0]);
    }

    #[test]
    fn table_covers_first_half_then_closes() {
        let mut pop = population(&[1.0, 2.0, 3.0, 4.0, 8.0, 9.0]);
        assign_breed_counts(&mut pop, 3);
        // counts [1, 2, 2, 0, 0, 0], total 5, half = 3
        let table = BreedingTable::build(&pop);
        let entries = table.entries();
        assert_eq!(entries.len(), 3);
        assert!((entries[0].0 - 0.2).abs() < 1e-12 && entries[0].1 == 0);
        assert!((entries[1].0 - 0.6).abs() < 1e-12 && entries[1].1 == 1);
        // 1.0 reached by index 2 and then replaced by the closing entry.
        assert_eq!(entries[2], (1.0, 4));
    }

    #[test]
    fn zero_weight_members_replace_the_previous_bound() {
        let mut pop = population(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        // pool of 2 within a half of 5: indices 2..5 add nothing
        assign_breed_counts(&mut pop, 2);
        let table = BreedingTable::build(&pop);
        let entries = table.entries();
        // The pool fills the table by index 1; the zero-weight tail and then
        // the closing entry take over that bound.
        assert_eq!(entries.len(), 2, "{entries:?}");
        assert_eq!(entries[0].1, 0);
        assert_eq!(entries[1], (1.0, 6));
    }

    #[test]
    fn rounding_overshoot_is_capped_and_closed() {
        // 2/11 + 2/11 + 1/11 + 2/11 + 2/11 + 2/11 sums to 1.0000000000000002
        let mut pop = population(&[1.0; 12]);
        for (ind, count) in pop.iter_mut().zip([2, 2, 1, 2, 2, 2]) {
            ind.breed_count = count;
        }
        let table = BreedingTable::build(&pop);
        let entries = table.entries();
        assert!(entries.windows(2).all(|w| w[0].0 <= w[1].0), "{entries:?}");
        assert_eq!(entries.len(), 6, "{entries:?}");
        assert_eq!(entries.last(), Some(&(1.0, 7)));
        assert_eq!(table.select(0.9999999999), 7);
    }

    #[test]
    fn select_picks_first_bound_at_or_above_draw() {
        let table = BreedingTable {
            entries: vec![(0.25, 0), (0.5, 1), (1.0, 3)],
        };
        assert_eq!(table.select(0.0), 0);
        assert_eq!(table.select(0.25), 0);
        assert_eq!(table.select(0.2500001), 1);
        assert_eq!(table.select(0.75), 3);
        assert_eq!(table.select(0.9999), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn table_bounds_are_monotone_and_end_at_one(
                raw in proptest::collection::vec(1.0_f64..50.0, 3..40),
                fraction in 0.05_f64..0.95,
            ) {
                let mut fitnesses = raw;
                fitnesses.sort_by(f64::total_cmp);
                let mut pop = population(&fitnesses);
                let pool = breeding_pool_size(pop.len(), fraction).clamp(1, pop.len() - 1);
                assign_breed_counts(&mut pop, pool);
                let table = BreedingTable::build(&pop);
                let entries = table.entries();
                prop_assert!(entries.windows(2).all(|w| w[0].0 <= w[1].0));
                prop_assert_eq!(entries.last().map(|e| e.0), Some(1.0));
                prop_assert!(entries.iter().all(|e| e.1 < pop.len()));
            }

            #[test]
            fn samples_stay_in_population(seed: u64, len in 3_usize..30) {
                let fitnesses: Vec<f64> = (1..=len).map(|f| f as f64).collect();
                let mut pop = population(&fitnesses);
                assign_breed_counts(&mut pop, len / 2);
                let table = BreedingTable::build(&pop);
                let mut rng = Xorshift64::new(seed);
                for _ in 0..50 {
                    prop_assert!(table.sample(&mut rng) < len);
                }
            }
        }
    }
}
