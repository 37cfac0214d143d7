//! A paint recipe: one proportion per palette pigment.
//!
//! Proportions are non-negative and sum to 1 after every mutation. The mixed
//! color is computed lazily by folding the palette through the spectral mixer
//! and cached until the proportions change.

use crate::color::{delta_e94_squared, srgb_to_lab, Lab, Srgb};
use crate::error::MixError;
use crate::pigment::{Palette, Target};
use crate::prng::RandomSource;
use crate::spectral::Reflectance;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Proportions at or below this are treated as "not used" in recipes and in
/// the sparsity penalty.
pub const SIGNIFICANT_PROPORTION: f64 = 0.001;

/// The color a mixture produces, in both sRGB and CIELAB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedColor {
    pub srgb: Srgb,
    pub lab: Lab,
}

/// One line of a printed recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeEntry {
    pub index: usize,
    pub name: String,
    pub proportion: f64,
}

/// Proportions over a shared palette, with a lazily cached mixed color.
#[derive(Debug, Clone)]
pub struct Mixture {
    palette: Arc<Palette>,
    proportions: Vec<f64>,
    mixed: OnceCell<MixedColor>,
}

impl Mixture {
    /// Normalizes `proportions` without validating them.
    fn from_raw(palette: Arc<Palette>, proportions: Vec<f64>) -> Self {
        let mut mixture = Self {
            palette,
            proportions,
            mixed: OnceCell::new(),
        };
        mixture.normalize();
        mixture
    }

    /// Draws each proportion uniformly from [0, 1), then normalizes.
    pub fn random<R: RandomSource + ?Sized>(palette: &Arc<Palette>, rng: &mut R) -> Self {
        let proportions = (0..palette.len()).map(|_| rng.next_f64()).collect();
        Self::from_raw(Arc::clone(palette), proportions)
    }

    /// A mixture of a single pigment.
    pub fn single(palette: &Arc<Palette>, index: usize) -> Result<Self, MixError> {
        if index >= palette.len() {
            return Err(MixError::IndexOutOfRange {
                index,
                len: palette.len(),
            });
        }
        let mut proportions = vec![0.0; palette.len()];
        proportions[index] = 1.0;
        Ok(Self::from_raw(Arc::clone(palette), proportions))
    }

    /// Builds a mixture from explicit proportions, normalizing them.
    pub fn from_proportions(
        palette: &Arc<Palette>,
        proportions: Vec<f64>,
    ) -> Result<Self, MixError> {
        if proportions.len() != palette.len() {
            return Err(MixError::ProportionMismatch {
                expected: palette.len(),
                got: proportions.len(),
            });
        }
        if let Some((index, &value)) = proportions
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite())
        {
            return Err(MixError::InvalidProportion { index, value });
        }
        Ok(Self::from_raw(Arc::clone(palette), proportions))
    }

    /// Child of two parents: each proportion comes from `first` with
    /// probability `ratio`, otherwise from `second`. The result is normalized.
    pub fn crossover<R: RandomSource + ?Sized>(
        first: &Mixture,
        second: &Mixture,
        ratio: f64,
        rng: &mut R,
    ) -> Self {
        debug_assert_eq!(first.proportions.len(), second.proportions.len());
        let proportions = first
            .proportions
            .iter()
            .zip(&second.proportions)
            .map(|(&a, &b)| if rng.next_f64() < ratio { a } else { b })
            .collect();
        Self::from_raw(Arc::clone(&first.palette), proportions)
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn proportions(&self) -> &[f64] {
        &self.proportions
    }

    /// Restores the invariant: every proportion >= 0 and the sum is 1.
    ///
    /// Negative entries are lifted by shifting everything up by the most
    /// negative value, then the vector is rescaled. A vector that has no mass
    /// left becomes uniform.
    pub fn normalize(&mut self) {
        let min = self.proportions.iter().copied().fold(0.0, f64::min);
        let total: f64 = self.proportions.iter().sum();
        if total == 1.0 && min == 0.0 {
            return;
        }
        for p in &mut self.proportions {
            *p = (*p - min).max(0.0);
        }
        let mut total: f64 = self.proportions.iter().sum();
        if total.is_infinite() {
            // Finite components whose sum overflows: bring them to [0, 1] first.
            let max = self.proportions.iter().copied().fold(0.0, f64::max);
            for p in &mut self.proportions {
                *p /= max;
            }
            total = self.proportions.iter().sum();
        }
        if total > 0.0 && total.is_finite() {
            for p in &mut self.proportions {
                *p /= total;
            }
        } else {
            let uniform = 1.0 / self.proportions.len() as f64;
            self.proportions.fill(uniform);
        }
        self.mixed = OnceCell::new();
    }

    /// The color this recipe produces.
    ///
    /// Pigments are folded in palette order: the running color starts as
    /// pigment 0, and pigment `i` is mixed in at `p[i] / (p[0] + ... + p[i])`.
    /// The fold is order-dependent, since pairwise Kubelka-Munk mixing is
    /// neither associative nor commutative.
    pub fn effective_color(&self) -> MixedColor {
        *self.mixed.get_or_init(|| self.compute_mixed())
    }

    fn compute_mixed(&self) -> MixedColor {
        let mut running: Option<Srgb> = None;
        let mut cumulative = 0.0;
        for (pigment, &p) in self.palette.iter().zip(&self.proportions) {
            cumulative += p;
            running = Some(match running {
                None => pigment.color(),
                Some(color) => {
                    let t = if cumulative > 0.0 { p / cumulative } else { 0.0 };
                    Reflectance::from_srgb(color)
                        .mix(pigment.reflectance(), t)
                        .to_srgb()
                }
            });
        }
        let srgb = running.unwrap_or(Srgb::BLACK);
        MixedColor {
            srgb,
            lab: srgb_to_lab(srgb),
        }
    }

    /// Adds `delta` to one proportion (clamping at 0) and renormalizes.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the palette.
    pub fn mutate_component(&mut self, index: usize, delta: f64) {
        let value = self.proportions[index] + delta;
        self.proportions[index] = value.max(0.0);
        self.mixed = OnceCell::new();
        self.normalize();
    }

    /// Adds a dab of pigment `index` making up fraction `t` of the new mix:
    /// every proportion is scaled by `1 - t`, then `t` is added to `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the palette.
    pub fn add_pigment(&mut self, index: usize, t: f64) {
        let t = t.clamp(0.0, 1.0);
        for p in &mut self.proportions {
            *p *= 1.0 - t;
        }
        self.proportions[index] += t;
        self.mixed = OnceCell::new();
        self.normalize();
    }

    /// Number of pigments whose proportion exceeds [`SIGNIFICANT_PROPORTION`].
    pub fn significant_count(&self) -> usize {
        self.proportions
            .iter()
            .filter(|&&p| p > SIGNIFICANT_PROPORTION)
            .count()
    }

    /// Squared CIE94 distance from the mixed color to `target`.
    pub fn perceptual_error(&self, target: &Target) -> f64 {
        delta_e94_squared(self.effective_color().lab, target.lab())
    }

    /// Objective value (lower is better): perceptual error plus one per
    /// pigment used, so recipes with fewer paints win ties.
    pub fn evaluate(&self, target: &Target) -> f64 {
        self.perceptual_error(target) + self.significant_count() as f64
    }

    /// Pigments above [`SIGNIFICANT_PROPORTION`], in palette order.
    pub fn recipe(&self) -> Vec<RecipeEntry> {
        self.palette
            .iter()
            .zip(&self.proportions)
            .enumerate()
            .filter(|(_, (_, &p))| p > SIGNIFICANT_PROPORTION)
            .map(|(index, (pigment, &proportion))| RecipeEntry {
                index,
                name: pigment.name().to_string(),
                proportion,
            })
            .collect()
    }
}

/// Prints the mixed color's hex, then one `"{proportion:.3} {name}"` line per
/// significant pigment.
impl fmt::Display for Mixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.effective_color().srgb.to_hex())?;
        for entry in self.recipe() {
            write!(f, "\n{:.3} {}", entry.proportion, entry.name)?;
        }
        Ok(())
    }
}
