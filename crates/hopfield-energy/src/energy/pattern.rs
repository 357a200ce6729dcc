//! Energies over stored bipolar patterns: classical quadratic, rectified
//! polynomial (dense associative memory) and exponential (log-sum-exp).

use ndarray::ArrayView1;
use tracing::warn;

use super::EnergyModel;
use crate::error::{HopfieldError, HopfieldResult};
use crate::numeric::log_sum_exp;
use crate::state::PatternMatrix;

/// Largest polynomial degree; `powi` takes an `i32` exponent.
const MAX_DEGREE: u32 = i32::MAX as u32;

pub(crate) fn check_degree(degree: u32) -> HopfieldResult<()> {
    if degree == 0 {
        return Err(HopfieldError::invalid_config(
            "polynomial degree must be positive",
        ));
    }
    if degree > MAX_DEGREE {
        return Err(HopfieldError::invalid_config(format!(
            "polynomial degree must be at most {MAX_DEGREE}, got {degree}"
        )));
    }
    Ok(())
}

pub(crate) fn check_beta(beta: f64) -> HopfieldResult<()> {
    if !beta.is_finite() || beta <= 0.0 {
        return Err(HopfieldError::invalid_config(
            "inverse temperature beta must be positive and finite",
        ));
    }
    Ok(())
}

/// Classical Hopfield energy:
///   E(σ) = −½ Σ_μ (Ξ_μ·σ)²
///
/// Invariant under a global sign flip, so recall from a query closer to `−ξ`
/// converges to the inverted pattern.
#[derive(Clone, Debug)]
pub struct QuadraticEnergy {
    patterns: PatternMatrix,
}

impl QuadraticEnergy {
    pub fn new(patterns: PatternMatrix) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternMatrix {
        &self.patterns
    }
}

impl EnergyModel for QuadraticEnergy {
    fn dim(&self) -> usize {
        self.patterns.dim()
    }

    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64> {
        self.patterns.check_dim(state.len())?;
        let overlaps = self.patterns.overlaps(state);
        let sum_sq: f64 = overlaps.iter().map(|&o| (o as f64).powi(2)).sum();
        Ok(-0.5 * sum_sq)
    }
}

/// Dense associative memory energy of degree `n`:
///   E(σ) = −Σ_μ F_n(Ξ_μ·σ),   F_n(x) = xⁿ/n
///
/// With rectification `F_n(x) = 0` for `x < 0`, which removes the sign
/// symmetry of even degrees and keeps odd degrees bounded below.
#[derive(Clone, Debug)]
pub struct RectifiedPolynomialEnergy {
    patterns: PatternMatrix,
    degree: u32,
    rectified: bool,
}

impl RectifiedPolynomialEnergy {
    /// Fails if `degree` is zero or does not fit an `i32`.
    pub fn new(patterns: PatternMatrix, degree: u32, rectified: bool) -> HopfieldResult<Self> {
        check_degree(degree)?;
        if !rectified && degree % 2 == 1 {
            warn!(
                degree,
                "odd polynomial degree without rectification keeps the sign of negative overlaps"
            );
        }
        Ok(Self {
            patterns,
            degree,
            rectified,
        })
    }

    pub fn patterns(&self) -> &PatternMatrix {
        &self.patterns
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn rectified(&self) -> bool {
        self.rectified
    }

    #[inline]
    fn f_n(&self, x: f64) -> f64 {
        if self.rectified && x < 0.0 {
            return 0.0;
        }
        x.powi(self.degree as i32) / self.degree as f64
    }
}

impl EnergyModel for RectifiedPolynomialEnergy {
    fn dim(&self) -> usize {
        self.patterns.dim()
    }

    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64> {
        self.patterns.check_dim(state.len())?;
        let overlaps = self.patterns.overlaps(state);
        Ok(-overlaps.iter().map(|&o| self.f_n(o as f64)).sum::<f64>())
    }
}

/// Exponential energy:
///   E(σ) = −log Σ_μ exp(β·Ξ_μ·σ)
///
/// Evaluated with max-subtraction, so it stays finite for thousands of
/// patterns at large β.
#[derive(Clone, Debug)]
pub struct ExponentialEnergy {
    patterns: PatternMatrix,
    beta: f64,
}

impl ExponentialEnergy {
    /// Fails unless `beta` is positive and finite.
    pub fn new(patterns: PatternMatrix, beta: f64) -> HopfieldResult<Self> {
        check_beta(beta)?;
        Ok(Self { patterns, beta })
    }

    pub fn patterns(&self) -> &PatternMatrix {
        &self.patterns
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl EnergyModel for ExponentialEnergy {
    fn dim(&self) -> usize {
        self.patterns.dim()
    }

    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64> {
        self.patterns.check_dim(state.len())?;
        let scaled: Vec<f64> = self
            .patterns
            .overlaps(state)
            .iter()
            .map(|&o| self.beta * o as f64)
            .collect();
        Ok(-log_sum_exp(&scaled))
    }
}

/// Any of the pattern energies, dispatched by variant.
#[derive(Clone, Debug)]
pub enum PatternEnergy {
    Quadratic(QuadraticEnergy),
    Polynomial(RectifiedPolynomialEnergy),
    Exponential(ExponentialEnergy),
}

impl PatternEnergy {
    /// Stored patterns the energy was built from.
    pub fn patterns(&self) -> &PatternMatrix {
        match self {
            PatternEnergy::Quadratic(e) => e.patterns(),
            PatternEnergy::Polynomial(e) => e.patterns(),
            PatternEnergy::Exponential(e) => e.patterns(),
        }
    }
}

impl EnergyModel for PatternEnergy {
    fn dim(&self) -> usize {
        self.patterns().dim()
    }

    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64> {
        match self {
            PatternEnergy::Quadratic(e) => e.energy(state),
            PatternEnergy::Polynomial(e) => e.energy(state),
            PatternEnergy::Exponential(e) => e.energy(state),
        }
    }
}

impl From<QuadraticEnergy> for PatternEnergy {
    fn from(e: QuadraticEnergy) -> Self {
        PatternEnergy::Quadratic(e)
    }
}

impl From<RectifiedPolynomialEnergy> for PatternEnergy {
    fn from(e: RectifiedPolynomialEnergy) -> Self {
        PatternEnergy::Polynomial(e)
    }
}

impl From<ExponentialEnergy> for PatternEnergy {
    fn from(e: ExponentialEnergy) -> Self {
        PatternEnergy::Exponential(e)
    }
}
