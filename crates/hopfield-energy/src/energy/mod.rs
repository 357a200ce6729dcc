//! Energy functions over bipolar patterns and token matrices.
//!
//! Two capability traits cover the two state spaces:
//!
//! - [`EnergyModel`]: scalar energy of a length-`D` bipolar state, used by
//!   [`discrete_recall`](crate::dynamics::discrete_recall).
//! - [`TokenEnergy`]: scalar energy of an `N×D` token matrix together with its
//!   exact gradient, used by
//!   [`continuous_recall`](crate::dynamics::continuous_recall).
//!
//! Every implementation is side-effect free and holds only immutable
//! parameters, so one instance can serve any number of recall calls.

mod attention;
mod composite;
mod memory;
mod pattern;

pub use attention::AttentionEnergy;
pub use composite::{CompositeEnergy, EnergyTerm};
pub use memory::MemoryEnergy;
pub use pattern::{ExponentialEnergy, PatternEnergy, QuadraticEnergy, RectifiedPolynomialEnergy};

pub(crate) use pattern::{check_beta, check_degree};

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::HopfieldResult;

/// Energy of a bipolar query state.
pub trait EnergyModel: Send + Sync {
    /// State length `D` this energy accepts.
    fn dim(&self) -> usize;

    /// Energy of `state`.
    ///
    /// Fails with a dimension error before any arithmetic if
    /// `state.len() != self.dim()`.
    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64>;
}

/// Differentiable energy of an `N×D` token matrix.
pub trait TokenEnergy: Send + Sync {
    /// Token width `D` this energy accepts.
    fn token_dim(&self) -> usize;

    /// Energy of `tokens`.
    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        self.energy_and_grad(tokens).map(|(e, _)| e)
    }

    /// Energy of `tokens` and its gradient with respect to `tokens`.
    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)>;
}

impl<T: EnergyModel + ?Sized> EnergyModel for &T {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn energy(&self, state: ArrayView1<'_, f32>) -> HopfieldResult<f64> {
        (**self).energy(state)
    }
}

impl<T: TokenEnergy + ?Sized> TokenEnergy for &T {
    fn token_dim(&self) -> usize {
        (**self).token_dim()
    }

    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        (**self).energy(tokens)
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        (**self).energy_and_grad(tokens)
    }
}

/// Central-difference gradient of a token energy, for checking the analytic
/// gradients in tests.
#[cfg(test)]
pub(crate) fn numerical_grad<E: TokenEnergy>(
    energy: &E,
    tokens: &Array2<f32>,
    h: f32,
) -> Array2<f32> {
    let mut grad = Array2::zeros(tokens.raw_dim());
    let mut shifted = tokens.clone();
    for ((i, j), g) in grad.indexed_iter_mut() {
        let orig = shifted[[i, j]];
        shifted[[i, j]] = orig + h;
        let e_plus = energy.energy(shifted.view()).unwrap() as f64;
        shifted[[i, j]] = orig - h;
        let e_minus = energy.energy(shifted.view()).unwrap() as f64;
        shifted[[i, j]] = orig;
        *g = ((e_plus - e_minus) / (2.0 * h as f64)) as f32;
    }
    grad
}
