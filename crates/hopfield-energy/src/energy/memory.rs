//! Hopfield memory term of the Energy Transformer.
//!
//! ```text
//! E = −½ Σ_{A,μ} ReLU(g_A·Ξ_μ)²,     ∂E/∂g = −ReLU(g·Ξᵀ)·Ξ
//! ```

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};

use super::TokenEnergy;
use crate::error::{HopfieldError, HopfieldResult};
use crate::numeric::relu;

/// Rectified-quadratic memory energy over `M×D` continuous patterns.
#[derive(Clone, Debug)]
pub struct MemoryEnergy {
    xi: Arc<Array2<f32>>,
}

impl MemoryEnergy {
    pub fn new(xi: Array2<f32>) -> HopfieldResult<Self> {
        if xi.nrows() == 0 || xi.ncols() == 0 {
            return Err(HopfieldError::EmptyInput(format!(
                "memory patterns must be non-empty, got {:?}",
                xi.shape()
            )));
        }
        Ok(Self { xi: Arc::new(xi) })
    }

    /// Number of stored memories `M`.
    pub fn num_memories(&self) -> usize {
        self.xi.nrows()
    }

    pub fn patterns(&self) -> ArrayView2<'_, f32> {
        self.xi.view()
    }
}

impl TokenEnergy for MemoryEnergy {
    fn token_dim(&self) -> usize {
        self.xi.ncols()
    }

    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        self.check_tokens(&tokens)?;
        let hidden = tokens.dot(&self.xi.t());
        Ok(-0.5 * hidden.iter().map(|&h| relu(h).powi(2)).sum::<f32>())
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        self.check_tokens(&tokens)?;
        let hidden = tokens.dot(&self.xi.t()).mapv_into(relu);
        let energy = -0.5 * hidden.iter().map(|h| h * h).sum::<f32>();
        let grad = -hidden.dot(self.xi.as_ref());
        Ok((energy, grad))
    }
}

impl MemoryEnergy {
    fn check_tokens(&self, tokens: &ArrayView2<'_, f32>) -> HopfieldResult<()> {
        if tokens.ncols() != self.token_dim() {
            return Err(HopfieldError::DimensionMismatch {
                expected: self.token_dim(),
                actual: tokens.ncols(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::numerical_grad;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_memory_value() {
        let mem = MemoryEnergy::new(array![[1.0, 0.0], [0.0, -1.0]]).unwrap();
        // hidden = [[2, -3]] -> relu [[2, 0]]
        let e = mem.energy(array![[2.0, 3.0]].view()).unwrap();
        assert_relative_eq!(e, -2.0);
    }

    #[test]
    fn test_memory_gradient() {
        let mem = MemoryEnergy::new(array![[0.5, -0.2, 0.1], [0.3, 0.8, -0.4]]).unwrap();
        let g = array![[0.2, 0.9, -0.1], [-1.0, 0.3, 0.5]];
        let (e, analytic) = mem.energy_and_grad(g.view()).unwrap();
        assert_relative_eq!(e, mem.energy(g.view()).unwrap());
        let numeric = numerical_grad(&mem, &g, 1e-3);
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert_relative_eq!(a, n, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_memory_bounded_above_zero() {
        let mem = MemoryEnergy::new(array![[1.0, 1.0]]).unwrap();
        // Negative alignment is rectified away.
        assert_eq!(mem.energy(array![[-3.0, -3.0]].view()).unwrap(), 0.0);
    }

    #[test]
    fn test_memory_dim_check() {
        let mem = MemoryEnergy::new(array![[1.0, 1.0]]).unwrap();
        assert!(mem.energy(array![[1.0, 1.0, 1.0]].view()).is_err());
        assert!(MemoryEnergy::new(Array2::zeros((0, 2))).is_err());
    }
}
