//! Energy layer normalization.
//!
//! Per token row `x` of width `D`:
//!
//! ```text
//! g = γ·(x − mean(x)) / sqrt(mean((x − mean(x))²) + ε) + δ
//! ```
//!
//! `γ` is one scalar shared by every component; `δ` is an optional
//! per-component bias. `g` is exactly the gradient of the convex potential
//!
//! ```text
//! L(x) = D·γ·sqrt(mean((x − mean(x))²) + ε) + Σ δ·x
//! ```
//!
//! which is what lets the continuous recall treat `∂E/∂g` as a descent
//! direction for `x`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{HopfieldError, HopfieldResult};

/// Default variance floor.
pub const DEFAULT_EPS: f32 = 1e-5;

/// Layer normalization with a scalar gain, derived from a scalar potential.
#[derive(Clone, Debug)]
pub struct EnergyLayerNorm {
    gamma: f32,
    bias: Option<Array1<f32>>,
    eps: f32,
}

impl Default for EnergyLayerNorm {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            bias: None,
            eps: DEFAULT_EPS,
        }
    }
}

impl EnergyLayerNorm {
    /// Fails unless `gamma` and `eps` are positive and finite and the bias is
    /// finite.
    pub fn new(gamma: f32, bias: Option<Array1<f32>>, eps: f32) -> HopfieldResult<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(HopfieldError::invalid_config(
                "layer norm gamma must be positive and finite",
            ));
        }
        if !eps.is_finite() || eps <= 0.0 {
            return Err(HopfieldError::invalid_config(
                "layer norm eps must be positive and finite",
            ));
        }
        if let Some(b) = &bias {
            if b.is_empty() || b.iter().any(|v| !v.is_finite()) {
                return Err(HopfieldError::invalid_config(
                    "layer norm bias must be non-empty and finite",
                ));
            }
        }
        Ok(Self { gamma, bias, eps })
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn bias(&self) -> Option<ArrayView1<'_, f32>> {
        self.bias.as_ref().map(|b| b.view())
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Width fixed by the bias, if one is set.
    pub fn dim(&self) -> Option<usize> {
        self.bias.as_ref().map(|b| b.len())
    }

    fn check_width(&self, width: usize) -> HopfieldResult<()> {
        if width == 0 {
            return Err(HopfieldError::EmptyInput(
                "cannot normalize zero-width tokens".into(),
            ));
        }
        match self.dim() {
            Some(d) if d != width => Err(HopfieldError::DimensionMismatch {
                expected: d,
                actual: width,
            }),
            _ => Ok(()),
        }
    }

    #[inline]
    fn row_stats(x: ArrayView1<'_, f32>, eps: f32) -> (f32, f32) {
        let n = x.len() as f32;
        let mean = x.sum() / n;
        let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        (mean, (var + eps).sqrt())
    }

    /// Normalize every row of `tokens`.
    pub fn forward(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<Array2<f32>> {
        self.check_width(tokens.ncols())?;
        let mut out = tokens.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let (mean, std) = Self::row_stats(row.view(), self.eps);
            let scale = self.gamma / std;
            row.mapv_inplace(|v| (v - mean) * scale);
            if let Some(b) = &self.bias {
                row += b;
            }
        }
        Ok(out)
    }

    /// Potential `L(x)` summed over all rows of `tokens`.
    pub fn potential(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        self.check_width(tokens.ncols())?;
        let d = tokens.ncols() as f32;
        let mut total = 0.0_f32;
        for row in tokens.axis_iter(Axis(0)) {
            let (_, std) = Self::row_stats(row, self.eps);
            total += d * self.gamma * std;
            if let Some(b) = &self.bias {
                total += row.dot(b);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_forward_zero_mean_unit_var() {
        let ln = EnergyLayerNorm::default();
        let out = ln.forward(array![[1.0, 2.0, 3.0, 4.0]].view()).unwrap();
        let row = out.row(0);
        let mean = row.sum() / 4.0;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / 4.0;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-6);
        assert_relative_eq!(var, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_forward_gain_and_bias() {
        let ln = EnergyLayerNorm::new(2.0, Some(array![1.0, -1.0]), 1e-5).unwrap();
        let out = ln.forward(array![[0.0, 2.0]].view()).unwrap();
        // centred [-1, 1], std 1 -> gamma*[-1, 1] + bias
        assert_relative_eq!(out[[0, 0]], -1.0, epsilon = 1e-4);
        assert_relative_eq!(out[[0, 1]], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_constant_row_maps_to_bias() {
        let ln = EnergyLayerNorm::default();
        let out = ln.forward(array![[3.0, 3.0, 3.0]].view()).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_forward_is_gradient_of_potential() {
        let ln = EnergyLayerNorm::new(1.7, Some(array![0.1, -0.4, 0.3]), 1e-5).unwrap();
        let x = array![[0.5, -1.2, 2.0], [0.3, 0.1, -0.8]];
        let g = ln.forward(x.view()).unwrap();
        let h = 1e-2_f32;
        let mut shifted = x.clone();
        for ((i, j), &gij) in g.indexed_iter() {
            let orig = shifted[[i, j]];
            shifted[[i, j]] = orig + h;
            let lp = ln.potential(shifted.view()).unwrap();
            shifted[[i, j]] = orig - h;
            let lm = ln.potential(shifted.view()).unwrap();
            shifted[[i, j]] = orig;
            assert_relative_eq!((lp - lm) / (2.0 * h), gij, epsilon = 5e-3);
        }
    }

    #[test]
    fn test_validation() {
        assert!(EnergyLayerNorm::new(0.0, None, 1e-5).is_err());
        assert!(EnergyLayerNorm::new(1.0, None, 0.0).is_err());
        let ln = EnergyLayerNorm::new(1.0, Some(array![0.0, 0.0]), 1e-5).unwrap();
        assert!(matches!(
            ln.forward(array![[1.0, 2.0, 3.0]].view()).unwrap_err(),
            HopfieldError::DimensionMismatch { .. }
        ));
    }
}
