//! Multi-head attention energy over a token matrix.
//!
//! For head `h`, `Q = g·W_Q[h]` and `K = g·W_K[h]`. Each query token `C`
//! contributes the log-sum-exp of its scores against every admissible key
//! token `B`:
//!
//! ```text
//! E = −(1/β) Σ_h Σ_C log Σ_{B≠C} exp(β · K_B·Q_C)
//! ```
//!
//! With `P` the column softmax of `β·K·Qᵀ` the gradient is
//! `∂E/∂g = −(P·Q)·W_Kᵀ − (Pᵀ·K)·W_Qᵀ`, summed over heads.

use std::sync::Arc;

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

use super::TokenEnergy;
use crate::error::{HopfieldError, HopfieldResult};
use crate::numeric::masked_lse_softmax;

/// Attention term of the Energy Transformer.
#[derive(Clone, Debug)]
pub struct AttentionEnergy {
    wq: Arc<Array3<f32>>,
    wk: Arc<Array3<f32>>,
    beta: f32,
    exclude_self: bool,
}

impl AttentionEnergy {
    /// Build from `[H, D, Y]` query and key projections.
    ///
    /// `beta` defaults to `1/sqrt(Y)`. When `exclude_self` is set a token
    /// never attends to itself.
    pub fn new(
        wq: Array3<f32>,
        wk: Array3<f32>,
        beta: Option<f32>,
        exclude_self: bool,
    ) -> HopfieldResult<Self> {
        if wq.shape() != wk.shape() {
            return Err(HopfieldError::shape_mismatch(wq.shape(), wk.shape()));
        }
        if wq.shape().contains(&0) {
            return Err(HopfieldError::EmptyInput(format!(
                "attention projections must be non-empty, got {:?}",
                wq.shape()
            )));
        }
        let head_dim = wq.len_of(Axis(2));
        let beta = beta.unwrap_or_else(|| 1.0 / (head_dim as f32).sqrt());
        if !beta.is_finite() || beta <= 0.0 {
            return Err(HopfieldError::invalid_config(
                "attention beta must be positive and finite",
            ));
        }
        Ok(Self {
            wq: Arc::new(wq),
            wk: Arc::new(wk),
            beta,
            exclude_self,
        })
    }

    /// Number of heads `H`.
    pub fn num_heads(&self) -> usize {
        self.wq.len_of(Axis(0))
    }

    /// Per-head projection width `Y`.
    pub fn head_dim(&self) -> usize {
        self.wq.len_of(Axis(2))
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn exclude_self(&self) -> bool {
        self.exclude_self
    }

    pub fn wq(&self) -> ArrayView3<'_, f32> {
        self.wq.view()
    }

    pub fn wk(&self) -> ArrayView3<'_, f32> {
        self.wk.view()
    }

    fn check_tokens(&self, tokens: &ArrayView2<'_, f32>) -> HopfieldResult<()> {
        if tokens.ncols() != self.token_dim() {
            return Err(HopfieldError::DimensionMismatch {
                expected: self.token_dim(),
                actual: tokens.ncols(),
            });
        }
        let min_tokens = if self.exclude_self { 2 } else { 1 };
        if tokens.nrows() < min_tokens {
            return Err(HopfieldError::EmptyInput(format!(
                "attention energy needs at least {min_tokens} token(s), got {}",
                tokens.nrows()
            )));
        }
        Ok(())
    }
}

impl TokenEnergy for AttentionEnergy {
    fn token_dim(&self) -> usize {
        self.wq.len_of(Axis(1))
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        self.check_tokens(&tokens)?;
        let n = tokens.nrows();
        let mut energy = 0.0_f32;
        let mut grad = Array2::<f32>::zeros(tokens.raw_dim());

        for h in 0..self.num_heads() {
            let wq_h = self.wq.index_axis(Axis(0), h);
            let wk_h = self.wk.index_axis(Axis(0), h);
            let q = tokens.dot(&wq_h);
            let k = tokens.dot(&wk_h);
            // scores[b, c] = K_b · Q_c
            let scores = k.dot(&q.t());

            let mut probs = Array2::<f32>::zeros((n, n));
            for c in 0..n {
                let column: Vec<f32> = scores.column(c).iter().map(|&s| self.beta * s).collect();
                let exclude_self = self.exclude_self;
                let keep = |b: usize| !(exclude_self && b == c);
                let Some((lse, p)) = masked_lse_softmax(&column, keep) else {
                    return Err(HopfieldError::NumericalInstability(format!(
                        "no admissible keys for token {c}"
                    )));
                };
                energy -= lse / self.beta;
                probs.column_mut(c).assign(&Array1::from(p));
            }

            let d_k = -probs.dot(&q);
            let d_q = -probs.t().dot(&k);
            grad += &d_k.dot(&wk_h.t());
            grad += &d_q.dot(&wq_h.t());
        }

        Ok((energy, grad))
    }
}
