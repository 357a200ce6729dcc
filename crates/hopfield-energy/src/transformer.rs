//! Energy Transformer: attention energy plus Hopfield memory energy over the
//! same layer-normalized tokens.
//!
//! Token embedding, positional encoding and mask substitution happen before
//! tokens reach this model; the model only sees `N×D` token matrices.

use ndarray::{Array2, Array3, ArrayView2};
use rand::Rng;

use crate::config::{ContinuousRecallConfig, EnergyTransformerConfig};
use crate::dynamics::{continuous_recall_batch, continuous_recall_with, ContinuousRecall};
use crate::energy::{AttentionEnergy, CompositeEnergy, MemoryEnergy, TokenEnergy};
use crate::error::{HopfieldError, HopfieldResult};
use crate::layernorm::EnergyLayerNorm;
use crate::noise::{gaussian_array3, gaussian_matrix};

/// Attention and memory energies sharing one normalization.
#[derive(Clone, Debug)]
pub struct EnergyTransformer {
    attention: AttentionEnergy,
    memory: MemoryEnergy,
    energy: CompositeEnergy,
    norm: EnergyLayerNorm,
}

impl EnergyTransformer {
    /// Assemble from already-built terms.
    pub fn new(
        attention: AttentionEnergy,
        memory: MemoryEnergy,
        norm: EnergyLayerNorm,
    ) -> HopfieldResult<Self> {
        if let Some(d) = norm.dim() {
            if d != attention.token_dim() {
                return Err(HopfieldError::DimensionMismatch {
                    expected: attention.token_dim(),
                    actual: d,
                });
            }
        }
        let terms = vec![attention.clone().into(), memory.clone().into()];
        let energy = CompositeEnergy::new(terms)?;
        Ok(Self {
            attention,
            memory,
            energy,
            norm,
        })
    }

    /// Build from `W_Q`, `W_K` (`[H, D, Y]`) and memories `Ξ` (`[M, D]`).
    ///
    /// `beta` defaults to `1/sqrt(Y)`.
    pub fn from_weights(
        wq: Array3<f32>,
        wk: Array3<f32>,
        xi: Array2<f32>,
        beta: Option<f32>,
        exclude_self: bool,
        norm: EnergyLayerNorm,
    ) -> HopfieldResult<Self> {
        let attention = AttentionEnergy::new(wq, wk, beta, exclude_self)?;
        let memory = MemoryEnergy::new(xi)?;
        Self::new(attention, memory, norm)
    }

    /// Randomly initialized model with `N(0, std²)` weights.
    pub fn random(
        config: &EnergyTransformerConfig,
        std: f32,
        rng: &mut impl Rng,
    ) -> HopfieldResult<Self> {
        config.validate()?;
        let (h, d, y) = (config.num_heads, config.token_dim, config.head_dim);
        let wq = gaussian_array3(h, d, y, std, rng)?;
        let wk = gaussian_array3(h, d, y, std, rng)?;
        let xi = gaussian_matrix(config.num_memories, d, std, rng)?;
        let norm = EnergyLayerNorm::new(1.0, None, config.norm_eps)?;
        let beta = Some(config.effective_beta());
        Self::from_weights(wq, wk, xi, beta, config.exclude_self, norm)
    }

    pub fn attention(&self) -> &AttentionEnergy {
        &self.attention
    }

    pub fn memory(&self) -> &MemoryEnergy {
        &self.memory
    }

    pub fn norm(&self) -> &EnergyLayerNorm {
        &self.norm
    }

    /// The composite energy handed to the recall loop.
    pub fn composite(&self) -> &CompositeEnergy {
        &self.energy
    }

    /// Attention and memory energies of the normalized `tokens`.
    pub fn term_energies(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, f32)> {
        let g = self.norm.forward(tokens)?;
        let attention = self.attention.energy(g.view())?;
        let memory = self.memory.energy(g.view())?;
        Ok((attention, memory))
    }

    /// Total energy of the raw `tokens` after normalization.
    pub fn token_energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        let g = self.norm.forward(tokens)?;
        self.energy.energy(g.view())
    }

    /// Run continuous recall on one token matrix.
    pub fn recall(
        &self,
        tokens: ArrayView2<'_, f32>,
        config: &ContinuousRecallConfig,
    ) -> HopfieldResult<ContinuousRecall> {
        continuous_recall_with(&self.energy, &self.norm, tokens, config)
    }

    /// Run continuous recall on several token matrices in parallel.
    pub fn recall_batch(
        &self,
        batch: &[Array2<f32>],
        config: &ContinuousRecallConfig,
    ) -> HopfieldResult<Vec<ContinuousRecall>> {
        continuous_recall_batch(&self.energy, &self.norm, batch, config)
    }
}

impl TokenEnergy for EnergyTransformer {
    fn token_dim(&self) -> usize {
        self.energy.token_dim()
    }

    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        self.energy.energy(tokens)
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        self.energy.energy_and_grad(tokens)
    }
}
