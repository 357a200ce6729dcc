//! Finite sums of token energies.

use ndarray::{Array2, ArrayView2};

use super::{AttentionEnergy, MemoryEnergy, TokenEnergy};
use crate::error::{HopfieldError, HopfieldResult};

/// One term of a [`CompositeEnergy`].
#[derive(Clone, Debug)]
pub enum EnergyTerm {
    Attention(AttentionEnergy),
    Memory(MemoryEnergy),
}

impl TokenEnergy for EnergyTerm {
    fn token_dim(&self) -> usize {
        match self {
            EnergyTerm::Attention(e) => e.token_dim(),
            EnergyTerm::Memory(e) => e.token_dim(),
        }
    }

    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        match self {
            EnergyTerm::Attention(e) => e.energy(tokens),
            EnergyTerm::Memory(e) => e.energy(tokens),
        }
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        match self {
            EnergyTerm::Attention(e) => e.energy_and_grad(tokens),
            EnergyTerm::Memory(e) => e.energy_and_grad(tokens),
        }
    }
}

impl From<AttentionEnergy> for EnergyTerm {
    fn from(e: AttentionEnergy) -> Self {
        EnergyTerm::Attention(e)
    }
}

impl From<MemoryEnergy> for EnergyTerm {
    fn from(e: MemoryEnergy) -> Self {
        EnergyTerm::Memory(e)
    }
}

/// Sum of energy terms evaluated on the same tokens.
#[derive(Clone, Debug)]
pub struct CompositeEnergy {
    terms: Vec<EnergyTerm>,
    token_dim: usize,
}

impl CompositeEnergy {
    /// All terms must agree on the token width.
    pub fn new(terms: Vec<EnergyTerm>) -> HopfieldResult<Self> {
        let Some(first) = terms.first() else {
            return Err(HopfieldError::EmptyInput(
                "composite energy has no terms".into(),
            ));
        };
        let token_dim = first.token_dim();
        if let Some(bad) = terms.iter().find(|t| t.token_dim() != token_dim) {
            return Err(HopfieldError::DimensionMismatch {
                expected: token_dim,
                actual: bad.token_dim(),
            });
        }
        Ok(Self { terms, token_dim })
    }

    pub fn terms(&self) -> &[EnergyTerm] {
        &self.terms
    }

    /// Energy of each term separately, in term order.
    pub fn term_energies(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<Vec<f32>> {
        self.terms.iter().map(|t| t.energy(tokens)).collect()
    }
}

impl TokenEnergy for CompositeEnergy {
    fn token_dim(&self) -> usize {
        self.token_dim
    }

    fn energy(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<f32> {
        Ok(self.term_energies(tokens)?.into_iter().sum())
    }

    fn energy_and_grad(&self, tokens: ArrayView2<'_, f32>) -> HopfieldResult<(f32, Array2<f32>)> {
        let mut energy = 0.0_f32;
        let mut grad = Array2::<f32>::zeros(tokens.raw_dim());
        for term in &self.terms {
            let (e, g) = term.energy_and_grad(tokens)?;
            energy += e;
            grad += &g;
        }
        Ok((energy, grad))
    }
}
