//! Configuration types for recall and energy construction.
//!
//! Every config derives `Serialize`/`Deserialize` and can be built field by
//! field. Configs with constraints check them in `validate()`, which
//! `from_json_file` also runs.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::energy::{
    check_beta, check_degree, ExponentialEnergy, PatternEnergy, QuadraticEnergy,
    RectifiedPolynomialEnergy,
};
use crate::error::{HopfieldError, HopfieldResult};
use crate::layernorm::DEFAULT_EPS;
use crate::state::PatternMatrix;

/// Read and deserialize a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> HopfieldResult<T> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| HopfieldError::io(path, source))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Settings for [`discrete_recall`](crate::dynamics::discrete_recall).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteRecallConfig {
    /// Number of proposed single-coordinate flips.
    pub num_steps: usize,
    /// Seed of the coordinate sequence.
    pub seed: u64,
}

impl Default for DiscreteRecallConfig {
    fn default() -> Self {
        Self {
            num_steps: 10_000,
            seed: 0,
        }
    }
}

impl DiscreteRecallConfig {
    pub fn new(num_steps: usize, seed: u64) -> Self {
        Self { num_steps, seed }
    }

    pub fn num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Any step count, including zero, is a valid budget, so loading only
    /// has to parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> HopfieldResult<Self> {
        read_json(path.as_ref())
    }
}

/// Settings for [`continuous_recall`](crate::dynamics::continuous_recall).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousRecallConfig {
    /// Number of gradient steps.
    pub num_steps: usize,
    /// Step size α of `x ← x − α·∂E/∂g`.
    pub step_size: f32,
}

impl Default for ContinuousRecallConfig {
    fn default() -> Self {
        Self {
            num_steps: 12,
            step_size: 0.1,
        }
    }
}

impl ContinuousRecallConfig {
    pub fn new(num_steps: usize, step_size: f32) -> Self {
        Self {
            num_steps,
            step_size,
        }
    }

    pub fn num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn step_size(mut self, step_size: f32) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn validate(&self) -> HopfieldResult<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(HopfieldError::invalid_config(
                "step_size must be positive and finite",
            ));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> HopfieldResult<Self> {
        let cfg: Self = read_json(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Which pattern energy to build over a [`PatternMatrix`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnergyKind {
    /// `−½ Σ (Ξ·σ)²`
    Quadratic,
    /// `−Σ F_n(Ξ·σ)`
    Polynomial { degree: u32, rectified: bool },
    /// `−log Σ exp(β·Ξ·σ)`
    Exponential { beta: f64 },
}

impl Default for EnergyKind {
    fn default() -> Self {
        Self::Quadratic
    }
}

impl EnergyKind {
    /// Check the parameters without building anything.
    pub fn validate(&self) -> HopfieldResult<()> {
        match *self {
            EnergyKind::Quadratic => Ok(()),
            EnergyKind::Polynomial { degree, .. } => check_degree(degree),
            EnergyKind::Exponential { beta } => check_beta(beta),
        }
    }

    /// Build the energy over `patterns`.
    pub fn build(&self, patterns: PatternMatrix) -> HopfieldResult<PatternEnergy> {
        Ok(match *self {
            EnergyKind::Quadratic => QuadraticEnergy::new(patterns).into(),
            EnergyKind::Polynomial { degree, rectified } => {
                RectifiedPolynomialEnergy::new(patterns, degree, rectified)?.into()
            }
            EnergyKind::Exponential { beta } => ExponentialEnergy::new(patterns, beta)?.into(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> HopfieldResult<Self> {
        let kind: Self = read_json(path.as_ref())?;
        kind.validate()?;
        Ok(kind)
    }
}

/// Shape and hyper-parameters of an
/// [`EnergyTransformer`](crate::transformer::EnergyTransformer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyTransformerConfig {
    /// Token width `D`.
    pub token_dim: usize,
    /// Number of attention heads `H`.
    pub num_heads: usize,
    /// Per-head projection width `Y`.
    pub head_dim: usize,
    /// Number of memories `M` in the Hopfield term.
    pub num_memories: usize,
    /// Attention inverse temperature; `1/sqrt(head_dim)` when absent.
    pub beta: Option<f32>,
    /// Keep tokens from attending to themselves.
    pub exclude_self: bool,
    /// Variance floor of the layer norm.
    pub norm_eps: f32,
}

impl EnergyTransformerConfig {
    pub fn builder() -> EnergyTransformerConfigBuilder {
        EnergyTransformerConfigBuilder::default()
    }

    pub fn validate(&self) -> HopfieldResult<()> {
        for (name, value) in [
            ("token_dim", self.token_dim),
            ("num_heads", self.num_heads),
            ("head_dim", self.head_dim),
            ("num_memories", self.num_memories),
        ] {
            if value == 0 {
                return Err(HopfieldError::invalid_config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if let Some(beta) = self.beta {
            if !beta.is_finite() || beta <= 0.0 {
                return Err(HopfieldError::invalid_config(
                    "beta must be positive and finite",
                ));
            }
        }

        if !self.norm_eps.is_finite() || self.norm_eps <= 0.0 {
            return Err(HopfieldError::invalid_config(
                "norm_eps must be positive and finite",
            ));
        }

        Ok(())
    }

    /// Returns the effective attention inverse temperature.
    #[inline]
    pub fn effective_beta(&self) -> f32 {
        self.beta
            .unwrap_or_else(|| 1.0 / (self.head_dim as f32).sqrt())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> HopfieldResult<Self> {
        let cfg: Self = read_json(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn missing(name: &str) -> HopfieldError {
    HopfieldError::invalid_config(format!("{name} must be specified"))
}

/// Builder for [`EnergyTransformerConfig`].
#[derive(Default)]
pub struct EnergyTransformerConfigBuilder {
    token_dim: Option<usize>,
    num_heads: Option<usize>,
    head_dim: Option<usize>,
    num_memories: Option<usize>,
    beta: Option<f32>,
    exclude_self: bool,
    norm_eps: Option<f32>,
}

impl EnergyTransformerConfigBuilder {
    pub fn token_dim(mut self, token_dim: usize) -> Self {
        self.token_dim = Some(token_dim);
        self
    }

    pub fn num_heads(mut self, num_heads: usize) -> Self {
        self.num_heads = Some(num_heads);
        self
    }

    pub fn head_dim(mut self, head_dim: usize) -> Self {
        self.head_dim = Some(head_dim);
        self
    }

    pub fn num_memories(mut self, num_memories: usize) -> Self {
        self.num_memories = Some(num_memories);
        self
    }

    pub fn beta(mut self, beta: f32) -> Self {
        self.beta = Some(beta);
        self
    }

    pub fn exclude_self(mut self, exclude_self: bool) -> Self {
        self.exclude_self = exclude_self;
        self
    }

    pub fn norm_eps(mut self, norm_eps: f32) -> Self {
        self.norm_eps = Some(norm_eps);
        self
    }

    pub fn build(self) -> HopfieldResult<EnergyTransformerConfig> {
        let config = EnergyTransformerConfig {
            token_dim: self.token_dim.ok_or_else(|| missing("token_dim"))?,
            num_heads: self.num_heads.ok_or_else(|| missing("num_heads"))?,
            head_dim: self.head_dim.ok_or_else(|| missing("head_dim"))?,
            num_memories: self.num_memories.ok_or_else(|| missing("num_memories"))?,
            beta: self.beta,
            exclude_self: self.exclude_self,
            norm_eps: self.norm_eps.unwrap_or(DEFAULT_EPS),
        };

        config.validate()?;
        Ok(config)
    }
}
