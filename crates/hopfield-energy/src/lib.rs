//! # hopfield-energy
//!
//! Associative-memory energy engines for Rust.
//!
//! Retrieval is treated as **energy descent**: a corrupted query is moved
//! downhill on an energy landscape whose minima sit at stored patterns.
//! Two state spaces are supported:
//!
//! - bipolar (`±1`) vectors, relaxed by asynchronous single-bit flips
//!   ([`dynamics::discrete_recall`]);
//! - real-valued `N×D` token matrices, relaxed by gradient descent through an
//!   energy-derived layer norm ([`dynamics::continuous_recall`]).
//!
//! ## Core abstractions
//!
//! | Module | What it provides |
//! |--------|-----------------|
//! | [`state`] | `PatternMatrix` – immutable `K×D` bipolar patterns |
//! | [`energy`] | `EnergyModel` / `TokenEnergy` traits and their implementations |
//! | [`layernorm`] | `EnergyLayerNorm` – normalization as the gradient of a scalar potential |
//! | [`dynamics`] | Discrete and continuous recall loops, batched over rayon |
//! | [`transformer`] | `EnergyTransformer` – attention plus memory over normalized tokens |
//! | [`checkpoint`] | Loading trained weights from a JSON bundle |
//! | [`config`] | Serde-backed recall and model configuration |
//! | [`noise`] | Seeded pattern generation, bit flips, token masking |
//! | [`metrics`] | Hamming distance, overlap, monotonicity checks |
//! | [`numeric`] | Stable log-sum-exp and masked softmax |
//!
//! ## Quick start
//!
//! ```no_run
//! use hopfield_energy::{
//!     discrete_recall, noise, sign_invariant_distance, ExponentialEnergy, PatternMatrix,
//! };
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let patterns = PatternMatrix::new(noise::random_patterns(8, 64, &mut rng))?;
//! let target = patterns.pattern(0).unwrap().to_owned();
//! let query = noise::flip_fraction(target.view(), 0.2, &mut rng)?;
//!
//! let energy = ExponentialEnergy::new(patterns, 1.0)?;
//! let recall = discrete_recall(&energy, query.view(), 2_000, 7)?;
//!
//! println!("final energy:  {:?}", recall.final_energy());
//! let wrong = sign_invariant_distance(recall.final_state.view(), target.view())?;
//! println!("bits wrong:    {wrong}");
//! # Ok::<(), hopfield_energy::HopfieldError>(())
//! ```

pub mod checkpoint;
pub mod config;
pub mod dynamics;
pub mod energy;
pub mod error;
pub mod layernorm;
pub mod metrics;
pub mod noise;
pub mod numeric;
pub mod state;
pub mod transformer;

// Re-export the most commonly used items at the crate root.
pub use checkpoint::{ArrayRecord, CheckpointBundle, CheckpointDims};
pub use config::{
    ContinuousRecallConfig, DiscreteRecallConfig, EnergyKind, EnergyTransformerConfig,
};
pub use dynamics::{
    continuous_recall, continuous_recall_batch, discrete_recall, discrete_recall_batch,
    step_continuous, step_discrete, ContinuousRecall, DiscreteRecall, FlipOutcome,
};
pub use energy::{
    AttentionEnergy, CompositeEnergy, EnergyModel, EnergyTerm, ExponentialEnergy, MemoryEnergy,
    PatternEnergy, QuadraticEnergy, RectifiedPolynomialEnergy, TokenEnergy,
};
pub use error::{HopfieldError, HopfieldResult};
pub use layernorm::EnergyLayerNorm;
pub use metrics::{hamming_distance, overlap, sign_invariant_distance};
pub use state::PatternMatrix;
pub use transformer::EnergyTransformer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
