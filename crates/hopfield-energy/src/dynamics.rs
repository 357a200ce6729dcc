//! Recall dynamics: asynchronous bit-flip descent (discrete) and normalized
//! gradient descent (continuous).
//!
//! Both loops run a fixed step budget with no early exit and return the full
//! trajectory alongside the final state.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, instrument, trace, warn};

use crate::config::{ContinuousRecallConfig, DiscreteRecallConfig};
use crate::energy::{EnergyModel, TokenEnergy};
use crate::error::{HopfieldError, HopfieldResult};
use crate::layernorm::EnergyLayerNorm;
use crate::state::check_bipolar;

// ── Discrete ─────────────────────────────────────────────────────────────────

/// Result of one proposed flip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlipOutcome {
    /// Coordinate that was proposed.
    pub index: usize,
    /// Whether the flip was kept.
    pub accepted: bool,
    /// Energy of the state after the step.
    pub energy: f64,
}

/// Trajectory of a [`discrete_recall`] call.
///
/// Holds one row per step; the initial query is not included.
#[derive(Clone, Debug)]
pub struct DiscreteRecall {
    /// State after the last step.
    pub final_state: Array1<f32>,
    /// `[num_steps, D]` state after each step.
    pub states: Array2<f32>,
    /// Energy after each step.
    pub energies: Array1<f64>,
    /// Number of steps whose flip was kept.
    pub accepted_flips: usize,
}

impl DiscreteRecall {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Energy after the last step, if any step ran.
    pub fn final_energy(&self) -> Option<f64> {
        self.energies.last().copied()
    }
}

/// Propose flipping one uniformly drawn coordinate of `state`.
///
/// `energy` must be the energy of `state` on entry. The flip is kept only if
/// it strictly lowers the energy; ties keep the current state.
pub fn step_discrete<M: EnergyModel + ?Sized>(
    model: &M,
    state: &mut Array1<f32>,
    energy: f64,
    rng: &mut impl Rng,
) -> HopfieldResult<FlipOutcome> {
    let n = state.len();
    if n == 0 {
        return Err(HopfieldError::EmptyInput(
            "cannot flip an empty state".into(),
        ));
    }
    let i: usize = rng.gen_range(0..n);

    let old_si = state[i];
    state[i] = -old_si;
    let new_e = model.energy(state.view())?;

    if new_e - energy < 0.0 {
        Ok(FlipOutcome {
            index: i,
            accepted: true,
            energy: new_e,
        })
    } else {
        state[i] = old_si;
        Ok(FlipOutcome {
            index: i,
            accepted: false,
            energy,
        })
    }
}

/// Drive a bipolar query toward a stored pattern by asynchronous flips.
///
/// Each of the `num_steps` steps draws a coordinate from a generator seeded
/// with `seed` (indices may repeat) and applies [`step_discrete`]. The same
/// seed always yields the same trajectory, and the recorded energies never
/// increase.
///
/// Fails before the first step if `initial` has the wrong length or holds
/// anything other than `±1`.
#[instrument(level = "debug", skip(model, initial), fields(dim = initial.len()))]
pub fn discrete_recall<M: EnergyModel + ?Sized>(
    model: &M,
    initial: ArrayView1<'_, f32>,
    num_steps: usize,
    seed: u64,
) -> HopfieldResult<DiscreteRecall> {
    if initial.len() != model.dim() {
        return Err(HopfieldError::DimensionMismatch {
            expected: model.dim(),
            actual: initial.len(),
        });
    }
    check_bipolar(initial)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = initial.to_owned();
    let mut energy = model.energy(state.view())?;
    let initial_energy = energy;

    let mut states = Array2::<f32>::zeros((num_steps, state.len()));
    let mut energies = Vec::with_capacity(num_steps);
    let mut accepted = 0usize;

    for (step, mut row) in states.axis_iter_mut(Axis(0)).enumerate() {
        let outcome = step_discrete(model, &mut state, energy, &mut rng)?;
        if outcome.accepted {
            accepted += 1;
            trace!(
                step,
                index = outcome.index,
                energy = outcome.energy,
                "flip accepted"
            );
        }
        energy = outcome.energy;
        row.assign(&state);
        energies.push(energy);
    }

    debug!(
        num_steps,
        accepted,
        initial_energy,
        final_energy = energy,
        "discrete recall finished"
    );

    Ok(DiscreteRecall {
        final_state: state,
        states,
        energies: Array1::from(energies),
        accepted_flips: accepted,
    })
}

/// [`discrete_recall`] driven by a [`DiscreteRecallConfig`].
pub fn discrete_recall_with<M: EnergyModel + ?Sized>(
    model: &M,
    initial: ArrayView1<'_, f32>,
    config: &DiscreteRecallConfig,
) -> HopfieldResult<DiscreteRecall> {
    discrete_recall(model, initial, config.num_steps, config.seed)
}

/// Seed used for row `index` of a batched recall.
///
/// Row 0 uses `seed` itself, so a batch of one reproduces [`discrete_recall`].
#[inline]
pub fn batch_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Recall every row of `queries` in parallel.
///
/// Row `b` runs exactly `discrete_recall(model, queries.row(b), num_steps,
/// batch_seed(seed, b))`; rows share nothing but the read-only energy.
pub fn discrete_recall_batch<M: EnergyModel + ?Sized>(
    model: &M,
    queries: ArrayView2<'_, f32>,
    num_steps: usize,
    seed: u64,
) -> HopfieldResult<Vec<DiscreteRecall>> {
    (0..queries.nrows())
        .into_par_iter()
        .map(|b| {
            let row_seed = batch_seed(seed, b);
            discrete_recall(model, queries.row(b), num_steps, row_seed)
        })
        .collect()
}

// ── Continuous ───────────────────────────────────────────────────────────────

/// Trajectory of a [`continuous_recall`] call.
///
/// Unlike [`DiscreteRecall`] this includes the final state: `num_steps + 1`
/// entries, the last one evaluated after the final update.
#[derive(Clone, Debug)]
pub struct ContinuousRecall {
    /// Raw tokens after the last update.
    pub final_tokens: Array2<f32>,
    /// `[num_steps + 1, N, D]` normalized tokens fed to the energy.
    pub normalized_states: Array3<f32>,
    /// Energy of each normalized state.
    pub energies: Array1<f32>,
}

impl ContinuousRecall {
    /// Number of recorded entries (`num_steps + 1`).
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Energy of the final normalized state.
    pub fn final_energy(&self) -> Option<f32> {
        self.energies.last().copied()
    }
}

/// One gradient step: normalize, evaluate, then `x ← x − α·∂E/∂g`.
///
/// Returns the normalized tokens and the energy that were evaluated before
/// the update.
pub fn step_continuous<E: TokenEnergy + ?Sized>(
    energy: &E,
    norm: &EnergyLayerNorm,
    tokens: &mut Array2<f32>,
    step_size: f32,
) -> HopfieldResult<(Array2<f32>, f32)> {
    let normalized = norm.forward(tokens.view())?;
    let (e, grad) = energy.energy_and_grad(normalized.view())?;
    tokens.scaled_add(-step_size, &grad);
    Ok((normalized, e))
}

/// Fixed-step gradient descent of `energy` over normalized tokens.
///
/// Runs `num_steps` calls of [`step_continuous`], then normalizes and
/// evaluates the final tokens once more. No randomness is involved.
#[instrument(level = "debug", skip(energy, norm, initial), fields(tokens = initial.nrows()))]
pub fn continuous_recall<E: TokenEnergy + ?Sized>(
    energy: &E,
    norm: &EnergyLayerNorm,
    initial: ArrayView2<'_, f32>,
    num_steps: usize,
    step_size: f32,
) -> HopfieldResult<ContinuousRecall> {
    ContinuousRecallConfig::new(num_steps, step_size).validate()?;
    let (n, d) = initial.dim();
    if d != energy.token_dim() {
        return Err(HopfieldError::DimensionMismatch {
            expected: energy.token_dim(),
            actual: d,
        });
    }
    if n == 0 {
        return Err(HopfieldError::EmptyInput("no tokens to recall".into()));
    }

    let mut tokens = initial.to_owned();
    let mut states = Array3::<f32>::zeros((num_steps + 1, n, d));
    let mut energies = Vec::with_capacity(num_steps + 1);

    for t in 0..num_steps {
        let (g, e) = step_continuous(energy, norm, &mut tokens, step_size)?;
        states.index_axis_mut(Axis(0), t).assign(&g);
        energies.push(e);
    }

    let g = norm.forward(tokens.view())?;
    let e = energy.energy(g.view())?;
    states.index_axis_mut(Axis(0), num_steps).assign(&g);
    energies.push(e);

    if !e.is_finite() {
        warn!(energy = e, "continuous recall ended at a non-finite energy");
    }
    debug!(
        num_steps,
        step_size,
        initial_energy = energies[0],
        final_energy = e,
        "continuous recall finished"
    );

    Ok(ContinuousRecall {
        final_tokens: tokens,
        normalized_states: states,
        energies: Array1::from(energies),
    })
}

/// [`continuous_recall`] driven by a [`ContinuousRecallConfig`].
pub fn continuous_recall_with<E: TokenEnergy + ?Sized>(
    energy: &E,
    norm: &EnergyLayerNorm,
    initial: ArrayView2<'_, f32>,
    config: &ContinuousRecallConfig,
) -> HopfieldResult<ContinuousRecall> {
    continuous_recall(energy, norm, initial, config.num_steps, config.step_size)
}

/// Recall several token matrices in parallel.
pub fn continuous_recall_batch<E: TokenEnergy + ?Sized>(
    energy: &E,
    norm: &EnergyLayerNorm,
    batch: &[Array2<f32>],
    config: &ContinuousRecallConfig,
) -> HopfieldResult<Vec<ContinuousRecall>> {
    batch
        .par_iter()
        .map(|t| continuous_recall_with(energy, norm, t.view(), config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{MemoryEnergy, QuadraticEnergy};
    use crate::state::PatternMatrix;
    use ndarray::array;
    use std::io::Write;

    fn quadratic() -> QuadraticEnergy {
        let xi = array![[1.0, -1.0, 1.0, -1.0, 1.0, -1.0]];
        QuadraticEnergy::new(PatternMatrix::new(xi).unwrap())
    }

    #[test]
    fn test_step_discrete_keeps_minimum() {
        let model = quadratic();
        let mut s = array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let e = model.energy(s.view()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            let out = step_discrete(&model, &mut s, e, &mut rng).unwrap();
            assert!(!out.accepted);
            assert_eq!(out.energy, e);
        }
    }

    #[test]
    fn test_step_discrete_accepts_descent() {
        let model = quadratic();
        // One bit away from the pattern: every proposal is either the fix
        // (accepted) or a further corruption (rejected).
        let mut s = array![-1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let mut e = model.energy(s.view()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let out = step_discrete(&model, &mut s, e, &mut rng).unwrap();
            assert!(out.energy <= e);
            assert_eq!(out.accepted, out.energy < e);
            e = out.energy;
        }
        assert_eq!(s, array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_discrete_recall_validates_before_running() {
        let model = quadratic();
        let short = array![1.0, 1.0];
        let err = discrete_recall(&model, short.view(), 10, 0).unwrap_err();
        assert!(matches!(err, HopfieldError::DimensionMismatch { .. }));

        let zero_spin = array![1.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let err = discrete_recall(&model, zero_spin.view(), 10, 0).unwrap_err();
        assert!(matches!(err, HopfieldError::InvalidState(_)));
    }

    #[test]
    fn test_discrete_recall_with_follows_config() {
        let model = quadratic();
        let q = array![-1.0, 1.0, 1.0, -1.0, 1.0, 1.0];
        let config = DiscreteRecallConfig::default().num_steps(40).seed(3);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_steps": 40, "seed": 3}}"#).unwrap();
        let loaded = DiscreteRecallConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);

        let via_config = discrete_recall_with(&model, q.view(), &loaded).unwrap();
        let direct = discrete_recall(&model, q.view(), 40, 3).unwrap();
        assert_eq!(via_config.len(), 40);
        assert_eq!(via_config.states, direct.states);
        assert_eq!(via_config.energies, direct.energies);
        assert_eq!(via_config.accepted_flips, direct.accepted_flips);
    }

    #[test]
    fn test_discrete_recall_zero_steps() {
        let model = quadratic();
        let q = array![1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let r = discrete_recall(&model, q.view(), 0, 1).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.states.dim(), (0, 6));
        assert_eq!(r.final_state, q);
        assert_eq!(r.final_energy(), None);
    }

    #[test]
    fn test_batch_seed_row_zero() {
        assert_eq!(batch_seed(42, 0), 42);
        assert_ne!(batch_seed(42, 1), batch_seed(42, 2));
    }

    #[test]
    fn test_accepted_flips_counts_changes() {
        let model = quadratic();
        let q = array![-1.0, 1.0, 1.0, -1.0, 1.0, -1.0];
        let r = discrete_recall(&model, q.view(), 300, 8).unwrap();
        // Two wrong bits, each fixed exactly once; correct bits never flip.
        assert_eq!(r.accepted_flips, 2);
        assert_eq!(r.final_state, array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_continuous_recall_lengths() {
        let mem = MemoryEnergy::new(array![[1.0, 0.0, -1.0], [0.0, 1.0, 0.0]]).unwrap();
        let norm = EnergyLayerNorm::default();
        let tokens = array![[0.2, 0.5, -0.1], [1.0, -0.3, 0.4]];
        let r = continuous_recall(&mem, &norm, tokens.view(), 4, 0.1).unwrap();
        assert_eq!(r.len(), 5);
        assert_eq!(r.normalized_states.dim(), (5, 2, 3));
        assert_eq!(r.final_tokens.dim(), (2, 3));
    }

    #[test]
    fn test_continuous_recall_rejects_bad_input() {
        let mem = MemoryEnergy::new(array![[1.0, 0.0, -1.0]]).unwrap();
        let norm = EnergyLayerNorm::default();
        let narrow = array![[0.1, 0.2]];
        let r = continuous_recall(&mem, &norm, narrow.view(), 3, 0.1);
        assert!(r.is_err());
        let tokens = array![[0.1, 0.2, 0.3]];
        let r = continuous_recall(&mem, &norm, tokens.view(), 3, -0.1);
        assert!(r.is_err());
        let empty = Array2::<f32>::zeros((0, 3));
        let r = continuous_recall(&mem, &norm, empty.view(), 3, 0.1);
        assert!(r.is_err());
    }
}
