//! Retrieval observables: Hamming distance, overlap, energy monotonicity.

use ndarray::ArrayView1;

use crate::error::{HopfieldError, HopfieldResult};

fn check_same_len(a: usize, b: usize) -> HopfieldResult<()> {
    if a != b {
        return Err(HopfieldError::DimensionMismatch {
            expected: a,
            actual: b,
        });
    }
    Ok(())
}

/// Number of positions where the signs of `a` and `b` differ.
pub fn hamming_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> HopfieldResult<usize> {
    check_same_len(a.len(), b.len())?;
    Ok(a.iter()
        .zip(b.iter())
        .filter(|(x, y)| (**x < 0.0) != (**y < 0.0))
        .count())
}

/// Distance to `pattern` or to its sign inversion, whichever is smaller.
///
/// Useful with the quadratic energy, whose minima come in `±ξ` pairs.
pub fn sign_invariant_distance(
    state: ArrayView1<'_, f32>,
    pattern: ArrayView1<'_, f32>,
) -> HopfieldResult<usize> {
    let d = hamming_distance(state, pattern)?;
    Ok(d.min(state.len() - d))
}

/// Pattern overlap (Hopfield order parameter):
///   m = (1/D) Σᵢ ξᵢ σᵢ
///
/// Returns `None` if lengths differ or both are empty.
pub fn overlap(state: ArrayView1<'_, f32>, pattern: ArrayView1<'_, f32>) -> Option<f32> {
    let n = state.len();
    if pattern.len() != n || n == 0 {
        return None;
    }
    Some(state.dot(&pattern) / n as f32)
}

/// True if no energy exceeds its predecessor by more than `tol`.
pub fn is_non_increasing(energies: &[f64], tol: f64) -> bool {
    energies.windows(2).all(|w| w[1] <= w[0] + tol)
}
