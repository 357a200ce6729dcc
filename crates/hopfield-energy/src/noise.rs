//! Seeded pattern generation and query corruption.
//!
//! These produce the noisy or masked inputs that recall starts from. All
//! randomness comes from the caller's generator.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{HopfieldError, HopfieldResult};

/// `k` i.i.d. uniform `±1` patterns of length `d`.
pub fn random_patterns(k: usize, d: usize, rng: &mut impl Rng) -> Array2<f32> {
    Array2::from_shape_simple_fn((k, d), || if rng.gen::<bool>() { 1.0 } else { -1.0 })
}

/// Copy of `pattern` with exactly `round(fraction·D)` distinct entries
/// sign-flipped.
pub fn flip_fraction(
    pattern: ArrayView1<'_, f32>,
    fraction: f64,
    rng: &mut impl Rng,
) -> HopfieldResult<Array1<f32>> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(HopfieldError::invalid_config(format!(
            "flip fraction must be in [0, 1], got {fraction}"
        )));
    }
    let d = pattern.len();
    let n_flips = (fraction * d as f64).round() as usize;
    let mut out = pattern.to_owned();
    for i in sample(rng, d, n_flips.min(d)).iter() {
        out[i] = -out[i];
    }
    Ok(out)
}

/// `rows×cols` matrix of `N(0, std²)` samples.
pub fn gaussian_matrix(
    rows: usize,
    cols: usize,
    std: f32,
    rng: &mut impl Rng,
) -> HopfieldResult<Array2<f32>> {
    let dist = normal(std)?;
    let samples = Array2::from_shape_simple_fn((rows, cols), || dist.sample(rng));
    Ok(samples)
}

/// `a×b×c` tensor of `N(0, std²)` samples, e.g. per-head projections.
pub fn gaussian_array3(
    a: usize,
    b: usize,
    c: usize,
    std: f32,
    rng: &mut impl Rng,
) -> HopfieldResult<Array3<f32>> {
    let dist = normal(std)?;
    Ok(Array3::from_shape_simple_fn((a, b, c), || dist.sample(rng)))
}

/// Copy of `tokens` with each row listed in `rows` replaced by `mask_token`.
pub fn mask_tokens(
    tokens: ArrayView2<'_, f32>,
    rows: &[usize],
    mask_token: ArrayView1<'_, f32>,
) -> HopfieldResult<Array2<f32>> {
    if mask_token.len() != tokens.ncols() {
        return Err(HopfieldError::DimensionMismatch {
            expected: tokens.ncols(),
            actual: mask_token.len(),
        });
    }
    let mut out = tokens.to_owned();
    for &r in rows {
        if r >= out.nrows() {
            return Err(HopfieldError::invalid_config(format!(
                "mask row {r} out of range for {} tokens",
                out.nrows()
            )));
        }
        out.row_mut(r).assign(&mask_token);
    }
    Ok(out)
}

fn normal(std: f32) -> HopfieldResult<Normal<f32>> {
    if !std.is_finite() || std < 0.0 {
        return Err(HopfieldError::invalid_config(
            "standard deviation must be non-negative and finite",
        ));
    }
    Normal::new(0.0_f32, std).map_err(|e| HopfieldError::invalid_config(e.to_string()))
}
