//! Stored memories and bipolar query states.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{HopfieldError, HopfieldResult};

/// `K×D` matrix of stored `±1` patterns (one pattern per row).
///
/// The data sits behind an [`Arc`], so cloning a `PatternMatrix` (or any
/// energy built from it) shares the same memory across recall calls.
#[derive(Clone, Debug)]
pub struct PatternMatrix {
    data: Arc<Array2<f32>>,
}

impl PatternMatrix {
    /// Wrap a `K×D` matrix, checking that it is non-empty and bipolar.
    pub fn new(patterns: Array2<f32>) -> HopfieldResult<Self> {
        let (k, d) = patterns.dim();
        if k == 0 || d == 0 {
            return Err(HopfieldError::EmptyInput(format!(
                "pattern matrix must be non-empty, got {k}x{d}"
            )));
        }
        if let Some((row, col)) = first_non_bipolar(patterns.view()) {
            return Err(HopfieldError::InvalidState(format!(
                "pattern {row} has non-bipolar entry {} at {col}",
                patterns[[row, col]]
            )));
        }
        Ok(Self {
            data: Arc::new(patterns),
        })
    }

    /// Build from a list of equally long pattern vectors.
    pub fn from_rows(rows: &[Vec<f32>]) -> HopfieldResult<Self> {
        let d = rows.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * d);
        for row in rows {
            if row.len() != d {
                return Err(HopfieldError::DimensionMismatch {
                    expected: d,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let patterns = Array2::from_shape_vec((rows.len(), d), flat)
            .map_err(|e| HopfieldError::invalid_config(e.to_string()))?;
        Self::new(patterns)
    }

    /// Number of stored patterns `K`.
    #[inline]
    pub fn num_patterns(&self) -> usize {
        self.data.nrows()
    }

    /// Pattern length `D`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Borrow the whole matrix.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Borrow pattern `mu`.
    pub fn pattern(&self, mu: usize) -> Option<ArrayView1<'_, f32>> {
        (mu < self.num_patterns()).then(|| self.data.row(mu))
    }

    /// Overlaps `Ξ·σ` of `state` with every stored pattern.
    ///
    /// `state` must already have length `D`; energies check that before
    /// calling this.
    #[inline]
    pub(crate) fn overlaps(&self, state: ArrayView1<'_, f32>) -> Array1<f32> {
        self.data.dot(&state)
    }

    /// Fail with [`HopfieldError::DimensionMismatch`] unless `len == D`.
    pub fn check_dim(&self, len: usize) -> HopfieldResult<()> {
        if len != self.dim() {
            return Err(HopfieldError::DimensionMismatch {
                expected: self.dim(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// True if every entry is exactly `+1` or `-1`.
pub fn is_bipolar(state: ArrayView1<'_, f32>) -> bool {
    state.iter().all(|&x| x == 1.0 || x == -1.0)
}

/// Fail with [`HopfieldError::InvalidState`] unless `state` is bipolar.
pub fn check_bipolar(state: ArrayView1<'_, f32>) -> HopfieldResult<()> {
    match state.iter().position(|&x| x != 1.0 && x != -1.0) {
        None => Ok(()),
        Some(i) => Err(HopfieldError::InvalidState(format!(
            "entry {i} is {}, expected ±1",
            state[i]
        ))),
    }
}

fn first_non_bipolar(m: ArrayView2<'_, f32>) -> Option<(usize, usize)> {
    m.indexed_iter()
        .find(|(_, &x)| x != 1.0 && x != -1.0)
        .map(|(idx, _)| idx)
}
