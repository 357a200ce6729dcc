//! Numerical helpers shared by the energy implementations.
//!
//! Log-sum-exp is always evaluated with the running maximum subtracted before
//! exponentiating, so large inverse temperatures or many stored patterns do
//! not overflow.

/// Stable `log Σ exp(x_i)` in `f64`.
///
/// Returns `-inf` for an empty slice. A `+inf` entry yields `+inf`.
#[inline]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Log-sum-exp and softmax over the entries selected by `keep`.
///
/// Excluded entries get probability zero. Returns `None` when no entry is
/// kept, since the log of an empty sum is undefined.
pub fn masked_lse_softmax<F>(values: &[f32], keep: F) -> Option<(f32, Vec<f32>)>
where
    F: Fn(usize) -> bool,
{
    let max = values
        .iter()
        .enumerate()
        .filter(|(i, _)| keep(*i))
        .map(|(_, &v)| v)
        .fold(f32::NEG_INFINITY, f32::max);

    if max == f32::NEG_INFINITY {
        return None;
    }

    let mut probs: Vec<f32> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| if keep(i) { (v - max).exp() } else { 0.0 })
        .collect();

    let sum: f32 = probs.iter().sum();
    let inv_sum = 1.0 / sum;
    probs.iter_mut().for_each(|p| *p *= inv_sum);

    Some((max + sum.ln(), probs))
}

/// Rectified linear unit.
#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_sum_exp_matches_naive() {
        let xs = [0.5, -1.0, 2.0, 0.0];
        let naive: f64 = xs.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert_relative_eq!(log_sum_exp(&xs), naive, epsilon = 1e-12);
    }

    #[test]
    fn test_log_sum_exp_large_values() {
        // exp(5000) overflows f64; the stabilised form does not.
        let xs = [5000.0, 4999.0, 10.0];
        let lse = log_sum_exp(&xs);
        assert!(lse.is_finite());
        assert_relative_eq!(lse, 5000.0 + (1.0 + (-1.0f64).exp()).ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_log_sum_exp_empty() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_masked_softmax() {
        let (lse, p) = masked_lse_softmax(&[1.0, 100.0, 1.0], |i| i != 1).unwrap();
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-6);
        assert_eq!(p[1], 0.0);
        assert_relative_eq!(p[2], 0.5, epsilon = 1e-6);
        assert_relative_eq!(lse, 1.0 + 2.0f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_masked_softmax_all_excluded() {
        assert!(masked_lse_softmax(&[1.0], |_| false).is_none());
    }

    #[test]
    fn test_relu() {
        assert_eq!(relu(-2.0), 0.0);
        assert_eq!(relu(3.5), 3.5);
    }
}
