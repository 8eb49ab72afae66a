//! Multiple hypothesis correction
//!
//! Every enrichment request tests many annotations at once. The raw p-values
//! are adjusted with the Benjamini-Hochberg procedure, controlling the false
//! discovery rate across all tests of the request.

use crate::stats::f64_from_usize;

/// Adjusts p-values with the Benjamini-Hochberg step-up procedure
///
/// The adjusted p-values are returned in the same order as `pvalues`.
/// They never exceed `1.0` and never decrease with increasing raw p-value.
///
/// # Examples
///
/// ```
/// use npenrich::stats::correction::benjamini_hochberg;
///
/// let adjusted = benjamini_hochberg(&[0.04, 0.01, 0.5]);
/// assert!((adjusted[0] - 0.06).abs() < 1e-12);
/// assert!((adjusted[1] - 0.03).abs() < 1e-12);
/// assert!((adjusted[2] - 0.5).abs() < 1e-12);
///
/// assert!(benjamini_hochberg(&[]).is_empty());
/// ```
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let m = pvalues.len();
    let n_tests = f64_from_usize(m);

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));

    let mut adjusted = vec![1.0; m];
    let mut cumulative_min = 1.0f64;
    for (idx, candidate) in order.iter().enumerate().rev() {
        let rank = f64_from_usize(idx + 1);
        cumulative_min = cumulative_min.min(pvalues[*candidate] * n_tests / rank);
        adjusted[*candidate] = cumulative_min;
    }
    adjusted
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty() {
        assert!(benjamini_hochberg(&[]).is_empty());
    }

    #[test]
    fn single_test() {
        assert_eq!(benjamini_hochberg(&[0.2]), vec![0.2]);
        assert_eq!(benjamini_hochberg(&[1.0]), vec![1.0]);
    }

    #[test]
    fn step_up() {
        let raw = [0.01, 0.02, 0.03, 0.04, 0.50];
        let adjusted = benjamini_hochberg(&raw);
        let expected = [0.05, 0.05, 0.05, 0.05, 0.5];
        for (adj, exp) in adjusted.iter().zip(expected) {
            assert!((adj - exp).abs() < 1e-12, "{adjusted:?}");
        }
        assert!(adjusted.windows(2).all(|w| w[0] <= w[1]));
        assert!(adjusted.iter().all(|p| *p <= 1.0));

        // the smallest p-value gets the minimum of all raw adjustments
        let m = 5.0;
        let running_min = raw
            .iter()
            .enumerate()
            .map(|(idx, p)| p * m / (idx as f64 + 1.0))
            .fold(1.0f64, f64::min);
        assert!((adjusted[0] - running_min).abs() < 1e-12);
    }

    #[test]
    fn keeps_input_order() {
        let adjusted = benjamini_hochberg(&[0.5, 0.03, 0.01, 0.04, 0.02]);
        let expected = [0.5, 0.05, 0.05, 0.05, 0.05];
        for (adj, exp) in adjusted.iter().zip(expected) {
            assert!((adj - exp).abs() < 1e-12, "{adjusted:?}");
        }
    }

    #[test]
    fn monotone_after_correction() {
        // raw adjustments 0.03, 0.0225 and 0.02 decrease with rank
        let raw = [0.01, 0.015, 0.02];
        let adjusted = benjamini_hochberg(&raw);
        for adj in &adjusted {
            assert!((adj - 0.02).abs() < 1e-12, "{adjusted:?}");
        }
    }

    #[test]
    fn clamped_to_one() {
        let adjusted = benjamini_hochberg(&[0.9, 0.8, 0.95]);
        assert!(adjusted.iter().all(|p| *p <= 1.0));
        assert!((adjusted[2] - 0.95).abs() < 1e-12);

        let adjusted = benjamini_hochberg(&[0.6, 0.7]);
        assert!((adjusted[0] - 0.7).abs() < 1e-12);
        assert!((adjusted[1] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn ties() {
        let adjusted = benjamini_hochberg(&[0.01, 0.01, 0.01]);
        for adj in &adjusted {
            assert!((adj - 0.01).abs() < 1e-12);
        }
    }
}
