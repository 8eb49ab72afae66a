//! Two-sided Fisher's exact test for 2x2 contingency tables
//!
//! With fixed margins, the top-left cell `x` of a table follows the
//! hypergeometric distribution. The two-sided p-value is the summed probability
//! of all tables that are at most as likely as the observed one.
//!
//! # Examples
//!
//! ```
//! use npenrich::stats::contingency::ContingencyTable;
//! use npenrich::stats::fisher::two_sided;
//!
//! // both tables with all counts on one diagonal have probability 1/6
//! let table = ContingencyTable::new(2, 0, 0, 2);
//! assert!((two_sided(&table) - 1.0 / 3.0).abs() < 1e-12);
//! ```
//!
//! Tables where one of the margins is zero allow only a single arrangement of
//! counts, so their p-value is exactly `1.0`. This includes the empty table.

use std::cmp;

use statrs::function::factorial::ln_factorial;

use crate::stats::contingency::ContingencyTable;
use crate::EngineResult;

/// Tolerance for comparing the log-probabilities of two tables
///
/// A table whose log-probability exceeds the observed one by at most this
/// value still counts as "at least as extreme".
pub const TIE_TOLERANCE: f64 = 1e-12;

/// The distribution of the top-left cell of all tables sharing the same margins
#[derive(Debug, Copy, Clone, PartialEq)]
struct Hypergeometric {
    row1: u64,
    row2: u64,
    col1: u64,
    /// `ln(row1! row2! col1! col2! / n!)`, shared by all tables
    ln_margins: f64,
}

impl Hypergeometric {
    fn from_table(table: &ContingencyTable) -> Self {
        let ln_margins = ln_factorial(table.row1())
            + ln_factorial(table.row2())
            + ln_factorial(table.col1())
            + ln_factorial(table.col2())
            - ln_factorial(table.total());
        Self {
            row1: table.row1(),
            row2: table.row2(),
            col1: table.col1(),
            ln_margins,
        }
    }

    /// Returns the minimum value of the top-left cell
    ///
    /// # Formula
    ///
    /// ```text
    /// max(0, col1 - row2)
    /// ```
    fn min(&self) -> u64 {
        self.col1.saturating_sub(self.row2)
    }

    /// Returns the maximum value of the top-left cell
    ///
    /// # Formula
    ///
    /// ```text
    /// min(row1, col1)
    /// ```
    fn max(&self) -> u64 {
        cmp::min(self.row1, self.col1)
    }

    /// Log-probability of the table with top-left cell `x`
    ///
    /// `x` must be within `min()..=max()`
    fn ln_pmf(&self, x: u64) -> f64 {
        self.ln_margins
            - ln_factorial(x)
            - ln_factorial(self.row1 - x)
            - ln_factorial(self.col1 - x)
            - ln_factorial(self.row2 + x - self.col1)
    }
}

/// Returns `true` if a table with log-probability `ln_p` is at least as
/// extreme as the observed table with log-probability `observed`
pub fn is_as_extreme(ln_p: f64, observed: f64) -> bool {
    ln_p <= observed + TIE_TOLERANCE
}

/// The probability of observing exactly this table, given its margins
pub fn point_probability(table: &ContingencyTable) -> f64 {
    let hyper = Hypergeometric::from_table(table);
    hyper.ln_pmf(u64::from(table.a())).exp()
}

/// Calculates the two-sided p-value of Fisher's exact test
///
/// The result is clamped to `1.0` to guard against rounding errors
/// when summing up the probabilities.
pub fn two_sided(table: &ContingencyTable) -> f64 {
    if table.row1() == 0 || table.row2() == 0 || table.col1() == 0 || table.col2() == 0 {
        return 1.0;
    }
    let hyper = Hypergeometric::from_table(table);
    let observed = hyper.ln_pmf(u64::from(table.a()));

    let pvalue: f64 = (hyper.min()..=hyper.max())
        .map(|x| hyper.ln_pmf(x))
        .filter(|ln_p| is_as_extreme(*ln_p, observed))
        .map(f64::exp)
        .sum();
    pvalue.min(1.0)
}

/// Calculates the two-sided p-value of Fisher's exact test from signed counts
///
/// # Errors
///
/// - [`EngineError::NegativeCount`](`crate::EngineError::NegativeCount`) if any count is negative
/// - [`EngineError::Validation`](`crate::EngineError::Validation`) if any count
///   does not fit into `u32`
///
/// # Examples
///
/// ```
/// use npenrich::stats::fisher::exact_test;
///
/// assert!(exact_test(3, 1, 1, 3).is_ok());
/// assert!(exact_test(3, -1, 1, 3).is_err());
/// ```
pub fn exact_test(a: i64, b: i64, c: i64, d: i64) -> EngineResult<f64> {
    let table = ContingencyTable::try_from([a, b, c, d])?;
    Ok(two_sided(&table))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::EngineError;

    fn table(a: u32, b: u32, c: u32, d: u32) -> ContingencyTable {
        ContingencyTable::new(a, b, c, d)
    }

    #[test]
    fn support() {
        let hyper = Hypergeometric::from_table(&table(2, 0, 0, 2));
        assert_eq!(hyper.min(), 0);
        assert_eq!(hyper.max(), 2);

        // row1 = 3, row2 = 2, col1 = 4
        let hyper = Hypergeometric::from_table(&table(3, 0, 1, 1));
        assert_eq!(hyper.min(), 2);
        assert_eq!(hyper.max(), 3);
    }

    #[test]
    fn point_probabilities() {
        let hyper = Hypergeometric::from_table(&table(2, 0, 0, 2));
        assert!((hyper.ln_pmf(0).exp() - 1.0 / 6.0).abs() < 1e-12);
        assert!((hyper.ln_pmf(1).exp() - 4.0 / 6.0).abs() < 1e-12);
        assert!((hyper.ln_pmf(2).exp() - 1.0 / 6.0).abs() < 1e-12);

        let total: f64 = (hyper.min()..=hyper.max())
            .map(|x| hyper.ln_pmf(x).exp())
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_table() {
        assert!((two_sided(&table(2, 0, 0, 2)) - 1.0 / 3.0).abs() < 1e-12);
        assert!((two_sided(&table(0, 2, 2, 0)) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn central_table() {
        // the most likely table includes every other table
        assert!((two_sided(&table(1, 1, 1, 1)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn uneven_margins() {
        // row1 = 4, row2 = 2, col1 = 2: P(0) = 1/15, P(1) = 8/15, P(2) = 6/15
        assert!((two_sided(&table(2, 2, 0, 2)) - 7.0 / 15.0).abs() < 1e-12);
        assert!((two_sided(&table(0, 4, 2, 0)) - 1.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn reference_values() {
        // Fisher's tea tasting experiment
        assert!((two_sided(&table(3, 1, 1, 3)) - 0.485_714_285_714_285_7).abs() < 1e-12);
        // scipy.stats.fisher_exact([[8, 2], [1, 5]])
        assert!((two_sided(&table(8, 2, 1, 5)) - 0.034_965_034_965_034_97).abs() < 1e-12);
    }

    #[test]
    fn large_counts() {
        let pvalue = two_sided(&table(250, 750, 1000, 98_000));
        assert!(pvalue >= 0.0);
        assert!(pvalue < 1e-100);

        let pvalue = two_sided(&table(10, 990, 1000, 98_000));
        assert!(pvalue > 0.0);
        assert!(pvalue <= 1.0);
    }

    #[test]
    fn bounded_by_point_probability_and_one() {
        for a in 0..6 {
            for b in 0..6 {
                for c in 0..6 {
                    for d in 0..6 {
                        let t = table(a, b, c, d);
                        let pvalue = two_sided(&t);
                        assert!((0.0..=1.0).contains(&pvalue), "{t:?}: {pvalue}");
                        assert!(pvalue >= point_probability(&t) - 1e-15, "{t:?}: {pvalue}");
                    }
                }
            }
        }
    }

    #[test]
    fn margin_invariance() {
        for t in [
            table(2, 0, 0, 2),
            table(3, 1, 1, 3),
            table(8, 2, 1, 5),
            table(0, 7, 3, 1),
            table(12, 5, 9, 30),
        ] {
            let swapped = t.swap_rows();
            assert!(
                (two_sided(&t) - two_sided(&swapped)).abs() < 1e-12,
                "{t:?} != {swapped:?}"
            );
        }
    }

    #[test]
    fn zero_margins() {
        assert!((two_sided(&table(0, 0, 0, 0)) - 1.0).abs() < f64::EPSILON);
        assert!((two_sided(&table(0, 0, 3, 4)) - 1.0).abs() < f64::EPSILON);
        assert!((two_sided(&table(3, 4, 0, 0)) - 1.0).abs() < f64::EPSILON);
        assert!((two_sided(&table(0, 3, 0, 4)) - 1.0).abs() < f64::EPSILON);
        assert!((two_sided(&table(3, 0, 4, 0)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reject_negative_counts() {
        assert!(matches!(exact_test(-1, 0, 0, 0), Err(EngineError::NegativeCount)));
        assert!(matches!(exact_test(0, 0, 0, -1), Err(EngineError::NegativeCount)));
        assert!((exact_test(0, 0, 0, 0).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((exact_test(2, 0, 0, 2).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn tolerance_boundary() {
        let observed = (1.0f64 / 6.0).ln();
        assert!(is_as_extreme(observed, observed));
        assert!(is_as_extreme(observed - 1.0, observed));
        assert!(is_as_extreme(observed + TIE_TOLERANCE, observed));
        assert!(!is_as_extreme(observed + 2.0 * TIE_TOLERANCE, observed));
        assert!(!is_as_extreme(observed + 1e-9, observed));
    }

    #[test]
    fn tolerance_value() {
        assert!((TIE_TOLERANCE - 1e-12).abs() < f64::EPSILON);
    }
}
