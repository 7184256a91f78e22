//! The probability mass function used as the belief/message representation throughout the
//! factor graph, plus the dense two-variable [`Table`] used by table-represented factors.

mod table;
pub use table::*;

use ndarray::Array1;

use crate::types::{EPSILON, Error, Result};

/// A finite-support discrete probability distribution over a contiguous range of integers.
///
/// `Pmf` stores a dense probability vector indexed by `first_support ..= last_support`; any
/// index outside that range has probability zero. Values are kept non-negative and, after any
/// operation that exports a usable distribution, sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Pmf {
    first_support: i64,
    values: Array1<f64>,
}

impl Pmf {
    /// Builds a `Pmf` from an explicit support bound and probability vector.
    ///
    /// # Arguments
    ///
    /// * `first_support` - The smallest integer with non-zero probability.
    /// * `values` - The probability of each integer in `first_support ..= first_support +
    ///   values.len() - 1`, in order.
    ///
    /// # Panics
    ///
    /// * If `values` is empty.
    ///
    #[inline]
    pub fn new(first_support: i64, values: Array1<f64>) -> Self {
        assert!(!values.is_empty(), "A Pmf must have non-empty support.");
        Self {
            first_support,
            values,
        }
    }

    /// Builds the two-point Bernoulli distribution over `{0, 1}` with `P(1) = p`.
    #[inline]
    pub fn bernoulli(p: f64) -> Self {
        Self::new(0, Array1::from(vec![1.0 - p, p]))
    }

    /// Builds the uniform distribution over `{0, 1}`, used to seed messages at the start of
    /// loopy belief propagation.
    #[inline]
    pub fn uniform_binary() -> Self {
        Self::new(0, Array1::from(vec![0.5, 0.5]))
    }

    /// The smallest integer with (possibly) non-zero probability.
    #[inline]
    pub const fn first_support(&self) -> i64 {
        self.first_support
    }

    /// The largest integer with (possibly) non-zero probability.
    #[inline]
    pub fn last_support(&self) -> i64 {
        self.first_support + self.values.len() as i64 - 1
    }

    /// The raw probability vector, indexed from `first_support`.
    #[inline]
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Returns the probability mass at integer `i`, or zero if `i` is outside the support.
    #[inline]
    pub fn at(&self, i: i64) -> f64 {
        if i < self.first_support || i > self.last_support() {
            return 0.0;
        }
        self.values[(i - self.first_support) as usize]
    }

    /// Returns `P(1)`, i.e. the presence probability for a binary-domain `Pmf`, or `0.0` if
    /// `1` lies outside the support.
    #[inline]
    pub fn presence(&self) -> f64 {
        self.at(1)
    }

    /// Renormalizes so the distribution sums to one.
    ///
    /// # Errors
    ///
    /// * [`Error::Structural`] if the total mass is (numerically) zero, since a normalization
    ///   by zero is a fatal structural error for the enclosing message update.
    ///
    pub fn normalize(mut self) -> Result<Self> {
        let total: f64 = self.values.sum();
        if total.abs() < EPSILON {
            return Err(Error::Structural(
                "Normalization by zero: all probability mass is zero.".into(),
            ));
        }
        self.values /= total;
        Ok(self)
    }

    /// Computes the pointwise product of `self` and `other` over the intersection of their
    /// supports, then renormalizes.
    ///
    /// # Errors
    ///
    /// * [`Error::Structural`] if the two supports do not intersect, or if the resulting
    ///   product is entirely zero.
    ///
    pub fn product(&self, other: &Self) -> Result<Self> {
        let first = self.first_support.max(other.first_support);
        let last = self.last_support().min(other.last_support());
        if first > last {
            return Err(Error::Structural(
                "Cannot multiply two Pmfs with disjoint supports.".into(),
            ));
        }
        let values = (first..=last).map(|i| self.at(i) * other.at(i)).collect();
        Self::new(first, values).normalize()
    }

    /// Computes the discrete convolution of `self` and `other`, i.e. the distribution of the
    /// sum of two independent random variables with these marginals.
    ///
    /// The resulting support is `[self.first + other.first, self.last + other.last]`.
    pub fn convolve(&self, other: &Self) -> Self {
        let first = self.first_support + other.first_support;
        let n = self.values.len() + other.values.len() - 1;
        let mut values = vec![0.0; n];
        for (i, &a) in self.values.iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            for (j, &b) in other.values.iter().enumerate() {
                values[i + j] += a * b;
            }
        }
        Self::new(first, Array1::from(values))
    }

    /// The `L∞` distance between `self` and `other`: the maximum absolute difference of
    /// probabilities over the union of their supports. Used as the scheduler's convergence
    /// test.
    pub fn l_inf_distance(&self, other: &Self) -> f64 {
        let first = self.first_support.min(other.first_support);
        let last = self.last_support().max(other.last_support());
        (first..=last)
            .map(|i| (self.at(i) - other.at(i)).abs())
            .fold(0.0, f64::max)
    }

    /// Dampens a raw message update: `λ·old + (1−λ)·new`, pointwise over the union of
    /// supports.
    ///
    /// # Panics
    ///
    /// * If `lambda` is not in `[0, 1)`.
    ///
    pub fn dampen(old: &Self, new: &Self, lambda: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&lambda),
            "Dampening factor must be in [0, 1), found {lambda}."
        );
        let first = old.first_support.min(new.first_support);
        let last = old.last_support().max(new.last_support());
        let values = (first..=last)
            .map(|i| lambda * old.at(i) + (1.0 - lambda) * new.at(i))
            .collect();
        Self::new(first, values)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn bernoulli_sums_to_one() {
        let pmf = Pmf::bernoulli(0.3);
        assert_relative_eq!(pmf.values().sum(), 1.0);
        assert_relative_eq!(pmf.presence(), 0.3);
    }

    #[test]
    fn product_of_independent_bernoullis() {
        let a = Pmf::bernoulli(0.5);
        let b = Pmf::bernoulli(0.25);
        let c = a.product(&b).unwrap();
        // Unnormalized: [0.5*0.75, 0.5*0.25] = [0.375, 0.125] -> normalized [0.75, 0.25].
        assert_relative_eq!(c.at(0), 0.75, epsilon = 1e-12);
        assert_relative_eq!(c.at(1), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn product_of_disjoint_supports_errors() {
        let a = Pmf::new(0, Array1::from(vec![1.0]));
        let b = Pmf::new(5, Array1::from(vec![1.0]));
        assert!(a.product(&b).is_err());
    }

    #[test]
    fn convolve_two_bernoullis_matches_binomial() {
        let a = Pmf::bernoulli(0.5);
        let b = Pmf::bernoulli(0.5);
        let sum = a.convolve(&b);
        assert_eq!(sum.first_support(), 0);
        assert_eq!(sum.last_support(), 2);
        assert_relative_eq!(sum.at(0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(sum.at(1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(sum.at(2), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn l_inf_distance_identical_is_zero() {
        let a = Pmf::bernoulli(0.4);
        assert_relative_eq!(a.l_inf_distance(&a), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn dampen_with_lambda_zero_is_undamped() {
        let old = Pmf::bernoulli(0.9);
        let new = Pmf::bernoulli(0.1);
        let d = Pmf::dampen(&old, &new, 0.0);
        assert_relative_eq!(d.at(1), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn dampen_with_lambda_one_minus_epsilon_stays_close_to_old() {
        let old = Pmf::bernoulli(0.9);
        let new = Pmf::bernoulli(0.1);
        let d = Pmf::dampen(&old, &new, 0.999);
        assert!(d.at(1) > 0.8);
    }

    #[test]
    #[should_panic(expected = "Dampening factor must be in [0, 1)")]
    fn dampen_rejects_lambda_out_of_range() {
        let old = Pmf::bernoulli(0.5);
        let new = Pmf::bernoulli(0.5);
        let _ = Pmf::dampen(&old, &new, 1.0);
    }

    #[test]
    fn normalize_all_zero_errors() {
        let pmf = Pmf::new(0, Array1::from(vec![0.0, 0.0]));
        assert!(pmf.normalize().is_err());
    }
}
