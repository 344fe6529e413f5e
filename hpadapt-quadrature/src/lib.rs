//! Quadrature rules for the one-dimensional reference interval `[-1, 1]`.
//!
//! The rules are used by `hpadapt` for element integrals, but nothing here depends on it:
//! a rule is just a pair of weights and points.

pub mod univariate;

pub use univariate::{gauss, gauss_for_polynomial_degree, legendre, LegendreRecurrence};

/// A one-dimensional rule, stored as `(weights, points)`.
pub type Rule = (Vec<f64>, Vec<f64>);

/// Approximates the integral of `f` over `[-1, 1]` with the given rule.
pub fn integrate(rule: &Rule, f: impl Fn(f64) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, x)| w * f(*x)).sum()
}

/// Maps a rule on `[-1, 1]` to the physical interval `[a, b]`.
///
/// The weights are scaled by the Jacobian `(b - a) / 2` of the affine map.
pub fn map_to_interval(rule: &Rule, interval: [f64; 2]) -> Rule {
    let [a, b] = interval;
    let half_length = 0.5 * (b - a);
    let midpoint = 0.5 * (a + b);
    let (weights, points) = rule;
    let weights = weights.iter().map(|w| w * half_length).collect();
    let points = points.iter().map(|xi| midpoint + half_length * xi).collect();
    (weights, points)
}
