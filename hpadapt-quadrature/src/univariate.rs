//! Gauss-Legendre rules and Legendre polynomials on `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Upper bound on Newton iterations when locating a root of `P_n`.
///
/// The initial guesses are accurate enough that convergence to machine precision takes a
/// handful of iterations, even for several hundred points.
const MAX_ROOT_ITERATIONS: usize = 100;

/// The Legendre polynomials `P_n` and `P_{n - 1}` evaluated at a single point.
///
/// The derivative is computed from the pair, using a formula that is *not* defined at
/// `|x| == 1`, so it is only suitable for evaluation in the open interval `(-1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    current: f64,
    // p_{n - 1}(x), or zero for n == 0
    previous: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut current = 1.0;
        let mut previous = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let next = ((2.0 * m - 1.0) * x * current - (m - 1.0) * previous) / m;
            previous = current;
            current = next;
        }

        Self { n, x, current, previous }
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn derivative(&self) -> f64 {
        let n = self.n as f64;
        let x = self.x;
        // dP_n/dx (x) = n (x P_n(x) - P_{n - 1}(x)) / (x^2 - 1)
        n * (x * self.current - self.previous) / (x * x - 1.0)
    }

    pub fn value_and_derivative(&self) -> (f64, f64) {
        (self.value(), self.derivative())
    }
}

/// Evaluates the Legendre polynomial `P_n` at `x`. Valid on the closed interval.
pub fn legendre(n: usize, x: f64) -> f64 {
    LegendreRecurrence::evaluate(n, x).value()
}

/// Gauss quadrature for the reference interval `[-1, 1]`.
///
/// Returns the [Gauss quadrature rule] with the given number of points. Given `n` points,
/// the rule integrates polynomials of degree up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Only the first half of the roots are computed, the rest follow by symmetry
    let m = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..m {
        // Standard asymptotic initial guess for the i-th root (in decreasing order)
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut recurrence = LegendreRecurrence::evaluate(n, x);
        for _ in 0..MAX_ROOT_ITERATIONS {
            let (p, dp) = recurrence.value_and_derivative();
            let dx = -p / dp;
            x += dx;
            recurrence = LegendreRecurrence::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        let dp = recurrence.derivative();
        points.push(x);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push(-points[mirror_idx]);
        weights.push(weights[mirror_idx]);
    }

    debug_assert_eq!(points.len(), n);
    (weights, points)
}

/// The Gauss rule with the fewest points that integrates polynomials of degree `degree`
/// exactly.
pub fn gauss_for_polynomial_degree(degree: usize) -> Rule {
    gauss(degree / 2 + 1)
}
