//! Hierarchic Lobatto shape functions on the reference interval `[-1, 1]`.
//!
//! The shape functions of an element of degree `p` are ordered as
//! `[l_0, l_1, l_2, ..., l_p]`, where `l_0` and `l_1` are the vertex functions associated with
//! the left and right vertex, respectively, and `l_k` for `k >= 2` are bubble functions
//!
//! ```text
//! l_k(ξ) = (P_k(ξ) - P_{k - 2}(ξ)) / sqrt(2 (2k - 1)),
//! ```
//!
//! with `P_k` the Legendre polynomials. The derivatives of the bubbles are the normalized
//! Legendre polynomials `l_k'(ξ) = sqrt((2k - 1) / 2) P_{k - 1}(ξ)`, so they are orthonormal in
//! `L^2(-1, 1)`. Because the space of degree `p` contains the space of degree `p - 1`, raising
//! the degree of an element never changes the existing coefficients.
use crate::quadrature::LegendreRecurrence;

/// The number of shape functions of a single solution component for an element of degree `p`.
pub fn num_shape_functions(degree: usize) -> usize {
    degree + 1
}

/// Evaluates `l_k(ξ)`.
pub fn lobatto(k: usize, xi: f64) -> f64 {
    match k {
        0 => 0.5 * (1.0 - xi),
        1 => 0.5 * (1.0 + xi),
        _ => {
            let p_k = LegendreRecurrence::evaluate(k, xi);
            let p_k_minus_2 = LegendreRecurrence::evaluate(k - 2, xi).value();
            (p_k.value() - p_k_minus_2) / (2.0 * (2.0 * k as f64 - 1.0)).sqrt()
        }
    }
}

/// Evaluates `dl_k/dξ (ξ)`.
pub fn lobatto_derivative(k: usize, xi: f64) -> f64 {
    match k {
        0 => -0.5,
        1 => 0.5,
        _ => {
            let p_k_minus_1 = LegendreRecurrence::evaluate(k - 1, xi).value();
            ((2.0 * k as f64 - 1.0) / 2.0).sqrt() * p_k_minus_1
        }
    }
}

/// Populates `values` and `derivatives` with all shape functions of the given degree at `ξ`.
///
/// Derivatives are with respect to the reference coordinate.
///
/// # Panics
///
/// Panics if the buffers do not have length `degree + 1`.
pub fn populate_shape_functions(degree: usize, xi: f64, values: &mut [f64], derivatives: &mut [f64]) {
    let n = num_shape_functions(degree);
    assert_eq!(values.len(), n, "Value buffer must have length degree + 1");
    assert_eq!(derivatives.len(), n, "Derivative buffer must have length degree + 1");

    values[0] = 0.5 * (1.0 - xi);
    values[1] = 0.5 * (1.0 + xi);
    derivatives[0] = -0.5;
    derivatives[1] = 0.5;

    // Run the Legendre recurrence once and pick up P_{k - 2}, P_{k - 1} and P_k on the way
    // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
    let mut p_prev_prev = 1.0;
    let mut p_prev = xi;
    for k in 2..=degree {
        let m = k as f64;
        let p_k = ((2.0 * m - 1.0) * xi * p_prev - (m - 1.0) * p_prev_prev) / m;
        values[k] = (p_k - p_prev_prev) / (2.0 * (2.0 * m - 1.0)).sqrt();
        derivatives[k] = ((2.0 * m - 1.0) / 2.0).sqrt() * p_prev;
        p_prev_prev = p_prev;
        p_prev = p_k;
    }
}

/// Shape function values and reference derivatives tabulated at a set of reference points.
///
/// Entry `(i, k)` of either table holds the `k`-th shape function at the `i`-th point.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTable {
    degree: usize,
    values: Vec<f64>,
    derivatives: Vec<f64>,
}

impl ShapeTable {
    pub fn tabulate(degree: usize, reference_points: &[f64]) -> Self {
        let n = num_shape_functions(degree);
        let mut values = vec![0.0; n * reference_points.len()];
        let mut derivatives = vec![0.0; n * reference_points.len()];
        for (i, &xi) in reference_points.iter().enumerate() {
            let range = i * n..(i + 1) * n;
            populate_shape_functions(degree, xi, &mut values[range.clone()], &mut derivatives[range]);
        }
        Self {
            degree,
            values,
            derivatives,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_points(&self) -> usize {
        self.values.len() / num_shape_functions(self.degree)
    }

    pub fn values_at(&self, point_index: usize) -> &[f64] {
        let n = num_shape_functions(self.degree);
        &self.values[point_index * n..(point_index + 1) * n]
    }

    pub fn derivatives_at(&self, point_index: usize) -> &[f64] {
        let n = num_shape_functions(self.degree);
        &self.derivatives[point_index * n..(point_index + 1) * n]
    }
}
