//! Functionality for error estimation.
//!
//! The error of a coarse solution is estimated by comparing it with the solution on the
//! reference space, element by element. When a closed-form solution is known, the same norm
//! can be evaluated against it for verification.
use crate::integrate::{integrate_over_interval, overlay_segments};
use crate::problems::ExactSolution;
use crate::space::{Element, Space};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// The norm in which errors are measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    /// Values only.
    L2,
    /// Values and first derivatives.
    H1,
}

impl Norm {
    /// The squared norm contribution of a single point with the given value and derivative
    /// differences.
    pub fn pointwise_squared(&self, values: &DVector<f64>, derivatives: &DVector<f64>) -> f64 {
        match self {
            Norm::L2 => values.norm_squared(),
            Norm::H1 => values.norm_squared() + derivatives.norm_squared(),
        }
    }
}

/// The outcome of comparing a coarse solution with a reference solution.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEstimate {
    /// One non-negative entry per coarse element.
    pub element_errors: Vec<f64>,
    /// `sqrt(Σ err_e²) / ||u_ref||`.
    pub relative_error: f64,
    /// The norm of the reference solution over the whole domain.
    pub reference_norm: f64,
}

impl ErrorEstimate {
    pub fn relative_error_percent(&self) -> f64 {
        100.0 * self.relative_error
    }

    pub fn max_element_error(&self) -> f64 {
        self.element_errors.iter().copied().fold(0.0, f64::max)
    }

    pub fn absolute_error(&self) -> f64 {
        self.element_errors.iter().map(|e| e * e).sum::<f64>().sqrt()
    }
}

/// Divides `error` by `norm`, treating a vanishing norm as an absolute measure.
fn relative(error: f64, norm: f64) -> f64 {
    if norm > 0.0 {
        error / norm
    } else {
        error
    }
}

/// The squared norm of the difference between the polynomial held by `element` and the
/// solution held by `reference`, over the element interval.
pub(crate) fn element_error_squared(norm: Norm, element: &Element, reference: &Space) -> f64 {
    overlay_segments(reference, element.interval())
        .into_iter()
        .map(|segment| {
            let [x0, x1] = segment;
            let reference_element = reference.element_at(0.5 * (x0 + x1));
            let num_points = element.degree().max(reference_element.degree()) + 1;
            integrate_over_interval(segment, num_points, |x| {
                let (u, u_x) = element.evaluate_reference(element.map_physical_coords(x));
                let (u_ref, u_ref_x) = reference_element.evaluate_reference(reference_element.map_physical_coords(x));
                norm.pointwise_squared(&(u_ref - u), &(u_ref_x - u_x))
            })
        })
        .sum()
}

/// The squared norm of the solution held by `space`.
pub fn solution_norm_squared(norm: Norm, space: &Space) -> f64 {
    space
        .elements()
        .iter()
        .map(|element| {
            integrate_over_interval(element.interval(), element.degree() + 1, |x| {
                let (u, u_x) = element.evaluate_reference(element.map_physical_coords(x));
                norm.pointwise_squared(&u, &u_x)
            })
        })
        .sum()
}

/// Estimates the error of the solution held by `coarse`, using the solution held by
/// `reference` in place of the exact solution.
pub fn estimate_error(norm: Norm, coarse: &Space, reference: &Space) -> ErrorEstimate {
    assert_eq!(coarse.num_equations(), reference.num_equations());
    let element_errors: Vec<_> = coarse
        .elements()
        .iter()
        .map(|element| element_error_squared(norm, element, reference).max(0.0).sqrt())
        .collect();
    let reference_norm = solution_norm_squared(norm, reference).max(0.0).sqrt();
    let error = element_errors.iter().map(|e| e * e).sum::<f64>().sqrt();
    ErrorEstimate {
        element_errors,
        relative_error: relative(error, reference_norm),
        reference_norm,
    }
}

/// The number of Gauss points per element used when comparing with a closed-form solution.
fn exact_quadrature_points(degree: usize) -> usize {
    (2 * degree + 4).max(20)
}

/// Computes the relative error of the solution held by `space` with respect to a closed-form
/// solution, in the given norm.
pub fn exact_relative_error(norm: Norm, space: &Space, exact: &dyn ExactSolution) -> f64 {
    let mut error_squared = 0.0;
    let mut exact_squared = 0.0;
    for element in space.elements() {
        let num_points = exact_quadrature_points(element.degree());
        error_squared += integrate_over_interval(element.interval(), num_points, |x| {
            let (u_h, u_h_x) = element.evaluate_reference(element.map_physical_coords(x));
            let (u, u_x) = exact.evaluate(x);
            assert_eq!(u.len(), u_h.len(), "Exact solution must have one component per equation");
            norm.pointwise_squared(&(u - u_h), &(u_x - u_h_x))
        });
        exact_squared += integrate_over_interval(element.interval(), num_points, |x| {
            let (u, u_x) = exact.evaluate(x);
            norm.pointwise_squared(&u, &u_x)
        });
    }
    relative(error_squared.max(0.0).sqrt(), exact_squared.max(0.0).sqrt())
}
