//! Transfer of solutions between spaces.
use crate::basis::{num_shape_functions, populate_shape_functions};
use crate::error::Norm;
use crate::integrate::overlay_segments;
use crate::optimize::system::LinearSolver;
use crate::quadrature::{gauss, map_to_interval};
use crate::space::Space;
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Projection-based interpolation of the solution held by `source` onto a single element.
///
/// The vertex coefficients reproduce the values of the source solution at the end points of
/// `interval`. The bubble coefficients are the projection of the remainder in the
/// `H^1` seminorm. Since the derivatives of the bubbles are orthonormal on the reference
/// interval and orthogonal to constants, the projection reduces to
///
/// ```text
/// c_k = ∫_{-1}^{1} du/dξ l_k'(ξ) dξ.
/// ```
///
/// Returns a `num_equations x (degree + 1)` coefficient matrix. If `source` restricted to
/// `interval` is a polynomial of at most the given degree, it is reproduced exactly.
pub fn interpolate_element(source: &Space, interval: [f64; 2], degree: usize) -> DMatrix<f64> {
    assert!(degree >= 1, "Degree must be at least 1");
    let num_equations = source.num_equations();
    let n = num_shape_functions(degree);
    let mut coefficients = DMatrix::zeros(num_equations, n);

    let [a, b] = interval;
    let left_element = source.element_at(a);
    let right_element = source.element_at(b);
    let (u_a, _) = left_element.evaluate_reference(left_element.map_physical_coords(a));
    let (u_b, _) = right_element.evaluate_reference(right_element.map_physical_coords(b));
    coefficients.column_mut(0).copy_from(&u_a);
    coefficients.column_mut(1).copy_from(&u_b);
    if degree == 1 {
        return coefficients;
    }

    let mut phi = vec![0.0; n];
    let mut dphi = vec![0.0; n];
    for segment in overlay_segments(source, interval) {
        let [x0, x1] = segment;
        let source_element = source.element_at(0.5 * (x0 + x1));
        let num_points = source_element.degree().max(degree) + 1;
        let (weights, points) = map_to_interval(&gauss(num_points), segment);
        for (w, x) in weights.iter().zip(&points) {
            // The Jacobians of dx/dξ in du/dξ and in the integral cancel
            let (_, u_x) = source_element.evaluate_reference(source_element.map_physical_coords(*x));
            let xi = (2.0 * x - a - b) / (b - a);
            populate_shape_functions(degree, xi, &mut phi, &mut dphi);
            for k in 2..n {
                for c in 0..num_equations {
                    coefficients[(c, k)] += w * u_x[c] * dphi[k];
                }
            }
        }
    }
    coefficients
}

#[derive(Debug)]
pub struct ProjectionError {
    pub source: Box<dyn Error + Send + Sync>,
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to solve the projection system. Error: {}", self.source)
    }
}

impl Error for ProjectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Replaces the solution held by `coarse` with the orthogonal projection, in the given norm,
/// of the solution held by `reference`.
///
/// Dirichlet values of `coarse` are kept and act as a lifting: only the DOFs are solved for.
pub fn project_global<L>(
    norm: Norm,
    coarse: &mut Space,
    reference: &Space,
    solver: &mut L,
) -> Result<(), ProjectionError>
where
    L: ?Sized + LinearSolver<f64, CsrMatrix<f64>>,
{
    assert_eq!(coarse.num_equations(), reference.num_equations());
    let num_dofs = coarse.num_dofs();
    let with_derivatives = matches!(norm, Norm::H1);
    let mut matrix = CooMatrix::new(num_dofs, num_dofs);
    let mut rhs = DVector::zeros(num_dofs);

    for element in coarse.elements() {
        let n = num_shape_functions(element.degree());
        let mut phi = vec![0.0; n];
        let mut dphi = vec![0.0; n];
        let mut element_matrix = DMatrix::<f64>::zeros(n, n);
        let mut element_rhs = DMatrix::<f64>::zeros(coarse.num_equations(), n);
        let [a, b] = element.interval();

        for segment in overlay_segments(reference, element.interval()) {
            let [x0, x1] = segment;
            let reference_element = reference.element_at(0.5 * (x0 + x1));
            let num_points = element.degree().max(reference_element.degree()) + 1;
            let (weights, points) = map_to_interval(&gauss(num_points), segment);
            for (w, x) in weights.iter().zip(&points) {
                let xi = (2.0 * x - a - b) / (b - a);
                populate_shape_functions(element.degree(), xi, &mut phi, &mut dphi);
                dphi.iter_mut().for_each(|d| *d /= element.jacobian());
                let (u_ref, u_ref_x) =
                    reference_element.evaluate_reference(reference_element.map_physical_coords(*x));

                for k in 0..n {
                    for l in 0..n {
                        let mut m = phi[k] * phi[l];
                        if with_derivatives {
                            m += dphi[k] * dphi[l];
                        }
                        element_matrix[(k, l)] += w * m;
                    }
                    for c in 0..coarse.num_equations() {
                        let mut r = u_ref[c] * phi[k];
                        if with_derivatives {
                            r += u_ref_x[c] * dphi[k];
                        }
                        element_rhs[(c, k)] += w * r;
                    }
                }
            }
        }

        // Components decouple, so the same element matrix serves every component
        for c in 0..coarse.num_equations() {
            for k in 0..n {
                let Some(i) = element.dof(c, k) else { continue };
                rhs[i] += element_rhs[(c, k)];
                for l in 0..n {
                    match element.dof(c, l) {
                        Some(j) => matrix.push(i, j, element_matrix[(k, l)]),
                        None => rhs[i] -= element_matrix[(k, l)] * element.coefficients()[(c, l)],
                    }
                }
            }
        }
    }

    let matrix = CsrMatrix::from(&matrix);
    let x = solver
        .solve(&matrix, &rhs)
        .map_err(|source| ProjectionError { source })?;
    debug!("Projected reference solution onto {} coarse DOFs", num_dofs);
    coarse.set_coefficients(&x);
    Ok(())
}
