use hpadapt::error::{estimate_error, Norm};
use hpadapt::linear_solver::DenseLuSolver;
use hpadapt::optimize::system::LinearSolver;
use hpadapt::projection::{interpolate_element, project_global, ProjectionError};
use hpadapt::proptest::{space_with_solution, SpaceParams};
use hpadapt::space::{BoundaryConditions, DirichletBc, ElementRefinement, Space};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use proptest::prelude::*;
use std::error::Error;

/// A single-element space on `[-1, 1]` holding `u(x) = x^3` (degree 3).
fn cubic_space() -> Space {
    let mut space = Space::new([-1.0, 1.0], 1, 3, 1, &BoundaryConditions::none()).unwrap();
    // x^3 = -l_0 + l_1 + c_3 l_3 with l_3 = (P_3 - P_1) / sqrt(10) = sqrt(10) / 4 (x^3 - x)
    // (the quadratic bubble does not contribute)
    let c3 = 4.0 / 10.0f64.sqrt();
    space.set_coefficients(&DVector::from_vec(vec![-1.0, 1.0, 0.0, c3]));
    space
}

#[test]
fn cubic_space_holds_cubic() {
    let space = cubic_space();
    for x in [-0.9, -0.2, 0.4, 1.0] {
        let (u, u_x) = space.evaluate(x).unwrap();
        assert_scalar_eq!(u[0], x * x * x, comp = abs, tol = 1e-13);
        assert_scalar_eq!(u_x[0], 3.0 * x * x, comp = abs, tol = 1e-12);
    }
}

#[test]
fn interpolation_reproduces_representable_polynomials() {
    let space = cubic_space();
    let coefficients = interpolate_element(&space, [-1.0, 1.0], 5);
    let expected = DMatrix::from_row_slice(1, 6, &[-1.0, 1.0, 0.0, 4.0 / 10.0f64.sqrt(), 0.0, 0.0]);
    assert_matrix_eq!(coefficients, expected, comp = abs, tol = 1e-13);
}

#[test]
fn linear_interpolation_matches_vertex_values() {
    let space = cubic_space();
    let coefficients = interpolate_element(&space, [0.0, 0.5], 1);
    assert_eq!(coefficients.shape(), (1, 2));
    assert_scalar_eq!(coefficients[(0, 0)], 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(coefficients[(0, 1)], 0.125, comp = abs, tol = 1e-14);
}

#[test]
fn interpolation_across_source_elements() {
    // Piecewise linear source with a kink at 0.5, interpolated with degree 2 over [0, 1]
    let mut source = Space::new([0.0, 1.0], 2, 1, 1, &BoundaryConditions::none()).unwrap();
    source.set_coefficients(&DVector::from_vec(vec![0.0, 1.0, 0.0]));
    let coefficients = interpolate_element(&source, [0.0, 1.0], 2);
    assert_scalar_eq!(coefficients[(0, 0)], 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(coefficients[(0, 1)], 0.0, comp = abs, tol = 1e-14);
    // du/dξ = 1 on ξ < 0 and -1 on ξ > 0, l_2' = sqrt(3/2) ξ
    // c_2 = ∫_{-1}^{0} sqrt(3/2) ξ dξ - ∫_{0}^{1} sqrt(3/2) ξ dξ = -sqrt(3/2)
    assert_scalar_eq!(coefficients[(0, 2)], -(1.5f64).sqrt(), comp = abs, tol = 1e-13);
}

#[test]
fn global_projection_of_coarsened_solution_is_exact_when_representable() {
    // A reference space carrying the refined representation of a coarse solution projects
    // back onto the same coarse solution
    let bcs = BoundaryConditions::none().with_left(DirichletBc::new(0, 1.0));
    let mut coarse = Space::new([0.0, 2.0], 3, 2, 1, &bcs).unwrap();
    let x = DVector::from_fn(coarse.num_dofs(), |i, _| (i as f64).cos());
    coarse.set_coefficients(&x);
    let reference = coarse.refine_globally();

    for norm in [Norm::L2, Norm::H1] {
        let mut projected = coarse.clone();
        projected.set_coefficients(&DVector::zeros(coarse.num_dofs()));
        project_global(norm, &mut projected, &reference, &mut DenseLuSolver).unwrap();
        assert_matrix_eq!(projected.coefficients(), x, comp = abs, tol = 1e-11);
    }
}

#[test]
fn global_projection_is_no_worse_than_interpolation() {
    let mut fine = Space::new([0.0, 1.0], 8, 3, 1, &BoundaryConditions::none()).unwrap();
    let x = DVector::from_fn(fine.num_dofs(), |i, _| ((i as f64) * 0.9).sin());
    fine.set_coefficients(&x);

    let coarse = Space::new([0.0, 1.0], 2, 2, 1, &BoundaryConditions::none()).unwrap();
    let interpolated = coarse.refine(&[ElementRefinement::Keep; 2], &fine);
    let mut projected = interpolated.clone();
    project_global(Norm::H1, &mut projected, &fine, &mut DenseLuSolver).unwrap();

    let interpolation_error = estimate_error(Norm::H1, &interpolated, &fine).absolute_error();
    let projection_error = estimate_error(Norm::H1, &projected, &fine).absolute_error();
    assert!(projection_error <= interpolation_error + 1e-12);
}

struct FailingSolver;

impl LinearSolver<f64, CsrMatrix<f64>> for FailingSolver {
    fn solve(&mut self, _: &CsrMatrix<f64>, _: &DVector<f64>) -> Result<DVector<f64>, Box<dyn Error + Send + Sync>> {
        Err("no".into())
    }
}

#[test]
fn projection_reports_solver_failure_and_keeps_coefficients() {
    let mut coarse = cubic_space();
    let reference = coarse.refine_globally();
    let before = coarse.clone();
    let result: Result<(), ProjectionError> = project_global(Norm::H1, &mut coarse, &reference, &mut FailingSolver);
    let error = result.unwrap_err();
    assert!(error.to_string().contains("no"));
    assert!(error.source().is_some());
    assert_eq!(coarse, before);
}

proptest! {
    #[test]
    fn interpolation_onto_finer_space_is_exact(
        space in space_with_solution(SpaceParams { with_boundary_conditions: false, ..SpaceParams::default() }),
        x in 0.0..=1.0f64,
    ) {
        // Split every element and raise the degree, which is a superset of the original space
        let plan: Vec<_> = space.degrees().into_iter().map(|p| ElementRefinement::Split([p + 1, p])).collect();
        let refined = space.refine(&plan, &space);
        let (u, _) = space.evaluate(x).unwrap();
        let (u_refined, _) = refined.evaluate(x).unwrap();
        assert_matrix_eq!(u_refined, u, comp = abs, tol = 1e-9);
    }
}
