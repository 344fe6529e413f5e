//! Assembly of global Jacobians and residuals.
use crate::basis::ShapeTable;
use crate::optimize::system::NonlinearSystem;
use crate::quadrature::{gauss, map_to_interval, Rule};
use crate::space::{Element, Space};
use crate::weak_form::{PreviousSolution, QuadratureData, ShapeFunction, WeakForm};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::HashMap;

/// The number of Gauss points used on an element of the given degree.
///
/// Products of two shape functions and the current solution (which is as much as the
/// nonlinearities of the model problems need) are integrated exactly.
pub fn num_quadrature_points(degree: usize) -> usize {
    2 * degree + 2
}

/// Per-element data needed to evaluate weak forms.
#[derive(Debug, Clone)]
struct ElementData {
    quadrature: QuadratureData,
    shape_functions: Vec<ShapeFunction>,
    previous: PreviousSolution,
}

impl ElementData {
    fn new(element: &Element, reference_rule: &Rule) -> Self {
        let (weights, points) = map_to_interval(reference_rule, element.interval());
        let table = ShapeTable::tabulate(element.degree(), &reference_rule.1);
        let num_points = table.num_points();
        let n = element.degree() + 1;
        let inverse_jacobian = 1.0 / element.jacobian();

        let mut shape_functions = vec![ShapeFunction::default(); n];
        for (k, shape_function) in shape_functions.iter_mut().enumerate() {
            shape_function.values = (0..num_points).map(|i| table.values_at(i)[k]).collect();
            shape_function.derivatives = (0..num_points)
                .map(|i| table.derivatives_at(i)[k] * inverse_jacobian)
                .collect();
        }

        // Columns of phi are the shape functions evaluated at the quadrature points
        let phi = DMatrix::from_fn(n, num_points, |k, i| shape_functions[k].values[i]);
        let dphi = DMatrix::from_fn(n, num_points, |k, i| shape_functions[k].derivatives[i]);
        let previous = PreviousSolution::new(element.coefficients() * phi, element.coefficients() * dphi);

        Self {
            quadrature: QuadratureData { weights, points },
            shape_functions,
            previous,
        }
    }
}

/// Assembles the discrete nonlinear system defined by a [`WeakForm`] on a [`Space`].
///
/// Rows correspond to the DOFs of the test functions of each equation, columns to the DOFs of
/// each solution component. Dirichlet vertex functions are neither tested against nor solved
/// for, but the Dirichlet values enter the residual through the current solution.
#[derive(Debug)]
pub struct DiscreteProblem<'a> {
    weak_form: &'a WeakForm,
}

impl<'a> DiscreteProblem<'a> {
    pub fn new(weak_form: &'a WeakForm) -> Self {
        Self { weak_form }
    }

    pub fn weak_form(&self) -> &'a WeakForm {
        self.weak_form
    }

    fn check_space(&self, space: &Space) {
        assert_eq!(
            space.num_equations(),
            self.weak_form.num_equations(),
            "Space and weak form must have the same number of equations"
        );
    }

    /// Assembles the Jacobian and residual at the solution currently held by `space`.
    pub fn assemble(&self, space: &Space) -> (CsrMatrix<f64>, DVector<f64>) {
        self.check_space(space);
        let num_dofs = space.num_dofs();
        let mut jacobian = CooMatrix::new(num_dofs, num_dofs);
        let mut residual = DVector::zeros(num_dofs);
        let mut rules = HashMap::new();

        for element in space.elements() {
            let rule = rules
                .entry(num_quadrature_points(element.degree()))
                .or_insert_with_key(|&num_points| gauss(num_points));
            let data = ElementData::new(element, rule);
            let n = data.shape_functions.len();

            for (equation, component, form) in self.weak_form.jacobian_forms() {
                for k in 0..n {
                    let Some(row) = element.dof(equation, k) else { continue };
                    for l in 0..n {
                        let Some(col) = element.dof(component, l) else { continue };
                        let value = form.evaluate(
                            &data.quadrature,
                            &data.shape_functions[l],
                            &data.shape_functions[k],
                            &data.previous,
                        );
                        jacobian.push(row, col, value);
                    }
                }
            }

            self.assemble_element_residual(element, &data, &mut residual);
        }

        (CsrMatrix::from(&jacobian), residual)
    }

    /// Assembles only the residual at the solution currently held by `space`.
    pub fn assemble_residual(&self, space: &Space) -> DVector<f64> {
        self.check_space(space);
        let mut residual = DVector::zeros(space.num_dofs());
        let mut rules = HashMap::new();
        for element in space.elements() {
            let rule = rules
                .entry(num_quadrature_points(element.degree()))
                .or_insert_with_key(|&num_points| gauss(num_points));
            let data = ElementData::new(element, rule);
            self.assemble_element_residual(element, &data, &mut residual);
        }
        residual
    }

    fn assemble_element_residual(&self, element: &Element, data: &ElementData, residual: &mut DVector<f64>) {
        for (equation, form) in self.weak_form.residual_forms() {
            for (k, test) in data.shape_functions.iter().enumerate() {
                if let Some(row) = element.dof(equation, k) {
                    residual[row] += form.evaluate(&data.quadrature, test, &data.previous);
                }
            }
        }
    }
}

/// A [`NonlinearSystem`] whose state lives in a [`Space`].
///
/// Newton's method reads its initial iterate from the space and writes every update back, so
/// that the assembler always sees the current iterate.
#[derive(Debug)]
pub struct SpaceSystem<'a, 'b> {
    space: &'a mut Space,
    problem: &'a DiscreteProblem<'b>,
}

impl<'a, 'b> SpaceSystem<'a, 'b> {
    pub fn new(space: &'a mut Space, problem: &'a DiscreteProblem<'b>) -> Self {
        Self { space, problem }
    }

    pub fn space(&self) -> &Space {
        &*self.space
    }
}

impl<'a, 'b> NonlinearSystem<f64> for SpaceSystem<'a, 'b> {
    type Jacobian = CsrMatrix<f64>;

    fn num_unknowns(&self) -> usize {
        self.space.num_dofs()
    }

    fn current_state(&self) -> DVector<f64> {
        self.space.coefficients()
    }

    fn store_state(&mut self, x: &DVector<f64>) {
        self.space.set_coefficients(x);
    }

    fn assemble(&mut self) -> (CsrMatrix<f64>, DVector<f64>) {
        self.problem.assemble(&*self.space)
    }
}
