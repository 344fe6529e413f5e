//! Weak forms of systems of first-order equations.
//!
//! A system of `N` equations in `N` unknown components `u_0, ..., u_{N-1}` is described by
//! residual forms `F_i(u; v)`, one per equation `i`, and by Jacobian forms
//! `J_ij(u; du, v) = dF_i/du_j (u)[du]` for every block `(i, j)` that is not identically zero.
//! Both are element integrals, evaluated by the assembler with physical quadrature points
//! and weights, the shape functions involved and the current solution `u` at the quadrature
//! points.
use nalgebra::DMatrix;

/// Physical quadrature points and weights of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadratureData {
    pub weights: Vec<f64>,
    pub points: Vec<f64>,
}

impl QuadratureData {
    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    /// Approximates `∫ f(i)` over the element, where `f` receives quadrature point indices.
    pub fn integrate(&self, f: impl Fn(usize) -> f64) -> f64 {
        self.weights.iter().enumerate().map(|(i, w)| w * f(i)).sum()
    }
}

/// Values and physical derivatives of one shape function at the quadrature points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeFunction {
    pub values: Vec<f64>,
    pub derivatives: Vec<f64>,
}

/// Values and physical derivatives of all solution components at the quadrature points,
/// for the iterate at which the forms are linearized.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousSolution {
    // num_components x num_points
    values: DMatrix<f64>,
    derivatives: DMatrix<f64>,
}

impl PreviousSolution {
    pub fn new(values: DMatrix<f64>, derivatives: DMatrix<f64>) -> Self {
        assert_eq!(values.shape(), derivatives.shape());
        Self { values, derivatives }
    }

    pub fn num_components(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_points(&self) -> usize {
        self.values.ncols()
    }

    pub fn value(&self, component: usize, point: usize) -> f64 {
        self.values[(component, point)]
    }

    pub fn derivative(&self, component: usize, point: usize) -> f64 {
        self.derivatives[(component, point)]
    }
}

/// A block `J_ij(u; du, v)` of the Jacobian.
pub trait JacobianForm {
    fn evaluate(
        &self,
        quadrature: &QuadratureData,
        trial: &ShapeFunction,
        test: &ShapeFunction,
        previous: &PreviousSolution,
    ) -> f64;
}

impl<F> JacobianForm for F
where
    F: Fn(&QuadratureData, &ShapeFunction, &ShapeFunction, &PreviousSolution) -> f64,
{
    fn evaluate(
        &self,
        quadrature: &QuadratureData,
        trial: &ShapeFunction,
        test: &ShapeFunction,
        previous: &PreviousSolution,
    ) -> f64 {
        self(quadrature, trial, test, previous)
    }
}

/// A residual `F_i(u; v)`.
pub trait ResidualForm {
    fn evaluate(&self, quadrature: &QuadratureData, test: &ShapeFunction, previous: &PreviousSolution) -> f64;
}

impl<F> ResidualForm for F
where
    F: Fn(&QuadratureData, &ShapeFunction, &PreviousSolution) -> f64,
{
    fn evaluate(&self, quadrature: &QuadratureData, test: &ShapeFunction, previous: &PreviousSolution) -> f64 {
        self(quadrature, test, previous)
    }
}

/// Registry of the Jacobian and residual forms of a system of equations.
pub struct WeakForm {
    num_equations: usize,
    jacobian_forms: Vec<(usize, usize, Box<dyn JacobianForm>)>,
    residual_forms: Vec<(usize, Box<dyn ResidualForm>)>,
}

impl std::fmt::Debug for WeakForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blocks: Vec<_> = self.jacobian_forms.iter().map(|(i, j, _)| (i, j)).collect();
        let residuals: Vec<_> = self.residual_forms.iter().map(|(i, _)| i).collect();
        f.debug_struct("WeakForm")
            .field("num_equations", &self.num_equations)
            .field("jacobian_blocks", &blocks)
            .field("residual_equations", &residuals)
            .finish()
    }
}

impl WeakForm {
    pub fn new(num_equations: usize) -> Self {
        assert!(num_equations > 0, "A weak form needs at least one equation");
        Self {
            num_equations,
            jacobian_forms: Vec::new(),
            residual_forms: Vec::new(),
        }
    }

    pub fn num_equations(&self) -> usize {
        self.num_equations
    }

    /// Registers the Jacobian block of the given equation with respect to the given
    /// solution component. Several forms for the same block are summed.
    pub fn add_jacobian_form(&mut self, equation: usize, component: usize, form: impl JacobianForm + 'static) {
        assert!(equation < self.num_equations, "Equation index out of bounds");
        assert!(component < self.num_equations, "Component index out of bounds");
        self.jacobian_forms.push((equation, component, Box::new(form)));
    }

    /// Registers a residual of the given equation. Several forms for the same equation are
    /// summed.
    pub fn add_residual_form(&mut self, equation: usize, form: impl ResidualForm + 'static) {
        assert!(equation < self.num_equations, "Equation index out of bounds");
        self.residual_forms.push((equation, Box::new(form)));
    }

    /// Iterates over `(equation, component, form)`.
    pub fn jacobian_forms(&self) -> impl Iterator<Item = (usize, usize, &dyn JacobianForm)> {
        self.jacobian_forms
            .iter()
            .map(|(i, j, form)| (*i, *j, form.as_ref()))
    }

    /// Iterates over `(equation, form)`.
    pub fn residual_forms(&self) -> impl Iterator<Item = (usize, &dyn ResidualForm)> {
        self.residual_forms.iter().map(|(i, form)| (*i, form.as_ref()))
    }
}
