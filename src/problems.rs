//! Model problems with known solutions.
use crate::space::{BoundaryConditions, DirichletBc};
use crate::weak_form::{PreviousSolution, QuadratureData, ShapeFunction, WeakForm};
use nalgebra::{dvector, DVector};

/// A closed-form solution of a system, giving values and derivatives of all components.
pub trait ExactSolution {
    fn evaluate(&self, x: f64) -> (DVector<f64>, DVector<f64>);
}

impl<F> ExactSolution for F
where
    F: Fn(f64) -> (DVector<f64>, DVector<f64>),
{
    fn evaluate(&self, x: f64) -> (DVector<f64>, DVector<f64>) {
        self(x)
    }
}

/// `∫ u' v` for a trial function `u` and test function `v`.
fn derivative_times_test(q: &QuadratureData, trial: &ShapeFunction, test: &ShapeFunction) -> f64 {
    q.integrate(|i| trial.derivatives[i] * test.values[i])
}

/// `∫ u v`.
fn mass(q: &QuadratureData, trial: &ShapeFunction, test: &ShapeFunction) -> f64 {
    q.integrate(|i| trial.values[i] * test.values[i])
}

/// The harmonic oscillator `u'' + k² u = 0` written as a first-order system
///
/// ```text
/// u_0' - u_1 = 0,
/// k² u_0 + u_1' = 0,
/// ```
///
/// with `u_0(0) = 0` and `u_1(0) = k`, solved by `u_0 = sin(k x)`, `u_1 = k cos(k x)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HarmonicSystem {
    pub k: f64,
}

impl Default for HarmonicSystem {
    fn default() -> Self {
        Self { k: 1.0 }
    }
}

impl HarmonicSystem {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn num_equations(&self) -> usize {
        2
    }

    /// Initial conditions at the left end of the domain, which must start at zero.
    pub fn boundary_conditions(&self) -> BoundaryConditions {
        BoundaryConditions::none()
            .with_left(DirichletBc::new(0, 0.0))
            .with_left(DirichletBc::new(1, self.k))
    }

    pub fn weak_form(&self) -> WeakForm {
        let k2 = self.k * self.k;
        let mut form = WeakForm::new(2);

        form.add_jacobian_form(
            0,
            0,
            |q: &QuadratureData, du: &ShapeFunction, v: &ShapeFunction, _: &PreviousSolution| {
                derivative_times_test(q, du, v)
            },
        );
        form.add_jacobian_form(
            0,
            1,
            |q: &QuadratureData, du: &ShapeFunction, v: &ShapeFunction, _: &PreviousSolution| -mass(q, du, v),
        );
        form.add_jacobian_form(
            1,
            0,
            move |q: &QuadratureData, du: &ShapeFunction, v: &ShapeFunction, _: &PreviousSolution| {
                k2 * mass(q, du, v)
            },
        );
        form.add_jacobian_form(
            1,
            1,
            |q: &QuadratureData, du: &ShapeFunction, v: &ShapeFunction, _: &PreviousSolution| {
                derivative_times_test(q, du, v)
            },
        );

        form.add_residual_form(0, |q: &QuadratureData, v: &ShapeFunction, u: &PreviousSolution| {
            q.integrate(|i| (u.derivative(0, i) - u.value(1, i)) * v.values[i])
        });
        form.add_residual_form(1, move |q: &QuadratureData, v: &ShapeFunction, u: &PreviousSolution| {
            q.integrate(|i| (k2 * u.value(0, i) + u.derivative(1, i)) * v.values[i])
        });
        form
    }
}

impl ExactSolution for HarmonicSystem {
    fn evaluate(&self, x: f64) -> (DVector<f64>, DVector<f64>) {
        let k = self.k;
        let (s, c) = (k * x).sin_cos();
        (dvector![s, k * c], dvector![k * c, -k * k * s])
    }
}

/// The scalar Riccati equation `u' + u² = 0` with `u(0) = u_0`, solved by
/// `u = u_0 / (1 + u_0 x)`.
///
/// Unlike [`HarmonicSystem`], the discrete problem is nonlinear and Newton's method needs
/// several iterations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RiccatiDecay {
    pub initial_value: f64,
}

impl Default for RiccatiDecay {
    fn default() -> Self {
        Self { initial_value: 1.0 }
    }
}

impl RiccatiDecay {
    pub fn new(initial_value: f64) -> Self {
        Self { initial_value }
    }

    pub fn num_equations(&self) -> usize {
        1
    }

    /// The initial condition at the left end of the domain, which must start at zero.
    pub fn boundary_conditions(&self) -> BoundaryConditions {
        BoundaryConditions::none().with_left(DirichletBc::new(0, self.initial_value))
    }

    pub fn weak_form(&self) -> WeakForm {
        let mut form = WeakForm::new(1);
        form.add_jacobian_form(
            0,
            0,
            |q: &QuadratureData, du: &ShapeFunction, v: &ShapeFunction, u: &PreviousSolution| {
                q.integrate(|i| (du.derivatives[i] + 2.0 * u.value(0, i) * du.values[i]) * v.values[i])
            },
        );
        form.add_residual_form(0, |q: &QuadratureData, v: &ShapeFunction, u: &PreviousSolution| {
            q.integrate(|i| (u.derivative(0, i) + u.value(0, i).powi(2)) * v.values[i])
        });
        form
    }
}

impl ExactSolution for RiccatiDecay {
    fn evaluate(&self, x: f64) -> (DVector<f64>, DVector<f64>) {
        let u0 = self.initial_value;
        let denominator = 1.0 + u0 * x;
        (dvector![u0 / denominator], dvector![-(u0 * u0) / (denominator * denominator)])
    }
}
