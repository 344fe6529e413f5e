use crate::system::{LinearSolver, NonlinearSystem};
use hpadapt_traits::Real;
use log::debug;
use nalgebra::{DVector, Scalar};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct NewtonResult<T>
where
    T: Scalar,
{
    pub solution: DVector<T>,
    /// Number of iterations performed, including the final one that detected convergence.
    pub iterations: usize,
    /// The l2 norm of the residual at the accepted solution.
    pub residual_norm: T,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NewtonSettings<T> {
    /// Maximum number of iterations. Zero is treated like one: a single correction is applied
    /// and then reported as divergence.
    pub max_iterations: usize,
    /// The iteration has converged once `|F(x)|_2 < tolerance`.
    pub tolerance: T,
}

#[derive(Debug)]
pub enum NewtonError {
    /// The iteration cap was reached without the residual norm dropping below the tolerance.
    Divergence { iterations: usize },
    /// The linear solver could not produce an increment. No update was applied in this
    /// iteration.
    LinearSolveFailure {
        iteration: usize,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl NewtonError {
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Divergence { .. })
    }

    pub fn is_linear_solve_failure(&self) -> bool {
        matches!(self, Self::LinearSolveFailure { .. })
    }
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::Divergence { iterations } => {
                write!(f, "Newton method did not converge within {} iterations.", iterations)
            }
            Self::LinearSolveFailure { iteration, source } => {
                write!(f, "Matrix solver failed in Newton iteration {}. Error: {}", iteration, source)
            }
        }
    }
}

impl Error for NewtonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Divergence { .. } => None,
            Self::LinearSolveFailure { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Solves `F(x) = 0` with Newton's method, starting from the state currently held by `system`.
///
/// Every iteration assembles `J` and `F` at the current state, solves `J dx = -F` and writes
/// `x + dx` back into the system. The iteration converges once `|F|_2 < tolerance`, but
/// never in the very first iteration: a fresh reference space may start out with a
/// misleadingly small residual, so at least one correction is always applied.
///
/// Iterations are counted from one and at most `max(settings.max_iterations, 1)` of them are
/// performed. Convergence is only detected when assembling, so once the correction of the last
/// admissible iteration has been applied, [`NewtonError::Divergence`] is returned. The state of
/// `system` then holds the last iterate.
pub fn newton<T, S, L>(
    system: &mut S,
    linear_solver: &mut L,
    settings: &NewtonSettings<T>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: Real,
    S: NonlinearSystem<T>,
    L: LinearSolver<T, S::Jacobian>,
{
    let mut x = system.current_state();
    assert_eq!(
        x.len(),
        system.num_unknowns(),
        "State length must match the number of unknowns"
    );

    let max_iterations = settings.max_iterations.max(1);
    for iteration in 1..=max_iterations {
        let (jacobian, residual) = system.assemble();
        let residual_norm = residual.norm();
        debug!(
            "Newton iter {}, ndof {}, res. l2 norm {}",
            iteration,
            system.num_unknowns(),
            residual_norm
        );

        if iteration > 1 && residual_norm < settings.tolerance {
            return Ok(NewtonResult {
                solution: x,
                iterations: iteration,
                residual_norm,
            });
        }

        // The linear system reads J(x^n) dx^{n + 1} = -F(x^n)
        let rhs = -residual;
        let dx = linear_solver
            .solve(&jacobian, &rhs)
            .map_err(|source| NewtonError::LinearSolveFailure { iteration, source })?;
        assert_eq!(dx.len(), x.len(), "Linear solver returned increment of wrong length");

        x += dx;
        system.store_state(&x);
    }

    Err(NewtonError::Divergence {
        iterations: max_iterations,
    })
}
