use nalgebra::{DVector, Scalar};
use std::error::Error;

/// A nonlinear system `F(x) = 0` whose state `x` is owned by some external store.
///
/// The store (for example a finite element space) is the durable owner of the state. Newton's
/// method works on a copy obtained from [`current_state`](Self::current_state) and writes every
/// update back with [`store_state`](Self::store_state), so that the next call to
/// [`assemble`](Self::assemble) sees the new iterate.
pub trait NonlinearSystem<T>
where
    T: Scalar,
{
    /// Representation of the Jacobian matrix `dF/dx`.
    type Jacobian;

    fn num_unknowns(&self) -> usize;

    /// Returns a copy of the current state.
    fn current_state(&self) -> DVector<T>;

    /// Overwrites the state held by the store.
    fn store_state(&mut self, x: &DVector<T>);

    /// Assembles the Jacobian and the residual at the current state.
    fn assemble(&mut self) -> (Self::Jacobian, DVector<T>);
}

impl<T, S> NonlinearSystem<T> for &mut S
where
    T: Scalar,
    S: NonlinearSystem<T>,
{
    type Jacobian = S::Jacobian;

    fn num_unknowns(&self) -> usize {
        S::num_unknowns(self)
    }

    fn current_state(&self) -> DVector<T> {
        S::current_state(self)
    }

    fn store_state(&mut self, x: &DVector<T>) {
        S::store_state(self, x)
    }

    fn assemble(&mut self) -> (Self::Jacobian, DVector<T>) {
        S::assemble(self)
    }
}

/// Solves linear systems `A x = b` for a particular matrix representation.
pub trait LinearSolver<T, Matrix>
where
    T: Scalar,
{
    fn solve(&mut self, matrix: &Matrix, rhs: &DVector<T>) -> Result<DVector<T>, Box<dyn Error + Send + Sync>>;
}

impl<T, Matrix, S> LinearSolver<T, Matrix> for &mut S
where
    T: Scalar,
    S: ?Sized + LinearSolver<T, Matrix>,
{
    fn solve(&mut self, matrix: &Matrix, rhs: &DVector<T>) -> Result<DVector<T>, Box<dyn Error + Send + Sync>> {
        S::solve(self, matrix, rhs)
    }
}

impl<T, Matrix, S> LinearSolver<T, Matrix> for Box<S>
where
    T: Scalar,
    S: ?Sized + LinearSolver<T, Matrix>,
{
    fn solve(&mut self, matrix: &Matrix, rhs: &DVector<T>) -> Result<DVector<T>, Box<dyn Error + Send + Sync>> {
        S::solve(self, matrix, rhs)
    }
}
