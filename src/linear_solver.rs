//! Linear solvers for the sparse systems arising in Newton's method and in projections.
use crate::optimize::system::LinearSolver;
use faer::linalg::solvers::Solve;
use faer::sparse::{SparseColMat, Triplet};
use faer::col::Col;
use faer::mat::Mat;
use log::trace;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularMatrixError {
    pub dim: usize,
}

impl Display for SingularMatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix of dimension {} x {} is singular.", self.dim, self.dim)
    }
}

impl Error for SingularMatrixError {}

fn check_dimensions(matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) {
    assert_eq!(matrix.nrows(), matrix.ncols(), "Matrix must be square");
    assert_eq!(matrix.nrows(), rhs.len(), "Dimensions of matrix and right-hand side must match");
}

fn singular(dim: usize) -> Box<dyn Error + Send + Sync> {
    Box::new(SingularMatrixError { dim })
}

/// Solves `A x = b` with a sparse LU decomposition of `A`.
///
/// The Jacobians of one-dimensional problems are banded, so the factorization has essentially
/// no fill-in and its cost grows linearly with the number of DOFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLuSolver;

impl SparseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl LinearSolver<f64, CsrMatrix<f64>> for SparseLuSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, Box<dyn Error + Send + Sync>> {
        check_dimensions(matrix, rhs);
        let n = rhs.len();
        if n == 0 {
            return Ok(DVector::zeros(0));
        }

        let triplets: Vec<_> = matrix
            .triplet_iter()
            .map(|(i, j, v)| Triplet::new(i, j, *v))
            .collect();
        let matrix = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|err| format!("Failed to convert matrix to column-major format: {:?}", err))?;
        let lu = matrix.sp_lu().map_err(|err| {
            trace!("Sparse LU factorization failed: {:?}", err);
            singular(n)
        })?;

        let b = Col::<f64>::from_fn(n, |i| rhs[i]);
        let x: Mat<f64> = lu.solve(b.as_mat());
        let x = DVector::from_fn(n, |i, _| *x.get(i, 0));
        if x.iter().all(|x_i| x_i.is_finite()) {
            Ok(x)
        } else {
            Err(singular(n))
        }
    }
}

/// Solves `A x = b` by converting `A` to a dense matrix and computing its LU decomposition
/// with partial pivoting.
///
/// Only practical for small systems, but independent of any sparse factorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuSolver;

impl DenseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl LinearSolver<f64, CsrMatrix<f64>> for DenseLuSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, Box<dyn Error + Send + Sync>> {
        check_dimensions(matrix, rhs);
        let dense = DMatrix::from(matrix);
        dense
            .lu()
            .solve(rhs)
            .filter(|x| x.iter().all(|x_i| x_i.is_finite()))
            .ok_or_else(|| singular(rhs.len()))
    }
}
