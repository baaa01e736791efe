//! Dense linear solvers for the Newton system `H·p = −g`.
//!
//! Problems here have at most tens of parameters, so the Hessian is stored densely
//! and factorized with nalgebra's decompositions:
//!
//! - [`DenseLuSolver`]: LU with partial pivoting, accepts any non-singular `H`
//! - [`DenseCholeskySolver`]: Cholesky, only accepts symmetric positive-definite `H`,
//!   which guarantees the Newton step is a descent direction

pub mod cholesky;
pub mod lu;

use nalgebra::{DMatrix, DVector};
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::error;

pub use cholesky::DenseCholeskySolver;
pub use lu::DenseLuSolver;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LinearSolverType {
    #[default]
    Lu,
    Cholesky,
}

impl Display for LinearSolverType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LinearSolverType::Lu => write!(f, "Dense LU"),
            LinearSolverType::Cholesky => write!(f, "Dense Cholesky"),
        }
    }
}

/// Linear algebra specific error types for chain-ik
#[derive(Debug, Clone, Error)]
pub enum LinAlgError {
    /// Singular or near-singular matrix detected
    #[error("Singular matrix detected (matrix is not invertible)")]
    SingularMatrix,

    /// Cholesky factorization requires a symmetric positive-definite matrix
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    /// System matrix and right-hand side do not fit together
    #[error("Dimension mismatch: {rows}x{cols} matrix with a right-hand side of length {rhs}")]
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },

    /// The solve produced NaN or infinite entries
    #[error("Linear solve produced non-finite values")]
    NonFiniteSolution,
}

impl LinAlgError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// solver.solve(&hessian, &rhs)
    ///     .map_err(|e| e.log())?;
    /// ```
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error with the original source error for debugging context
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for linear algebra operations
pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Trait for dense solvers of square systems `A·x = b`
pub trait DenseLinearSolver {
    /// Solve `matrix · x = rhs`.
    ///
    /// # Errors
    /// Returns `LinAlgError` if:
    /// - The shapes do not fit
    /// - The factorization fails (singular or not positive definite)
    /// - The solution contains non-finite values
    fn solve(&mut self, matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> LinAlgResult<DVector<f64>>;
}

/// Build the solver selected by `solver_type`.
pub fn create_linear_solver(solver_type: LinearSolverType) -> Box<dyn DenseLinearSolver> {
    match solver_type {
        LinearSolverType::Lu => Box::new(DenseLuSolver::new()),
        LinearSolverType::Cholesky => Box::new(DenseCholeskySolver::new()),
    }
}

/// Shape check shared by the solvers.
fn check_dimensions(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> LinAlgResult<()> {
    if !matrix.is_square() || matrix.nrows() != rhs.len() {
        return Err(LinAlgError::DimensionMismatch {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            rhs: rhs.len(),
        });
    }
    Ok(())
}

/// Reject solutions that overflowed or hit a NaN pivot.
fn check_finite(solution: DVector<f64>) -> LinAlgResult<DVector<f64>> {
    if solution.iter().all(|v| v.is_finite()) {
        Ok(solution)
    } else {
        Err(LinAlgError::NonFiniteSolution)
    }
}
