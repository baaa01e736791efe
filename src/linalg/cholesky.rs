use nalgebra::{DMatrix, DVector};

use crate::linalg::{DenseLinearSolver, LinAlgError, LinAlgResult, check_dimensions, check_finite};

/// Cholesky `A = L·Lᵀ` for symmetric positive-definite systems.
///
/// Only the lower triangle of the matrix is read. Factorization fails for
/// indefinite or singular matrices, which makes this solver a descent guard for
/// Newton's method: a step it returns always points downhill.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseCholeskySolver;

impl DenseCholeskySolver {
    pub fn new() -> Self {
        Self
    }
}

impl DenseLinearSolver for DenseCholeskySolver {
    fn solve(&mut self, matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> LinAlgResult<DVector<f64>> {
        check_dimensions(matrix, rhs)?;

        let cholesky = matrix
            .clone()
            .cholesky()
            .ok_or(LinAlgError::NotPositiveDefinite)?;
        check_finite(cholesky.solve(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_solves_positive_definite_system() -> LinAlgResult<()> {
        let matrix = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let rhs = dvector![1.0, -2.0, 0.5];
        let mut solver = DenseCholeskySolver::new();
        let x = solver.solve(&matrix, &rhs)?;
        assert!((&matrix * x - rhs).norm() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_indefinite_matrix_is_rejected() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let mut solver = DenseCholeskySolver::new();
        assert!(matches!(
            solver.solve(&matrix, &dvector![1.0, 0.0]),
            Err(LinAlgError::NotPositiveDefinite)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut solver = DenseCholeskySolver::new();
        assert!(matches!(
            solver.solve(&DMatrix::identity(2, 2), &dvector![1.0]),
            Err(LinAlgError::DimensionMismatch { .. })
        ));
    }
}
