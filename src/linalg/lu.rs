use nalgebra::{DMatrix, DVector};

use crate::linalg::{DenseLinearSolver, LinAlgError, LinAlgResult, check_dimensions, check_finite};

/// Pivots smaller than this fraction of the largest entry count as zero.
const SINGULARITY_THRESHOLD: f64 = 1e-14;

/// LU with partial pivoting. Accepts indefinite matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuSolver;

impl DenseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl DenseLinearSolver for DenseLuSolver {
    fn solve(&mut self, matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> LinAlgResult<DVector<f64>> {
        check_dimensions(matrix, rhs)?;

        let lu = matrix.clone().lu();
        let scale = matrix.amax().max(f64::MIN_POSITIVE);
        let smallest_pivot = lu.u().diagonal().amin();
        if smallest_pivot <= SINGULARITY_THRESHOLD * scale {
            return Err(LinAlgError::SingularMatrix);
        }

        let solution = lu.solve(rhs).ok_or(LinAlgError::SingularMatrix)?;
        check_finite(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_solves_indefinite_system() -> LinAlgResult<()> {
        // Eigenvalues 3 and -1.
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let rhs = dvector![3.0, 0.0];
        let mut solver = DenseLuSolver::new();
        let x = solver.solve(&matrix, &rhs)?;
        assert!((x - dvector![-1.0, 2.0]).norm() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_newton_step_on_rosenbrock_start() -> LinAlgResult<()> {
        // H and g of the Rosenbrock function (a = b = 1) at (-1, 0).
        let hessian = DMatrix::from_row_slice(2, 2, &[14.0, 4.0, 4.0, 2.0]);
        let gradient = dvector![-8.0, -2.0];
        let mut solver = DenseLuSolver::new();
        let step = solver.solve(&hessian, &(-gradient))?;
        assert!((step - dvector![2.0 / 3.0, -1.0 / 3.0]).norm() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let mut solver = DenseLuSolver::new();
        assert!(matches!(
            solver.solve(&matrix, &dvector![1.0, 1.0]),
            Err(LinAlgError::SingularMatrix)
        ));

        let zero = DMatrix::zeros(3, 3);
        assert!(solver.solve(&zero, &DVector::zeros(3)).is_err());
    }
}
