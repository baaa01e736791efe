//! Rosenbrock function, the standard benchmark for descent methods.

use super::Objective;
use nalgebra::{DMatrix, DVector};

/// Two-dimensional Rosenbrock function.
///
/// ```text
/// f(x) = (a − x₀)² + b·(x₁ − x₀²)²
/// ```
///
/// The global minimum `f = 0` lies at `(a, a²)` at the bottom of a narrow curved
/// valley. The Hessian depends on `x` and is indefinite wherever
/// `x₁ > x₀² + 1/(2b)`.
///
/// # Example
///
/// ```
/// use chain_ik::objectives::{Objective, RosenbrockObjective};
/// use nalgebra::{DVector, dvector};
///
/// let mut rosenbrock = RosenbrockObjective::new(1.0, 100.0);
/// let mut gradient = DVector::zeros(2);
/// let f = rosenbrock.evaluate_gradient(&dvector![1.0, 1.0], &mut gradient);
/// assert_eq!(f, 0.0);
/// assert_eq!(gradient.norm(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosenbrockObjective {
    pub a: f64,
    pub b: f64,
}

impl RosenbrockObjective {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    fn gradient_at(&self, x: &DVector<f64>) -> DVector<f64> {
        let (a, b) = (self.a, self.b);
        let valley = x[1] - x[0] * x[0];
        DVector::from_vec(vec![
            2.0 * (-(a - x[0]) - 2.0 * b * x[0] * valley),
            2.0 * b * valley,
        ])
    }

    fn hessian_at(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let b = self.b;
        let off_diagonal = -4.0 * b * x[0];
        DMatrix::from_row_slice(
            2,
            2,
            &[
                2.0 * (2.0 * b * (3.0 * x[0] * x[0] - x[1]) + 1.0),
                off_diagonal,
                off_diagonal,
                2.0 * b,
            ],
        )
    }
}

impl Default for RosenbrockObjective {
    fn default() -> Self {
        Self::new(1.0, 100.0)
    }
}

impl Objective for RosenbrockObjective {
    fn dimension(&self) -> usize {
        2
    }

    fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
        let valley = x[1] - x[0] * x[0];
        (self.a - x[0]).powi(2) + self.b * valley * valley
    }

    fn evaluate_gradient(&mut self, x: &DVector<f64>, gradient: &mut DVector<f64>) -> f64 {
        *gradient = self.gradient_at(x);
        self.evaluate(x)
    }

    fn evaluate_hessian(
        &mut self,
        x: &DVector<f64>,
        gradient: &mut DVector<f64>,
        hessian: &mut DMatrix<f64>,
    ) -> f64 {
        *hessian = self.hessian_at(x);
        self.evaluate_gradient(x, gradient)
    }
}
