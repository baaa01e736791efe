//! Scalar objectives minimized by the optimizers.
//!
//! An objective maps a parameter vector `x ∈ ℝⁿ` to a cost and can additionally
//! provide its gradient and Hessian. The optimizers only ever talk to this trait,
//! so a new cost plugs into gradient descent, Newton and BFGS without changes.
//!
//! # Capabilities
//!
//! ```text
//! evaluate           x ↦ f(x)
//! evaluate_gradient  x ↦ f(x), ∇f(x)
//! evaluate_hessian   x ↦ f(x), ∇f(x), ∇²f(x)
//! ```
//!
//! # Objectives
//!
//! - [`RosenbrockObjective`]: the classic banana-valley test function in 2D
//! - [`LinkObjective`]: inverse-kinematics cost of a planar link chain
//!
//! The finite-difference helpers at the bottom of this module check analytical
//! derivatives against central differences.

use nalgebra::{DMatrix, DVector};

pub mod link_chain;
pub mod rosenbrock;

pub use link_chain::LinkObjective;
pub use rosenbrock::RosenbrockObjective;

/// A twice-differentiable scalar cost.
///
/// Outputs are written into caller-provided buffers, which are resized when their
/// length does not match [`Objective::dimension`]. Evaluation may mutate the
/// objective (the link-chain cost writes `x` into its chain), hence `&mut self`.
///
/// # Example
///
/// ```
/// use chain_ik::objectives::Objective;
/// use nalgebra::{DMatrix, DVector};
///
/// // f(x) = ½‖x‖²
/// struct HalfSquaredNorm;
///
/// impl Objective for HalfSquaredNorm {
///     fn dimension(&self) -> usize { 3 }
///
///     fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
///         0.5 * x.norm_squared()
///     }
///
///     fn evaluate_gradient(&mut self, x: &DVector<f64>, gradient: &mut DVector<f64>) -> f64 {
///         *gradient = x.clone();
///         self.evaluate(x)
///     }
///
///     fn evaluate_hessian(
///         &mut self,
///         x: &DVector<f64>,
///         gradient: &mut DVector<f64>,
///         hessian: &mut DMatrix<f64>,
///     ) -> f64 {
///         *hessian = DMatrix::identity(3, 3);
///         self.evaluate_gradient(x, gradient)
///     }
/// }
/// ```
pub trait Objective {
    /// Number of parameters `n`.
    fn dimension(&self) -> usize;

    /// Cost at `x`.
    fn evaluate(&mut self, x: &DVector<f64>) -> f64;

    /// Cost at `x`; the gradient is written into `gradient`.
    fn evaluate_gradient(&mut self, x: &DVector<f64>, gradient: &mut DVector<f64>) -> f64;

    /// Cost at `x`; gradient and Hessian are written into `gradient` and `hessian`.
    fn evaluate_hessian(
        &mut self,
        x: &DVector<f64>,
        gradient: &mut DVector<f64>,
        hessian: &mut DMatrix<f64>,
    ) -> f64;
}

/// Central-difference gradient of `objective` at `x`.
///
/// ```text
/// ∂f/∂xᵢ ≈ [ f(x + h eᵢ) − f(x − h eᵢ) ] / 2h
/// ```
pub fn numerical_gradient<O: Objective + ?Sized>(
    objective: &mut O,
    x: &DVector<f64>,
    step: f64,
) -> DVector<f64> {
    let mut gradient = DVector::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        probe[i] = x[i] + step;
        let plus = objective.evaluate(&probe);
        probe[i] = x[i] - step;
        let minus = objective.evaluate(&probe);
        probe[i] = x[i];
        gradient[i] = (plus - minus) / (2.0 * step);
    }
    // Leave the objective evaluated at x.
    objective.evaluate(x);
    gradient
}

/// Central-difference Hessian of `objective` at `x`, built from the analytical
/// gradient and symmetrized.
pub fn numerical_hessian<O: Objective + ?Sized>(
    objective: &mut O,
    x: &DVector<f64>,
    step: f64,
) -> DMatrix<f64> {
    let n = x.len();
    let mut hessian = DMatrix::zeros(n, n);
    let mut probe = x.clone();
    let mut plus = DVector::zeros(n);
    let mut minus = DVector::zeros(n);
    for j in 0..n {
        probe[j] = x[j] + step;
        objective.evaluate_gradient(&probe, &mut plus);
        probe[j] = x[j] - step;
        objective.evaluate_gradient(&probe, &mut minus);
        probe[j] = x[j];
        hessian.set_column(j, &((&plus - &minus) / (2.0 * step)));
    }
    objective.evaluate(x);
    (&hessian + hessian.transpose()) * 0.5
}

/// Largest elementwise relative error `|a − b| / max(1, |a|, |b|)`.
///
/// Takes column-major slices so vectors and matrices compare alike.
pub fn max_relative_error(analytic: &[f64], numeric: &[f64]) -> f64 {
    analytic
        .iter()
        .zip(numeric.iter())
        .map(|(&a, &b)| (a - b).abs() / 1.0_f64.max(a.abs()).max(b.abs()))
        .fold(0.0, f64::max)
}
