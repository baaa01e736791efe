//! BFGS quasi-Newton method with backtracking line search.
//!
//! BFGS builds an approximation `A ≈ H⁻¹` of the inverse Hessian from the
//! gradients it has already seen and never evaluates second derivatives.
//!
//! # Algorithm
//!
//! `A` starts at the identity on every call. From the second iteration on, with
//! `s = xₖ − xₖ₋₁` and `y = gₖ − gₖ₋₁`:
//!
//! ```text
//! ρ = 1 / (yᵀs)
//! A ← (I − ρ·s·yᵀ) · A · (I − ρ·y·sᵀ) + ρ·s·sᵀ
//! p = −A·g
//! ```
//!
//! The update is applied for any curvature `yᵀs` that gives a finite ρ, negative
//! values included. Only `yᵀs = 0` or a non-finite ρ skips it. With
//! [`BfgsConfig::with_curvature_guard`] every pair with `yᵀs ≤ 1e-14` is skipped
//! too, which keeps `A` positive definite.
//!
//! Parameters are usually joint angles, so the result is wrapped into (−π, π] by
//! default.

use crate::objectives::Objective;
use crate::optimizer::{
    self, BacktrackingLineSearch, OptimizerResult, OptimizerType, SearchDirection, SolverResult,
    descent::{self, DescentSettings},
};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Smallest curvature `yᵀs` that still gets an update when the guard is on.
const CURVATURE_THRESHOLD: f64 = 1e-14;

/// Configuration parameters for BFGS.
///
/// ```
/// use chain_ik::optimizer::BfgsConfig;
///
/// let config = BfgsConfig::new()
///     .with_max_iterations(150)
///     .with_backtracking_factor(0.5)
///     .with_wrap_angles(false);
/// ```
#[derive(Debug, Clone)]
pub struct BfgsConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Stop once ‖g‖ falls below this value
    pub gradient_tolerance: f64,
    /// First step length tried by the line search
    pub initial_step: f64,
    /// Factor the step length shrinks by after a failed trial
    pub backtracking_factor: f64,
    /// Maximum number of line-search trials per iteration
    pub max_line_search_iterations: usize,
    /// Wrap the returned parameters into (−π, π]
    pub wrap_angles: bool,
    /// Skip updates whose curvature `yᵀs` is not safely positive
    pub curvature_guard: bool,
}

impl Default for BfgsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            initial_step: 1.0,
            backtracking_factor: 0.5,
            max_line_search_iterations: 20,
            wrap_angles: true,
            curvature_guard: false,
        }
    }
}

impl BfgsConfig {
    /// Create a new BFGS configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the gradient tolerance
    pub fn with_gradient_tolerance(mut self, gradient_tolerance: f64) -> Self {
        self.gradient_tolerance = gradient_tolerance;
        self
    }

    /// Set the first step length of every line search
    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }

    /// Set the backtracking factor
    pub fn with_backtracking_factor(mut self, backtracking_factor: f64) -> Self {
        self.backtracking_factor = backtracking_factor;
        self
    }

    /// Set the maximum number of line-search trials
    pub fn with_max_line_search_iterations(mut self, max_line_search_iterations: usize) -> Self {
        self.max_line_search_iterations = max_line_search_iterations;
        self
    }

    /// Enable or disable wrapping of the result into (−π, π]
    pub fn with_wrap_angles(mut self, wrap_angles: bool) -> Self {
        self.wrap_angles = wrap_angles;
        self
    }

    /// Skip updates with `yᵀs ≤ 1e-14` instead of applying them
    pub fn with_curvature_guard(mut self, curvature_guard: bool) -> Self {
        self.curvature_guard = curvature_guard;
        self
    }

    fn descent_settings(&self) -> OptimizerResult<DescentSettings> {
        Ok(DescentSettings {
            max_iterations: self.max_iterations,
            gradient_tolerance: self.gradient_tolerance,
            line_search: BacktrackingLineSearch::new(
                self.initial_step,
                self.backtracking_factor,
                self.max_line_search_iterations,
            )?,
            wrap_angles: self.wrap_angles,
        })
    }
}

/// BFGS direction `p = −A·g` with the inverse-Hessian estimate `A`.
#[derive(Debug, Clone, Default)]
pub struct BfgsDirection {
    inverse_hessian: DMatrix<f64>,
    /// Iterate and gradient of the previous iteration
    previous: Option<(DVector<f64>, DVector<f64>)>,
    skipped_updates: usize,
    curvature_guard: bool,
}

impl BfgsDirection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direction that skips updates with `yᵀs ≤ 1e-14`.
    pub fn with_curvature_guard(curvature_guard: bool) -> Self {
        Self {
            curvature_guard,
            ..Self::default()
        }
    }

    /// Current inverse-Hessian estimate.
    pub fn inverse_hessian(&self) -> &DMatrix<f64> {
        &self.inverse_hessian
    }

    fn update(&mut self, s: &DVector<f64>, y: &DVector<f64>) -> bool {
        let curvature = y.dot(s);
        if self.curvature_guard && !(curvature > CURVATURE_THRESHOLD) {
            return false;
        }
        let rho = 1.0 / curvature;
        if !rho.is_finite() {
            return false;
        }
        let n = s.len();
        let identity = DMatrix::<f64>::identity(n, n);
        let left = &identity - rho * (s * y.transpose());
        let right = &identity - rho * (y * s.transpose());
        self.inverse_hessian = &left * &self.inverse_hessian * &right + rho * (s * s.transpose());
        true
    }
}

impl SearchDirection for BfgsDirection {
    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::Bfgs
    }

    fn reset(&mut self, dimension: usize) {
        self.inverse_hessian = DMatrix::identity(dimension, dimension);
        self.previous = None;
        self.skipped_updates = 0;
    }

    fn direction(
        &mut self,
        iteration: usize,
        x: &DVector<f64>,
        gradient: &DVector<f64>,
        _hessian: Option<&DMatrix<f64>>,
    ) -> OptimizerResult<DVector<f64>> {
        if let Some((x_prev, g_prev)) = self.previous.take() {
            let s = x - x_prev;
            let y = gradient - g_prev;
            if !self.update(&s, &y) {
                self.skipped_updates += 1;
                debug!(
                    "iteration {}: skipping BFGS update, yᵀs = {:.3e}, curvature guard {}",
                    iteration,
                    y.dot(&s),
                    self.curvature_guard
                );
            }
        }
        self.previous = Some((x.clone(), gradient.clone()));
        Ok(-(&self.inverse_hessian * gradient))
    }

    fn skipped_updates(&self) -> usize {
        self.skipped_updates
    }
}

/// BFGS solver.
pub struct Bfgs {
    config: BfgsConfig,
    observers: optimizer::OptObserverVec,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self::new()
    }
}

impl Bfgs {
    /// Create a new BFGS solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(BfgsConfig::default())
    }

    /// Create a new BFGS solver with the given configuration.
    pub fn with_config(config: BfgsConfig) -> Self {
        Self {
            config,
            observers: optimizer::OptObserverVec::new(),
        }
    }

    pub fn config(&self) -> &BfgsConfig {
        &self.config
    }

    /// Add an observer to the solver.
    pub fn add_observer(&mut self, observer: impl optimizer::OptObserver + 'static) {
        self.observers.add(observer);
    }

    pub fn optimize<O: Objective + ?Sized>(
        &mut self,
        objective: &mut O,
        initial_params: &DVector<f64>,
    ) -> OptimizerResult<SolverResult> {
        let settings = self.config.descent_settings()?;
        descent::run(
            &settings,
            objective,
            initial_params,
            &mut BfgsDirection::with_curvature_guard(self.config.curvature_guard),
            &self.observers,
        )
    }
}

impl optimizer::Solver for Bfgs {
    type Config = BfgsConfig;

    fn new() -> Self {
        Self::default()
    }

    fn with_config(config: BfgsConfig) -> Self {
        Self::with_config(config)
    }

    fn config(&self) -> &BfgsConfig {
        self.config()
    }

    fn optimize<O: Objective + ?Sized>(
        &mut self,
        objective: &mut O,
        initial_params: &DVector<f64>,
    ) -> OptimizerResult<SolverResult> {
        self.optimize(objective, initial_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LinkChain;
    use crate::objectives::{LinkObjective, RosenbrockObjective};
    use crate::optimizer::OptimizationStatus;
    use nalgebra::{Vector2, dvector};
    use std::f64::consts::PI;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_first_direction_is_steepest_descent() -> OptimizerResult<()> {
        let mut direction = BfgsDirection::new();
        direction.reset(2);
        let p = direction.direction(1, &dvector![0.0, 0.0], &dvector![1.0, -2.0], None)?;
        assert_eq!(p, dvector![-1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_update_satisfies_secant_condition() -> OptimizerResult<()> {
        let mut direction = BfgsDirection::new();
        direction.reset(2);
        direction.direction(1, &dvector![0.0, 0.0], &dvector![1.0, 1.0], None)?;
        direction.direction(2, &dvector![0.5, -0.25], &dvector![2.0, 0.5], None)?;

        // A·y = s
        let s = dvector![0.5, -0.25];
        let y = dvector![1.0, -0.5];
        assert!((direction.inverse_hessian() * y - s).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_negative_curvature_is_applied() -> OptimizerResult<()> {
        let mut direction = BfgsDirection::new();
        direction.reset(2);
        direction.direction(1, &dvector![0.0, 0.0], &dvector![1.0, 1.0], None)?;
        // s = (1, 0), y = (-1, 1), yᵀs = -1
        direction.direction(2, &dvector![1.0, 0.0], &dvector![0.0, 2.0], None)?;

        let s = dvector![1.0, 0.0];
        let y = dvector![-1.0, 1.0];
        assert_eq!(direction.skipped_updates(), 0);
        assert_ne!(direction.inverse_hessian(), &DMatrix::identity(2, 2));
        assert!((direction.inverse_hessian() * y - s).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_zero_curvature_is_skipped() -> OptimizerResult<()> {
        let mut direction = BfgsDirection::new();
        direction.reset(2);
        direction.direction(1, &dvector![0.0, 0.0], &dvector![1.0, 0.0], None)?;
        // s = (0, 1), y = (1, 0), yᵀs = 0
        direction.direction(2, &dvector![0.0, 1.0], &dvector![2.0, 0.0], None)?;
        assert_eq!(direction.skipped_updates(), 1);
        assert_eq!(direction.inverse_hessian(), &DMatrix::identity(2, 2));
        Ok(())
    }

    #[test]
    fn test_curvature_guard_skips_negative_curvature() -> OptimizerResult<()> {
        let mut direction = BfgsDirection::with_curvature_guard(true);
        direction.reset(2);
        direction.direction(1, &dvector![0.0, 0.0], &dvector![1.0, 0.0], None)?;
        // yᵀs = (-1, 0)·(1, 0) < 0
        direction.direction(2, &dvector![1.0, 0.0], &dvector![0.0, 0.0], None)?;
        assert_eq!(direction.skipped_updates(), 1);
        assert_eq!(direction.inverse_hessian(), &DMatrix::identity(2, 2));
        Ok(())
    }

    #[test]
    fn test_rosenbrock_converges() -> OptimizerResult<()> {
        let config = BfgsConfig::new()
            .with_max_iterations(100)
            .with_backtracking_factor(0.8)
            .with_wrap_angles(false);
        let mut solver = Bfgs::with_config(config);
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;

        assert_eq!(result.status, OptimizationStatus::GradientToleranceReached);
        assert!((result.parameters - dvector![1.0, 1.0]).norm() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_single_link_ik() -> TestResult {
        let mut chain = LinkChain::serial(1, 1.0);
        let mut objective =
            LinkObjective::new(&mut chain, 0, Vector2::new(0.0, 1.0), 1e3, dvector![1.0])?;
        let config = BfgsConfig::new()
            .with_max_iterations(100)
            .with_wrap_angles(false);
        let mut solver = Bfgs::with_config(config);
        let result = solver.optimize(&mut objective, &dvector![0.0])?;

        // 1000·cos θ = θ at the optimum; the unwrapped solve lands near 7.85.
        let theta = result.parameters[0];
        assert!(result.status.is_converged());
        assert!((1e3 * theta.cos() - theta).abs() < 1e-5);
        assert!(result.convergence_info.is_some_and(|info| info.hessian_evaluations == 0));
        Ok(())
    }

    #[test]
    fn test_result_is_wrapped() -> TestResult {
        // Start a whole turn away from the rest pose; the solve stays near it.
        let mut chain = LinkChain::serial(2, 1.0);
        let target = Vector2::new(1.0, 1.0);
        let mut objective = LinkObjective::new(&mut chain, 1, target, 1e3, dvector![0.0, 0.0])?;
        let mut solver = Bfgs::with_config(BfgsConfig::new().with_max_iterations(10));
        let result = solver.optimize(&mut objective, &dvector![2.0 * PI + 0.1, 0.2])?;

        for &angle in result.parameters.iter() {
            assert!(angle > -PI && angle <= PI);
        }
        Ok(())
    }
}
