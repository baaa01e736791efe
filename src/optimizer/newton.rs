//! Newton's method with the exact Hessian and backtracking line search.
//!
//! Every iteration solves the Newton system
//!
//! ```text
//! ∇²f(x) · p = −∇f(x)
//! ```
//!
//! Near a minimum with positive-definite Hessian this converges quadratically.
//! Far from it the Hessian may be indefinite and `p` may point uphill; the default
//! LU solver uses such steps as they are, while
//! [`LinearSolverType::Cholesky`](crate::linalg::LinearSolverType::Cholesky)
//! rejects them with an error.
//!
//! # Example
//!
//! ```
//! use chain_ik::objectives::RosenbrockObjective;
//! use chain_ik::optimizer::{Newton, NewtonConfig};
//! use nalgebra::dvector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut solver = Newton::with_config(NewtonConfig::new().with_backtracking_factor(0.8));
//! let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
//! let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;
//! assert!(result.status.is_converged());
//! # Ok(())
//! # }
//! ```

use crate::linalg::{self, DenseLinearSolver, LinearSolverType};
use crate::objectives::Objective;
use crate::optimizer::{
    self, BacktrackingLineSearch, OptimizerError, OptimizerResult, OptimizerType,
    SearchDirection, SolverResult,
    descent::{self, DescentSettings},
};
use nalgebra::{DMatrix, DVector};

/// Configuration parameters for Newton's method.
///
/// ```
/// use chain_ik::linalg::LinearSolverType;
/// use chain_ik::optimizer::NewtonConfig;
///
/// let config = NewtonConfig::new()
///     .with_max_iterations(30)
///     .with_linear_solver_type(LinearSolverType::Cholesky);
/// ```
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Type of linear solver for the Newton system
    pub linear_solver_type: LinearSolverType,
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
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            linear_solver_type: LinearSolverType::default(),
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            initial_step: 1.0,
            backtracking_factor: 0.5,
            max_line_search_iterations: 20,
            wrap_angles: false,
        }
    }
}

impl NewtonConfig {
    /// Create a new Newton configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the linear solver type
    pub fn with_linear_solver_type(mut self, linear_solver_type: LinearSolverType) -> Self {
        self.linear_solver_type = linear_solver_type;
        self
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

/// Newton direction `p = −H⁻¹g`, solved with a dense factorization.
pub struct NewtonDirection {
    linear_solver: Box<dyn DenseLinearSolver>,
}

impl NewtonDirection {
    pub fn new(linear_solver_type: LinearSolverType) -> Self {
        Self {
            linear_solver: linalg::create_linear_solver(linear_solver_type),
        }
    }
}

impl SearchDirection for NewtonDirection {
    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::Newton
    }

    fn requires_hessian(&self) -> bool {
        true
    }

    fn reset(&mut self, _dimension: usize) {}

    fn direction(
        &mut self,
        iteration: usize,
        _x: &DVector<f64>,
        gradient: &DVector<f64>,
        hessian: Option<&DMatrix<f64>>,
    ) -> OptimizerResult<DVector<f64>> {
        let hessian = hessian.ok_or_else(|| {
            OptimizerError::InvalidParameters("Newton direction needs a Hessian".to_string())
                .log()
        })?;
        self.linear_solver
            .solve(hessian, &(-gradient))
            .map_err(|source| OptimizerError::LinearSolveFailed { iteration, source }.log())
    }
}

/// Newton's method solver.
pub struct Newton {
    config: NewtonConfig,
    observers: optimizer::OptObserverVec,
}

impl Default for Newton {
    fn default() -> Self {
        Self::new()
    }
}

impl Newton {
    /// Create a new Newton solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(NewtonConfig::default())
    }

    /// Create a new Newton solver with the given configuration.
    pub fn with_config(config: NewtonConfig) -> Self {
        Self {
            config,
            observers: optimizer::OptObserverVec::new(),
        }
    }

    pub fn config(&self) -> &NewtonConfig {
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
        let mut direction = NewtonDirection::new(self.config.linear_solver_type);
        descent::run(
            &settings,
            objective,
            initial_params,
            &mut direction,
            &self.observers,
        )
    }
}

impl optimizer::Solver for Newton {
    type Config = NewtonConfig;

    fn new() -> Self {
        Self::default()
    }

    fn with_config(config: NewtonConfig) -> Self {
        Self::with_config(config)
    }

    fn config(&self) -> &NewtonConfig {
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
    use crate::linalg::LinAlgError;
    use crate::objectives::{LinkObjective, RosenbrockObjective};
    use crate::optimizer::OptimizationStatus;
    use nalgebra::{Vector2, dvector};

    #[test]
    fn test_first_step_on_rosenbrock() -> OptimizerResult<()> {
        // A full Newton step from (-1, 0) lands on (-1/3, -1/3) and is accepted.
        let config = NewtonConfig::new().with_max_iterations(1);
        let mut solver = Newton::with_config(config);
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;

        assert!((result.parameters - dvector![-1.0 / 3.0, -1.0 / 3.0]).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_rosenbrock_converges() -> OptimizerResult<()> {
        let config = NewtonConfig::new()
            .with_max_iterations(50)
            .with_backtracking_factor(0.8);
        let mut solver = Newton::with_config(config);
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;

        assert_eq!(result.status, OptimizationStatus::GradientToleranceReached);
        assert!((result.parameters - dvector![1.0, 1.0]).norm() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_single_link_reaches_stationary_point() -> Result<(), Box<dyn std::error::Error>> {
        let mut chain = LinkChain::serial(1, 1.0);
        let mut objective =
            LinkObjective::new(&mut chain, 0, Vector2::new(0.0, 1.0), 1e3, dvector![1.0])?;
        let mut solver = Newton::with_config(NewtonConfig::new().with_max_iterations(50));
        let result = solver.optimize(&mut objective, &dvector![0.0])?;

        // 1000·cos θ = θ at the optimum.
        let theta = result.parameters[0];
        assert!(result.status.is_converged());
        assert!((1e3 * theta.cos() - theta).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_cholesky_rejects_indefinite_hessian() {
        // At (0, 1) the Rosenbrock Hessian is diag(-2, 2) for a = b = 1.
        let config = NewtonConfig::new().with_linear_solver_type(LinearSolverType::Cholesky);
        let mut solver = Newton::with_config(config);
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        assert!(matches!(
            solver.optimize(&mut rosenbrock, &dvector![0.0, 1.0]),
            Err(OptimizerError::LinearSolveFailed {
                iteration: 1,
                source: LinAlgError::NotPositiveDefinite
            })
        ));
    }

    #[test]
    fn test_singular_hessian_is_an_error() {
        // f(x) = x₀² has a singular Hessian in 2D.
        struct Degenerate;
        impl Objective for Degenerate {
            fn dimension(&self) -> usize {
                2
            }
            fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
                x[0] * x[0]
            }
            fn evaluate_gradient(&mut self, x: &DVector<f64>, g: &mut DVector<f64>) -> f64 {
                *g = dvector![2.0 * x[0], 0.0];
                self.evaluate(x)
            }
            fn evaluate_hessian(
                &mut self,
                x: &DVector<f64>,
                g: &mut DVector<f64>,
                h: &mut DMatrix<f64>,
            ) -> f64 {
                *h = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.0]);
                self.evaluate_gradient(x, g)
            }
        }

        let mut solver = Newton::new();
        assert!(matches!(
            solver.optimize(&mut Degenerate, &dvector![1.0, 1.0]),
            Err(OptimizerError::LinearSolveFailed {
                source: LinAlgError::SingularMatrix,
                ..
            })
        ));
    }
}
