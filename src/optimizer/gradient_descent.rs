//! Gradient descent (steepest descent) with backtracking line search.
//!
//! The search direction is the negative gradient, `p = −∇f(x)`. It is always a
//! descent direction, so the method is robust, but convergence is only linear and
//! slows down in narrow valleys such as the Rosenbrock function's.
//!
//! # Example
//!
//! ```
//! use chain_ik::objectives::RosenbrockObjective;
//! use chain_ik::optimizer::{GradientDescent, GradientDescentConfig};
//! use nalgebra::dvector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GradientDescentConfig::new()
//!     .with_max_iterations(50)
//!     .with_initial_step(1.0)
//!     .with_backtracking_factor(0.8);
//! let mut solver = GradientDescent::with_config(config);
//! let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
//! let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;
//! assert!(result.final_cost < result.initial_cost);
//! # Ok(())
//! # }
//! ```

use crate::objectives::Objective;
use crate::optimizer::{
    self, BacktrackingLineSearch, OptimizerResult, OptimizerType, SearchDirection, SolverResult,
    descent::{self, DescentSettings},
};
use nalgebra::{DMatrix, DVector};

/// Configuration parameters for gradient descent.
///
/// ```
/// use chain_ik::optimizer::GradientDescentConfig;
///
/// let config = GradientDescentConfig::new()
///     .with_max_iterations(50)
///     .with_gradient_tolerance(1e-6)
///     .with_initial_step(0.1)
///     .with_max_line_search_iterations(1);
/// ```
#[derive(Debug, Clone)]
pub struct GradientDescentConfig {
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

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            initial_step: 1.0,
            backtracking_factor: 0.5,
            max_line_search_iterations: 20,
            wrap_angles: false,
        }
    }
}

impl GradientDescentConfig {
    /// Create a new gradient descent configuration with default values.
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

/// Steepest descent direction `p = −g`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteepestDescentDirection;

impl SearchDirection for SteepestDescentDirection {
    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::GradientDescent
    }

    fn reset(&mut self, _dimension: usize) {}

    fn direction(
        &mut self,
        _iteration: usize,
        _x: &DVector<f64>,
        gradient: &DVector<f64>,
        _hessian: Option<&DMatrix<f64>>,
    ) -> OptimizerResult<DVector<f64>> {
        Ok(-gradient)
    }
}

/// Gradient descent solver.
pub struct GradientDescent {
    config: GradientDescentConfig,
    observers: optimizer::OptObserverVec,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientDescent {
    /// Create a new gradient descent solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(GradientDescentConfig::default())
    }

    /// Create a new gradient descent solver with the given configuration.
    pub fn with_config(config: GradientDescentConfig) -> Self {
        Self {
            config,
            observers: optimizer::OptObserverVec::new(),
        }
    }

    pub fn config(&self) -> &GradientDescentConfig {
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
            &mut SteepestDescentDirection,
            &self.observers,
        )
    }
}

impl optimizer::Solver for GradientDescent {
    type Config = GradientDescentConfig;

    fn new() -> Self {
        Self::default()
    }

    fn with_config(config: GradientDescentConfig) -> Self {
        Self::with_config(config)
    }

    fn config(&self) -> &GradientDescentConfig {
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
