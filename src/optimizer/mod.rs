//! Descent optimizers for smooth scalar objectives.
//!
//! This module provides three unconstrained minimizers that share one backtracking
//! line search and one iteration contract:
//! - Gradient descent (steepest descent)
//! - Newton's method (exact Hessian)
//! - BFGS (quasi-Newton inverse-Hessian approximation)
//!
//! Every solver follows the same loop, implemented once in [`descent`]:
//!
//! ```text
//! for k = 1..=max_iterations
//!     f, g (, H) ← objective(x)
//!     p          ← search direction
//!     α·p        ← backtracking line search
//!     x          ← x + α·p
//!     stop if ‖g‖ < gradient_tolerance
//! ```

use crate::linalg;
use nalgebra::DVector;
use std::f64::consts::{PI, TAU};
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::error;
use web_time as time;

pub mod bfgs;
pub mod descent;
pub mod gradient_descent;
pub mod line_search;
pub mod newton;

pub use bfgs::{Bfgs, BfgsConfig};
pub use descent::{DescentSummary, IterationStats, SearchDirection};
pub use gradient_descent::{GradientDescent, GradientDescentConfig};
pub use line_search::{BacktrackingLineSearch, LineSearchOutcome};
pub use newton::{Newton, NewtonConfig};

// Re-export observer types from the observers module
pub use crate::observers::{OptObserver, OptObserverVec};

use crate::objectives::Objective;

/// Type of optimization solver algorithm to use
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerType {
    /// Steepest descent with backtracking
    GradientDescent,
    /// Newton's method with the exact Hessian
    Newton,
    /// BFGS quasi-Newton method
    #[default]
    Bfgs,
}

impl Display for OptimizerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerType::GradientDescent => write!(f, "Gradient Descent"),
            OptimizerType::Newton => write!(f, "Newton"),
            OptimizerType::Bfgs => write!(f, "BFGS"),
        }
    }
}

/// Optimizer-specific error types for chain-ik
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// The Newton system could not be solved
    #[error("Linear system solve failed at iteration {iteration}")]
    LinearSolveFailed {
        iteration: usize,
        #[source]
        source: linalg::LinAlgError,
    },

    /// Invalid optimization parameters provided
    #[error("Invalid optimization parameters: {0}")]
    InvalidParameters(String),

    /// Initial guess does not match the objective
    #[error("Dimension mismatch: objective has {expected} parameters, initial guess has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Objective has no parameters
    #[error("Objective has no parameters to optimize")]
    EmptyProblem,
}

impl OptimizerError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// BacktrackingLineSearch::new(1.0, 0.5, 0)
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

/// Result type for optimizer operations
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Detailed convergence information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceInfo {
    /// Gradient norm of the last evaluated iterate
    pub final_gradient_norm: f64,
    /// Norm of the last applied step
    pub final_step_norm: f64,
    /// Objective evaluations, line-search trials included
    pub cost_evaluations: usize,
    /// Gradient evaluations
    pub gradient_evaluations: usize,
    /// Hessian evaluations
    pub hessian_evaluations: usize,
    /// Line searches that ran out of trials without a decrease
    pub failed_line_searches: usize,
    /// BFGS updates skipped for lack of positive curvature
    pub skipped_updates: usize,
}

impl Display for ConvergenceInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Final gradient norm: {:.2e}, Final step norm: {:.2e}, Cost evaluations: {}, Gradient evaluations: {}, Hessian evaluations: {}, Failed line searches: {}",
            self.final_gradient_norm,
            self.final_step_norm,
            self.cost_evaluations,
            self.gradient_evaluations,
            self.hessian_evaluations,
            self.failed_line_searches
        )
    }
}

/// Status of an optimization process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Gradient norm fell below the tolerance
    GradientToleranceReached,
    /// Maximum number of iterations reached
    MaxIterationsReached,
    /// NaN or Inf detected in cost or gradient
    InvalidNumericalValues,
}

impl OptimizationStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, OptimizationStatus::GradientToleranceReached)
    }
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::GradientToleranceReached => write!(f, "Gradient tolerance reached"),
            OptimizationStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            OptimizationStatus::InvalidNumericalValues => {
                write!(f, "Invalid numerical values (NaN/Inf) detected")
            }
        }
    }
}

/// Result of a solver execution.
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Final parameters
    pub parameters: DVector<f64>,
    /// Final optimization status
    pub status: OptimizationStatus,
    /// Initial cost value
    pub initial_cost: f64,
    /// Final cost value
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Total time elapsed
    pub elapsed_time: time::Duration,
    /// Convergence statistics
    pub convergence_info: Option<ConvergenceInfo>,
}

/// Core trait for optimization solvers.
pub trait Solver {
    /// Configuration type for this solver
    type Config;

    /// Create a new solver with the default configuration
    fn new() -> Self;

    /// Create a new solver with the given configuration
    fn with_config(config: Self::Config) -> Self;

    /// Configuration the solver runs with
    fn config(&self) -> &Self::Config;

    /// Minimize `objective` starting from `initial_params`.
    fn optimize<O: Objective + ?Sized>(
        &mut self,
        objective: &mut O,
        initial_params: &DVector<f64>,
    ) -> OptimizerResult<SolverResult>;
}

/// Wrap an angle into `(−π, π]`.
///
/// Non-finite values are returned unchanged. Whole turns are removed first, so
/// huge magnitudes do not loop for long.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut wrapped = angle - TAU * (angle / TAU).round();
    while wrapped > PI {
        wrapped -= TAU;
    }
    while wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Wrap every component of `angles` into `(−π, π]`.
pub fn wrap_angles(angles: &DVector<f64>) -> DVector<f64> {
    angles.map(wrap_angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(4.0) - (4.0 - TAU)).abs() < TOLERANCE);
        assert!((wrap_angle(-4.0) - (TAU - 4.0)).abs() < TOLERANCE);
        assert_eq!(wrap_angle(0.5), 0.5);
        assert_eq!(wrap_angle(PI), PI);
        assert_eq!(wrap_angle(-PI), PI);
        assert!((wrap_angle(1e6) - 1e6_f64.sin().atan2(1e6_f64.cos())).abs() < 1e-6);
        assert!(wrap_angle(f64::NAN).is_nan());
        assert_eq!(wrap_angle(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_wrap_angles_stays_in_range() {
        let wrapped = wrap_angles(&dvector![7.0, -7.0, 3.2, -3.2, 0.0, 100.0]);
        for &angle in wrapped.iter() {
            assert!(angle > -PI && angle <= PI);
        }
    }

    #[test]
    fn test_status_display() {
        assert!(OptimizationStatus::GradientToleranceReached.is_converged());
        assert!(!OptimizationStatus::MaxIterationsReached.is_converged());
        assert_eq!(OptimizerType::default().to_string(), "BFGS");
    }
}
