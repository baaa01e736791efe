//! The iteration loop shared by gradient descent, Newton and BFGS.
//!
//! The solvers differ only in how they turn a gradient (and possibly a Hessian)
//! into a search direction. That part is a [`SearchDirection`] strategy; the loop
//! in [`run`] owns everything else:
//!
//! 1. Evaluate `f`, `g` (and `H` if the strategy asks for it) at `x`
//! 2. Ask the strategy for a direction `p`
//! 3. Backtrack along `p` until the cost decreases or the trials run out
//! 4. Apply the step; the last trial step is applied even when no trial decreased
//! 5. Stop once `‖g‖ < gradient_tolerance`, checked after stepping
//!
//! A non-finite cost or gradient stops the loop with
//! [`OptimizationStatus::InvalidNumericalValues`].

use crate::objectives::Objective;
use crate::observers::{IterationMetrics, OptObserverVec};
use crate::optimizer::{
    self, BacktrackingLineSearch, ConvergenceInfo, OptimizationStatus, OptimizerError,
    OptimizerResult, OptimizerType, SolverResult,
};
use nalgebra::{DMatrix, DVector};
use std::fmt;
use tracing::{debug, warn};
use web_time as time;

/// Turns the local derivative information into a search direction.
pub trait SearchDirection {
    /// Which optimizer this strategy implements
    fn optimizer_type(&self) -> OptimizerType;

    /// Whether the loop must evaluate the Hessian every iteration
    fn requires_hessian(&self) -> bool {
        false
    }

    /// Forget any state from a previous solve of dimension `dimension`
    fn reset(&mut self, dimension: usize);

    /// Direction `p` at iterate `x` (1-based `iteration`).
    ///
    /// `hessian` is `Some` exactly when [`SearchDirection::requires_hessian`] is true.
    fn direction(
        &mut self,
        iteration: usize,
        x: &DVector<f64>,
        gradient: &DVector<f64>,
        hessian: Option<&DMatrix<f64>>,
    ) -> OptimizerResult<DVector<f64>>;

    /// Curvature updates skipped since the last reset
    fn skipped_updates(&self) -> usize {
        0
    }
}

/// Loop settings common to every solver configuration.
#[derive(Debug, Clone)]
pub struct DescentSettings {
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
    pub line_search: BacktrackingLineSearch,
    /// Wrap the returned parameters into (−π, π]
    pub wrap_angles: bool,
}

impl DescentSettings {
    /// Print configuration parameters (debug level logging)
    pub fn print_configuration(&self, optimizer: OptimizerType) {
        debug!(
            "\nConfiguration:\n  Solver:              {}\n  Max iterations:      {}\n  Gradient tolerance:  {:.2e}\n  Line Search:\n  Initial step:        {}\n  Backtracking factor: {}\n  Max trials:          {}\n  Wrap angles:         {}",
            optimizer,
            self.max_iterations,
            self.gradient_tolerance,
            self.line_search.initial_step(),
            self.line_search.backtracking_factor(),
            self.line_search.max_iterations(),
            if self.wrap_angles {
                "enabled"
            } else {
                "disabled"
            }
        );
    }
}

/// Per-iteration statistics for detailed logging (Ceres-style output).
#[derive(Debug, Clone)]
pub struct IterationStats {
    /// Iteration number (1-based)
    pub iteration: usize,
    /// Cost after the step
    pub cost: f64,
    /// Cost before the step minus cost after it
    pub cost_change: f64,
    /// L2 norm of the gradient at the start of the iteration
    pub gradient_norm: f64,
    /// L2 norm of the applied step
    pub step_norm: f64,
    /// Step length chosen by the line search
    pub alpha: f64,
    /// Line-search trials
    pub ls_iter: usize,
    /// Time taken for this iteration in milliseconds
    pub iter_time_ms: f64,
    /// Total elapsed time since optimization started in milliseconds
    pub total_time_ms: f64,
    /// Whether the line search found a decrease
    pub accepted: bool,
}

impl IterationStats {
    /// Print table header in Ceres-style format
    pub fn print_header() {
        debug!(
            "{:>4}  {:>13}  {:>13}  {:>13}  {:>13}  {:>11}  {:>7}  {:>11}  {:>13}  {:>6}",
            "iter",
            "cost",
            "cost_change",
            "|gradient|",
            "|step|",
            "alpha",
            "ls_iter",
            "iter_time",
            "total_time",
            "status"
        );
    }

    pub fn print_line(&self) {
        let status = if self.accepted { "✓" } else { "✗" };

        debug!(
            "{:>4}  {:>13.6e}  {:>13.2e}  {:>13.2e}  {:>13.2e}  {:>11.2e}  {:>7}  {:>9.2}ms  {:>11.2}ms  {:>6}",
            self.iteration,
            self.cost,
            self.cost_change,
            self.gradient_norm,
            self.step_norm,
            self.alpha,
            self.ls_iter,
            self.iter_time_ms,
            self.total_time_ms,
            status
        );
    }
}

/// Summary statistics of one solve.
#[derive(Debug, Clone)]
pub struct DescentSummary {
    /// Solver that produced the result
    pub optimizer: OptimizerType,
    /// Initial cost value
    pub initial_cost: f64,
    /// Final cost value
    pub final_cost: f64,
    /// Total number of iterations performed
    pub iterations: usize,
    /// Maximum gradient norm encountered
    pub max_gradient_norm: f64,
    /// Final gradient norm
    pub final_gradient_norm: f64,
    /// Final step norm
    pub final_step_norm: f64,
    /// Line searches without a decrease
    pub failed_line_searches: usize,
    /// Total time elapsed
    pub total_time: time::Duration,
    /// Average time per iteration
    pub average_time_per_iteration: time::Duration,
    /// Convergence status
    pub convergence_status: OptimizationStatus,
}

impl fmt::Display for DescentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Final Result", self.optimizer)?;

        if self.convergence_status.is_converged() {
            writeln!(f, "CONVERGED ({:?})", self.convergence_status)?;
        } else {
            writeln!(f, "NOT CONVERGED ({:?})", self.convergence_status)?;
        }

        writeln!(f)?;
        writeln!(f, "Cost:")?;
        writeln!(f, "  Initial:   {:.6e}", self.initial_cost)?;
        writeln!(f, "  Final:     {:.6e}", self.final_cost)?;
        writeln!(
            f,
            "  Reduction: {:.6e} ({:.2}%)",
            self.initial_cost - self.final_cost,
            100.0 * (self.initial_cost - self.final_cost) / self.initial_cost.max(1e-12)
        )?;
        writeln!(f)?;
        writeln!(f, "Iterations:")?;
        writeln!(f, "  Total:                {}", self.iterations)?;
        writeln!(f, "  Failed line searches: {}", self.failed_line_searches)?;
        writeln!(f)?;
        writeln!(f, "Gradient:")?;
        writeln!(f, "  Max norm:   {:.2e}", self.max_gradient_norm)?;
        writeln!(f, "  Final norm: {:.2e}", self.final_gradient_norm)?;
        writeln!(f)?;
        writeln!(f, "Step:")?;
        writeln!(f, "  Final norm: {:.2e}", self.final_step_norm)?;
        writeln!(f)?;
        writeln!(f, "Performance:")?;
        writeln!(
            f,
            "  Total time:             {:.2}ms",
            self.total_time.as_secs_f64() * 1000.0
        )?;
        writeln!(
            f,
            "  Average per iteration:  {:.2}ms",
            self.average_time_per_iteration.as_secs_f64() * 1000.0
        )?;

        Ok(())
    }
}

/// Run the descent loop from `initial_params`.
///
/// # Errors
/// - `OptimizerError::EmptyProblem` for an objective without parameters
/// - `OptimizerError::DimensionMismatch` if `initial_params` has the wrong length
/// - Any error raised by the strategy, e.g. a failed Newton solve
pub fn run<O, S>(
    settings: &DescentSettings,
    objective: &mut O,
    initial_params: &DVector<f64>,
    strategy: &mut S,
    observers: &OptObserverVec,
) -> OptimizerResult<SolverResult>
where
    O: Objective + ?Sized,
    S: SearchDirection + ?Sized,
{
    let start_time = time::Instant::now();
    let n = objective.dimension();
    if n == 0 {
        return Err(OptimizerError::EmptyProblem.log());
    }
    if initial_params.len() != n {
        return Err(OptimizerError::DimensionMismatch {
            expected: n,
            actual: initial_params.len(),
        }
        .log());
    }

    strategy.reset(n);
    let optimizer = strategy.optimizer_type();
    let requires_hessian = strategy.requires_hessian();
    let debug_enabled = tracing::enabled!(tracing::Level::DEBUG);

    let mut x = initial_params.clone();
    let mut gradient = DVector::zeros(n);
    let mut hessian = if requires_hessian {
        DMatrix::zeros(n, n)
    } else {
        DMatrix::zeros(0, 0)
    };

    let mut info = ConvergenceInfo::default();
    let mut initial_cost = None;
    let mut final_cost = None;
    let mut max_gradient_norm: f64 = 0.0;
    let mut iterations = 0;
    let mut status = OptimizationStatus::MaxIterationsReached;

    if debug_enabled {
        settings.print_configuration(optimizer);
        IterationStats::print_header();
    }

    for iteration in 1..=settings.max_iterations {
        let iter_start = time::Instant::now();
        iterations = iteration;

        let cost = if requires_hessian {
            info.hessian_evaluations += 1;
            objective.evaluate_hessian(&x, &mut gradient, &mut hessian)
        } else {
            objective.evaluate_gradient(&x, &mut gradient)
        };
        info.cost_evaluations += 1;
        info.gradient_evaluations += 1;
        if initial_cost.is_none() {
            initial_cost = Some(cost);
        }

        let gradient_norm = gradient.norm();
        info.final_gradient_norm = gradient_norm;
        max_gradient_norm = max_gradient_norm.max(gradient_norm);

        if !cost.is_finite() || !gradient_norm.is_finite() {
            warn!(
                "{} stopped at iteration {}: cost {} / gradient norm {} is not finite",
                optimizer, iteration, cost, gradient_norm
            );
            final_cost = Some(cost);
            status = OptimizationStatus::InvalidNumericalValues;
            break;
        }

        let direction = strategy.direction(
            iteration,
            &x,
            &gradient,
            requires_hessian.then_some(&hessian),
        )?;

        let outcome = settings
            .line_search
            .search(objective, &x, cost, &direction);
        info.cost_evaluations += outcome.trials;
        if !outcome.accepted {
            info.failed_line_searches += 1;
            debug!(
                "iteration {}: no decrease after {} line-search trials, taking α = {:.3e}",
                iteration, outcome.trials, outcome.alpha
            );
        }

        x += &outcome.step;
        let step_norm = outcome.step.norm();
        info.final_step_norm = step_norm;
        final_cost = Some(outcome.cost);

        if debug_enabled {
            let stats = IterationStats {
                iteration,
                cost: outcome.cost,
                cost_change: cost - outcome.cost,
                gradient_norm,
                step_norm,
                alpha: outcome.alpha,
                ls_iter: outcome.trials,
                iter_time_ms: iter_start.elapsed().as_secs_f64() * 1000.0,
                total_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
                accepted: outcome.accepted,
            };
            stats.print_line();
        }

        if !observers.is_empty() {
            observers.set_iteration_metrics(&IterationMetrics {
                cost: outcome.cost,
                gradient_norm,
                step_size: outcome.alpha,
                step_norm,
                accepted: outcome.accepted,
            });
            observers.notify(&x, iteration);
        }

        if gradient_norm < settings.gradient_tolerance {
            status = OptimizationStatus::GradientToleranceReached;
            break;
        }
    }

    // Only reachable without a single iteration.
    let initial_cost = match initial_cost {
        Some(cost) => cost,
        None => {
            info.cost_evaluations += 1;
            objective.evaluate(&x)
        }
    };
    let final_cost = final_cost.unwrap_or(initial_cost);
    info.skipped_updates = strategy.skipped_updates();

    let parameters = if settings.wrap_angles {
        optimizer::wrap_angles(&x)
    } else {
        x
    };

    let elapsed = start_time.elapsed();
    if debug_enabled {
        let summary = DescentSummary {
            optimizer,
            initial_cost,
            final_cost,
            iterations,
            max_gradient_norm,
            final_gradient_norm: info.final_gradient_norm,
            final_step_norm: info.final_step_norm,
            failed_line_searches: info.failed_line_searches,
            total_time: elapsed,
            average_time_per_iteration: if iterations > 0 {
                elapsed / iterations as u32
            } else {
                time::Duration::from_secs(0)
            },
            convergence_status: status.clone(),
        };
        debug!("{}", summary);
    }

    Ok(SolverResult {
        parameters,
        status,
        initial_cost,
        final_cost,
        iterations,
        elapsed_time: elapsed,
        convergence_info: Some(info),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::RosenbrockObjective;
    use crate::observers::TrajectoryRecorder;
    use nalgebra::dvector;

    /// Steepest descent strategy local to the tests.
    struct Steepest;

    impl SearchDirection for Steepest {
        fn optimizer_type(&self) -> OptimizerType {
            OptimizerType::GradientDescent
        }

        fn reset(&mut self, _dimension: usize) {}

        fn direction(
            &mut self,
            _iteration: usize,
            _x: &DVector<f64>,
            gradient: &DVector<f64>,
            hessian: Option<&DMatrix<f64>>,
        ) -> OptimizerResult<DVector<f64>> {
            assert!(hessian.is_none());
            Ok(-gradient)
        }
    }

    /// f(x) = ½‖x‖², minimized in one unit step along −g.
    struct Bowl;

    impl Objective for Bowl {
        fn dimension(&self) -> usize {
            2
        }

        fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
            0.5 * x.norm_squared()
        }

        fn evaluate_gradient(&mut self, x: &DVector<f64>, gradient: &mut DVector<f64>) -> f64 {
            *gradient = x.clone();
            self.evaluate(x)
        }

        fn evaluate_hessian(
            &mut self,
            x: &DVector<f64>,
            gradient: &mut DVector<f64>,
            hessian: &mut DMatrix<f64>,
        ) -> f64 {
            *hessian = DMatrix::identity(2, 2);
            self.evaluate_gradient(x, gradient)
        }
    }

    fn settings(max_iterations: usize) -> OptimizerResult<DescentSettings> {
        Ok(DescentSettings {
            max_iterations,
            gradient_tolerance: 1e-6,
            line_search: BacktrackingLineSearch::new(1.0, 0.5, 20)?,
            wrap_angles: false,
        })
    }

    #[test]
    fn test_converged_start_takes_one_iteration() -> OptimizerResult<()> {
        let result = run(
            &settings(10)?,
            &mut Bowl,
            &dvector![0.0, 0.0],
            &mut Steepest,
            &OptObserverVec::new(),
        )?;
        assert_eq!(result.iterations, 1);
        assert_eq!(result.status, OptimizationStatus::GradientToleranceReached);
        Ok(())
    }

    #[test]
    fn test_bowl_solved_after_one_step() -> OptimizerResult<()> {
        // The first step lands on the minimum; the second iteration sees g = 0.
        let result = run(
            &settings(10)?,
            &mut Bowl,
            &dvector![3.0, -4.0],
            &mut Steepest,
            &OptObserverVec::new(),
        )?;
        assert_eq!(result.iterations, 2);
        assert!(result.parameters.norm() < 1e-12);
        assert!((result.initial_cost - 12.5).abs() < 1e-12);
        assert!(result.final_cost.abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_counts_and_observers() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = TrajectoryRecorder::new();
        let mut observers = OptObserverVec::new();
        observers.add(recorder.clone());

        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let result = run(
            &settings(3)?,
            &mut rosenbrock,
            &dvector![-1.0, 0.0],
            &mut Steepest,
            &observers,
        )?;

        assert_eq!(result.status, OptimizationStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 3);
        let info = result.convergence_info.ok_or("missing convergence info")?;
        assert_eq!(info.gradient_evaluations, 3);
        assert_eq!(info.hessian_evaluations, 0);
        assert!(info.cost_evaluations >= 6);

        let points = recorder.points()?;
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].parameters, result.parameters);
        assert!(points.iter().all(|p| p.metrics.is_some()));
        Ok(())
    }

    #[test]
    fn test_dimension_checks() -> OptimizerResult<()> {
        let result = run(
            &settings(10)?,
            &mut Bowl,
            &dvector![1.0],
            &mut Steepest,
            &OptObserverVec::new(),
        );
        assert!(matches!(
            result,
            Err(OptimizerError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn test_zero_iterations_returns_start() -> OptimizerResult<()> {
        let result = run(
            &settings(0)?,
            &mut Bowl,
            &dvector![1.0, 1.0],
            &mut Steepest,
            &OptObserverVec::new(),
        )?;
        assert_eq!(result.iterations, 0);
        assert_eq!(result.parameters, dvector![1.0, 1.0]);
        assert_eq!(result.initial_cost, result.final_cost);
        Ok(())
    }

    #[test]
    fn test_wrap_applies_to_result_only() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = TrajectoryRecorder::new();
        let mut observers = OptObserverVec::new();
        observers.add(recorder.clone());

        // Already at the minimum of a bowl centred away from the origin.
        struct Shifted;
        impl Objective for Shifted {
            fn dimension(&self) -> usize {
                1
            }
            fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
                0.5 * (x[0] - 4.0).powi(2)
            }
            fn evaluate_gradient(&mut self, x: &DVector<f64>, g: &mut DVector<f64>) -> f64 {
                *g = dvector![x[0] - 4.0];
                self.evaluate(x)
            }
            fn evaluate_hessian(
                &mut self,
                x: &DVector<f64>,
                g: &mut DVector<f64>,
                h: &mut DMatrix<f64>,
            ) -> f64 {
                *h = DMatrix::identity(1, 1);
                self.evaluate_gradient(x, g)
            }
        }

        let mut wrapping = settings(5)?;
        wrapping.wrap_angles = true;
        let result = run(&wrapping, &mut Shifted, &dvector![4.0], &mut Steepest, &observers)?;

        assert!((result.parameters[0] - (4.0 - std::f64::consts::TAU)).abs() < 1e-12);
        assert_eq!(recorder.points()?[0].parameters[0], 4.0);
        Ok(())
    }

    #[test]
    fn test_non_finite_cost_stops() -> OptimizerResult<()> {
        struct Broken;
        impl Objective for Broken {
            fn dimension(&self) -> usize {
                1
            }
            fn evaluate(&mut self, _x: &DVector<f64>) -> f64 {
                f64::NAN
            }
            fn evaluate_gradient(&mut self, x: &DVector<f64>, g: &mut DVector<f64>) -> f64 {
                *g = dvector![1.0];
                self.evaluate(x)
            }
            fn evaluate_hessian(
                &mut self,
                x: &DVector<f64>,
                g: &mut DVector<f64>,
                _h: &mut DMatrix<f64>,
            ) -> f64 {
                self.evaluate_gradient(x, g)
            }
        }

        let result = run(
            &settings(10)?,
            &mut Broken,
            &dvector![0.0],
            &mut Steepest,
            &OptObserverVec::new(),
        )?;
        assert_eq!(result.status, OptimizationStatus::InvalidNumericalValues);
        assert_eq!(result.iterations, 1);
        Ok(())
    }
}
