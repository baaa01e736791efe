//! Backtracking line search shared by every optimizer.

use crate::objectives::Objective;
use crate::optimizer::{OptimizerError, OptimizerResult};
use nalgebra::DVector;

/// Backtracking policy that accepts the first strictly improving trial.
///
/// ```text
/// α ← initial_step
/// repeat max_iterations times
///     if f(x + α·p) < f(x): accept
///     α ← backtracking_factor · α
/// ```
///
/// When every trial fails, the last trial step is returned anyway and marked as
/// not accepted; the caller applies it regardless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktrackingLineSearch {
    initial_step: f64,
    backtracking_factor: f64,
    max_iterations: usize,
}

/// Result of one line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchOutcome {
    /// Step `α·p` to apply
    pub step: DVector<f64>,
    /// Step length of the returned step
    pub alpha: f64,
    /// Cost at `x + step`
    pub cost: f64,
    /// Whether `cost` is below the starting cost
    pub accepted: bool,
    /// Number of objective evaluations used
    pub trials: usize,
}

impl BacktrackingLineSearch {
    /// # Errors
    /// `OptimizerError::InvalidParameters` if `max_iterations` is zero, the initial
    /// step is not positive or the factor is outside `(0, 1]`.
    pub fn new(
        initial_step: f64,
        backtracking_factor: f64,
        max_iterations: usize,
    ) -> OptimizerResult<Self> {
        if max_iterations == 0 {
            return Err(OptimizerError::InvalidParameters(
                "line search needs at least one trial".to_string(),
            )
            .log());
        }
        if !(initial_step.is_finite() && initial_step > 0.0) {
            return Err(OptimizerError::InvalidParameters(format!(
                "initial step must be positive, got {initial_step}"
            ))
            .log());
        }
        if !(backtracking_factor > 0.0 && backtracking_factor <= 1.0) {
            return Err(OptimizerError::InvalidParameters(format!(
                "backtracking factor must lie in (0, 1], got {backtracking_factor}"
            ))
            .log());
        }
        Ok(Self {
            initial_step,
            backtracking_factor,
            max_iterations,
        })
    }

    pub fn initial_step(&self) -> f64 {
        self.initial_step
    }

    pub fn backtracking_factor(&self) -> f64 {
        self.backtracking_factor
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Search along `direction` from `x`, where `cost` is `f(x)`.
    pub fn search<O: Objective + ?Sized>(
        &self,
        objective: &mut O,
        x: &DVector<f64>,
        cost: f64,
        direction: &DVector<f64>,
    ) -> LineSearchOutcome {
        let mut alpha = self.initial_step;
        let mut trials = 0;
        loop {
            trials += 1;
            let step = direction * alpha;
            let trial_cost = objective.evaluate(&(x + &step));
            let accepted = trial_cost < cost;
            if accepted || trials >= self.max_iterations {
                return LineSearchOutcome {
                    step,
                    alpha,
                    cost: trial_cost,
                    accepted,
                    trials,
                };
            }
            alpha *= self.backtracking_factor;
        }
    }
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            initial_step: 1.0,
            backtracking_factor: 0.5,
            max_iterations: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::RosenbrockObjective;
    use nalgebra::dvector;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            BacktrackingLineSearch::new(1.0, 0.5, 0),
            Err(OptimizerError::InvalidParameters(_))
        ));
        assert!(BacktrackingLineSearch::new(0.0, 0.5, 10).is_err());
        assert!(BacktrackingLineSearch::new(1.0, 0.0, 10).is_err());
        assert!(BacktrackingLineSearch::new(1.0, 1.5, 10).is_err());
        assert!(BacktrackingLineSearch::new(1.0, 1.0, 1).is_ok());
    }

    #[test]
    fn test_accepts_first_decrease() -> OptimizerResult<()> {
        // Along -g from (-1, 0) the full step overshoots; 0.8⁵ is the first decrease.
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let x = dvector![-1.0, 0.0];
        let direction = dvector![8.0, 2.0];
        let search = BacktrackingLineSearch::new(1.0, 0.8, 20)?;
        let outcome = search.search(&mut rosenbrock, &x, 5.0, &direction);

        assert!(outcome.accepted);
        assert!(outcome.cost < 5.0);
        assert!((outcome.step.clone() - &direction * outcome.alpha).norm() < TOLERANCE);
        assert_eq!(outcome.trials, 1 + (outcome.alpha.ln() / 0.8_f64.ln()).round() as usize);
        Ok(())
    }

    #[test]
    fn test_exhaustion_returns_last_trial() -> OptimizerResult<()> {
        // Uphill direction: no trial can decrease the cost.
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let x = dvector![-1.0, 0.0];
        let uphill = dvector![-8.0, -2.0];
        let search = BacktrackingLineSearch::new(1.0, 0.5, 3)?;
        let outcome = search.search(&mut rosenbrock, &x, 5.0, &uphill);

        assert!(!outcome.accepted);
        assert_eq!(outcome.trials, 3);
        assert!((outcome.alpha - 0.25).abs() < TOLERANCE);
        assert!((outcome.step - dvector![-2.0, -0.5]).norm() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_single_trial_is_a_fixed_step() -> OptimizerResult<()> {
        let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
        let search = BacktrackingLineSearch::new(0.1, 0.5, 1)?;
        let x = dvector![-1.0, 0.0];
        let outcome = search.search(&mut rosenbrock, &x, 5.0, &dvector![8.0, 2.0]);
        assert_eq!(outcome.trials, 1);
        assert!((outcome.step - dvector![0.8, 0.2]).norm() < TOLERANCE);
        Ok(())
    }
}
