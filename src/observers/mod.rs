//! Observer pattern for optimization monitoring.
//!
//! Observers can be registered with any optimizer and are notified once per
//! iteration, after the step has been applied. This keeps recording, plotting and
//! custom analysis out of the descent loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      Optimizer       │
//! │ (GD / Newton / BFGS) │
//! └──────────┬───────────┘
//!            │ observers.notify(x, iteration)
//!            ├────────────────────┬────────────────────┐
//!            ▼                    ▼                    ▼
//!    ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//!    │  Trajectory  │     │   Metrics    │     │    Custom    │
//!    │   Recorder   │     │   Observer   │     │   Observer   │
//!    └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chain_ik::objectives::RosenbrockObjective;
//! use chain_ik::observers::TrajectoryRecorder;
//! use chain_ik::optimizer::{Bfgs, BfgsConfig};
//! use nalgebra::dvector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = TrajectoryRecorder::new();
//! let mut solver = Bfgs::with_config(BfgsConfig::new().with_max_iterations(20));
//! solver.add_observer(recorder.clone());
//!
//! let mut rosenbrock = RosenbrockObjective::new(1.0, 1.0);
//! let result = solver.optimize(&mut rosenbrock, &dvector![-1.0, 0.0])?;
//! assert_eq!(recorder.points()?.len(), result.iterations);
//! # Ok(())
//! # }
//! ```

use nalgebra::DVector;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Error)]
pub enum ObserverError {
    #[error("Mutex poisoned in {context}: {reason}")]
    MutexPoisoned { context: String, reason: String },
}

impl ObserverError {
    /// Log the error with tracing::error and return self for chaining
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

/// Result type for observer operations
pub type ObserverResult<T> = Result<T, ObserverError>;

/// Per-iteration metrics handed to observers before [`OptObserver::on_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationMetrics {
    /// Cost after the step
    pub cost: f64,
    /// Norm of the gradient the step was computed from
    pub gradient_norm: f64,
    /// Step length `α` chosen by the line search
    pub step_size: f64,
    /// Norm of the applied step `α·p`
    pub step_norm: f64,
    /// Whether the line search found a decrease
    pub accepted: bool,
}

/// Observer notified at every optimizer iteration.
///
/// Observers must be `Send`; shared state goes behind `Arc<Mutex<_>>`.
pub trait OptObserver: Send {
    /// Called with the parameters after the step of `iteration` (1-based).
    fn on_step(&self, values: &DVector<f64>, iteration: usize);

    /// Called right before [`OptObserver::on_step`] with the iteration's metrics.
    fn set_iteration_metrics(&self, _metrics: &IterationMetrics) {
        // Default implementation does nothing
    }
}

/// Collection of observers that are notified together.
#[derive(Default)]
pub struct OptObserverVec {
    observers: Vec<Box<dyn OptObserver>>,
}

impl OptObserverVec {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn add(&mut self, observer: impl OptObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    #[inline]
    pub fn set_iteration_metrics(&self, metrics: &IterationMetrics) {
        for observer in &self.observers {
            observer.set_iteration_metrics(metrics);
        }
    }

    #[inline]
    pub fn notify(&self, values: &DVector<f64>, iteration: usize) {
        for observer in &self.observers {
            observer.on_step(values, iteration);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

/// One recorded iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub iteration: usize,
    pub parameters: DVector<f64>,
    pub metrics: Option<IterationMetrics>,
}

#[derive(Debug, Default)]
struct TrajectoryState {
    pending: Option<IterationMetrics>,
    points: Vec<TrajectoryPoint>,
}

/// Records every iterate of a solve.
///
/// Clones share the same storage, so keep one clone and hand the other to the
/// solver.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    state: Arc<Mutex<TrajectoryState>>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded iterates.
    pub fn points(&self) -> ObserverResult<Vec<TrajectoryPoint>> {
        let guard = self.state.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TrajectoryRecorder::points".to_string(),
                reason: e.to_string(),
            }
            .log()
        })?;
        Ok(guard.points.clone())
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) -> ObserverResult<()> {
        let mut guard = self.state.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TrajectoryRecorder::clear".to_string(),
                reason: e.to_string(),
            }
            .log()
        })?;
        guard.pending = None;
        guard.points.clear();
        Ok(())
    }
}

impl OptObserver for TrajectoryRecorder {
    fn on_step(&self, values: &DVector<f64>, iteration: usize) {
        // A poisoned lock only loses the recording; the solve itself goes on.
        if let Ok(mut guard) = self.state.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TrajectoryRecorder::on_step".to_string(),
                reason: e.to_string(),
            }
            .log()
        }) {
            let metrics = guard.pending.take();
            guard.points.push(TrajectoryPoint {
                iteration,
                parameters: values.clone(),
                metrics,
            });
        }
    }

    fn set_iteration_metrics(&self, metrics: &IterationMetrics) {
        if let Ok(mut guard) = self.state.lock().map_err(|e| {
            ObserverError::MutexPoisoned {
                context: "TrajectoryRecorder::set_iteration_metrics".to_string(),
                reason: e.to_string(),
            }
            .log()
        }) {
            guard.pending = Some(*metrics);
        }
    }
}
