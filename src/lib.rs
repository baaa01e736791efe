//! # chain-ik
//!
//! Inverse kinematics for planar serial link chains, solved by unconstrained
//! minimization.
//!
//! ## Features
//!
//! - **Link chains**: joints with a local offset and a rotation, forward kinematics
//!   and analytical first and second derivatives of the end effector
//! - **Objectives**: a generic [`Objective`] trait with value, gradient and Hessian
//!   evaluation; the Rosenbrock benchmark and the regularized IK cost
//! - **Optimizers**: gradient descent, Newton's method and BFGS, sharing one
//!   backtracking line search
//! - **Task driver**: the numbered tasks A1–A5 and B1–B5 with C-stream compatible
//!   text output
//!
//! ## Example
//!
//! ```
//! use chain_ik::core::LinkChain;
//! use chain_ik::objectives::LinkObjective;
//! use chain_ik::optimizer::{Bfgs, BfgsConfig};
//! use nalgebra::{Vector2, dvector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut chain = LinkChain::serial(2, 1.0);
//! let x0 = chain.angles();
//! let mut objective =
//!     LinkObjective::new(&mut chain, 1, Vector2::new(1.0, 1.0), 1e3, dvector![1.0, 1.0])?;
//! let mut solver = Bfgs::with_config(BfgsConfig::new().with_max_iterations(50));
//! let result = solver.optimize(&mut objective, &x0)?;
//! assert!(result.final_cost < result.initial_cost);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod io;
pub mod kinematics;
pub mod linalg;
#[cfg(feature = "logging")]
pub mod logger;
pub mod objectives;
pub mod observers;
pub mod optimizer;
pub mod tasks;

// Re-export core types
pub use core::{Link, LinkChain};
pub use error::{IkError, IkResult};

pub use linalg::{DenseCholeskySolver, DenseLinearSolver, DenseLuSolver, LinearSolverType};
#[cfg(feature = "logging")]
pub use logger::{init_logger, init_logger_with_level};
pub use objectives::{LinkObjective, Objective, RosenbrockObjective};
pub use observers::TrajectoryRecorder;
pub use optimizer::{
    Bfgs, GradientDescent, Newton, OptObserver, OptObserverVec, OptimizerType, Solver,
    wrap_angle, wrap_angles,
};
pub use tasks::{Task, run_task};
