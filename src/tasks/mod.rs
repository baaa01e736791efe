//! Driver for the numbered tasks.
//!
//! Group `A` exercises the optimizers on the Rosenbrock function, group `B`
//! solves inverse kinematics for serial chains of growing length. Each task
//! produces the text that ends up in `output<letter><number>.txt`.
//!
//! | Task | Work                                                          |
//! |------|---------------------------------------------------------------|
//! | A1   | f, g and H of the Rosenbrock function at (−1, 0)              |
//! | A2   | gradient descent, fixed step 0.1                              |
//! | A3   | gradient descent with line search                             |
//! | A4   | Newton's method with line search                              |
//! | A5   | BFGS with line search                                         |
//! | B1   | 1 link reaching (0, 1)                                        |
//! | B2   | 2 links reaching (1, 1)                                       |
//! | B3   | 4 links reaching (3, 1), free root                            |
//! | B4   | 10 links reaching (9, 1), free root                           |
//! | B5   | as B4, two BFGS iterations followed by Newton's method        |

use crate::core::LinkChain;
use crate::error::IkResult;
use crate::io::{self, format_general, format_matrix, format_vector};
use crate::objectives::{LinkObjective, Objective, RosenbrockObjective};
use crate::observers::TrajectoryRecorder;
use crate::optimizer::{
    Bfgs, BfgsConfig, GradientDescent, GradientDescentConfig, Newton, NewtonConfig, SolverResult,
};
use nalgebra::{DMatrix, DVector, Vector2, dvector};
use std::{fmt, path::Path, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::{debug, error, info};

/// Gradient-norm tolerance of every task.
pub const TOLERANCE: f64 = 1e-6;

/// Weight of the target term in the IK tasks.
pub const TARGET_WEIGHT: f64 = 1e3;

/// Task selection errors
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Invalid task id '{0}': expected a letter A or B followed by a number, e.g. A3 or B.5")]
    InvalidId(String),

    #[error("Unknown task {letter}{number}: only {letter}1 to {letter}5 exist")]
    UnknownNumber { letter: char, number: u32 },
}

impl TaskError {
    /// Log the error using tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error with source error information using tracing::error and return self for chaining
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for task selection
pub type TaskResult<T> = Result<T, TaskError>;

/// Task group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Group A: optimizers on the Rosenbrock function
    Rosenbrock,
    /// Group B: inverse kinematics of a link chain
    InverseKinematics,
}

impl TaskKind {
    pub fn letter(self) -> char {
        match self {
            TaskKind::Rosenbrock => 'A',
            TaskKind::InverseKinematics => 'B',
        }
    }
}

/// A task id such as `A3` or `B5`.
///
/// ```
/// use chain_ik::tasks::{Task, TaskKind};
///
/// let task: Task = "B.5".parse()?;
/// assert_eq!(task.kind(), TaskKind::InverseKinematics);
/// assert_eq!(task.number(), 5);
/// assert_eq!(task.to_string(), "B5");
/// # Ok::<(), chain_ik::tasks::TaskError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Task {
    kind: TaskKind,
    number: u32,
}

impl Task {
    pub const COUNT_PER_KIND: u32 = 5;

    pub fn new(kind: TaskKind, number: u32) -> TaskResult<Self> {
        if !(1..=Self::COUNT_PER_KIND).contains(&number) {
            return Err(TaskError::UnknownNumber {
                letter: kind.letter(),
                number,
            }
            .log());
        }
        Ok(Self { kind, number })
    }

    /// Every task in order A1..A5, B1..B5.
    pub fn all() -> Vec<Task> {
        [TaskKind::Rosenbrock, TaskKind::InverseKinematics]
            .into_iter()
            .flat_map(|kind| (1..=Self::COUNT_PER_KIND).map(move |number| Task { kind, number }))
            .collect()
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn letter(&self) -> char {
        self.kind.letter()
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Output file of this task inside `dir`.
    pub fn output_path<P: AsRef<Path>>(&self, dir: P) -> PathBuf {
        io::output_path(dir, self.letter(), self.number)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.number)
    }
}

impl FromStr for Task {
    type Err = TaskError;

    /// Accepts `A3`, `a3` and `A.3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaskError::InvalidId(s.to_string()).log();
        let mut chars = s.trim().chars();
        let kind = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('A') => TaskKind::Rosenbrock,
            Some('B') => TaskKind::InverseKinematics,
            _ => return Err(invalid()),
        };
        let rest = chars.as_str();
        let digits = rest.strip_prefix('.').unwrap_or(rest);
        let number = digits.parse::<u32>().map_err(|_| invalid())?;
        Task::new(kind, number)
    }
}

/// Chain and solver budget of one IK task.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSetup {
    /// Number of links, spaced one unit apart along x
    pub links: usize,
    pub target: Vector2<f64>,
    /// Per-joint regularization weights
    pub regularization: DVector<f64>,
    pub bfgs_iterations: usize,
    /// Newton iterations run after BFGS, if any
    pub newton_iterations: Option<usize>,
}

impl IkSetup {
    /// Setup of task `B<number>`.
    pub fn for_task(number: u32) -> TaskResult<Self> {
        // The root joint of the longer chains is left unregularized.
        let free_root = |n: usize| {
            let mut reg = DVector::from_element(n, 1.0);
            reg[0] = 0.0;
            reg
        };
        let setup = match number {
            1 => Self {
                links: 1,
                target: Vector2::new(0.0, 1.0),
                regularization: dvector![1.0],
                bfgs_iterations: 5,
                newton_iterations: None,
            },
            2 => Self {
                links: 2,
                target: Vector2::new(1.0, 1.0),
                regularization: dvector![1.0, 1.0],
                bfgs_iterations: 5,
                newton_iterations: None,
            },
            3 => Self {
                links: 4,
                target: Vector2::new(3.0, 1.0),
                regularization: free_root(4),
                bfgs_iterations: 50,
                newton_iterations: None,
            },
            4 => Self {
                links: 10,
                target: Vector2::new(9.0, 1.0),
                regularization: free_root(10),
                bfgs_iterations: 150,
                newton_iterations: None,
            },
            5 => Self {
                links: 10,
                target: Vector2::new(9.0, 1.0),
                regularization: free_root(10),
                bfgs_iterations: 2,
                newton_iterations: Some(30),
            },
            _ => {
                return Err(TaskError::UnknownNumber {
                    letter: TaskKind::InverseKinematics.letter(),
                    number,
                }
                .log());
            }
        };
        Ok(setup)
    }
}

/// Run `task` and return its output text.
pub fn run_task(task: Task) -> IkResult<String> {
    run(task, None)
}

/// Run `task`, recording every solver iterate in `recorder`.
pub fn run_task_recorded(task: Task, recorder: &TrajectoryRecorder) -> IkResult<String> {
    run(task, Some(recorder))
}

fn run(task: Task, recorder: Option<&TrajectoryRecorder>) -> IkResult<String> {
    info!("Running task {}", task);
    match task.kind() {
        TaskKind::Rosenbrock => run_rosenbrock(task.number(), recorder),
        TaskKind::InverseKinematics => run_ik(&IkSetup::for_task(task.number())?, recorder),
    }
}

fn run_rosenbrock(number: u32, recorder: Option<&TrajectoryRecorder>) -> IkResult<String> {
    let mut objective = RosenbrockObjective::new(1.0, 1.0);
    let x0 = dvector![-1.0, 0.0];

    let result = match number {
        1 => {
            let mut gradient = DVector::zeros(2);
            let mut hessian = DMatrix::zeros(2, 2);
            let f = objective.evaluate_hessian(&x0, &mut gradient, &mut hessian);
            return Ok(format!(
                "{}\n{}\n{}\n",
                format_general(f),
                format_vector(&gradient),
                format_matrix(&hessian)
            ));
        }
        2 | 3 => {
            let config = GradientDescentConfig::new()
                .with_max_iterations(50)
                .with_gradient_tolerance(TOLERANCE);
            let config = if number == 2 {
                config
                    .with_initial_step(0.1)
                    .with_max_line_search_iterations(1)
            } else {
                config
                    .with_initial_step(1.0)
                    .with_backtracking_factor(0.8)
                    .with_max_line_search_iterations(20)
            };
            let mut solver = GradientDescent::with_config(config);
            if let Some(recorder) = recorder {
                solver.add_observer(recorder.clone());
            }
            solver.optimize(&mut objective, &x0)?
        }
        4 => {
            let config = NewtonConfig::new()
                .with_max_iterations(50)
                .with_gradient_tolerance(TOLERANCE)
                .with_initial_step(1.0)
                .with_backtracking_factor(0.8)
                .with_max_line_search_iterations(20);
            let mut solver = Newton::with_config(config);
            if let Some(recorder) = recorder {
                solver.add_observer(recorder.clone());
            }
            solver.optimize(&mut objective, &x0)?
        }
        5 => {
            let config = BfgsConfig::new()
                .with_max_iterations(50)
                .with_gradient_tolerance(TOLERANCE)
                .with_initial_step(1.0)
                .with_backtracking_factor(0.8)
                .with_max_line_search_iterations(20);
            let mut solver = Bfgs::with_config(config);
            if let Some(recorder) = recorder {
                solver.add_observer(recorder.clone());
            }
            solver.optimize(&mut objective, &x0)?
        }
        _ => {
            return Err(TaskError::UnknownNumber {
                letter: TaskKind::Rosenbrock.letter(),
                number,
            }
            .log()
            .into());
        }
    };

    log_result(&result);
    Ok(format!(
        "{}\n{}\n",
        result.iterations,
        format_vector(&result.parameters)
    ))
}

/// Solve one IK setup on a fresh chain and return the final angles, one per line.
pub fn run_ik(setup: &IkSetup, recorder: Option<&TrajectoryRecorder>) -> IkResult<String> {
    let mut chain = LinkChain::serial(setup.links, 1.0);
    let x = solve_ik(&mut chain, setup, recorder)?;
    chain.set_angles(&x)?;

    let mut output = String::new();
    for link in chain.links() {
        output.push_str(&format_general(link.angle()));
        output.push('\n');
    }
    Ok(output)
}

/// Run the solver sequence of `setup` on `chain`, starting from its current angles.
pub fn solve_ik(
    chain: &mut LinkChain,
    setup: &IkSetup,
    recorder: Option<&TrajectoryRecorder>,
) -> IkResult<DVector<f64>> {
    let x0 = chain.angles();
    let end = chain.len().saturating_sub(1);
    let mut objective = LinkObjective::new(
        chain,
        end,
        setup.target,
        TARGET_WEIGHT,
        setup.regularization.clone(),
    )?;

    let bfgs_config = BfgsConfig::new()
        .with_max_iterations(setup.bfgs_iterations)
        .with_gradient_tolerance(TOLERANCE)
        .with_initial_step(1.0)
        .with_backtracking_factor(0.5)
        .with_max_line_search_iterations(20);
    let mut bfgs = Bfgs::with_config(bfgs_config);
    if let Some(recorder) = recorder {
        bfgs.add_observer(recorder.clone());
    }
    let result = bfgs.optimize(&mut objective, &x0)?;
    log_result(&result);
    let mut x = result.parameters;

    if let Some(newton_iterations) = setup.newton_iterations {
        let newton_config = NewtonConfig::new()
            .with_max_iterations(newton_iterations)
            .with_gradient_tolerance(TOLERANCE)
            .with_initial_step(1.0)
            .with_backtracking_factor(0.5)
            .with_max_line_search_iterations(20);
        let mut newton = Newton::with_config(newton_config);
        if let Some(recorder) = recorder {
            newton.add_observer(recorder.clone());
        }
        let result = newton.optimize(&mut objective, &x)?;
        log_result(&result);
        x = result.parameters;
    }

    let (reached, target) = (objective.end_effector(), objective.target());
    debug!(
        "end effector at ({:.6}, {:.6}), target ({}, {})",
        reached.x, reached.y, target.x, target.y
    );
    Ok(x)
}

fn log_result(result: &SolverResult) {
    info!(
        "{} after {} iterations, cost {:.6e} -> {:.6e}",
        result.status, result.iterations, result.initial_cost, result.final_cost
    );
}
