//! Optimizer comparison on the Rosenbrock function and the IK chains
//!
//! Runs gradient descent, Newton's method and BFGS with identical loop settings on
//! each problem and reports convergence, iterations, final cost and average
//! wall-clock time.
//!
//! ## Configuration
//! - Max iterations: 500
//! - Gradient tolerance: 1e-6
//! - Line search: initial step 1.0, backtracking factor 0.5, 20 trials
//! - Each problem is solved 5 times per optimizer and the times are averaged
//!
//! Run with `cargo bench --bench optimizer_comparison`.

use std::hint::black_box;
use std::time::Instant;
use tracing::{info, warn};

use chain_ik::core::LinkChain;
use chain_ik::{IkResult, init_logger};
use chain_ik::objectives::{LinkObjective, Objective, RosenbrockObjective};
use chain_ik::optimizer::{
    Bfgs, BfgsConfig, GradientDescent, GradientDescentConfig, Newton, NewtonConfig,
    OptimizerResult, Solver, SolverResult,
};
use chain_ik::tasks::{IkSetup, TARGET_WEIGHT};
use nalgebra::{DVector, dvector};

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-6;
const RUNS: usize = 5;

#[derive(Clone, Copy)]
enum Method {
    GradientDescent,
    Newton,
    Bfgs,
}

impl Method {
    fn name(self) -> &'static str {
        match self {
            Method::GradientDescent => "GD",
            Method::Newton => "Newton",
            Method::Bfgs => "BFGS",
        }
    }

    fn solve<O: Objective + ?Sized>(
        self,
        objective: &mut O,
        x0: &DVector<f64>,
    ) -> OptimizerResult<SolverResult> {
        match self {
            Method::GradientDescent => solve_with::<GradientDescent, _>(
                GradientDescentConfig::new()
                    .with_max_iterations(MAX_ITERATIONS)
                    .with_gradient_tolerance(TOLERANCE),
                objective,
                x0,
            ),
            Method::Newton => solve_with::<Newton, _>(
                NewtonConfig::new()
                    .with_max_iterations(MAX_ITERATIONS)
                    .with_gradient_tolerance(TOLERANCE),
                objective,
                x0,
            ),
            Method::Bfgs => solve_with::<Bfgs, _>(
                BfgsConfig::new()
                    .with_max_iterations(MAX_ITERATIONS)
                    .with_gradient_tolerance(TOLERANCE)
                    .with_wrap_angles(false),
                objective,
                x0,
            ),
        }
    }
}

fn solve_with<S: Solver, O: Objective + ?Sized>(
    config: S::Config,
    objective: &mut O,
    x0: &DVector<f64>,
) -> OptimizerResult<SolverResult> {
    S::with_config(config).optimize(objective, x0)
}

/// Benchmark result structure
struct BenchmarkResult {
    problem: String,
    method: &'static str,
    converged: bool,
    iterations: usize,
    final_cost: f64,
    avg_time_ms: f64,
}

fn bench_problem<F>(problem: &str, method: Method, mut run: F) -> Option<BenchmarkResult>
where
    F: FnMut(Method) -> IkResult<SolverResult>,
{
    let mut total_ms = 0.0;
    let mut last = None;
    for _ in 0..RUNS {
        let start = Instant::now();
        match run(method) {
            Ok(result) => {
                total_ms += start.elapsed().as_secs_f64() * 1000.0;
                last = Some(black_box(result));
            }
            Err(e) => {
                warn!("{} on {} failed: {}", method.name(), problem, e);
                return None;
            }
        }
    }
    last.map(|result| BenchmarkResult {
        problem: problem.to_string(),
        method: method.name(),
        converged: result.status.is_converged(),
        iterations: result.iterations,
        final_cost: result.final_cost,
        avg_time_ms: total_ms / RUNS as f64,
    })
}

fn main() {
    init_logger();

    let methods = [Method::GradientDescent, Method::Newton, Method::Bfgs];
    let mut results = Vec::new();

    for method in methods {
        results.extend(bench_problem("rosenbrock", method, |m| {
            let mut objective = RosenbrockObjective::new(1.0, 1.0);
            Ok(m.solve(&mut objective, &dvector![-1.0, 0.0])?)
        }));
    }

    for number in 1..=4 {
        let Ok(setup) = IkSetup::for_task(number) else {
            continue;
        };
        let problem = format!("chain-{}", setup.links);
        for method in methods {
            results.extend(bench_problem(&problem, method, |m| {
                let mut chain = LinkChain::serial(setup.links, 1.0);
                let x0 = chain.angles();
                let end = setup.links - 1;
                let mut objective = LinkObjective::new(
                    &mut chain,
                    end,
                    setup.target,
                    TARGET_WEIGHT,
                    setup.regularization.clone(),
                )?;
                Ok(m.solve(&mut objective, &x0)?)
            }));
        }
    }

    info!(
        "{:<12} | {:<7} | {:<9} | {:<6} | {:<13} | {:<9}",
        "Problem", "Solver", "Converged", "Iters", "Final cost", "Time(ms)"
    );
    info!("{}", "-".repeat(70));
    for r in &results {
        info!(
            "{:<12} | {:<7} | {:<9} | {:<6} | {:<13.6e} | {:<9.3}",
            r.problem, r.method, r.converged, r.iterations, r.final_cost, r.avg_time_ms
        );
    }
}
