use std::path::{Path, PathBuf};
use std::time::Instant;

use chain_ik::io::{self, write_trajectory};
use chain_ik::observers::TrajectoryRecorder;
use chain_ik::tasks::{self, Task};
use chain_ik::{IkResult, init_logger, init_logger_with_level};
use clap::Parser;
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(name = "ik_tasks")]
#[command(about = "Run the Rosenbrock (A1-A5) and inverse kinematics (B1-B5) tasks")]
struct Args {
    /// Task to run, e.g. "A3", "B.5". Use "all" to run every task
    #[arg(short, long, default_value = "all")]
    task: String,

    /// Directory the output<letter><number>.txt files are written to
    #[arg(short, long, default_value = ".")]
    resource_dir: PathBuf,

    /// Optional file receiving every solver iterate, one per line.
    /// With several tasks the task id is appended to the file stem
    #[arg(long)]
    trajectory: Option<PathBuf>,

    /// Enable verbose output (per-iteration tables)
    #[arg(short, long)]
    verbose: bool,
}

struct TaskReport {
    task: Task,
    lines: usize,
    time_ms: u128,
}

fn trajectory_path(base: &Path, task: Task, several: bool) -> PathBuf {
    if !several {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trajectory".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, task, ext.to_string_lossy()),
        None => format!("{}_{}", stem, task),
    };
    base.with_file_name(name)
}

fn run_one(task: Task, args: &Args, several: bool) -> IkResult<TaskReport> {
    let start = Instant::now();
    let output = match &args.trajectory {
        Some(base) => {
            let recorder = TrajectoryRecorder::new();
            let output = tasks::run_task_recorded(task, &recorder)?;
            let path = trajectory_path(base, task, several);
            write_trajectory(&path, &recorder.points()?)?;
            info!("Trajectory of {} written to {}", task, path.display());
            output
        }
        None => tasks::run_task(task)?,
    };
    let time_ms = start.elapsed().as_millis();

    io::write_output(task.output_path(&args.resource_dir), &output)?;
    Ok(TaskReport {
        task,
        lines: output.lines().count(),
        time_ms,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        init_logger_with_level(Level::DEBUG);
    } else {
        init_logger();
    }

    let selected = if args.task.eq_ignore_ascii_case("all") {
        Task::all()
    } else {
        vec![args.task.parse::<Task>()?]
    };
    let several = selected.len() > 1;

    let mut reports = Vec::new();
    let mut failed = 0;
    for task in selected {
        match run_one(task, &args, several) {
            Ok(report) => reports.push(report),
            Err(e) => {
                failed += 1;
                warn!("Task {} failed", task);
                warn!("Full error chain:\n{}", e.chain());
            }
        }
    }

    if reports.len() > 1 {
        info!("{:<6} | {:<6} | {:<9}", "Task", "Lines", "Time(ms)");
        info!("{}", "-".repeat(27));
        for report in &reports {
            info!(
                "{:<6} | {:<6} | {:<9}",
                report.task, report.lines, report.time_ms
            );
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(format!("{} task(s) failed", failed).into())
    }
}
