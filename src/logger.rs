//! Logging setup for the chain-ik binary and benchmark
//!
//! Installs a `tracing` subscriber with a bracketed one-line format and INFO as
//! the default level. Solver iteration tables are emitted at DEBUG.

use tracing::Level;

/// Initialize the tracing subscriber with the standard configuration
///
/// Default log level: INFO (overrideable via RUST_LOG environment variable)
///
/// Format: `[LEVEL YYYY-MM-DD HH:MM:SS module]` for INFO/WARN/ERROR
///         `[LEVEL YYYY-MM-DD HH:MM:SS file:line]` for DEBUG/TRACE
///
/// # Example
/// ```no_run
/// use chain_ik::init_logger;
///
/// init_logger();
/// tracing::info!("Solving task B1");
/// ```
///
/// # Environment Variables
/// Override the default log level using `RUST_LOG`:
/// ```bash
/// RUST_LOG=debug cargo run --bin ik_tasks -- --task B3
/// RUST_LOG=chain_ik::optimizer=debug cargo run --bin ik_tasks -- --task all
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level
///
/// # Example
/// ```no_run
/// use chain_ik::init_logger_with_level;
/// use tracing::Level;
///
/// init_logger_with_level(Level::DEBUG);
/// tracing::debug!("Iteration tables enabled");
/// ```
pub fn init_logger_with_level(default_level: Level) {
    // A second initialization (tests, benches) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .event_format(BracketFormatter)
        .try_init();
}

/// One-line event format: `[LEVEL timestamp location] message`
struct BracketFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for BracketFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        use chrono::Local;

        let metadata = event.metadata();
        let level = *metadata.level();

        let (color, name) = match level {
            Level::ERROR => ("31", "ERROR"),
            Level::WARN => ("33", "WARN"),
            Level::INFO => ("32", "INFO"),
            Level::DEBUG => ("34", "DEBUG"),
            Level::TRACE => ("35", "TRACE"),
        };
        if writer.has_ansi_escapes() {
            write!(writer, "[\x1b[{color}m{name}\x1b[0m ")?;
        } else {
            write!(writer, "[{name} ")?;
        }

        write!(writer, "{} ", Local::now().format("%Y-%m-%d %H:%M:%S"))?;

        // DEBUG/TRACE point at the source line, the rest name the module.
        let location = match (level >= Level::DEBUG, metadata.file()) {
            (true, Some(file)) => {
                let filename = file.rsplit('/').next().unwrap_or(file);
                match metadata.line() {
                    Some(line) => format!("{filename}:{line}"),
                    None => filename.to_string(),
                }
            }
            _ => metadata.target().to_string(),
        };
        write!(writer, "{location}] ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
