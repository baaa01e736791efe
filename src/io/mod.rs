//! Task output files.
//!
//! Every task renders its result as text (see [`format`]) and writes it to
//! `output<letter><number>.txt` in a resource directory. Solver trajectories can
//! be dumped alongside with [`trajectory::write_trajectory`].

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, info};

pub mod format;
pub mod trajectory;

pub use format::{format_general, format_general_with_precision, format_matrix, format_vector};
pub use trajectory::{read_trajectory, write_trajectory};

/// Errors that can occur while writing or reading task files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to create file '{path}': {reason}")]
    FileCreationFailed { path: String, reason: String },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid number format at line {line}: {value}")]
    InvalidNumber { line: usize, value: String },
}

impl IoError {
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

/// Result type for the io module
pub type IoResult<T> = Result<T, IoError>;

/// Output file of a task: `<dir>/output<letter><number>.txt`.
///
/// ```
/// use chain_ik::io::output_path;
/// use std::path::Path;
///
/// assert_eq!(output_path("resources", 'B', 3), Path::new("resources/outputB3.txt"));
/// ```
pub fn output_path<P: AsRef<Path>>(dir: P, letter: char, number: u32) -> PathBuf {
    dir.as_ref().join(format!("output{letter}{number}.txt"))
}

/// Write `contents` to `path`, replacing any previous file.
pub fn write_output<P: AsRef<Path>>(path: P, contents: &str) -> IoResult<()> {
    let path_ref = path.as_ref();
    let mut file = File::create(path_ref).map_err(|e| {
        IoError::FileCreationFailed {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        }
        .log()
    })?;
    file.write_all(contents.as_bytes())
        .map_err(|e| IoError::Io(e).log_with_source(format!("Failed to write {:?}", path_ref)))?;
    info!("Writing to {}", path_ref.display());
    Ok(())
}
