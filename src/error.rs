//! Error types for the chain-ik library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.
//!
//! # Error Hierarchy
//!
//! - **`IkError`** is the top-level error exposed by the task driver and binaries
//! - **Module errors** (`CoreError`, `OptimizerError`, etc.) are wrapped inside `IkError`
//! - **Error sources** are preserved, allowing full error chain inspection
//!
//! Example error chain:
//! ```text
//! IkError::Optimizer(
//!     OptimizerError::LinearSolveFailed {
//!         iteration: 3,
//!         source: LinAlgError::SingularMatrix,
//!     }
//! )
//! ```

use crate::{
    core::CoreError, io::IoError, linalg::LinAlgError, observers::ObserverError,
    optimizer::OptimizerError, tasks::TaskError,
};
use std::error::Error as StdError;
use thiserror::Error;

/// Main result type used throughout the chain-ik library
pub type IkResult<T> = Result<T, IkError>;

/// Main error type for the chain-ik library
///
/// # Error Chain Access
///
/// ```rust,ignore
/// if let Err(e) = run_task(task) {
///     warn!("Error: {}", e);
///     warn!("Full chain: {}", e.chain());
/// }
/// ```
#[derive(Debug, Error)]
pub enum IkError {
    /// Link chain and objective errors
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Optimization algorithm errors
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Linear algebra errors
    #[error(transparent)]
    LinearAlgebra(#[from] LinAlgError),

    /// Output file errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Observer errors
    #[error(transparent)]
    Observer(#[from] ObserverError),

    /// Task selection errors
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl IkError {
    /// Get the full error chain as a string, one error per line.
    ///
    /// ```rust,ignore
    /// warn!("Error chain: {}", e.chain());
    /// // Output: "Linear system solve failed at iteration 3
    /// //            → Singular matrix detected"
    /// ```
    pub fn chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(format!("  → {}", err));
            source = err.source();
        }

        chain.join("\n")
    }

    /// Get a compact single-line error chain for logging
    pub fn chain_compact(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }

        chain.join(" → ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ik_error_display() {
        let error = IkError::from(LinAlgError::SingularMatrix);
        assert!(error.to_string().contains("Singular matrix"));
    }

    #[test]
    fn test_ik_error_chain() {
        let error = IkError::from(OptimizerError::LinearSolveFailed {
            iteration: 3,
            source: LinAlgError::NotPositiveDefinite,
        });

        let chain = error.chain();
        assert_eq!(chain.lines().count(), 2);
        assert!(chain.lines().nth(1).is_some_and(|l| l.contains("positive definite")));
    }

    #[test]
    fn test_ik_error_chain_compact() {
        let error = IkError::from(CoreError::EmptyChain);
        assert_eq!(error.chain_compact(), "Link chain is empty");
    }

    #[test]
    fn test_transparent_error_conversion() {
        let error: IkError = TaskError::InvalidId("Z9".to_string()).into();
        match error {
            IkError::Task(_) => { /* Expected */ }
            _ => panic!("Expected Task variant"),
        }
    }
}
