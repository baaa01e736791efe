//! Core model types for the chain-ik library
//!
//! This module contains the kinematic model the optimizers work on:
//! - Link records (angle, local offset, depth)
//! - The serial link chain, stored as a linear arena indexed by depth

pub mod link;

pub use link::{Link, LinkChain};

use thiserror::Error;
use tracing::error;

/// Core module error types for link chains and objectives
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A depth outside of the chain was requested
    #[error("Link depth {depth} is out of range for a chain of {len} links")]
    LinkOutOfRange { depth: usize, len: usize },

    /// The chain has no links
    #[error("Link chain is empty")]
    EmptyChain,

    /// Dimension mismatch between parameters, weights and chain
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid input parameter or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// chain.set_angle(depth, theta)
    ///     .map_err(|e| e.log())?;
    /// ```
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the error that caused it
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for core module operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_out_of_range_display() {
        let err = CoreError::LinkOutOfRange { depth: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Link depth 4 is out of range for a chain of 2 links"
        );
    }

    #[test]
    fn test_log_returns_self() {
        let err = CoreError::DimensionMismatch("3 weights for 2 links".to_string()).log();
        assert!(matches!(err, CoreError::DimensionMismatch(_)));
    }
}
