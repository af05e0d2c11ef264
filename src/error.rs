// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Error taxonomy for the detection pipeline
//!
//! Only conditions the caller has to act on are errors. Warm-up
//! (`InsufficientData`) and stale symptoms are ordinary values handled
//! inside the pipeline.

use thiserror::Error;

/// Pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A sample arrived with a timestamp earlier than the last accepted one
    #[error("out-of-order sample: received t={received:.4}s after t={previous:.4}s")]
    OutOfOrderSample {
        /// Timestamp of the newest sample already in the buffer
        previous: f64,
        /// Rejected timestamp
        received: f64,
    },

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown session identifier
    #[error("no active session named '{0}'")]
    UnknownSession(String),

    /// I/O failure in a measurement source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed measurement record
    #[error("malformed measurement at line {line}: {source}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Pipeline result alias
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_message() {
        let err = PipelineError::OutOfOrderSample { previous: 2.0, received: 1.5 };
        let msg = err.to_string();
        assert!(msg.contains("1.5000"));
        assert!(msg.contains("2.0000"));
    }
}
