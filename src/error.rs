// src/error.rs

//! Typed failure conditions of the display pipeline.
//!
//! Most platform friction is recovered locally and only logged; the variants
//! here are the conditions that callers need to match on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    /// Two backends were registered under the same name. Programming defect.
    #[error("display backend '{0}' is already registered")]
    DuplicateBackendName(String),

    /// Selection finished with an empty active set. Only reachable if the
    /// text fallback itself failed to initialize.
    #[error("unable to find a usable display backend")]
    NoBackendAvailable,

    /// The backend has no implementation of the requested capability.
    #[error("display backend '{backend}' does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },
}

impl DisplayError {
    pub fn unsupported(backend: &str, operation: &'static str) -> Self {
        DisplayError::Unsupported {
            backend: backend.to_string(),
            operation,
        }
    }

    /// Whether this error must abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DisplayError::DuplicateBackendName(_) | DisplayError::NoBackendAvailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_treat_unsupported_operations_as_recoverable() {
        let err = DisplayError::unsupported("wayland", "move");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "display backend 'wayland' does not support move");
        assert!(DisplayError::NoBackendAvailable.is_fatal());
    }
}
