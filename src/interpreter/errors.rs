//! Runtime error types for the C interpreter
//!
//! All runtime errors are fatal: the first one aborts the current
//! interpretation and is surfaced to the driver as a single diagnostic.
//! The `Display` form of every variant starts with its taxonomy name
//! (`DivisionByZero`, `SegFault`, ...) so drivers and tests can match on
//! the error kind without inspecting the enum.

use crate::memory::heap::MemoryError;
use crate::memory::value::Address;
use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("Redeclaration: '{name}' is already declared in this scope")]
    Redeclaration {
        name: String,
        location: SourceLocation,
    },

    #[error("Undeclared: '{name}' is not declared")]
    Undeclared {
        name: String,
        location: SourceLocation,
    },

    #[error("TypeMismatch: {message}")]
    TypeMismatch {
        message: String,
        location: SourceLocation,
    },

    #[error("NotAFunction: '{name}' is not a function")]
    NotAFunction {
        name: String,
        location: SourceLocation,
    },

    #[error("ArityMismatch: '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    #[error("DivisionByZero: {operation} by zero")]
    DivisionByZero {
        operation: &'static str,
        location: SourceLocation,
    },

    #[error("ShiftOutOfRange: shift count {count} is out of range")]
    ShiftOutOfRange {
        count: i64,
        location: SourceLocation,
    },

    #[error("IndexOutOfBounds: index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        index: i64,
        len: usize,
        location: SourceLocation,
    },

    #[error("NullDereference: null pointer dereferenced")]
    NullDereference { location: SourceLocation },

    #[error("InvalidFree: address {address:#x} is not the start of a heap allocation")]
    InvalidFree {
        address: Address,
        location: SourceLocation,
    },

    #[error("DoubleFree: address {address:#x} was already freed")]
    DoubleFree {
        address: Address,
        location: SourceLocation,
    },

    #[error("SegFault: {message}")]
    SegFault {
        message: String,
        location: SourceLocation,
    },

    #[error("InitializerOverflow: {got} initializer element(s) for array of length {len}")]
    InitializerOverflow {
        got: usize,
        len: usize,
        location: SourceLocation,
    },

    #[error("StrayControlFlow: '{keyword}' outside of a loop")]
    StrayControlFlow {
        keyword: &'static str,
        location: SourceLocation,
    },

    #[error("OutOfMemory: requested {requested} bytes, limit is {limit}")]
    OutOfMemory {
        requested: usize,
        limit: usize,
        location: SourceLocation,
    },

    #[error("Interrupted: execution cancelled by the host")]
    Interrupted { location: SourceLocation },
}

impl RuntimeError {
    /// The source location where the error was raised.
    pub fn location(&self) -> SourceLocation {
        match self {
            RuntimeError::Redeclaration { location, .. }
            | RuntimeError::Undeclared { location, .. }
            | RuntimeError::TypeMismatch { location, .. }
            | RuntimeError::NotAFunction { location, .. }
            | RuntimeError::ArityMismatch { location, .. }
            | RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::ShiftOutOfRange { location, .. }
            | RuntimeError::IndexOutOfBounds { location, .. }
            | RuntimeError::NullDereference { location }
            | RuntimeError::InvalidFree { location, .. }
            | RuntimeError::DoubleFree { location, .. }
            | RuntimeError::SegFault { location, .. }
            | RuntimeError::InitializerOverflow { location, .. }
            | RuntimeError::StrayControlFlow { location, .. }
            | RuntimeError::OutOfMemory { location, .. }
            | RuntimeError::Interrupted { location } => *location,
        }
    }

    /// Attach a source location to a memory-model error.
    pub fn from_memory(err: MemoryError, location: SourceLocation) -> Self {
        match err {
            MemoryError::SegFault(addr) => RuntimeError::SegFault {
                message: format!("address {:#x} is not inside a live allocation", addr),
                location,
            },
            MemoryError::InvalidFree(address) => RuntimeError::InvalidFree { address, location },
            MemoryError::DoubleFree(address) => RuntimeError::DoubleFree { address, location },
            MemoryError::OutOfMemory { requested, limit } => RuntimeError::OutOfMemory {
                requested,
                limit,
                location,
            },
            MemoryError::UnsupportedStore(name) => RuntimeError::TypeMismatch {
                message: format!("cannot store a {} value", name),
                location,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_leads_with_taxonomy_name() {
        let err = RuntimeError::DivisionByZero {
            operation: "division",
            location: SourceLocation::new(3, 7),
        };
        assert!(err.to_string().starts_with("DivisionByZero"));

        let err = RuntimeError::IndexOutOfBounds {
            index: 3,
            len: 3,
            location: SourceLocation::new(1, 1),
        };
        assert!(err.to_string().starts_with("IndexOutOfBounds"));
    }

    #[test]
    fn test_memory_error_conversion() {
        let loc = SourceLocation::new(2, 4);
        let err = RuntimeError::from_memory(MemoryError::DoubleFree(0x1000), loc);
        assert!(matches!(err, RuntimeError::DoubleFree { .. }));
        assert_eq!(err.location(), loc);
    }
}
