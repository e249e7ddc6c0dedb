//! Condition-checking virtual machine and companion hashing utilities.
//!
//! Provides a small stack-based bytecode interpreter that turns a program and
//! a table of numeric variables into a boolean verdict, plus a SHA-256 Merkle
//! root builder, a proof-of-work nonce search and a filename validator.

pub mod core;
pub mod types;
pub mod utils;
pub mod virtual_machine;

pub use virtual_machine::errors::VMError;
pub use virtual_machine::program::Program;
pub use virtual_machine::vm::{ExecLimits, Variables, execute, execute_with_limits};
