//! Stack-based bytecode virtual machine producing a boolean verdict.
//!
//! The VM evaluates small rule programs (comparisons and arithmetic over
//! externally supplied numeric variables) and answers `true` or `false`.
//!
//! # Architecture
//!
//! - **Operand stack**: fixed capacity of 256 `f64` values
//! - **Variables**: read-only table addressed by `LOAD idx`
//! - **Instruction format**: 1-byte opcode, `PUSH` carries an 8-byte
//!   little-endian double, `LOAD` a 1-byte index
//! - **Execution model**: straight-line, no jumps; stops on `HALT`, at the
//!   end of the bytecode, or at the first error
//! - **Step budget**: optional cap on executed instructions
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing, diagnostics, and bytecode generation
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`program`]: Program wrapper, builder, disassembly and stack analysis
//! - [`vm`]: Core virtual machine implementation

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod program;
pub mod vm;
