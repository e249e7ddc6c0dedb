//! Bytecode program representation, construction and disassembly.
//!
//! [`Program`] owns an encoded instruction stream. It can be built from Rust
//! with [`ProgramBuilder`], produced by the assembler, or wrapped around
//! bytes read from disk. Decoding never executes anything.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Op};
use crate::virtual_machine::vm::{ExecLimits, STACK_CAPACITY, Variables, execute_with_limits};
use std::fmt;
use std::iter::FusedIterator;

/// Encoded bytecode program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    bytecode: Vec<u8>,
}

impl Program {
    /// Wraps raw bytecode. No validation is done here.
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self { bytecode }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytecode
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Decodes the program front to back.
    ///
    /// Yields one item per instruction, including bytes after `HALT`. After
    /// the first decoding error the iterator is exhausted.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            data: &self.bytecode,
            offset: 0,
            failed: false,
        }
    }

    /// Runs the program with no step budget.
    pub fn execute<V: Variables + ?Sized>(&self, variables: &V) -> Result<bool, VMError> {
        self.execute_with_limits(variables, &ExecLimits::default())
    }

    pub fn execute_with_limits<V: Variables + ?Sized>(
        &self,
        variables: &V,
        limits: &ExecLimits,
    ) -> Result<bool, VMError> {
        execute_with_limits(&self.bytecode, variables, limits)
    }

    /// Checks stack discipline without running the program.
    ///
    /// Follows the instruction stream up to `HALT` or the end and reports
    /// the same underflow, overflow, truncation and opcode errors the
    /// interpreter would. Value-dependent failures (division by zero,
    /// missing variables) are not detected.
    pub fn analyze(&self) -> Result<StackProfile, VMError> {
        let mut profile = StackProfile::default();
        let mut depth = 0usize;

        for decoded in self.instructions() {
            let DecodedInstr { offset, op } = decoded?;
            let instr = op.instruction();
            profile.instructions += 1;

            if depth < instr.pops() {
                return Err(VMError::StackUnderflow {
                    instruction: instr.mnemonic(),
                    offset,
                    required: instr.pops(),
                    available: depth,
                });
            }
            depth = depth - instr.pops() + instr.pushes();
            if depth > STACK_CAPACITY {
                return Err(VMError::StackOverflow {
                    instruction: instr.mnemonic(),
                    offset,
                    capacity: STACK_CAPACITY,
                });
            }
            profile.max_depth = profile.max_depth.max(depth);

            if instr == Instruction::Halt {
                break;
            }
        }

        profile.final_depth = depth;
        Ok(profile)
    }
}

impl From<Vec<u8>> for Program {
    fn from(bytecode: Vec<u8>) -> Self {
        Self::new(bytecode)
    }
}

impl AsRef<[u8]> for Program {
    fn as_ref(&self) -> &[u8] {
        &self.bytecode
    }
}

/// Prints one `offset: MNEMONIC operand` line per instruction.
///
/// A decoding error is printed in place of the instruction it stopped at.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decoded in self.instructions() {
            match decoded {
                Ok(DecodedInstr { offset, op }) => writeln!(f, "{offset:04}: {op}")?,
                Err(err) => {
                    let offset = err.offset().unwrap_or(0);
                    writeln!(f, "{offset:04}: <{err}>")?;
                }
            }
        }
        Ok(())
    }
}

/// One decoded instruction and where it starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedInstr {
    pub offset: usize,
    pub op: Op,
}

/// Iterator returned by [`Program::instructions`].
pub struct Instructions<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<DecodedInstr, VMError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let offset = self.offset;
        match Op::decode(self.data, offset) {
            Ok((op, next)) => {
                self.offset = next;
                Some(Ok(DecodedInstr { offset, op }))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Instructions<'_> {}

/// Static stack usage reported by [`Program::analyze`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackProfile {
    /// Instructions visited, `HALT` included.
    pub instructions: usize,
    /// Deepest stack reached.
    pub max_depth: usize,
    /// Depth when execution stops.
    pub final_depth: usize,
}

/// Emits bytecode from Rust.
///
/// ```
/// use pidgeon::virtual_machine::{isa::Instruction, program::ProgramBuilder};
///
/// let program = ProgramBuilder::new()
///     .load(0)
///     .push(18.0)
///     .op(Instruction::Gt)
///     .halt()
///     .build();
///
/// assert_eq!(program.execute(&[21.0]), Ok(true));
/// assert_eq!(program.execute(&[16.0]), Ok(false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    out: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, value: f64) -> Self {
        Op::Push { value }.encode(&mut self.out);
        self
    }

    pub fn load(mut self, index: u8) -> Self {
        Op::Load { index }.encode(&mut self.out);
        self
    }

    /// Emits an operand-less instruction.
    ///
    /// For `PUSH` and `LOAD` only the opcode byte is written, which leaves
    /// the program truncated; use [`push`](Self::push) and [`load`](Self::load).
    pub fn op(mut self, instr: Instruction) -> Self {
        self.out.push(instr as u8);
        self
    }

    pub fn halt(self) -> Self {
        self.op(Instruction::Halt)
    }

    /// Appends arbitrary bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Program {
        Program::new(self.out)
    }
}
