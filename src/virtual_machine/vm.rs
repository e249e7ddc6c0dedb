//! Core virtual machine implementation.
//!
//! The VM is a stack machine over `f64` values. It decodes the program left
//! to right, one instruction per step, and stops on `HALT`, at the end of
//! the program, or at the first error. The verdict is the truthiness of the
//! value on top of the stack: an empty stack is `false`, otherwise the top is
//! compared with `0.0` (so `-0.0` is `false` and NaN is `true`).
//!
//! Nothing is shared between executions. The program and variables are only
//! borrowed, so independent runs can proceed on separate threads.

mod limits;
mod stack;
#[cfg(test)]
mod tests;
mod variables;

pub use limits::ExecLimits;
pub use stack::STACK_CAPACITY;
pub use variables::Variables;

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Op;
use limits::StepMeter;
use stack::OperandStack;

/// Whether the run loop continues after an instruction.
enum Flow {
    Continue,
    Halt,
}

/// Bytecode virtual machine.
///
/// Borrows the program and the variable table for its whole lifetime and
/// never writes to either.
pub struct VM<'a, V: Variables + ?Sized> {
    /// Bytecode to execute.
    data: &'a [u8],
    /// Offset of the next instruction.
    ip: usize,
    stack: OperandStack,
    variables: &'a V,
    meter: StepMeter,
}

impl<'a, V: Variables + ?Sized> VM<'a, V> {
    /// Creates a VM positioned at the start of `program`.
    pub fn new(program: &'a [u8], variables: &'a V) -> Self {
        Self {
            data: program,
            ip: 0,
            stack: OperandStack::new(),
            variables,
            meter: StepMeter::default(),
        }
    }

    /// Executes the program from the start and returns the verdict.
    ///
    /// Each call starts from a clean stack, so running twice yields the same
    /// outcome. After a failure [`ip`](Self::ip) is the offset of the
    /// instruction that failed.
    pub fn run(&mut self, limits: &ExecLimits) -> Result<bool, VMError> {
        self.ip = 0;
        self.stack.clear();
        self.meter = StepMeter::new(limits);

        while self.ip < self.data.len() {
            self.meter.charge()?;
            let offset = self.ip;
            let (op, next) = Op::decode(self.data, offset)?;
            let flow = self.exec(op, offset)?;
            self.ip = next;
            if let Flow::Halt = flow {
                break;
            }
        }

        Ok(self.verdict())
    }

    /// Offset of the next instruction to decode.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Current stack contents, bottom first.
    pub fn stack(&self) -> &[f64] {
        self.stack.as_slice()
    }

    /// Instructions executed by the last [`run`](Self::run), `HALT` included.
    pub fn steps(&self) -> u64 {
        self.meter.used()
    }

    /// The truthiness of the top of the stack; `false` when empty.
    pub fn verdict(&self) -> bool {
        self.stack.top().is_some_and(|v| v != 0.0)
    }

    /// Executes a single decoded instruction located at `offset`.
    fn exec(&mut self, op: Op, offset: usize) -> Result<Flow, VMError> {
        let instr = op.instruction().mnemonic();
        match op {
            Op::Halt {} => return Ok(Flow::Halt),
            Op::Push { value } => self.stack.push(value, instr, offset)?,
            Op::Load { index } => self.op_load(instr, offset, index)?,
            Op::Add {} => self.op_binary(instr, offset, |a, b| a + b)?,
            Op::Sub {} => self.op_binary(instr, offset, |a, b| a - b)?,
            Op::Mul {} => self.op_binary(instr, offset, |a, b| a * b)?,
            Op::Div {} => self.op_div(instr, offset)?,
            Op::Eq {} => self.op_binary(instr, offset, |a, b| truth(a == b))?,
            Op::Gt {} => self.op_binary(instr, offset, |a, b| truth(a > b))?,
            Op::Lt {} => self.op_binary(instr, offset, |a, b| truth(a < b))?,
            Op::And {} => self.op_binary(instr, offset, |a, b| truth(a != 0.0 && b != 0.0))?,
            Op::Or {} => self.op_binary(instr, offset, |a, b| truth(a != 0.0 || b != 0.0))?,
            Op::Not {} => {
                let a = self.stack.pop(instr, offset)?;
                self.stack.push(truth(a == 0.0), instr, offset)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn op_load(&mut self, instr: &'static str, offset: usize, index: u8) -> Result<(), VMError> {
        let value = self
            .variables
            .get(index as usize)
            .ok_or(VMError::IndexOutOfRange {
                index,
                len: self.variables.len(),
                offset,
            })?;
        self.stack.push(value, instr, offset)
    }

    /// Pops `b` then `a` and pushes `f(a, b)`.
    #[inline(always)]
    fn op_binary(
        &mut self,
        instr: &'static str,
        offset: usize,
        f: impl FnOnce(f64, f64) -> f64,
    ) -> Result<(), VMError> {
        let (a, b) = self.stack.pop_pair(instr, offset)?;
        self.stack.push(f(a, b), instr, offset)
    }

    fn op_div(&mut self, instr: &'static str, offset: usize) -> Result<(), VMError> {
        self.stack.require(2, instr, offset)?;
        // -0.0 compares equal to 0.0 and is rejected too.
        if self.stack.top() == Some(0.0) {
            return Err(VMError::DivisionByZero { offset });
        }
        self.op_binary(instr, offset, |a, b| a / b)
    }
}

const fn truth(cond: bool) -> f64 {
    if cond { 1.0 } else { 0.0 }
}

/// Executes `program` against `variables` with no step budget.
pub fn execute<V: Variables + ?Sized>(program: &[u8], variables: &V) -> Result<bool, VMError> {
    execute_with_limits(program, variables, &ExecLimits::default())
}

/// Executes `program` against `variables`, failing with
/// [`VMError::StepLimitExceeded`] once `limits.max_steps` instructions ran.
pub fn execute_with_limits<V: Variables + ?Sized>(
    program: &[u8],
    variables: &V,
    limits: &ExecLimits,
) -> Result<bool, VMError> {
    VM::new(program, variables).run(limits)
}
