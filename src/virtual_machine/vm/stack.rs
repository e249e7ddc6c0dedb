use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Maximum number of values the operand stack can hold.
pub const STACK_CAPACITY: usize = 256;

/// Fixed-capacity operand stack.
///
/// Storage is inline and never grows; a push onto a full stack fails and
/// leaves the contents untouched.
pub(super) struct OperandStack {
    slots: [f64; STACK_CAPACITY],
    len: usize,
}

impl OperandStack {
    pub(super) const fn new() -> Self {
        Self {
            slots: [0.0; STACK_CAPACITY],
            len: 0,
        }
    }

    pub(super) fn clear(&mut self) {
        self.len = 0;
    }

    /// Live values, bottom first.
    pub(super) fn as_slice(&self) -> &[f64] {
        &self.slots[..self.len]
    }

    pub(super) fn top(&self) -> Option<f64> {
        self.as_slice().last().copied()
    }

    /// Pushes `value`, or fails with [`VMError::StackOverflow`] when full.
    pub(super) fn push(
        &mut self,
        value: f64,
        instr: &'static str,
        offset: usize,
    ) -> Result<(), VMError> {
        let slot = self
            .slots
            .get_mut(self.len)
            .ok_or(VMError::StackOverflow {
                instruction: instr,
                offset,
                capacity: STACK_CAPACITY,
            })?;
        *slot = value;
        self.len += 1;
        Ok(())
    }

    /// Fails with [`VMError::StackUnderflow`] unless `count` values are present.
    pub(super) fn require(
        &self,
        count: usize,
        instr: &'static str,
        offset: usize,
    ) -> Result<(), VMError> {
        if self.len < count {
            return Err(VMError::StackUnderflow {
                instruction: instr,
                offset,
                required: count,
                available: self.len,
            });
        }
        Ok(())
    }

    pub(super) fn pop(&mut self, instr: &'static str, offset: usize) -> Result<f64, VMError> {
        self.require(1, instr, offset)?;
        self.len -= 1;
        Ok(self.slots[self.len])
    }

    /// Pops the two topmost values as `(a, b)` where `b` was on top.
    ///
    /// Nothing is popped when fewer than two values are present.
    pub(super) fn pop_pair(
        &mut self,
        instr: &'static str,
        offset: usize,
    ) -> Result<(f64, f64), VMError> {
        self.require(2, instr, offset)?;
        let b = self.slots[self.len - 1];
        let a = self.slots[self.len - 2];
        self.len -= 2;
        Ok((a, b))
    }
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
