use crate::virtual_machine::errors::VMError;

/// Resource bounds for one execution.
///
/// Every decoded instruction costs one step, `HALT` included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecLimits {
    /// Maximum number of instructions to execute; `None` is unbounded.
    pub max_steps: Option<u64>,
}

impl ExecLimits {
    /// No step budget.
    pub const fn unbounded() -> Self {
        Self { max_steps: None }
    }

    pub const fn with_max_steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }
}

/// Counts executed instructions against an [`ExecLimits`] budget.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct StepMeter {
    used: u64,
    limit: Option<u64>,
}

impl StepMeter {
    pub(super) fn new(limits: &ExecLimits) -> Self {
        Self {
            used: 0,
            limit: limits.max_steps,
        }
    }

    /// Charges one step. Fails once the budget is spent.
    #[inline(always)]
    pub(super) fn charge(&mut self) -> Result<(), VMError> {
        if let Some(limit) = self.limit {
            if self.used >= limit {
                return Err(VMError::StepLimitExceeded { limit });
            }
        }
        self.used = self.used.saturating_add(1);
        Ok(())
    }

    pub(super) fn used(&self) -> u64 {
        self.used
    }
}
