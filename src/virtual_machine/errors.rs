use pidgeon_derive::Error;

/// Errors that can occur during VM execution or assembly.
///
/// Execution errors are fatal for the current run and carry the byte offset
/// of the instruction that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VMError {
    /// Bytecode ended in the middle of an instruction operand.
    #[error(
        "truncated program: opcode 0x{opcode:02x} at offset {offset} needs {requested} operand bytes, {available} available"
    )]
    TruncatedProgram {
        opcode: u8,
        offset: usize,
        requested: usize,
        available: usize,
    },
    /// A push would exceed the stack capacity.
    #[error("stack overflow: {instruction} at offset {offset} exceeds capacity {capacity}")]
    StackOverflow {
        instruction: &'static str,
        offset: usize,
        capacity: usize,
    },
    /// An operator needed more operands than the stack holds.
    #[error(
        "stack underflow: {instruction} at offset {offset} needs {required} operands, stack has {available}"
    )]
    StackUnderflow {
        instruction: &'static str,
        offset: usize,
        required: usize,
        available: usize,
    },
    /// LOAD referenced a variable slot that does not exist.
    #[error("variable index {index} out of range ({len} variables) at offset {offset}")]
    IndexOutOfRange {
        index: u8,
        len: usize,
        offset: usize,
    },
    /// DIV with a zero divisor.
    #[error("division by zero at offset {offset}")]
    DivisionByZero { offset: usize },
    /// Unknown opcode encountered in bytecode.
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    /// The step budget ran out before the program terminated.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Unrecognized instruction mnemonic during assembly.
    #[error("invalid instruction name: {name}")]
    InvalidInstructionName { name: String },
    /// Wrong number of operands for an instruction.
    #[error("{instruction} expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        instruction: String,
        expected: usize,
        actual: usize,
    },
    /// PUSH operand is not a number.
    #[error("invalid immediate '{token}'")]
    InvalidImmediate { token: String },
    /// LOAD operand is neither 0..=255 nor a name.
    #[error("invalid variable index '{token}'")]
    InvalidVariableIndex { token: String },
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },
    #[error("duplicate variable: {name}")]
    DuplicateVariable { name: String },
    /// `.var` declared more names than LOAD can address.
    #[error("too many variables: {name} would be slot {slot}")]
    TooManyVariables { name: String, slot: usize },
    /// Assembly error with source position.
    #[error("line {line}:{offset}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },
    /// File I/O error during assembly or loading.
    #[error("{path}: {source}")]
    IoError { path: String, source: String },
}

/// Fieldless discriminant of [`VMError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TruncatedProgram,
    StackOverflow,
    StackUnderflow,
    IndexOutOfRange,
    DivisionByZero,
    UnknownOpcode,
    StepLimitExceeded,
    Assembly,
    Io,
}

impl VMError {
    /// Returns the kind of failure without its diagnostic fields.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VMError::TruncatedProgram { .. } => ErrorKind::TruncatedProgram,
            VMError::StackOverflow { .. } => ErrorKind::StackOverflow,
            VMError::StackUnderflow { .. } => ErrorKind::StackUnderflow,
            VMError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            VMError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            VMError::UnknownOpcode { .. } => ErrorKind::UnknownOpcode,
            VMError::StepLimitExceeded { .. } => ErrorKind::StepLimitExceeded,
            VMError::InvalidInstructionName { .. }
            | VMError::ArityMismatch { .. }
            | VMError::InvalidImmediate { .. }
            | VMError::InvalidVariableIndex { .. }
            | VMError::UndefinedVariable { .. }
            | VMError::DuplicateVariable { .. }
            | VMError::TooManyVariables { .. }
            | VMError::AssemblyError { .. } => ErrorKind::Assembly,
            VMError::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Byte offset of the failing instruction, for execution errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            VMError::TruncatedProgram { offset, .. }
            | VMError::StackOverflow { offset, .. }
            | VMError::StackUnderflow { offset, .. }
            | VMError::IndexOutOfRange { offset, .. }
            | VMError::DivisionByZero { offset }
            | VMError::UnknownOpcode { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
