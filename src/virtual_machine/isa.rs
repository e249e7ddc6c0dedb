//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction table and invokes a callback macro for code
//! generation, so the interpreter, the assembler and the static checks all
//! derive from one list.
//!
//! This module generates:
//! - The [`Instruction`] enum with opcode mappings and stack effects
//! - The [`Op`] enum: an instruction together with its decoded operand
//! - `TryFrom<u8>` for decoding opcodes
//!
//! # Bytecode Format
//!
//! Instructions are variable length and unaligned:
//! - Opcode: 1 byte
//! - `ImmF64`: 8 bytes, IEEE-754 double, little-endian
//! - `ImmU8`: 1 byte, variable table index

use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Invokes a callback macro with the complete instruction definition list.
///
/// Each entry reads `Name = opcode, "MNEMONIC" => [operands], pops -> pushes`.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Control
            // =========================
            /// HALT ; stop, the verdict is taken from the current stack
            Halt = 0x00, "HALT" => [], 0 -> 0,
            // =========================
            // Data
            // =========================
            /// PUSH imm ; push the immediate double
            Push = 0x01, "PUSH" => [value: ImmF64], 0 -> 1,
            /// LOAD idx ; push variables[idx]
            Load = 0x02, "LOAD" => [index: ImmU8], 0 -> 1,
            // =========================
            // Arithmetic
            // =========================
            /// ADD ; b = pop, a = pop, push a + b
            Add = 0x10, "ADD" => [], 2 -> 1,
            /// SUB ; b = pop, a = pop, push a - b
            Sub = 0x11, "SUB" => [], 2 -> 1,
            /// MUL ; b = pop, a = pop, push a * b
            Mul = 0x12, "MUL" => [], 2 -> 1,
            /// DIV ; b = pop, a = pop, push a / b (trap when b == 0)
            Div = 0x13, "DIV" => [], 2 -> 1,
            // =========================
            // Comparison
            // =========================
            /// EQ ; push 1.0 if a == b else 0.0
            Eq = 0x20, "EQ" => [], 2 -> 1,
            /// GT ; push 1.0 if a > b else 0.0
            Gt = 0x21, "GT" => [], 2 -> 1,
            /// LT ; push 1.0 if a < b else 0.0
            Lt = 0x22, "LT" => [], 2 -> 1,
            // =========================
            // Logic (non-zero is true)
            // =========================
            /// AND ; push 1.0 if a != 0 and b != 0 else 0.0
            And = 0x30, "AND" => [], 2 -> 1,
            /// OR ; push 1.0 if a != 0 or b != 0 else 0.0
            Or = 0x31, "OR" => [], 2 -> 1,
            /// NOT ; a = pop, push 1.0 if a == 0 else 0.0
            Not = 0x32, "NOT" => [], 1 -> 1,
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], $pops:literal -> $pushes:literal
        ),* $(,)?
    ) => {
        // =========================
        // Opcode enum
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Instruction {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::UnknownOpcode {
                        opcode: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl Instruction {
            /// Every instruction in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Number of stack values consumed.
            pub const fn pops(&self) -> usize {
                match self {
                    $( Instruction::$name => $pops, )*
                }
            }

            /// Number of stack values produced.
            pub const fn pushes(&self) -> usize {
                match self {
                    $( Instruction::$name => $pushes, )*
                }
            }

            /// Operand bytes following the opcode.
            pub const fn operand_size(&self) -> usize {
                match self {
                    $( Instruction::$name => 0usize $( + define_instructions!(@size $kind) )*, )*
                }
            }

            /// Encoded size including the opcode byte.
            pub const fn size(&self) -> usize {
                1 + self.operand_size()
            }
        }

        // =========================
        // Decoded instruction
        // =========================
        /// An instruction together with its operand.
        #[derive(Copy, Clone, Debug, PartialEq)]
        pub enum Op {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_instructions!(@ty $kind) ),*
                },
            )*
        }

        impl Op {
            /// Returns the opcode-level instruction.
            pub const fn instruction(&self) -> Instruction {
                match self {
                    $( Op::$name { .. } => Instruction::$name, )*
                }
            }

            /// Appends the encoded instruction to `out`.
            pub fn encode(&self, out: &mut Vec<u8>) {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Op::$name { $( $field ),* } => {
                            out.push($opcode);
                            $( define_instructions!(@emit out, $kind, $field); )*
                        }
                    ),*
                }
            }

            /// Reads the operands of `instr`, whose opcode byte sits at `offset`.
            ///
            /// Returns the decoded op and the offset of the next instruction.
            pub fn read(instr: Instruction, data: &[u8], offset: usize) -> Result<(Op, usize), VMError> {
                #[allow(unused_mut)]
                let mut cursor = offset + 1;
                match instr {
                    $(
                        Instruction::$name => {
                            $(
                                let $field = define_instructions!(@read data, cursor, $kind, $opcode, offset)?;
                            )*
                            Ok((Op::$name { $( $field ),* }, cursor))
                        }
                    ),*
                }
            }
        }

        impl fmt::Display for Op {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Op::$name { $( $field ),* } => {
                            f.write_str($mnemonic)?;
                            $( define_instructions!(@fmt f, $kind, $field)?; )*
                            Ok(())
                        }
                    ),*
                }
            }
        }
    };

    // ---------- types ----------
    (@ty ImmF64) => { f64 };
    (@ty ImmU8)  => { u8 };

    // ---------- sizes ----------
    (@size ImmF64) => { 8usize };
    (@size ImmU8)  => { 1usize };

    // ---------- encoding ----------
    (@emit $out:ident, ImmF64, $v:ident) => {
        $out.extend_from_slice(&$v.to_le_bytes());
    };

    (@emit $out:ident, ImmU8, $v:ident) => {
        $out.push(*$v);
    };

    // ---------- decoding ----------
    (@read $data:ident, $cursor:ident, ImmF64, $opcode:expr, $offset:ident) => {
        read_operand::<8>($data, $opcode, $offset, &mut $cursor).map(f64::from_le_bytes)
    };

    (@read $data:ident, $cursor:ident, ImmU8, $opcode:expr, $offset:ident) => {
        read_operand::<1>($data, $opcode, $offset, &mut $cursor).map(|[b]| b)
    };

    // ---------- formatting ----------
    (@fmt $f:ident, ImmF64, $v:ident) => {
        write!($f, " {:?}", $v)
    };

    (@fmt $f:ident, ImmU8, $v:ident) => {
        write!($f, " {}", $v)
    };
}

/// Reads an `N`-byte operand at `cursor`, failing with
/// [`VMError::TruncatedProgram`] when fewer bytes remain.
fn read_operand<const N: usize>(
    data: &[u8],
    opcode: u8,
    offset: usize,
    cursor: &mut usize,
) -> Result<[u8; N], VMError> {
    let start = *cursor;
    let bytes = data
        .get(start..)
        .and_then(|rest| rest.first_chunk::<N>())
        .ok_or(VMError::TruncatedProgram {
            opcode,
            offset,
            requested: N,
            available: data.len().saturating_sub(start),
        })?;
    *cursor = start + N;
    Ok(*bytes)
}

for_each_instruction!(define_instructions);

impl Op {
    /// Decodes the instruction starting at `offset`.
    ///
    /// `offset` must be inside `data`; unknown opcodes and truncated operands
    /// are reported with that offset.
    pub fn decode(data: &[u8], offset: usize) -> Result<(Op, usize), VMError> {
        let opcode = data.get(offset).copied().ok_or(VMError::TruncatedProgram {
            opcode: 0,
            offset,
            requested: 1,
            available: 0,
        })?;
        let instr = Instruction::try_from(opcode)
            .map_err(|_| VMError::UnknownOpcode { opcode, offset })?;
        Op::read(instr, data, offset)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
