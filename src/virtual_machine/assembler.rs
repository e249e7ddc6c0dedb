//! Assembly language parser and bytecode compiler.
//!
//! Converts human-readable assembly source into a [`Program`]. Uses
//! [`for_each_instruction!`](crate::for_each_instruction) to generate the
//! mnemonic lookup and per-instruction operand parsing.
//!
//! # Syntax
//!
//! ```text
//! .var age                # bind the next variable slot to a name
//! LOAD age                # or LOAD 0
//! PUSH 18                 # decimal, 1e3, -0.5, true, false, inf, nan
//! GT
//! HALT
//! ```
//!
//! - Instructions are uppercase, one per line
//! - Comments start with `#`
//! - Commas between operands are optional
//! - `.var` names are bound to slots 0, 1, 2, ... in declaration order and
//!   may be used before their declaration

use crate::error;
use crate::for_each_instruction;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Op};
use crate::virtual_machine::program::Program;
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const VAR_DIRECTIVE: &str = ".var";
/// `LOAD` addresses one byte worth of slots.
const MAX_VARIABLES: usize = u8::MAX as usize + 1;

/// Return the line/column/message triple for assembly-related errors.
fn assembly_error_location(err: &VMError) -> Option<(usize, usize, String)> {
    match err {
        VMError::AssemblyError {
            line,
            offset,
            source,
        } => Some((*line, *offset, source.clone())),
        _ => None,
    }
}

/// Formats a compiler-style diagnostic for assembly failures.
pub fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "     | {}^", underline);
    }

    diag
}

/// Logs a diagnostic for an assembly error.
fn log_assembly_error(file: &str, source: &str, err: &VMError) {
    if let Some((line, offset, message)) = assembly_error_location(err) {
        error!(
            "{}",
            render_assembly_diagnostic(file, source, line, offset, &message)
        );
    } else {
        error!("{err}");
    }
}

/// Assembly context for variable name binding.
///
/// Names are assigned consecutive slots in the order they are declared.
#[derive(Debug, Default)]
pub struct AsmContext {
    variables: HashMap<String, u8>,
}

impl AsmContext {
    /// Creates an empty assembly context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to the next free slot and returns it.
    pub(crate) fn declare_variable(&mut self, name: &str) -> Result<u8, VMError> {
        if self.variables.contains_key(name) {
            return Err(VMError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        let slot = self.variables.len();
        let index = u8::try_from(slot).map_err(|_| VMError::TooManyVariables {
            name: name.to_string(),
            slot,
        })?;
        self.variables.insert(name.to_string(), index);
        Ok(index)
    }

    /// Resolves a declared name to its slot.
    pub(crate) fn resolve_variable(&self, name: &str) -> Result<u8, VMError> {
        self.variables
            .get(name)
            .copied()
            .ok_or(VMError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - commas are ignored
/// - whitespace-separated tokens
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut out = Vec::with_capacity(4);
    let mut start: Option<usize> = None;

    for (i, c) in line.char_indices() {
        if c == COMMENT_CHAR {
            break;
        }
        if c == ',' || c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push(Token {
                    text: &line[s..i],
                    offset: s + 1,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(s) = start {
        let end = line.find(COMMENT_CHAR).unwrap_or(line.len());
        out.push(Token {
            text: line[s..end].trim_end(),
            offset: s + 1,
        });
    }

    out
}

/// Parse a PUSH immediate.
///
/// Accepts anything `f64::from_str` does (`1`, `-2.5`, `1e3`, `inf`, `nan`)
/// plus the literals `true` and `false`.
pub(crate) fn parse_f64(tok: &str) -> Result<f64, VMError> {
    match tok {
        "true" => Ok(1.0),
        "false" => Ok(0.0),
        _ => tok.parse::<f64>().map_err(|_| VMError::InvalidImmediate {
            token: tok.to_string(),
        }),
    }
}

/// Parse a LOAD operand: a slot number 0..=255 or a declared variable name.
pub(crate) fn parse_index(tok: &str, ctx: &AsmContext) -> Result<u8, VMError> {
    if let Ok(index) = tok.parse::<u8>() {
        return Ok(index);
    }
    if is_identifier(tok) {
        return ctx.resolve_variable(tok);
    }
    Err(VMError::InvalidVariableIndex {
        token: tok.to_string(),
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(tok: &str) -> bool {
    let mut chars = tok.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

macro_rules! define_parse_instruction {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], $pops:literal -> $pushes:literal
        ),* $(,)?
    ) => {
        fn instruction_from_str(name: &str) -> Result<Instruction, VMError> {
            match name {
                $( $mnemonic => Ok(Instruction::$name), )*
                _ => Err(VMError::InvalidInstructionName {
                    name: name.to_string(),
                }),
            }
        }

        /// Parse one instruction from tokens into an [`Op`].
        fn parse_instruction(ctx: &AsmContext, tokens: &[Token]) -> Result<Op, VMError> {
            let Some(head) = tokens.first() else {
                return Err(VMError::ArityMismatch {
                    instruction: "<missing opcode>".to_string(),
                    expected: 1,
                    actual: 0,
                });
            };

            let instr = instruction_from_str(head.text)?;
            let operands = &tokens[1..];

            match instr {
                $(
                    Instruction::$name => {
                        const EXPECTED: usize = define_parse_instruction!(@count $( $field ),*);
                        if operands.len() != EXPECTED {
                            return Err(VMError::ArityMismatch {
                                instruction: head.text.to_string(),
                                expected: EXPECTED,
                                actual: operands.len(),
                            });
                        }

                        define_parse_instruction!(@construct ctx operands head; $name $( $field : $kind ),*)
                    }
                ),*
            }
        }
    };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_parse_instruction!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };

    // ---------- parsing ----------
    (@construct $ctx:ident $operands:ident $head:ident; $name:ident) => {
        Ok(Op::$name {})
    };

    (@construct $ctx:ident $operands:ident $head:ident; $name:ident $( $field:ident : $kind:ident ),+ ) => {{
        let mut it = $operands.iter();
        Ok(Op::$name {
            $(
                $field: {
                    let tok = it.next().ok_or_else(|| VMError::ArityMismatch {
                        instruction: $head.text.to_string(),
                        expected: $operands.len() + 1,
                        actual: $operands.len(),
                    })?;
                    define_parse_instruction!(@parse_operand $kind, tok, $ctx)?
                },
            )*
        })
    }};

    (@parse_operand ImmF64, $tok:expr, $ctx:expr) => {
        parse_f64($tok.text)
    };

    (@parse_operand ImmU8, $tok:expr, $ctx:expr) => {
        parse_index($tok.text, $ctx)
    };
}

for_each_instruction!(define_parse_instruction);

/// Wraps `err` with the source position of `tok`.
fn at(line_no: usize, tok: &Token, err: VMError) -> VMError {
    VMError::AssemblyError {
        line: line_no,
        offset: tok.offset,
        source: err.to_string(),
    }
}

/// Performs two-pass assembly.
///
/// Pass 1: tokenizes all lines and binds `.var` names to slots.
///
/// Pass 2: parses instructions with name resolution and emits bytecode.
fn assemble_lines(source: &str) -> Result<Program, VMError> {
    let mut ctx = AsmContext::new();
    let mut parsed_lines: Vec<(usize, Vec<Token>)> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let tokens = tokenize(line);
        let Some(head) = tokens.first() else {
            continue;
        };

        if head.text == VAR_DIRECTIVE {
            let [_, name] = tokens.as_slice() else {
                return Err(at(
                    line_no,
                    head,
                    VMError::ArityMismatch {
                        instruction: VAR_DIRECTIVE.to_string(),
                        expected: 1,
                        actual: tokens.len() - 1,
                    },
                ));
            };
            if !is_identifier(name.text) {
                return Err(at(
                    line_no,
                    name,
                    VMError::InvalidVariableIndex {
                        token: name.text.to_string(),
                    },
                ));
            }
            ctx.declare_variable(name.text)
                .map_err(|e| at(line_no, name, e))?;
            continue;
        }

        parsed_lines.push((line_no, tokens));
    }

    let mut bytecode = Vec::new();
    for (line_no, tokens) in &parsed_lines {
        let op = parse_instruction(&ctx, tokens).map_err(|e| {
            // Point at the offending operand when there is exactly one.
            let tok = match &e {
                VMError::InvalidImmediate { .. }
                | VMError::InvalidVariableIndex { .. }
                | VMError::UndefinedVariable { .. } => tokens.get(1).unwrap_or(&tokens[0]),
                _ => &tokens[0],
            };
            at(*line_no, tok, e)
        })?;
        op.encode(&mut bytecode);
    }

    Ok(Program::new(bytecode))
}

/// Assemble a full source string into bytecode.
pub fn assemble_source(source: &str) -> Result<Program, VMError> {
    assemble_source_with_name(source, "<source>")
}

/// Assembles source with an associated filename for error diagnostics.
///
/// Logs a compiler-style diagnostic on failure.
pub fn assemble_source_with_name(source: &str, source_name: &str) -> Result<Program, VMError> {
    let result = assemble_lines(source);
    if let Err(err) = &result {
        log_assembly_error(source_name, source, err);
    }
    result
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        source: e.to_string(),
    })?;
    assemble_source_with_name(&source, &path_ref.display().to_string())
}
