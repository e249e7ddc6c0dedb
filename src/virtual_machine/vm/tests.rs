use super::*;
use crate::virtual_machine::assembler::assemble_source;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::{Program, ProgramBuilder};

const NO_VARS: [f64; 0] = [];

fn run(program: &Program, vars: &[f64]) -> Result<bool, VMError> {
    execute(program.as_bytes(), vars)
}

fn run_asm(source: &str, vars: &[f64]) -> Result<bool, VMError> {
    let program = assemble_source(source).expect("assembly failed");
    run(&program, vars)
}

/// Runs `source` and returns the final stack.
fn stack_after(source: &str, vars: &[f64]) -> Vec<f64> {
    let program = assemble_source(source).expect("assembly failed");
    let mut vm = VM::new(program.as_bytes(), vars);
    vm.run(&ExecLimits::default()).expect("vm run failed");
    vm.stack().to_vec()
}

fn top(source: &str) -> f64 {
    *stack_after(source, &NO_VARS)
        .last()
        .expect("empty stack")
}

fn binary(a: f64, b: f64, instr: Instruction) -> ProgramBuilder {
    ProgramBuilder::new().push(a).push(b).op(instr)
}

// ==================== Termination and verdict ====================

#[test]
fn empty_program_is_false() {
    assert_eq!(execute(&[], &NO_VARS), Ok(false));
}

#[test]
fn push_zero_halt_is_false() {
    let program = ProgramBuilder::new().push(0.0).halt().build();
    assert_eq!(run(&program, &[]), Ok(false));
}

#[test]
fn push_one_halt_is_true() {
    let program = ProgramBuilder::new().push(1.0).halt().build();
    assert_eq!(run(&program, &[]), Ok(true));
}

#[test]
fn end_of_program_terminates_like_halt() {
    let program = ProgramBuilder::new().push(3.0).push(4.0).op(Instruction::Add).build();
    assert_eq!(run(&program, &[]), Ok(true));
}

#[test]
fn lone_halt_is_false() {
    assert_eq!(execute(&[0x00], &NO_VARS), Ok(false));
}

#[test]
fn only_top_of_stack_decides() {
    assert_eq!(run_asm("PUSH 1\nPUSH 0", &[]), Ok(false));
    assert_eq!(run_asm("PUSH 0\nPUSH 2", &[]), Ok(true));
}

#[test]
fn negative_zero_is_false() {
    let program = ProgramBuilder::new().push(-0.0).build();
    assert_eq!(run(&program, &[]), Ok(false));
}

#[test]
fn nan_and_infinity_are_true() {
    assert_eq!(run_asm("PUSH nan", &[]), Ok(true));
    assert_eq!(run_asm("PUSH -inf", &[]), Ok(true));
}

#[test]
fn negative_values_are_true() {
    assert_eq!(run_asm("PUSH -0.001", &[]), Ok(true));
}

#[test]
fn bytes_after_halt_are_never_decoded() {
    let program = ProgramBuilder::new()
        .push(1.0)
        .halt()
        .raw(&[0xff, 0x01, 0x02])
        .build();
    assert_eq!(run(&program, &[]), Ok(true));

    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    vm.run(&ExecLimits::default()).unwrap();
    assert_eq!(vm.ip(), 10);
    assert_eq!(vm.steps(), 2);
}

#[test]
fn execution_is_idempotent() {
    let program = assemble_source(".var x\nLOAD x\nPUSH 2\nMUL\nPUSH 10\nGT").unwrap();
    let vars = [6.0];
    let first = run(&program, &vars);
    for _ in 0..5 {
        assert_eq!(run(&program, &vars), first);
    }
    assert_eq!(first, Ok(true));
}

#[test]
fn vm_run_can_be_repeated() {
    let program = ProgramBuilder::new().push(2.0).push(2.0).op(Instruction::Eq).build();
    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    assert_eq!(vm.run(&ExecLimits::default()), Ok(true));
    assert_eq!(vm.run(&ExecLimits::default()), Ok(true));
    assert_eq!(vm.stack(), &[1.0]);
}

// ==================== Arithmetic ====================

#[test]
fn add() {
    assert_eq!(top("PUSH 3\nPUSH 4\nADD"), 7.0);
}

#[test]
fn sub_uses_second_popped_as_left_operand() {
    assert_eq!(top("PUSH 10\nPUSH 4\nSUB"), 6.0);
    assert_eq!(top("PUSH 4\nPUSH 10\nSUB"), -6.0);
}

#[test]
fn mul() {
    assert_eq!(top("PUSH -2.5\nPUSH 4\nMUL"), -10.0);
}

#[test]
fn div() {
    assert_eq!(top("PUSH 1\nPUSH 4\nDIV"), 0.25);
}

#[test]
fn div_by_zero() {
    let program = ProgramBuilder::new().push(5.0).push(0.0).op(Instruction::Div).build();
    assert_eq!(
        run(&program, &[]),
        Err(VMError::DivisionByZero { offset: 18 })
    );
}

#[test]
fn div_by_negative_zero() {
    let program = binary(5.0, -0.0, Instruction::Div).build();
    assert!(matches!(
        run(&program, &[]),
        Err(VMError::DivisionByZero { .. })
    ));
}

#[test]
fn div_by_zero_leaves_operands_on_stack() {
    let program = binary(5.0, 0.0, Instruction::Div).build();
    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    assert!(vm.run(&ExecLimits::default()).is_err());
    assert_eq!(vm.stack(), &[5.0, 0.0]);
    assert_eq!(vm.ip(), 18);
}

#[test]
fn zero_dividend_is_fine() {
    assert_eq!(top("PUSH 0\nPUSH 3\nDIV"), 0.0);
}

#[test]
fn arithmetic_follows_ieee() {
    assert_eq!(top("PUSH inf\nPUSH 1\nADD"), f64::INFINITY);
    assert!(top("PUSH inf\nPUSH inf\nSUB").is_nan());
    assert!(top("PUSH nan\nPUSH 2\nDIV").is_nan());
    assert_eq!(top("PUSH 1e308\nPUSH 10\nMUL"), f64::INFINITY);
}

// ==================== Comparison and logic ====================

#[test]
fn comparisons() {
    let cases = [
        (Instruction::Eq, 2.0, 2.0, 1.0),
        (Instruction::Eq, 2.0, 3.0, 0.0),
        (Instruction::Gt, 3.0, 2.0, 1.0),
        (Instruction::Gt, 2.0, 3.0, 0.0),
        (Instruction::Gt, 2.0, 2.0, 0.0),
        (Instruction::Lt, 2.0, 3.0, 1.0),
        (Instruction::Lt, 3.0, 2.0, 0.0),
    ];
    for (instr, a, b, expected) in cases {
        let program = binary(a, b, instr).build();
        let mut vm = VM::new(program.as_bytes(), &NO_VARS);
        vm.run(&ExecLimits::default()).unwrap();
        assert_eq!(vm.stack(), &[expected], "{instr} {a} {b}");
    }
}

#[test]
fn comparisons_with_nan_are_false() {
    assert_eq!(top("PUSH nan\nPUSH nan\nEQ"), 0.0);
    assert_eq!(top("PUSH nan\nPUSH 1\nGT"), 0.0);
    assert_eq!(top("PUSH nan\nPUSH 1\nLT"), 0.0);
}

#[test]
fn negative_zero_equals_zero() {
    assert_eq!(top("PUSH -0.0\nPUSH 0\nEQ"), 1.0);
}

#[test]
fn and_or_treat_nonzero_as_true() {
    assert_eq!(top("PUSH 2\nPUSH -3\nAND"), 1.0);
    assert_eq!(top("PUSH 2\nPUSH 0\nAND"), 0.0);
    assert_eq!(top("PUSH 0\nPUSH 0\nOR"), 0.0);
    assert_eq!(top("PUSH 0\nPUSH 0.5\nOR"), 1.0);
    assert_eq!(top("PUSH nan\nPUSH 1\nAND"), 1.0);
}

#[test]
fn not() {
    assert_eq!(top("PUSH 0\nNOT"), 1.0);
    assert_eq!(top("PUSH -0.0\nNOT"), 1.0);
    assert_eq!(top("PUSH 7\nNOT"), 0.0);
    assert_eq!(top("PUSH nan\nNOT"), 0.0);
}

#[test]
fn results_are_exactly_one_or_zero() {
    for source in ["PUSH 5\nPUSH 9\nLT", "PUSH 5\nPUSH 9\nOR", "PUSH 5\nNOT"] {
        let value = top(source);
        assert!(value == 1.0 || value == 0.0, "{source}: {value}");
    }
}

// ==================== Variables ====================

#[test]
fn load_pushes_variable() {
    assert_eq!(stack_after("LOAD 1\nLOAD 0", &[4.0, 9.0]), [9.0, 4.0]);
}

#[test]
fn load_out_of_range() {
    let program = ProgramBuilder::new().load(0).build();
    assert_eq!(
        run(&program, &[]),
        Err(VMError::IndexOutOfRange {
            index: 0,
            len: 0,
            offset: 0
        })
    );

    let program = ProgramBuilder::new().push(1.0).load(3).build();
    assert_eq!(
        run(&program, &[1.0, 2.0, 3.0]),
        Err(VMError::IndexOutOfRange {
            index: 3,
            len: 3,
            offset: 9
        })
    );
}

#[test]
fn load_reads_any_widening_input() {
    let program = assemble_source("LOAD 0\nLOAD 1\nADD\nPUSH 300\nEQ").unwrap();
    assert_eq!(execute(program.as_bytes(), &[100i32, 200]), Ok(true));
    assert_eq!(execute(program.as_bytes(), &vec![100u8, 200]), Ok(true));
    assert_eq!(execute(program.as_bytes(), &[100.0f32, 199.0][..]), Ok(false));
}

#[test]
fn age_threshold_rule() {
    let program = assemble_source(
        ".var age\n\
         .var income\n\
         LOAD age\n\
         PUSH 18\n\
         GT\n\
         LOAD income\n\
         PUSH 30000\n\
         GT\n\
         AND\n\
         HALT",
    )
    .unwrap();
    assert_eq!(run(&program, &[25.0, 45000.0]), Ok(true));
    assert_eq!(run(&program, &[17.0, 45000.0]), Ok(false));
    assert_eq!(run(&program, &[25.0, 20000.0]), Ok(false));
}

// ==================== Stack discipline ====================

#[test]
fn stack_overflow_on_257th_push() {
    let mut builder = ProgramBuilder::new();
    for i in 0..=STACK_CAPACITY {
        builder = builder.push(i as f64);
    }
    let program = builder.build();

    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    assert_eq!(
        vm.run(&ExecLimits::default()),
        Err(VMError::StackOverflow {
            instruction: "PUSH",
            offset: STACK_CAPACITY * 9,
            capacity: STACK_CAPACITY,
        })
    );
    assert_eq!(vm.stack().len(), STACK_CAPACITY);
    assert_eq!(vm.stack().last(), Some(&255.0));
}

#[test]
fn full_stack_is_allowed() {
    let mut builder = ProgramBuilder::new();
    for _ in 0..STACK_CAPACITY {
        builder = builder.push(1.0);
    }
    assert_eq!(run(&builder.build(), &[]), Ok(true));
}

#[test]
fn binary_on_full_stack_does_not_overflow() {
    let mut builder = ProgramBuilder::new();
    for _ in 0..STACK_CAPACITY {
        builder = builder.push(1.0);
    }
    let program = builder.op(Instruction::Add).build();
    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    assert_eq!(vm.run(&ExecLimits::default()), Ok(true));
    assert_eq!(vm.stack().len(), STACK_CAPACITY - 1);
    assert_eq!(vm.stack().last(), Some(&2.0));
}

#[test]
fn underflow_on_empty_stack() {
    assert_eq!(
        execute(&[Instruction::Add as u8], &NO_VARS),
        Err(VMError::StackUnderflow {
            instruction: "ADD",
            offset: 0,
            required: 2,
            available: 0,
        })
    );
}

#[test]
fn underflow_names_each_operator() {
    for instr in Instruction::ALL {
        if instr.pops() == 0 {
            continue;
        }
        let program = ProgramBuilder::new().op(*instr).build();
        match run(&program, &[]) {
            Err(VMError::StackUnderflow {
                instruction,
                required,
                ..
            }) => {
                assert_eq!(instruction, instr.mnemonic());
                assert_eq!(required, instr.pops());
            }
            other => panic!("{instr}: unexpected {other:?}"),
        }
    }
}

#[test]
fn binary_with_one_operand_underflows() {
    assert!(matches!(
        run_asm("PUSH 1\nSUB", &[]),
        Err(VMError::StackUnderflow {
            available: 1,
            offset: 9,
            ..
        })
    ));
}

#[test]
fn underflow_is_reported_before_division_by_zero() {
    let program = ProgramBuilder::new().push(0.0).op(Instruction::Div).build();
    assert!(matches!(
        run(&program, &[]),
        Err(VMError::StackUnderflow {
            instruction: "DIV",
            ..
        })
    ));
}

// ==================== Malformed programs ====================

#[test]
fn unknown_opcode_at_start() {
    assert_eq!(
        execute(&[0xff], &NO_VARS),
        Err(VMError::UnknownOpcode {
            opcode: 0xff,
            offset: 0
        })
    );
}

#[test]
fn unknown_opcode_after_valid_instruction() {
    let program = ProgramBuilder::new().push(1.0).raw(&[0x03]).build();
    assert_eq!(
        run(&program, &[]),
        Err(VMError::UnknownOpcode {
            opcode: 0x03,
            offset: 9
        })
    );
}

#[test]
fn truncated_push() {
    let mut code = vec![0x01];
    code.extend_from_slice(&[0u8; 7]);
    assert_eq!(
        execute(&code, &NO_VARS),
        Err(VMError::TruncatedProgram {
            opcode: 0x01,
            offset: 0,
            requested: 8,
            available: 7,
        })
    );
}

#[test]
fn truncated_load_is_reported_before_index() {
    assert_eq!(
        execute(&[0x02], &NO_VARS),
        Err(VMError::TruncatedProgram {
            opcode: 0x02,
            offset: 0,
            requested: 1,
            available: 0,
        })
    );
}

#[test]
fn truncation_leaves_stack_untouched() {
    let program = ProgramBuilder::new().push(4.0).raw(&[0x01, 0x00]).build();
    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    assert!(matches!(
        vm.run(&ExecLimits::default()),
        Err(VMError::TruncatedProgram { offset: 9, .. })
    ));
    assert_eq!(vm.stack(), &[4.0]);
}

#[test]
fn load_index_checked_before_overflow() {
    let mut builder = ProgramBuilder::new();
    for _ in 0..STACK_CAPACITY {
        builder = builder.push(0.0);
    }
    let out_of_range = builder.clone().load(5).build();
    assert!(matches!(
        run(&out_of_range, &[1.0]),
        Err(VMError::IndexOutOfRange { index: 5, .. })
    ));

    let in_range = builder.load(0).build();
    assert!(matches!(
        run(&in_range, &[1.0]),
        Err(VMError::StackOverflow {
            instruction: "LOAD",
            ..
        })
    ));
}

// ==================== Step budget ====================

#[test]
fn steps_count_every_instruction_including_halt() {
    let program = ProgramBuilder::new()
        .push(1.0)
        .push(2.0)
        .op(Instruction::Add)
        .halt()
        .build();
    let mut vm = VM::new(program.as_bytes(), &NO_VARS);
    vm.run(&ExecLimits::default()).unwrap();
    assert_eq!(vm.steps(), 4);

    assert_eq!(
        execute_with_limits(program.as_bytes(), &NO_VARS, &ExecLimits::with_max_steps(4)),
        Ok(true)
    );
    assert_eq!(
        execute_with_limits(program.as_bytes(), &NO_VARS, &ExecLimits::with_max_steps(3)),
        Err(VMError::StepLimitExceeded { limit: 3 })
    );
}

#[test]
fn zero_step_budget_only_allows_empty_program() {
    let limits = ExecLimits::with_max_steps(0);
    assert_eq!(execute_with_limits(&[], &NO_VARS, &limits), Ok(false));
    assert_eq!(
        execute_with_limits(&[0x00], &NO_VARS, &limits),
        Err(VMError::StepLimitExceeded { limit: 0 })
    );
}

#[test]
fn step_budget_is_checked_before_decoding() {
    let program = ProgramBuilder::new().push(1.0).raw(&[0xff]).build();
    assert_eq!(
        program.execute_with_limits(&NO_VARS, &ExecLimits::with_max_steps(1)),
        Err(VMError::StepLimitExceeded { limit: 1 })
    );
}

// ==================== Concurrency ====================

#[test]
fn independent_executions_in_parallel() {
    let program = assemble_source(".var x\nLOAD x\nPUSH 50\nLT").unwrap();
    let bytes = program.as_bytes();

    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                scope.spawn(move || {
                    let vars = [i as f64 * 10.0];
                    execute(bytes, &vars).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(
        results,
        [true, true, true, true, true, false, false, false]
    );
}
