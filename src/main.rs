//! Command-line front end for the condition VM and its helpers.
//!
//! # Usage
//! ```text
//! pidgeon <command> [ARGS] [OPTIONS]
//! ```
//!
//! # Commands
//! - `run <program> [values...]`: Execute bytecode (or `.asm` source) and print the verdict
//! - `disasm <program>`: Print the instruction listing and stack profile
//! - `merkle <items...>`: Print the Merkle root of the items
//! - `pow <prefix> <suffix>`: Search for a proof-of-work nonce
//! - `check-name <names...>`: Validate `.2pg` filenames
//!
//! Defaults come from the environment (see [`pidgeon::utils::config`]).

use pidgeon::core::pow::{PowError, find_proof_with_interrupt};
use pidgeon::core::validator::is_valid_filename;
use pidgeon::types::merkle_tree::MerkleTree;
use pidgeon::utils::config::{Config, parse_difficulty};
use pidgeon::utils::log;
use pidgeon::virtual_machine::assembler::assemble_file;
use pidgeon::{ExecLimits, Program, VMError, error, info, warn};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });
    log::set_level(config.log_level);

    let rest = &args[2..];
    let code = match args[1].as_str() {
        "run" => cmd_run(rest, &config),
        "disasm" => cmd_disasm(rest),
        "merkle" => cmd_merkle(rest),
        "pow" => cmd_pow(rest, &config).await,
        "check-name" => cmd_check_name(rest),
        other => {
            error!("Unknown command: {}\n", other);
            print_usage(&args[0]);
            1
        }
    };
    process::exit(code);
}

fn cmd_run(args: &[String], config: &Config) -> i32 {
    let mut path: Option<&str> = None;
    let mut values = Vec::new();
    let mut limits = config.limits;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--max-steps" | "-s") => {
                i += 1;
                let Some(raw) = args.get(i) else {
                    error!("{k} requires an argument");
                    return 1;
                };
                match raw.parse::<u64>() {
                    Ok(steps) => limits = ExecLimits::with_max_steps(steps),
                    Err(_) => {
                        error!("Invalid step budget: '{raw}' is not a non-negative integer");
                        return 1;
                    }
                }
            }
            arg if path.is_none() => path = Some(arg),
            arg => match arg.parse::<f64>() {
                Ok(v) => values.push(v),
                Err(_) => {
                    error!("Invalid variable value: '{arg}' is not a number");
                    return 1;
                }
            },
        }
        i += 1;
    }

    let Some(path) = path else {
        error!("run requires a program file");
        return 1;
    };
    let Some(program) = load_program(path) else {
        return 1;
    };

    match program.execute_with_limits(&values, &limits) {
        Ok(verdict) => {
            println!("{verdict}");
            0
        }
        Err(e) => {
            error!("Execution failed: {e}");
            2
        }
    }
}

fn cmd_disasm(args: &[String]) -> i32 {
    let [path] = args else {
        error!("disasm takes exactly one program file");
        return 1;
    };
    let Some(program) = load_program(path) else {
        return 1;
    };

    print!("{program}");
    match program.analyze() {
        Ok(profile) => {
            info!(
                "{} instructions, max stack depth {}, final depth {}",
                profile.instructions, profile.max_depth, profile.final_depth
            );
            0
        }
        Err(e) => {
            warn!("Program would fail: {e}");
            1
        }
    }
}

fn cmd_merkle(args: &[String]) -> i32 {
    println!("{}", MerkleTree::compute_root(args));
    0
}

async fn cmd_pow(args: &[String], config: &Config) -> i32 {
    let mut positional = Vec::new();
    let mut difficulty = config.difficulty;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--difficulty" | "-d") => {
                i += 1;
                let Some(raw) = args.get(i) else {
                    error!("{k} requires an argument");
                    return 1;
                };
                match parse_difficulty("--difficulty", raw) {
                    Ok(d) => difficulty = d,
                    Err(e) => {
                        error!("{e}");
                        return 1;
                    }
                }
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let [prefix, suffix] = match <[String; 2]>::try_from(positional) {
        Ok(pair) => pair,
        Err(_) => {
            error!("pow takes exactly <prefix> and <suffix>");
            return 1;
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let watcher = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::Relaxed);
            }
        })
    };

    info!("Searching for a nonce with difficulty {difficulty}");
    let search = {
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || {
            find_proof_with_interrupt(prefix, suffix, difficulty, &*stop)
        })
    };
    let result = search.await;
    watcher.abort();

    match result {
        Ok(Ok(Some(proof))) => {
            println!("{} {}", proof.nonce, proof.hash);
            0
        }
        Ok(Ok(None)) => {
            warn!("Nonce space exhausted without a proof");
            1
        }
        Ok(Err(e @ PowError::Interrupted { .. })) => {
            warn!("{e}");
            130
        }
        Ok(Err(e)) => {
            error!("{e}");
            1
        }
        Err(e) => {
            error!("Search task failed: {e}");
            1
        }
    }
}

fn cmd_check_name(args: &[String]) -> i32 {
    if args.is_empty() {
        error!("check-name requires at least one name");
        return 1;
    }
    let mut all_valid = true;
    for name in args {
        let valid = is_valid_filename(name);
        all_valid &= valid;
        println!("{name}: {}", if valid { "valid" } else { "invalid" });
    }
    if all_valid { 0 } else { 1 }
}

/// Reads raw bytecode, or assembles it first when the file ends in `.asm`.
fn load_program(path: &str) -> Option<Program> {
    if Path::new(path).extension().is_some_and(|ext| ext == "asm") {
        // Assembly failures are already reported with a source diagnostic.
        return match assemble_file(path) {
            Ok(program) => Some(program),
            Err(e @ VMError::IoError { .. }) => {
                error!("{e}");
                None
            }
            Err(_) => None,
        };
    }
    match fs::read(path) {
        Ok(bytes) => Some(Program::new(bytes)),
        Err(e) => {
            error!("Failed to read {path}: {e}");
            None
        }
    }
}

const USAGE: &str = "\
Pidgeon Condition VM

USAGE:
    {program} <command> [ARGS] [OPTIONS]

COMMANDS:
    run <program> [values...]   Execute a program and print true or false
        -s, --max-steps <n>     Abort after n instructions
    disasm <program>            Print the instruction listing and stack profile
    merkle <items...>           Print the Merkle root of the items (in order)
    pow <prefix> <suffix>       Find the smallest nonce meeting the difficulty
        -d, --difficulty <n>    Leading zero hex digits required (0-64)
    check-name <names...>       Check names against the <5 lowercase letters>.2pg pattern

    Programs ending in .asm are assembled first; anything else is read as bytecode.

OPTIONS:
    -h, --help    Print this help message

ENVIRONMENT:
    PIDGEON_DIFFICULTY    Default pow difficulty (defaults to 4)
    PIDGEON_MAX_STEPS     Default step budget for run (unbounded if unset)
    PIDGEON_LOG           Log level: debug, info, warn, error (defaults to info)

EXAMPLES:
    # Is variable 0 greater than 18?
    {program} run adult.asm 21

    {program} merkle alpha beta gamma
    {program} pow block- -tail -d 5
    {program} check-name abcde.2pg ABCDE.2pg
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
