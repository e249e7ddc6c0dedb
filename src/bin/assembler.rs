//! Assembly to bytecode compiler CLI.
//!
//! Reads assembly source files and compiles them to condition VM bytecode.
//!
//! # Usage
//! ```text
//! pidgeon-asm <input.asm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.asm`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.bin`)
//! - `-l, --listing`: Print the disassembly and stack profile after compiling
//!
//! # Examples
//! ```text
//! pidgeon-asm rule.asm
//! pidgeon-asm rule.asm -o out/rule.bin
//! pidgeon-asm rule.asm -l
//! ```

use pidgeon::virtual_machine::assembler::assemble_file;
use pidgeon::{error, info, warn};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut listing = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--listing" | "-l" => {
                listing = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.bin", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    // The assembler has already printed a diagnostic for source errors.
    let program = assemble_file(input_path).unwrap_or_else(|_| process::exit(1));

    if let Err(e) = fs::write(&output_path, program.as_bytes()) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} bytes)",
        input_path,
        output_path,
        program.len()
    );

    match program.analyze() {
        Ok(profile) => {
            if listing {
                print!("{program}");
                println!(
                    "\n{} instructions, max stack depth {}, final depth {}",
                    profile.instructions, profile.max_depth, profile.final_depth
                );
            }
            if profile.final_depth == 0 {
                warn!("Program leaves the stack empty; its verdict is always false.");
            }
        }
        Err(e) => warn!("Program will fail at run time: {e}"),
    }
}

const USAGE: &str = "\
Condition VM Assembler

USAGE:
    {program} <input.asm> [OPTIONS]

ARGS:
    <input.asm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>   Output file path (defaults to <input>.bin)
    -l, --listing         Print the disassembly and stack profile
    -h, --help            Print this help message

EXAMPLES:
    # Compile to default output name
    {program} rule.asm

    # Compile with explicit output
    {program} rule.asm -o output.bin

    # Compile and show the listing
    {program} rule.asm -l
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
