//! VM and hashing benchmark binary.
//!
//! Measures execution time for representative condition programs, plus the
//! Merkle root and proof-of-work helpers.
//! Run with: `cargo run --release --bin bench`

use std::fmt::Write as _;
use std::hint::black_box;
use std::time::{Duration, Instant};

use pidgeon::core::pow::find_proof;
use pidgeon::types::merkle_tree::MerkleTree;
use pidgeon::virtual_machine::assembler::assemble_source;
use pidgeon::virtual_machine::vm::{ExecLimits, VM};

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    /// Instructions executed per run (None to omit column).
    steps: Option<u64>,
}

impl BenchResult {
    fn avg(&self) -> Duration {
        self.total / self.iterations as u32
    }

    fn print(&self) {
        let avg = self.avg();
        let ns_per_op = avg.as_nanos();
        let ns_per_instr = self
            .steps
            .filter(|&n| n > 0)
            .map(|n| format!("{:>8.1}", ns_per_op as f64 / n as f64))
            .unwrap_or_else(|| "       -".to_string());
        let steps = self
            .steps
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<30} {:>9} iters {:>10.3} us/iter {:>8} steps  {} ns/instr",
            self.name,
            self.iterations,
            ns_per_op as f64 / 1000.0,
            steps,
            ns_per_instr,
        );
    }
}

/// Runs `f` for at least `min_duration`, returning aggregated results.
///
/// `f` returns the number of VM steps it executed, or `None` when not
/// applicable.
fn bench<F>(name: &'static str, min_duration: Duration, mut f: F) -> BenchResult
where
    F: FnMut() -> Option<u64>,
{
    // Warmup
    for _ in 0..5 {
        f();
    }

    let mut iterations = 0u64;
    let mut steps = None;
    let start = Instant::now();
    while start.elapsed() < min_duration {
        steps = f();
        iterations += 1;
    }
    let total = start.elapsed();

    BenchResult {
        name,
        iterations,
        total,
        steps,
    }
}

/// Runs `program` once and returns the number of steps taken.
fn run_steps(program: &[u8], variables: &[f64]) -> Option<u64> {
    let mut vm = VM::new(program, variables);
    let verdict = vm.run(&ExecLimits::unbounded());
    black_box(verdict.ok());
    Some(vm.steps())
}

// ---------------------------------------------------------------------------
// Benchmark definitions
// ---------------------------------------------------------------------------

const ADULT_ASM: &str = r#"
.var age
    LOAD age
    PUSH 18
    GT
    HALT
"#;

const RANGE_ASM: &str = r#"
.var temperature
.var humidity
    LOAD temperature
    PUSH 10
    GT
    LOAD temperature
    PUSH 30
    LT
    AND
    LOAD humidity
    PUSH 80
    LT
    AND
    NOT
    NOT
"#;

/// `PUSH 1` followed by `n` repetitions of `PUSH 1; ADD`.
fn addition_chain(n: usize) -> String {
    let mut source = String::from("PUSH 1\n");
    for _ in 0..n {
        source.push_str("PUSH 1\nADD\n");
    }
    source
}

/// Fills the stack to capacity, then folds it with `MUL`.
fn deep_stack() -> String {
    let mut source = String::new();
    for i in 0..256 {
        let _ = writeln!(source, "PUSH {}", 1.0 + i as f64 / 1024.0);
    }
    for _ in 0..255 {
        source.push_str("MUL\n");
    }
    source
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let min = Duration::from_secs(2);

    println!("Benchmarks (each runs for >= 2s)\n");
    println!(
        "  {:<30} {:>9}       {:>14} {:>14}  {:>10}",
        "benchmark", "iters", "avg time", "steps/run", "ns/instr"
    );
    println!("  {}", "-".repeat(86));

    // Pre-assemble programs (assembly cost excluded from benchmark)
    let sources = [
        ("adult_check", ADULT_ASM.to_string()),
        ("range_check", RANGE_ASM.to_string()),
        ("add_chain(10K)", addition_chain(10_000)),
        ("deep_stack(256)", deep_stack()),
    ];
    let mut programs = Vec::with_capacity(sources.len());
    for (name, source) in &sources {
        match assemble_source(source) {
            Ok(program) => programs.push((*name, program)),
            Err(e) => {
                eprintln!("failed to assemble {name}: {e}");
                return;
            }
        }
    }

    let variables = [21.0, 55.0];

    // 1. VM programs
    for (name, program) in &programs {
        let r = bench(*name, min, || run_steps(program.as_bytes(), &variables));
        r.print();
    }

    // 2. Merkle roots
    let items: Vec<String> = (0..1000).map(|i| format!("tx-{i}")).collect();
    let r = bench("merkle_root(1000)", min, || {
        black_box(MerkleTree::compute_root(&items[..]));
        None
    });
    r.print();

    // 3. Proof of work at difficulty 3
    let r = bench("pow(difficulty 3)", min, || {
        black_box(find_proof("bench-prefix", "bench-suffix", 3).ok());
        None
    });
    r.print();

    println!();
}
