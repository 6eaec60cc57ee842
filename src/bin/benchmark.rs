use befunge::{Grid, VirtualMachine, VmConfig};
use std::io;
use std::time::{Duration, Instant};

const COUNTDOWN: &str = r#"
"d":*>1-:#v_$@
     ^    <
"#;

// allocates and drops one cell per iteration
const GARBAGE_LOOP: &str = r#"
"d":*>1-00c$:#v_$@
     ^        <
"#;

// builds a nine-cell list through tails and drops it, every iteration
const LIST_CHURN: &str = r#"
"d":*>1-01\c2\c3\c4\c5\c6\c7\c8\c9\c$:#v_$@
     ^                                 <
"#;

const ITERATIONS: u32 = 20;

fn run_program(grid: &Grid, heap_capacity: usize) -> Option<(Duration, usize)> {
    let config = VmConfig::default()
        .with_heap_capacity(heap_capacity)
        .with_max_steps(Some(100_000_000));
    let mut vm = VirtualMachine::with_config(grid.clone(), config);
    let mut sink = io::sink();
    let start = Instant::now();
    if let Err(e) = vm.run(&mut io::empty(), &mut sink) {
        eprintln!("  VM error: {:#}", e);
        return None;
    }
    Some((start.elapsed(), vm.gc.collections()))
}

fn benchmark(name: &str, source: &str, heap_capacity: usize) {
    println!("{}:", name);

    let source = source.strip_prefix('\n').unwrap_or(source);
    let grid = match Grid::parse(source.as_bytes()) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("  Load error: {:#}", e);
            return;
        }
    };

    let mut total_time = Duration::ZERO;
    let mut collections = 0;
    for _ in 0..ITERATIONS {
        match run_program(&grid, heap_capacity) {
            Some((elapsed, cycles)) => {
                total_time += elapsed;
                collections = cycles;
            }
            None => return,
        }
    }

    let per_iter = total_time.as_secs_f64() / ITERATIONS as f64 * 1000.0;
    println!("  VM:          {:.3}ms/iter", per_iter);
    println!("  Collections: {}/iter", collections);
    println!();
}

fn main() {
    println!("=== Befunge VM Performance ===");
    println!("({} iterations per benchmark)\n", ITERATIONS);

    benchmark("Countdown (10^4 loop)", COUNTDOWN, 1 << 10);
    benchmark("Garbage loop (heap of 64 cells)", GARBAGE_LOOP, 64);
    benchmark("List churn (heap of 32 cells)", LIST_CHURN, 32);
}
