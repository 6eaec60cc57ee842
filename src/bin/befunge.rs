use std::{
    io::{self, Write},
    path::PathBuf,
    process,
};

use anyhow::{Context, Result};
use befunge::{Grid, VirtualMachine, VmConfig, VmError, DEFAULT_HEAP_CAPACITY, DEFAULT_STACK_CAPACITY};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "befunge")]
#[command(about = "Befunge-93 interpreter with garbage-collected cons cells")]
struct Cli {
    /// Program file, at most 25 lines of 80 columns
    file: PathBuf,

    /// Ignored; reported as a warning
    extra: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_STACK_CAPACITY)]
    stack_capacity: usize,

    #[arg(long, default_value_t = DEFAULT_HEAP_CAPACITY)]
    heap_capacity: usize,

    /// Fail after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the loaded grid before running it
    #[arg(long)]
    dump: bool,
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.extra.is_empty() {
        warn!(extra = ?cli.extra, "wrong number of arguments, one required");
        eprintln!(
            "Wrong number of arguments. One required, {} given.",
            cli.extra.len() + 1
        );
    }

    let grid = Grid::load(&cli.file)?;
    if cli.dump {
        print!("{}", grid);
    }

    let config = VmConfig::default()
        .with_stack_capacity(cli.stack_capacity)
        .with_heap_capacity(cli.heap_capacity)
        .with_max_steps(cli.max_steps);
    let mut vm = VirtualMachine::with_config(grid, config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    vm.run(&mut stdin.lock(), &mut stdout.lock())
        .with_context(|| format!("Runtime error in {}", cli.file.display()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        let _ = io::stdout().flush();
        eprintln!("Error: {:#}", error);
        let code = error
            .downcast_ref::<VmError>()
            .map(VmError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}
