use anyhow::Result;
use befunge::{Grid, Value, VirtualMachine, VmConfig, GRID_HEIGHT};
use rustyline::{error::ReadlineError, Editor};
use std::io;
use tracing_subscriber::EnvFilter;

const STEP_LIMIT: u64 = 10_000_000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    println!(
        r"
Welcome to the Befunge REPL!
Each line you type becomes the next row of the program grid.
Commands: ':run' executes the grid, ':show' prints it, ':clear' resets it.
Enter 'exit' or press 'CTRL+C' to exit the REPL.
    "
    );

    let mut rl = Editor::<()>::new();
    if rl.load_history("history.txt").is_err() {
        println!("No previous history.");
    }

    let mut rows: Vec<String> = Vec::new();

    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => match line.as_ref() {
                "exit" => break,
                ":clear" => {
                    rows.clear();
                    println!("Grid cleared.");
                }
                ":show" => match Grid::parse(rows.join("\n").as_bytes()) {
                    Ok(grid) => print!("{}", grid),
                    Err(error) => eprintln!("Error loading: {}", error),
                },
                ":run" => {
                    let grid = match Grid::parse(rows.join("\n").as_bytes()) {
                        Ok(grid) => grid,
                        Err(error) => {
                            eprintln!("Error loading: {}", error);
                            continue;
                        }
                    };

                    let config = VmConfig::default().with_max_steps(Some(STEP_LIMIT));
                    let mut vm = VirtualMachine::with_config(grid, config);

                    let stdin = io::stdin();
                    let stdout = io::stdout();
                    let result = vm.run(&mut stdin.lock(), &mut stdout.lock());
                    println!();

                    if let Err(error) = result {
                        eprintln!("Error running: {}", error);
                    }
                    print_stack(&vm);
                }
                line => {
                    rl.add_history_entry(line);
                    if rows.len() == GRID_HEIGHT {
                        eprintln!("The grid already has {} rows.", GRID_HEIGHT);
                        continue;
                    }
                    rows.push(line.to_string());
                }
            },
            Err(ReadlineError::Interrupted) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history("history.txt")?;
    Ok(())
}

fn print_stack(vm: &VirtualMachine) {
    let stack = vm.gc.stack_snapshot();
    if stack.is_empty() {
        println!("stack: []");
        return;
    }

    let values = stack
        .iter()
        .map(|value| match value {
            Value::Integer(n) => n.to_string(),
            Value::Pointer(cell) => match vm.gc.dereference_head(*value) {
                Ok(head) => format!("({} . #{})", head, cell.index),
                Err(_) => format!("<stale #{}>", cell.index),
            },
        })
        .collect::<Vec<_>>();
    println!("stack: [{}]", values.join(", "));

    let stats = vm.gc.heap_stats();
    println!(
        "heap: {} live, {} free, {} collections",
        stats.live,
        stats.free,
        vm.gc.collections()
    );
}
