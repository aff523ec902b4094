use anyhow::{Context, Result};
use clap::Parser;
use key_vault::{CLIArgs, Solver};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = CLIArgs::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let maze = key_vault::read_maze(&args.input_path).with_context(|| {
        format!(
            "Failed to read maze from given file({}).",
            args.input_path.display()
        )
    })?;
    let solver = Solver::new(maze).with_context(|| {
        format!(
            "Failed to analyze maze from given file({}).",
            args.input_path.display()
        )
    })?;

    let outcome = if args.parallel {
        solver.solve_parallel()
    } else {
        solver.solve()
    };
    if let Some(solution) = outcome.solution {
        println!(
            "The fewest steps to collect all keys is {}.",
            solution.cost
        );
        if args.show_order {
            println!(
                "Key order: {}.",
                solution
                    .order
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    } else {
        eprintln!("There're no key orders can collect all keys in the given maze.");
    }

    Ok(())
}
