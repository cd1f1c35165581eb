use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clsp::generate::ClspGenerator;
use clsp::resolution::Solve;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct ClspTools {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(ClspGenerator),
    Solve(Solve)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = ClspTools::parse();
    let result = match cli.command {
        Command::Generate(generate) => generate.generate(),
        Command::Solve(solve) => solve.solve()
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let stage = err.stage();
            let err = anyhow::Error::new(err).context(format!("{stage} stage failed"));
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
