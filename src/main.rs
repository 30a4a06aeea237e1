//! Orchestra CLI binary entry point.

use clap::Parser;
use orchestra::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "ORCHESTRA_LOG";

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Inspect(args) => orchestra::cli::inspect(&args.log),
        Commands::Compose(args) => {
            orchestra::cli::compose(&args.agent, args.instructions.as_deref())
        }
        Commands::Config(args) => orchestra::cli::show_config(args.path.as_deref()),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
