//! ormstudy CLI
//!
//! Command-line interface for running the chapter demonstrations

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "ormstudy")]
#[command(about = "ormstudy - ORM mapping walkthrough on SQLite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the chapters
    List,
    /// Run chapters, each in its own unit of work
    Run(commands::run::RunArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => commands::list::execute(),
        Commands::Run(args) => commands::run::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
