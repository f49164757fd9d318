use std::process::ExitCode;

use clap::Parser;

mod commands;

use commands::{Cli, Command};
use sift_runtime::logging;

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Invert(args) => commands::invert::run(args),
        Command::Compress(args) => commands::compress::run(args),
        Command::WandData(args) => commands::wand_data::run(args),
        Command::Queries(args) => commands::queries::run(args),
        Command::Evaluate(args) => commands::evaluate::run(args),
    }
}
