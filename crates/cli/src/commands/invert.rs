use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use sift_collection::{InvertConfig, invert_forward_index};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct InvertArgs {
    /// Forward index file (binary collection; first record is the document
    /// count)
    #[arg(long)]
    pub input: PathBuf,

    /// Output basename; writes BASENAME.docs, BASENAME.freqs and
    /// BASENAME.sizes
    #[arg(long)]
    pub output: PathBuf,

    /// Worker threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Documents per inversion batch
    #[arg(long, default_value = "10000")]
    pub batch_size: usize,
}

pub fn run(args: InvertArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: InvertArgs) -> CommandResult<()> {
    let mut config = InvertConfig::default();
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.batch_size = args.batch_size;

    let stats = invert_forward_index(&args.input, &args.output, &config)
        .with_context(|| format!("failed to invert {}", args.input.display()))?;

    println!(
        "inverted {} documents into {} terms ({} postings)",
        stats.num_docs, stats.num_terms, stats.num_postings
    );
    Ok(())
}
