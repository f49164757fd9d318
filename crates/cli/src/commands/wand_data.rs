use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use sift_engine::{
    BlockPartition, ScorerParams, WandBuildParams, build_wand_data, write_wand_data_atomic,
};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct WandDataArgs {
    /// Uncompressed inverted index basename
    #[arg(long)]
    pub input: PathBuf,

    /// Output .wand file
    #[arg(long)]
    pub output: PathBuf,

    /// Scorer the score bounds are computed under
    #[arg(long, default_value = "bm25")]
    pub scorer: String,

    /// Block policy: fixed:B or variable:LAMBDA
    #[arg(long, default_value = "fixed:64")]
    pub block_size: String,

    /// Store maxima quantized to BITS-wide integers (pair with a
    /// --quantize'd index)
    #[arg(long, value_name = "BITS")]
    pub quantize: Option<u8>,
}

pub fn run(args: WandDataArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: WandDataArgs) -> CommandResult<()> {
    let partition = BlockPartition::parse(&args.block_size)?;
    let params = WandBuildParams {
        scorer: ScorerParams::new(&args.scorer),
        partition,
        quantize_bits: args.quantize,
    };

    let staged = build_wand_data(&args.input, &params)
        .with_context(|| format!("failed to build wand data for {}", args.input.display()))?;
    write_wand_data_atomic(&args.output, &staged)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("wrote block-max table to {}", args.output.display());
    Ok(())
}
