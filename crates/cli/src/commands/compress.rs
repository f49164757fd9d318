use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Args;
use sift_engine::{
    CompressParams, ENCODING_NAMES, Encoding, QuantizeParams, ScorerParams, WandData,
    compress_inverted_index,
};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct CompressArgs {
    /// Uncompressed inverted index basename
    #[arg(long)]
    pub input: PathBuf,

    /// Output basename for the compressed .docs/.freqs pair
    #[arg(long)]
    pub output: PathBuf,

    /// Posting encoding
    #[arg(long)]
    pub encoding: String,

    /// Replace frequencies by BITS-wide precomputed scores
    #[arg(long, value_name = "BITS")]
    pub quantize: Option<u8>,

    /// Wand data file (required with --quantize; supplies the global
    /// maximum score)
    #[arg(long)]
    pub wand: Option<PathBuf>,

    /// Scorer used for quantization
    #[arg(long, default_value = "bm25")]
    pub scorer: String,
}

pub fn run(args: CompressArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: CompressArgs) -> CommandResult<()> {
    let encoding = Encoding::from_name(&args.encoding)
        .with_context(|| format!("known encodings: {}", ENCODING_NAMES.join(", ")))?;

    let wand = match &args.wand {
        Some(path) => Some(
            WandData::open(path)
                .with_context(|| format!("failed to open wand data {}", path.display()))?,
        ),
        None => None,
    };
    if args.quantize.is_some() && wand.is_none() {
        bail!("--quantize requires --wand for the global maximum score");
    }

    let params = CompressParams {
        encoding,
        quantize: args.quantize.map(|bits| QuantizeParams {
            bits,
            scorer: ScorerParams::new(&args.scorer),
        }),
    };
    let stats = compress_inverted_index(&args.input, &args.output, wand.as_ref(), &params)
        .with_context(|| format!("failed to compress {}", args.input.display()))?;

    println!(
        "compressed {} lists ({} postings) into {}.docs/.freqs [{}]",
        stats.num_terms,
        stats.num_postings,
        args.output.display(),
        encoding.name()
    );
    Ok(())
}
