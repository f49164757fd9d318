pub mod compress;
pub mod evaluate;
pub mod invert;
pub mod queries;
pub mod wand_data;

use clap::{Parser, Subcommand};
pub use compress::CompressArgs;
pub use evaluate::EvaluateArgs;
pub use invert::InvertArgs;
pub use queries::QueriesArgs;
pub use wand_data::WandDataArgs;

/// Common error type for command handlers
pub type CommandResult<T> = Result<T, anyhow::Error>;

#[derive(Parser, Debug)]
#[command(
    name = "sift",
    version,
    about = "sift - an experimentation engine for ranked retrieval",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invert a forward index into .docs/.freqs/.sizes.
    ///
    /// Example:
    ///   sift invert --input fwd.bin --output idx/inv
    Invert(InvertArgs),

    /// Compress an inverted index with one of the registered encodings.
    ///
    /// Example:
    ///   sift compress --input idx/inv --output idx/cmp --encoding simdbp
    ///   sift compress --input idx/inv --output idx/q8 --encoding simdbp \
    ///       --quantize 8 --wand idx/inv.wand
    Compress(CompressArgs),

    /// Build the block-max (wand) table from an uncompressed index.
    ///
    /// Example:
    ///   sift wand-data --input idx/inv --output idx/inv.wand --scorer bm25 \
    ///       --block-size fixed:64
    WandData(WandDataArgs),

    /// Run queries and report latency statistics.
    ///
    /// Example:
    ///   sift queries --index idx/cmp --wand idx/inv.wand \
    ///       --queries topics.txt --algorithm block_max_wand --k 10
    Queries(QueriesArgs),

    /// Run queries and print TREC-format results.
    ///
    /// Example:
    ///   sift evaluate --index idx/cmp --wand idx/inv.wand \
    ///       --queries topics.txt --algorithm maxscore --k 1000 --run-id sift
    Evaluate(EvaluateArgs),
}
