use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use sift_collection::Lexicon;
use sift_engine::{ALGORITHM_NAMES, Algorithm, Index, QueryExecutor, ScorerParams, WandData};
use sift_runtime::DEFAULT_RUN_ID;

use crate::commands::CommandResult;
use crate::commands::queries::{execute_query, load_queries, load_thresholds};

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Compressed index basename
    #[arg(long)]
    pub index: PathBuf,

    /// Wand data file
    #[arg(long)]
    pub wand: PathBuf,

    /// Query file, one query per line (optional `id:` prefix)
    #[arg(long)]
    pub queries: PathBuf,

    /// Query algorithm
    #[arg(long)]
    pub algorithm: String,

    /// Results per query
    #[arg(long, default_value = "1000")]
    pub k: usize,

    /// Scorer
    #[arg(long, default_value = "bm25")]
    pub scorer: String,

    /// Term lexicon for token queries
    #[arg(long)]
    pub termlex: Option<PathBuf>,

    /// Document lexicon; without it, internal docids are printed
    #[arg(long)]
    pub doclex: Option<PathBuf>,

    /// File of threshold seeds, one per query line
    #[arg(long, alias = "threshold")]
    pub thresholds: Option<PathBuf>,

    /// Rerun a query without its seed when it returns fewer than k results
    #[arg(long)]
    pub safe: bool,

    /// Run tag for the TREC output
    #[arg(long, default_value = DEFAULT_RUN_ID)]
    pub run_id: String,
}

pub fn run(args: EvaluateArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: EvaluateArgs) -> CommandResult<()> {
    let algorithm = Algorithm::from_name(&args.algorithm)
        .with_context(|| format!("known algorithms: {}", ALGORITHM_NAMES.join(", ")))?;
    let index = Index::open(&args.index)
        .with_context(|| format!("failed to open index {}", args.index.display()))?;
    let wand = WandData::open(&args.wand)
        .with_context(|| format!("failed to open wand data {}", args.wand.display()))?;
    let doclex = match &args.doclex {
        Some(path) => Some(
            Lexicon::open(path)
                .with_context(|| format!("failed to open document lexicon {}", path.display()))?,
        ),
        None => None,
    };

    let queries = load_queries(&args.queries, args.termlex.as_deref())?;
    let thresholds = load_thresholds(args.thresholds.as_deref(), queries.len())?;

    let params = ScorerParams::new(&args.scorer);
    let mut executor = QueryExecutor::new(&index, &wand, &params)?;

    let stdout = std::io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    for (position, (query, &threshold)) in queries.iter().zip(&thresholds).enumerate() {
        let results = execute_query(
            &mut executor,
            algorithm,
            query,
            args.k,
            threshold,
            args.safe,
        )?;

        let qid = query
            .id
            .clone()
            .unwrap_or_else(|| position.to_string());
        for (rank, entry) in results.iter().enumerate() {
            let name = doclex
                .as_ref()
                .and_then(|lexicon| lexicon.get(entry.docid as usize).map(str::to_string))
                .unwrap_or_else(|| entry.docid.to_string());
            writeln!(
                out,
                "{qid} Q0 {name} {rank} {score} {run_id}",
                rank = rank + 1,
                score = entry.score,
                run_id = args.run_id
            )?;
        }
    }
    out.flush()?;
    Ok(())
}
