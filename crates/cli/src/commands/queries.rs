use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Args;
use log::warn;
use serde::Serialize;
use sift_collection::Lexicon;
use sift_engine::{
    ALGORITHM_NAMES, Algorithm, Index, Query, QueryExecutor, ScorerParams, WandData,
};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct QueriesArgs {
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
    #[arg(long, default_value = "10")]
    pub k: usize,

    /// Scorer
    #[arg(long, default_value = "bm25")]
    pub scorer: String,

    /// Term lexicon for token queries; without it, queries must be term ids
    #[arg(long)]
    pub termlex: Option<PathBuf>,

    /// File of threshold seeds, one per query line
    #[arg(long, alias = "threshold")]
    pub thresholds: Option<PathBuf>,

    /// Rerun a query without its seed when it returns fewer than k results
    #[arg(long)]
    pub safe: bool,

    /// Timed runs per query (the first pass warms the cache and is not
    /// reported)
    #[arg(long, default_value = "2")]
    pub runs: usize,

    /// Emit statistics as a JSON object instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct QueryStats {
    algorithm: String,
    queries: usize,
    k: usize,
    mean_us: f64,
    p50_us: f64,
    p95_us: f64,
}

pub fn run(args: QueriesArgs) -> ExitCode {
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Parse the query file, resolving tokens when a lexicon is given.
pub(crate) fn load_queries(path: &Path, termlex: Option<&Path>) -> CommandResult<Vec<Query>> {
    let lexicon = match termlex {
        Some(path) => Some(
            Lexicon::open(path)
                .with_context(|| format!("failed to open term lexicon {}", path.display()))?,
        ),
        None => None,
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read queries from {}", path.display()))?;

    let mut queries = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        queries.push(Query::parse(line, lexicon.as_ref())?);
    }
    Ok(queries)
}

/// One threshold seed per query, paired positionally.
pub(crate) fn load_thresholds(
    path: Option<&Path>,
    query_count: usize,
) -> CommandResult<Vec<Option<f32>>> {
    let Some(path) = path else {
        return Ok(vec![None; query_count]);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read thresholds from {}", path.display()))?;
    let seeds: Vec<Option<f32>> = text
        .lines()
        .map(|line| line.trim().parse::<f32>().ok())
        .collect();
    if seeds.len() != query_count {
        bail!(
            "threshold file has {} lines for {} queries",
            seeds.len(),
            query_count
        );
    }
    Ok(seeds)
}

/// Execute one query, honoring safe mode: a seeded run that comes back
/// short is retried without the seed.
pub(crate) fn execute_query(
    executor: &mut QueryExecutor<'_>,
    algorithm: Algorithm,
    query: &Query,
    k: usize,
    threshold: Option<f32>,
    safe: bool,
) -> CommandResult<Vec<sift_engine::Entry>> {
    let results = executor.execute(algorithm, query, k, threshold)?;
    if safe && threshold.is_some() && results.len() < k {
        warn!(
            "query {:?} under-filled with its threshold seed; rerunning unseeded",
            query.id
        );
        return Ok(executor.execute(algorithm, query, k, None)?);
    }
    Ok(results)
}

fn execute(args: QueriesArgs) -> CommandResult<()> {
    let algorithm = Algorithm::from_name(&args.algorithm)
        .with_context(|| format!("known algorithms: {}", ALGORITHM_NAMES.join(", ")))?;
    let index = Index::open(&args.index)
        .with_context(|| format!("failed to open index {}", args.index.display()))?;
    let wand = WandData::open(&args.wand)
        .with_context(|| format!("failed to open wand data {}", args.wand.display()))?;

    let queries = load_queries(&args.queries, args.termlex.as_deref())?;
    let thresholds = load_thresholds(args.thresholds.as_deref(), queries.len())?;

    let params = ScorerParams::new(&args.scorer);
    let mut executor = QueryExecutor::new(&index, &wand, &params)?;

    let runs = args.runs.max(1);
    let mut latencies_us: Vec<f64> = Vec::with_capacity(queries.len());
    for run in 0..runs {
        // The first pass warms the page cache and goes unreported, unless
        // it is the only one.
        let timed = run > 0 || runs == 1;
        for (query, &threshold) in queries.iter().zip(&thresholds) {
            let started = Instant::now();
            let results = execute_query(
                &mut executor,
                algorithm,
                query,
                args.k,
                threshold,
                args.safe,
            )?;
            let elapsed = started.elapsed();
            if timed {
                latencies_us.push(elapsed.as_secs_f64() * 1e6);
            }
            std::hint::black_box(results);
        }
    }
    if latencies_us.is_empty() {
        bail!("no queries to time");
    }

    latencies_us.sort_by(|a, b| a.total_cmp(b));
    let percentile = |p: f64| {
        let rank = ((latencies_us.len() as f64 * p).ceil() as usize).clamp(1, latencies_us.len());
        latencies_us[rank - 1]
    };
    let stats = QueryStats {
        algorithm: algorithm.name().to_string(),
        queries: queries.len(),
        k: args.k,
        mean_us: latencies_us.iter().sum::<f64>() / latencies_us.len() as f64,
        p50_us: percentile(0.5),
        p95_us: percentile(0.95),
    };

    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!(
            "{}: {} queries, k={}, mean {:.1}us, p50 {:.1}us, p95 {:.1}us",
            stats.algorithm, stats.queries, stats.k, stats.mean_us, stats.p50_us, stats.p95_us
        );
    }
    Ok(())
}
