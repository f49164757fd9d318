use std::io::{self, Error, ErrorKind};

use log::warn;
use sift_collection::Lexicon;
use smallvec::SmallVec;

use crate::accumulator::{LazyAccumulator, SimpleAccumulator};
use crate::cursor::{block_max_scored_cursors, max_scored_cursors, scored_cursors};
use crate::index::{Index, TermId};
use crate::scorer::{Scorer, ScorerParams, scorer_from_params};
use crate::topk::{Entry, TopKQueue};
use crate::wand::WandData;

mod block_max_maxscore;
mod block_max_wand;
mod maxscore;
mod ranked;
mod taat;
mod wand;

pub use block_max_maxscore::block_max_maxscore;
pub use block_max_wand::block_max_wand;
pub use maxscore::maxscore;
pub use ranked::{ranked_and, ranked_or};
pub use taat::taat;
pub use wand::wand;

/// A parsed query: optional id plus (term, weight) pairs in query order.
/// Duplicate terms are folded at cursor-construction time, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub id: Option<String>,
    pub terms: SmallVec<[(TermId, f32); 8]>,
}

impl Query {
    pub fn from_ids<I: IntoIterator<Item = TermId>>(ids: I) -> Self {
        Query {
            id: None,
            terms: ids.into_iter().map(|t| (t, 1.0)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Parse one query line: an optional `id:` prefix, then whitespace
    /// separated terms. With a lexicon, tokens are lowercased and resolved,
    /// and unknown tokens dropped with a warning; without one, every token
    /// must be an integer term id.
    pub fn parse(line: &str, lexicon: Option<&Lexicon>) -> io::Result<Query> {
        let (id, rest) = match line.split_once(':') {
            Some((id, rest)) => (Some(id.trim().to_string()), rest),
            None => (None, line),
        };

        let mut terms = SmallVec::new();
        for token in rest.split_whitespace() {
            match lexicon {
                None => {
                    let term: TermId = token.parse().map_err(|_| {
                        Error::new(
                            ErrorKind::InvalidInput,
                            format!("not a term id: {token:?} (no term lexicon given)"),
                        )
                    })?;
                    terms.push((term, 1.0));
                }
                Some(lexicon) => {
                    let token = token.to_lowercase();
                    match lexicon.find(&token) {
                        Some(term) => terms.push((term as TermId, 1.0)),
                        None => warn!("term {token:?} not in lexicon; dropped"),
                    }
                }
            }
        }
        Ok(Query { id, terms })
    }
}

/// Query algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RankedOr,
    RankedAnd,
    Wand,
    BlockMaxWand,
    MaxScore,
    BlockMaxMaxScore,
    Taat,
    TaatLazy,
}

impl Algorithm {
    /// Resolve an algorithm name (long form or the usual abbreviation).
    pub fn from_name(name: &str) -> io::Result<Self> {
        match name {
            "ranked_or" | "or" => Ok(Algorithm::RankedOr),
            "ranked_and" | "and" => Ok(Algorithm::RankedAnd),
            "wand" => Ok(Algorithm::Wand),
            "block_max_wand" | "bmw" => Ok(Algorithm::BlockMaxWand),
            "maxscore" | "mmw" => Ok(Algorithm::MaxScore),
            "block_max_maxscore" | "bmm" => Ok(Algorithm::BlockMaxMaxScore),
            "taat" => Ok(Algorithm::Taat),
            "taat_lazy" => Ok(Algorithm::TaatLazy),
            other => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown algorithm: {other}"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RankedOr => "ranked_or",
            Algorithm::RankedAnd => "ranked_and",
            Algorithm::Wand => "wand",
            Algorithm::BlockMaxWand => "block_max_wand",
            Algorithm::MaxScore => "maxscore",
            Algorithm::BlockMaxMaxScore => "block_max_maxscore",
            Algorithm::Taat => "taat",
            Algorithm::TaatLazy => "taat_lazy",
        }
    }
}

pub const ALGORITHM_NAMES: &[&str] = &[
    "ranked_or",
    "ranked_and",
    "wand",
    "block_max_wand",
    "maxscore",
    "block_max_maxscore",
    "taat",
    "taat_lazy",
];

/// Per-worker query executor: owns the scorer and the reusable accumulators,
/// borrows the shared read-only index and wand data.
pub struct QueryExecutor<'a> {
    index: &'a Index,
    wand: &'a WandData,
    scorer: Box<dyn Scorer>,
    simple: SimpleAccumulator,
    lazy: LazyAccumulator<4>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a Index, wand: &'a WandData, params: &ScorerParams) -> io::Result<Self> {
        if wand.num_docs() != index.num_docs() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "wand data does not match the index document count",
            ));
        }
        if index.is_quantized() && params.name != "quantized" {
            warn!(
                "index is quantized but scorer is {:?}; scores will be wrong",
                params.name
            );
        }
        let scorer = scorer_from_params(params, wand.collection_stats(), index.doc_lens())?;
        let documents = index.num_docs() as usize;
        Ok(QueryExecutor {
            index,
            wand,
            scorer,
            simple: SimpleAccumulator::new(documents),
            lazy: LazyAccumulator::new(documents),
        })
    }

    /// Run one query, returning the top-k sorted by descending score and
    /// ascending docid. An empty query yields an empty result.
    pub fn execute(
        &mut self,
        algorithm: Algorithm,
        query: &Query,
        k: usize,
        threshold: Option<f32>,
    ) -> io::Result<Vec<Entry>> {
        let mut topk = match threshold {
            Some(seed) => TopKQueue::with_threshold(k, seed),
            None => TopKQueue::new(k),
        };
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let bound = self.index.num_docs();
        let scorer = self.scorer.as_ref();

        match algorithm {
            Algorithm::RankedOr => {
                let mut cursors = scored_cursors(self.index, self.wand, scorer, query)?;
                ranked_or(&mut cursors, bound, &mut topk);
            }
            Algorithm::RankedAnd => {
                let mut cursors = scored_cursors(self.index, self.wand, scorer, query)?;
                ranked_and(&mut cursors, bound, &mut topk);
            }
            Algorithm::Wand => {
                let cursors = max_scored_cursors(self.index, self.wand, scorer, query)?;
                wand(cursors, bound, &mut topk);
            }
            Algorithm::BlockMaxWand => {
                let cursors = block_max_scored_cursors(self.index, self.wand, scorer, query)?;
                block_max_wand(cursors, bound, &mut topk);
            }
            Algorithm::MaxScore => {
                let cursors = max_scored_cursors(self.index, self.wand, scorer, query)?;
                maxscore(cursors, bound, &mut topk);
            }
            Algorithm::BlockMaxMaxScore => {
                let cursors = block_max_scored_cursors(self.index, self.wand, scorer, query)?;
                block_max_maxscore(cursors, bound, &mut topk);
            }
            Algorithm::Taat => {
                let mut cursors = scored_cursors(self.index, self.wand, scorer, query)?;
                taat(&mut cursors, bound, &mut self.simple, &mut topk);
            }
            Algorithm::TaatLazy => {
                let mut cursors = scored_cursors(self.index, self.wand, scorer, query)?;
                taat(&mut cursors, bound, &mut self.lazy, &mut topk);
            }
        }
        Ok(topk.finalize())
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "algorithm_tests.rs"]
mod algorithm_tests;
