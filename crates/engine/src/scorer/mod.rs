use std::io::{self, Error, ErrorKind};
use std::sync::Arc;

mod bm25;
mod dph;
mod pl2;
mod qld;
mod quantized;

pub use bm25::Bm25;
pub use dph::Dph;
pub use pl2::Pl2;
pub use qld::QueryLikelihood;
pub use quantized::Quantized;

/// Scorer selection plus model constants, defaulting to the standard
/// parameterization (BM25 k1=0.9 b=0.4, PL2 c=1, QL µ=1000).
#[derive(Debug, Clone)]
pub struct ScorerParams {
    pub name: String,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    pub pl2_c: f32,
    pub qld_mu: f32,
}

impl ScorerParams {
    pub fn new(name: &str) -> Self {
        ScorerParams {
            name: name.to_string(),
            bm25_k1: 0.9,
            bm25_b: 0.4,
            pl2_c: 1.0,
            qld_mu: 1000.0,
        }
    }
}

/// Per-term statistics needed by the scoring models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStats {
    /// Document frequency: number of documents containing the term.
    pub df: u32,
    /// Collection frequency: total occurrences across the collection.
    pub cf: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionStats {
    pub num_docs: u32,
    pub avg_doc_len: f32,
}

impl CollectionStats {
    /// Total token count of the collection.
    #[inline]
    pub fn total_len(&self) -> f64 {
        self.num_docs as f64 * self.avg_doc_len as f64
    }
}

/// Scoring closure for one query term. Built once per term, called once per
/// posting; every log and division that does not depend on the posting is
/// precomputed at construction.
pub trait TermScorer: Send + Sync {
    fn score(&self, docid: u32, freq: u32) -> f32;
}

/// A scoring model bound to one collection (document lengths and global
/// statistics captured at construction).
pub trait Scorer: Send + Sync {
    fn term_scorer(&self, stats: TermStats, query_weight: f32) -> Box<dyn TermScorer>;
}

/// Resolve a scorer by name; unknown names are load-time fatal.
pub fn scorer_from_params(
    params: &ScorerParams,
    collection: CollectionStats,
    doc_lens: Arc<[u32]>,
) -> io::Result<Box<dyn Scorer>> {
    match params.name.as_str() {
        "bm25" => Ok(Box::new(Bm25::new(
            params.bm25_k1,
            params.bm25_b,
            collection,
            doc_lens,
        ))),
        "qld" => Ok(Box::new(QueryLikelihood::new(
            params.qld_mu,
            collection,
            doc_lens,
        ))),
        "pl2" => Ok(Box::new(Pl2::new(params.pl2_c, collection, doc_lens))),
        "dph" => Ok(Box::new(Dph::new(collection, doc_lens))),
        "quantized" => Ok(Box::new(Quantized)),
        other => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unknown scorer: {other}"),
        )),
    }
}

pub const SCORER_NAMES: &[&str] = &["bm25", "qld", "pl2", "dph", "quantized"];

/// Linear score quantizer shared by index compression and wand-data
/// construction: both must map raw scores into the same integer units or
/// the block-max bounds stop being upper bounds.
#[derive(Debug, Clone, Copy)]
pub struct LinearQuantizer {
    global_max: f32,
    levels: u32,
}

impl LinearQuantizer {
    /// `global_max` is the largest term weight anywhere in the collection;
    /// `bits` the target width (the zero level is reserved).
    pub fn new(global_max: f32, bits: u8) -> io::Result<Self> {
        if !(1..=16).contains(&bits) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("quantization bits out of range: {bits}"),
            ));
        }
        if !(global_max > 0.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "global maximum score must be positive",
            ));
        }
        Ok(LinearQuantizer {
            global_max,
            levels: (1u32 << bits) - 1,
        })
    }

    /// Map a raw score into `1..=levels`. Monotone, so the quantized block
    /// maximum is exactly the maximum of the quantized scores.
    #[inline]
    pub fn quantize(&self, score: f32) -> u32 {
        let scaled = (score / self.global_max) * self.levels as f32;
        (scaled.round() as u32).clamp(1, self.levels)
    }

    #[inline]
    pub fn levels(&self) -> u32 {
        self.levels
    }
}

#[cfg(test)]
#[path = "scorer_tests.rs"]
mod tests;
