use std::sync::Arc;

use super::{CollectionStats, Scorer, TermScorer, TermStats};

/// DFR DPH: hypergeometric model with Popper normalization. Parameter-free.
pub struct Dph {
    collection: CollectionStats,
    doc_lens: Arc<[u32]>,
}

impl Dph {
    pub fn new(collection: CollectionStats, doc_lens: Arc<[u32]>) -> Self {
        Dph {
            collection,
            doc_lens,
        }
    }
}

const TAU: f32 = std::f32::consts::TAU;

struct DphTerm {
    query_weight: f32,
    avg_len: f32,
    /// N / cf.
    docs_per_occurrence: f32,
    doc_lens: Arc<[u32]>,
}

impl TermScorer for DphTerm {
    #[inline]
    fn score(&self, docid: u32, freq: u32) -> f32 {
        let f = freq as f32;
        let len = self.doc_lens[docid as usize] as f32;
        let relative = f / len;
        let norm = (1.0 - relative) * (1.0 - relative) / (f + 1.0);
        let value = norm
            * (f * (relative * self.avg_len * self.docs_per_occurrence).log2()
                + 0.5 * (TAU * f * (1.0 - relative)).log2());
        (self.query_weight * value).max(0.0)
    }
}

impl Scorer for Dph {
    fn term_scorer(&self, stats: TermStats, query_weight: f32) -> Box<dyn TermScorer> {
        Box::new(DphTerm {
            query_weight,
            avg_len: self.collection.avg_doc_len,
            docs_per_occurrence: self.collection.num_docs as f32 / stats.cf as f32,
            doc_lens: Arc::clone(&self.doc_lens),
        })
    }
}
