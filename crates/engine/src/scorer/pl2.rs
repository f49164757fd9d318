use std::sync::Arc;

use super::{CollectionStats, Scorer, TermScorer, TermStats};

/// DFR PL2: Poisson model with Laplace after-effect and length
/// normalization 2.
pub struct Pl2 {
    c: f32,
    collection: CollectionStats,
    doc_lens: Arc<[u32]>,
}

impl Pl2 {
    pub fn new(c: f32, collection: CollectionStats, doc_lens: Arc<[u32]>) -> Self {
        Pl2 {
            c,
            collection,
            doc_lens,
        }
    }
}

const LOG2_E: f32 = std::f32::consts::LOG2_E;
const TAU: f32 = std::f32::consts::TAU;

struct Pl2Term {
    query_weight: f32,
    /// c * avg_len, the numerator of the normalization ratio.
    c_avg_len: f32,
    /// Expected term frequency per document, cf / N.
    lambda: f32,
    doc_lens: Arc<[u32]>,
}

impl TermScorer for Pl2Term {
    #[inline]
    fn score(&self, docid: u32, freq: u32) -> f32 {
        let len = self.doc_lens[docid as usize] as f32;
        let tfn = freq as f32 * (1.0 + self.c_avg_len / len).log2();
        let value = (tfn * (tfn / self.lambda).log2()
            + (self.lambda - tfn) * LOG2_E
            + 0.5 * (TAU * tfn).log2())
            / (tfn + 1.0);
        (self.query_weight * value).max(0.0)
    }
}

impl Scorer for Pl2 {
    fn term_scorer(&self, stats: TermStats, query_weight: f32) -> Box<dyn TermScorer> {
        Box::new(Pl2Term {
            query_weight,
            c_avg_len: self.c * self.collection.avg_doc_len,
            lambda: stats.cf as f32 / self.collection.num_docs as f32,
            doc_lens: Arc::clone(&self.doc_lens),
        })
    }
}
