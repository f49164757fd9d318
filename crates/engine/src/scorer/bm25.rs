use std::sync::Arc;

use super::{CollectionStats, Scorer, TermScorer, TermStats};

/// Okapi BM25.
pub struct Bm25 {
    k1: f32,
    b: f32,
    collection: CollectionStats,
    doc_lens: Arc<[u32]>,
}

impl Bm25 {
    pub fn new(k1: f32, b: f32, collection: CollectionStats, doc_lens: Arc<[u32]>) -> Self {
        Bm25 {
            k1,
            b,
            collection,
            doc_lens,
        }
    }

    fn idf(&self, df: u32) -> f32 {
        let n = self.collection.num_docs as f64;
        let df = df as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln() as f32
    }
}

struct Bm25Term {
    /// query_weight * idf * (k1 + 1), the whole posting-independent factor.
    weight: f32,
    k1_one_minus_b: f32,
    /// k1 * b / avg_len, multiplied by the document length per posting.
    len_factor: f32,
    doc_lens: Arc<[u32]>,
}

impl TermScorer for Bm25Term {
    #[inline]
    fn score(&self, docid: u32, freq: u32) -> f32 {
        let f = freq as f32;
        let len = self.doc_lens[docid as usize] as f32;
        self.weight * f / (self.k1_one_minus_b + self.len_factor * len + f)
    }
}

impl Scorer for Bm25 {
    fn term_scorer(&self, stats: TermStats, query_weight: f32) -> Box<dyn TermScorer> {
        Box::new(Bm25Term {
            weight: query_weight * self.idf(stats.df) * (self.k1 + 1.0),
            k1_one_minus_b: self.k1 * (1.0 - self.b),
            len_factor: self.k1 * self.b / self.collection.avg_doc_len,
            doc_lens: Arc::clone(&self.doc_lens),
        })
    }
}
