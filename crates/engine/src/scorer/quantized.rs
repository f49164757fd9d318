use super::{Scorer, TermScorer, TermStats};

/// Pass-through scorer for quantized indexes: the frequency stream already
/// holds precomputed small-integer scores.
pub struct Quantized;

struct QuantizedTerm {
    query_weight: f32,
}

impl TermScorer for QuantizedTerm {
    #[inline]
    fn score(&self, _docid: u32, freq: u32) -> f32 {
        self.query_weight * freq as f32
    }
}

impl Scorer for Quantized {
    fn term_scorer(&self, _stats: TermStats, query_weight: f32) -> Box<dyn TermScorer> {
        Box::new(QuantizedTerm { query_weight })
    }
}
