use std::io;

use hashbrown::HashMap;
use log::warn;

use crate::index::{Index, TermId};
use crate::postings::{ListCursor, PostingCursor};
use crate::query::Query;
use crate::scorer::{Scorer, TermScorer};
use crate::wand::{WandData, WandEnumerator};

/// A posting cursor with its term scorer attached.
pub struct ScoredCursor<C> {
    cursor: C,
    scorer: Box<dyn TermScorer>,
}

impl<C: PostingCursor> ScoredCursor<C> {
    pub fn new(cursor: C, scorer: Box<dyn TermScorer>) -> Self {
        ScoredCursor { cursor, scorer }
    }

    #[inline]
    pub fn docid(&self) -> u32 {
        self.cursor.docid()
    }

    /// Score of the current posting.
    #[inline]
    pub fn score(&mut self) -> f32 {
        let docid = self.cursor.docid();
        let freq = self.cursor.freq();
        self.scorer.score(docid, freq)
    }

    #[inline]
    pub fn next(&mut self) {
        self.cursor.next();
    }

    #[inline]
    pub fn next_geq(&mut self, target: u32) {
        self.cursor.next_geq(target);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cursor.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }
}

/// Scored cursor carrying the term's global score upper bound.
pub struct MaxScoredCursor<C> {
    inner: ScoredCursor<C>,
    max_weight: f32,
}

impl<C: PostingCursor> MaxScoredCursor<C> {
    pub fn new(cursor: C, scorer: Box<dyn TermScorer>, max_weight: f32) -> Self {
        MaxScoredCursor {
            inner: ScoredCursor::new(cursor, scorer),
            max_weight,
        }
    }

    #[inline]
    pub fn docid(&self) -> u32 {
        self.inner.docid()
    }

    #[inline]
    pub fn score(&mut self) -> f32 {
        self.inner.score()
    }

    #[inline]
    pub fn next(&mut self) {
        self.inner.next()
    }

    #[inline]
    pub fn next_geq(&mut self, target: u32) {
        self.inner.next_geq(target)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Upper bound on this cursor's contribution to any document.
    #[inline]
    pub fn max_score(&self) -> f32 {
        self.max_weight
    }
}

/// Max-scored cursor that also tracks per-block score bounds through a
/// wand-data enumerator.
pub struct BlockMaxScoredCursor<'w, C> {
    inner: ScoredCursor<C>,
    max_weight: f32,
    query_weight: f32,
    wand: WandEnumerator<'w>,
}

impl<'w, C: PostingCursor> BlockMaxScoredCursor<'w, C> {
    pub fn new(
        cursor: C,
        scorer: Box<dyn TermScorer>,
        max_weight: f32,
        query_weight: f32,
        wand: WandEnumerator<'w>,
    ) -> Self {
        BlockMaxScoredCursor {
            inner: ScoredCursor::new(cursor, scorer),
            max_weight,
            query_weight,
            wand,
        }
    }

    #[inline]
    pub fn docid(&self) -> u32 {
        self.inner.docid()
    }

    #[inline]
    pub fn score(&mut self) -> f32 {
        self.inner.score()
    }

    #[inline]
    pub fn next(&mut self) {
        self.inner.next()
    }

    #[inline]
    pub fn next_geq(&mut self, target: u32) {
        self.inner.next_geq(target)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn max_score(&self) -> f32 {
        self.max_weight
    }

    /// Reposition the block-max enumerator to the block containing `target`.
    #[inline]
    pub fn block_max_next_geq(&mut self, target: u32) {
        self.wand.next_geq(target);
    }

    /// Upper bound over the current block, scaled by the query weight.
    #[inline]
    pub fn block_max_score(&self) -> f32 {
        self.query_weight * self.wand.score()
    }

    /// Last docid of the current block.
    #[inline]
    pub fn block_docid(&self) -> u32 {
        self.wand.docid()
    }
}

/// Fold duplicate query terms into (term, weight) pairs, dropping terms the
/// index does not know. Order is by term id for determinism.
fn query_weights(index: &Index, query: &Query) -> Vec<(TermId, f32)> {
    let mut weights: HashMap<TermId, f32> = HashMap::new();
    for &(term, weight) in &query.terms {
        if term >= index.num_terms() {
            warn!("term {term} not in index ({} terms); dropped", index.num_terms());
            continue;
        }
        *weights.entry(term).or_insert(0.0) += weight;
    }
    let mut folded: Vec<(TermId, f32)> = weights.into_iter().collect();
    folded.sort_unstable_by_key(|&(term, _)| term);
    folded
}

/// One scored cursor per unique query term.
pub fn scored_cursors<'i>(
    index: &'i Index,
    wand: &WandData,
    scorer: &dyn Scorer,
    query: &Query,
) -> io::Result<Vec<ScoredCursor<ListCursor<'i>>>> {
    query_weights(index, query)
        .into_iter()
        .map(|(term, weight)| {
            let stats = wand.term_stats(term)?;
            Ok(ScoredCursor::new(
                index.cursor(term)?,
                scorer.term_scorer(stats, weight),
            ))
        })
        .collect()
}

/// Cursors for WAND and MaxScore: scored plus the term upper bound.
pub fn max_scored_cursors<'i>(
    index: &'i Index,
    wand: &WandData,
    scorer: &dyn Scorer,
    query: &Query,
) -> io::Result<Vec<MaxScoredCursor<ListCursor<'i>>>> {
    query_weights(index, query)
        .into_iter()
        .map(|(term, weight)| {
            let stats = wand.term_stats(term)?;
            let max_weight = weight * wand.max_term_weight(term)?;
            Ok(MaxScoredCursor::new(
                index.cursor(term)?,
                scorer.term_scorer(stats, weight),
                max_weight,
            ))
        })
        .collect()
}

/// Cursors for the block-max algorithms: scored, bounded, and carrying the
/// term's block-max enumerator.
pub fn block_max_scored_cursors<'i, 'w>(
    index: &'i Index,
    wand: &'w WandData,
    scorer: &dyn Scorer,
    query: &Query,
) -> io::Result<Vec<BlockMaxScoredCursor<'w, ListCursor<'i>>>> {
    query_weights(index, query)
        .into_iter()
        .map(|(term, weight)| {
            let stats = wand.term_stats(term)?;
            let max_weight = weight * wand.max_term_weight(term)?;
            Ok(BlockMaxScoredCursor::new(
                index.cursor(term)?,
                scorer.term_scorer(stats, weight),
                max_weight,
                weight,
                wand.enumerator(term)?,
            ))
        })
        .collect()
}
