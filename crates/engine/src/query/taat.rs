use crate::accumulator::Accumulator;
use crate::cursor::ScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

/// Term-at-a-time ranked union: each list is absorbed whole into the
/// accumulator, then the accumulator is harvested into the top-k queue.
pub fn taat<C: PostingCursor, A: Accumulator>(
    cursors: &mut [ScoredCursor<C>],
    document_bound: u32,
    accumulator: &mut A,
    topk: &mut TopKQueue,
) {
    accumulator.init();
    for cursor in cursors.iter_mut() {
        while cursor.docid() < document_bound {
            accumulator.accumulate(cursor.docid(), cursor.score());
            cursor.next();
        }
    }
    accumulator.aggregate(topk);
}
