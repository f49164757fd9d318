use crate::cursor::ScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

/// Exhaustive union: every document containing any query term is scored.
/// No pruning; this is the correctness oracle the pruned algorithms are
/// checked against.
pub fn ranked_or<C: PostingCursor>(
    cursors: &mut [ScoredCursor<C>],
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    let mut candidate = cursors
        .iter()
        .map(|c| c.docid())
        .min()
        .unwrap_or(document_bound);

    while candidate < document_bound {
        let mut score = 0.0;
        let mut next = document_bound;
        for cursor in cursors.iter_mut() {
            if cursor.docid() == candidate {
                score += cursor.score();
                cursor.next();
            }
            next = next.min(cursor.docid());
        }
        topk.insert(score, candidate);
        candidate = next;
    }
}

/// Intersection: only documents containing every query term are scored.
pub fn ranked_and<C: PostingCursor>(
    cursors: &mut [ScoredCursor<C>],
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    // Drive the intersection from the shortest list.
    cursors.sort_unstable_by_key(|c| c.len());

    let mut candidate = cursors[0].docid();
    while candidate < document_bound {
        let mut aligned = true;
        for i in 1..cursors.len() {
            cursors[i].next_geq(candidate);
            if cursors[i].docid() != candidate {
                candidate = cursors[i].docid();
                aligned = false;
                break;
            }
        }
        if aligned {
            let mut score = 0.0;
            for cursor in cursors.iter_mut() {
                score += cursor.score();
            }
            topk.insert(score, candidate);
            cursors[0].next();
            candidate = cursors[0].docid();
        } else {
            cursors[0].next_geq(candidate);
            candidate = cursors[0].docid();
        }
    }
}
