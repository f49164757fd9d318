use crate::cursor::MaxScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

/// MaxScore: cursors are split into non-essential (the lowest upper bounds,
/// whose sum alone cannot beat the threshold) and essential lists. The union
/// is driven over the essential lists only; non-essential lists are probed
/// by `next_geq` lookups that short-circuit as soon as the document's
/// remaining upper bound falls under the threshold. The split is recomputed
/// whenever the threshold grows past another bound.
pub fn maxscore<C: PostingCursor>(
    mut cursors: Vec<MaxScoredCursor<C>>,
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_unstable_by(|a, b| a.max_score().total_cmp(&b.max_score()));

    // prefix_bounds[i] = sum of the i+1 smallest upper bounds.
    let mut prefix_bounds = Vec::with_capacity(cursors.len());
    let mut running = 0.0f32;
    for cursor in &cursors {
        running += cursor.max_score();
        prefix_bounds.push(running);
    }

    // Cursors below `first_essential` cannot lift a document over the
    // threshold on their own.
    let mut first_essential = 0;
    while first_essential < cursors.len() && !topk.would_enter(prefix_bounds[first_essential]) {
        first_essential += 1;
    }

    loop {
        if first_essential == cursors.len() {
            // Even the sum of every upper bound is under the threshold.
            return;
        }

        let (lookup, essential) = cursors.split_at_mut(first_essential);
        let candidate = essential
            .iter()
            .map(|c| c.docid())
            .min()
            .unwrap_or(document_bound);
        if candidate >= document_bound {
            return;
        }

        let mut score = 0.0;
        for cursor in essential.iter_mut() {
            if cursor.docid() == candidate {
                score += cursor.score();
                cursor.next();
            }
        }

        // Probe non-essential lists from the largest bound down; stop once
        // the document cannot reach the threshold (the queue then rejects
        // the partial score).
        for i in (0..lookup.len()).rev() {
            if !topk.would_enter(score + prefix_bounds[i]) {
                break;
            }
            let cursor = &mut lookup[i];
            cursor.next_geq(candidate);
            if cursor.docid() == candidate {
                score += cursor.score();
            }
        }

        if topk.insert(score, candidate) {
            while first_essential < cursors.len()
                && !topk.would_enter(prefix_bounds[first_essential])
            {
                first_essential += 1;
            }
        }
    }
}
