use crate::cursor::BlockMaxScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

/// BlockMax-MaxScore: MaxScore with the lookup phase bounded by each
/// non-essential cursor's *current block* maximum instead of its global
/// bound, which cuts off far more lookups on skewed lists.
pub fn block_max_maxscore<C: PostingCursor>(
    mut cursors: Vec<BlockMaxScoredCursor<'_, C>>,
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_unstable_by(|a, b| a.max_score().total_cmp(&b.max_score()));

    let mut prefix_bounds = Vec::with_capacity(cursors.len());
    let mut running = 0.0f32;
    for cursor in &cursors {
        running += cursor.max_score();
        prefix_bounds.push(running);
    }

    let mut first_essential = 0;
    while first_essential < cursors.len() && !topk.would_enter(prefix_bounds[first_essential]) {
        first_essential += 1;
    }

    loop {
        if first_essential == cursors.len() {
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

        for i in (0..lookup.len()).rev() {
            if !topk.would_enter(score + prefix_bounds[i]) {
                break;
            }
            let cursor = &mut lookup[i];
            // The block maximum bounds this cursor's contribution more
            // tightly than its global max; checked before touching the
            // posting list itself.
            cursor.block_max_next_geq(candidate);
            let rest = if i > 0 { prefix_bounds[i - 1] } else { 0.0 };
            if !topk.would_enter(score + cursor.block_max_score() + rest) {
                break;
            }
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
