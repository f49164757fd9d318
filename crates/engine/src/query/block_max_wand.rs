use crate::cursor::BlockMaxScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

use super::wand::bubble_down;

/// BlockMax-WAND: WAND's pivot test refined with per-block maxima. After the
/// global bounds nominate a pivot, the prefix's block maxima are summed; if
/// even those cannot beat the threshold, the whole region up to the nearest
/// block boundary is skipped.
pub fn block_max_wand<C: PostingCursor>(
    mut cursors: Vec<BlockMaxScoredCursor<'_, C>>,
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_unstable_by_key(|c| c.docid());

    loop {
        // Pivot search on the global term bounds, as in plain WAND.
        let mut upper_bound = 0.0f32;
        let mut pivot = None;
        for (i, cursor) in cursors.iter().enumerate() {
            if cursor.docid() >= document_bound {
                break;
            }
            upper_bound += cursor.max_score();
            if topk.would_enter(upper_bound) {
                pivot = Some(i);
                break;
            }
        }
        let Some(pivot) = pivot else {
            return;
        };
        let pivot_docid = cursors[pivot].docid();

        // Tighten with the current block maxima.
        let mut block_upper_bound = 0.0f32;
        for cursor in cursors[..=pivot].iter_mut() {
            cursor.block_max_next_geq(pivot_docid);
            block_upper_bound += cursor.block_max_score();
        }

        if topk.would_enter(block_upper_bound) {
            if pivot_docid == cursors[0].docid() {
                let mut score = 0.0;
                for cursor in cursors.iter_mut() {
                    if cursor.docid() != pivot_docid {
                        break;
                    }
                    let partial = cursor.score();
                    score += partial;
                    // Replace this cursor's block bound with its true
                    // contribution; bail out as soon as the document cannot
                    // make it (a partial score never enters the queue).
                    block_upper_bound -= cursor.block_max_score() - partial;
                    if !topk.would_enter(block_upper_bound) {
                        break;
                    }
                }
                for cursor in cursors.iter_mut() {
                    if cursor.docid() != pivot_docid {
                        break;
                    }
                    cursor.next();
                }
                topk.insert(score, pivot_docid);
                cursors.sort_unstable_by_key(|c| c.docid());
            } else {
                let mut lagging = pivot;
                while cursors[lagging].docid() == pivot_docid {
                    lagging -= 1;
                }
                cursors[lagging].next_geq(pivot_docid);
                bubble_down(&mut cursors, lagging, |c| c.docid());
            }
        } else {
            // The prefix's blocks cannot reach the threshold: jump past the
            // nearest block boundary (or to the next cursor's docid).
            let mut next = document_bound;
            for cursor in cursors[..=pivot].iter() {
                next = next.min(cursor.block_docid().saturating_add(1));
            }
            if pivot + 1 < cursors.len() {
                next = next.min(cursors[pivot + 1].docid());
            }
            if next <= pivot_docid {
                next = pivot_docid + 1;
            }
            for i in 0..=pivot {
                if cursors[i].docid() < next {
                    cursors[i].next_geq(next);
                }
            }
            cursors.sort_unstable_by_key(|c| c.docid());
        }
    }
}
