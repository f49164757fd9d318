use crate::cursor::MaxScoredCursor;
use crate::postings::PostingCursor;
use crate::topk::TopKQueue;

/// WAND: keep cursors sorted by docid and walk a pivot forward through the
/// prefix whose accumulated `max_score` first beats the threshold. Documents
/// before the pivot cannot enter the top-k, so lagging cursors jump straight
/// to the pivot's docid.
pub fn wand<C: PostingCursor>(
    mut cursors: Vec<MaxScoredCursor<C>>,
    document_bound: u32,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_unstable_by_key(|c| c.docid());

    loop {
        // Pivot: first prefix whose upper bound could enter the queue.
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

        if pivot_docid == cursors[0].docid() {
            // All pivot-prefix cursors are aligned: score the document.
            let mut score = 0.0;
            for cursor in cursors.iter_mut() {
                if cursor.docid() != pivot_docid {
                    break;
                }
                score += cursor.score();
                cursor.next();
            }
            topk.insert(score, pivot_docid);
            cursors.sort_unstable_by_key(|c| c.docid());
        } else {
            // Advance the last cursor still behind the pivot.
            let mut lagging = pivot;
            while cursors[lagging].docid() == pivot_docid {
                lagging -= 1;
            }
            cursors[lagging].next_geq(pivot_docid);
            bubble_down(&mut cursors, lagging, |c| c.docid());
        }
    }
}

/// Restore docid order after `cursors[from]` advanced.
pub(super) fn bubble_down<T>(cursors: &mut [T], from: usize, docid: impl Fn(&T) -> u32) {
    let mut i = from;
    while i + 1 < cursors.len() && docid(&cursors[i]) > docid(&cursors[i + 1]) {
        cursors.swap(i, i + 1);
        i += 1;
    }
}
