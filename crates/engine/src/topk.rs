use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One result entry. Ordering puts the *worst* entry at the top of the heap:
/// lower score loses, and among equal scores the larger docid loses, so
/// smaller docids win ties everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub score: f32,
    pub docid: u32,
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.docid.cmp(&other.docid))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded top-k queue with a monotonically non-decreasing threshold.
///
/// The queue may be seeded with an external lower bound. A candidate scoring
/// exactly the seed is still admitted (the effective threshold starts just
/// below the seed), which is what makes re-running with last generation's
/// k-th score reproduce the same result set. Once k entries are held, the
/// effective threshold is the k-th best score, folded with `max` so it never
/// decreases.
pub struct TopKQueue {
    k: usize,
    heap: BinaryHeap<Entry>,
    initial_threshold: f32,
    effective_threshold: f32,
}

impl TopKQueue {
    pub fn new(k: usize) -> Self {
        Self::with_threshold(k, 0.0)
    }

    pub fn with_threshold(k: usize, initial: f32) -> Self {
        assert!(k > 0, "top-k capacity must be positive");
        TopKQueue {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
            initial_threshold: initial,
            effective_threshold: if initial > 0.0 {
                initial.next_down()
            } else {
                initial
            },
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Would a score of `score` make it into the queue right now?
    #[inline]
    pub fn would_enter(&self, score: f32) -> bool {
        score > self.effective_threshold
    }

    /// Insert if competitive; returns whether the entry was accepted.
    pub fn insert(&mut self, score: f32, docid: u32) -> bool {
        if !self.would_enter(score) {
            return false;
        }
        self.heap.push(Entry { score, docid });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
        if self.heap.len() == self.k {
            let kth = self.heap.peek().unwrap().score;
            self.effective_threshold = self.effective_threshold.max(kth);
        }
        true
    }

    /// The pruning bound: max(seed, k-th score seen so far).
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.effective_threshold
    }

    /// The k-th score actually collected; 0 until the queue fills.
    pub fn true_threshold(&self) -> f32 {
        if self.heap.len() == self.k {
            self.heap.peek().unwrap().score
        } else {
            0.0
        }
    }

    pub fn initial_threshold(&self) -> f32 {
        self.initial_threshold
    }

    pub fn effective_threshold(&self) -> f32 {
        self.effective_threshold
    }

    /// Drain into a vector sorted by descending score, ascending docid.
    pub fn finalize(self) -> Vec<Entry> {
        let mut entries = self.heap.into_vec();
        entries.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.docid.cmp(&b.docid))
        });
        entries
    }
}

#[cfg(test)]
#[path = "topk_tests.rs"]
mod tests;
