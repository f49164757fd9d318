use super::elias_fano::{EliasFano, EliasFanoCursor, EliasFanoView};
use super::varint::{read_varint, write_varint};

/// Partition size, in elements.
const PARTITION_LEN: usize = 1024;

/// Uniformly partitioned Elias-Fano: the sequence is cut into fixed-size
/// chunks, each encoded with Elias-Fano against its local universe so dense
/// regions spend fewer high bits than one global encoding would.
///
/// Layout: varint n, then per partition a varint of its last value (delta
/// from the previous partition's last) and a varint byte length, then the
/// concatenated partition payloads.
pub struct PartitionedEliasFano;

impl PartitionedEliasFano {
    pub fn encode(values: &[u32], _universe: u32, out: &mut Vec<u8>) {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        write_varint(out, values.len() as u32);
        if values.is_empty() {
            return;
        }

        let mut payloads = Vec::new();
        let mut previous_last: u64 = 0;
        let mut base: u32 = 0;
        for (p, chunk) in values.chunks(PARTITION_LEN).enumerate() {
            let last = *chunk.last().unwrap();
            let relative: Vec<u32> = chunk.iter().map(|&v| v - base).collect();

            let mut payload = Vec::new();
            EliasFano::encode(&relative, last - base + 1, &mut payload);

            // First partition stores its last value directly, the rest a
            // delta; partitions are non-empty so the delta is >= 1.
            let delta = if p == 0 {
                last as u64
            } else {
                last as u64 - previous_last - 1
            };
            write_varint(out, delta as u32);
            write_varint(out, payload.len() as u32);
            payloads.extend_from_slice(&payload);

            previous_last = last as u64;
            base = last + 1;
        }
        out.extend_from_slice(&payloads);
    }
}

/// Borrowed view over a partitioned sequence.
pub struct PartitionedView<'a> {
    n: usize,
    /// Last value of each partition.
    lasts: Vec<u32>,
    /// Byte range of each partition payload.
    payloads: Vec<&'a [u8]>,
}

impl<'a> PartitionedView<'a> {
    pub fn parse(bytes: &'a [u8]) -> (Self, &'a [u8]) {
        let (n, mut rest) = read_varint(bytes);
        let n = n as usize;
        let partitions = n.div_ceil(PARTITION_LEN);

        let mut lasts = Vec::with_capacity(partitions);
        let mut lens = Vec::with_capacity(partitions);
        let mut previous_last: u64 = 0;
        for p in 0..partitions {
            let (delta, tail) = read_varint(rest);
            let (len, tail) = read_varint(tail);
            rest = tail;
            let last = if p == 0 {
                delta as u64
            } else {
                previous_last + 1 + delta as u64
            };
            lasts.push(last as u32);
            lens.push(len as usize);
            previous_last = last;
        }

        let mut payloads = Vec::with_capacity(partitions);
        for len in lens {
            let (payload, tail) = rest.split_at(len);
            payloads.push(payload);
            rest = tail;
        }

        (PartitionedView { n, lasts, payloads }, rest)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn partition_base(&self, p: usize) -> u32 {
        if p == 0 { 0 } else { self.lasts[p - 1] + 1 }
    }

    fn partition_cursor(&self, p: usize) -> EliasFanoCursor<'a> {
        let (view, _) = EliasFanoView::parse(self.payloads[p]);
        view.cursor()
    }

    pub fn cursor(&self) -> PartitionedCursor<'a> {
        let inner = (self.n > 0).then(|| self.partition_cursor(0));
        PartitionedCursor {
            n: self.n,
            lasts: self.lasts.clone(),
            payloads: self.payloads.clone(),
            partition: 0,
            consumed: 0,
            inner,
        }
    }
}

/// Forward cursor over a partitioned sequence.
pub struct PartitionedCursor<'a> {
    n: usize,
    lasts: Vec<u32>,
    payloads: Vec<&'a [u8]>,
    partition: usize,
    /// Elements in partitions before the current one.
    consumed: usize,
    inner: Option<EliasFanoCursor<'a>>,
}

impl<'a> PartitionedCursor<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    fn base(&self) -> u32 {
        if self.partition == 0 {
            0
        } else {
            self.lasts[self.partition - 1] + 1
        }
    }

    #[inline]
    pub fn exhausted(&self) -> bool {
        self.inner.is_none()
    }

    #[inline]
    pub fn index(&self) -> usize {
        match &self.inner {
            Some(inner) => self.consumed + inner.index(),
            None => self.n,
        }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        let inner = self.inner.as_ref().expect("cursor exhausted");
        self.base() + inner.value()
    }

    fn open_partition(&mut self, p: usize) {
        self.consumed = p * PARTITION_LEN;
        self.partition = p;
        if p < self.payloads.len() {
            let (view, _) = EliasFanoView::parse(self.payloads[p]);
            self.inner = Some(view.cursor());
        } else {
            self.inner = None;
        }
    }

    pub fn next(&mut self) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        inner.next();
        if inner.exhausted() {
            self.open_partition(self.partition + 1);
        }
    }

    pub fn advance_to_value(&mut self, target: u32) {
        if self.exhausted() {
            return;
        }
        // Partitions are bounded by their last value; hop forward to the
        // first partition that can still contain `target`.
        if target > self.lasts[self.partition] {
            let p = self.partition
                + match self.lasts[self.partition..].binary_search(&target) {
                    Ok(p) | Err(p) => p,
                };
            self.open_partition(p);
            if self.exhausted() {
                return;
            }
        }
        let base = self.base();
        let relative = target.saturating_sub(base);
        let inner = self.inner.as_mut().unwrap();
        inner.advance_to_value(relative);
        if inner.exhausted() {
            let p = self.partition + 1;
            self.open_partition(p);
        }
    }

    pub fn advance_to_index(&mut self, i: usize) {
        debug_assert!(i >= self.index());
        if i >= self.n {
            self.inner = None;
            return;
        }
        let p = i / PARTITION_LEN;
        if p != self.partition {
            self.open_partition(p);
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.advance_to_index(i - self.consumed);
        }
    }
}
