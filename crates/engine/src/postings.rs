use smallvec::SmallVec;

use crate::codec::{
    BLOCK_LEN, BlockCodec, EliasFano, EliasFanoCursor, EliasFanoView, Encoding,
    PartitionedCursor, PartitionedEliasFano, PartitionedView, read_varint, write_varint,
};

/// Forward iterator over one term's postings.
///
/// `docid()` reports the sentinel (the document bound the cursor was opened
/// with) once the list is exhausted. Cursors are single-pass and move-only;
/// `next_geq` never goes backwards.
pub trait PostingCursor {
    fn docid(&self) -> u32;

    /// Frequency (or quantized score) at the current position. Takes `&mut`
    /// because frequency blocks decode lazily on first access.
    fn freq(&mut self) -> u32;

    fn next(&mut self);

    /// Advance to the first posting with docid `>= target`.
    fn next_geq(&mut self, target: u32);

    /// Number of postings in the list.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Encode one docid list into the layout its cursor expects.
///
/// Block layouts: a varint posting count, a skip table (per block the last
/// docid, delta-coded, then per block the payload byte length), then the
/// block payloads holding `docid - previous - 1` deltas. Whole-list layouts
/// delegate to the sequence encoder.
pub fn write_docs_list(
    encoding: Encoding,
    docids: &[u32],
    document_bound: u32,
    out: &mut Vec<u8>,
) {
    debug_assert!(docids.windows(2).all(|w| w[0] < w[1]));
    match encoding {
        Encoding::Block(codec) => write_block_docs(codec, docids, out),
        Encoding::EliasFano => EliasFano::encode(docids, document_bound, out),
        Encoding::Partitioned => PartitionedEliasFano::encode(docids, document_bound, out),
    }
}

/// Encode one frequency list. Values are stored minus one (frequencies are
/// always positive); whole-list layouts store the strictly increasing prefix
/// sums instead.
pub fn write_freqs_list(encoding: Encoding, freqs: &[u32], out: &mut Vec<u8>) {
    debug_assert!(freqs.iter().all(|&f| f > 0));
    match encoding {
        Encoding::Block(codec) => write_block_freqs(codec, freqs, out),
        Encoding::EliasFano | Encoding::Partitioned => {
            let mut cumulative = Vec::with_capacity(freqs.len());
            let mut total: u32 = 0;
            for &f in freqs {
                total += f;
                cumulative.push(total);
            }
            match encoding {
                Encoding::EliasFano => EliasFano::encode(&cumulative, total + 1, out),
                _ => PartitionedEliasFano::encode(&cumulative, total + 1, out),
            }
        }
    }
}

fn write_block_docs(codec: &dyn BlockCodec, docids: &[u32], out: &mut Vec<u8>) {
    write_varint(out, docids.len() as u32);
    if docids.is_empty() {
        return;
    }

    let mut payload = Vec::new();
    let mut lengths = Vec::new();
    let mut lasts = Vec::new();
    let mut deltas = [0u32; BLOCK_LEN];

    let mut prev: i64 = -1;
    for block in docids.chunks(BLOCK_LEN) {
        let mut sum: u32 = 0;
        for (i, &docid) in block.iter().enumerate() {
            let delta = (docid as i64 - prev - 1) as u32;
            deltas[i] = delta;
            sum += delta;
            prev = docid as i64;
        }
        let start = payload.len();
        codec.encode(&deltas[..block.len()], sum, &mut payload);
        lengths.push((payload.len() - start) as u32);
        lasts.push(*block.last().unwrap());
    }

    let mut prev_last: i64 = -1;
    for &last in &lasts {
        write_varint(out, (last as i64 - prev_last - 1) as u32);
        prev_last = last as i64;
    }
    for &len in &lengths {
        write_varint(out, len);
    }
    out.extend_from_slice(&payload);
}

fn write_block_freqs(codec: &dyn BlockCodec, freqs: &[u32], out: &mut Vec<u8>) {
    write_varint(out, freqs.len() as u32);
    if freqs.is_empty() {
        return;
    }

    let mut payload = Vec::new();
    let mut lengths = Vec::new();
    let mut shifted = [0u32; BLOCK_LEN];
    for block in freqs.chunks(BLOCK_LEN) {
        for (i, &f) in block.iter().enumerate() {
            shifted[i] = f - 1;
        }
        let start = payload.len();
        // The frequency sum is not derivable at decode time; u32::MAX makes
        // sum-dependent codecs embed it.
        codec.encode(&shifted[..block.len()], u32::MAX, &mut payload);
        lengths.push((payload.len() - start) as u32);
    }

    for &len in &lengths {
        write_varint(out, len);
    }
    out.extend_from_slice(&payload);
}

// ---------------------------------------------------------------------------
// Block cursor
// ---------------------------------------------------------------------------

struct BlockSkip {
    last_docid: u32,
    /// End offset of this block's payload in the docs payload region.
    docs_end: u32,
    /// Same for the freqs payload region.
    freqs_end: u32,
}

/// Cursor over a block-compressed (docs, freqs) list pair.
pub struct BlockPostingCursor<'a> {
    codec: &'a dyn BlockCodec,
    docs: &'a [u8],
    freqs: &'a [u8],
    skip: SmallVec<[BlockSkip; 8]>,
    n: usize,
    bound: u32,
    block: usize,
    pos: usize,
    current: u32,
    doc_buf: [u32; BLOCK_LEN],
    freq_buf: [u32; BLOCK_LEN],
    freqs_decoded: bool,
}

impl<'a> BlockPostingCursor<'a> {
    pub fn new(
        codec: &'a dyn BlockCodec,
        docs_bytes: &'a [u8],
        freqs_bytes: &'a [u8],
        document_bound: u32,
    ) -> Self {
        let (n_docs, mut docs_rest) = read_varint(docs_bytes);
        let (n_freqs, mut freqs_rest) = read_varint(freqs_bytes);
        debug_assert_eq!(n_docs, n_freqs, "docs and freqs lists are misaligned");
        let n = n_docs as usize;

        let blocks = n.div_ceil(BLOCK_LEN);
        let mut skip: SmallVec<[BlockSkip; 8]> = SmallVec::with_capacity(blocks);
        let mut prev_last: i64 = -1;
        for _ in 0..blocks {
            let (delta, rest) = read_varint(docs_rest);
            docs_rest = rest;
            let last = (prev_last + 1 + delta as i64) as u32;
            prev_last = last as i64;
            skip.push(BlockSkip {
                last_docid: last,
                docs_end: 0,
                freqs_end: 0,
            });
        }
        let mut docs_end = 0u32;
        for entry in skip.iter_mut() {
            let (len, rest) = read_varint(docs_rest);
            docs_rest = rest;
            docs_end += len;
            entry.docs_end = docs_end;
        }
        let mut freqs_end = 0u32;
        for entry in skip.iter_mut() {
            let (len, rest) = read_varint(freqs_rest);
            freqs_rest = rest;
            freqs_end += len;
            entry.freqs_end = freqs_end;
        }

        let mut cursor = BlockPostingCursor {
            codec,
            docs: docs_rest,
            freqs: freqs_rest,
            skip,
            n,
            bound: document_bound,
            block: 0,
            pos: 0,
            current: document_bound,
            doc_buf: [0; BLOCK_LEN],
            freq_buf: [0; BLOCK_LEN],
            freqs_decoded: false,
        };
        if n > 0 {
            cursor.decode_docs_block(0);
            cursor.current = cursor.doc_buf[0];
        }
        cursor
    }

    #[inline]
    fn blocks(&self) -> usize {
        self.skip.len()
    }

    #[inline]
    fn block_len(&self, block: usize) -> usize {
        if block + 1 == self.blocks() {
            self.n - block * BLOCK_LEN
        } else {
            BLOCK_LEN
        }
    }

    /// Docid base of a block: one past the previous block's last docid.
    #[inline]
    fn block_base(&self, block: usize) -> i64 {
        if block == 0 {
            -1
        } else {
            self.skip[block - 1].last_docid as i64
        }
    }

    fn decode_docs_block(&mut self, block: usize) {
        let len = self.block_len(block);
        let start = if block == 0 {
            0
        } else {
            self.skip[block - 1].docs_end as usize
        };
        let base = self.block_base(block);
        let last = self.skip[block].last_docid as i64;
        // The block's delta sum falls out of the skip table; interpolative
        // coding needs it, the rest ignore it.
        let sum = (last - base - len as i64) as u32;

        self.codec
            .decode(&self.docs[start..], &mut self.doc_buf[..len], sum);

        let mut prev = base;
        for value in self.doc_buf[..len].iter_mut() {
            prev += *value as i64 + 1;
            *value = prev as u32;
        }
        debug_assert_eq!(self.doc_buf[len - 1], self.skip[block].last_docid);

        self.block = block;
        self.freqs_decoded = false;
    }

    fn decode_freqs_block(&mut self) {
        let block = self.block;
        let len = self.block_len(block);
        let start = if block == 0 {
            0
        } else {
            self.skip[block - 1].freqs_end as usize
        };
        self.codec
            .decode(&self.freqs[start..], &mut self.freq_buf[..len], u32::MAX);
        self.freqs_decoded = true;
    }
}

impl PostingCursor for BlockPostingCursor<'_> {
    #[inline]
    fn docid(&self) -> u32 {
        self.current
    }

    #[inline]
    fn freq(&mut self) -> u32 {
        debug_assert!(self.pos < self.block_len(self.block));
        if !self.freqs_decoded {
            self.decode_freqs_block();
        }
        self.freq_buf[self.pos] + 1
    }

    fn next(&mut self) {
        if self.current == self.bound {
            return;
        }
        self.pos += 1;
        if self.pos == self.block_len(self.block) {
            if self.block + 1 == self.blocks() {
                self.current = self.bound;
                return;
            }
            self.decode_docs_block(self.block + 1);
            self.pos = 0;
        }
        self.current = self.doc_buf[self.pos];
    }

    fn next_geq(&mut self, target: u32) {
        if self.current >= target || self.current == self.bound {
            return;
        }
        // Skip whole blocks using the last-docid table.
        if target > self.skip[self.block].last_docid {
            let offset = self.skip[self.block..]
                .partition_point(|entry| entry.last_docid < target);
            let block = self.block + offset;
            if block == self.blocks() {
                self.current = self.bound;
                return;
            }
            self.decode_docs_block(block);
            self.pos = 0;
        }
        while self.doc_buf[self.pos] < target {
            self.pos += 1;
        }
        self.current = self.doc_buf[self.pos];
    }

    #[inline]
    fn len(&self) -> usize {
        self.n
    }
}

// ---------------------------------------------------------------------------
// Whole-list cursors
// ---------------------------------------------------------------------------

/// Cursor over Elias-Fano docs plus prefix-summed Elias-Fano freqs.
pub struct EliasFanoPostingCursor<'a> {
    docs: EliasFanoCursor<'a>,
    freqs: EliasFanoCursor<'a>,
    /// Prefix sum at the position before the freq cursor.
    prev_cumulative: u32,
    n: usize,
    bound: u32,
}

impl<'a> EliasFanoPostingCursor<'a> {
    pub fn new(docs_bytes: &'a [u8], freqs_bytes: &'a [u8], document_bound: u32) -> Self {
        let (docs_view, _) = EliasFanoView::parse(docs_bytes);
        let (freqs_view, _) = EliasFanoView::parse(freqs_bytes);
        debug_assert_eq!(docs_view.len(), freqs_view.len());
        let n = docs_view.len();
        EliasFanoPostingCursor {
            docs: docs_view.cursor(),
            freqs: freqs_view.cursor(),
            prev_cumulative: 0,
            n,
            bound: document_bound,
        }
    }
}

impl PostingCursor for EliasFanoPostingCursor<'_> {
    #[inline]
    fn docid(&self) -> u32 {
        if self.docs.exhausted() {
            self.bound
        } else {
            self.docs.value()
        }
    }

    fn freq(&mut self) -> u32 {
        let i = self.docs.index();
        while self.freqs.index() < i {
            self.prev_cumulative = self.freqs.value();
            self.freqs.next();
        }
        self.freqs.value() - self.prev_cumulative
    }

    #[inline]
    fn next(&mut self) {
        self.docs.next();
    }

    #[inline]
    fn next_geq(&mut self, target: u32) {
        self.docs.advance_to_value(target);
    }

    #[inline]
    fn len(&self) -> usize {
        self.n
    }
}

/// Cursor over partitioned Elias-Fano lists; same shape as the plain
/// Elias-Fano cursor with partition hopping underneath.
pub struct PartitionedPostingCursor<'a> {
    docs: PartitionedCursor<'a>,
    freqs: PartitionedCursor<'a>,
    prev_cumulative: u32,
    n: usize,
    bound: u32,
}

impl<'a> PartitionedPostingCursor<'a> {
    pub fn new(docs_bytes: &'a [u8], freqs_bytes: &'a [u8], document_bound: u32) -> Self {
        let (docs_view, _) = PartitionedView::parse(docs_bytes);
        let (freqs_view, _) = PartitionedView::parse(freqs_bytes);
        debug_assert_eq!(docs_view.len(), freqs_view.len());
        let n = docs_view.len();
        PartitionedPostingCursor {
            docs: docs_view.cursor(),
            freqs: freqs_view.cursor(),
            prev_cumulative: 0,
            n,
            bound: document_bound,
        }
    }
}

impl PostingCursor for PartitionedPostingCursor<'_> {
    #[inline]
    fn docid(&self) -> u32 {
        if self.docs.exhausted() {
            self.bound
        } else {
            self.docs.value()
        }
    }

    fn freq(&mut self) -> u32 {
        let i = self.docs.index();
        while self.freqs.index() < i {
            self.prev_cumulative = self.freqs.value();
            self.freqs.next();
        }
        self.freqs.value() - self.prev_cumulative
    }

    #[inline]
    fn next(&mut self) {
        self.docs.next();
    }

    #[inline]
    fn next_geq(&mut self, target: u32) {
        self.docs.advance_to_value(target);
    }

    #[inline]
    fn len(&self) -> usize {
        self.n
    }
}

/// A cursor over one term's list in whichever layout the index uses.
pub enum ListCursor<'a> {
    Block(BlockPostingCursor<'a>),
    EliasFano(EliasFanoPostingCursor<'a>),
    Partitioned(PartitionedPostingCursor<'a>),
}

impl<'a> ListCursor<'a> {
    pub fn new(
        encoding: Encoding,
        docs_bytes: &'a [u8],
        freqs_bytes: &'a [u8],
        document_bound: u32,
    ) -> Self {
        match encoding {
            Encoding::Block(codec) => ListCursor::Block(BlockPostingCursor::new(
                codec,
                docs_bytes,
                freqs_bytes,
                document_bound,
            )),
            Encoding::EliasFano => ListCursor::EliasFano(EliasFanoPostingCursor::new(
                docs_bytes,
                freqs_bytes,
                document_bound,
            )),
            Encoding::Partitioned => ListCursor::Partitioned(PartitionedPostingCursor::new(
                docs_bytes,
                freqs_bytes,
                document_bound,
            )),
        }
    }
}

impl PostingCursor for ListCursor<'_> {
    #[inline]
    fn docid(&self) -> u32 {
        match self {
            ListCursor::Block(c) => c.docid(),
            ListCursor::EliasFano(c) => c.docid(),
            ListCursor::Partitioned(c) => c.docid(),
        }
    }

    #[inline]
    fn freq(&mut self) -> u32 {
        match self {
            ListCursor::Block(c) => c.freq(),
            ListCursor::EliasFano(c) => c.freq(),
            ListCursor::Partitioned(c) => c.freq(),
        }
    }

    #[inline]
    fn next(&mut self) {
        match self {
            ListCursor::Block(c) => c.next(),
            ListCursor::EliasFano(c) => c.next(),
            ListCursor::Partitioned(c) => c.next(),
        }
    }

    #[inline]
    fn next_geq(&mut self, target: u32) {
        match self {
            ListCursor::Block(c) => c.next_geq(target),
            ListCursor::EliasFano(c) => c.next_geq(target),
            ListCursor::Partitioned(c) => c.next_geq(target),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            ListCursor::Block(c) => c.len(),
            ListCursor::EliasFano(c) => c.len(),
            ListCursor::Partitioned(c) => c.len(),
        }
    }
}

#[cfg(test)]
#[path = "postings_tests.rs"]
mod tests;
