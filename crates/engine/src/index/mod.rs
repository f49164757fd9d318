use std::{
    io::{self, Error, ErrorKind},
    mem,
    path::Path,
    sync::Arc,
};

use bytemuck::{Pod, Zeroable, bytes_of, cast_slice, from_bytes};
use sift_collection::{BinaryCollection, MemorySource};

use crate::codec::Encoding;
use crate::postings::ListCursor;

pub mod compress;
pub mod persist;

pub use compress::*;
pub use persist::*;

pub type TermId = u32;

/// Magic number: "SIFT" in little-endian.
pub const INDEX_MAGIC: u32 = 0x54464953;
pub const INDEX_VERSION: u32 = 1;

/// The frequency stream holds pre-quantized scores instead of raw counts.
pub const STREAM_FLAG_QUANTIZED: u32 = 1 << 0;

/// Describes a section within an index file.
/// All offsets are absolute byte offsets from file start.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SectionDesc {
    /// Absolute byte offset from start of file
    pub offset: u64,
    /// Length in bytes
    pub len: u64,
    /// Section flags (reserved)
    pub flags: u32,
    /// Reserved for future use
    pub _reserved: u32,
}

impl SectionDesc {
    #[inline]
    pub fn new(offset: u64, len: u64) -> Self {
        Self {
            offset,
            len,
            flags: 0,
            _reserved: 0,
        }
    }
}

/// On-disk header of one compressed posting stream (`.docs` or `.freqs`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StreamHeader {
    /// Magic number (INDEX_MAGIC)
    pub magic: u32,
    /// Format version
    pub version: u32,
    /// Size of this header in bytes (for forward compatibility)
    pub header_size: u32,
    /// CRC32 of header bytes [0..header_size), with this field set to 0
    pub header_crc32: u32,
    /// STREAM_FLAG_* bits
    pub flags: u32,
    /// Number of posting lists
    pub list_count: u32,
    /// Document count N; docids are below this bound
    pub document_bound: u32,
    pub _reserved: u32,
    /// NUL-padded encoding name
    pub codec: [u8; 16],
    /// Per-list cumulative byte offsets (list_count + 1 u64 values)
    pub offsets: SectionDesc,
    /// Concatenated encoded lists
    pub data: SectionDesc,
}

/// One mmap'd posting stream: header, offset directory, data blob.
/// Provides zero-copy access to per-list byte slices.
#[derive(Debug)]
pub struct PostingStream {
    source: MemorySource,
    header: StreamHeader,
    codec_name: String,
}

impl PostingStream {
    pub fn open(path: &Path) -> io::Result<Self> {
        let source = MemorySource::map(path)?;
        Self::from_source(source)
    }

    pub fn from_source(source: MemorySource) -> io::Result<Self> {
        let header_size = mem::size_of::<StreamHeader>();
        let header: StreamHeader = *from_bytes(source.span(0, header_size)?);
        verify_stream_header(&source, &header)?;

        let codec_len = header
            .codec
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(header.codec.len());
        let codec_name = std::str::from_utf8(&header.codec[..codec_len])
            .map_err(|_| Error::new(ErrorKind::InvalidData, "codec name is not UTF-8"))?
            .to_string();

        Ok(PostingStream {
            source,
            header,
            codec_name,
        })
    }

    #[inline]
    pub fn list_count(&self) -> u32 {
        self.header.list_count
    }

    #[inline]
    pub fn document_bound(&self) -> u32 {
        self.header.document_bound
    }

    #[inline]
    pub fn is_quantized(&self) -> bool {
        self.header.flags & STREAM_FLAG_QUANTIZED != 0
    }

    #[inline]
    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    #[inline]
    fn offsets(&self) -> &[u64] {
        // Bounds were checked at open.
        let start = self.header.offsets.offset as usize;
        let len = self.header.offsets.len as usize;
        cast_slice(&self.source.as_slice()[start..start + len])
    }

    /// Byte slice of one encoded list.
    pub fn list(&self, term: TermId) -> io::Result<&[u8]> {
        if term >= self.header.list_count {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "term {term} out of range ({} lists)",
                    self.header.list_count
                ),
            ));
        }
        let offsets = self.offsets();
        let start = offsets[term as usize] as usize;
        let end = offsets[term as usize + 1] as usize;
        self.source
            .span(self.header.data.offset as usize + start, end - start)
    }
}

fn verify_stream_header(source: &MemorySource, header: &StreamHeader) -> io::Result<()> {
    let header_size = mem::size_of::<StreamHeader>();

    if header.magic != INDEX_MAGIC {
        return Err(Error::new(ErrorKind::InvalidData, "invalid index magic"));
    }
    if header.version != INDEX_VERSION {
        return Err(Error::new(ErrorKind::InvalidData, "index version mismatch"));
    }
    if header.header_size as usize != header_size {
        return Err(Error::new(ErrorKind::InvalidData, "header size mismatch"));
    }

    let mut unhashed = *header;
    unhashed.header_crc32 = 0;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes_of(&unhashed));
    if hasher.finalize() != header.header_crc32 {
        return Err(Error::new(ErrorKind::InvalidData, "header checksum mismatch"));
    }

    for section in [header.offsets, header.data] {
        let start = section.offset as usize;
        let len = section.len as usize;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "section length overflow"))?;
        if end > source.len() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "section lies outside index file",
            ));
        }
    }

    let expected_offsets = (header.list_count as usize + 1) * mem::size_of::<u64>();
    if header.offsets.len as usize != expected_offsets {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "offset directory has the wrong length",
        ));
    }
    if header.offsets.offset % 8 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "offset directory is misaligned",
        ));
    }

    Ok(())
}

/// The read-only compressed inverted index: docid stream, frequency stream
/// and document lengths sharing one basename.
///
/// Shared by reference across query workers; everything here is immutable
/// after open.
#[derive(Debug)]
pub struct Index {
    docs: PostingStream,
    freqs: PostingStream,
    doc_lens: Arc<[u32]>,
    encoding: Encoding,
}

impl Index {
    /// Open `{basename}.docs`, `{basename}.freqs` and `{basename}.sizes`.
    pub fn open(basename: &Path) -> io::Result<Self> {
        let docs = PostingStream::open(&basename.with_extension("docs"))?;
        let freqs = PostingStream::open(&basename.with_extension("freqs"))?;

        if docs.codec_name() != freqs.codec_name() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "docs and freqs streams use different encodings",
            ));
        }
        if docs.list_count() != freqs.list_count() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "docs and freqs streams have different list counts",
            ));
        }
        let encoding = Encoding::from_name(docs.codec_name())?;

        let sizes = BinaryCollection::open(&basename.with_extension("sizes"))?;
        let doc_lens: Arc<[u32]> = Arc::from(sizes.first()?.to_vec().into_boxed_slice());
        if doc_lens.len() != docs.document_bound() as usize {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "size table does not match the document bound",
            ));
        }

        Ok(Index {
            docs,
            freqs,
            doc_lens,
            encoding,
        })
    }

    /// Document count; also the sentinel docid reported by exhausted cursors.
    #[inline]
    pub fn num_docs(&self) -> u32 {
        self.docs.document_bound()
    }

    #[inline]
    pub fn num_terms(&self) -> u32 {
        self.docs.list_count()
    }

    #[inline]
    pub fn is_quantized(&self) -> bool {
        self.freqs.is_quantized()
    }

    #[inline]
    pub fn doc_lens(&self) -> Arc<[u32]> {
        Arc::clone(&self.doc_lens)
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.doc_lens.is_empty() {
            return 0.0;
        }
        let total: u64 = self.doc_lens.iter().map(|&l| l as u64).sum();
        total as f32 / self.doc_lens.len() as f32
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Open a cursor over one term's postings.
    pub fn cursor(&self, term: TermId) -> io::Result<ListCursor<'_>> {
        let docs_bytes = self.docs.list(term)?;
        let freqs_bytes = self.freqs.list(term)?;
        Ok(ListCursor::new(
            self.encoding,
            docs_bytes,
            freqs_bytes,
            self.num_docs(),
        ))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
