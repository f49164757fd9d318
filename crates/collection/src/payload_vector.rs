use std::{
    fs::File,
    io::{self, BufWriter, Error, ErrorKind, Write},
    path::Path,
};

use bitflags::bitflags;
use bytemuck::cast_slice;

use crate::memory::MemorySource;

/// Lookup table v1: 2 magic bytes, 1 flags byte, 5 reserved zero bytes,
/// a u64 entry count, `count + 1` cumulative payload offsets (u32 or u64
/// depending on [`LookupFlags::WIDE_OFFSETS`]) and the payload blob.
///
/// Payloads are raw bytes; the term and document lexicons store UTF-8 names.
const LOOKUP_MAGIC: [u8; 2] = [0x87, 0x01];
const HEADER_LEN: usize = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LookupFlags: u8 {
        /// Entries are sorted, enabling binary-search `find`.
        const SORTED = 1 << 0;
        /// Offsets are 64-bit.
        const WIDE_OFFSETS = 1 << 1;
    }
}

enum Offsets<'a> {
    Narrow(&'a [u32]),
    Wide(&'a [u64]),
}

impl Offsets<'_> {
    #[inline]
    fn get(&self, i: usize) -> usize {
        match self {
            Offsets::Narrow(offs) => offs[i] as usize,
            Offsets::Wide(offs) => offs[i] as usize,
        }
    }

    #[inline]
    fn count(&self) -> usize {
        match self {
            Offsets::Narrow(offs) => offs.len(),
            Offsets::Wide(offs) => offs.len(),
        }
    }
}

/// Read-only view over a payload vector, borrowed from a [`MemorySource`].
pub struct PayloadVector<'a> {
    flags: LookupFlags,
    offsets: Offsets<'a>,
    payloads: &'a [u8],
    len: usize,
}

impl<'a> PayloadVector<'a> {
    pub fn parse(source: &'a MemorySource) -> io::Result<Self> {
        let header = source.span(0, HEADER_LEN)?;
        if header[..2] != LOOKUP_MAGIC {
            return Err(Error::new(ErrorKind::InvalidData, "bad lookup table magic"));
        }
        let flags = LookupFlags::from_bits(header[2]).ok_or_else(|| {
            Error::new(ErrorKind::InvalidData, "unknown lookup table flag bits")
        })?;
        if header[3..].iter().any(|b| *b != 0) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "reserved lookup table bytes are non-zero",
            ));
        }

        let len_bytes = source.span(HEADER_LEN, 8)?;
        let len = u64::from_le_bytes(len_bytes.try_into().unwrap()) as usize;

        let offsets_start = HEADER_LEN + 8;
        let (offsets, payload_start) = if flags.contains(LookupFlags::WIDE_OFFSETS) {
            let bytes = source.span(offsets_start, (len + 1) * 8)?;
            (
                Offsets::Wide(cast_slice(bytes)),
                offsets_start + (len + 1) * 8,
            )
        } else {
            let bytes = source.span(offsets_start, (len + 1) * 4)?;
            (
                Offsets::Narrow(cast_slice(bytes)),
                offsets_start + (len + 1) * 4,
            )
        };

        let payload_len = source.len() - payload_start;
        let payloads = source.span(payload_start, payload_len)?;
        if offsets.get(len) > payloads.len() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "lookup table offsets point past the payload blob",
            ));
        }

        Ok(PayloadVector {
            flags,
            offsets,
            payloads,
            len,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<&'a [u8]> {
        if i >= self.len {
            return None;
        }
        let start = self.offsets.get(i);
        let end = self.offsets.get(i + 1);
        Some(&self.payloads[start..end])
    }

    /// Position of `needle`, binary search when sorted, linear scan otherwise.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        debug_assert_eq!(self.offsets.count(), self.len + 1);
        if self.flags.contains(LookupFlags::SORTED) {
            let mut lo = 0usize;
            let mut hi = self.len;
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if self.get(mid).unwrap() < needle {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            (lo < self.len && self.get(lo).unwrap() == needle).then_some(lo)
        } else {
            (0..self.len).find(|&i| self.get(i).unwrap() == needle)
        }
    }
}

/// String lexicon over a payload vector file (`.termlex` / `.doclex`).
pub struct Lexicon {
    source: MemorySource,
}

impl Lexicon {
    pub fn open(path: &Path) -> io::Result<Self> {
        let source = MemorySource::map(path)?;
        // Parse once to validate the header before handing the source out.
        PayloadVector::parse(&source)?;
        Ok(Lexicon { source })
    }

    pub fn view(&self) -> PayloadVector<'_> {
        // Validated in `open`.
        PayloadVector::parse(&self.source).expect("lexicon was validated at open")
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.view()
            .get(id)
            .map(|bytes| std::str::from_utf8(bytes).unwrap_or(""))
    }

    pub fn find(&self, token: &str) -> Option<usize> {
        self.view().find(token.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialize payloads into the lookup table v1 layout.
///
/// `sorted` must only be set when `payloads` is in ascending byte order;
/// it is the caller's claim and is checked in debug builds.
pub fn write_payload_vector<'a, W, I>(out: &mut W, payloads: I, sorted: bool) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a [u8]>,
{
    let items: Vec<&[u8]> = payloads.into_iter().collect();
    debug_assert!(!sorted || items.windows(2).all(|w| w[0] <= w[1]));

    let total: u64 = items.iter().map(|p| p.len() as u64).sum();
    let wide = total > u32::MAX as u64;

    let mut flags = LookupFlags::empty();
    flags.set(LookupFlags::SORTED, sorted);
    flags.set(LookupFlags::WIDE_OFFSETS, wide);

    out.write_all(&LOOKUP_MAGIC)?;
    out.write_all(&[flags.bits(), 0, 0, 0, 0, 0])?;
    out.write_all(&(items.len() as u64).to_le_bytes())?;

    let mut offset: u64 = 0;
    if wide {
        for item in &items {
            out.write_all(&offset.to_le_bytes())?;
            offset += item.len() as u64;
        }
        out.write_all(&offset.to_le_bytes())?;
    } else {
        for item in &items {
            out.write_all(&(offset as u32).to_le_bytes())?;
            offset += item.len() as u64;
        }
        out.write_all(&(offset as u32).to_le_bytes())?;
    }

    for item in &items {
        out.write_all(item)?;
    }
    Ok(())
}

/// Write a sorted string lexicon to `path`.
pub fn write_lexicon<S: AsRef<str>>(path: &Path, entries: &[S]) -> io::Result<()> {
    let sorted = entries
        .windows(2)
        .all(|w| w[0].as_ref() <= w[1].as_ref());
    let mut out = BufWriter::new(File::create(path)?);
    write_payload_vector(
        &mut out,
        entries.iter().map(|s| s.as_ref().as_bytes()),
        sorted,
    )?;
    out.flush()
}

#[cfg(test)]
#[path = "payload_vector_tests.rs"]
mod tests;
