use std::{
    fs::File,
    io::{self, Error, ErrorKind},
    path::Path,
};

use memmap2::{Mmap, MmapOptions};

/// In-memory backing with the same alignment guarantee as a mapping.
///
/// Readers reinterpret regions of the source as `u32`/`u64` slices, so the
/// base address must be 8-byte aligned; a plain `Vec<u8>` is not.
#[derive(Debug)]
struct AlignedBytes {
    buf: Vec<u64>,
    len: usize,
}

impl AlignedBytes {
    fn from_vec(bytes: Vec<u8>) -> Self {
        let words = bytes.len().div_ceil(8);
        let mut buf = vec![0u64; words];
        bytemuck::cast_slice_mut::<u64, u8>(&mut buf)[..bytes.len()].copy_from_slice(&bytes);
        AlignedBytes {
            buf,
            len: bytes.len(),
        }
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.buf)[..self.len]
    }
}

#[derive(Debug)]
enum Inner {
    Mapped(Mmap),
    Owned(AlignedBytes),
}

/// Owned handle over read-only bytes backing an index artifact.
///
/// Either a memory-mapped file or an in-memory buffer (tests, small
/// intermediates). All readers borrow slices out of this handle; dropping it
/// unmaps the file, so the handle must outlive every view derived from it.
#[derive(Debug)]
pub struct MemorySource {
    inner: Inner,
}

impl MemorySource {
    /// Map a file read-only.
    pub fn map(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(MemorySource {
            inner: Inner::Mapped(mmap),
        })
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        MemorySource {
            inner: Inner::Owned(AlignedBytes::from_vec(bytes)),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            Inner::Mapped(mmap) => mmap,
            Inner::Owned(bytes) => bytes.as_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds-checked subslice.
    pub fn span(&self, offset: usize, len: usize) -> io::Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "span length overflow"))?;
        let bytes = self.as_slice();
        if end > bytes.len() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "span [{offset}, {end}) lies outside source of {} bytes",
                    bytes.len()
                ),
            ));
        }
        Ok(&bytes[offset..end])
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
