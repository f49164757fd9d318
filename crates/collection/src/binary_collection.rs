use std::{
    fs::File,
    io::{self, BufWriter, Error, ErrorKind, Write},
    path::Path,
};

use bytemuck::cast_slice;

use crate::memory::MemorySource;

/// Reader over a binary collection: a flat stream of records, each a `u32`
/// length followed by that many little-endian `u32` values.
///
/// The inverted `.docs`, `.freqs` and `.sizes` files and the forward index
/// all use this layout. The `.docs` and forward files start with a singleton
/// record holding the document count.
pub struct BinaryCollection {
    source: MemorySource,
}

impl BinaryCollection {
    pub fn open(path: &Path) -> io::Result<Self> {
        let source = MemorySource::map(path)?;
        Self::from_source(source)
    }

    pub fn from_source(source: MemorySource) -> io::Result<Self> {
        if source.len() % 4 != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "binary collection length is not a multiple of 4",
            ));
        }
        Ok(BinaryCollection { source })
    }

    /// Iterate records in file order.
    pub fn iter(&self) -> BinaryCollectionIter<'_> {
        BinaryCollectionIter {
            words: cast_slice(self.source.as_slice()),
            pos: 0,
        }
    }

    /// The first record, which for `.docs`/`.sizes`/forward files carries
    /// collection-level metadata (document count or the size table).
    pub fn first(&self) -> io::Result<&[u32]> {
        self.iter().next().ok_or_else(|| {
            Error::new(ErrorKind::InvalidData, "binary collection has no records")
        })?
    }
}

pub struct BinaryCollectionIter<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> Iterator for BinaryCollectionIter<'a> {
    type Item = io::Result<&'a [u32]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.words.len() {
            return None;
        }
        let len = self.words[self.pos] as usize;
        let start = self.pos + 1;
        let end = start + len;
        if end > self.words.len() {
            // Poison the iterator so a truncated tail yields one error.
            self.pos = self.words.len();
            return Some(Err(Error::new(
                ErrorKind::InvalidData,
                "binary collection record overruns the file",
            )));
        }
        self.pos = end;
        Some(Ok(&self.words[start..end]))
    }
}

/// Streaming writer producing the same layout.
pub struct BinaryCollectionWriter<W: Write> {
    out: W,
}

impl BinaryCollectionWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(BinaryCollectionWriter {
            out: BufWriter::new(file),
        })
    }
}

impl<W: Write> BinaryCollectionWriter<W> {
    pub fn new(out: W) -> Self {
        BinaryCollectionWriter { out }
    }

    pub fn write_record(&mut self, values: &[u32]) -> io::Result<()> {
        self.out.write_all(&(values.len() as u32).to_le_bytes())?;
        self.out.write_all(cast_slice(values))?;
        Ok(())
    }

    /// A one-element record, used for the leading document-count singleton.
    pub fn write_singleton(&mut self, value: u32) -> io::Result<()> {
        self.write_record(&[value])
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
#[path = "binary_collection_tests.rs"]
mod tests;
