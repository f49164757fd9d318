use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    mem,
    path::Path,
};

use bytemuck::{bytes_of, cast_slice};
use crc32fast::Hasher;
use tempfile::NamedTempFile;

use crate::index::{INDEX_MAGIC, INDEX_VERSION, SectionDesc, StreamHeader};

/// Alignment for the offset directory (u64 values).
const SECTION_ALIGNMENT: u64 = 8;

/// Align `value` up to the next multiple of `alignment`
#[inline]
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

pub(crate) fn encode_codec_name(name: &str) -> [u8; 16] {
    let mut codec = [0u8; 16];
    let bytes = name.as_bytes();
    assert!(bytes.len() <= codec.len(), "codec name too long");
    codec[..bytes.len()].copy_from_slice(bytes);
    codec
}

/// Write one posting stream (header, offset directory, data blob) to an open
/// file positioned at start.
pub fn write_stream_to(
    file: &File,
    codec_name: &str,
    flags: u32,
    document_bound: u32,
    lists: &[Vec<u8>],
) -> io::Result<()> {
    let mut writer = BufWriter::new(file);

    let mut offsets: Vec<u64> = Vec::with_capacity(lists.len() + 1);
    let mut running: u64 = 0;
    offsets.push(0);
    for list in lists {
        running += list.len() as u64;
        offsets.push(running);
    }
    let offsets_bytes: &[u8] = cast_slice(&offsets);

    let header_size = mem::size_of::<StreamHeader>() as u64;
    let offsets_offset = align_up(header_size, SECTION_ALIGNMENT);
    let data_offset = offsets_offset + offsets_bytes.len() as u64;

    let mut header = StreamHeader {
        magic: INDEX_MAGIC,
        version: INDEX_VERSION,
        header_size: header_size as u32,
        header_crc32: 0,
        flags,
        list_count: lists.len() as u32,
        document_bound,
        _reserved: 0,
        codec: encode_codec_name(codec_name),
        offsets: SectionDesc::new(offsets_offset, offsets_bytes.len() as u64),
        data: SectionDesc::new(data_offset, running),
    };

    let mut hasher = Hasher::new();
    hasher.update(bytes_of(&header));
    header.header_crc32 = hasher.finalize();

    writer.write_all(bytes_of(&header))?;
    let padding = (offsets_offset - header_size) as usize;
    writer.write_all(&[0u8; SECTION_ALIGNMENT as usize][..padding])?;
    writer.write_all(offsets_bytes)?;
    for list in lists {
        writer.write_all(list)?;
    }
    writer.flush()?;
    Ok(())
}

/// Atomic stream write: build in a temp file, fsync, rename into place.
pub fn write_stream_atomic(
    path: &Path,
    codec_name: &str,
    flags: u32,
    document_bound: u32,
    lists: &[Vec<u8>],
) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = NamedTempFile::new_in(parent)?;
    write_stream_to(tmp.as_file(), codec_name, flags, document_bound, lists)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
