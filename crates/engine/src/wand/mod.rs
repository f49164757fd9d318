use std::{
    fs::{self, File},
    io::{self, BufWriter, Error, ErrorKind, Write},
    mem,
    path::Path,
    sync::Arc,
};

use bytemuck::{Pod, Zeroable, bytes_of, cast_slice, from_bytes};
use crc32fast::Hasher;
use log::info;
use sift_collection::{BinaryCollection, MemorySource};
use tempfile::NamedTempFile;

use crate::index::{INDEX_MAGIC, INDEX_VERSION, SectionDesc, TermId, persist::align_up};
use crate::scorer::{
    CollectionStats, LinearQuantizer, Scorer, ScorerParams, TermStats, scorer_from_params,
};

/// Maxima are stored as u8 with a per-term scale.
pub const WAND_FLAG_QUANTIZED: u32 = 1 << 0;
/// Blocks were partitioned by score deviation rather than fixed size.
pub const WAND_FLAG_VARIABLE: u32 = 1 << 1;

/// On-disk header of a `.wand` block-max table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WandHeader {
    pub magic: u32,
    pub version: u32,
    pub header_size: u32,
    /// CRC32 of header bytes with this field set to 0
    pub header_crc32: u32,
    pub flags: u32,
    pub term_count: u32,
    pub document_bound: u32,
    /// Postings per block for the fixed policy; 0 under the variable policy
    pub block_size: u32,
    pub avg_doc_len: f32,
    /// Score-deviation bound for the variable policy; 0 under fixed
    pub lambda: f32,
    pub _reserved: [u8; 8],
    /// Per-term record offsets, relative to the data section
    pub offsets: SectionDesc,
    pub data: SectionDesc,
}

/// Leading fixed part of each per-term record; the block arrays follow.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TermMeta {
    /// Collection frequency
    pub cf: u64,
    /// Document frequency
    pub df: u32,
    pub block_count: u32,
    /// Global score upper bound for the term
    pub max_weight: f32,
    /// Dequantization scale for u8 maxima; 0 when maxima are f32
    pub scale: f32,
}

enum Maxima<'a> {
    Raw(&'a [f32]),
    Quantized(&'a [u8], f32),
}

impl Maxima<'_> {
    #[inline]
    fn get(&self, i: usize) -> f32 {
        match self {
            Maxima::Raw(scores) => scores[i],
            Maxima::Quantized(scores, scale) => scores[i] as f32 * scale,
        }
    }
}

/// Read-only view over the block-max table, shared across query workers.
pub struct WandData {
    source: MemorySource,
    header: WandHeader,
}

impl WandData {
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::from_source(MemorySource::map(path)?)
    }

    pub fn from_source(source: MemorySource) -> io::Result<Self> {
        let header_size = mem::size_of::<WandHeader>();
        let header: WandHeader = *from_bytes(source.span(0, header_size)?);

        if header.magic != INDEX_MAGIC {
            return Err(Error::new(ErrorKind::InvalidData, "invalid wand data magic"));
        }
        if header.version != INDEX_VERSION {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "wand data version mismatch",
            ));
        }
        let mut unhashed = header;
        unhashed.header_crc32 = 0;
        let mut hasher = Hasher::new();
        hasher.update(bytes_of(&unhashed));
        if hasher.finalize() != header.header_crc32 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "wand data header checksum mismatch",
            ));
        }
        for section in [header.offsets, header.data] {
            let end = (section.offset as usize)
                .checked_add(section.len as usize)
                .ok_or_else(|| Error::new(ErrorKind::InvalidData, "section length overflow"))?;
            if end > source.len() {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    "section lies outside wand data file",
                ));
            }
        }
        if header.offsets.len as usize != (header.term_count as usize + 1) * 8 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "wand offset directory has the wrong length",
            ));
        }

        Ok(WandData { source, header })
    }

    #[inline]
    pub fn num_docs(&self) -> u32 {
        self.header.document_bound
    }

    #[inline]
    pub fn num_terms(&self) -> u32 {
        self.header.term_count
    }

    #[inline]
    pub fn avg_doc_len(&self) -> f32 {
        self.header.avg_doc_len
    }

    #[inline]
    pub fn is_quantized(&self) -> bool {
        self.header.flags & WAND_FLAG_QUANTIZED != 0
    }

    pub fn collection_stats(&self) -> CollectionStats {
        CollectionStats {
            num_docs: self.header.document_bound,
            avg_doc_len: self.header.avg_doc_len,
        }
    }

    fn offsets(&self) -> &[u64] {
        let start = self.header.offsets.offset as usize;
        let len = self.header.offsets.len as usize;
        cast_slice(&self.source.as_slice()[start..start + len])
    }

    fn record(&self, term: TermId) -> io::Result<(TermMeta, &[u32], Maxima<'_>)> {
        if term >= self.header.term_count {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("term {term} out of range ({} terms)", self.header.term_count),
            ));
        }
        let offsets = self.offsets();
        let start = self.header.data.offset as usize + offsets[term as usize] as usize;

        let meta: TermMeta = *from_bytes(self.source.span(start, mem::size_of::<TermMeta>())?);
        let blocks = meta.block_count as usize;
        let docids_start = start + mem::size_of::<TermMeta>();
        let docids: &[u32] = cast_slice(self.source.span(docids_start, blocks * 4)?);

        let maxima_start = docids_start + blocks * 4;
        let maxima = if self.is_quantized() {
            Maxima::Quantized(self.source.span(maxima_start, blocks)?, meta.scale)
        } else {
            Maxima::Raw(cast_slice(self.source.span(maxima_start, blocks * 4)?))
        };
        Ok((meta, docids, maxima))
    }

    pub fn term_stats(&self, term: TermId) -> io::Result<TermStats> {
        let (meta, _, _) = self.record(term)?;
        Ok(TermStats {
            df: meta.df,
            cf: meta.cf,
        })
    }

    /// Global score upper bound of one term.
    pub fn max_term_weight(&self, term: TermId) -> io::Result<f32> {
        let (meta, _, _) = self.record(term)?;
        Ok(meta.max_weight)
    }

    /// Enumerator over one term's (last_docid, block max) pairs.
    pub fn enumerator(&self, term: TermId) -> io::Result<WandEnumerator<'_>> {
        let (_, last_docids, maxima) = self.record(term)?;
        Ok(WandEnumerator {
            last_docids,
            maxima,
            position: 0,
            document_bound: self.header.document_bound,
        })
    }
}

/// Forward cursor over a term's block-max entries.
///
/// `docid()` is the last docid of the current block, `score()` its maximum;
/// past the final block the enumerator pins to the document bound with a
/// zero score.
pub struct WandEnumerator<'a> {
    last_docids: &'a [u32],
    maxima: Maxima<'a>,
    position: usize,
    document_bound: u32,
}

impl WandEnumerator<'_> {
    #[inline]
    pub fn docid(&self) -> u32 {
        self.last_docids
            .get(self.position)
            .copied()
            .unwrap_or(self.document_bound)
    }

    #[inline]
    pub fn score(&self) -> f32 {
        if self.position < self.last_docids.len() {
            self.maxima.get(self.position)
        } else {
            0.0
        }
    }

    /// Reposition to the first block whose last docid is `>= target`.
    pub fn next_geq(&mut self, target: u32) {
        self.position += self.last_docids[self.position..].partition_point(|&d| d < target);
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Block partitioning policy for the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockPartition {
    /// Every block covers exactly this many postings.
    Fixed(usize),
    /// Blocks grow until max-in-block deviates from the mean by more than λ.
    Variable(f32),
}

impl BlockPartition {
    /// Parse `fixed:B` or `variable:LAMBDA`.
    pub fn parse(spec: &str) -> io::Result<Self> {
        let invalid =
            || Error::new(ErrorKind::InvalidInput, format!("invalid block size: {spec}"));
        match spec.split_once(':') {
            Some(("fixed", size)) => {
                let size: usize = size.parse().map_err(|_| invalid())?;
                if size == 0 {
                    return Err(invalid());
                }
                Ok(BlockPartition::Fixed(size))
            }
            Some(("variable", lambda)) => {
                let lambda: f32 = lambda.parse().map_err(|_| invalid())?;
                if !lambda.is_finite() || lambda <= 0.0 {
                    return Err(invalid());
                }
                Ok(BlockPartition::Variable(lambda))
            }
            _ => Err(invalid()),
        }
    }
}

pub struct WandBuildParams {
    pub scorer: ScorerParams,
    pub partition: BlockPartition,
    /// Store maxima as integers under the global linear quantizer, for use
    /// with an index compressed at the same width. At most 8 bits.
    pub quantize_bits: Option<u8>,
}

/// A built table ready to be written out.
pub struct StagedWandData {
    flags: u32,
    term_count: u32,
    document_bound: u32,
    block_size: u32,
    lambda: f32,
    avg_doc_len: f32,
    offsets: Vec<u64>,
    data: Vec<u8>,
}

/// Scan the uncompressed `.docs`/`.freqs`/`.sizes` triple at `basename` and
/// compute the per-term and per-block score bounds.
pub fn build_wand_data(basename: &Path, params: &WandBuildParams) -> io::Result<StagedWandData> {
    let docs = BinaryCollection::open(&basename.with_extension("docs"))?;
    let freqs = BinaryCollection::open(&basename.with_extension("freqs"))?;
    let sizes = BinaryCollection::open(&basename.with_extension("sizes"))?;

    let doc_lens: Arc<[u32]> = Arc::from(sizes.first()?.to_vec().into_boxed_slice());
    let num_docs = doc_lens.len() as u32;
    let total_len: u64 = doc_lens.iter().map(|&l| l as u64).sum();
    let avg_doc_len = if num_docs == 0 {
        0.0
    } else {
        total_len as f32 / num_docs as f32
    };

    let collection = CollectionStats {
        num_docs,
        avg_doc_len,
    };
    let scorer = scorer_from_params(&params.scorer, collection, doc_lens)?;

    let mut doc_records = docs.iter();
    let bound = doc_records.next().transpose()?.ok_or_else(|| {
        Error::new(ErrorKind::InvalidData, "docs collection has no header record")
    })?;
    if bound.len() != 1 || bound[0] != num_docs {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "document count disagrees between .docs and .sizes",
        ));
    }

    if let Some(bits) = params.quantize_bits {
        if bits > 8 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "wand maxima are stored as u8; quantization is limited to 8 bits",
            ));
        }
    }

    // First pass: score every list, partition into blocks, and find the
    // global maximum (the quantizer anchor).
    let mut terms: Vec<(TermStats, Vec<(u32, f32)>)> = Vec::new();
    let mut global_max = 0.0f32;
    for (doc_record, freq_record) in doc_records.zip(freqs.iter()) {
        let docids = doc_record?;
        let freq_values = freq_record?;
        if docids.len() != freq_values.len() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "docs and freqs lists are misaligned",
            ));
        }

        let stats = TermStats {
            df: docids.len() as u32,
            cf: freq_values.iter().map(|&f| f as u64).sum(),
        };
        let term_scorer = scorer.term_scorer(stats, 1.0);
        let scores: Vec<f32> = docids
            .iter()
            .zip(freq_values)
            .map(|(&d, &f)| term_scorer.score(d, f))
            .collect();
        global_max = scores.iter().copied().fold(global_max, f32::max);

        let blocks = partition_blocks(docids, &scores, params.partition);
        terms.push((stats, blocks));
    }

    let quantizer = match params.quantize_bits {
        Some(bits) => Some(LinearQuantizer::new(global_max, bits)?),
        None => None,
    };

    let mut staged = StagedWandData {
        flags: match (quantizer.is_some(), params.partition) {
            (true, BlockPartition::Variable(_)) => WAND_FLAG_QUANTIZED | WAND_FLAG_VARIABLE,
            (true, _) => WAND_FLAG_QUANTIZED,
            (false, BlockPartition::Variable(_)) => WAND_FLAG_VARIABLE,
            _ => 0,
        },
        term_count: 0,
        document_bound: num_docs,
        block_size: match params.partition {
            BlockPartition::Fixed(size) => size as u32,
            BlockPartition::Variable(_) => 0,
        },
        lambda: match params.partition {
            BlockPartition::Variable(lambda) => lambda,
            BlockPartition::Fixed(_) => 0.0,
        },
        avg_doc_len,
        offsets: vec![0],
        data: Vec::new(),
    };

    for (stats, blocks) in terms {
        append_term_record(&mut staged, stats, &blocks, quantizer.as_ref());
        staged.term_count += 1;
    }

    info!(
        "built wand data for {} terms over {} documents (global max {global_max})",
        staged.term_count, num_docs
    );
    Ok(staged)
}

/// Partition one scored list into (last_docid, block max) pairs.
fn partition_blocks(docids: &[u32], scores: &[f32], policy: BlockPartition) -> Vec<(u32, f32)> {
    match policy {
        BlockPartition::Fixed(size) => docids
            .chunks(size)
            .zip(scores.chunks(size))
            .map(|(block_docs, block_scores)| {
                let max = block_scores.iter().copied().fold(0.0f32, f32::max);
                (*block_docs.last().unwrap(), max)
            })
            .collect(),
        BlockPartition::Variable(lambda) => {
            let mut blocks = Vec::new();
            let mut count = 0usize;
            let mut sum = 0.0f32;
            let mut max = 0.0f32;
            for (i, &score) in scores.iter().enumerate() {
                if count > 0 {
                    let grown_max = max.max(score);
                    let grown_mean = (sum + score) / (count + 1) as f32;
                    if grown_max - grown_mean > lambda {
                        blocks.push((docids[i - 1], max));
                        count = 0;
                        sum = 0.0;
                        max = 0.0;
                    }
                }
                count += 1;
                sum += score;
                max = max.max(score);
            }
            if count > 0 {
                blocks.push((*docids.last().unwrap(), max));
            }
            blocks
        }
    }
}

fn append_term_record(
    staged: &mut StagedWandData,
    stats: TermStats,
    blocks: &[(u32, f32)],
    quantizer: Option<&LinearQuantizer>,
) {
    let raw_max = blocks.iter().map(|&(_, m)| m).fold(0.0f32, f32::max);
    // Under quantization all bounds live in quantizer units, matching the
    // scores a quantized index stores; the quantizer is monotone so the
    // quantized block maximum still bounds every quantized posting score.
    let max_weight = match quantizer {
        Some(q) if raw_max > 0.0 => q.quantize(raw_max) as f32,
        Some(_) => 0.0,
        None => raw_max,
    };

    let meta = TermMeta {
        cf: stats.cf,
        df: stats.df,
        block_count: blocks.len() as u32,
        max_weight,
        scale: if quantizer.is_some() { 1.0 } else { 0.0 },
    };
    staged.data.extend_from_slice(bytes_of(&meta));
    for &(last_docid, _) in blocks {
        staged.data.extend_from_slice(&last_docid.to_le_bytes());
    }
    match quantizer {
        Some(q) => {
            for &(_, max) in blocks {
                let value = if max > 0.0 { q.quantize(max) as u8 } else { 0 };
                staged.data.push(value);
            }
        }
        None => {
            for &(_, max) in blocks {
                staged.data.extend_from_slice(&max.to_le_bytes());
            }
        }
    }

    // Records stay 8-aligned so the meta struct can be cast back out.
    let aligned = align_up(staged.data.len() as u64, 8);
    staged.data.resize(aligned as usize, 0);
    staged.offsets.push(staged.data.len() as u64);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

pub fn write_wand_data_to(file: &File, staged: &StagedWandData) -> io::Result<()> {
    let mut writer = BufWriter::new(file);

    let header_size = mem::size_of::<WandHeader>() as u64;
    let offsets_offset = align_up(header_size, 8);
    let offsets_bytes: &[u8] = cast_slice(&staged.offsets);
    let data_offset = offsets_offset + offsets_bytes.len() as u64;

    let mut header = WandHeader {
        magic: INDEX_MAGIC,
        version: INDEX_VERSION,
        header_size: header_size as u32,
        header_crc32: 0,
        flags: staged.flags,
        term_count: staged.term_count,
        document_bound: staged.document_bound,
        block_size: staged.block_size,
        avg_doc_len: staged.avg_doc_len,
        lambda: staged.lambda,
        _reserved: [0; 8],
        offsets: SectionDesc::new(offsets_offset, offsets_bytes.len() as u64),
        data: SectionDesc::new(data_offset, staged.data.len() as u64),
    };
    let mut hasher = Hasher::new();
    hasher.update(bytes_of(&header));
    header.header_crc32 = hasher.finalize();

    writer.write_all(bytes_of(&header))?;
    writer.write_all(&vec![0u8; (offsets_offset - header_size) as usize])?;
    writer.write_all(offsets_bytes)?;
    writer.write_all(&staged.data)?;
    writer.flush()?;
    Ok(())
}

/// Atomic wand-data write.
pub fn write_wand_data_atomic(path: &Path, staged: &StagedWandData) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = NamedTempFile::new_in(parent)?;
    write_wand_data_to(tmp.as_file(), staged)?;
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

#[cfg(test)]
#[path = "wand_tests.rs"]
mod tests;
