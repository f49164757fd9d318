use std::io::{self, Error, ErrorKind};

mod bitpack;
mod bits;
mod elias_fano;
mod interpolative;
mod optpfor;
mod pef;
mod simple16;
mod streamvbyte;
mod varint;

pub use elias_fano::{EliasFano, EliasFanoCursor, EliasFanoView};
pub use pef::{PartitionedCursor, PartitionedEliasFano, PartitionedView};
pub use varint::{read_varint, write_varint};

/// Number of postings per compressed block.
pub const BLOCK_LEN: usize = 128;

/// A block codec turns up to [`BLOCK_LEN`] u32 values into bytes and back.
///
/// `sum` is the sum of the block's values; only interpolative coding consumes
/// it (to close the value range), every other codec ignores it. The decoder
/// is told the exact element count through `out.len()` and returns the
/// unconsumed tail of its input.
pub trait BlockCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, values: &[u32], sum: u32, out: &mut Vec<u8>);

    fn decode<'a>(&self, bytes: &'a [u8], out: &mut [u32], sum: u32) -> &'a [u8];
}

static VARINT: varint::Varint = varint::Varint;
static SIMD_BP: bitpack::SimdBp = bitpack::SimdBp;
static STREAM_VBYTE: streamvbyte::StreamVByte = streamvbyte::StreamVByte;
static SIMPLE16: simple16::Simple16 = simple16::Simple16;
static OPT_PFOR: optpfor::OptPFor = optpfor::OptPFor;
static INTERPOLATIVE: interpolative::Interpolative = interpolative::Interpolative;

/// Resolve a block codec by its registered name.
pub fn block_codec(name: &str) -> Option<&'static dyn BlockCodec> {
    match name {
        "varint" => Some(&VARINT),
        "simdbp" => Some(&SIMD_BP),
        "streamvbyte" => Some(&STREAM_VBYTE),
        "simple16" => Some(&SIMPLE16),
        "optpfor" => Some(&OPT_PFOR),
        "interpolative" => Some(&INTERPOLATIVE),
        _ => None,
    }
}

pub const BLOCK_CODEC_NAMES: &[&str] = &[
    "varint",
    "simdbp",
    "streamvbyte",
    "simple16",
    "optpfor",
    "interpolative",
];

/// How a posting stream is laid out: block-wise with a given block codec, or
/// as one whole-list structure.
#[derive(Clone, Copy)]
pub enum Encoding {
    Block(&'static dyn BlockCodec),
    EliasFano,
    Partitioned,
}

impl std::fmt::Debug for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Block(codec) => f.debug_tuple("Block").field(&codec.name()).finish(),
            Encoding::EliasFano => write!(f, "EliasFano"),
            Encoding::Partitioned => write!(f, "Partitioned"),
        }
    }
}

impl Encoding {
    /// Resolve an encoding name; unknown names are load-time fatal.
    pub fn from_name(name: &str) -> io::Result<Self> {
        match name {
            "ef" => Ok(Encoding::EliasFano),
            "pef" => Ok(Encoding::Partitioned),
            other => block_codec(other).map(Encoding::Block).ok_or_else(|| {
                Error::new(ErrorKind::InvalidInput, format!("unknown encoding: {other}"))
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Block(codec) => codec.name(),
            Encoding::EliasFano => "ef",
            Encoding::Partitioned => "pef",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Encoding::Block(_))
    }
}

pub const ENCODING_NAMES: &[&str] = &[
    "varint",
    "simdbp",
    "streamvbyte",
    "simple16",
    "optpfor",
    "interpolative",
    "ef",
    "pef",
];

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
