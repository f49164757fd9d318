use super::bits::{BitReader, BitWriter, bit_width};
use super::BlockCodec;

/// Values per packed lane group.
const LANES: usize = 32;

/// Scalar rendition of SIMD-BP128: the block is cut into groups of 32
/// values, each group packed at its own bit width behind a one-byte
/// descriptor. Groups are byte-aligned so the decoder can hop between them.
pub struct SimdBp;

impl BlockCodec for SimdBp {
    fn name(&self) -> &'static str {
        "simdbp"
    }

    fn encode(&self, values: &[u32], _sum: u32, out: &mut Vec<u8>) {
        for group in values.chunks(LANES) {
            let width = group.iter().copied().map(bit_width).max().unwrap_or(0);
            out.push(width as u8);
            if width == 0 {
                continue;
            }
            let mut bits = BitWriter::new();
            for &value in group {
                bits.put(value, width);
            }
            out.extend_from_slice(&bits.into_bytes());
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8], out: &mut [u32], _sum: u32) -> &'a [u8] {
        let mut rest = bytes;
        for group in out.chunks_mut(LANES) {
            let width = rest[0] as u32;
            rest = &rest[1..];
            if width == 0 {
                group.fill(0);
                continue;
            }
            let payload = (group.len() * width as usize).div_ceil(8);
            let mut bits = BitReader::new(&rest[..payload]);
            for slot in group.iter_mut() {
                *slot = bits.get(width);
            }
            rest = &rest[payload..];
        }
        rest
    }
}
