use super::bits::{BitReader, BitWriter, bit_width};
use super::BlockCodec;

/// Binary interpolative coding.
///
/// The delta payload is first rebuilt into the strictly increasing sequence
/// it came from (this is what the `sum` argument is for: `sum + n - 1` is the
/// largest element), then coded recursively: the middle element is written
/// with a minimal binary code against the range its neighbors leave open.
///
/// A `sum` of `u32::MAX` means the caller cannot derive it (frequency
/// blocks); the encoder then embeds the sum as a leading varint and the
/// decoder reads it back.
pub struct Interpolative;

fn minimal_binary_put(bits: &mut BitWriter, value: u64, range: u64) {
    debug_assert!(value < range);
    debug_assert!(range - 1 <= u32::MAX as u64);
    if range <= 1 {
        return;
    }
    let width = bit_width((range - 1) as u32).max(1);
    let threshold = (1u64 << width) - range;
    if value < threshold {
        bits.put_msb(value as u32, width - 1);
    } else {
        bits.put_msb((value + threshold) as u32, width);
    }
}

fn minimal_binary_get(bits: &mut BitReader<'_>, range: u64) -> u64 {
    if range <= 1 {
        return 0;
    }
    let width = bit_width((range - 1) as u32).max(1);
    let threshold = (1u64 << width) - range;
    let head = bits.get_msb(width - 1) as u64;
    if head < threshold {
        head
    } else {
        ((head << 1) | bits.get(1) as u64) - threshold
    }
}

fn encode_range(bits: &mut BitWriter, values: &[u64], lo: u64, hi: u64) {
    if values.is_empty() {
        return;
    }
    let mid = values.len() / 2;
    let value = values[mid];
    // The middle element is confined by how many elements must still fit on
    // either side of it.
    let value_lo = lo + mid as u64;
    let value_hi = hi - (values.len() - 1 - mid) as u64;
    minimal_binary_put(bits, value - value_lo, value_hi - value_lo + 1);
    encode_range(bits, &values[..mid], lo, value.wrapping_sub(1));
    encode_range(bits, &values[mid + 1..], value + 1, hi);
}

fn decode_range(bits: &mut BitReader<'_>, out: &mut [u64], lo: u64, hi: u64) {
    if out.is_empty() {
        return;
    }
    let mid = out.len() / 2;
    let value_lo = lo + mid as u64;
    let value_hi = hi - (out.len() - 1 - mid) as u64;
    let value = value_lo + minimal_binary_get(bits, value_hi - value_lo + 1);
    out[mid] = value;
    let (left, right) = out.split_at_mut(mid);
    decode_range(bits, left, lo, value.wrapping_sub(1));
    decode_range(bits, &mut right[1..], value + 1, hi);
}

impl BlockCodec for Interpolative {
    fn name(&self) -> &'static str {
        "interpolative"
    }

    fn encode(&self, values: &[u32], sum: u32, out: &mut Vec<u8>) {
        if values.is_empty() {
            return;
        }
        let sum = if sum == u32::MAX {
            let actual: u32 = values.iter().sum();
            super::varint::write_varint(out, actual);
            actual
        } else {
            debug_assert_eq!(sum as u64, values.iter().map(|&v| v as u64).sum::<u64>());
            sum
        };

        // Rebuild the ascending sequence: a[i] = a[i-1] + v[i] + 1, a[-1] = -1.
        let mut ascending = Vec::with_capacity(values.len());
        let mut acc: u64 = 0;
        for (i, &v) in values.iter().enumerate() {
            acc += v as u64;
            ascending.push(acc + i as u64);
        }
        let hi = sum as u64 + values.len() as u64 - 1;

        let mut bits = BitWriter::new();
        encode_range(&mut bits, &ascending, 0, hi);
        out.extend_from_slice(&bits.into_bytes());
    }

    fn decode<'a>(&self, bytes: &'a [u8], out: &mut [u32], sum: u32) -> &'a [u8] {
        if out.is_empty() {
            return bytes;
        }
        let (sum, bytes) = if sum == u32::MAX {
            super::varint::read_varint(bytes)
        } else {
            (sum, bytes)
        };
        let hi = sum as u64 + out.len() as u64 - 1;
        let mut ascending = vec![0u64; out.len()];
        let mut bits = BitReader::new(bytes);
        decode_range(&mut bits, &mut ascending, 0, hi);

        let mut prev: u64 = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            let a = ascending[i];
            *slot = (a - prev) as u32 - if i == 0 { 0 } else { 1 };
            prev = a;
        }
        bytes.split_at(bits.bytes_consumed()).1
    }
}
