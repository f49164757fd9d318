use super::BlockCodec;

/// Simple16: each output word spends 4 bits on a selector and packs the
/// remaining 28 bits according to one of sixteen fixed slot layouts.
///
/// Values must fit 28 bits; posting deltas and frequencies stay far below
/// that for any collection this engine addresses.
pub struct Simple16;

/// Slot widths per selector; every row sums to 28 bits.
static LAYOUTS: [&[u8]; 16] = [
    &[1; 28],
    &[2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    &[1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1],
    &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2],
    &[2; 14],
    &[4, 3, 3, 3, 3, 3, 3, 3, 3],
    &[3, 4, 4, 4, 4, 3, 3, 3],
    &[4; 7],
    &[5, 5, 5, 5, 4, 4],
    &[4, 4, 5, 5, 5, 5],
    &[6, 6, 6, 5, 5],
    &[5, 5, 6, 6, 6],
    &[7; 4],
    &[10, 9, 9],
    &[14; 2],
    &[28],
];

impl BlockCodec for Simple16 {
    fn name(&self) -> &'static str {
        "simple16"
    }

    fn encode(&self, values: &[u32], _sum: u32, out: &mut Vec<u8>) {
        let mut pos = 0;
        while pos < values.len() {
            let remaining = &values[pos..];
            let (selector, layout) = LAYOUTS
                .iter()
                .enumerate()
                .find(|(_, layout)| {
                    layout.len() <= remaining.len()
                        && layout
                            .iter()
                            .zip(remaining)
                            .all(|(&width, &value)| value < (1u32 << width))
                })
                .expect("simple16 value exceeds 28 bits");

            let mut word: u32 = (selector as u32) << 28;
            let mut shift = 0u32;
            for (&width, &value) in layout.iter().zip(remaining) {
                word |= value << shift;
                shift += width as u32;
            }
            out.extend_from_slice(&word.to_le_bytes());
            pos += layout.len();
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8], out: &mut [u32], _sum: u32) -> &'a [u8] {
        let mut rest = bytes;
        let mut pos = 0;
        while pos < out.len() {
            let word = u32::from_le_bytes(rest[..4].try_into().unwrap());
            rest = &rest[4..];
            let layout = LAYOUTS[(word >> 28) as usize];
            let mut shift = 0u32;
            for &width in layout {
                out[pos] = (word >> shift) & ((1u32 << width) - 1);
                shift += width as u32;
                pos += 1;
            }
        }
        rest
    }
}
